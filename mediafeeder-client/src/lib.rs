use snafu::prelude::*;

pub mod client;
pub mod stream;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{message}"))]
    Api { message: String },
    #[snafu(display("video {id} not found"))]
    NotFound { id: i64 },
    #[snafu(display("failed to deserialize json: {message}"))]
    DeserializeJSON { message: String },
    #[snafu(display("invalid url: {message}"))]
    InvalidUrl { message: String },
    #[snafu(display("unable to connect to {address}: {message}"))]
    Connect { address: String, message: String },
    #[snafu(display("timed out connecting to {address}"))]
    ConnectTimeout { address: String },
    #[snafu(display("session stream error: {message}"))]
    Stream { message: String },
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Api {
            message: error.to_string(),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Error::InvalidUrl {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::DeserializeJSON {
            message: error.to_string(),
        }
    }
}

impl From<tokio_util::codec::LinesCodecError> for Error {
    fn from(error: tokio_util::codec::LinesCodecError) -> Self {
        Error::Stream {
            message: error.to_string(),
        }
    }
}
