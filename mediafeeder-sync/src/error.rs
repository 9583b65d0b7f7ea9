use snafu::prelude::*;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("unable to reach the coordination service: {message}"))]
    Connection { message: String },
    #[snafu(display("{message}"))]
    Client { message: String },
    #[snafu(display("backend failed: {message}"))]
    Backend { message: String },
    #[snafu(display("{operation} is not supported by this backend"))]
    Unsupported { operation: &'static str },
}

impl From<mediafeeder_client::Error> for Error {
    fn from(error: mediafeeder_client::Error) -> Self {
        Error::Client {
            message: error.to_string(),
        }
    }
}
