//! Local file playback through a GStreamer playbin.
//!
//! The translator is always available. The backend itself needs the
//! `gstreamer` feature.

use mediafeeder_models::VideoId;
use snafu::prelude::*;

#[cfg(feature = "gstreamer")]
mod player;
pub mod translator;

#[cfg(feature = "gstreamer")]
pub use player::LocalPlayer;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("{message}"))]
    Gstreamer { message: String },
    #[snafu(display("playbin has no bus"))]
    NoBus,
    #[snafu(display("video {id} has no media url"))]
    NoMediaUrl { id: VideoId },
}

#[cfg(feature = "gstreamer")]
impl From<gstreamer::glib::Error> for Error {
    fn from(error: gstreamer::glib::Error) -> Self {
        Error::Gstreamer {
            message: error.to_string(),
        }
    }
}

#[cfg(feature = "gstreamer")]
impl From<gstreamer::glib::BoolError> for Error {
    fn from(error: gstreamer::glib::BoolError) -> Self {
        Error::Gstreamer {
            message: error.to_string(),
        }
    }
}

#[cfg(feature = "gstreamer")]
impl From<gstreamer::StateChangeError> for Error {
    fn from(error: gstreamer::StateChangeError) -> Self {
        Error::Gstreamer {
            message: error.to_string(),
        }
    }
}

impl From<Error> for mediafeeder_sync::Error {
    fn from(error: Error) -> Self {
        mediafeeder_sync::Error::Backend {
            message: error.to_string(),
        }
    }
}
