use crate::{Error, Result};
use async_trait::async_trait;
use mediafeeder_models::{StatusUpdate, VideoReply};
use std::cmp::Ordering;

pub const MIN_RATE: f64 = 0.25;
pub const MAX_RATE: f64 = 3.0;
pub const RATE_STEP: f64 = 0.5;

/// Backend-native identifier of whatever is currently loaded, e.g. a media
/// URL or a provider video id.
pub type ContentId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Direction of a signed delta sent by the coordination service. Zero
    /// carries no direction.
    pub fn from_delta(delta: i32) -> Option<Self> {
        match delta.cmp(&0) {
            Ordering::Greater => Some(Direction::Up),
            Ordering::Less => Some(Direction::Down),
            Ordering::Equal => None,
        }
    }
}

/// Next playback rate one step away from `current`, kept within
/// [`MIN_RATE`, `MAX_RATE`].
pub fn step_rate(current: f64, direction: Direction) -> f64 {
    let next = match direction {
        Direction::Up => current + RATE_STEP,
        Direction::Down => current - RATE_STEP,
    };

    next.clamp(MIN_RATE, MAX_RATE)
}

/// Optional features a backend advertises to the coordination service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub volume_change: bool,
    pub rate_change: bool,
    pub subtitles: bool,
}

impl Capabilities {
    pub fn as_status(&self) -> StatusUpdate {
        StatusUpdate {
            supports_volume_change: Some(self.volume_change),
            supports_rate_change: Some(self.rate_change),
            supports_subtitles: Some(self.subtitles),
            ..Default::default()
        }
    }
}

/// Operations the session loop drives on a local playback backend.
///
/// Only `play_video` and `play_pause` are mandatory. Everything else reports
/// [`Error::Unsupported`] unless the backend overrides it. Failures are
/// logged by the caller and never end the session.
#[async_trait]
pub trait PlayerCapability: Send {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Make sure the backend is reachable and able to accept commands.
    async fn ensure_ready(&mut self) -> Result<()> {
        Ok(())
    }

    /// Start playing `video` immediately, replacing anything loaded. Returns
    /// the id the backend will tag its finish notification with.
    async fn play_video(&mut self, video: &VideoReply) -> Result<ContentId>;

    async fn play_pause(&mut self) -> Result<()>;

    async fn pause_if_playing(&mut self) -> Result<()> {
        Err(Error::Unsupported {
            operation: "pause if playing",
        })
    }

    /// Seek to an absolute position in seconds.
    async fn seek(&mut self, _position: u32) -> Result<()> {
        Err(Error::Unsupported { operation: "seek" })
    }

    /// Step the volume using the backend's own increment.
    async fn change_volume(&mut self, _direction: Direction) -> Result<()> {
        Err(Error::Unsupported {
            operation: "volume change",
        })
    }

    async fn change_playback_rate(&mut self, _rate: f64) -> Result<()> {
        Err(Error::Unsupported {
            operation: "playback rate change",
        })
    }

    async fn toggle_subtitles(&mut self) -> Result<()> {
        Err(Error::Unsupported {
            operation: "subtitle toggle",
        })
    }
}
