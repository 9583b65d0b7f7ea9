use serde::{Deserialize, Serialize};

/// Identifier of a video in the coordination service.
pub type VideoId = i64;

/// Coarse playback state reported to the coordination service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackState {
    #[default]
    Unknown,
    Loading,
    Playing,
    Paused,
    Advert,
    Idle,
}

impl PlaybackState {
    /// Whether a position reported in this state points into the video itself.
    pub fn has_position(self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

/// Partial status report. Fields left as `None` are not transmitted and mean
/// "unchanged" to the receiver.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<VideoId>,
    /// Playback position in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PlaybackState>,
    /// Volume on a 0-100 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_volume_change: Option<bool>,
    /// Playback rate, 1.0 being normal speed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_rate_change: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_subtitles: Option<bool>,
    /// Fraction of the video loaded into the buffer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded: Option<f64>,
}

impl StatusUpdate {
    pub fn with_state(state: PlaybackState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    pub fn with_video_id(video_id: VideoId) -> Self {
        Self {
            video_id: Some(video_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionAction {
    PopNextVideo,
}

/// One frame sent from the player to the coordination service.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionRequest {
    #[serde(flatten)]
    pub status: StatusUpdate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<SessionAction>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub end_session: bool,
}

impl SessionRequest {
    /// Identify the player and restore what it is currently playing.
    pub fn announce(title: &str, video_id: Option<VideoId>) -> Self {
        Self {
            status: StatusUpdate {
                video_id,
                ..Default::default()
            },
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    pub fn status(status: StatusUpdate) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn pop_next_video() -> Self {
        Self {
            action: Some(SessionAction::PopNextVideo),
            ..Default::default()
        }
    }

    pub fn end_session() -> Self {
        Self {
            end_session: true,
            ..Default::default()
        }
    }
}

/// One frame received from the coordination service. Usually exactly one
/// instruction is present.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SessionReply {
    pub should_play_pause: bool,
    pub should_pause_if_playing: bool,
    pub should_watch: bool,
    pub should_skip: bool,
    pub should_toggle_subtitles: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_video_id: Option<VideoId>,
    /// Position to resume `next_video_id` from, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_seek_relative_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_change_volume: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_change_rate: Option<i32>,
}

/// Video metadata as served by the coordination service.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VideoReply {
    pub id: VideoId,
    pub title: String,
    /// Identifier of the video at its provider, e.g. a YouTube video id.
    pub video_id: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub watched: bool,
}
