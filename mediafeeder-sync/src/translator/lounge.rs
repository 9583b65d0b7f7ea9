use super::{StatusTranslator, Translation};
use crate::events::QueueEvent;
use mediafeeder_models::{PlaybackState, StatusUpdate};

/// Two times closer than this, in seconds, are treated as equal.
const EPSILON: f64 = 0.01;

const PROVIDER: &str = "YouTube";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LoungeState {
    #[default]
    Unknown,
    Stopped,
    Starting,
    Buffering,
    Playing,
    Paused,
    Advertisement,
}

impl From<LoungeState> for PlaybackState {
    fn from(state: LoungeState) -> Self {
        match state {
            LoungeState::Unknown => PlaybackState::Unknown,
            LoungeState::Stopped | LoungeState::Starting => PlaybackState::Idle,
            LoungeState::Buffering => PlaybackState::Loading,
            LoungeState::Playing => PlaybackState::Playing,
            LoungeState::Paused => PlaybackState::Paused,
            LoungeState::Advertisement => PlaybackState::Advert,
        }
    }
}

/// Events pushed by a TV app paired over the lounge protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum LoungeEvent {
    NowPlaying {
        /// Provider id of the video on screen.
        video_id: Option<String>,
        state: LoungeState,
        current_time: Option<f64>,
        duration: Option<f64>,
    },
    PlaybackState {
        state: LoungeState,
        current_time: Option<f64>,
        duration: Option<f64>,
    },
    AdPlaying,
    Volume {
        volume: u8,
    },
    PlaybackSpeed {
        rate: f64,
    },
    Disconnected,
}

/// Infers finishes from the screen's now-playing changes. The content id of a
/// lounge backend is the provider video id.
///
/// The screen never reports a video as ended. It either goes back to
/// `Starting` for the same video, or reports a position equal to the duration
/// of the current or the replaced video. Replacing a video reports nothing,
/// since the replacement normally comes from the session itself.
#[derive(Debug, Default)]
pub struct LoungeTranslator {
    now_playing: Option<String>,
    now_duration: Option<f64>,
    previous: Option<String>,
    previous_duration: Option<f64>,
    last_state: LoungeState,
}

fn is_close(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() < EPSILON,
        _ => false,
    }
}

impl LoungeTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    fn forget(&mut self) {
        self.now_playing = None;
        self.now_duration = None;
        self.previous = None;
        self.previous_duration = None;
    }

    fn finished(content_id: String) -> QueueEvent {
        QueueEvent::WatchedToEnd {
            content_id: Some(content_id),
        }
    }

    fn status(state: LoungeState, current_time: Option<f64>) -> StatusUpdate {
        StatusUpdate {
            state: Some(state.into()),
            position: current_time.map(|time| time.max(0.0) as u32),
            ..Default::default()
        }
    }

    fn now_playing(
        &mut self,
        video_id: Option<&String>,
        state: LoungeState,
        current_time: Option<f64>,
        duration: Option<f64>,
    ) -> Translation {
        let on_screen = video_id.is_some() && video_id == self.now_playing.as_ref();

        if let Some(video_id) = video_id
            && !on_screen
        {
            self.previous = self.now_playing.replace(video_id.clone());
            self.previous_duration = self.now_duration.take();
        }

        if let Some(duration) = duration.filter(|duration| *duration > 0.0) {
            self.now_duration = Some(duration);
        }

        let translation = Translation::status(StatusUpdate {
            provider: Some(PROVIDER.to_string()),
            ..Self::status(state, current_time)
        });

        // Going back to starting without a position means the video on
        // screen ran out.
        if on_screen
            && current_time.is_none()
            && state == LoungeState::Starting
            && self.now_duration.is_some()
            && let Some(finished) = self.now_playing.take()
        {
            self.forget();
            return translation.with_event(Self::finished(finished));
        }

        translation
    }

    fn playback_state(
        &mut self,
        state: LoungeState,
        current_time: Option<f64>,
        duration: Option<f64>,
    ) -> Translation {
        let mut translation = Translation::status(Self::status(state, current_time));

        if self.last_state == LoungeState::Playing && state == LoungeState::Paused {
            translation = translation.with_event(QueueEvent::SavePositionHint);
        }

        if !is_close(current_time, duration) {
            return translation;
        }

        if self.previous.is_some() && is_close(self.previous_duration, duration) {
            self.previous_duration = None;
            if let Some(finished) = self.previous.take() {
                translation = translation.with_event(Self::finished(finished));
            }
        } else if self.now_playing.is_some() && is_close(self.now_duration, duration) {
            if let Some(finished) = self.now_playing.take() {
                translation = translation.with_event(Self::finished(finished));
            }
            self.forget();
        }

        translation
    }
}

impl StatusTranslator for LoungeTranslator {
    type Snapshot = LoungeEvent;

    fn translate(&mut self, event: &LoungeEvent) -> Translation {
        match event {
            LoungeEvent::NowPlaying { state, .. } | LoungeEvent::PlaybackState { state, .. }
                if *state == LoungeState::Advertisement =>
            {
                self.last_state = *state;
                Translation::status(StatusUpdate::with_state(PlaybackState::Advert))
            }
            LoungeEvent::NowPlaying {
                video_id,
                state,
                current_time,
                duration,
            } => {
                let translation =
                    self.now_playing(video_id.as_ref(), *state, *current_time, *duration);
                self.last_state = *state;
                translation
            }
            LoungeEvent::PlaybackState {
                state,
                current_time,
                duration,
            } => {
                let translation = self.playback_state(*state, *current_time, *duration);
                self.last_state = *state;
                translation
            }
            LoungeEvent::AdPlaying => {
                Translation::status(StatusUpdate::with_state(PlaybackState::Advert))
            }
            LoungeEvent::Volume { volume } => Translation::status(StatusUpdate {
                volume: Some((*volume).min(100)),
                ..Default::default()
            }),
            LoungeEvent::PlaybackSpeed { rate } => Translation::status(StatusUpdate {
                rate: Some(*rate),
                ..Default::default()
            }),
            LoungeEvent::Disconnected => {
                self.forget();
                Translation::status(StatusUpdate::with_state(PlaybackState::Idle))
                    .with_event(QueueEvent::Abandoned)
            }
        }
    }
}
