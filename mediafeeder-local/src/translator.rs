use mediafeeder_models::{PlaybackState, StatusUpdate};
use mediafeeder_sync::{
    events::QueueEvent,
    translator::{StatusTranslator, Translation},
};
use std::time::Duration;

const PROVIDER: &str = "Local";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalState {
    Stopped,
    Paused,
    Playing,
}

/// What the playbin reports, reduced to what the session cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalStatus {
    /// The pipeline settled in the state it was asked for.
    StateChanged(LocalState),
    Buffering {
        percent: i32,
    },
    Position {
        position: Duration,
        duration: Option<Duration>,
    },
    /// Linear volume between 0 and 1.
    Volume(f64),
    Rate(f64),
    EndOfStream {
        uri: Option<String>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug)]
pub struct LocalTranslator {
    last_state: PlaybackState,
}

impl Default for LocalTranslator {
    fn default() -> Self {
        Self {
            last_state: PlaybackState::Idle,
        }
    }
}

impl LocalTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&mut self, state: PlaybackState) -> Translation {
        let previous = std::mem::replace(&mut self.last_state, state);
        let translation = Translation::status(StatusUpdate {
            state: Some(state),
            provider: Some(PROVIDER.to_string()),
            ..Default::default()
        });

        if previous == PlaybackState::Playing && state == PlaybackState::Paused {
            translation.with_event(QueueEvent::SavePositionHint)
        } else {
            translation
        }
    }
}

impl StatusTranslator for LocalTranslator {
    type Snapshot = LocalStatus;

    fn translate(&mut self, status: &LocalStatus) -> Translation {
        match status {
            LocalStatus::StateChanged(state) => self.state(match state {
                LocalState::Stopped => PlaybackState::Idle,
                LocalState::Paused => PlaybackState::Paused,
                LocalState::Playing => PlaybackState::Playing,
            }),
            LocalStatus::Buffering { percent } => {
                let loaded = f64::from((*percent).clamp(0, 100)) / 100.0;
                let mut translation = if *percent < 100 {
                    self.state(PlaybackState::Loading)
                } else {
                    Translation::default()
                };

                translation
                    .status
                    .get_or_insert_with(StatusUpdate::default)
                    .loaded = Some(loaded);
                translation
            }
            LocalStatus::Position { position, .. } => Translation::status(StatusUpdate {
                position: Some(position.as_secs() as u32),
                ..Default::default()
            }),
            LocalStatus::Volume(volume) => Translation::status(StatusUpdate {
                volume: Some((volume * 100.0).round().clamp(0.0, 100.0) as u8),
                ..Default::default()
            }),
            LocalStatus::Rate(rate) => Translation::status(StatusUpdate {
                rate: Some(*rate),
                ..Default::default()
            }),
            LocalStatus::EndOfStream { uri } => {
                self.state(PlaybackState::Idle)
                    .with_event(QueueEvent::WatchedToEnd {
                        content_id: uri.clone(),
                    })
            }
            LocalStatus::Error { message } => {
                tracing::warn!(error = %message, "local playback failed");
                self.state(PlaybackState::Idle)
                    .with_event(QueueEvent::Abandoned)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_of_stream_is_tagged_with_uri() {
        let mut translator = LocalTranslator::new();
        translator.translate(&LocalStatus::StateChanged(LocalState::Playing));

        let translation = translator.translate(&LocalStatus::EndOfStream {
            uri: Some("file:///videos/1.mkv".into()),
        });

        assert_eq!(
            translation.status.unwrap().state,
            Some(PlaybackState::Idle)
        );
        assert_eq!(
            translation.events,
            vec![QueueEvent::WatchedToEnd {
                content_id: Some("file:///videos/1.mkv".into())
            }]
        );
    }

    #[test]
    fn test_error_abandons() {
        let translation = LocalTranslator::new().translate(&LocalStatus::Error {
            message: "no decoder".into(),
        });

        assert_eq!(translation.events, vec![QueueEvent::Abandoned]);
    }

    #[test]
    fn test_buffering_reports_loading() {
        let mut translator = LocalTranslator::new();

        let buffering = translator
            .translate(&LocalStatus::Buffering { percent: 40 })
            .status
            .unwrap();
        assert_eq!(buffering.state, Some(PlaybackState::Loading));
        assert_eq!(buffering.loaded, Some(0.4));

        let done = translator
            .translate(&LocalStatus::Buffering { percent: 100 })
            .status
            .unwrap();
        assert_eq!(done.state, None);
        assert_eq!(done.loaded, Some(1.0));
    }

    #[test]
    fn test_pause_after_play_hints_a_save() {
        let mut translator = LocalTranslator::new();

        translator.translate(&LocalStatus::StateChanged(LocalState::Playing));
        let paused = translator.translate(&LocalStatus::StateChanged(LocalState::Paused));
        assert_eq!(paused.events, vec![QueueEvent::SavePositionHint]);

        let again = translator.translate(&LocalStatus::StateChanged(LocalState::Paused));
        assert!(again.events.is_empty());
    }

    #[test]
    fn test_position_and_volume() {
        let mut translator = LocalTranslator::new();

        let position = translator.translate(&LocalStatus::Position {
            position: Duration::from_millis(61_900),
            duration: Some(Duration::from_secs(600)),
        });
        assert_eq!(position.status.unwrap().position, Some(61));

        let volume = translator.translate(&LocalStatus::Volume(0.456));
        assert_eq!(volume.status.unwrap().volume, Some(46));
    }
}
