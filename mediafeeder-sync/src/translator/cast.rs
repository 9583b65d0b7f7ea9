use super::{StatusTranslator, Translation};
use crate::events::QueueEvent;
use mediafeeder_models::{PlaybackState, StatusUpdate};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CastPlayerState {
    #[default]
    Unknown,
    Buffering,
    Playing,
    Paused,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    Finished,
    Cancelled,
    Interrupted,
    Error,
}

/// Media status as reported by a cast media receiver.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MediaStatus {
    pub player_state: CastPlayerState,
    pub idle_reason: Option<IdleReason>,
    /// Id of the loaded media, normally its URL.
    pub content_id: Option<String>,
    /// Position in seconds.
    pub current_time: Option<f64>,
    /// Volume as a fraction of the maximum.
    pub volume_level: f64,
    pub playback_rate: f64,
    pub supports_seek: bool,
    pub supports_pause: bool,
}

#[derive(Debug, Default)]
pub struct CastTranslator {
    last_state: PlaybackState,
}

impl CastTranslator {
    pub fn new() -> Self {
        Self::default()
    }
}

fn playback_state(status: &MediaStatus) -> PlaybackState {
    // Receivers disable seeking and pausing while an advert plays.
    if !status.supports_seek || !status.supports_pause {
        return PlaybackState::Advert;
    }

    match status.player_state {
        CastPlayerState::Unknown => PlaybackState::Unknown,
        CastPlayerState::Buffering => PlaybackState::Loading,
        CastPlayerState::Playing => PlaybackState::Playing,
        CastPlayerState::Paused => PlaybackState::Paused,
        CastPlayerState::Idle => PlaybackState::Idle,
    }
}

impl StatusTranslator for CastTranslator {
    type Snapshot = MediaStatus;

    fn translate(&mut self, status: &MediaStatus) -> Translation {
        let state = playback_state(status);
        let previous = std::mem::replace(&mut self.last_state, state);

        if state == PlaybackState::Advert {
            return Translation::status(StatusUpdate::with_state(state));
        }

        let update = StatusUpdate {
            state: Some(state),
            position: status.current_time.map(|time| time.max(0.0) as u32),
            volume: Some((status.volume_level * 100.0).round().clamp(0.0, 100.0) as u8),
            rate: Some(status.playback_rate),
            ..Default::default()
        };

        let mut translation = Translation::status(update);

        if previous == PlaybackState::Playing && state == PlaybackState::Paused {
            translation = translation.with_event(QueueEvent::SavePositionHint);
        }

        if status.player_state == CastPlayerState::Idle {
            match status.idle_reason {
                Some(IdleReason::Finished) => {
                    translation = translation.with_event(QueueEvent::WatchedToEnd {
                        content_id: status.content_id.clone(),
                    });
                }
                Some(IdleReason::Cancelled) => {
                    translation = translation.with_event(QueueEvent::Abandoned);
                }
                _ => {}
            }
        }

        translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(player_state: CastPlayerState) -> MediaStatus {
        MediaStatus {
            player_state,
            current_time: Some(61.7),
            volume_level: 0.456,
            playback_rate: 1.0,
            supports_seek: true,
            supports_pause: true,
            content_id: Some("https://media.example/1.mp4".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_playing_status() {
        let translation = CastTranslator::new().translate(&status(CastPlayerState::Playing));
        let update = translation.status.unwrap();

        assert_eq!(update.state, Some(PlaybackState::Playing));
        assert_eq!(update.position, Some(61));
        assert_eq!(update.volume, Some(46));
        assert_eq!(update.rate, Some(1.0));
        assert!(translation.events.is_empty());
    }

    #[test]
    fn test_advert_only_reports_state() {
        let advert = MediaStatus {
            supports_seek: false,
            ..status(CastPlayerState::Playing)
        };

        let translation = CastTranslator::new().translate(&advert);

        assert_eq!(
            translation.status,
            Some(StatusUpdate::with_state(PlaybackState::Advert))
        );
    }

    #[test]
    fn test_finished_is_tagged_with_content_id() {
        let finished = MediaStatus {
            idle_reason: Some(IdleReason::Finished),
            ..status(CastPlayerState::Idle)
        };

        let translation = CastTranslator::new().translate(&finished);

        assert_eq!(
            translation.events,
            vec![QueueEvent::WatchedToEnd {
                content_id: Some("https://media.example/1.mp4".into())
            }]
        );
    }

    #[test]
    fn test_cancelled_is_abandoned() {
        let cancelled = MediaStatus {
            idle_reason: Some(IdleReason::Cancelled),
            ..status(CastPlayerState::Idle)
        };

        let translation = CastTranslator::new().translate(&cancelled);

        assert_eq!(translation.events, vec![QueueEvent::Abandoned]);
    }

    #[test]
    fn test_pausing_hints_a_save() {
        let mut translator = CastTranslator::new();

        translator.translate(&status(CastPlayerState::Playing));
        let paused = translator.translate(&status(CastPlayerState::Paused));
        assert_eq!(paused.events, vec![QueueEvent::SavePositionHint]);

        let still_paused = translator.translate(&status(CastPlayerState::Paused));
        assert!(still_paused.events.is_empty());
    }
}
