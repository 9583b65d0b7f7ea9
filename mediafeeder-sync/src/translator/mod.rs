//! Backend-native status into canonical status reports and queue events.

use crate::events::{EventSender, QueueEvent};
use mediafeeder_models::StatusUpdate;
use std::sync::{Arc, Mutex, PoisonError};

pub mod cast;
pub mod lounge;

/// Result of translating one backend snapshot.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Translation {
    pub status: Option<StatusUpdate>,
    pub events: Vec<QueueEvent>,
}

impl Translation {
    pub fn status(status: StatusUpdate) -> Self {
        Self {
            status: Some(status),
            events: vec![],
        }
    }

    pub fn with_event(mut self, event: QueueEvent) -> Self {
        self.events.push(event);
        self
    }
}

/// Converts one backend's native status into canonical values. Translators
/// keep whatever backend-side memory they need but never see session state.
pub trait StatusTranslator: Send {
    type Snapshot;

    fn translate(&mut self, snapshot: &Self::Snapshot) -> Translation;
}

/// Shareable entry point for backend callbacks. Safe to call from any thread
/// or task, concurrently with the session loop.
pub struct TranslatorHandle<T> {
    translator: Arc<Mutex<T>>,
    events: EventSender,
}

impl<T> Clone for TranslatorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            translator: self.translator.clone(),
            events: self.events.clone(),
        }
    }
}

impl<T: StatusTranslator> TranslatorHandle<T> {
    pub fn new(translator: T, events: EventSender) -> Self {
        Self {
            translator: Arc::new(Mutex::new(translator)),
            events,
        }
    }

    /// Translate a snapshot and hand the results to the session loop. The
    /// status report is queued ahead of any events it caused.
    pub fn deliver(&self, snapshot: &T::Snapshot) {
        let translation = self
            .translator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .translate(snapshot);

        if let Some(status) = translation.status {
            self.events.status(status);
        }

        for event in translation.events {
            self.events.queue(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{self, Event};
    use mediafeeder_models::PlaybackState;

    struct Echo;

    impl StatusTranslator for Echo {
        type Snapshot = PlaybackState;

        fn translate(&mut self, snapshot: &PlaybackState) -> Translation {
            Translation::status(StatusUpdate::with_state(*snapshot))
                .with_event(QueueEvent::SavePositionHint)
        }
    }

    #[tokio::test]
    async fn test_status_is_delivered_before_events() {
        let (sender, mut receiver) = events::channel();
        let handle = TranslatorHandle::new(Echo, sender);

        let from_thread = handle.clone();
        std::thread::spawn(move || from_thread.deliver(&PlaybackState::Paused))
            .join()
            .unwrap();

        assert!(matches!(
            receiver.recv().await,
            Some(Event::Status(StatusUpdate {
                state: Some(PlaybackState::Paused),
                ..
            }))
        ));
        assert!(matches!(
            receiver.recv().await,
            Some(Event::Queue(QueueEvent::SavePositionHint))
        ));
    }
}
