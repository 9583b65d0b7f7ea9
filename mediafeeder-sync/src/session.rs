use crate::capability::ContentId;
use mediafeeder_models::{PlaybackState, StatusUpdate, VideoId};
use tokio::{sync::watch, time::Instant};

/// Everything the session loop knows about the current playback. Only the
/// loop mutates it; everyone else reads snapshots through a [`SessionView`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub current_video_id: Option<VideoId>,
    pub current_content_id: Option<ContentId>,
    pub now_state: PlaybackState,
    /// Last reported position in seconds.
    pub now_position: u32,
    pub now_rate: f64,
    pub last_save_position_time: Option<Instant>,
    /// Position to seek to once the assigned video has started.
    pub position_to_restore: Option<u32>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_video_id: None,
            current_content_id: None,
            now_state: PlaybackState::Unknown,
            now_position: 0,
            now_rate: 1.0,
            last_save_position_time: None,
            position_to_restore: None,
        }
    }
}

impl SessionState {
    pub(crate) fn assign(&mut self, video_id: VideoId, restore_position: Option<u32>, now: Instant) {
        self.current_video_id = Some(video_id);
        self.current_content_id = None;
        self.now_state = PlaybackState::Loading;
        self.now_position = 0;
        self.last_save_position_time = Some(now);
        self.position_to_restore = restore_position.filter(|position| *position > 0);
    }

    pub(crate) fn clear(&mut self) {
        self.current_video_id = None;
        self.current_content_id = None;
        self.now_position = 0;
        self.last_save_position_time = None;
        self.position_to_restore = None;
    }

    pub(crate) fn apply(&mut self, update: &StatusUpdate) {
        if let Some(state) = update.state {
            self.now_state = state;
        }

        if let Some(position) = update.position {
            self.now_position = position;
        }

        if let Some(rate) = update.rate {
            self.now_rate = rate;
        }
    }

    /// Whether `video_id` is already assigned and the backend is busy with it.
    pub fn is_active(&self, video_id: VideoId) -> bool {
        self.current_video_id == Some(video_id)
            && matches!(
                self.now_state,
                PlaybackState::Loading
                    | PlaybackState::Playing
                    | PlaybackState::Paused
                    | PlaybackState::Advert
            )
    }
}

/// Read-only view of the session state, updated once per loop iteration.
#[derive(Debug, Clone)]
pub struct SessionView(watch::Receiver<SessionState>);

impl SessionView {
    pub fn current(&self) -> SessionState {
        self.0.borrow().clone()
    }

    /// Wait for the next published change. Returns `false` once the loop has
    /// gone away.
    pub async fn changed(&mut self) -> bool {
        self.0.changed().await.is_ok()
    }
}

impl From<watch::Receiver<SessionState>> for SessionView {
    fn from(receiver: watch::Receiver<SessionState>) -> Self {
        SessionView(receiver)
    }
}
