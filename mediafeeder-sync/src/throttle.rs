use mediafeeder_models::PlaybackState;
use std::time::Duration;

pub const MINIMUM_SAVE_FREQUENCY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveDecision {
    Save,
    Skip,
    /// Seek to the pending restore position instead of saving.
    RestoreSeek(u32),
}

/// Inputs to a save decision, captured from the session state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaveCheck {
    pub state: PlaybackState,
    pub position: u32,
    /// Time since the last save or restore. `None` when nothing was saved for
    /// the current video yet.
    pub since_last_save: Option<Duration>,
    pub pending_restore: Option<u32>,
    /// Save now regardless of the interval, e.g. because playback paused.
    pub hint: bool,
}

pub fn decide(check: &SaveCheck) -> SaveDecision {
    if !check.state.has_position() {
        return SaveDecision::Skip;
    }

    // The position still belongs to the start of the video until the restore
    // seek has happened.
    if let Some(restore) = check.pending_restore {
        return if check.position >= 1 {
            SaveDecision::RestoreSeek(restore)
        } else {
            SaveDecision::Skip
        };
    }

    if check.position == 0 {
        return SaveDecision::Skip;
    }

    if check.hint {
        return SaveDecision::Save;
    }

    match check.since_last_save {
        Some(elapsed) if elapsed <= MINIMUM_SAVE_FREQUENCY => SaveDecision::Skip,
        _ => SaveDecision::Save,
    }
}
