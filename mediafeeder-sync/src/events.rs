use crate::capability::{ContentId, Direction};
use mediafeeder_models::{SessionReply, StatusUpdate, VideoId};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::debug;

/// Queue transitions reported by a backend or requested by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    NextVideo {
        video_id: VideoId,
        restore_position: Option<u32>,
    },
    /// The backend reached the end of what it was playing. Only honored when
    /// the tag matches the content currently assigned.
    WatchedToEnd { content_id: Option<ContentId> },
    /// Playback stopped before the end, e.g. the user cancelled it.
    Abandoned,
    /// Persist the position now instead of waiting for the periodic save.
    SavePositionHint,
}

/// Instructions received over the session stream.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCommand {
    /// Toggle playback. When nothing is loaded the video and position are
    /// used to resume the session.
    PlayPause {
        video_id: Option<VideoId>,
        position: Option<u32>,
    },
    PauseIfPlaying,
    /// Mark the current video watched and move on.
    Watch,
    /// Move on without marking the current video watched.
    Skip,
    NextVideo {
        video_id: VideoId,
        restore_position: Option<u32>,
    },
    SeekRelative(i32),
    ChangeVolume(Direction),
    ChangeRate(Direction),
    ToggleSubtitles,
}

impl RemoteCommand {
    pub fn from_reply(reply: SessionReply) -> Vec<RemoteCommand> {
        let mut commands = vec![];
        let next_video_id = reply.next_video_id.filter(|id| *id > 0);

        if reply.should_play_pause {
            commands.push(RemoteCommand::PlayPause {
                video_id: next_video_id,
                position: reply.playback_position,
            });
        } else if let Some(video_id) = next_video_id {
            commands.push(RemoteCommand::NextVideo {
                video_id,
                restore_position: reply.playback_position,
            });
        }

        if reply.should_pause_if_playing {
            commands.push(RemoteCommand::PauseIfPlaying);
        }

        if reply.should_watch {
            commands.push(RemoteCommand::Watch);
        } else if reply.should_skip {
            commands.push(RemoteCommand::Skip);
        }

        if let Some(seconds) = reply.should_seek_relative_seconds.filter(|s| *s != 0) {
            commands.push(RemoteCommand::SeekRelative(seconds));
        }

        if let Some(direction) = reply.should_change_volume.and_then(Direction::from_delta) {
            commands.push(RemoteCommand::ChangeVolume(direction));
        }

        if let Some(direction) = reply.should_change_rate.and_then(Direction::from_delta) {
            commands.push(RemoteCommand::ChangeRate(direction));
        }

        if reply.should_toggle_subtitles {
            commands.push(RemoteCommand::ToggleSubtitles);
        }

        commands
    }
}

#[derive(Debug)]
pub(crate) enum Event {
    Queue(QueueEvent),
    Status(StatusUpdate),
    /// A command read by the stream reader of connection `epoch`.
    Remote {
        epoch: u64,
        command: RemoteCommand,
    },
    Quit,
}

/// Handle for anything that needs to hand control back to the session loop.
/// Sending never blocks and never fails; events sent after the loop stopped
/// are dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: UnboundedSender<Event>,
}

impl EventSender {
    pub fn queue(&self, event: QueueEvent) {
        self.send(Event::Queue(event));
    }

    pub fn status(&self, update: StatusUpdate) {
        self.send(Event::Status(update));
    }

    /// Ask the loop to end the session and return.
    pub fn quit(&self) {
        self.send(Event::Quit);
    }

    pub(crate) fn remote(&self, epoch: u64, command: RemoteCommand) {
        self.send(Event::Remote { epoch, command });
    }

    fn send(&self, event: Event) {
        if let Err(error) = self.tx.send(event) {
            debug!("session loop has stopped, dropping {:?}", error.0);
        }
    }
}

/// Receiving end of the session loop's queue.
#[derive(Debug)]
pub struct EventReceiver {
    rx: UnboundedReceiver<Event>,
}

impl EventReceiver {
    pub(crate) async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}
