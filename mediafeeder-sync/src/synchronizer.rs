use crate::{
    Result,
    api::CoordinationApi,
    capability::{PlayerCapability, step_rate},
    events::{Event, EventReceiver, EventSender, QueueEvent, RemoteCommand},
    session::{SessionState, SessionView},
    throttle::{self, SaveCheck, SaveDecision},
    transport::{Connector, SessionTransport},
};
use mediafeeder_models::{SessionRequest, StatusUpdate, VideoId};
use std::time::Duration;
use tokio::{sync::watch, time::Instant};
use tracing::{debug, error, info, instrument, warn};

/// Longest the loop waits for an event before re-checking the connection and
/// the save clock.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Display name announced to the coordination service.
    pub title: String,
    pub poll_interval: Duration,
}

impl SessionOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub struct Synchronizer<P, A> {
    player: P,
    api: A,
    transport: SessionTransport,
    events: EventSender,
    receiver: EventReceiver,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    poll_interval: Duration,
}

impl<P: PlayerCapability, A: CoordinationApi> Synchronizer<P, A> {
    pub fn new(
        player: P,
        api: A,
        connector: Box<dyn Connector>,
        (events, receiver): (EventSender, EventReceiver),
        options: SessionOptions,
    ) -> Self {
        let transport = SessionTransport::new(connector, options.title, events.clone());
        let (state_tx, _) = watch::channel(SessionState::default());

        Self {
            player,
            api,
            transport,
            events,
            receiver,
            state: SessionState::default(),
            state_tx,
            poll_interval: options.poll_interval,
        }
    }

    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub fn session(&self) -> SessionView {
        self.state_tx.subscribe().into()
    }

    /// Run the session until [`EventSender::quit`] is called. Fails only when
    /// the coordination service cannot be reached at startup.
    #[instrument(skip(self))]
    pub async fn session_loop(&mut self) -> Result<()> {
        if let Err(error) = self.player.ensure_ready().await {
            warn!(%error, "backend is not ready");
        }

        self.transport.connect(self.state.current_video_id).await?;
        self.announce_capabilities();

        if self.state.current_video_id.is_none() {
            self.transport.request(SessionRequest::pop_next_video());
        }

        loop {
            if !self.transport.is_connected() {
                match self.transport.reconnect(self.state.current_video_id).await {
                    Ok(()) => self.announce_capabilities(),
                    Err(error) => error!(%error, "unable to reconnect"),
                }
            }

            if let Ok(event) = tokio::time::timeout(self.poll_interval, self.receiver.recv()).await
            {
                let break_received = match event {
                    Some(event) => self.handle_event(event).await,
                    None => true,
                };

                if break_received {
                    break;
                }
            }

            self.save_position(false).await;
            self.publish();
        }

        info!("ending session");
        self.transport.shutdown().await;
        self.publish();

        Ok(())
    }

    async fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Queue(event) => {
                self.handle_queue_event(event).await;
                false
            }
            Event::Status(update) => {
                self.state.apply(&update);
                self.transport.send(update);
                false
            }
            Event::Remote { epoch, command } => {
                if epoch == self.transport.epoch() {
                    self.handle_command(command).await;
                } else {
                    debug!(epoch, ?command, "dropping command from a previous connection");
                }
                false
            }
            Event::Quit => true,
        }
    }

    async fn handle_queue_event(&mut self, event: QueueEvent) {
        match event {
            QueueEvent::NextVideo {
                video_id,
                restore_position,
            } => self.play_next(video_id, restore_position).await,
            QueueEvent::WatchedToEnd { content_id: None } => {
                warn!("dropping finish notification without a content id");
            }
            QueueEvent::WatchedToEnd {
                content_id: Some(content_id),
            } => {
                if self.state.current_content_id.as_ref() == Some(&content_id) {
                    info!("finished {content_id}");
                    self.finish(true).await;
                } else {
                    info!(
                        current = ?self.state.current_content_id,
                        "ignoring finish for {content_id}"
                    );
                }
            }
            QueueEvent::Abandoned => {
                if let Some(video_id) = self.state.current_video_id {
                    info!("video {video_id} abandoned");
                    self.state.clear();
                }
            }
            QueueEvent::SavePositionHint => self.save_position(true).await,
        }
    }

    async fn handle_command(&mut self, command: RemoteCommand) {
        debug!(?command, "remote command");

        let result = match command {
            RemoteCommand::PlayPause {
                video_id: Some(video_id),
                position,
            } if self.state.current_video_id.is_none() => {
                info!("resuming video {video_id}");
                self.play_next(video_id, position).await;
                Ok(())
            }
            RemoteCommand::PlayPause { .. } => self.player.play_pause().await,
            RemoteCommand::PauseIfPlaying => self.player.pause_if_playing().await,
            RemoteCommand::Watch => {
                info!("marking watched and skipping");
                self.finish(true).await;
                Ok(())
            }
            RemoteCommand::Skip => {
                info!("skipping");
                self.finish(false).await;
                Ok(())
            }
            RemoteCommand::NextVideo {
                video_id,
                restore_position,
            } => {
                self.play_next(video_id, restore_position).await;
                Ok(())
            }
            RemoteCommand::SeekRelative(seconds) => {
                let target = (i64::from(self.state.now_position) + i64::from(seconds)).max(0);
                self.player
                    .seek(u32::try_from(target).unwrap_or(u32::MAX))
                    .await
            }
            RemoteCommand::ChangeVolume(direction) => self.player.change_volume(direction).await,
            RemoteCommand::ChangeRate(direction) => {
                let rate = step_rate(self.state.now_rate, direction);
                let result = self.player.change_playback_rate(rate).await;
                if result.is_ok() {
                    self.state.now_rate = rate;
                }
                result
            }
            RemoteCommand::ToggleSubtitles => self.player.toggle_subtitles().await,
        };

        if let Err(error) = result {
            warn!(%error, "backend command failed");
        }
    }

    /// Replace whatever is playing with `video_id`. A video that is already
    /// assigned and active is left alone.
    async fn play_next(&mut self, video_id: VideoId, restore_position: Option<u32>) {
        if self.state.is_active(video_id) {
            debug!("video {video_id} is already playing");
            return;
        }

        let video = match self.api.video(video_id).await {
            Ok(video) => video,
            Err(error) => {
                // Move past a video the service cannot describe.
                error!(%error, "unable to fetch video {video_id}, skipping");
                self.transport.request(SessionRequest::pop_next_video());
                return;
            }
        };

        info!("playing {video_id}: {} [{}]", video.title, video.video_id);

        self.state.assign(video_id, restore_position, Instant::now());
        self.transport.send(StatusUpdate::with_video_id(video_id));

        if let Err(error) = self.player.ensure_ready().await {
            warn!(%error, "backend is not ready");
        }

        match self.player.play_video(&video).await {
            Ok(content_id) => self.state.current_content_id = Some(content_id),
            Err(error) => warn!(%error, "backend failed to play video {video_id}"),
        }
    }

    /// Leave the current video and ask the service for the next one.
    async fn finish(&mut self, mark_watched: bool) {
        if mark_watched
            && let Some(video_id) = self.state.current_video_id
            && let Err(error) = self.api.watched(video_id).await
        {
            error!(%error, "unable to mark video {video_id} watched");
        }

        self.state.clear();
        self.transport.request(SessionRequest::pop_next_video());
    }

    async fn save_position(&mut self, hint: bool) {
        let Some(video_id) = self.state.current_video_id else {
            return;
        };

        let now = Instant::now();
        let check = SaveCheck {
            state: self.state.now_state,
            position: self.state.now_position,
            since_last_save: self
                .state
                .last_save_position_time
                .map(|saved| now.duration_since(saved)),
            pending_restore: self.state.position_to_restore,
            hint,
        };

        match throttle::decide(&check) {
            SaveDecision::Skip => {}
            SaveDecision::RestoreSeek(position) => {
                info!("restoring video {video_id} to {position}s");
                self.state.position_to_restore = None;
                self.state.last_save_position_time = Some(now);

                if let Err(error) = self.player.seek(position).await {
                    warn!(%error, "unable to restore position");
                }
            }
            SaveDecision::Save => {
                self.state.last_save_position_time = Some(now);

                if let Err(error) = self.api.save_position(video_id, check.position).await {
                    warn!(%error, "unable to save position of video {video_id}");
                }
            }
        }
    }

    fn announce_capabilities(&self) {
        self.transport.send(self.player.capabilities().as_status());
    }

    fn publish(&self) {
        let state = &self.state;
        self.state_tx.send_if_modified(|published| {
            if *published == *state {
                false
            } else {
                *published = state.clone();
                true
            }
        });
    }
}
