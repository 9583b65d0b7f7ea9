use crate::{
    Error, NoBusSnafu, NoMediaUrlSnafu, Result,
    translator::{LocalState, LocalStatus, LocalTranslator},
};
use async_trait::async_trait;
use futures::StreamExt;
use gstreamer::{
    ClockTime, Element, Message, MessageView, SeekFlags, SeekType, State as GstState,
    StateChangeSuccess, prelude::*,
};
use mediafeeder_models::VideoReply;
use mediafeeder_sync::{
    capability::{Capabilities, ContentId, Direction, PlayerCapability},
    events::EventSender,
    translator::TranslatorHandle,
};
use snafu::prelude::*;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, instrument};

const VOLUME_STEP: f64 = 0.1;
const CLOCK_INTERVAL: Duration = Duration::from_secs(1);

/// Plays media URLs in a local playbin and reports back through a
/// [`LocalTranslator`].
pub struct LocalPlayer {
    playbin: Element,
    target: Arc<RwLock<GstState>>,
    is_live: Arc<AtomicBool>,
    handle: TranslatorHandle<LocalTranslator>,
    tasks: Vec<JoinHandle<()>>,
}

impl LocalPlayer {
    /// Build the pipeline and start watching it. Must be called from within a
    /// tokio runtime.
    pub fn new(events: EventSender) -> Result<Self> {
        gstreamer::init()?;

        let version = gstreamer::version();
        debug!(?version, "gstreamer initialized");

        let playbin = gstreamer::ElementFactory::make("playbin3").build()?;
        playbin.set_property_from_str("flags", "audio+video+text+soft-volume+buffering");

        let bus = playbin.bus().context(NoBusSnafu)?;
        let target = Arc::new(RwLock::new(GstState::Null));
        let is_live = Arc::new(AtomicBool::new(false));
        let handle = TranslatorHandle::new(LocalTranslator::new(), events);

        let tasks = vec![
            tokio::spawn(bus_loop(
                bus,
                playbin.clone(),
                target.clone(),
                is_live.clone(),
                handle.clone(),
            )),
            tokio::spawn(clock_loop(playbin.clone(), handle.clone())),
        ];

        Ok(Self {
            playbin,
            target,
            is_live,
            handle,
            tasks,
        })
    }

    fn is_playing(&self) -> bool {
        self.playbin.current_state() == GstState::Playing
    }

    async fn play(&self) -> Result<()> {
        *self.target.write().await = GstState::Playing;
        set_state(&self.playbin, &self.is_live, GstState::Playing)
    }

    async fn pause(&self) -> Result<()> {
        *self.target.write().await = GstState::Paused;
        set_state(&self.playbin, &self.is_live, GstState::Paused)
    }
}

impl Drop for LocalPlayer {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }

        if let Err(error) = self.playbin.set_state(GstState::Null) {
            debug!(?error, "failed to stop playbin");
        }
    }
}

#[async_trait]
impl PlayerCapability for LocalPlayer {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            volume_change: true,
            rate_change: true,
            subtitles: false,
        }
    }

    async fn ensure_ready(&mut self) -> mediafeeder_sync::Result<()> {
        if self.playbin.current_state() == GstState::Null {
            set_state(&self.playbin, &self.is_live, GstState::Ready)?;
        }

        Ok(())
    }

    #[instrument(skip(self, video), fields(id = video.id))]
    async fn play_video(&mut self, video: &VideoReply) -> mediafeeder_sync::Result<ContentId> {
        let uri = video
            .media_url
            .clone()
            .context(NoMediaUrlSnafu { id: video.id })?;

        *self.target.write().await = GstState::Playing;
        set_state(&self.playbin, &self.is_live, GstState::Ready)?;
        self.is_live.store(false, Ordering::Relaxed);
        self.playbin.set_property("uri", &uri);
        self.play().await?;

        Ok(uri)
    }

    async fn play_pause(&mut self) -> mediafeeder_sync::Result<()> {
        if self.is_playing() {
            self.pause().await?;
        } else {
            self.play().await?;
        }

        Ok(())
    }

    async fn pause_if_playing(&mut self) -> mediafeeder_sync::Result<()> {
        if self.is_playing() {
            self.pause().await?;
        }

        Ok(())
    }

    async fn seek(&mut self, position: u32) -> mediafeeder_sync::Result<()> {
        self.playbin
            .seek_simple(
                SeekFlags::FLUSH | SeekFlags::KEY_UNIT,
                ClockTime::from_seconds(u64::from(position)),
            )
            .map_err(Error::from)?;

        Ok(())
    }

    async fn change_volume(&mut self, direction: Direction) -> mediafeeder_sync::Result<()> {
        let volume = self.playbin.property::<f64>("volume");
        let volume = match direction {
            Direction::Up => volume + VOLUME_STEP,
            Direction::Down => volume - VOLUME_STEP,
        }
        .clamp(0.0, 1.0);

        self.playbin.set_property("volume", volume);
        self.handle.deliver(&LocalStatus::Volume(volume));

        Ok(())
    }

    async fn change_playback_rate(&mut self, rate: f64) -> mediafeeder_sync::Result<()> {
        let position = self
            .playbin
            .query_position::<ClockTime>()
            .unwrap_or_default();

        self.playbin
            .seek(
                rate,
                SeekFlags::FLUSH | SeekFlags::ACCURATE,
                SeekType::Set,
                position,
                SeekType::None,
                ClockTime::NONE,
            )
            .map_err(Error::from)?;

        self.handle.deliver(&LocalStatus::Rate(rate));

        Ok(())
    }
}

fn set_state(playbin: &Element, is_live: &AtomicBool, state: GstState) -> Result<()> {
    match playbin.set_state(state)? {
        StateChangeSuccess::Success => debug!(?state, "state changed"),
        StateChangeSuccess::Async => debug!(?state, "state change pending"),
        StateChangeSuccess::NoPreroll => {
            debug!("stream is live");
            is_live.store(true, Ordering::Relaxed);
        }
    }

    Ok(())
}

async fn bus_loop(
    bus: gstreamer::Bus,
    playbin: Element,
    target: Arc<RwLock<GstState>>,
    is_live: Arc<AtomicBool>,
    handle: TranslatorHandle<LocalTranslator>,
) {
    let mut messages = bus.stream();

    while let Some(message) = messages.next().await {
        if let Err(error) = handle_message(&message, &playbin, &target, &is_live, &handle).await {
            debug!(?error, "failed to handle bus message");
        }
    }
}

async fn handle_message(
    message: &Message,
    playbin: &Element,
    target: &RwLock<GstState>,
    is_live: &AtomicBool,
    handle: &TranslatorHandle<LocalTranslator>,
) -> Result<()> {
    match message.view() {
        MessageView::Eos(_) => {
            debug!("end of stream");
            let uri = playbin.property::<Option<String>>("uri");

            *target.write().await = GstState::Ready;
            set_state(playbin, is_live, GstState::Ready)?;
            handle.deliver(&LocalStatus::EndOfStream { uri });
        }
        MessageView::Buffering(buffering) => {
            if is_live.load(Ordering::Relaxed) {
                return Ok(());
            }

            let percent = buffering.percent();
            let wants_playing = *target.read().await == GstState::Playing;

            // Hold the pipeline in paused while the buffer fills, without
            // touching the requested state.
            if percent < 100 && playbin.current_state() == GstState::Playing {
                set_state(playbin, is_live, GstState::Paused)?;
            } else if percent >= 100 && wants_playing {
                set_state(playbin, is_live, GstState::Playing)?;
            }

            handle.deliver(&LocalStatus::Buffering { percent });
        }
        MessageView::StateChanged(changed) => {
            if changed.src() != Some(playbin.upcast_ref::<gstreamer::Object>()) {
                return Ok(());
            }

            let current = changed.current();
            if *target.read().await != current {
                return Ok(());
            }

            let state = match current {
                GstState::Playing => LocalState::Playing,
                GstState::Paused => LocalState::Paused,
                GstState::Null => LocalState::Stopped,
                // End of stream and errors already report the player idle.
                _ => return Ok(()),
            };

            debug!(?current, "player state changed");
            handle.deliver(&LocalStatus::StateChanged(state));
        }
        MessageView::ClockLost(_) => {
            tracing::warn!("clock lost, restarting playback");
            set_state(playbin, is_live, GstState::Paused)?;
            set_state(playbin, is_live, GstState::Playing)?;
        }
        MessageView::Error(error) => {
            tracing::error!(
                "error from {:?}: {} ({:?})",
                error.src().map(|source| source.path_string()),
                error.error(),
                error.debug()
            );

            *target.write().await = GstState::Ready;
            set_state(playbin, is_live, GstState::Ready)?;
            handle.deliver(&LocalStatus::Error {
                message: error.error().to_string(),
            });
        }
        _ => (),
    }

    Ok(())
}

/// Reports the position once a second while playing.
async fn clock_loop(playbin: Element, handle: TranslatorHandle<LocalTranslator>) {
    let mut interval = tokio::time::interval(CLOCK_INTERVAL);
    let mut last_position = ClockTime::default();

    loop {
        interval.tick().await;

        if playbin.current_state() != GstState::Playing {
            continue;
        }

        if let Some(position) = playbin.query_position::<ClockTime>()
            && position.seconds() != last_position.seconds()
        {
            last_position = position;

            handle.deliver(&LocalStatus::Position {
                position: Duration::from_nanos(position.nseconds()),
                duration: playbin
                    .query_duration::<ClockTime>()
                    .map(|duration| Duration::from_nanos(duration.nseconds())),
            });
        }
    }
}
