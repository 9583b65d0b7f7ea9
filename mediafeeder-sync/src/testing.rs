use crate::{
    Error, Result,
    api::CoordinationApi,
    capability::{Capabilities, ContentId, Direction, PlayerCapability},
    transport::Connector,
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt, channel::mpsc};
use mediafeeder_client::stream::{ReplyStream, RequestSink};
use mediafeeder_models::{SessionReply, SessionRequest, VideoId, VideoReply};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Server side of one in-memory session stream.
pub(crate) struct FakeServer {
    requests: mpsc::UnboundedReceiver<SessionRequest>,
    replies: mpsc::UnboundedSender<mediafeeder_client::Result<SessionReply>>,
}

impl FakeServer {
    pub(crate) async fn next_request(&mut self) -> SessionRequest {
        tokio::time::timeout(Duration::from_secs(10), self.requests.next())
            .await
            .expect("no request within 10s")
            .expect("stream closed")
    }

    /// Next request that is not an identity announcement.
    pub(crate) async fn next_status(&mut self) -> SessionRequest {
        loop {
            let request = self.next_request().await;
            if request.title.is_none() {
                return request;
            }
        }
    }

    /// Everything sent so far.
    pub(crate) async fn drain(&mut self) -> Vec<SessionRequest> {
        let mut requests = vec![];
        while let Ok(Some(request)) =
            tokio::time::timeout(Duration::from_millis(10), self.requests.next()).await
        {
            requests.push(request);
        }
        requests
    }

    pub(crate) async fn nothing_within(&mut self, duration: Duration) -> bool {
        tokio::time::timeout(duration, self.requests.next())
            .await
            .is_err()
    }

    pub(crate) async fn closed(&mut self) -> bool {
        matches!(
            tokio::time::timeout(Duration::from_secs(10), self.requests.next()).await,
            Ok(None)
        )
    }

    pub(crate) fn reply(&self, reply: SessionReply) {
        self.replies.unbounded_send(Ok(reply)).unwrap();
    }

    pub(crate) fn fail(&self, error: mediafeeder_client::Error) {
        self.replies.unbounded_send(Err(error)).unwrap();
    }
}

/// Connector handing every new connection's server side to the test.
#[derive(Clone)]
pub(crate) struct FakeConnector {
    servers: UnboundedSender<FakeServer>,
    failures: Arc<AtomicU32>,
    attempts: Arc<AtomicU32>,
}

impl FakeConnector {
    pub(crate) fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

pub(crate) fn fake_connector() -> (FakeConnector, UnboundedReceiver<FakeServer>) {
    let (servers, receiver) = unbounded_channel();
    let connector = FakeConnector {
        servers,
        failures: Default::default(),
        attempts: Default::default(),
    };

    (connector, receiver)
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<(RequestSink, ReplyStream)> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Connection {
                message: "connection refused".into(),
            });
        }

        let (request_tx, request_rx) = mpsc::unbounded();
        let (reply_tx, reply_rx) = mpsc::unbounded();

        self.servers
            .send(FakeServer {
                requests: request_rx,
                replies: reply_tx,
            })
            .unwrap();

        let sink = request_tx.sink_map_err(|error| mediafeeder_client::Error::Stream {
            message: error.to_string(),
        });

        Ok((Box::pin(sink), Box::pin(reply_rx)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    EnsureReady,
    PlayVideo(VideoId),
    PlayPause,
    PauseIfPlaying,
    Seek(u32),
    ChangeVolume(Direction),
    ChangeRate(f64),
    ToggleSubtitles,
}

/// Backend that records every call and always succeeds.
#[derive(Clone, Default)]
pub(crate) struct RecordingPlayer {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingPlayer {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn played(&self) -> Vec<VideoId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PlayVideo(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn seeks(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Seek(position) => Some(position),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn rates(&self) -> Vec<f64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::ChangeRate(rate) => Some(rate),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub(crate) fn content_id(video_id: VideoId) -> ContentId {
    format!("content-{video_id}")
}

#[async_trait]
impl PlayerCapability for RecordingPlayer {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            volume_change: true,
            rate_change: true,
            subtitles: true,
        }
    }

    async fn ensure_ready(&mut self) -> Result<()> {
        self.record(Call::EnsureReady);
        Ok(())
    }

    async fn play_video(&mut self, video: &VideoReply) -> Result<ContentId> {
        self.record(Call::PlayVideo(video.id));
        Ok(content_id(video.id))
    }

    async fn play_pause(&mut self) -> Result<()> {
        self.record(Call::PlayPause);
        Ok(())
    }

    async fn pause_if_playing(&mut self) -> Result<()> {
        self.record(Call::PauseIfPlaying);
        Ok(())
    }

    async fn seek(&mut self, position: u32) -> Result<()> {
        self.record(Call::Seek(position));
        Ok(())
    }

    async fn change_volume(&mut self, direction: Direction) -> Result<()> {
        self.record(Call::ChangeVolume(direction));
        Ok(())
    }

    async fn change_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.record(Call::ChangeRate(rate));
        Ok(())
    }

    async fn toggle_subtitles(&mut self) -> Result<()> {
        self.record(Call::ToggleSubtitles);
        Ok(())
    }
}

/// Coordination API that serves made-up metadata and records writes.
#[derive(Clone, Default)]
pub(crate) struct RecordingApi {
    missing: Arc<Mutex<Vec<VideoId>>>,
    watched: Arc<Mutex<Vec<VideoId>>>,
    saves: Arc<Mutex<Vec<(VideoId, u32)>>>,
}

impl RecordingApi {
    pub(crate) fn set_missing(&self, id: VideoId) {
        self.missing.lock().unwrap().push(id);
    }

    pub(crate) fn watched(&self) -> Vec<VideoId> {
        self.watched.lock().unwrap().clone()
    }

    pub(crate) fn saves(&self) -> Vec<(VideoId, u32)> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl CoordinationApi for RecordingApi {
    async fn video(&self, id: VideoId) -> Result<VideoReply> {
        if self.missing.lock().unwrap().contains(&id) {
            return Err(Error::Client {
                message: format!("video {id} not found"),
            });
        }

        Ok(VideoReply {
            id,
            title: format!("Video {id}"),
            video_id: format!("provider-{id}"),
            media_url: Some(format!("https://media.example/{id}.mp4")),
            ..Default::default()
        })
    }

    async fn watched(&self, id: VideoId) -> Result<()> {
        self.watched.lock().unwrap().push(id);
        Ok(())
    }

    async fn save_position(&self, id: VideoId, position: u32) -> Result<()> {
        self.saves.lock().unwrap().push((id, position));
        Ok(())
    }
}
