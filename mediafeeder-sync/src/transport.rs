use crate::{
    Error, Result,
    events::{EventSender, RemoteCommand},
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use mediafeeder_client::stream::{self, ReplyStream, RequestSink};
use mediafeeder_models::{SessionRequest, StatusUpdate, VideoId};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{
        Mutex,
        mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    },
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, info, instrument, warn};

/// Delay before the identity announcement is repeated on a fresh connection.
pub const REANNOUNCE_DELAY: Duration = Duration::from_secs(2);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECT_ATTEMPTS: u32 = 5;
const MIN_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Opens the bidirectional session stream.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<(RequestSink, ReplyStream)>;
}

#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: CONNECT_TIMEOUT,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<(RequestSink, ReplyStream)> {
        stream::connect(&self.address, self.timeout)
            .await
            .map_err(|error| Error::Connection {
                message: error.to_string(),
            })
    }
}

type Outbound = Arc<Mutex<UnboundedReceiver<SessionRequest>>>;

/// Owns the session stream: an outbound FIFO drained by a writer task and a
/// reader task that forwards decoded commands to the session loop.
///
/// Every connection gets a new epoch. Commands are tagged with the epoch of
/// the reader that decoded them so the loop can drop anything left over from
/// a dead connection.
pub struct SessionTransport {
    connector: Box<dyn Connector>,
    title: String,
    events: EventSender,
    outbound_tx: UnboundedSender<SessionRequest>,
    outbound_rx: Outbound,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    announcer: Option<JoinHandle<()>>,
    epoch: u64,
}

impl SessionTransport {
    pub fn new(connector: Box<dyn Connector>, title: impl Into<String>, events: EventSender) -> Self {
        let (outbound_tx, outbound_rx) = unbounded_channel();

        Self {
            connector,
            title: title.into(),
            events,
            outbound_tx,
            outbound_rx: Arc::new(Mutex::new(outbound_rx)),
            reader: None,
            writer: None,
            announcer: None,
            epoch: 0,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether both stream tasks are still running.
    pub fn is_connected(&self) -> bool {
        let running = |task: &Option<JoinHandle<()>>| task.as_ref().is_some_and(|t| !t.is_finished());
        running(&self.reader) && running(&self.writer)
    }

    /// Establish the stream and announce the player together with the video
    /// it is currently playing. The announcement is repeated after
    /// [`REANNOUNCE_DELAY`].
    #[instrument(skip(self))]
    pub async fn connect(&mut self, current_video_id: Option<VideoId>) -> Result<()> {
        self.cancel_tasks();

        let (sink, replies) = self.connect_with_backoff().await?;
        self.epoch += 1;
        info!(epoch = self.epoch, "connected to coordination service");

        let announce = SessionRequest::announce(&self.title, current_video_id);

        self.reader = Some(tokio::spawn(read_loop(
            replies,
            self.epoch,
            self.events.clone(),
        )));
        self.writer = Some(tokio::spawn(write_loop(
            sink,
            announce.clone(),
            self.outbound_rx.clone(),
        )));

        let outbound = self.outbound_tx.clone();
        self.announcer = Some(tokio::spawn(async move {
            sleep(REANNOUNCE_DELAY).await;
            if outbound.send(announce).is_err() {
                debug!("transport dropped before re-announcing");
            }
        }));

        Ok(())
    }

    /// Drop the current stream, if any, and connect again.
    pub async fn reconnect(&mut self, current_video_id: Option<VideoId>) -> Result<()> {
        warn!("session stream is down, reconnecting");
        self.connect(current_video_id).await
    }

    /// Queue a status report. Empty reports are not sent.
    pub fn send(&self, update: StatusUpdate) {
        if update.is_empty() {
            return;
        }

        self.request(SessionRequest::status(update));
    }

    /// Queue any request. Requests queued while disconnected go out after the
    /// next announcement.
    pub fn request(&self, request: SessionRequest) {
        if let Err(error) = self.outbound_tx.send(request) {
            debug!("outbound queue closed, dropping {:?}", error.0);
        }
    }

    /// Tell the service the session is over and stop all stream tasks.
    pub async fn shutdown(&mut self) {
        for task in [self.announcer.take(), self.reader.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }

        let Some(mut writer) = self.writer.take() else {
            return;
        };

        if writer.is_finished() {
            return;
        }

        self.request(SessionRequest::end_session());

        if tokio::time::timeout(SHUTDOWN_GRACE, &mut writer)
            .await
            .is_err()
        {
            warn!("timed out ending session");
            writer.abort();
        }
    }

    fn cancel_tasks(&mut self) {
        for task in [
            self.announcer.take(),
            self.reader.take(),
            self.writer.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }

    async fn connect_with_backoff(&self) -> Result<(RequestSink, ReplyStream)> {
        let mut backoff = MIN_BACKOFF;
        let mut attempt = 1;

        loop {
            match self.connector.connect().await {
                Ok(connection) => return Ok(connection),
                Err(error) if attempt >= CONNECT_ATTEMPTS => return Err(error),
                Err(error) => {
                    let delay = backoff_delay(backoff);
                    warn!(%error, attempt, "connection failed, retrying in {delay:?}");
                    sleep(delay).await;

                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                }
            }
        }
    }
}

impl Drop for SessionTransport {
    fn drop(&mut self) {
        self.cancel_tasks();
    }
}

/// `base` with up to 30% jitter either way.
fn backoff_delay(base: Duration) -> Duration {
    let jitter = base.mul_f64(rand::random::<f64>() * 0.3);

    if rand::random() {
        base + jitter
    } else {
        base.saturating_sub(jitter)
    }
}

async fn write_loop(mut sink: RequestSink, announce: SessionRequest, outbound: Outbound) {
    if let Err(error) = sink.send(announce).await {
        warn!(%error, "failed to announce session");
        return;
    }

    let mut outbound = outbound.lock().await;

    while let Some(request) = outbound.recv().await {
        let end_session = request.end_session;

        if let Err(error) = sink.send(request).await {
            warn!(%error, "failed to send to coordination service");
            return;
        }

        if end_session {
            break;
        }
    }

    if let Err(error) = sink.close().await {
        debug!(%error, "failed to close session stream");
    }
}

async fn read_loop(mut replies: ReplyStream, epoch: u64, events: EventSender) {
    while let Some(reply) = replies.next().await {
        match reply {
            Ok(reply) => {
                debug!(?reply, "message from coordination service");
                for command in RemoteCommand::from_reply(reply) {
                    events.remote(epoch, command);
                }
            }
            Err(mediafeeder_client::Error::DeserializeJSON { message }) => {
                warn!("skipping malformed message: {message}");
            }
            Err(error) => {
                warn!(%error, "session stream failed");
                return;
            }
        }
    }

    info!("session stream closed by coordination service");
}
