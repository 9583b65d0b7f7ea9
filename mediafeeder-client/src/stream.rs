use crate::{Error, Result};
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use mediafeeder_models::{SessionReply, SessionRequest};
use std::{pin::Pin, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::debug;

const MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Outbound half of a playback session stream.
pub type RequestSink = Pin<Box<dyn Sink<SessionRequest, Error = Error> + Send>>;
/// Inbound half of a playback session stream. Ends when the service closes
/// the connection.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<SessionReply>> + Send>>;

/// Open a playback session stream. Frames are newline-delimited JSON.
pub async fn connect(address: &str, timeout: Duration) -> Result<(RequestSink, ReplyStream)> {
    debug!("connecting to {address}");

    let socket = match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(Ok(socket)) => socket,
        Ok(Err(error)) => {
            return Err(Error::Connect {
                address: address.to_string(),
                message: error.to_string(),
            });
        }
        Err(_) => {
            return Err(Error::ConnectTimeout {
                address: address.to_string(),
            });
        }
    };

    socket.set_nodelay(true).map_err(|error| Error::Connect {
        address: address.to_string(),
        message: error.to_string(),
    })?;

    Ok(framed(socket))
}

/// Wrap any byte stream in the session framing.
pub fn framed<T>(io: T) -> (RequestSink, ReplyStream)
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let (sink, stream) =
        Framed::new(io, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH)).split::<String>();

    let sink = sink
        .sink_map_err(Error::from)
        .with(|request: SessionRequest| {
            future::ready(serde_json::to_string(&request).map_err(Error::from))
        });

    let stream = stream.filter_map(|line| {
        future::ready(match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(serde_json::from_str::<SessionReply>(&line).map_err(Error::from)),
            Err(error) => Some(Err(Error::from(error))),
        })
    });

    (Box::pin(sink), Box::pin(stream))
}
