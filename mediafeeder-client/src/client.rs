use crate::{Error, Result};
use mediafeeder_models::{VideoId, VideoReply};
use reqwest::{
    Method, Response, StatusCode,
    header::{HeaderMap, HeaderValue},
};
use serde::Serialize;
use std::{fmt::Display, time::Duration};
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// One-shot request/response calls against the coordination service.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    client: reqwest::Client,
    token: Option<String>,
}

pub fn new(base_url: &str, token: Option<String>) -> Result<Client> {
    // Url::join drops the last path segment unless the base ends with a slash.
    let base_url = if base_url.ends_with('/') {
        Url::parse(base_url)?
    } else {
        Url::parse(&format!("{base_url}/"))?
    };

    let http_client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("mediafeeder-player/", env!("CARGO_PKG_VERSION")))
        .build()?;

    Ok(Client {
        base_url,
        client: http_client,
        token,
    })
}

enum Endpoint {
    Video(VideoId),
    Watched(VideoId),
    Position(VideoId),
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Video(id) => write!(f, "video/{id}"),
            Endpoint::Watched(id) => write!(f, "video/{id}/watched"),
            Endpoint::Position(id) => write!(f, "video/{id}/position"),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WatchedRequest {
    watched: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PositionRequest {
    position: u32,
}

macro_rules! get {
    ($self:ident, $endpoint:expr) => {
        match $self.make_call(Method::GET, $endpoint, None::<&()>).await {
            Ok(response) => match serde_json::from_str(response.as_str()) {
                Ok(item) => Ok(item),
                Err(error) => Err(Error::DeserializeJSON {
                    message: error.to_string(),
                }),
            },
            Err(error) => Err(error),
        }
    };
}

macro_rules! post {
    ($self:ident, $endpoint:expr, $body:expr) => {
        match $self.make_call(Method::POST, $endpoint, Some($body)).await {
            Ok(_) => Ok(()),
            Err(error) => Err(error),
        }
    };
}

impl Client {
    /// Fetch metadata for a queued video.
    pub async fn video(&self, id: VideoId) -> Result<VideoReply> {
        let endpoint = self.endpoint(Endpoint::Video(id))?;

        match get!(self, endpoint) {
            Err(Error::Api { message }) if message == StatusCode::NOT_FOUND.to_string() => {
                Err(Error::NotFound { id })
            }
            other => other,
        }
    }

    /// Record that a video was watched to the end.
    pub async fn watched(&self, id: VideoId, watched: bool) -> Result<()> {
        let endpoint = self.endpoint(Endpoint::Watched(id))?;
        post!(self, endpoint, &WatchedRequest { watched })
    }

    /// Persist the playback position of a video, in seconds.
    pub async fn save_position(&self, id: VideoId, position: u32) -> Result<()> {
        let endpoint = self.endpoint(Endpoint::Position(id))?;
        post!(self, endpoint, &PositionRequest { position })
    }

    fn endpoint(&self, endpoint: Endpoint) -> Result<Url> {
        Ok(self.base_url.join(&endpoint.to_string())?)
    }

    fn client_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(token) = &self.token
            && let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}"))
        {
            headers.insert("Authorization", value);
        }

        headers
    }

    async fn make_call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: Url,
        body: Option<&B>,
    ) -> Result<String> {
        let headers = self.client_headers();

        debug!("calling {} {}", method, endpoint);
        let request = self.client.request(method, endpoint).headers(headers);

        let response = match body {
            Some(body) => request.json(body).send().await?,
            None => request.send().await?,
        };

        self.handle_response(response).await
    }

    async fn handle_response(&self, response: Response) -> Result<String> {
        if response.status().is_success() {
            Ok(response.text().await?)
        } else {
            Err(Error::Api {
                message: response.status().to_string(),
            })
        }
    }
}
