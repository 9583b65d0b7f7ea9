use crate::Result;
use async_trait::async_trait;
use mediafeeder_client::client::Client;
use mediafeeder_models::{VideoId, VideoReply};

/// One-shot calls the session loop makes against the coordination service.
#[async_trait]
pub trait CoordinationApi: Send + Sync {
    async fn video(&self, id: VideoId) -> Result<VideoReply>;

    async fn watched(&self, id: VideoId) -> Result<()>;

    async fn save_position(&self, id: VideoId, position: u32) -> Result<()>;
}

#[async_trait]
impl CoordinationApi for Client {
    async fn video(&self, id: VideoId) -> Result<VideoReply> {
        Ok(Client::video(self, id).await?)
    }

    async fn watched(&self, id: VideoId) -> Result<()> {
        Ok(Client::watched(self, id, true).await?)
    }

    async fn save_position(&self, id: VideoId, position: u32) -> Result<()> {
        Ok(Client::save_position(self, id, position).await?)
    }
}
