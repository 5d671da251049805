use async_trait::async_trait;
use serde_json::Value;

use crate::lyrics::model::LyricLine;
use crate::track::{color::ColorPayload, error::FetchError};

#[async_trait]
pub trait AnalysisFetch: Send + Sync {
    /// Raw analysis document. Schema validation happens in the controller.
    async fn fetch_analysis(&self, track_id: &str) -> Result<Value, FetchError>;
}

#[async_trait]
pub trait ColorFetch: Send + Sync {
    async fn fetch_color(&self, artwork: &str) -> Result<Option<ColorPayload>, FetchError>;
}

#[async_trait]
pub trait LyricsFetch: Send + Sync {
    async fn fetch_lyrics(&self, track_id: &str) -> Result<Vec<LyricLine>, FetchError>;
}
