use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url, header::CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

use crate::{
    config::AppConfig,
    lyrics::model::{LyricLine, parse_lrc, parse_lyrics_json},
    track::{
        color::ColorPayload,
        error::FetchError,
        traits::{AnalysisFetch, ColorFetch, LyricsFetch},
    },
};

const USER_AGENT: &str = concat!("auralis/", env!("CARGO_PKG_VERSION"));

pub struct ApiService {
    client: Client,
    base: String,
    token: Option<String>,
}

impl ApiService {
    pub fn new(config: &AppConfig) -> color_eyre::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
        let raw = format!("{}{}", self.base, path);
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        url.map_err(|e| FetchError::Network(e.to_string()))
    }

    async fn send(&self, url: Url, what: &str) -> Result<Response, FetchError> {
        debug!(url = %url, "http_get");
        let response = self.get(url).send().await?;
        check_status(response.status(), what)?;
        Ok(response)
    }
}

fn check_status(status: StatusCode, what: &str) -> Result<(), FetchError> {
    if status == StatusCode::NOT_FOUND {
        Err(FetchError::NotFound(what.to_string()))
    } else if !status.is_success() {
        Err(FetchError::Status(status.as_u16()))
    } else {
        Ok(())
    }
}

/// Lyrics bodies are either the JSON lines document or plain LRC text.
pub fn decode_lyrics(body: &str) -> Result<Vec<LyricLine>, FetchError> {
    if body.trim_start().starts_with('{') {
        parse_lyrics_json(body).map_err(|e| FetchError::Decode(e.to_string()))
    } else {
        Ok(parse_lrc(body))
    }
}

#[async_trait]
impl AnalysisFetch for ApiService {
    async fn fetch_analysis(&self, track_id: &str) -> Result<Value, FetchError> {
        let url = self.url(
            &format!("/audio-attributes/v1/audio-analysis/{}", track_id),
            &[("format", "json")],
        )?;
        Ok(self.send(url, "audio analysis").await?.json().await?)
    }
}

#[async_trait]
impl ColorFetch for ApiService {
    async fn fetch_color(&self, artwork: &str) -> Result<Option<ColorPayload>, FetchError> {
        let url = self.url("/color/v1/extracted", &[("image", artwork)])?;
        let response = match self.send(url, "extracted color").await {
            Ok(response) => response,
            Err(FetchError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        let type_url = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let value = response.bytes().await?.to_vec();

        Ok((!value.is_empty()).then_some(ColorPayload { type_url, value }))
    }
}

#[async_trait]
impl LyricsFetch for ApiService {
    async fn fetch_lyrics(&self, track_id: &str) -> Result<Vec<LyricLine>, FetchError> {
        let url = self.url(&format!("/lyrics/v1/track/{}", track_id), &[])?;
        let body = self.send(url, "lyrics").await?.text().await?;
        decode_lyrics(&body)
    }
}
