//! lyrics.ovh API client
//!
//! Two endpoints:
//! - `GET /suggest/{query}` -> `{ "data": [{ "title", "artist": { "name" } }] }`
//! - `GET /v1/{artist}/{title}` -> `{ "lyrics": "..." }`
//!
//! The direct lookup wants near-exact artist/title path segments, so it is usually
//! fed with pairs picked from the suggest list.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use super::provider::{ProviderError, SuggestProvider, Suggestion, non_empty_array, str_field};

/// Boilerplate first line some direct lookups come back with.
const FRENCH_HEADER: &str = "paroles de la chanson";

#[derive(Debug, Clone)]
pub struct OvhClient {
    client: reqwest::Client,
    base_url: String,
}

impl OvhClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.lyrics.ovh";

    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("build lyrics.ovh http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, ProviderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound);
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl SuggestProvider for OvhClient {
    fn name(&self) -> &'static str {
        "lyrics.ovh"
    }

    async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, ProviderError> {
        let url = format!("{}/suggest/{}", self.base_url, urlencoding::encode(query));
        let v = self.get_json(&url).await?;
        parse_suggest_response(&v)
    }

    async fn direct(&self, artist: &str, title: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1/{}/{}",
            self.base_url,
            urlencoding::encode(artist),
            urlencoding::encode(title)
        );
        let v = self.get_json(&url).await?;
        let lyrics = str_field(&v, "lyrics")?;
        let lyrics = clean_direct_lyrics(&lyrics);
        if lyrics.is_empty() {
            return Err(ProviderError::NotFound);
        }
        Ok(lyrics)
    }
}

fn parse_suggest_response(v: &Value) -> Result<Vec<Suggestion>, ProviderError> {
    let data = v.get("data").ok_or(ProviderError::MissingField("data"))?;
    let entries = non_empty_array(data, "data")?;

    let suggestions: Vec<Suggestion> = entries
        .iter()
        .filter_map(|entry| {
            let title = str_field(entry, "title").ok()?;
            let artist = entry
                .get("artist")
                .and_then(|a| a.get("name"))
                .and_then(Value::as_str)?
                .to_string();
            Some(Suggestion { title, artist })
        })
        .collect();

    if suggestions.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(suggestions)
}

/// Drop the "Paroles de la chanson ..." header line and surrounding whitespace.
pub fn clean_direct_lyrics(raw: &str) -> String {
    let trimmed = raw.trim_start();
    let first_line = trimmed.lines().next().unwrap_or_default();
    let body = if first_line.trim().to_lowercase().starts_with(FRENCH_HEADER) {
        trimmed.split_once('\n').map(|(_, rest)| rest).unwrap_or_default()
    } else {
        trimmed
    };
    body.trim().to_string()
}
