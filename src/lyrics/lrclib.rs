//! LRCLIB API client
//!
//! LRCLIB is a free lyrics API that provides synchronized (LRC format) lyrics.
//! API Documentation: https://lrclib.net/docs
//!
//! Only the search endpoint is used: it does not need an exact artist, so its
//! results are rescored locally before use.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use super::provider::{
    ProviderError, SearchHit, SearchProvider, non_empty_array, opt_str_field, str_field,
};

/// LRCLIB API client
#[derive(Debug, Clone)]
pub struct LrclibClient {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://lrclib.net/api";

    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("build lrclib http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, track_name: &str, artist_name: Option<&str>) -> String {
        let mut url = format!(
            "{}/search?track_name={}",
            self.base_url,
            urlencoding::encode(track_name)
        );
        if let Some(artist) = artist_name.filter(|a| !a.trim().is_empty()) {
            url.push_str(&format!("&artist_name={}", urlencoding::encode(artist)));
        }
        url
    }
}

#[async_trait]
impl SearchProvider for LrclibClient {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn search(
        &self,
        track_name: &str,
        artist_name: Option<&str>,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let url = self.search_url(track_name, artist_name);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let v: Value = serde_json::from_slice(&body)?;
        parse_search_response(&v)
    }
}

/// Validate a search response. Entries with the wrong shape are dropped; a body
/// that is not a list, or a list with nothing usable, is an error.
fn parse_search_response(v: &Value) -> Result<Vec<SearchHit>, ProviderError> {
    let entries = non_empty_array(v, "results")?;

    let hits: Vec<SearchHit> = entries
        .iter()
        .filter_map(|entry| match parse_hit(entry) {
            Ok(hit) => Some(hit),
            Err(e) => {
                tracing::debug!("lrclib: skipping entry: {e}");
                None
            }
        })
        .collect();

    if hits.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(hits)
}

fn parse_hit(entry: &Value) -> Result<SearchHit, ProviderError> {
    Ok(SearchHit {
        track_name: str_field(entry, "trackName")?,
        artist_name: str_field(entry, "artistName")?,
        plain_lyrics: opt_str_field(entry, "plainLyrics")?,
        synced_lyrics: opt_str_field(entry, "syncedLyrics")?,
    })
}
