//! Provider seams shared by the resolver and the HTTP clients
//!
//! Upstream lyric services fail often and in boring ways. Every failure is a
//! `ProviderError`; none of them is fatal, the resolver treats each as "no data
//! from this call" and moves on.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("unparsable body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` has the wrong type")]
    WrongType(&'static str),
    #[error("empty result list")]
    Empty,
    #[error("no lyrics for this track")]
    NotFound,
}

/// One entry of a search provider result list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHit {
    pub track_name: String,
    pub artist_name: String,
    pub plain_lyrics: Option<String>,
    pub synced_lyrics: Option<String>,
}

/// One entry of a suggest provider result list.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub title: String,
    pub artist: String,
}

/// Search API that tolerates inexact artists and may return synced lyrics.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(
        &self,
        track_name: &str,
        artist_name: Option<&str>,
    ) -> Result<Vec<SearchHit>, ProviderError>;
}

/// Suggest endpoint plus an exact-ish direct lookup returning plain lyrics.
#[async_trait]
pub trait SuggestProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, ProviderError>;

    async fn direct(&self, artist: &str, title: &str) -> Result<String, ProviderError>;
}

/// Required string field of a JSON object.
pub(crate) fn str_field(obj: &Value, key: &'static str) -> Result<String, ProviderError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(ProviderError::MissingField(key)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ProviderError::WrongType(key)),
    }
}

/// Optional string field; null and absent are both `None`.
pub(crate) fn opt_str_field(
    obj: &Value,
    key: &'static str,
) -> Result<Option<String>, ProviderError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ProviderError::WrongType(key)),
    }
}

/// Top-level array of a response, `Empty` when there is nothing in it.
pub(crate) fn non_empty_array<'a>(
    v: &'a Value,
    key: &'static str,
) -> Result<&'a Vec<Value>, ProviderError> {
    let arr = v.as_array().ok_or(ProviderError::WrongType(key))?;
    if arr.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(arr)
}
