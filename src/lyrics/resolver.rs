//! Tiered lyrics resolution
//!
//! Tiers run in order and the first one producing lyrics wins:
//! 1. `SyncedSearch`: search provider over title x artist combinations. Only
//!    source of synced lyrics, so it goes first.
//! 2. `SuggestThenDirect`: suggest queries, rank the suggestions, direct lookup of
//!    the ranked pairs.
//! 3. `DirectFallback`: blind direct lookups of the raw combinations. Optional.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::normalize::normalize_token;
use super::provider::{SearchProvider, SuggestProvider};
use super::score::{pick_search_hit, rank_suggestions};
use super::{LrclibClient, LyricsResult, NormalizedQuery, OvhClient};
use crate::config::Config;

const SEARCH_MAX_TITLES: usize = 3;
const SEARCH_MAX_ARTISTS: usize = 3;
const SUGGEST_QUERY_ARTISTS: usize = 2;
const MAX_SUGGEST_QUERIES: usize = 6;
const MAX_DIRECT_FALLBACKS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    SyncedSearch,
    SuggestThenDirect,
    DirectFallback,
}

/// Anything that can turn a raw (artist, title) into lyrics.
#[async_trait]
pub trait LyricsSource: Send + Sync {
    async fn lookup(&self, artist: &str, title: &str) -> LyricsResult;
}

pub struct Resolver {
    search: Arc<dyn SearchProvider>,
    suggest: Arc<dyn SuggestProvider>,
    direct_fallback: bool,
}

impl Resolver {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        suggest: Arc<dyn SuggestProvider>,
        direct_fallback: bool,
    ) -> Self {
        Self {
            search,
            suggest,
            direct_fallback,
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let p = &cfg.providers;
        let timeout = Duration::from_secs(p.timeout_secs);
        let search = LrclibClient::new(&p.lrclib_url, &p.user_agent, timeout)?;
        let suggest = OvhClient::new(&p.lyrics_ovh_url, &p.user_agent, timeout)?;
        Ok(Self::new(
            Arc::new(search),
            Arc::new(suggest),
            cfg.resolver.direct_fallback,
        ))
    }

    pub fn tiers(&self) -> Vec<Tier> {
        let mut tiers = vec![Tier::SyncedSearch, Tier::SuggestThenDirect];
        if self.direct_fallback {
            tiers.push(Tier::DirectFallback);
        }
        tiers
    }

    /// Best-effort resolution. Runs on its own task so that a bug in any tier
    /// degrades to "no lyrics" instead of taking the caller down.
    pub async fn resolve(self: &Arc<Self>, artist: &str, title: &str) -> LyricsResult {
        match self.spawn_lookup(artist, title).await {
            Ok(result) => result,
            Err(e) => {
                warn!("lyrics resolution for {artist:?} / {title:?} failed: {e:#}");
                LyricsResult::empty()
            }
        }
    }

    pub async fn spawn_lookup(
        self: &Arc<Self>,
        artist: &str,
        title: &str,
    ) -> anyhow::Result<LyricsResult> {
        let this = Arc::clone(self);
        let (artist, title) = (artist.to_string(), title.to_string());
        tokio::spawn(async move { this.run(&artist, &title).await })
            .await
            .context("lyrics resolution task")
    }

    async fn run(&self, artist: &str, title: &str) -> LyricsResult {
        let query = NormalizedQuery::from_raw(artist, title);
        if query.title_candidates.is_empty() {
            debug!("no usable title in {title:?}, skipping lookup");
            return LyricsResult::empty();
        }
        debug!(
            "resolving {:?} / {:?} as artists={:?} titles={:?}",
            artist, title, query.artist_candidates, query.title_candidates
        );

        for tier in self.tiers() {
            if let Some(result) = self.run_tier(tier, &query).await {
                info!("lyrics for {artist:?} / {title:?} found by {tier:?}");
                return result;
            }
            debug!("{tier:?} found nothing for {title:?}");
        }
        LyricsResult::empty()
    }

    pub async fn run_tier(&self, tier: Tier, query: &NormalizedQuery) -> Option<LyricsResult> {
        match tier {
            Tier::SyncedSearch => self.synced_search(query).await,
            Tier::SuggestThenDirect => self.suggest_then_direct(query).await,
            Tier::DirectFallback => self.direct_fallback(query).await,
        }
    }

    async fn synced_search(&self, query: &NormalizedQuery) -> Option<LyricsResult> {
        let artists: Vec<Option<&str>> = if query.artist_candidates.is_empty() {
            vec![None]
        } else {
            query
                .artist_candidates
                .iter()
                .take(SEARCH_MAX_ARTISTS)
                .map(|a| Some(a.as_str()))
                .collect()
        };

        for title in query.title_candidates.iter().take(SEARCH_MAX_TITLES) {
            for artist in &artists {
                match self.search.search(title, *artist).await {
                    Ok(hits) => {
                        if let Some(result) = pick_search_hit(&hits, title, *artist) {
                            return Some(result);
                        }
                    }
                    Err(e) => debug!("{}: {title:?} / {artist:?}: {e}", self.search.name()),
                }
            }
        }
        None
    }

    async fn suggest_then_direct(&self, query: &NormalizedQuery) -> Option<LyricsResult> {
        for (q, wanted_title) in suggest_queries(query) {
            let suggestions = match self.suggest.suggest(&q).await {
                Ok(s) => s,
                Err(e) => {
                    debug!("{} suggest {q:?}: {e}", self.suggest.name());
                    continue;
                }
            };

            let ranked = rank_suggestions(&suggestions, &wanted_title, &query.artist_candidates);
            for candidate in ranked {
                match self.suggest.direct(&candidate.artist, &candidate.title).await {
                    Ok(lyrics) => return Some(LyricsResult::plain(lyrics)),
                    Err(e) => debug!(
                        "{} direct {:?} / {:?} (score {}): {e}",
                        self.suggest.name(),
                        candidate.artist,
                        candidate.title,
                        candidate.score
                    ),
                }
            }
        }
        None
    }

    async fn direct_fallback(&self, query: &NormalizedQuery) -> Option<LyricsResult> {
        let pairs: Vec<(String, String)> = query
            .title_candidates
            .iter()
            .flat_map(|t| {
                query
                    .artist_candidates
                    .iter()
                    .map(move |a| (a.clone(), t.clone()))
            })
            .take(MAX_DIRECT_FALLBACKS)
            .collect();

        for (artist, title) in pairs {
            match self.suggest.direct(&artist, &title).await {
                Ok(lyrics) => return Some(LyricsResult::plain(lyrics)),
                Err(e) => debug!("{} direct {artist:?} / {title:?}: {e}", self.suggest.name()),
            }
        }
        None
    }
}

#[async_trait]
impl LyricsSource for Resolver {
    async fn lookup(&self, artist: &str, title: &str) -> LyricsResult {
        self.run(artist, title).await
    }
}

/// Suggest queries paired with the title they were built from: each title alone,
/// then "title artist" for the first two artists. Deduplicated, at most 6.
fn suggest_queries(query: &NormalizedQuery) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for title in &query.title_candidates {
        let mut forms = vec![title.clone()];
        forms.extend(
            query
                .artist_candidates
                .iter()
                .take(SUGGEST_QUERY_ARTISTS)
                .map(|a| format!("{title} {a}")),
        );
        for form in forms {
            if seen.insert(normalize_token(&form)) {
                out.push((form, title.clone()));
            }
        }
    }

    out.truncate(MAX_SUGGEST_QUERIES);
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::lyrics::provider::{ProviderError, SearchHit, Suggestion};

    #[derive(Default)]
    struct FakeSearch {
        hits: HashMap<(String, Option<String>), Vec<SearchHit>>,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl FakeSearch {
        fn with(mut self, title: &str, artist: Option<&str>, hits: Vec<SearchHit>) -> Self {
            self.hits
                .insert((title.to_string(), artist.map(str::to_string)), hits);
            self
        }

        fn calls(&self) -> Vec<(String, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchProvider for FakeSearch {
        fn name(&self) -> &'static str {
            "fake-search"
        }

        async fn search(
            &self,
            track_name: &str,
            artist_name: Option<&str>,
        ) -> Result<Vec<SearchHit>, ProviderError> {
            let key = (track_name.to_string(), artist_name.map(str::to_string));
            self.calls.lock().unwrap().push(key.clone());
            self.hits.get(&key).cloned().ok_or(ProviderError::Empty)
        }
    }

    #[derive(Default)]
    struct FakeSuggest {
        suggestions: HashMap<String, Vec<Suggestion>>,
        lyrics: HashMap<(String, String), String>,
        suggest_calls: Mutex<Vec<String>>,
        direct_calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeSuggest {
        fn suggesting(mut self, query: &str, pairs: &[(&str, &str)]) -> Self {
            let list = pairs
                .iter()
                .map(|(artist, title)| Suggestion {
                    artist: artist.to_string(),
                    title: title.to_string(),
                })
                .collect();
            self.suggestions.insert(query.to_string(), list);
            self
        }

        fn with_lyrics(mut self, artist: &str, title: &str, lyrics: &str) -> Self {
            self.lyrics
                .insert((artist.to_string(), title.to_string()), lyrics.to_string());
            self
        }
    }

    #[async_trait]
    impl SuggestProvider for FakeSuggest {
        fn name(&self) -> &'static str {
            "fake-suggest"
        }

        async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, ProviderError> {
            self.suggest_calls.lock().unwrap().push(query.to_string());
            self.suggestions.get(query).cloned().ok_or(ProviderError::Empty)
        }

        async fn direct(&self, artist: &str, title: &str) -> Result<String, ProviderError> {
            let key = (artist.to_string(), title.to_string());
            self.direct_calls.lock().unwrap().push(key.clone());
            self.lyrics.get(&key).cloned().ok_or(ProviderError::NotFound)
        }
    }

    fn hit(track: &str, artist: &str, plain: Option<&str>, synced: Option<&str>) -> SearchHit {
        SearchHit {
            track_name: track.to_string(),
            artist_name: artist.to_string(),
            plain_lyrics: plain.map(str::to_string),
            synced_lyrics: synced.map(str::to_string),
        }
    }

    fn resolver(
        search: FakeSearch,
        suggest: FakeSuggest,
        direct_fallback: bool,
    ) -> (Arc<Resolver>, Arc<FakeSearch>, Arc<FakeSuggest>) {
        let search = Arc::new(search);
        let suggest = Arc::new(suggest);
        let r = Arc::new(Resolver::new(search.clone(), suggest.clone(), direct_fallback));
        (r, search, suggest)
    }

    #[tokio::test]
    async fn test_search_provider_plain_hit() {
        let search = FakeSearch::default().with(
            "Shape of You",
            Some("Ed Sheeran"),
            vec![hit("Shape of You", "Ed Sheeran", Some("The club isn't the best place..."), None)],
        );
        let (r, _, suggest) = resolver(search, FakeSuggest::default(), true);

        let result = r.resolve("Ed Sheeran", "Shape of You").await;
        assert_eq!(
            result,
            LyricsResult {
                lyrics: Some("The club isn't the best place...".to_string()),
                timed_lines: vec![],
            }
        );
        assert!(suggest.suggest_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_synced_hit_carries_timed_lines() {
        let search = FakeSearch::default().with(
            "Shape of You",
            Some("Ed Sheeran"),
            vec![hit(
                "Shape of You",
                "Ed Sheeran",
                None,
                Some("[00:10.00]The club isn't the best place\n[00:12.50]to find a lover"),
            )],
        );
        let (r, _, _) = resolver(search, FakeSuggest::default(), true);

        let result = r.resolve("Ed Sheeran", "Shape of You").await;
        assert_eq!(result.timed_lines.len(), 2);
        assert_eq!(result.timed_lines[1].time_sec, 12.5);
        assert_eq!(
            result.lyrics.as_deref(),
            Some("The club isn't the best place\nto find a lover")
        );
    }

    #[tokio::test]
    async fn test_suggest_then_direct() {
        let suggest = FakeSuggest::default()
            .suggesting("Shape of You Ed Sheeran", &[("Ed Sheeran", "Shape of You")])
            .with_lyrics("Ed Sheeran", "Shape of You", "The club...");
        let (r, search, suggest) = resolver(FakeSearch::default(), suggest, true);

        let result = r.resolve("Ed Sheeran", "Shape of You").await;
        assert_eq!(result, LyricsResult::plain("The club...".to_string()));

        // every search combination was tried first
        assert_eq!(search.calls().len(), 2);
        assert_eq!(
            *suggest.suggest_calls.lock().unwrap(),
            vec!["Shape of You".to_string(), "Shape of You Ed Sheeran".to_string()]
        );
    }

    #[tokio::test]
    async fn test_search_skips_combination_without_lyrics() {
        let search = FakeSearch::default()
            .with(
                "Song",
                Some("A"),
                vec![hit("Song", "A", None, None)],
            )
            .with("Song", Some("B"), vec![hit("Song", "B", Some("words"), None)]);
        let (r, search, _) = resolver(search, FakeSuggest::default(), true);

        let result = r.resolve("A & B", "Song").await;
        assert_eq!(result.lyrics.as_deref(), Some("words"));
        assert_eq!(
            search.calls(),
            vec![
                ("Song".to_string(), Some("A".to_string())),
                ("Song".to_string(), Some("B".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_direct_fallback_only_when_enabled() {
        let make = || FakeSuggest::default().with_lyrics("Ed Sheeran", "Perfect", "I found a love");

        let (r, _, _) = resolver(FakeSearch::default(), make(), true);
        let result = r.resolve("Ed Sheeran", "Perfect").await;
        assert_eq!(result.lyrics.as_deref(), Some("I found a love"));

        let (r, _, suggest) = resolver(FakeSearch::default(), make(), false);
        let result = r.resolve("Ed Sheeran", "Perfect").await;
        assert!(result.is_empty());
        assert!(suggest.direct_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bracket_only_title_makes_no_calls() {
        let (r, search, suggest) = resolver(FakeSearch::default(), FakeSuggest::default(), true);
        let result = r.resolve("Someone", "(Official Video)").await;
        assert_eq!(result, LyricsResult::empty());
        assert!(search.calls().is_empty());
        assert!(suggest.suggest_calls.lock().unwrap().is_empty());
        assert!(suggest.direct_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_total_miss_is_empty() {
        let (r, search, suggest) = resolver(FakeSearch::default(), FakeSuggest::default(), true);
        let result = r.resolve("Nobody", "Nothing At All").await;
        assert!(result.is_empty());
        assert!(!search.calls().is_empty());
        assert!(suggest.direct_calls.lock().unwrap().len() <= MAX_DIRECT_FALLBACKS);
    }

    #[test]
    fn test_tiers() {
        let (r, _, _) = resolver(FakeSearch::default(), FakeSuggest::default(), true);
        assert_eq!(
            r.tiers(),
            vec![Tier::SyncedSearch, Tier::SuggestThenDirect, Tier::DirectFallback]
        );
        let (r, _, _) = resolver(FakeSearch::default(), FakeSuggest::default(), false);
        assert_eq!(r.tiers(), vec![Tier::SyncedSearch, Tier::SuggestThenDirect]);
    }

    #[test]
    fn test_suggest_queries() {
        let query = NormalizedQuery {
            artist_candidates: vec!["A".into(), "B".into(), "C".into()],
            title_candidates: vec!["One".into(), "Two".into(), "one".into()],
        };
        let queries: Vec<String> = suggest_queries(&query).into_iter().map(|(q, _)| q).collect();
        assert_eq!(queries, vec!["One", "One A", "One B", "Two", "Two A", "Two B"]);
    }

    fn wide_query() -> NormalizedQuery {
        NormalizedQuery {
            artist_candidates: ["A1", "A2", "A3", "A4", "A5"].map(String::from).to_vec(),
            title_candidates: ["T1", "T2", "T3"].map(String::from).to_vec(),
        }
    }

    #[tokio::test]
    async fn test_synced_search_combinations_are_title_major_and_capped() {
        let (r, search, _) = resolver(FakeSearch::default(), FakeSuggest::default(), true);

        assert!(r.run_tier(Tier::SyncedSearch, &wide_query()).await.is_none());

        let expected: Vec<(String, Option<String>)> = ["T1", "T2", "T3"]
            .iter()
            .flat_map(|t| {
                ["A1", "A2", "A3"]
                    .iter()
                    .map(move |a| (t.to_string(), Some(a.to_string())))
            })
            .collect();
        assert_eq!(search.calls().len(), 9);
        assert_eq!(search.calls(), expected);
    }

    #[tokio::test]
    async fn test_direct_fallback_is_title_major_and_capped() {
        let (r, _, suggest) = resolver(FakeSearch::default(), FakeSuggest::default(), true);

        assert!(r.run_tier(Tier::DirectFallback, &wide_query()).await.is_none());

        let pair = |a: &str, t: &str| (a.to_string(), t.to_string());
        assert_eq!(
            *suggest.direct_calls.lock().unwrap(),
            vec![
                pair("A1", "T1"),
                pair("A2", "T1"),
                pair("A3", "T1"),
                pair("A4", "T1"),
                pair("A5", "T1"),
                pair("A1", "T2"),
            ]
        );
    }

    #[tokio::test]
    async fn test_direct_fallback_through_spawned_source() {
        let suggest = FakeSuggest::default().with_lyrics("Ed Sheeran", "Perfect", "I found a love");
        let (r, _, _) = resolver(FakeSearch::default(), suggest, true);
        let source: Arc<dyn LyricsSource> = r;

        let result = tokio::spawn(async move { source.lookup("Ed Sheeran", "Perfect").await })
            .await
            .unwrap();
        assert_eq!(result.lyrics.as_deref(), Some("I found a love"));
    }

    #[tokio::test]
    async fn test_run_tier_in_isolation() {
        let suggest = FakeSuggest::default().with_lyrics("A", "Song", "la la");
        let (r, _, _) = resolver(FakeSearch::default(), suggest, true);
        let query = NormalizedQuery::from_raw("A", "Song");

        assert!(r.run_tier(Tier::SyncedSearch, &query).await.is_none());
        assert_eq!(
            r.run_tier(Tier::DirectFallback, &query).await,
            Some(LyricsResult::plain("la la".to_string()))
        );
    }

    #[tokio::test]
    async fn test_end_to_end_with_http_providers() {
        use axum::{Json, Router, extract::Path, routing::get};
        use serde_json::json;

        let app = Router::new()
            .route("/api/search", get(|| async { Json(json!([])) }))
            .route(
                "/ovh/suggest/{query}",
                get(|Path(query): Path<String>| async move {
                    if query == "Shape of You Ed Sheeran" {
                        Json(json!({"data": [
                            {"title": "Shape of You (Live)", "artist": {"name": "Ed Sheeran"}},
                            {"title": "Shape of You", "artist": {"name": "Ed Sheeran"}}
                        ]}))
                    } else {
                        Json(json!({"data": []}))
                    }
                }),
            )
            .route(
                "/ovh/v1/{artist}/{title}",
                get(|Path((artist, title)): Path<(String, String)>| async move {
                    if artist == "Ed Sheeran" && title == "Shape of You" {
                        Ok(Json(json!({
                            "lyrics": "Paroles de la chanson Shape of You par Ed Sheeran\nThe club isn't the best place to find a lover"
                        })))
                    } else {
                        Err(axum::http::StatusCode::NOT_FOUND)
                    }
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let timeout = Duration::from_secs(5);
        let search = LrclibClient::new(&format!("http://{addr}/api"), "test", timeout).unwrap();
        let suggest = OvhClient::new(&format!("http://{addr}/ovh"), "test", timeout).unwrap();
        let r = Arc::new(Resolver::new(Arc::new(search), Arc::new(suggest), false));

        let result = r.resolve("Ed Sheeran", "Shape of You").await;
        let lyrics = result.lyrics.unwrap();
        assert!(lyrics.starts_with("The club"), "got {lyrics:?}");
        assert!(result.timed_lines.is_empty());
    }
}
