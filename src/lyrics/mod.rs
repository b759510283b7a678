//! Lyrics resolution for noisy catalog metadata
//!
//! This module provides:
//! - Text normalization and candidate generation for artist/title pairs
//! - A synced lyrics (LRC) parser
//! - Clients for the search provider (LRCLIB) and the suggest/direct provider (lyrics.ovh)
//! - Candidate scoring and the tiered resolver that ties everything together

pub mod lrclib;
pub mod normalize;
pub mod ovh;
pub mod parser;
pub mod provider;
pub mod resolver;
pub mod score;

use serde::Serialize;

pub use lrclib::LrclibClient;
pub use ovh::OvhClient;
pub use resolver::Resolver;

/// A single line of synced lyrics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedLyricLine {
    pub text: String,
    /// Seconds from the start of the track (finite, >= 0)
    pub time_sec: f64,
}

impl TimedLyricLine {
    pub fn new(time_sec: f64, text: String) -> Self {
        Self { text, time_sec }
    }
}

/// Outcome of a resolution. Both fields empty means "not found".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsResult {
    pub lyrics: Option<String>,
    pub timed_lines: Vec<TimedLyricLine>,
}

impl LyricsResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn plain(lyrics: String) -> Self {
        Self {
            lyrics: Some(lyrics),
            timed_lines: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lyrics.as_deref().is_none_or(|l| l.trim().is_empty()) && self.timed_lines.is_empty()
    }
}

/// Ranked artist/title forms derived from one raw query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedQuery {
    /// At most 5, most specific first
    pub artist_candidates: Vec<String>,
    /// At most 3, most specific first
    pub title_candidates: Vec<String>,
}

impl NormalizedQuery {
    pub fn from_raw(artist: &str, title: &str) -> Self {
        let field_artists = normalize::build_artist_candidates(artist);
        let inferred = normalize::infer_artist_candidates_from_title(title);

        let mut artist_candidates = field_artists.clone();
        artist_candidates.extend(inferred);
        let mut artist_candidates = normalize::dedupe_by_normalized(&artist_candidates);
        artist_candidates.truncate(5);

        // Guesses inferred from the title are its own trailing words, so cutting
        // with them would always eat the end of the title.
        let title_candidates = normalize::build_title_candidates(title, &field_artists);

        Self {
            artist_candidates,
            title_candidates,
        }
    }
}
