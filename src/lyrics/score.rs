//! Candidate scoring for provider result lists
//!
//! Both providers answer loosely: a search for one song returns covers, live
//! versions and unrelated tracks. Results are scored against the wanted
//! artist/title using normalized tokens and the best ones are kept.

use std::collections::HashSet;

use super::LyricsResult;
use super::normalize::normalize_token;
use super::parser::{join_timed_lines, parse_synced_lyrics};
use super::provider::{SearchHit, Suggestion};

/// How many suggest entries are looked at, in provider order.
const SUGGEST_CONSIDERED: usize = 12;
/// How many ranked suggest candidates are kept.
const SUGGEST_KEPT: usize = 4;

/// Points per kind of match for one provider.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub title_exact: u32,
    pub title_partial: u32,
    pub artist_exact: u32,
    pub artist_partial: u32,
}

pub const SEARCH_SCHEDULE: Schedule = Schedule {
    title_exact: 3,
    title_partial: 2,
    artist_exact: 2,
    artist_partial: 1,
};

pub const SUGGEST_SCHEDULE: Schedule = Schedule {
    title_exact: 4,
    title_partial: 2,
    artist_exact: 3,
    artist_partial: 1,
};

/// A suggested artist/title pair with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCandidate {
    pub artist: String,
    pub title: String,
    pub score: u32,
}

fn match_points(candidate: &str, wanted: &str, exact: u32, partial: u32) -> u32 {
    let candidate = normalize_token(candidate);
    let wanted = normalize_token(wanted);
    if candidate.is_empty() || wanted.is_empty() {
        0
    } else if candidate == wanted {
        exact
    } else if candidate.contains(&wanted) || wanted.contains(&candidate) {
        partial
    } else {
        0
    }
}

/// Title points plus the best artist points over all wanted artists.
pub fn score_candidate<S: AsRef<str>>(
    schedule: &Schedule,
    artist: &str,
    title: &str,
    wanted_title: &str,
    wanted_artists: &[S],
) -> u32 {
    let title_points = match_points(
        title,
        wanted_title,
        schedule.title_exact,
        schedule.title_partial,
    );
    let artist_points = wanted_artists
        .iter()
        .map(|w| match_points(artist, w.as_ref(), schedule.artist_exact, schedule.artist_partial))
        .max()
        .unwrap_or(0);
    title_points + artist_points
}

/// Rank suggest results: positive scores only, one entry per normalized
/// (artist, title), highest first, at most 4. Ties keep provider order.
pub fn rank_suggestions(
    suggestions: &[Suggestion],
    wanted_title: &str,
    wanted_artists: &[String],
) -> Vec<ProviderCandidate> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<ProviderCandidate> = suggestions
        .iter()
        .take(SUGGEST_CONSIDERED)
        .filter_map(|s| {
            let score = score_candidate(
                &SUGGEST_SCHEDULE,
                &s.artist,
                &s.title,
                wanted_title,
                wanted_artists,
            );
            if score == 0 {
                return None;
            }
            if !seen.insert((normalize_token(&s.artist), normalize_token(&s.title))) {
                return None;
            }
            Some(ProviderCandidate {
                artist: s.artist.clone(),
                title: s.title.clone(),
                score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(SUGGEST_KEPT);
    ranked
}

/// Best scoring search hit that actually carries lyrics, already converted.
///
/// A hit without lyrics text never wins, however well its metadata matches.
pub fn pick_search_hit(
    hits: &[SearchHit],
    wanted_title: &str,
    wanted_artist: Option<&str>,
) -> Option<LyricsResult> {
    let wanted_artists: Vec<&str> = wanted_artist.into_iter().collect();
    let mut best: Option<(u32, LyricsResult)> = None;

    for hit in hits {
        let score = score_candidate(
            &SEARCH_SCHEDULE,
            &hit.artist_name,
            &hit.track_name,
            wanted_title,
            &wanted_artists,
        );
        if best.as_ref().is_some_and(|(b, _)| *b >= score) {
            continue;
        }
        if let Some(result) = lyrics_from_hit(hit) {
            best = Some((score, result));
        }
    }

    best.map(|(_, result)| result)
}

/// Timed lines from the synced payload, lyrics from the plain payload or, failing
/// that, from the timed lines. `None` when the hit has no usable text.
pub fn lyrics_from_hit(hit: &SearchHit) -> Option<LyricsResult> {
    let timed_lines = hit
        .synced_lyrics
        .as_deref()
        .map(parse_synced_lyrics)
        .unwrap_or_default();

    let plain = hit
        .plain_lyrics
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    let lyrics =
        plain.or_else(|| (!timed_lines.is_empty()).then(|| join_timed_lines(&timed_lines)));
    let result = LyricsResult { lyrics, timed_lines };
    (!result.is_empty()).then_some(result)
}
