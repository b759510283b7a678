//! Synced lyrics (LRC) parser
//!
//! Parses lines carrying one or more bracketed timestamps:
//! [mm:ss.xx] Lyrics line here
//!
//! Example:
//! [00:12.34] Hello world
//! [00:15.00][01:15.00] Chorus, sung twice

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::TimedLyricLine;
use super::normalize::normalize_token;

/// `[m:ss]`, `[mm:ss.f]`, `[mm:ss.ff]`, `[mm:ss:fff]`
static TIMESTAMP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d{1,2}:\d{1,2}(?:[.:]\d{1,3})?)\]").unwrap());

/// Parse the inside of a timestamp tag (`"01:02.5"`) into seconds.
///
/// The fraction is read by length: 3 digits are milliseconds, 2 centiseconds,
/// 1 deciseconds. Returns `None` when the text is not a timestamp.
pub fn parse_synced_timestamp(tag: &str) -> Option<f64> {
    let tag = tag.trim();
    let tag = tag
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(tag);

    let (minutes, rest) = tag.split_once(':')?;
    let (seconds, fraction) = match rest.split_once(['.', ':']) {
        Some((s, f)) => (s, Some(f)),
        None => (rest, None),
    };

    if !is_digits(minutes, 1, 2) || !is_digits(seconds, 1, 2) {
        return None;
    }
    let minutes: u32 = minutes.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;

    let millis: u32 = match fraction {
        None => 0,
        Some(f) if is_digits(f, 1, 3) => {
            let value: u32 = f.parse().ok()?;
            match f.len() {
                1 => value * 100,
                2 => value * 10,
                _ => value,
            }
        }
        Some(_) => return None,
    };

    Some(f64::from(minutes) * 60.0 + f64::from(seconds) + f64::from(millis) / 1000.0)
}

/// Parse a synced lyrics document into timed lines.
///
/// Every tag on a line yields its own entry sharing the line's text. Lines without
/// tags or without text are skipped. The output is sorted by time with repeated
/// `(millisecond, normalized text)` pairs removed.
pub fn parse_synced_lyrics(text: &str) -> Vec<TimedLyricLine> {
    let mut lines = Vec::new();

    for raw_line in text.lines() {
        let times: Vec<f64> = TIMESTAMP_TAG
            .captures_iter(raw_line)
            .filter_map(|cap| parse_synced_timestamp(&cap[1]))
            .collect();
        if times.is_empty() {
            continue;
        }

        let stripped = TIMESTAMP_TAG.replace_all(raw_line, "");
        let stripped = stripped.trim();
        if stripped.is_empty() {
            continue;
        }

        for time in times {
            lines.push(TimedLyricLine::new(time, stripped.to_string()));
        }
    }

    lines.sort_by(|a, b| a.time_sec.total_cmp(&b.time_sec));

    let mut seen = HashSet::new();
    lines.retain(|l| seen.insert(((l.time_sec * 1000.0).round() as i64, normalize_token(&l.text))));
    lines
}

/// Plain text rendition of timed lines, one per line.
pub fn join_timed_lines(lines: &[TimedLyricLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_digits(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}
