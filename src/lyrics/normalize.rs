//! Text normalization for catalog metadata
//!
//! Catalog artist/title strings are messy: HTML entities, bracketed annotations,
//! "feat." clauses, several artists in one field, marketing suffixes and titles that
//! embed the artist name. The functions here turn one raw string into a short,
//! ranked list of candidate forms. `normalize_token` is for comparisons only and is
//! never shown to the user.

use once_cell::sync::Lazy;
use regex::Regex;

/// "feat. X", "ft X", "featuring X" through the end of the string.
static FEAT_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:featuring|feat|ft)\b\.?.*$").unwrap());

/// Separators that split an artist field into co-artists.
static CO_ARTIST_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*[,&|/]\s*|\s+(?:x|and)\s+").unwrap());

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}").unwrap());

/// " - Official Video", " - Lyrics", " - From \"Some Film\"" ...
static MARKETING_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+-\s+(?:official|audio|video|lyrics?|from)\b.*$").unwrap()
});

const ARTIST_SEPARATORS: [char; 4] = [',', '&', '|', '/'];
const QUOTES: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

const ENTITIES: [(&str, char); 6] = [
    ("&amp;", '&'),
    ("&quot;", '"'),
    ("&#39;", '\''),
    ("&apos;", '\''),
    ("&lt;", '<'),
    ("&gt;", '>'),
];

const MAX_ARTIST_CANDIDATES: usize = 4;
const MAX_INFERRED_ARTISTS: usize = 2;
const MAX_TITLE_CANDIDATES: usize = 3;

/// Reduce a string to lowercase alphanumeric words separated by single spaces.
pub fn normalize_token(s: &str) -> String {
    let lowered = s.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}') {
            out.push(' ');
        } else if c.is_alphanumeric() {
            out.push(c);
        }
    }
    collapse_whitespace(&out)
}

/// Resolve the handful of entities the catalog emits. Single pass, so `&amp;quot;`
/// becomes `&quot;` and not `"`.
pub fn decode_html_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, c)) => {
                out.push(*c);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Primary artist only: entities decoded, "feat." clause dropped, first of several
/// `,`/`&`/`|`/`/` separated names kept.
pub fn sanitize_artist(s: &str) -> String {
    let decoded = decode_html_entities(s);
    let without_feat = strip_feat(&decoded);
    let first = without_feat
        .split(ARTIST_SEPARATORS)
        .next()
        .unwrap_or_default();
    trim_dangling(first).to_string()
}

/// The primary artist followed by every individual co-artist (also splitting on
/// " x " and " and "), deduplicated, at most 4.
pub fn build_artist_candidates(s: &str) -> Vec<String> {
    let decoded = decode_html_entities(s);
    let without_feat = strip_feat(&decoded);

    let mut candidates = vec![sanitize_artist(s)];
    candidates.extend(
        CO_ARTIST_SPLIT
            .split(&without_feat)
            .map(|part| trim_dangling(part).to_string()),
    );

    let mut out = dedupe_by_normalized(&candidates);
    out.truncate(MAX_ARTIST_CANDIDATES);
    out
}

/// Guess artists from titles shaped like "Song Name - Artist Name" or
/// "Song Name Artist Name". At most 2.
pub fn infer_artist_candidates_from_title(title: &str) -> Vec<String> {
    let decoded = decode_html_entities(title);
    let mut raw = Vec::new();

    if let Some((_, after)) = decoded.rsplit_once(" - ") {
        raw.push(after.to_string());
    }

    let unbracketed = BRACKETED.replace_all(&decoded, " ");
    let words: Vec<&str> = unbracketed.split_whitespace().collect();
    if words.len() >= 3 {
        raw.push(words[words.len() - 2..].join(" "));
    }
    if words.len() >= 4 {
        raw.push(words[words.len() - 3..].join(" "));
    }

    let sanitized: Vec<String> = raw.iter().map(|c| sanitize_artist(c)).collect();
    let mut out = dedupe_by_normalized(&sanitized);
    out.truncate(MAX_INFERRED_ARTISTS);
    out
}

/// Clean a display title for lookup. `artist_candidates` are tried in order; the
/// first one the title ends with (as whole normalized words) is cut off.
pub fn sanitize_title(title: &str, artist_candidates: &[String]) -> String {
    let decoded = decode_html_entities(title);
    let without_brackets = BRACKETED.replace_all(&decoded, " ");
    let without_feat = strip_feat(&without_brackets);
    let without_marketing = MARKETING_SUFFIX.replace(&without_feat, "");
    let collapsed = collapse_whitespace(&without_marketing);
    let unquoted = collapsed.trim_matches(QUOTES).trim();
    strip_artist_suffix(unquoted, artist_candidates)
}

/// The sanitized title plus its truncations at the first `-` and first `:`.
pub fn build_title_candidates(title: &str, artist_candidates: &[String]) -> Vec<String> {
    let sanitized = sanitize_title(title, artist_candidates);

    let mut raw = vec![sanitized.clone()];
    if let Some((head, _)) = sanitized.split_once('-') {
        raw.push(head.to_string());
    }
    if let Some((head, _)) = sanitized.split_once(':') {
        raw.push(head.to_string());
    }

    let mut out = dedupe_by_normalized(&raw);
    out.truncate(MAX_TITLE_CANDIDATES);
    out
}

/// Stable dedupe by `normalize_token`. Kept values are trimmed; values that are
/// blank or normalize to nothing are dropped.
pub fn dedupe_by_normalized<S: AsRef<str>>(list: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for value in list {
        let trimmed = value.as_ref().trim();
        let key = normalize_token(trimmed);
        if key.is_empty() {
            continue;
        }
        if seen.insert(key) {
            out.push(trimmed.to_string());
        }
    }
    out
}

fn strip_feat(s: &str) -> String {
    FEAT_CLAUSE.replace(s, "").into_owned()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim whitespace plus leftovers of a cut such as "Drake (" or "Song -".
fn trim_dangling(s: &str) -> &str {
    s.trim()
        .trim_end_matches(|c: char| {
            c.is_whitespace() || matches!(c, '(' | '[' | '{' | '-' | ':' | '|' | ',')
        })
        .trim()
}

fn strip_artist_suffix(title: &str, artist_candidates: &[String]) -> String {
    // (index of the source word, normalized token)
    let words: Vec<&str> = title.split_whitespace().collect();
    let tokens: Vec<(usize, String)> = words
        .iter()
        .enumerate()
        .flat_map(|(i, w)| {
            normalize_token(w)
                .split(' ')
                .filter(|t| !t.is_empty())
                .map(|t| (i, t.to_string()))
                .collect::<Vec<_>>()
        })
        .collect();

    for candidate in artist_candidates {
        let wanted = normalize_token(candidate);
        if wanted.is_empty() {
            continue;
        }
        let wanted: Vec<&str> = wanted.split(' ').collect();
        if wanted.len() > tokens.len() {
            continue;
        }

        let tail = &tokens[tokens.len() - wanted.len()..];
        if tail.iter().zip(&wanted).any(|((_, t), w)| t != w) {
            continue;
        }

        let cut = tail[0].0;
        let head = words[..cut].join(" ");
        let head = trim_dangling(&head);
        if head.chars().count() > 1 {
            return head.to_string();
        }
        break;
    }

    title.to_string()
}
