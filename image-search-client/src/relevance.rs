//! Relevance heuristics used to pick the few images worth showing out of a
//! larger, noisy result pool. Each source gets its own heuristic because the
//! metadata they expose differs.
//!
//! Both heuristics fall back to the provider's own order when nothing scores
//! above zero: a loosely relevant gallery beats an empty one.

use lazy_static::lazy_static;
use regex::Regex;

/// Score given to candidates that can never be shown.
pub const DISQUALIFIED: i32 = -1_000;

/// Commons images narrower than this are likely thumbnails or diagrams.
pub const MIN_COMMONS_WIDTH: u32 = 600;

/// File extensions that tend to be logos, animations or icons.
const GRAPHIC_EXTENSIONS: &[&str] = &["svg", "gif", "webp"];

lazy_static! {
    static ref GRAPHIC_KEYWORDS: Regex = Regex::new(r"logo|map|flag|icon").unwrap();
}

/// A candidate paired with its relevance score.
#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub score: i32,
    pub item: T,
}

impl<T> Scored<T> {
    pub fn new(score: i32, item: T) -> Self {
        Self { score, item }
    }
}

/// Splits a query into lower-cased whitespace separated tokens.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn matching_tokens(tokens: &[String], text: &str) -> i32 {
    tokens.iter().filter(|token| text.contains(token.as_str())).count() as i32
}

/// Scores an Unsplash photo from its alt text or description.
///
/// One point per query token found in the text, minus one when the photo has
/// no text at all.
pub fn score_photo(tokens: &[String], text: &str) -> i32 {
    let text = text.to_lowercase();
    let empty_penalty = if text.trim().is_empty() { -1 } else { 0 };
    matching_tokens(tokens, &text) + empty_penalty
}

/// Scores a Commons file page from its title, reported width and URL.
pub fn score_commons_page(tokens: &[String], title: &str, width: u32, has_url: bool) -> i32 {
    if !has_url {
        return DISQUALIFIED;
    }

    let title = title.to_lowercase();
    let mut score = 2 * matching_tokens(tokens, &title);

    let extension = title.rsplit('.').next().unwrap_or_default();
    if GRAPHIC_EXTENSIONS.contains(&extension) {
        score -= 2;
    }
    if GRAPHIC_KEYWORDS.is_match(&title) {
        score -= 3;
    }
    if width < MIN_COMMONS_WIDTH {
        score -= 1;
    }

    score
}

/// Orders candidates by descending score and keeps the first `limit`.
///
/// Sorting is stable, so equal scores keep the provider's order. When no
/// candidate scores above zero the provider's order is kept untouched.
/// Disqualified candidates are dropped before ranking.
pub fn pick<T>(candidates: Vec<Scored<T>>, limit: usize) -> Vec<T> {
    let mut candidates: Vec<Scored<T>> = candidates
        .into_iter()
        .filter(|candidate| candidate.score > DISQUALIFIED)
        .collect();

    let best = candidates.iter().map(|candidate| candidate.score).max();
    match best {
        Some(best) if best > 0 => {
            candidates.sort_by(|a, b| b.score.cmp(&a.score));
        }
        _ => log::debug!("No candidate scored above zero, keeping provider order"),
    }

    candidates
        .into_iter()
        .take(limit)
        .map(|candidate| candidate.item)
        .collect()
}
