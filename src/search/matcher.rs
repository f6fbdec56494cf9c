use serde::Serialize;
use std::sync::OnceLock;

use super::highlight::{Segment, highlight_segments};
use super::initials::InitialsTable;
use super::text::{find, fold};

pub const EXACT_SCORE: f32 = 1000.0;
const PREFIX_BASE: f32 = 800.0;
const SUBSTRING_BASE: f32 = 400.0;
const INITIALS_BASE: f32 = 100.0;
const BAND_WIDTH: f32 = 100.0;

/// How a candidate matched a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Empty query: nothing is filtered out
    All,
    Exact,
    Prefix,
    Substring,
    Initials,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    pub score: f32,
    pub kind: MatchKind,
}

impl MatchResult {
    fn new(kind: MatchKind, score: f32) -> Self {
        Self {
            matched: kind != MatchKind::None,
            score,
            kind,
        }
    }

    pub fn none() -> Self {
        Self::new(MatchKind::None, 0.0)
    }
}

/// Stateless matcher deciding whether a candidate text matches a query.
///
/// Score bands never overlap: exact (1000) > prefix (800, 900] >
/// substring (400, 600] > initials (100, 200]. Within the substring band
/// earlier and longer matches score higher.
#[derive(Debug, Clone, Default)]
pub struct SearchMatcher {
    initials: InitialsTable,
}

impl SearchMatcher {
    pub fn new(initials: InitialsTable) -> Self {
        Self { initials }
    }

    pub fn with_builtin_initials() -> Self {
        Self::new(InitialsTable::builtin())
    }

    pub fn initials(&self) -> &InitialsTable {
        &self.initials
    }

    pub fn match_text(&self, candidate: &str, query: &str) -> MatchResult {
        let query = fold(query.trim());
        if query.is_empty() {
            return MatchResult::new(MatchKind::All, 0.0);
        }

        let trimmed = candidate.trim();
        let text = fold(trimmed);
        if text.is_empty() {
            return MatchResult::none();
        }

        if let Some(position) = find(&text, &query) {
            return Self::substring_result(position, query.len(), text.len());
        }

        if self.initials.has_non_latin(trimmed) {
            let initials: Vec<char> = self.initials.initials_of(trimmed).chars().collect();
            if !initials.is_empty() && initials.starts_with(&query) {
                let coverage = query.len() as f32 / initials.len() as f32;
                return MatchResult::new(MatchKind::Initials, INITIALS_BASE + BAND_WIDTH * coverage);
            }
        }

        MatchResult::none()
    }

    fn substring_result(position: usize, query_len: usize, text_len: usize) -> MatchResult {
        if position == 0 && query_len == text_len {
            return MatchResult::new(MatchKind::Exact, EXACT_SCORE);
        }

        let ratio = query_len as f32 / text_len as f32;
        if position == 0 {
            return MatchResult::new(MatchKind::Prefix, PREFIX_BASE + BAND_WIDTH * ratio);
        }

        let earliness = 1.0 - position as f32 / text_len as f32;
        MatchResult::new(
            MatchKind::Substring,
            SUBSTRING_BASE + BAND_WIDTH * ratio + BAND_WIDTH * earliness,
        )
    }

    /// Split `text` into highlighted and plain segments for display
    pub fn highlight<'a>(&self, text: &'a str, query: &str) -> Vec<Segment<'a>> {
        highlight_segments(text, query)
    }
}

fn default_matcher() -> &'static SearchMatcher {
    static MATCHER: OnceLock<SearchMatcher> = OnceLock::new();
    MATCHER.get_or_init(SearchMatcher::with_builtin_initials)
}

/// Match using the built-in initials table
pub fn match_search(candidate: &str, query: &str) -> MatchResult {
    default_matcher().match_text(candidate, query)
}
