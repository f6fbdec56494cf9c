pub mod highlight;
pub mod history;
pub mod initials;
pub mod matcher;
pub mod ranking;
pub mod text;

pub use highlight::{Segment, highlight_segments, render_marked};
pub use history::{FileHistoryStorage, HistoryStorage, MemoryHistoryStorage, SearchHistoryStore};
pub use initials::InitialsTable;
pub use matcher::{MatchKind, MatchResult, SearchMatcher, match_search};
pub use ranking::{Ranked, rank};

/// Split `text` into highlighted/plain segments for `query`
pub fn highlight_match<'a>(text: &'a str, query: &str) -> Vec<Segment<'a>> {
    highlight_segments(text, query)
}
