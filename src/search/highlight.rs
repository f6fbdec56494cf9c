use serde::Serialize;

use super::text::{find_all, fold};

/// A slice of the original text, flagged when it is part of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub highlighted: bool,
}

/// Split `text` into segments, highlighting every non-overlapping
/// case-insensitive occurrence of the trimmed `query`.
///
/// Segments always concatenate back to `text`. Without a literal
/// occurrence (initials-only matches, empty query, query longer than the
/// text) the whole text comes back as one plain segment; empty text yields
/// no segments.
pub fn highlight_segments<'a>(text: &'a str, query: &str) -> Vec<Segment<'a>> {
    if text.is_empty() {
        return Vec::new();
    }

    let needle = fold(query.trim());
    let haystack = fold(text);
    let positions = find_all(&haystack, &needle);

    if positions.is_empty() {
        return vec![Segment {
            text,
            highlighted: false,
        }];
    }

    // Byte offset of every char index, plus the end of the string
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    let mut segments = Vec::with_capacity(positions.len() * 2 + 1);
    let mut cursor = 0;

    for position in positions {
        let start = offsets[position];
        let end = offsets[position + needle.len()];

        if start > cursor {
            segments.push(Segment {
                text: &text[cursor..start],
                highlighted: false,
            });
        }
        segments.push(Segment {
            text: &text[start..end],
            highlighted: true,
        });
        cursor = end;
    }

    if cursor < text.len() {
        segments.push(Segment {
            text: &text[cursor..],
            highlighted: false,
        });
    }

    segments
}

/// Render segments for a terminal, wrapping matches in the given markers
pub fn render_marked(segments: &[Segment<'_>], open: &str, close: &str) -> String {
    let mut out = String::new();
    for segment in segments {
        if segment.highlighted {
            out.push_str(open);
            out.push_str(segment.text);
            out.push_str(close);
        } else {
            out.push_str(segment.text);
        }
    }
    out
}
