//! Character-level helpers shared by matching and highlighting.
//!
//! Case folding is done per character and always yields exactly one char,
//! so char indices in a folded string map 1:1 onto the original. That is
//! what lets the highlighter slice the original text without drift.

/// Lowercase a single char, keeping it unchanged when its lowercase form
/// expands to several chars (e.g. 'İ').
pub fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

pub fn fold(text: &str) -> Vec<char> {
    text.chars().map(fold_char).collect()
}

/// CJK unified ideographs (basic block, extension A/B and compatibility)
pub fn is_han(c: char) -> bool {
    matches!(c,
        '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}

/// First char index where `needle` occurs in `haystack`
pub fn find(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Char indices of all non-overlapping occurrences, left to right
pub fn find_all(haystack: &[char], needle: &[char]) -> Vec<usize> {
    let mut positions = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return positions;
    }

    let mut start = 0;
    while start + needle.len() <= haystack.len() {
        match find(&haystack[start..], needle) {
            Some(offset) => {
                positions.push(start + offset);
                start += offset + needle.len();
            }
            None => break,
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_keeps_char_count() {
        let text = "İstanbul ÄÖÜ 数学 ABC";
        assert_eq!(fold(text).len(), text.chars().count());
        assert_eq!(fold("ABC"), vec!['a', 'b', 'c']);
    }

    #[test]
    fn test_is_han() {
        assert!(is_han('数'));
        assert!(is_han('学'));
        assert!(!is_han('a'));
        assert!(!is_han('ア'));
        assert!(!is_han('。'));
    }

    #[test]
    fn test_find_all_non_overlapping() {
        let hay: Vec<char> = "aaaa".chars().collect();
        let needle: Vec<char> = "aa".chars().collect();
        assert_eq!(find_all(&hay, &needle), vec![0, 2]);

        let hay: Vec<char> = "分数与小数".chars().collect();
        let needle: Vec<char> = "数".chars().collect();
        assert_eq!(find_all(&hay, &needle), vec![1, 4]);
    }

    #[test]
    fn test_find_edge_cases() {
        let hay: Vec<char> = "ab".chars().collect();
        assert_eq!(find(&hay, &[]), None);
        assert_eq!(find(&hay, &['a', 'b', 'c']), None);
        assert_eq!(find(&hay, &['b']), Some(1));
    }
}
