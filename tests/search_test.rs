#[cfg(test)]
mod tests {
    use teach_portal::search::{
        FileHistoryStorage, InitialsTable, MatchKind, SearchHistoryStore, SearchMatcher,
        highlight_match, match_search, rank,
    };
    use tempfile::TempDir;

    const CANDIDATES: &[&str] = &[
        "",
        "分数墙",
        "Fraction Wall 分数",
        "三年级 乘法口诀表",
        "  课堂计时器  ",
        "ABC abc",
        "数码教学",
    ];

    #[test]
    fn test_empty_query_matches_everything() {
        for candidate in CANDIDATES {
            for query in ["", "   "] {
                let result = match_search(candidate, query);
                assert!(result.matched, "{candidate:?} should match {query:?}");
                assert_eq!(result.kind, MatchKind::All);
            }
        }
    }

    #[test]
    fn test_substring_always_matches_with_positive_score() {
        let cases = [
            ("Fraction Wall 分数", "wall"),
            ("Fraction Wall 分数", "FRACTION"),
            ("三年级 乘法口诀表", "乘法"),
            ("三年级 乘法口诀表", "口诀表"),
            ("ABC abc", "c a"),
        ];
        for (candidate, query) in cases {
            let result = match_search(candidate, query);
            assert!(result.matched, "{candidate:?} / {query:?}");
            assert!(result.score > 0.0);
        }
    }

    #[test]
    fn test_match_kinds_are_ordered() {
        let exact = match_search("计时器", "计时器");
        let prefix = match_search("计时器工具", "计时器");
        let substring = match_search("课堂计时器", "计时器");
        let initials = match_search("数学计时器", "sxj");

        assert_eq!(exact.kind, MatchKind::Exact);
        assert_eq!(prefix.kind, MatchKind::Prefix);
        assert_eq!(substring.kind, MatchKind::Substring);
        assert_eq!(initials.kind, MatchKind::Initials);
        assert!(exact.score > prefix.score);
        assert!(prefix.score > substring.score);
        assert!(substring.score > initials.score);
    }

    #[test]
    fn test_initials_prefix_only() {
        let matcher = SearchMatcher::with_builtin_initials();
        assert_eq!(matcher.initials().initials_of("数码教学"), "smjx");

        let hit = matcher.match_text("数码教学", "sm");
        assert!(hit.matched);
        assert_eq!(hit.kind, MatchKind::Initials);

        assert!(!matcher.match_text("数码教学", "sx").matched);
        assert!(!matcher.match_text("数码教学", "mj").matched);
    }

    #[test]
    fn test_initials_use_custom_table() {
        let mut table = InitialsTable::empty();
        table.extend(InitialsTable::from_json(r#"{ "q": "鹊", "x": "喜" }"#).unwrap());
        let matcher = SearchMatcher::new(table);

        assert!(matcher.match_text("喜鹊", "xq").matched);
        assert!(!SearchMatcher::new(InitialsTable::empty())
            .match_text("喜鹊", "xq")
            .matched);
    }

    #[test]
    fn test_matching_is_idempotent() {
        for candidate in CANDIDATES {
            for query in ["分数", "sm", "abc", "x"] {
                assert_eq!(match_search(candidate, query), match_search(candidate, query));
            }
        }
    }

    #[test]
    fn test_highlight_concatenates_back_to_text() {
        let queries = ["", "分数", "a", "abc", "乘法口诀表再长一点点点点点点", "  wall "];
        for text in CANDIDATES {
            for query in queries {
                let joined: String = highlight_match(text, query).iter().map(|s| s.text).collect();
                assert_eq!(&joined, text, "text {text:?} query {query:?}");
            }
        }
    }

    #[test]
    fn test_highlight_marks_every_occurrence() {
        let segments = highlight_match("ABC abc", "abc");
        let marked: Vec<&str> = segments
            .iter()
            .filter(|s| s.highlighted)
            .map(|s| s.text)
            .collect();
        assert_eq!(marked, vec!["ABC", "abc"]);
    }

    #[test]
    fn test_rank_prefers_title_hits() {
        let matcher = SearchMatcher::with_builtin_initials();
        let items = vec![
            ("随机点名", "课堂小工具"),
            ("小组计分板", "按组计分"),
            ("计分器", "简单计分"),
        ];
        let ranked = rank(&matcher, items, "计分", |(title, description)| {
            vec![*title, *description]
        });
        let titles: Vec<&str> = ranked.iter().map(|r| r.item.0).collect();
        assert_eq!(titles, vec!["计分器", "小组计分板"]);
    }

    #[test]
    fn test_history_properties() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history").join("search_history.json");
        let store = SearchHistoryStore::with_capacity(FileHistoryStorage::new(&path), 10);

        store.add("a");
        store.add("b");
        store.add("a");
        assert_eq!(store.list(), vec!["a", "b"]);

        store.remove("missing");
        assert_eq!(store.list(), vec!["a", "b"]);

        store.clear();
        assert!(store.list().is_empty());

        for i in 0..11 {
            store.add(&format!("query {i}"));
        }
        let entries = store.list();
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0], "query 10");
        assert!(!entries.contains(&"query 0".to_string()));
    }

    #[test]
    fn test_history_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("search_history.json");

        SearchHistoryStore::new(FileHistoryStorage::new(&path)).add("分数");
        let reopened = SearchHistoryStore::new(FileHistoryStorage::new(&path));
        assert_eq!(reopened.list(), vec!["分数"]);
    }

    #[test]
    fn test_corrupt_history_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("search_history.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SearchHistoryStore::new(FileHistoryStorage::new(&path));
        assert!(store.list().is_empty());
        store.add("x");
        assert_eq!(store.list(), vec!["x"]);
    }
}
