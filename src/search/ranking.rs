use super::matcher::SearchMatcher;

/// An item that matched a query, with its best field score
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub score: f32,
}

/// Score `items` over the text fields returned by `fields` and keep the
/// ones where any field matches, best score first.
///
/// The sort is stable, so equal scores keep their input order. An empty
/// query keeps every item in input order with score 0.
pub fn rank<T, F>(matcher: &SearchMatcher, items: Vec<T>, query: &str, fields: F) -> Vec<Ranked<T>>
where
    F: Fn(&T) -> Vec<&str>,
{
    let mut ranked: Vec<Ranked<T>> = items
        .into_iter()
        .filter_map(|item| {
            let mut matched = false;
            let mut best = 0.0f32;
            for field in fields(&item) {
                let result = matcher.match_text(field, query);
                if result.matched {
                    matched = true;
                    best = best.max(result.score);
                }
            }
            matched.then_some(Ranked { item, score: best })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}
