//! Overlap resolution for text candidates.

use crate::entity::TextSpan;

/// Keeps the earliest-starting, then longest, non-overlapping cover.
///
/// Items are ordered by `(start ascending, end descending)`; the sort is
/// stable, so among identical spans the first one supplied wins. An item is
/// accepted only if it starts at or after the end of the last accepted item.
/// Returns the accepted items in ascending start order and the number dropped.
pub fn deduplicate<T>(mut items: Vec<T>, span_of: impl Fn(&T) -> TextSpan) -> (Vec<T>, usize) {
    items.sort_by(|a, b| {
        let (a, b) = (span_of(a), span_of(b));
        a.start.cmp(&b.start).then(b.end.cmp(&a.end))
    });

    let total = items.len();
    let mut accepted: Vec<T> = Vec::with_capacity(total);
    let mut last_end = 0;
    for item in items {
        let span = span_of(&item);
        if !accepted.is_empty() && span.start < last_end {
            continue;
        }
        last_end = span.end;
        accepted.push(item);
    }

    let dropped = total - accepted.len();
    (accepted, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pairs: &[(usize, usize)]) -> Vec<TextSpan> {
        pairs.iter().map(|&(s, e)| TextSpan::new(s, e)).collect()
    }

    fn run(pairs: &[(usize, usize)]) -> (Vec<(usize, usize)>, usize) {
        let (kept, dropped) = deduplicate(spans(pairs), |s| *s);
        (kept.into_iter().map(|s| (s.start, s.end)).collect(), dropped)
    }

    #[test]
    fn longer_span_wins_on_equal_start() {
        assert_eq!(run(&[(0, 4), (0, 8)]), (vec![(0, 8)], 1));
    }

    #[test]
    fn nested_span_is_dropped() {
        // an email inside a longer organizational mention
        assert_eq!(run(&[(10, 40), (20, 35)]), (vec![(10, 40)], 1));
    }

    #[test]
    fn partial_overlap_keeps_earlier() {
        assert_eq!(run(&[(5, 12), (0, 7)]), (vec![(0, 7)], 1));
    }

    #[test]
    fn adjacent_spans_are_both_kept() {
        assert_eq!(run(&[(4, 9), (0, 4)]), (vec![(0, 4), (4, 9)], 0));
    }

    #[test]
    fn duplicates_keep_first_supplied() {
        let items = vec![("ner", TextSpan::new(0, 4)), ("regex", TextSpan::new(0, 4))];
        let (kept, dropped) = deduplicate(items, |(_, s)| *s);
        assert_eq!(kept, vec![("ner", TextSpan::new(0, 4))]);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn empty_input() {
        assert_eq!(run(&[]), (vec![], 0));
    }
}
