//! TOC algorithm core: forest building, traversal, outline export and the
//! scroll-position fallback for the visibility tracker.
//!
//! Everything in this module is pure so it can be tested natively; the
//! DOM-facing half lives in [`extract`].

pub(crate) mod extract;

use crate::models::{HeadingRecord, TocNode};

/// A candidate content region must have strictly more words than this.
pub(crate) const SUBSTANTIAL_WORD_COUNT: usize = 200;

/// Lookahead below the scroll top when picking the "currently read" heading.
pub(crate) const SCROLL_BUFFER_PX: f64 = 100.0;

/// Lead-in above a heading when navigating to it.
pub(crate) const SCROLL_LEAD_IN_PX: f64 = 20.0;

pub(crate) const MIN_PANEL_WIDTH: f64 = 200.0;
pub(crate) const MAX_PANEL_WIDTH: f64 = 600.0;
pub(crate) const MIN_PANEL_HEIGHT: f64 = 300.0;
pub(crate) const MAX_PANEL_HEIGHT: f64 = 800.0;

/// Substantiality test for content-region candidates: whitespace-tokenized
/// word count must exceed [`SUBSTANTIAL_WORD_COUNT`] (exclusive).
pub(crate) fn is_substantial_text(text: &str) -> bool {
    text.split_whitespace().count() > SUBSTANTIAL_WORD_COUNT
}

pub(crate) fn clamp_panel_width(width: f64) -> f64 {
    width.clamp(MIN_PANEL_WIDTH, MAX_PANEL_WIDTH)
}

pub(crate) fn clamp_panel_height(height: f64) -> f64 {
    height.clamp(MIN_PANEL_HEIGHT, MAX_PANEL_HEIGHT)
}

/// Convert a position-ordered heading list into a forest.
///
/// Single left-to-right pass over an explicit ancestor stack: a heading
/// closes every open heading at the same or lesser depth, then becomes a
/// root (empty stack) or the last child of the new stack top. A deep
/// heading with no shallower predecessor becomes a root; no synthetic
/// parents are invented.
pub(crate) fn build_forest(headings: Vec<HeadingRecord>) -> Vec<TocNode> {
    let mut roots: Vec<TocNode> = Vec::new();
    let mut open: Vec<TocNode> = Vec::new();

    fn close_top(open: &mut Vec<TocNode>, roots: &mut Vec<TocNode>) {
        if let Some(done) = open.pop() {
            match open.last_mut() {
                Some(parent) => parent.children.push(done),
                None => roots.push(done),
            }
        }
    }

    for record in headings {
        while open
            .last()
            .is_some_and(|top| top.record.level >= record.level)
        {
            close_top(&mut open, &mut roots);
        }
        open.push(TocNode::leaf(record));
    }

    while !open.is_empty() {
        close_top(&mut open, &mut roots);
    }

    roots
}

/// Depth-first `index` order of the forest. Equals the extraction order
/// for any forest produced by [`build_forest`].
pub(crate) fn flatten_indices(forest: &[TocNode]) -> Vec<usize> {
    fn walk(nodes: &[TocNode], out: &mut Vec<usize>) {
        for node in nodes {
            out.push(node.record.index);
            walk(&node.children, out);
        }
    }

    let mut out = Vec::new();
    walk(forest, &mut out);
    out
}

pub(crate) fn find_node<'a>(forest: &'a [TocNode], index: usize) -> Option<&'a TocNode> {
    for node in forest {
        if node.record.index == index {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, index) {
            return Some(found);
        }
    }
    None
}

/// The heading currently being read, by scroll position alone.
///
/// Deepest-processed node whose recorded offset is at most
/// `scroll_top + SCROLL_BUFFER_PX`; children are only considered while
/// their parent qualifies. Returns `None` when nothing has been scrolled
/// past yet. Full-forest scan per call is an accepted scaling limit for
/// typical documents.
pub(crate) fn fallback_active_index(forest: &[TocNode], scroll_top: f64) -> Option<usize> {
    let limit = scroll_top + SCROLL_BUFFER_PX;
    let mut current = None;

    fn check(node: &TocNode, limit: f64, current: &mut Option<usize>) {
        if node.record.vertical_offset <= limit {
            *current = Some(node.record.index);
            for child in &node.children {
                check(child, limit, current);
            }
        }
    }

    for node in forest {
        check(node, limit, &mut current);
    }
    current
}

/// Serialize the forest as an indented outline: two spaces per depth
/// level, one `<level>. <text>` line per node.
pub(crate) fn plain_text_outline(forest: &[TocNode]) -> String {
    fn walk(nodes: &[TocNode], depth: usize, out: &mut String) {
        for node in nodes {
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(&node.record.level.to_string());
            out.push_str(". ");
            out.push_str(&node.record.text);
            out.push('\n');
            walk(&node.children, depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(forest, 0, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, text: &str, index: usize, offset: f64) -> HeadingRecord {
        HeadingRecord {
            level,
            text: text.to_string(),
            index,
            vertical_offset: offset,
        }
    }

    #[test]
    fn forest_nests_deeper_levels_and_splits_siblings() {
        // H1("A")@0, H2("B")@500 under A, H1("C")@1000.
        let forest = build_forest(vec![
            heading(1, "A", 0, 0.0),
            heading(2, "B", 1, 500.0),
            heading(1, "C", 2, 1000.0),
        ]);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].record.text, "A");
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].record.text, "B");
        assert_eq!(forest[1].record.text, "C");
        assert!(forest[1].children.is_empty());
    }

    #[test]
    fn deep_heading_without_shallower_predecessor_becomes_root() {
        let forest = build_forest(vec![
            heading(3, "orphan", 0, 0.0),
            heading(1, "first real h1", 1, 100.0),
        ]);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].record.level, 3);
        assert!(forest[0].children.is_empty());
        assert_eq!(forest[1].record.level, 1);
    }

    #[test]
    fn same_level_heading_closes_its_sibling() {
        let forest = build_forest(vec![
            heading(2, "one", 0, 0.0),
            heading(3, "one.a", 1, 10.0),
            heading(2, "two", 2, 20.0),
        ]);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].children.len(), 1);
        assert!(forest[1].children.is_empty());
    }

    #[test]
    fn flatten_reproduces_extraction_order() {
        let headings: Vec<HeadingRecord> = [
            (1u8, 0usize),
            (2, 1),
            (3, 2),
            (2, 3),
            (1, 4),
            (4, 5),
            (2, 6),
        ]
        .iter()
        .map(|&(level, index)| heading(level, "hd", index, index as f64 * 50.0))
        .collect();

        let forest = build_forest(headings);
        assert_eq!(flatten_indices(&forest), vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn children_are_strictly_deeper_than_parents() {
        fn assert_invariant(nodes: &[TocNode], max_level: u8) {
            for node in nodes {
                assert!(node.record.level <= max_level);
                for child in &node.children {
                    assert!(child.record.level > node.record.level);
                }
                assert_invariant(&node.children, max_level);
            }
        }

        let headings: Vec<HeadingRecord> = [3u8, 1, 2, 2, 5, 4, 6, 1, 3, 3, 2]
            .iter()
            .enumerate()
            .map(|(i, &level)| heading(level, "hd", i, i as f64 * 25.0))
            .collect();

        assert_invariant(&build_forest(headings), 6);
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        assert!(build_forest(vec![]).is_empty());
        assert_eq!(plain_text_outline(&[]), "");
        assert_eq!(fallback_active_index(&[], 1000.0), None);
    }

    #[test]
    fn find_node_searches_nested_children() {
        let forest = build_forest(vec![
            heading(1, "A", 0, 0.0),
            heading(2, "B", 1, 500.0),
            heading(1, "C", 2, 1000.0),
        ]);

        assert_eq!(find_node(&forest, 1).map(|n| n.record.text.as_str()), Some("B"));
        assert_eq!(find_node(&forest, 2).map(|n| n.record.text.as_str()), Some("C"));
        assert!(find_node(&forest, 7).is_none());
    }

    #[test]
    fn outline_matches_expected_format() {
        let forest = build_forest(vec![
            heading(1, "Intro", 0, 0.0),
            heading(2, "Background", 1, 500.0),
        ]);

        assert_eq!(plain_text_outline(&forest), "1. Intro\n  2. Background\n");
    }

    #[test]
    fn fallback_prefers_deepest_heading_within_buffer() {
        // A@0 > B@500 (child) > C@1000; scroll 600 + 100 buffer reaches B
        // but not C, and the deeper match wins over A.
        let forest = build_forest(vec![
            heading(1, "A", 0, 0.0),
            heading(2, "B", 1, 500.0),
            heading(1, "C", 2, 1000.0),
        ]);

        assert_eq!(fallback_active_index(&forest, 600.0), Some(1));
    }

    #[test]
    fn fallback_none_before_first_heading() {
        let forest = build_forest(vec![heading(1, "A", 0, 400.0)]);
        assert_eq!(fallback_active_index(&forest, 100.0), None);
        // Exactly on the buffer boundary still counts.
        assert_eq!(fallback_active_index(&forest, 300.0), Some(0));
    }

    #[test]
    fn substantiality_threshold_is_exclusive() {
        let exactly_200 = vec!["word"; 200].join(" ");
        let exactly_201 = vec!["word"; 201].join(" ");
        assert!(!is_substantial_text(&exactly_200));
        assert!(is_substantial_text(&exactly_201));
        assert!(!is_substantial_text("   "));
    }

    #[test]
    fn resize_clamps_to_bounds() {
        assert_eq!(clamp_panel_width(150.0), 200.0);
        assert_eq!(clamp_panel_width(900.0), 600.0);
        assert_eq!(clamp_panel_width(280.0), 280.0);
        assert_eq!(clamp_panel_height(100.0), 300.0);
        assert_eq!(clamp_panel_height(1000.0), 800.0);
    }
}
