use std::collections::HashSet;

use crate::model::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Discard the existing collection.
    Reset,
    /// Extend the existing collection with unseen items.
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub items: Vec<Item>,
    /// Incoming items dropped because their id was already present.
    pub duplicates: usize,
}

pub fn merge(existing: &[Item], incoming: &[Item], mode: MergeMode) -> Vec<Item> {
    merge_counted(existing, incoming, mode).items
}

/// Like [`merge`], but also reports how many incoming items were dropped.
///
/// Listings may repeat boundary items across pages; those repeats are dropped
/// silently and keep the position of their first arrival.
pub fn merge_counted(existing: &[Item], incoming: &[Item], mode: MergeMode) -> MergeOutcome {
    let base: &[Item] = match mode {
        MergeMode::Reset => &[],
        MergeMode::Append => existing,
    };
    let mut seen: HashSet<&str> = base.iter().map(|item| item.id.as_str()).collect();
    let mut items = Vec::with_capacity(base.len() + incoming.len());
    items.extend_from_slice(base);
    let mut duplicates = 0;
    for item in incoming {
        if seen.insert(item.id.as_str()) {
            items.push(item.clone());
        } else {
            duplicates += 1;
        }
    }
    MergeOutcome { items, duplicates }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(id: &str) -> Item {
        Item {
            id: id.into(),
            title: format!("title {id}"),
            author: "author".into(),
            score: 0,
            comment_count: 0,
            created_at: Utc::now(),
            thumbnail_url: None,
            target_url: String::new(),
            permalink: String::new(),
        }
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn append_drops_boundary_duplicate() {
        let first = merge(&[], &[item("a"), item("b"), item("c")], MergeMode::Append);
        let second = merge(&first, &[item("c"), item("d"), item("e")], MergeMode::Append);
        assert_eq!(ids(&second), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn reset_ignores_existing_and_dedups_incoming() {
        let existing = vec![item("x"), item("y")];
        let outcome = merge_counted(
            &existing,
            &[item("a"), item("b"), item("a")],
            MergeMode::Reset,
        );
        assert_eq!(ids(&outcome.items), vec!["a", "b"]);
        assert_eq!(outcome.duplicates, 1);
    }

    #[test]
    fn append_keeps_first_occurrence_within_page() {
        let mut first = item("a");
        first.title = "first".into();
        let mut repeat = item("a");
        repeat.title = "repeat".into();
        let merged = merge(&[first], &[repeat, item("b")], MergeMode::Append);
        assert_eq!(ids(&merged), vec!["a", "b"]);
        assert_eq!(merged[0].title, "first");
    }

    #[test]
    fn merge_is_deterministic_and_leaves_inputs_alone() {
        let existing = vec![item("a")];
        let incoming = vec![item("b"), item("a")];
        let once = merge(&existing, &incoming, MergeMode::Append);
        let twice = merge(&existing, &incoming, MergeMode::Append);
        assert_eq!(once, twice);
        assert_eq!(ids(&existing), vec!["a"]);
        assert_eq!(ids(&incoming), vec!["b", "a"]);
    }

    #[test]
    fn no_duplicates_across_mixed_sequences() {
        let pages: Vec<(Vec<Item>, MergeMode)> = vec![
            (vec![item("a"), item("b")], MergeMode::Append),
            (vec![item("b"), item("c"), item("c")], MergeMode::Append),
            (vec![item("c"), item("a")], MergeMode::Reset),
            (vec![item("a"), item("d"), item("c")], MergeMode::Append),
        ];
        let mut items = Vec::new();
        for (page, mode) in pages {
            items = merge(&items, &page, mode);
            let unique: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();
            assert_eq!(unique.len(), items.len());
        }
        assert_eq!(ids(&items), vec!["c", "a", "d"]);
    }
}
