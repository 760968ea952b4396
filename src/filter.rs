use crate::model::Item;

/// Items whose title or author contains `term`, case-insensitively, in their
/// original order. Only the empty term matches everything; whitespace is part of
/// the needle.
pub fn visible(items: &[Item], term: &str) -> Vec<Item> {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| matches(item, &needle))
        .cloned()
        .collect()
}

fn matches(item: &Item, needle: &str) -> bool {
    item.title.to_lowercase().contains(needle) || item.author.to_lowercase().contains(needle)
}
