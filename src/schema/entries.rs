//! Insertion-ordered, name-keyed entry collection

use std::collections::HashMap;

use tracing::debug;

use super::Entry;
use crate::error::{Result, SchemaError};
use crate::names;

/// Ordered collection of record entries with unique names.
///
/// Names are settled on insertion: a colliding entry is renamed with the next
/// free `_N` suffix, and re-adding an entry that matches an existing one is a
/// no-op.
#[derive(Debug, Clone, Default)]
pub struct OrderedEntries {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl PartialEq for OrderedEntries {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl OrderedEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.position(name).map(|position| &self.entries[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Entries in current order; each call starts a fresh pass
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Entry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Entry::name)
    }

    /// Append an entry, resolving name collisions.
    ///
    /// Returns the stored entry, which may carry a suffixed name, or the
    /// existing entry when an identical declaration is already present.
    pub fn add(&mut self, entry: Entry) -> &Entry {
        let base = entry.name().to_string();
        let mut index = 0;
        loop {
            let candidate = names::suffixed(&base, index);
            match self.position(&candidate) {
                None => {
                    let entry = if index == 0 {
                        entry
                    } else {
                        debug!(from = %base, to = %candidate, "entry name collision resolved");
                        entry.renamed(candidate)
                    };
                    return self.push(entry);
                }
                Some(position) if self.entries[position].same_declaration(&entry) => {
                    return &self.entries[position];
                }
                Some(_) => index += 1,
            }
        }
    }

    fn push(&mut self, entry: Entry) -> &Entry {
        let position = self.entries.len();
        self.index.insert(entry.name().to_string(), position);
        self.entries.push(entry);
        &self.entries[position]
    }

    /// Remove an entry by name; absent names are ignored
    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        let position = self.position(name)?;
        let removed = self.entries.remove(position);
        self.reindex();
        Some(removed)
    }

    /// Replace the entry stored under `name` in place, keeping its position
    pub fn replace(&mut self, name: &str, entry: Entry) -> Result<()> {
        let position = self
            .position(name)
            .ok_or_else(|| SchemaError::NotInSchema(name.to_string()))?;
        if entry.name() != name && self.contains(entry.name()) {
            return Err(SchemaError::InvalidFormat(format!(
                "cannot rename {} to {}: name already used",
                name,
                entry.name()
            )));
        }
        self.entries[position] = entry;
        self.reindex();
        Ok(())
    }

    /// Move `name` directly before `pivot`
    pub fn move_before(&mut self, pivot: &str, name: &str) -> Result<()> {
        let (from, to) = self.positions(pivot, name)?;
        if from == to {
            return Ok(());
        }
        let entry = self.entries.remove(from);
        let target = if from < to { to - 1 } else { to };
        self.entries.insert(target, entry);
        self.reindex();
        Ok(())
    }

    /// Move `name` directly after `pivot`
    pub fn move_after(&mut self, pivot: &str, name: &str) -> Result<()> {
        let (from, to) = self.positions(pivot, name)?;
        if from == to {
            return Ok(());
        }
        let entry = self.entries.remove(from);
        let target = if from < to { to } else { to + 1 };
        self.entries.insert(target, entry);
        self.reindex();
        Ok(())
    }

    /// Exchange the positions of two entries
    pub fn swap(&mut self, first: &str, second: &str) -> Result<()> {
        let (a, b) = self.positions(first, second)?;
        self.entries.swap(a, b);
        self.reindex();
        Ok(())
    }

    /// Positions of `name` and `pivot`, in that order
    fn positions(&self, pivot: &str, name: &str) -> Result<(usize, usize)> {
        let from = self
            .position(name)
            .ok_or_else(|| SchemaError::NotInSchema(name.to_string()))?;
        let to = self
            .position(pivot)
            .ok_or_else(|| SchemaError::NotInSchema(pivot.to_string()))?;
        Ok((from, to))
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.name().to_string(), position))
            .collect();
    }
}

impl<'a> IntoIterator for &'a OrderedEntries {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for OrderedEntries {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntryBuilder, SchemaKind};

    fn entry(label: &str, kind: SchemaKind) -> Entry {
        EntryBuilder::new()
            .with_name(label)
            .with_type(kind)
            .build()
            .unwrap()
    }

    fn collection(names: &[&str]) -> OrderedEntries {
        let mut entries = OrderedEntries::new();
        for name in names {
            entries.add(entry(name, SchemaKind::String));
        }
        entries
    }

    fn order(entries: &OrderedEntries) -> Vec<&str> {
        entries.names().collect()
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let entries = collection(&["c", "a", "b"]);
        assert_eq!(order(&entries), vec!["c", "a", "b"]);
        assert_eq!(entries.position("a"), Some(1));
    }

    #[test]
    fn test_add_resolves_collisions() {
        let mut entries = OrderedEntries::new();
        assert_eq!(entries.add(entry("70歳以上", SchemaKind::String)).name(), "_0___");
        assert_eq!(entries.add(entry("60歳以上", SchemaKind::String)).name(), "_0____1");
        assert_eq!(entries.add(entry("a", SchemaKind::String)).name(), "a");
        assert_eq!(entries.add(entry("a", SchemaKind::Int)).name(), "a_1");
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn test_identical_redeclaration_is_noop() {
        let mut entries = OrderedEntries::new();
        entries.add(entry("70歳以上", SchemaKind::String));
        entries.add(entry("60歳以上", SchemaKind::String));
        entries.add(entry("b", SchemaKind::String));

        assert_eq!(entries.add(entry("60歳以上", SchemaKind::String)).name(), "_0____1");
        assert_eq!(entries.add(entry("b", SchemaKind::String)).name(), "b");
        assert_eq!(order(&entries), vec!["_0___", "_0____1", "b"]);
    }

    #[test]
    fn test_suffix_restarts_after_remove() {
        let mut entries = collection(&["x", "x"]);
        entries.add(entry("x", SchemaKind::Int));
        entries.add(entry("x", SchemaKind::Long));
        assert_eq!(order(&entries), vec!["x", "x_1", "x_2"]);

        entries.remove("x_1");
        assert_eq!(entries.add(entry("x", SchemaKind::Double)).name(), "x_1");
        assert_eq!(order(&entries), vec!["x", "x_2", "x_1"]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut entries = collection(&["a", "b"]);
        assert!(entries.remove("zzz").is_none());
        assert_eq!(entries.remove("a").map(|e| e.name().to_string()), Some("a".to_string()));
        assert_eq!(order(&entries), vec!["b"]);
        assert_eq!(entries.position("b"), Some(0));
    }

    #[test]
    fn test_move_before() {
        let mut entries = collection(&["a", "b", "c", "d"]);
        entries.move_before("a", "c").unwrap();
        assert_eq!(order(&entries), vec!["c", "a", "b", "d"]);
        entries.move_before("d", "c").unwrap();
        assert_eq!(order(&entries), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_move_after() {
        let mut entries = collection(&["a", "b", "c", "d"]);
        entries.move_after("d", "a").unwrap();
        assert_eq!(order(&entries), vec!["b", "c", "d", "a"]);
        entries.move_after("b", "a").unwrap();
        assert_eq!(order(&entries), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_move_unknown_name_fails() {
        let mut entries = collection(&["a", "b"]);
        assert!(matches!(entries.move_before("a", "zz"), Err(SchemaError::NotInSchema(n)) if n == "zz"));
        assert!(matches!(entries.move_after("zz", "a"), Err(SchemaError::NotInSchema(n)) if n == "zz"));
        assert_eq!(order(&entries), vec!["a", "b"]);
    }

    #[test]
    fn test_swap() {
        let mut entries = collection(&["a", "b", "c"]);
        entries.swap("a", "c").unwrap();
        assert_eq!(order(&entries), vec!["c", "b", "a"]);
        assert_eq!(entries.get("a").map(Entry::name), Some("a"));
        assert!(entries.swap("a", "nope").is_err());
    }

    #[test]
    fn test_iteration_is_restartable() {
        let entries = collection(&["a", "b"]);
        let first: Vec<_> = entries.iter().map(Entry::name).collect();
        let second: Vec<_> = (&entries).into_iter().map(Entry::name).collect();
        assert_eq!(first, second);
    }
}
