//! Result sets returned by scans.

use crate::record::Entry;

/// Ordered `(key, entry)` pairs, in index order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entries {
    items: Vec<(Vec<u8>, Entry)>,
}

impl Entries {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, key: Vec<u8>, entry: Entry) {
        self.items.push((key, entry));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entry stored under `key`, if present
    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        self.items
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, e)| e)
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.items.iter().map(|(k, _)| k.as_slice())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Vec<u8>, Entry)> {
        self.items.iter()
    }
}

impl IntoIterator for Entries {
    type Item = (Vec<u8>, Entry);
    type IntoIter = std::vec::IntoIter<(Vec<u8>, Entry)>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Entries {
    type Item = &'a (Vec<u8>, Entry);
    type IntoIter = std::slice::Iter<'a, (Vec<u8>, Entry)>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
