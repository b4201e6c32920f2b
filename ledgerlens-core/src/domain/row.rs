//! Row: an ordered field→string mapping produced by the normalizer.

use super::record::Record;
use std::borrow::Cow;

/// One data row keyed by header name, in header order.
///
/// Lookups of absent keys yield the empty string so that every downstream
/// consumer can treat a missing column exactly like a blank cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any existing value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Value for `key`, or `""` when the row has no such column.
    pub fn get(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Record for Row {
    const NUMERIC_FIELDS: &'static [&'static str] = &[];

    fn field(&self, name: &str) -> Cow<'_, str> {
        Cow::Borrowed(self.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_empty() {
        let row: Row = [("symbol", "EURUSD")].into_iter().collect();
        assert_eq!(row.get("symbol"), "EURUSD");
        assert_eq!(row.get("profit"), "");
        assert!(!row.contains_key("profit"));
    }

    #[test]
    fn insert_replaces_and_keeps_order() {
        let mut row = Row::new();
        row.insert("b", "1");
        row.insert("a", "2");
        row.insert("b", "3");
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(row.get("b"), "3");
        assert_eq!(row.len(), 2);
    }
}
