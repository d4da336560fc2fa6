//! Records decoded from spreadsheet rows.

use indexmap::IndexMap;

use crate::cell::Cell;

/// Value stored under a record key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// A single cell, under a field name.
    Value(Cell),
    /// Trailing cells of a long row, under the rest key.
    Rest(Vec<Cell>),
}

impl From<Cell> for Field {
    fn from(cell: Cell) -> Self {
        Field::Value(cell)
    }
}

/// A mapping from field name to value.
///
/// Keys keep the position of their first insertion. Equality ignores key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    entries: IndexMap<Cell, Field>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert a field. An existing key is overwritten in place.
    ///
    /// # Returns
    /// The previous value under `key`, if any.
    pub fn insert(&mut self, key: Cell, field: impl Into<Field>) -> Option<Field> {
        self.entries.insert(key, field.into())
    }

    /// Field stored under `key`.
    pub fn get(&self, key: &Cell) -> Option<&Field> {
        self.entries.get(key)
    }

    /// Single cell stored under `key`.
    pub fn value(&self, key: &Cell) -> Option<&Cell> {
        match self.get(key) {
            Some(Field::Value(cell)) => Some(cell),
            _ => None,
        }
    }

    /// Trailing cells stored under `key`.
    pub fn rest(&self, key: &Cell) -> Option<&[Cell]> {
        match self.get(key) {
            Some(Field::Rest(cells)) => Some(cells),
            _ => None,
        }
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &Cell) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the record has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Cell> {
        self.entries.keys()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Cell, &Field)> {
        self.entries.iter()
    }
}

impl<K: Into<Cell>, F: Into<Field>> FromIterator<(K, F)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, F)>>(iter: I) -> Self {
        let mut record: Record = Record::new();
        for (key, field) in iter {
            record.insert(key.into(), field);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (Cell, Field);
    type IntoIter = indexmap::map::IntoIter<Cell, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_last_write_wins() {
        let mut record: Record = Record::new();
        assert_eq!(record.insert("a".into(), Cell::Int(1)), None);
        record.insert("b".into(), Cell::Int(2));
        assert_eq!(
            record.insert("a".into(), Cell::Int(3)),
            Some(Field::Value(Cell::Int(1)))
        );

        assert_eq!(record.len(), 2);
        assert_eq!(record.value(&"a".into()), Some(&Cell::Int(3)));
        let keys: Vec<&Cell> = record.keys().collect();
        assert_eq!(keys, vec![&Cell::from("a"), &Cell::from("b")]);
    }

    #[test]
    fn test_equality_ignores_order() {
        let left: Record = [("a", Cell::Int(1)), ("b", Cell::Int(2))].into_iter().collect();
        let right: Record = [("b", Cell::Int(2)), ("a", Cell::Int(1))].into_iter().collect();
        assert_eq!(left, right);

        let other: Record = [("a", Cell::Int(1))].into_iter().collect();
        assert_ne!(left, other);
    }

    #[test]
    fn test_rest_and_value_accessors() {
        let mut record: Record = Record::new();
        record.insert(Cell::Null, Field::Rest(vec![Cell::Int(3)]));
        record.insert("a".into(), Cell::Int(1));

        assert_eq!(record.rest(&Cell::Null), Some(&[Cell::Int(3)][..]));
        assert_eq!(record.value(&Cell::Null), None);
        assert_eq!(record.rest(&"a".into()), None);
        assert!(record.contains_key(&Cell::Null));
        assert!(!record.contains_key(&"z".into()));
    }
}
