//! Result maps: one entry per evaluated pivot, sorted by value.

use crate::group::NamedPredicate;
use crate::parallel::Merge;
use crate::value::Value;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::ops::Add;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry<V = u64> {
    pub label: String,
    pub value: V,
    pub pivot_values: Vec<Value>,
    /// Per-group pick indices in the matrix that produced this entry.
    #[serde(skip)]
    pub coordinates: Vec<usize>,
    /// Enumeration index in the producing matrix; breaks ties when sorting.
    #[serde(skip)]
    pub ordinal: usize,
}

impl<V> ResultEntry<V> {
    pub fn new(label: impl Into<String>, value: V) -> Self {
        Self {
            label: label.into(),
            value,
            pivot_values: Vec::new(),
            coordinates: Vec::new(),
            ordinal: 0,
        }
    }

    pub(crate) fn from_named<R>(named: NamedPredicate<R>, value: V, ordinal: usize) -> Self {
        let (pivot_values, coordinates) = named
            .meta
            .map(|m| (m.pivot_values, m.coordinates))
            .unwrap_or_default();
        Self {
            label: named.label,
            value,
            pivot_values,
            coordinates,
            ordinal,
        }
    }

    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = ordinal;
        self
    }
}

/// Label → value, kept in a meaningful order (descending by value once sorted).
///
/// Equality is order-sensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMap<V = u64> {
    entries: Vec<ResultEntry<V>>,
    index: HashMap<String, usize>,
}

impl<V> Default for ResultMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> ResultMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts `entry`, replacing any entry with the same label in place.
    pub fn insert(&mut self, entry: ResultEntry<V>) {
        match self.index.get(&entry.label) {
            Some(&idx) => self.entries[idx] = entry,
            None => {
                self.index.insert(entry.label.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&ResultEntry<V>> {
        self.index.get(label).map(|&idx| &self.entries[idx])
    }

    pub fn value(&self, label: &str) -> Option<&V> {
        self.get(label).map(|e| &e.value)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultEntry<V>> {
        self.entries.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<ResultEntry<V>> {
        self.entries
    }

    /// `(label, value)` pairs in map order.
    pub fn to_pairs(&self) -> Vec<(&str, &V)> {
        self.entries
            .iter()
            .map(|e| (e.label.as_str(), &e.value))
            .collect()
    }

    fn retain(&mut self, mut keep: impl FnMut(&ResultEntry<V>) -> bool) {
        self.entries.retain(|e| keep(e));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (idx, entry) in self.entries.iter().enumerate() {
            self.index.insert(entry.label.clone(), idx);
        }
    }
}

impl<V: Ord> ResultMap<V> {
    /// Highest value first; equal values ordered by ordinal.
    pub fn sort_descending(&mut self) {
        self.entries
            .sort_by(|a, b| b.value.cmp(&a.value).then(a.ordinal.cmp(&b.ordinal)));
        self.reindex();
    }

    pub fn sorted(mut self) -> Self {
        self.sort_descending();
        self
    }
}

impl<V> FromIterator<ResultEntry<V>> for ResultMap<V> {
    fn from_iter<I: IntoIterator<Item = ResultEntry<V>>>(iter: I) -> Self {
        let mut map = ResultMap::new();
        for entry in iter {
            map.insert(entry);
        }
        map
    }
}

/// Key-wise addition. Entries present on one side only are kept as they are; the merged entry
/// keeps the smaller ordinal. The result is unsorted.
impl<V: Add<Output = V> + Default> Merge for ResultMap<V> {
    fn empty() -> Self {
        ResultMap::new()
    }

    fn merge(mut self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        for entry in other.entries {
            match self.index.get(&entry.label) {
                Some(&idx) => {
                    let slot = &mut self.entries[idx];
                    slot.value = std::mem::take(&mut slot.value) + entry.value;
                    slot.ordinal = slot.ordinal.min(entry.ordinal);
                }
                None => {
                    self.index.insert(entry.label.clone(), self.entries.len());
                    self.entries.push(entry);
                }
            }
        }
        self
    }
}

impl<V: Serialize> Serialize for ResultMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.entries)
    }
}

/// Entries whose label contains any of `key_terms` (all entries when `key_terms` is empty), in
/// their current order.
pub fn filter_pivots<V: Clone, S: AsRef<str>>(
    result_map: &ResultMap<V>,
    key_terms: &[S],
) -> ResultMap<V> {
    filter_pivots_by(result_map, key_terms, |_| true)
}

/// [`filter_pivots`], additionally keeping only entries whose value satisfies `count_predicate`.
pub fn filter_pivots_by<V, S, F>(
    result_map: &ResultMap<V>,
    key_terms: &[S],
    count_predicate: F,
) -> ResultMap<V>
where
    V: Clone,
    S: AsRef<str>,
    F: Fn(&V) -> bool,
{
    let mut out = result_map.clone();
    out.retain(|entry| {
        let label_matches = key_terms.is_empty()
            || key_terms
                .iter()
                .any(|term| entry.label.contains(term.as_ref()));
        label_matches && count_predicate(&entry.value)
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, u64)]) -> ResultMap {
        pairs
            .iter()
            .enumerate()
            .map(|(ordinal, (label, value))| {
                ResultEntry::new(*label, *value).with_ordinal(ordinal)
            })
            .collect()
    }

    #[test]
    fn sort_is_descending_with_ordinal_tie_break() {
        let sorted = map(&[("a", 1), ("b", 3), ("c", 1), ("d", 3)]).sorted();
        assert_eq!(
            sorted.to_pairs(),
            vec![("b", &3), ("d", &3), ("a", &1), ("c", &1)]
        );
        assert_eq!(sorted.get("c").map(|e| e.value), Some(1));
    }

    #[test]
    fn merge_adds_key_wise_and_has_identity() {
        let a = map(&[("x", 1), ("y", 2)]);
        let b = map(&[("y", 5), ("z", 1)]);

        let merged = a.clone().merge(b.clone()).sorted();
        assert_eq!(merged.to_pairs(), vec![("y", &7), ("x", &1), ("z", &1)]);
        assert_eq!(b.merge(a.clone()).sorted(), merged);

        assert_eq!(ResultMap::empty().merge(a.clone()), a);
        assert_eq!(a.clone().merge(ResultMap::empty()), a);
        assert_eq!(ResultMap::<u64>::merge_all(Vec::new()), ResultMap::new());
    }

    #[test]
    fn filter_by_terms_and_count() {
        let m = map(&[
            ("log-pivots_[GET|200]", 4),
            ("log-pivots_[POST|200]", 3),
            ("log-pivots_[GET|500]", 2),
        ]);

        let get = filter_pivots(&m, &["GET"]);
        assert_eq!(
            get.labels().collect::<Vec<_>>(),
            vec!["log-pivots_[GET|200]", "log-pivots_[GET|500]"]
        );

        let even = filter_pivots_by(&m, &[] as &[&str], |c| c % 2 == 0);
        assert_eq!(
            even.labels().collect::<Vec<_>>(),
            vec!["log-pivots_[GET|200]", "log-pivots_[GET|500]"]
        );

        let post_even = filter_pivots_by(&m, &["POST", "500"], |c| c % 2 == 0);
        assert_eq!(
            post_even.labels().collect::<Vec<_>>(),
            vec!["log-pivots_[GET|500]"]
        );
        assert_eq!(post_even.value("log-pivots_[GET|500]"), Some(&2));
        assert!(!post_even.contains("log-pivots_[GET|200]"));
    }

    #[test]
    fn serializes_entries_in_order() {
        let m = map(&[("a", 2), ("b", 1)]);
        assert_eq!(
            serde_json::to_string(&m).unwrap(),
            r#"[{"label":"a","value":2,"pivotValues":[]},{"label":"b","value":1,"pivotValues":[]}]"#
        );
    }
}
