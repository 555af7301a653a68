//! Value-frequency tables: how often each value occurs under each key.
//!
//! A [`FrequencyMap`] maps a record key to a [`Tally`] of stringified values. Tables built over
//! separate partitions combine with [`merge_value_frequencies`], which is associative and
//! commutative, so partitioned aggregation yields the same table as a sequential fold.
//!
//! Both containers remember insertion order (that is what [`sort_value_frequencies`] reorders),
//! but equality ignores it: two tables are equal when they hold the same counts.

use crate::options::EvalOptions;
use crate::parallel::{fork_join_merge, Merge};
use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Insertion-ordered counter keyed by stringified value.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: &str, count: u64) {
        match self.index.get(key) {
            Some(&idx) => {
                let slot = &mut self.entries[idx].1;
                *slot = slot.saturating_add(count);
            }
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), count));
            }
        }
    }

    /// Count for `key`; zero when it was never seen.
    pub fn get(&self, key: &str) -> u64 {
        self.index.get(key).map(|&idx| self.entries[idx].1).unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().fold(0u64, |acc, (_, c)| acc.saturating_add(*c))
    }

    /// Stable sort by count, highest first; equal counts keep their current relative order.
    pub fn sort_descending(&mut self) {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (idx, (key, _)) in self.entries.iter().enumerate() {
            self.index.insert(key.clone(), idx);
        }
    }
}

impl PartialEq for Tally {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, c)| other.contains(k) && other.get(k) == c)
    }
}

impl Eq for Tally {}

impl Merge for Tally {
    fn empty() -> Self {
        Tally::new()
    }

    fn merge(mut self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        for (key, count) in other.entries {
            self.add(&key, count);
        }
        self
    }
}

impl<K: AsRef<str>> FromIterator<(K, u64)> for Tally {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut tally = Tally::new();
        for (k, c) in iter {
            tally.add(k.as_ref(), c);
        }
        tally
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, c) in self.iter() {
            map.serialize_entry(k, &c)?;
        }
        map.end()
    }
}

/// Key → value → occurrence count.
#[derive(Debug, Clone, Default)]
pub struct FrequencyMap {
    fields: Vec<(String, Tally)>,
    index: HashMap<String, usize>,
}

impl FrequencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence of `value` under `key`.
    pub fn record(&mut self, key: &str, value: &str) {
        self.tally_mut(key).increment(value);
    }

    pub fn get(&self, key: &str) -> Option<&Tally> {
        self.index.get(key).map(|&idx| &self.fields[idx].1)
    }

    /// Count of `value` under `key`; zero when either was never seen.
    pub fn count(&self, key: &str, value: &str) -> u64 {
        self.get(key).map(|t| t.get(value)).unwrap_or(0)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tally)> {
        self.fields.iter().map(|(k, t)| (k.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn tally_mut(&mut self, key: &str) -> &mut Tally {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                let idx = self.fields.len();
                self.index.insert(key.to_string(), idx);
                self.fields.push((key.to_string(), Tally::new()));
                idx
            }
        };
        &mut self.fields[idx].1
    }
}

impl PartialEq for FrequencyMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, t)| other.get(k).is_some_and(|o| o == t))
    }
}

impl Eq for FrequencyMap {}

impl Merge for FrequencyMap {
    fn empty() -> Self {
        FrequencyMap::new()
    }

    fn merge(mut self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        for (key, tally) in other.fields {
            let slot = self.tally_mut(&key);
            *slot = std::mem::take(slot).merge(tally);
        }
        self
    }
}

impl<K: AsRef<str>> FromIterator<(K, Tally)> for FrequencyMap {
    fn from_iter<I: IntoIterator<Item = (K, Tally)>>(iter: I) -> Self {
        let mut map = FrequencyMap::new();
        for (k, tally) in iter {
            let slot = map.tally_mut(k.as_ref());
            *slot = std::mem::take(slot).merge(tally);
        }
        map
    }
}

impl Serialize for FrequencyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, t) in self.iter() {
            map.serialize_entry(k, t)?;
        }
        map.end()
    }
}

/// Where in each record to aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFilter {
    /// Keys walked through nested records before tallying. Records on which the path does not
    /// resolve are skipped.
    pub key_path: Vec<String>,
    /// When non-empty, only these keys are tallied (in this order); keys absent from a record are
    /// skipped for that record.
    pub key_set: Vec<String>,
    /// How many levels of nested records below the resolved level are tallied as well, under
    /// dotted key names (`"parent.child"`). Zero tallies the resolved level only.
    ///
    /// Dotted names share the key space of the resolved level: a literal `"parent.child"` key and
    /// a nested `child` under `parent` are tallied together. Leave the depth at zero for records
    /// whose keys contain dots.
    pub max_depth: usize,
}

impl KeyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path<S: Into<String>>(mut self, path: impl IntoIterator<Item = S>) -> Self {
        self.key_path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.key_set = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn tally_value(acc: &mut FrequencyMap, key: &str, value: &Value, depth: usize) {
    acc.record(key, &value.to_string());
    if depth == 0 {
        return;
    }
    if let Value::Record(nested) = value {
        for (child, child_value) in nested.iter() {
            tally_value(acc, &format!("{key}.{child}"), child_value, depth - 1);
        }
    }
}

/// Tallies one record into `acc`.
///
/// Only record-shaped targets are aggregated: if `filter.key_path` resolves to a scalar or a list,
/// or does not resolve at all, `acc` is returned unchanged.
pub fn value_frequencies(
    mut acc: FrequencyMap,
    record: &Value,
    filter: &KeyFilter,
) -> FrequencyMap {
    let Some(target) = record.resolve(&filter.key_path) else {
        log::trace!("key path {:?} did not resolve; record skipped", filter.key_path);
        return acc;
    };
    let Some(fields) = target.as_record() else {
        return acc;
    };

    if filter.key_set.is_empty() {
        for (key, value) in fields.iter() {
            tally_value(&mut acc, key, value, filter.max_depth);
        }
    } else {
        for key in &filter.key_set {
            if let Some(value) = fields.get(key) {
                tally_value(&mut acc, key, value, filter.max_depth);
            }
        }
    }
    acc
}

/// Key-wise, value-wise sum of two tables.
pub fn merge_value_frequencies(m1: FrequencyMap, m2: FrequencyMap) -> FrequencyMap {
    m1.merge(m2)
}

/// Tallies every record of `records`.
pub fn collect_value_frequencies(
    records: &[Value],
    filter: &KeyFilter,
    options: impl Into<EvalOptions>,
) -> FrequencyMap {
    let options = options.into();
    let fold = |chunk: &[Value]| {
        chunk
            .iter()
            .fold(FrequencyMap::new(), |acc, record| value_frequencies(acc, record, filter))
    };

    if !options.parallelism.splits_collection() {
        return fold(records);
    }
    fork_join_merge(records, options.chunk_len(records.len()), fold)
}

/// Tallies the values `extractor` pulls out of each record.
///
/// The extractor may return several sub-records per record (e.g. the concatenation of a few
/// nested paths); each one is tallied as if it were a top-level record.
pub fn collect_value_frequencies_for<R, F>(
    records: &[R],
    extractor: F,
    options: impl Into<EvalOptions>,
) -> FrequencyMap
where
    R: Sync,
    F: Fn(&R) -> Vec<&Value> + Sync + Send,
{
    let options = options.into();
    let filter = KeyFilter::default();
    let fold = |chunk: &[R]| {
        chunk.iter().fold(FrequencyMap::new(), |acc, record| {
            extractor(record)
                .into_iter()
                .fold(acc, |acc, value| value_frequencies(acc, value, &filter))
        })
    };

    if !options.parallelism.splits_collection() {
        return fold(records);
    }
    fork_join_merge(records, options.chunk_len(records.len()), fold)
}

/// Orders every tally by count, highest first. Ties keep their encounter order, so sorting an
/// already sorted table changes nothing.
pub fn sort_value_frequencies(mut map: FrequencyMap) -> FrequencyMap {
    for (_, tally) in map.fields.iter_mut() {
        tally.sort_descending();
    }
    map
}
