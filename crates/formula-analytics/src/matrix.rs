//! Pivot matrices: the cartesian product of several pivot groups over shared base predicates.
//!
//! A matrix over groups of sizes `n1, n2, ..., nk` has `n1 * n2 * ... * nk` entries, which easily
//! reaches tens of thousands. [`PivotMatrix`] therefore stores only the groups and instantiates an
//! entry's composite predicate when it is asked for. Entries are numbered by an *ordinal* in
//! mixed-radix order (the last group varies fastest); the ordinal doubles as the tie-breaker that
//! keeps result ordering stable across execution strategies.

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::group::{
    build_group_at, LabelStyle, NamedPredicate, PivotFn, PivotGroup, PivotMeta, PivotValues,
};
use crate::predicate::{all, Predicate};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;

/// A declarative pivot query: base predicates plus pivot functions with their values.
pub struct PivotSpec<R = Value> {
    pub label: String,
    pub base: Vec<Predicate<R>>,
    pub pivot_fns: Vec<PivotFn<R>>,
    pub pivot_values: Vec<PivotValues>,
    pub style: LabelStyle,
}

impl<R> Clone for PivotSpec<R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            base: self.base.clone(),
            pivot_fns: self.pivot_fns.clone(),
            pivot_values: self.pivot_values.clone(),
            style: self.style,
        }
    }
}

impl<R> fmt::Debug for PivotSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PivotSpec")
            .field("label", &self.label)
            .field("base", &self.base.len())
            .field("pivot_fns", &self.pivot_fns)
            .field("pivot_values", &self.pivot_values)
            .field("style", &self.style)
            .finish()
    }
}

impl<R: 'static> PivotSpec<R> {
    /// A single pivot labelled `"{label}-{value}"`.
    pub fn pivot(
        label: impl Into<String>,
        base: Vec<Predicate<R>>,
        pivot_fn: PivotFn<R>,
        pivot_values: PivotValues,
    ) -> Self {
        Self {
            label: label.into(),
            base,
            pivot_fns: vec![pivot_fn],
            pivot_values: vec![pivot_values],
            style: LabelStyle::Legacy,
        }
    }

    /// A pivot matrix labelled `"{label}-pivots_[{v1}|{v2}|...]"`.
    ///
    /// `pivot_fns` and `pivot_values` pair up positionally; the lengths are checked by
    /// [`PivotSpec::build`].
    pub fn matrix(
        label: impl Into<String>,
        base: Vec<Predicate<R>>,
        pivot_fns: Vec<PivotFn<R>>,
        pivot_values: Vec<PivotValues>,
    ) -> Self {
        Self {
            label: label.into(),
            base,
            pivot_fns,
            pivot_values,
            style: LabelStyle::Matrix,
        }
    }

    /// Validates the spec and instantiates its pivot groups.
    pub fn build(&self) -> AnalyticsResult<PivotMatrix<R>> {
        let groups = build_groups(&self.pivot_fns, &self.pivot_values, &self.label, self.style)?;
        build_matrix(self.base.clone(), groups, &self.label, self.style)
    }
}

fn build_groups<R>(
    pivot_fns: &[PivotFn<R>],
    pivot_value_lists: &[PivotValues],
    base_label: &str,
    style: LabelStyle,
) -> AnalyticsResult<Vec<PivotGroup<R>>> {
    if pivot_fns.len() != pivot_value_lists.len() {
        return Err(AnalyticsError::ArityMismatch {
            pivot_fns: pivot_fns.len(),
            value_lists: pivot_value_lists.len(),
        });
    }

    pivot_fns
        .iter()
        .zip(pivot_value_lists)
        .enumerate()
        .map(|(index, (pivot_fn, values))| {
            build_group_at(index, pivot_fn, values, base_label, style)
        })
        .collect()
}

/// Builds one matrix-style group per `(pivot_fn, values)` pair.
///
/// Fails with [`AnalyticsError::ArityMismatch`] before instantiating anything when the two lists
/// differ in length.
pub fn build_pivot_groups_matrix<R>(
    pivot_fns: &[PivotFn<R>],
    pivot_value_lists: &[PivotValues],
    base_label: &str,
) -> AnalyticsResult<Vec<PivotGroup<R>>> {
    build_groups(pivot_fns, pivot_value_lists, base_label, LabelStyle::Matrix)
}

/// Combines `base` with the cartesian product of `groups`.
///
/// Labels identify entries in result maps, so every entry must get a distinct one. Repeated pivot
/// values, or values that print the same (`200` and `"200"`), fail with
/// [`AnalyticsError::DuplicateLabel`]. A product that overflows `usize` fails with
/// [`AnalyticsError::MatrixTooLarge`].
pub fn build_matrix<R: 'static>(
    base: Vec<Predicate<R>>,
    groups: Vec<PivotGroup<R>>,
    base_label: &str,
    style: LabelStyle,
) -> AnalyticsResult<PivotMatrix<R>> {
    let shape: Vec<usize> = groups.iter().map(PivotGroup::len).collect();
    let len = shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| AnalyticsError::MatrixTooLarge {
            shape: shape.clone(),
        })?;
    log::debug!("pivot matrix {base_label}: groups {shape:?} -> {len} entries");

    let matrix = PivotMatrix {
        label: base_label.to_string(),
        base,
        groups,
        style,
        len,
    };
    matrix.check_labels()?;
    Ok(matrix)
}

/// The lazily enumerated cartesian product of pivot groups.
pub struct PivotMatrix<R = Value> {
    label: String,
    base: Vec<Predicate<R>>,
    groups: Vec<PivotGroup<R>>,
    style: LabelStyle,
    len: usize,
}

impl<R> fmt::Debug for PivotMatrix<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PivotMatrix")
            .field("label", &self.label)
            .field(
                "shape",
                &self.groups.iter().map(PivotGroup::len).collect::<Vec<_>>(),
            )
            .field("style", &self.style)
            .finish()
    }
}

impl<R: 'static> PivotMatrix<R> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of entries: the product of the group sizes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn groups(&self) -> &[PivotGroup<R>] {
        &self.groups
    }

    pub fn shape(&self) -> Vec<usize> {
        self.groups.iter().map(PivotGroup::len).collect()
    }

    /// Per-group pick indices of entry `ordinal`.
    pub fn coordinates(&self, ordinal: usize) -> Option<Vec<usize>> {
        if ordinal >= self.len {
            return None;
        }
        let mut coords = vec![0; self.groups.len()];
        let mut rest = ordinal;
        for (slot, group) in coords.iter_mut().zip(&self.groups).rev() {
            *slot = rest % group.len();
            rest /= group.len();
        }
        Some(coords)
    }

    /// Inverse of [`PivotMatrix::coordinates`].
    pub fn ordinal(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.groups.len() {
            return None;
        }
        coords
            .iter()
            .zip(&self.groups)
            .try_fold(0usize, |acc, (&c, group)| {
                (c < group.len()).then(|| acc * group.len() + c)
            })
    }

    fn picks(&self, coords: &[usize]) -> Option<Vec<&Value>> {
        coords
            .iter()
            .zip(&self.groups)
            .map(|(&c, group)| group.pick(c))
            .collect()
    }

    fn label_for(&self, picks: &[&Value]) -> String {
        let joined = picks
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("|");
        match self.style {
            LabelStyle::Legacy => format!("{}-{joined}", self.label),
            LabelStyle::Matrix => format!("{}-pivots_[{joined}]", self.label),
        }
    }

    /// Entry at `ordinal`, with its composite predicate `all(base..., pick1, pick2, ...)`.
    pub fn get(&self, ordinal: usize) -> Option<NamedPredicate<R>> {
        let coords = self.coordinates(ordinal)?;
        self.get_at(&coords)
    }

    /// Entry at the given per-group pick indices.
    pub fn get_at(&self, coords: &[usize]) -> Option<NamedPredicate<R>> {
        self.ordinal(coords)?;
        let picks = self.picks(coords)?;

        let mut parts = Vec::with_capacity(self.base.len() + coords.len());
        parts.extend(self.base.iter().cloned());
        for (&c, group) in coords.iter().zip(&self.groups) {
            parts.push(group.get(c)?.predicate.clone());
        }

        Some(NamedPredicate {
            predicate: all(parts),
            label: self.label_for(&picks),
            meta: Some(PivotMeta {
                base_label: self.label.clone(),
                pivot_values: picks.into_iter().cloned().collect(),
                coordinates: coords.to_vec(),
            }),
        })
    }

    /// Label of entry `ordinal`, without instantiating its predicate.
    pub fn label_of(&self, ordinal: usize) -> Option<String> {
        let coords = self.coordinates(ordinal)?;
        let picks = self.picks(&coords)?;
        Some(self.label_for(&picks))
    }

    fn check_labels(&self) -> AnalyticsResult<()> {
        let mut seen = HashMap::with_capacity(self.len);
        for ordinal in 0..self.len {
            let Some(label) = self.label_of(ordinal) else {
                continue;
            };
            if let Some(&first) = seen.get(&label) {
                return Err(AnalyticsError::DuplicateLabel {
                    label,
                    first,
                    second: ordinal,
                });
            }
            seen.insert(label, ordinal);
        }
        Ok(())
    }

    /// Looks an entry up by label. Linear in the matrix size.
    pub fn find(&self, label: &str) -> Option<NamedPredicate<R>> {
        (0..self.len)
            .find(|&ordinal| self.label_of(ordinal).as_deref() == Some(label))
            .and_then(|ordinal| self.get(ordinal))
    }

    /// All entries in ordinal order, instantiated one at a time.
    pub fn iter(&self) -> impl Iterator<Item = NamedPredicate<R>> + '_ {
        (0..self.len).filter_map(move |ordinal| self.get(ordinal))
    }
}
