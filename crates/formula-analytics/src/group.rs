//! Pivot groups: one parametrized predicate family instantiated once per pivot value.

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::predicate::{all, Predicate};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A parametrized predicate family.
///
/// The variant decides how pivot values are handed over: a single-argument function receives
/// each value on its own, a multi-argument function receives each tuple as a slice.
pub enum PivotFn<R = Value> {
    SingleArg(Arc<dyn Fn(&Value) -> Predicate<R> + Send + Sync>),
    MultiArg(Arc<dyn Fn(&[Value]) -> Predicate<R> + Send + Sync>),
}

impl<R> Clone for PivotFn<R> {
    fn clone(&self) -> Self {
        match self {
            PivotFn::SingleArg(f) => PivotFn::SingleArg(Arc::clone(f)),
            PivotFn::MultiArg(f) => PivotFn::MultiArg(Arc::clone(f)),
        }
    }
}

impl<R> fmt::Debug for PivotFn<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PivotFn::SingleArg(_) => f.write_str("PivotFn::SingleArg(..)"),
            PivotFn::MultiArg(_) => f.write_str("PivotFn::MultiArg(..)"),
        }
    }
}

impl<R> PivotFn<R> {
    pub fn single<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Predicate<R> + Send + Sync + 'static,
    {
        PivotFn::SingleArg(Arc::new(f))
    }

    pub fn multi<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Predicate<R> + Send + Sync + 'static,
    {
        PivotFn::MultiArg(Arc::new(f))
    }

    fn kind(&self) -> &'static str {
        match self {
            PivotFn::SingleArg(_) => "single-argument",
            PivotFn::MultiArg(_) => "multi-argument",
        }
    }
}

/// The values a [`PivotFn`] is instantiated with.
#[derive(Debug, Clone, PartialEq)]
pub enum PivotValues {
    Single(Vec<Value>),
    Multi(Vec<Vec<Value>>),
}

impl PivotValues {
    pub fn single<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        PivotValues::Single(values.into_iter().map(Into::into).collect())
    }

    pub fn multi<V, T>(tuples: impl IntoIterator<Item = T>) -> Self
    where
        V: Into<Value>,
        T: IntoIterator<Item = V>,
    {
        PivotValues::Multi(
            tuples
                .into_iter()
                .map(|t| t.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            PivotValues::Single(values) => values.len(),
            PivotValues::Multi(tuples) => tuples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            PivotValues::Single(_) => "single",
            PivotValues::Multi(_) => "tuple",
        }
    }
}

/// How pivot labels are spelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LabelStyle {
    /// `"{label}-{value}"`, used by single pivots.
    Legacy,
    /// `"{label}-pivot_{value}"` for group members and `"{label}-pivots_[{v1}|{v2}]"` for matrix
    /// entries.
    #[default]
    Matrix,
}

/// Where a named predicate came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotMeta {
    pub base_label: String,
    /// One value per pivot group, in group order. Multi-argument picks are [`Value::List`]s.
    pub pivot_values: Vec<Value>,
    /// Index of the pick within each group; empty for stand-alone group members.
    pub coordinates: Vec<usize>,
}

/// A predicate together with its display label.
pub struct NamedPredicate<R = Value> {
    pub predicate: Predicate<R>,
    pub label: String,
    pub meta: Option<PivotMeta>,
}

impl<R> Clone for NamedPredicate<R> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            label: self.label.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl<R> fmt::Debug for NamedPredicate<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedPredicate")
            .field("label", &self.label)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl<R> NamedPredicate<R> {
    pub fn new(label: impl Into<String>, predicate: Predicate<R>) -> Self {
        Self {
            predicate,
            label: label.into(),
            meta: None,
        }
    }

    pub fn test(&self, record: &R) -> bool {
        self.predicate.test(record)
    }

    pub fn pivot_values(&self) -> &[Value] {
        self.meta
            .as_ref()
            .map(|m| m.pivot_values.as_slice())
            .unwrap_or(&[])
    }
}

/// The instances of one pivot function over its value list, in value order.
pub struct PivotGroup<R = Value> {
    pub(crate) label: String,
    pub(crate) picks: Vec<Value>,
    pub(crate) members: Vec<NamedPredicate<R>>,
}

impl<R> Clone for PivotGroup<R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            picks: self.picks.clone(),
            members: self.members.clone(),
        }
    }
}

impl<R> fmt::Debug for PivotGroup<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PivotGroup")
            .field("label", &self.label)
            .field("members", &self.members)
            .finish()
    }
}

impl<R> PivotGroup<R> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&NamedPredicate<R>> {
        self.members.get(idx)
    }

    /// The pivot value (or tuple, as a [`Value::List`]) behind member `idx`.
    pub fn pick(&self, idx: usize) -> Option<&Value> {
        self.picks.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NamedPredicate<R>> {
        self.members.iter()
    }

    pub fn into_members(self) -> Vec<NamedPredicate<R>> {
        self.members
    }
}

/// Instantiates `pivot_fn` once per entry of `values`.
pub fn build_pivot_group<R>(
    pivot_fn: &PivotFn<R>,
    values: &PivotValues,
    label: &str,
    style: LabelStyle,
) -> AnalyticsResult<PivotGroup<R>> {
    build_group_at(0, pivot_fn, values, label, style)
}

pub(crate) fn build_group_at<R>(
    index: usize,
    pivot_fn: &PivotFn<R>,
    values: &PivotValues,
    label: &str,
    style: LabelStyle,
) -> AnalyticsResult<PivotGroup<R>> {
    let instances: Vec<(Value, Predicate<R>)> = match (pivot_fn, values) {
        (PivotFn::SingleArg(f), PivotValues::Single(values)) => {
            values.iter().map(|v| (v.clone(), f(v))).collect()
        }
        (PivotFn::MultiArg(f), PivotValues::Multi(tuples)) => tuples
            .iter()
            .map(|t| (Value::List(t.clone()), f(t.as_slice())))
            .collect(),
        _ => {
            return Err(AnalyticsError::PivotShapeMismatch {
                index,
                function: pivot_fn.kind(),
                values: values.kind(),
            })
        }
    };

    let mut picks = Vec::with_capacity(instances.len());
    let mut members = Vec::with_capacity(instances.len());
    for (pick, predicate) in instances {
        let member = match style {
            LabelStyle::Legacy => NamedPredicate::new(format!("{label}-{pick}"), predicate),
            LabelStyle::Matrix => NamedPredicate {
                predicate,
                label: format!("{label}-pivot_{pick}"),
                meta: Some(PivotMeta {
                    base_label: label.to_string(),
                    pivot_values: vec![pick.clone()],
                    coordinates: Vec::new(),
                }),
            },
        };
        picks.push(pick);
        members.push(member);
    }

    Ok(PivotGroup {
        label: label.to_string(),
        picks,
        members,
    })
}

/// Prefixes every instance with the shared base predicates: `all(base..., instance)`.
///
/// Labels and metadata are carried over unchanged.
pub fn combine_with_base<R: 'static>(
    base: &[Predicate<R>],
    instances: impl IntoIterator<Item = NamedPredicate<R>>,
) -> Vec<NamedPredicate<R>> {
    instances
        .into_iter()
        .map(|instance| NamedPredicate {
            predicate: all(base.iter().cloned().chain([instance.predicate])),
            label: instance.label,
            meta: instance.meta,
        })
        .collect()
}
