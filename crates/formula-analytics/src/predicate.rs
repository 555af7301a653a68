//! Predicates and their combinators.
//!
//! A [`Predicate`] is a cheap-to-clone, thread-safe boolean test over one record. Predicates over
//! [`Value`] are *capability-typed*: a numeric test applied to text is simply `false`, never an
//! error, so mixed collections can be scanned without pre-filtering. Compose a type guard first
//! when the intent should be explicit, e.g. `all([is_number(), is_even()])`.

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

pub struct Predicate<R: ?Sized = Value> {
    test: Arc<dyn Fn(&R) -> bool + Send + Sync>,
}

impl<R: ?Sized> Clone for Predicate<R> {
    fn clone(&self) -> Self {
        Self {
            test: Arc::clone(&self.test),
        }
    }
}

impl<R: ?Sized> fmt::Debug for Predicate<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

impl<R: ?Sized> Predicate<R> {
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Arc::new(test),
        }
    }

    /// A predicate that accepts everything (the neutral element of [`all`]).
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// A predicate that rejects everything (the neutral element of [`any`]).
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    #[inline]
    pub fn test(&self, record: &R) -> bool {
        (self.test)(record)
    }

    pub fn and(self, other: Predicate<R>) -> Self
    where
        R: 'static,
    {
        all([self, other])
    }

    pub fn or(self, other: Predicate<R>) -> Self
    where
        R: 'static,
    {
        any([self, other])
    }

    pub fn negate(self) -> Self
    where
        R: 'static,
    {
        not(self)
    }
}

/// True iff every predicate holds. Evaluated left-to-right, stopping at the first `false`.
pub fn all<R, I>(predicates: I) -> Predicate<R>
where
    R: ?Sized + 'static,
    I: IntoIterator<Item = Predicate<R>>,
{
    let predicates: Arc<[Predicate<R>]> = predicates.into_iter().collect();
    Predicate::new(move |r| predicates.iter().all(|p| p.test(r)))
}

/// True iff at least one predicate holds, stopping at the first `true`.
pub fn any<R, I>(predicates: I) -> Predicate<R>
where
    R: ?Sized + 'static,
    I: IntoIterator<Item = Predicate<R>>,
{
    let predicates: Arc<[Predicate<R>]> = predicates.into_iter().collect();
    Predicate::new(move |r| predicates.iter().any(|p| p.test(r)))
}

/// True iff no predicate holds.
pub fn none<R, I>(predicates: I) -> Predicate<R>
where
    R: ?Sized + 'static,
    I: IntoIterator<Item = Predicate<R>>,
{
    not(any(predicates))
}

pub fn not<R: ?Sized + 'static>(predicate: Predicate<R>) -> Predicate<R> {
    Predicate::new(move |r| !predicate.test(r))
}

/// Scans `seq` left-to-right and reports whether any element satisfies `predicate`.
pub fn until<'a, T, I>(predicate: &Predicate<T>, seq: I) -> bool
where
    T: ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    seq.into_iter().any(|item| predicate.test(item))
}

/// Collects the elements scanned up to and including the first one satisfying `predicate`,
/// newest first.
///
/// Returns an empty vector when no element satisfies `predicate`: the scanned prefix is only
/// kept once the scan succeeds.
pub fn take_until<'a, T, I>(predicate: &Predicate<T>, seq: I) -> Vec<&'a T>
where
    T: ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut scanned = Vec::new();
    for item in seq {
        scanned.push(item);
        if predicate.test(item) {
            scanned.reverse();
            return scanned;
        }
    }
    Vec::new()
}

pub fn is_number() -> Predicate<Value> {
    Predicate::new(|v: &Value| matches!(v, Value::Number(_)))
}

pub fn is_integer() -> Predicate<Value> {
    Predicate::new(|v: &Value| v.as_integer().is_some())
}

pub fn is_text() -> Predicate<Value> {
    Predicate::new(|v: &Value| matches!(v, Value::Text(_)))
}

pub fn is_bool() -> Predicate<Value> {
    Predicate::new(|v: &Value| matches!(v, Value::Bool(_)))
}

pub fn is_null() -> Predicate<Value> {
    Predicate::new(Value::is_null)
}

pub fn is_list() -> Predicate<Value> {
    Predicate::new(|v: &Value| matches!(v, Value::List(_)))
}

pub fn is_record() -> Predicate<Value> {
    Predicate::new(|v: &Value| matches!(v, Value::Record(_)))
}

/// Applies `test` to numbers; anything else is rejected.
pub fn number<F>(test: F) -> Predicate<Value>
where
    F: Fn(f64) -> bool + Send + Sync + 'static,
{
    Predicate::new(move |v: &Value| v.as_number().is_some_and(&test))
}

/// Applies `test` to integral numbers; anything else is rejected.
pub fn integer<F>(test: F) -> Predicate<Value>
where
    F: Fn(i64) -> bool + Send + Sync + 'static,
{
    Predicate::new(move |v: &Value| v.as_integer().is_some_and(&test))
}

/// Applies `test` to text; anything else is rejected.
pub fn text<F>(test: F) -> Predicate<Value>
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    Predicate::new(move |v: &Value| v.as_text().is_some_and(&test))
}

pub fn is_even() -> Predicate<Value> {
    integer(|n| n % 2 == 0)
}

pub fn is_odd() -> Predicate<Value> {
    integer(|n| n % 2 != 0)
}

/// Applies `predicate` to the value found under `key`. Missing keys and non-record values are
/// rejected.
pub fn field(key: impl Into<String>, predicate: Predicate<Value>) -> Predicate<Value> {
    let key = key.into();
    Predicate::new(move |v: &Value| v.get(&key).is_some_and(|f| predicate.test(f)))
}

/// Applies `predicate` to the value found by walking `path` through nested records.
pub fn path<S: Into<String>>(
    path: impl IntoIterator<Item = S>,
    predicate: Predicate<Value>,
) -> Predicate<Value> {
    let path: Vec<String> = path.into_iter().map(Into::into).collect();
    Predicate::new(move |v: &Value| v.resolve(&path).is_some_and(|f| predicate.test(f)))
}

pub fn field_equals(key: impl Into<String>, expected: impl Into<Value>) -> Predicate<Value> {
    let expected = expected.into();
    field(key, Predicate::new(move |v: &Value| *v == expected))
}
