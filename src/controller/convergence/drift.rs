//! # Drift Detection
//!
//! Compares an allow-list of mutable fields between the spec and the observed
//! remote object and builds an update payload holding only differing fields.
//! Empty or absent desired values carry no opinion.

use super::error::ReconcileError;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Fields that differ and the update that corrects them
#[derive(Debug, Clone, PartialEq)]
pub struct Drift<U> {
    pub fields: Vec<&'static str>,
    pub update: U,
}

/// Builder accumulating differing fields into an update payload
#[derive(Debug)]
pub struct DriftDetector<U> {
    fields: Vec<&'static str>,
    update: U,
}

impl<U: Default> Default for DriftDetector<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: Default> DriftDetector<U> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            update: U::default(),
        }
    }

    /// A string field; an empty desired value is no opinion
    #[must_use]
    pub fn text(
        self,
        field: &'static str,
        desired: &str,
        observed: &str,
        apply: impl FnOnce(&mut U, String),
    ) -> Self {
        if desired.is_empty() {
            return self;
        }
        self.compare(field, desired.to_string(), observed.to_string(), apply)
    }

    /// An optional scalar; `None` desired is no opinion
    #[must_use]
    pub fn value<V: PartialEq>(
        self,
        field: &'static str,
        desired: Option<V>,
        observed: V,
        apply: impl FnOnce(&mut U, V),
    ) -> Self {
        match desired {
            Some(desired) => self.compare(field, desired, observed, apply),
            None => self,
        }
    }

    /// A map field such as tags or config; an empty desired map is no opinion
    #[must_use]
    pub fn map<K: Ord + Clone, V: PartialEq + Clone>(
        self,
        field: &'static str,
        desired: &BTreeMap<K, V>,
        observed: &BTreeMap<K, V>,
        apply: impl FnOnce(&mut U, BTreeMap<K, V>),
    ) -> Self {
        if desired.is_empty() || desired == observed {
            return self;
        }
        self.record(field, desired.clone(), apply)
    }

    fn compare<V: PartialEq>(
        self,
        field: &'static str,
        desired: V,
        observed: V,
        apply: impl FnOnce(&mut U, V),
    ) -> Self {
        if desired == observed {
            return self;
        }
        self.record(field, desired, apply)
    }

    fn record<V>(mut self, field: &'static str, desired: V, apply: impl FnOnce(&mut U, V)) -> Self {
        self.fields.push(field);
        apply(&mut self.update, desired);
        self
    }

    /// `None` when nothing differs
    #[must_use]
    pub fn finish(self) -> Option<Drift<U>> {
        if self.fields.is_empty() {
            None
        } else {
            Some(Drift {
                fields: self.fields,
                update: self.update,
            })
        }
    }
}

/// Reject a requested change to a field the remote API cannot update
///
/// `None` desired is no opinion.
///
/// # Errors
///
/// Returns [`ReconcileError::ImmutableField`] when the values differ.
pub fn ensure_unchanged<V: PartialEq + Debug + ?Sized>(
    kind: &'static str,
    field: &'static str,
    desired: Option<&V>,
    observed: &V,
) -> Result<(), ReconcileError> {
    match desired {
        Some(desired) if desired != observed => Err(ReconcileError::ImmutableField {
            kind,
            field,
            desired: format!("{desired:?}"),
            observed: format!("{observed:?}"),
        }),
        _ => Ok(()),
    }
}
