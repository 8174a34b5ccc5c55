//! Indicator result value types
//!
//! An [`IndicatorResult`] is one indicator's number, which may be undefined
//! when the underlying dataset does not declare the indicator. An
//! [`IndicatorResults`] groups the results of one module / process
//! contribution.

use serde::Serialize;

use crate::core::identity::{IndicatorId, ProcessId};
use crate::entities::process::{LifeCycleModule, Stage};

/// One indicator value; `None` means undefined
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorResult {
    pub indicator_id: IndicatorId,
    pub value: Option<f64>,
}

impl IndicatorResult {
    pub fn new(indicator_id: IndicatorId, value: Option<f64>) -> Self {
        Self {
            indicator_id,
            value,
        }
    }

    pub fn defined(indicator_id: IndicatorId, value: f64) -> Self {
        Self::new(indicator_id, Some(value))
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    fn combine(&self, other: &IndicatorResult, op: impl Fn(f64, f64) -> Option<f64>) -> Self {
        let value = match (self.value, other.value) {
            (Some(a), Some(b)) => op(a, b),
            _ => None,
        };
        Self::new(self.indicator_id, value)
    }

    /// Sum, defined only if both operands are defined
    pub fn add(&self, other: &IndicatorResult) -> Self {
        self.combine(other, |a, b| Some(a + b))
    }

    /// Product, defined only if both operands are defined
    pub fn multiply(&self, other: &IndicatorResult) -> Self {
        self.combine(other, |a, b| Some(a * b))
    }

    /// Quotient, undefined for a zero divisor
    pub fn divide(&self, other: &IndicatorResult) -> Self {
        self.combine(other, |a, b| if b == 0.0 { None } else { Some(a / b) })
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.indicator_id, self.value.map(|v| v * factor))
    }
}

/// The results of one module / process contribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorResults {
    module: LifeCycleModule,
    results: Vec<IndicatorResult>,
    process_id: Option<ProcessId>,
    ratio: f64,
}

impl IndicatorResults {
    pub fn new(module: LifeCycleModule, process_id: Option<ProcessId>, ratio: f64) -> Self {
        Self {
            module,
            results: Vec::new(),
            process_id,
            ratio,
        }
    }

    pub fn module(&self) -> LifeCycleModule {
        self.module
    }

    pub fn stage(&self) -> Stage {
        self.module.stage()
    }

    pub fn process_id(&self) -> Option<ProcessId> {
        self.process_id
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorResult> {
        self.results.iter()
    }

    pub fn get(&self, indicator_id: IndicatorId) -> Option<&IndicatorResult> {
        self.results.iter().find(|r| r.indicator_id == indicator_id)
    }

    /// Defined value of one indicator
    pub fn value(&self, indicator_id: IndicatorId) -> Option<f64> {
        self.get(indicator_id).and_then(|r| r.value)
    }

    /// Insert or replace the result of one indicator, keeping list order
    pub fn set(&mut self, result: IndicatorResult) {
        match self
            .results
            .iter_mut()
            .find(|r| r.indicator_id == result.indicator_id)
        {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    /// Same values under another module / process tag
    pub fn retagged(&self, module: LifeCycleModule, process_id: Option<ProcessId>) -> Self {
        Self {
            module,
            results: self.results.clone(),
            process_id,
            ratio: self.ratio,
        }
    }

    /// Merge by indicator id
    ///
    /// Indicators present on both sides are summed; an indicator present on
    /// one side only is carried over unchanged. Tags are taken from `self`.
    pub fn add(&self, other: &IndicatorResults) -> Self {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// In-place form of [`IndicatorResults::add`]
    pub fn merge(&mut self, other: &IndicatorResults) {
        for theirs in &other.results {
            match self
                .results
                .iter_mut()
                .find(|r| r.indicator_id == theirs.indicator_id)
            {
                Some(ours) => *ours = ours.add(theirs),
                None => self.results.push(*theirs),
            }
        }
    }

    /// Scale every value, e.g. by a replacement count or -1 for credits
    pub fn multiply(&self, factor: f64) -> Self {
        Self {
            module: self.module,
            results: self.results.iter().map(|r| r.scale(factor)).collect(),
            process_id: self.process_id,
            ratio: self.ratio,
        }
    }
}
