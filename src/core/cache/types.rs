//! Cache type definitions
//!
//! Item kinds, cached rows and query results.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::identity::{CacheItemId, IndicatorId, ProcessId, ProjectId, VariantId};

// =========================================================================
// Item kinds
// =========================================================================

/// What a cache item mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheItemKind {
    Variant,
    ElementType,
    Element,
    Component,
    FinalEnergyDemand,
    FinalEnergySupply,
    FinalEnergyRefModel,
    TransportMean,
    ExtantSavings,
}

impl CacheItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheItemKind::Variant => "variant",
            CacheItemKind::ElementType => "element_type",
            CacheItemKind::Element => "element",
            CacheItemKind::Component => "component",
            CacheItemKind::FinalEnergyDemand => "final_energy_demand",
            CacheItemKind::FinalEnergySupply => "final_energy_supply",
            CacheItemKind::FinalEnergyRefModel => "final_energy_ref_model",
            CacheItemKind::TransportMean => "transport_mean",
            CacheItemKind::ExtantSavings => "extant_savings",
        }
    }

    pub fn all() -> &'static [CacheItemKind] {
        &[
            CacheItemKind::Variant,
            CacheItemKind::ElementType,
            CacheItemKind::Element,
            CacheItemKind::Component,
            CacheItemKind::FinalEnergyDemand,
            CacheItemKind::FinalEnergySupply,
            CacheItemKind::FinalEnergyRefModel,
            CacheItemKind::TransportMean,
            CacheItemKind::ExtantSavings,
        ]
    }

    /// Items of this kind never enter ancestor sums
    pub fn is_virtual(&self) -> bool {
        matches!(
            self,
            CacheItemKind::FinalEnergyRefModel | CacheItemKind::ExtantSavings
        )
    }
}

impl fmt::Display for CacheItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CacheItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown cache item kind: {}", s))
    }
}

// =========================================================================
// Cached rows
// =========================================================================

/// A node of the cache tree
#[derive(Debug, Clone, Serialize)]
pub struct CacheItem {
    pub id: CacheItemId,
    pub parent_id: Option<CacheItemId>,
    pub kind: CacheItemKind,
    pub entity_id: i64,
    pub project_id: ProjectId,
    pub variant_id: VariantId,
    pub is_outdated: bool,
    pub is_virtual: bool,
    pub quantity: Option<f64>,
    pub ref_unit: Option<String>,
    pub mass: Option<f64>,
    pub num_replacements: Option<u32>,
    pub modified: DateTime<Utc>,
}

/// Field values written by a store call
#[derive(Debug, Clone)]
pub struct NewItem {
    pub kind: CacheItemKind,
    pub entity_id: i64,
    pub project_id: ProjectId,
    pub variant_id: VariantId,
    pub parent_id: Option<CacheItemId>,
    pub quantity: Option<f64>,
    pub ref_unit: Option<String>,
    pub mass: Option<f64>,
    pub num_replacements: Option<u32>,
}

impl NewItem {
    pub fn new(
        kind: CacheItemKind,
        entity_id: i64,
        project_id: ProjectId,
        variant_id: VariantId,
        parent_id: Option<CacheItemId>,
    ) -> Self {
        Self {
            kind,
            entity_id,
            project_id,
            variant_id,
            parent_id,
            quantity: None,
            ref_unit: None,
            mass: None,
            num_replacements: None,
        }
    }

    pub fn with_quantity(mut self, quantity: f64, ref_unit: impl Into<String>) -> Self {
        self.quantity = Some(quantity);
        self.ref_unit = Some(ref_unit.into());
        self
    }

    pub fn with_mass(mut self, mass: Option<f64>) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_replacements(mut self, num_replacements: u32) -> Self {
        self.num_replacements = Some(num_replacements);
        self
    }
}

/// One stored indicator value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedIndicator {
    pub life_cycle_ident: String,
    pub indicator_id: IndicatorId,
    pub process_id: Option<ProcessId>,
    pub value: Option<f64>,
    pub ratio: f64,
    pub is_partial: bool,
}

// =========================================================================
// Query results
// =========================================================================

/// Aggregated value of one module and indicator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleTotal {
    pub life_cycle_ident: String,
    pub indicator_id: IndicatorId,
    pub value: Option<f64>,
    pub is_partial: bool,
}

/// Total of one component for one indicator
#[derive(Debug, Clone, Serialize)]
pub struct ComponentTotal {
    pub item_id: CacheItemId,
    pub component_id: i64,
    pub element_id: Option<i64>,
    pub mass: Option<f64>,
    pub num_replacements: Option<u32>,
    pub value: Option<f64>,
}

/// Result of an aggregation pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct AggregateStats {
    pub variants: usize,
    pub items_recomputed: usize,
    pub leaves_refreshed: usize,
    pub duration_ms: u64,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_items: usize,
    pub total_indicator_rows: usize,
    pub outdated_items: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub db_size_bytes: u64,
}
