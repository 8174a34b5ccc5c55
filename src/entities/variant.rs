//! Projects and their variants

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::identity::{BenchmarkVersionId, ProcessDbId, ProjectId, VariantId};
use crate::entities::element::Element;
use crate::entities::energy::{FinalEnergyDemand, FinalEnergyRefModel, FinalEnergySupply};
use crate::entities::process::LifeCycleModule;
use crate::entities::transport::Transport;

fn default_life_time() -> u32 {
    50
}

/// Which modules recur for every replacement of a component
///
/// Modules not listed fall back to [`MaintenanceFlags::applies`]' default:
/// production and end-of-life recur, recycling potential does not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaintenanceFlags(pub BTreeMap<LifeCycleModule, bool>);

impl MaintenanceFlags {
    pub fn applies(&self, module: LifeCycleModule) -> bool {
        if let Some(flag) = self.0.get(&module) {
            return *flag;
        }
        !matches!(
            module,
            LifeCycleModule::D | LifeCycleModule::Rec | LifeCycleModule::Total
        )
    }

    pub fn with(mut self, module: LifeCycleModule, applies: bool) -> Self {
        self.0.insert(module, applies);
        self
    }
}

/// A design alternative of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectVariant {
    pub id: VariantId,

    #[serde(default)]
    pub name: String,

    /// Net floor area in m²
    #[serde(default)]
    pub ngf: f64,

    #[serde(default)]
    pub elements: Vec<Element>,

    #[serde(default)]
    pub final_energy_demands: Vec<FinalEnergyDemand>,

    #[serde(default)]
    pub final_energy_supplies: Vec<FinalEnergySupply>,

    #[serde(default)]
    pub final_energy_ref_models: Vec<FinalEnergyRefModel>,

    #[serde(default)]
    pub transports: Vec<Transport>,
}

/// A building project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,

    pub name: String,

    /// Observation period in years
    #[serde(default = "default_life_time")]
    pub life_time: u32,

    pub process_db_id: ProcessDbId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark_version_id: Option<BenchmarkVersionId>,

    #[serde(default)]
    pub maintenance: MaintenanceFlags,

    #[serde(default)]
    pub variants: Vec<ProjectVariant>,
}

impl Project {
    pub fn variant(&self, id: VariantId) -> Option<&ProjectVariant> {
        self.variants.iter().find(|v| v.id == id)
    }
}
