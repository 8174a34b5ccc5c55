//! Process datasets, life-cycle modules and process life cycles

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::identity::{ProcessConfigId, ProcessDbId, ProcessId};
use crate::entities::quantity::{Conversion, Converter, Quantity, Unit};

/// Life-cycle module (EN 15804 or legacy accounting)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifeCycleModule {
    #[serde(rename = "A1")]
    A1,
    #[serde(rename = "A2")]
    A2,
    #[serde(rename = "A3")]
    A3,
    #[serde(rename = "A1-3")]
    A13,
    #[serde(rename = "A4")]
    A4,
    #[serde(rename = "A5")]
    A5,
    #[serde(rename = "B1")]
    B1,
    #[serde(rename = "B2")]
    B2,
    #[serde(rename = "B3")]
    B3,
    #[serde(rename = "B4")]
    B4,
    #[serde(rename = "B5")]
    B5,
    #[serde(rename = "B6")]
    B6,
    #[serde(rename = "B7")]
    B7,
    #[serde(rename = "C1")]
    C1,
    #[serde(rename = "C2")]
    C2,
    #[serde(rename = "C3")]
    C3,
    #[serde(rename = "C4")]
    C4,
    #[serde(rename = "D")]
    D,
    /// Legacy production
    #[serde(rename = "prod")]
    Prod,
    /// Legacy operation
    #[serde(rename = "op")]
    Op,
    /// Legacy end of life
    #[serde(rename = "eol")]
    Eol,
    /// Legacy recycling potential
    #[serde(rename = "rec")]
    Rec,
    /// Replacement cycles over the project life time
    #[serde(rename = "maint")]
    Maint,
    /// Aggregated total, written by cache aggregation only
    #[serde(rename = "total")]
    Total,
}

impl LifeCycleModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifeCycleModule::A1 => "A1",
            LifeCycleModule::A2 => "A2",
            LifeCycleModule::A3 => "A3",
            LifeCycleModule::A13 => "A1-3",
            LifeCycleModule::A4 => "A4",
            LifeCycleModule::A5 => "A5",
            LifeCycleModule::B1 => "B1",
            LifeCycleModule::B2 => "B2",
            LifeCycleModule::B3 => "B3",
            LifeCycleModule::B4 => "B4",
            LifeCycleModule::B5 => "B5",
            LifeCycleModule::B6 => "B6",
            LifeCycleModule::B7 => "B7",
            LifeCycleModule::C1 => "C1",
            LifeCycleModule::C2 => "C2",
            LifeCycleModule::C3 => "C3",
            LifeCycleModule::C4 => "C4",
            LifeCycleModule::D => "D",
            LifeCycleModule::Prod => "prod",
            LifeCycleModule::Op => "op",
            LifeCycleModule::Eol => "eol",
            LifeCycleModule::Rec => "rec",
            LifeCycleModule::Maint => "maint",
            LifeCycleModule::Total => "total",
        }
    }

    pub fn all() -> &'static [LifeCycleModule] {
        use LifeCycleModule::*;
        &[
            A1, A2, A3, A13, A4, A5, B1, B2, B3, B4, B5, B6, B7, C1, C2, C3, C4, D, Prod, Op,
            Eol, Rec, Maint, Total,
        ]
    }

    pub fn stage(&self) -> Stage {
        use LifeCycleModule::*;
        match self {
            A1 | A2 | A3 | A13 | Prod => Stage::Production,
            A4 | A5 => Stage::Construction,
            B1 | B2 | B3 | B4 | B5 | B6 | B7 | Op => Stage::Usage,
            C1 | C2 | C3 | C4 | Eol => Stage::EndOfLife,
            D | Rec => Stage::RecyclingPotential,
            Maint => Stage::Maintenance,
            Total => Stage::Total,
        }
    }

    /// A1, A2 or A3 individually (not the combined A1-3)
    pub fn is_a13_source(&self) -> bool {
        matches!(
            self,
            LifeCycleModule::A1 | LifeCycleModule::A2 | LifeCycleModule::A3
        )
    }

    /// Modules summed into the `total` row by cache aggregation
    pub fn counts_towards_total(&self) -> bool {
        !self.is_a13_source()
            && !matches!(
                self.stage(),
                Stage::RecyclingPotential | Stage::Total
            )
    }
}

impl fmt::Display for LifeCycleModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LifeCycleModule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown life cycle module: {}", s))
    }
}

/// Life-cycle stage derived from the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Production,
    Construction,
    Usage,
    EndOfLife,
    RecyclingPotential,
    Maintenance,
    Total,
}

/// One reference emission / energy dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,

    #[serde(default)]
    pub name: String,

    pub module: LifeCycleModule,

    /// Quantitative reference, e.g. `1 kg` or `1 m3`
    pub reference: Quantity,

    /// Indicator ident -> value per reference quantity
    #[serde(default)]
    pub indicators: BTreeMap<String, Option<f64>>,

    /// Share of the dataset that applies, valid in (0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
}

impl Process {
    pub fn stage(&self) -> Stage {
        self.module.stage()
    }

    /// Defined value for an indicator ident, if any
    pub fn indicator_value(&self, ident: &str) -> Option<f64> {
        self.indicators
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(ident))
            .and_then(|(_, v)| *v)
    }
}

/// Flags attached to a process configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessConfigAttributes {
    /// Final energy supplies of this material are credited (sign inverted)
    #[serde(default)]
    pub invert_values: bool,
}

/// Processes of one process configuration within one process database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfigLifeCycle {
    pub process_db_id: ProcessDbId,

    #[serde(default)]
    pub processes: Vec<Process>,
}

/// A material / energy carrier and its datasets per process database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub id: ProcessConfigId,

    pub name: String,

    #[serde(default)]
    pub attributes: ProcessConfigAttributes,

    #[serde(default)]
    pub conversions: Vec<Conversion>,

    /// Default useful life in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_life_time: Option<u32>,

    #[serde(default)]
    pub life_cycles: Vec<ProcessConfigLifeCycle>,
}

/// A process database (dataset release) and its accounting standard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDb {
    pub id: ProcessDbId,

    pub name: String,

    /// EN 15804 module accounting instead of legacy prod/op/eol
    #[serde(default)]
    pub en15804: bool,
}

/// The processes plus unit converter available for one
/// (process config, process db) pair
#[derive(Debug, Clone)]
pub struct ProcessLifeCycle {
    process_config_id: ProcessConfigId,
    process_db_id: ProcessDbId,
    processes: Vec<Process>,
    converter: Converter,
}

impl ProcessLifeCycle {
    pub fn new(
        process_config_id: ProcessConfigId,
        process_db_id: ProcessDbId,
        processes: Vec<Process>,
        converter: Converter,
    ) -> Self {
        Self {
            process_config_id,
            process_db_id,
            processes,
            converter,
        }
    }

    /// Build the life cycle of `config` within `process_db_id`
    pub fn from_config(config: &ProcessConfig, process_db_id: ProcessDbId) -> Self {
        let processes = config
            .life_cycles
            .iter()
            .filter(|lc| lc.process_db_id == process_db_id)
            .flat_map(|lc| lc.processes.iter().cloned())
            .collect();
        Self::new(
            config.id,
            process_db_id,
            processes,
            Converter::new(&config.conversions),
        )
    }

    pub fn process_config_id(&self) -> ProcessConfigId {
        self.process_config_id
    }

    pub fn process_db_id(&self) -> ProcessDbId {
        self.process_db_id
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn process(&self, id: ProcessId) -> Option<&Process> {
        self.processes.iter().find(|p| p.id == id)
    }

    pub fn usage_processes(&self) -> impl Iterator<Item = &Process> {
        self.processes
            .iter()
            .filter(|p| p.stage() == Stage::Usage)
    }

    pub fn production_processes(&self) -> impl Iterator<Item = &Process> {
        self.processes
            .iter()
            .filter(|p| p.stage() == Stage::Production)
    }

    pub fn processes_in_module(&self, module: LifeCycleModule) -> impl Iterator<Item = &Process> {
        self.processes.iter().filter(move |p| p.module == module)
    }

    /// Convert into the reference unit of a process
    pub fn convert(&self, quantity: &Quantity, to: &Unit) -> Option<Quantity> {
        self.converter.convert(quantity, to)
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        assert_eq!(LifeCycleModule::A2.stage(), Stage::Production);
        assert_eq!(LifeCycleModule::A13.stage(), Stage::Production);
        assert_eq!(LifeCycleModule::Op.stage(), Stage::Usage);
        assert_eq!(LifeCycleModule::B6.stage(), Stage::Usage);
        assert_eq!(LifeCycleModule::C2.stage(), Stage::EndOfLife);
        assert_eq!(LifeCycleModule::Rec.stage(), Stage::RecyclingPotential);
    }

    #[test]
    fn test_total_membership() {
        assert!(LifeCycleModule::A13.counts_towards_total());
        assert!(LifeCycleModule::Maint.counts_towards_total());
        assert!(LifeCycleModule::C3.counts_towards_total());
        assert!(!LifeCycleModule::A1.counts_towards_total());
        assert!(!LifeCycleModule::D.counts_towards_total());
        assert!(!LifeCycleModule::Total.counts_towards_total());
    }

    #[test]
    fn test_module_serialization() {
        let yaml = serde_yml::to_string(&LifeCycleModule::A13).unwrap();
        assert!(yaml.contains("A1-3"));
        let parsed: LifeCycleModule = serde_yml::from_str("eol").unwrap();
        assert_eq!(parsed, LifeCycleModule::Eol);
        assert_eq!("a1-3".parse::<LifeCycleModule>().unwrap(), LifeCycleModule::A13);
    }

    #[test]
    fn test_life_cycle_filters_by_db() {
        let config = ProcessConfig {
            id: ProcessConfigId(1),
            name: "Concrete".to_string(),
            attributes: ProcessConfigAttributes::default(),
            conversions: vec![],
            default_life_time: None,
            life_cycles: vec![
                ProcessConfigLifeCycle {
                    process_db_id: ProcessDbId(1),
                    processes: vec![Process {
                        id: ProcessId(10),
                        name: "old".to_string(),
                        module: LifeCycleModule::Prod,
                        reference: Quantity::new(1.0, Unit::Kg),
                        indicators: BTreeMap::new(),
                        ratio: None,
                    }],
                },
                ProcessConfigLifeCycle {
                    process_db_id: ProcessDbId(2),
                    processes: vec![Process {
                        id: ProcessId(20),
                        name: "new".to_string(),
                        module: LifeCycleModule::A13,
                        reference: Quantity::new(1.0, Unit::Kg),
                        indicators: BTreeMap::new(),
                        ratio: None,
                    }],
                },
            ],
        };

        let lc = ProcessLifeCycle::from_config(&config, ProcessDbId(2));
        assert_eq!(lc.processes().len(), 1);
        assert!(lc.process(ProcessId(20)).is_some());
        assert!(lc.process(ProcessId(10)).is_none());
        assert_eq!(lc.production_processes().count(), 1);
    }
}
