//! Domain data model
//!
//! Reference data (consumed, never authored here):
//! - [`Indicator`] - impact categories such as GWP or PENRT
//! - [`ProcessConfig`] / [`Process`] - materials and their emission datasets
//! - [`ProcessDb`] - dataset releases and their accounting standard
//! - [`ElementType`] - DIN 276 element type tree
//! - [`BenchmarkVersion`] - rating thresholds
//!
//! Project data (the input of a computation):
//! - [`Project`] / [`ProjectVariant`]
//! - [`Element`] / [`ElementComponent`]
//! - [`FinalEnergyDemand`], [`FinalEnergySupply`], [`FinalEnergyRefModel`]
//! - [`Transport`] / [`TransportMean`]

pub mod benchmark;
pub mod element;
pub mod energy;
pub mod indicator;
pub mod process;
pub mod quantity;
pub mod transport;
pub mod variant;

pub use benchmark::{BenchmarkVersion, Threshold};
pub use element::{Element, ElementComponent, ElementType};
pub use energy::{EnergyUses, FinalEnergyDemand, FinalEnergyRefModel, FinalEnergySupply};
pub use indicator::Indicator;
pub use process::{
    LifeCycleModule, Process, ProcessConfig, ProcessDb, ProcessLifeCycle, Stage,
};
pub use quantity::{Conversion, Converter, Quantity, Unit};
pub use transport::{Transport, TransportMean};
pub use variant::{MaintenanceFlags, Project, ProjectVariant};
