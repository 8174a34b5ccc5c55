//! Life cycle assessment engine
//!
//! Calculators turn process datasets into indicator results; the
//! [`LcaProcessor`] runs them over a whole project variant and writes the
//! results to the cache. Benchmark scoring lives in [`benchmark`].

pub mod benchmark;
pub mod component_calculator;
pub mod error;
pub mod extant_savings_calculator;
pub mod final_energy_calculator;
pub mod life_cycle_results;
pub mod observer;
pub mod process_calculator;
pub mod processor;
pub mod replacements;
pub mod repository;
pub mod result;

pub use benchmark::BenchmarkNormalizer;
pub use component_calculator::ElementComponentCalculator;
pub use error::{LcaError, LcaResult};
pub use extant_savings_calculator::ExtantSavingsCalculator;
pub use final_energy_calculator::FinalEnergyCalculator;
pub use life_cycle_results::{ProcessLifeCycleLcaResults, ResultKey};
pub use observer::{LcaObserver, ObserverList, TracingObserver};
pub use process_calculator::ProcessIndicatorCalculator;
pub use processor::LcaProcessor;
pub use replacements::number_of_replacements;
pub use repository::{ElementTypeRepository, ProcessRepository};
pub use result::{IndicatorResult, IndicatorResults};
