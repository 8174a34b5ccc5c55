//! Errors raised by the LCA engine and its cache

use miette::Diagnostic;
use thiserror::Error;

use crate::core::identity::{ProcessConfigId, ProcessId};
use crate::entities::quantity::Unit;

pub type LcaResult<T> = std::result::Result<T, LcaError>;

#[derive(Debug, Error, Diagnostic)]
pub enum LcaError {
    #[error("process {process_id} is not part of the life cycle of {process_config_id}")]
    #[diagnostic(code(elca::lca::not_found_in_life_cycle))]
    NotFoundInLifeCycle {
        process_id: ProcessId,
        process_config_id: ProcessConfigId,
    },

    #[error("no unit conversion from '{from}' to '{to}' for {process_config_id}")]
    #[diagnostic(
        code(elca::lca::conversion),
        help("add a conversion between both units to the process configuration")
    )]
    Conversion {
        from: Unit,
        to: Unit,
        process_config_id: ProcessConfigId,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(elca::lca::configuration))]
    Configuration(String),

    #[error("cache persistence failed: {0}")]
    #[diagnostic(code(elca::lca::persistence))]
    Persistence(#[from] rusqlite::Error),
}

impl LcaError {
    pub fn configuration(message: impl Into<String>) -> Self {
        LcaError::Configuration(message.into())
    }
}
