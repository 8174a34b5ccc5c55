//! Read-only access to reference data consumed by the engine

use crate::core::identity::{ElementTypeNodeId, ProcessConfigId, ProcessDbId};
use crate::entities::element::ElementType;
use crate::entities::indicator::Indicator;
use crate::entities::process::{ProcessConfig, ProcessDb, ProcessLifeCycle};
use crate::lca::error::{LcaError, LcaResult};

/// Process databases, process configurations and indicators
pub trait ProcessRepository {
    fn process_db(&self, id: ProcessDbId) -> Option<&ProcessDb>;

    fn process_config(&self, id: ProcessConfigId) -> Option<&ProcessConfig>;

    /// Indicators reported for a process database, in display order
    fn indicators(&self, process_db_id: ProcessDbId) -> Vec<Indicator>;

    /// Life cycle of a process configuration within a process database
    fn life_cycle(
        &self,
        process_config_id: ProcessConfigId,
        process_db_id: ProcessDbId,
    ) -> LcaResult<ProcessLifeCycle> {
        let config = self.process_config(process_config_id).ok_or_else(|| {
            LcaError::configuration(format!("unknown process config {}", process_config_id))
        })?;
        Ok(ProcessLifeCycle::from_config(config, process_db_id))
    }

    fn require_process_db(&self, id: ProcessDbId) -> LcaResult<&ProcessDb> {
        self.process_db(id)
            .ok_or_else(|| LcaError::configuration(format!("unknown process database {}", id)))
    }
}

/// The element type hierarchy
pub trait ElementTypeRepository {
    fn element_type(&self, node_id: ElementTypeNodeId) -> Option<&ElementType>;

    /// Chain from the root type down to `node_id`
    ///
    /// Stops at unknown parents; a cyclic parent chain is cut at the first
    /// repeated node.
    fn element_type_chain(&self, node_id: ElementTypeNodeId) -> Vec<&ElementType> {
        let mut chain: Vec<&ElementType> = Vec::new();
        let mut current = self.element_type(node_id);
        while let Some(element_type) = current {
            if chain.iter().any(|t| t.node_id == element_type.node_id) {
                break;
            }
            chain.push(element_type);
            current = element_type
                .parent_node_id
                .and_then(|parent| self.element_type(parent));
        }
        chain.reverse();
        chain
    }
}
