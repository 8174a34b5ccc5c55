//! Building elements, their components and the element type tree

use serde::{Deserialize, Serialize};

use crate::core::identity::{ComponentId, ElementId, ElementTypeNodeId, ProcessConfigId};
use crate::entities::quantity::{Quantity, Unit};

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

/// A material layer or part of an element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementComponent {
    pub id: ComponentId,

    /// Material reference
    pub process_config_id: ProcessConfigId,

    /// Quantity per element reference unit
    pub quantity: Quantity,

    /// Useful life in years
    pub life_time: u32,

    /// Years the life time is shifted for extant components
    #[serde(default)]
    pub life_time_delay: u32,

    /// Pre-existing component (refurbishment)
    #[serde(default)]
    pub is_extant: bool,

    /// Whether the component takes part in the LCA at all
    #[serde(default = "default_true")]
    pub calc_lca: bool,
}

impl ElementComponent {
    /// Quantity for the whole element
    pub fn total_quantity(&self, element_quantity: f64) -> Quantity {
        self.quantity.scaled(element_quantity)
    }
}

/// A building element, either a plain element with components or a
/// composite of sub-elements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,

    #[serde(default)]
    pub name: String,

    pub element_type_node_id: ElementTypeNodeId,

    /// Element quantity, multiplies every component quantity
    #[serde(default = "default_one")]
    pub quantity: f64,

    #[serde(default = "default_ref_unit")]
    pub ref_unit: Unit,

    #[serde(default)]
    pub is_composite: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_elements: Vec<Element>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ElementComponent>,
}

fn default_ref_unit() -> Unit {
    Unit::SquareMetre
}

impl Element {
    /// Number of elements in this subtree, including itself
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(element) = stack.pop() {
            count += 1;
            stack.extend(element.sub_elements.iter());
        }
        count
    }
}

/// Node of the element type hierarchy (DIN 276 cost groups)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementType {
    pub node_id: ElementTypeNodeId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_id: Option<ElementTypeNodeId>,

    #[serde(default)]
    pub din_code: String,

    #[serde(default)]
    pub name: String,
}
