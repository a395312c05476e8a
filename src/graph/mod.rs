mod links;
mod node;
mod scale;
mod scene;
mod store;

use serde::{Deserialize, Serialize};

use crate::error::{LightsError, Result};
use crate::geometry::TreeShape;

pub use links::{Connection, ConnectionSelector, MAX_LINKS_PER_NODE, connection_id, is_linkable};
pub use node::{Node, NodeKind, TransactionData, transaction_intensity};
pub use scale::ScaleController;
pub use scene::{FrameSnapshot, GraphUpdate, TreeGraph, camera_distance};
pub use store::{Ingested, NodeStore};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub shape: TreeShape,
    pub max_nodes: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            shape: TreeShape::default(),
            max_nodes: 10_000,
        }
    }
}

impl GraphConfig {
    pub fn validate(&self) -> Result<()> {
        self.shape.validate()?;
        let base_nodes = self.shape.base_node_count();
        if self.max_nodes <= base_nodes {
            return Err(LightsError::InvalidConfig(format!(
                "max_nodes ({}) must exceed the {base_nodes} base nodes",
                self.max_nodes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_nodes_must_leave_room_for_transactions() {
        assert!(GraphConfig::default().validate().is_ok());

        let cramped = GraphConfig {
            max_nodes: 102,
            ..GraphConfig::default()
        };
        assert!(matches!(
            cramped.validate(),
            Err(LightsError::InvalidConfig(_))
        ));
        assert!(NodeStore::new(cramped).is_err());
    }
}
