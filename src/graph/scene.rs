use rand::Rng;
use serde::Serialize;

use crate::error::Result;
use crate::feed::TransactionEvent;

use super::GraphConfig;
use super::links::{Connection, ConnectionSelector};
use super::node::Node;
use super::store::{Ingested, NodeStore};

const CAMERA_MIN_DISTANCE: f64 = 8.0;
const CAMERA_MAX_DISTANCE: f64 = 20.0;

pub fn camera_distance(node_count: usize) -> f64 {
    (CAMERA_MIN_DISTANCE + (1.0 + node_count as f64 / 100.0).log10() * 5.0)
        .clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE)
}

#[derive(Clone, Debug)]
pub struct GraphUpdate {
    pub node: Node,
    pub connections: Vec<Connection>,
    pub replaced: bool,
    pub evicted: Option<String>,
    pub dropped_connections: usize,
    pub scale_changed: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub scale: f64,
    pub camera_distance: f64,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

#[derive(Clone, Debug)]
pub struct TreeGraph {
    store: NodeStore,
    selector: ConnectionSelector,
}

impl TreeGraph {
    pub fn new(config: GraphConfig) -> Result<Self> {
        Ok(Self {
            store: NodeStore::new(config)?,
            selector: ConnectionSelector::new(),
        })
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn selector(&self) -> &ConnectionSelector {
        &self.selector
    }

    pub fn scale(&self) -> f64 {
        self.store.scale()
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.store.node_by_id(id)
    }

    pub fn all_nodes(&self) -> Vec<Node> {
        self.store.all_nodes()
    }

    pub fn all_connections(&self) -> Vec<Connection> {
        self.selector.all_connections()
    }

    pub fn camera_distance(&self) -> f64 {
        camera_distance(self.store.len())
    }

    pub fn handle_transaction<R: Rng + ?Sized>(
        &mut self,
        event: &TransactionEvent,
        rng: &mut R,
    ) -> GraphUpdate {
        let Ingested {
            node,
            replaced,
            evicted,
            scale_changed,
        } = self.store.ingest(event, rng);

        let mut dropped_connections = 0;
        if let Some(replaced) = &replaced {
            dropped_connections += self.selector.remove_connections_for_node(&replaced.id);
        }
        if let Some(evicted) = &evicted {
            let dropped = self.selector.remove_connections_for_node(&evicted.id);
            log::debug!("evicted {} with {dropped} connections", evicted.id);
            dropped_connections += dropped;
        }

        if scale_changed {
            self.selector
                .resync_positions(|id| self.store.node_by_id(id).map(|node| node.position));
        }

        let connections = self.selector.link_node(&node.id, &mut self.store);
        let node = self.store.node_by_id(&node.id).cloned().unwrap_or(node);

        GraphUpdate {
            node,
            connections,
            replaced: replaced.is_some(),
            evicted: evicted.map(|node| node.id),
            dropped_connections,
            scale_changed,
        }
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            scale: self.scale(),
            camera_distance: self.camera_distance(),
            nodes: self.all_nodes(),
            connections: self.all_connections(),
        }
    }
}
