use std::collections::HashMap;
use std::f64::consts::TAU;

use rand::Rng;

use crate::error::Result;
use crate::feed::TransactionEvent;
use crate::geometry::{TreeShape, Vec3};

use super::GraphConfig;
use super::node::{Node, transaction_node_id};
use super::scale::ScaleController;

const PLACEMENT_BAND: (f64, f64) = (0.1, 0.9);
const RECENT_WINDOW_MS: u64 = 5_000;
const ZOOM_AMOUNT_THRESHOLD: f64 = 1_000.0;

#[derive(Clone, Debug)]
pub struct Ingested {
    pub node: Node,
    pub replaced: Option<Node>,
    pub evicted: Option<Node>,
    pub scale_changed: bool,
}

#[derive(Clone, Debug)]
pub struct NodeStore {
    shape: TreeShape,
    max_nodes: usize,
    scale: ScaleController,
    nodes: HashMap<String, Node>,
    base_ids: Vec<String>,
    transaction_ids: Vec<String>,
}

impl NodeStore {
    pub fn new(config: GraphConfig) -> Result<Self> {
        config.validate()?;

        let mut store = Self {
            shape: config.shape,
            max_nodes: config.max_nodes,
            scale: ScaleController::default(),
            nodes: HashMap::new(),
            base_ids: Vec::new(),
            transaction_ids: Vec::new(),
        };
        store.initialize_base_lattice();
        store.recompute_scale();
        Ok(store)
    }

    fn initialize_base_lattice(&mut self) {
        let shape = self.shape;
        let height_step = shape.tree_height / (shape.levels - 1) as f64;

        for level in 0..shape.levels {
            let y = level as f64 * height_step;
            let ring_radius = shape.base_width * (1.0 - level as f64 / shape.levels as f64);
            let ring_size = shape.ring_size(level);
            log::debug!("base ring {level}: {ring_size} nodes at height {y:.3}");

            for index in 0..ring_size {
                let angle = (index as f64 / ring_size as f64) * TAU;
                let position = Vec3::new(
                    angle.cos() * ring_radius,
                    y,
                    angle.sin() * ring_radius,
                );
                let node = Node::base(level, index, position);
                self.base_ids.push(node.id.clone());
                self.nodes.insert(node.id.clone(), node);
            }
        }

        log::info!("created {} base nodes", self.base_ids.len());
    }

    pub fn shape(&self) -> &TreeShape {
        &self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale.scale()
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn base_node_count(&self) -> usize {
        self.base_ids.len()
    }

    pub fn transaction_node_count(&self) -> usize {
        self.transaction_ids.len()
    }

    pub fn transaction_capacity(&self) -> usize {
        self.max_nodes - self.base_ids.len()
    }

    pub fn ingest<R: Rng + ?Sized>(&mut self, event: &TransactionEvent, rng: &mut R) -> Ingested {
        log::debug!(
            "ingesting {} ({} {})",
            event.id,
            event.amount,
            event.size_category.label()
        );

        let id = transaction_node_id(&event.id);
        let replaced = self.remove_transaction(&id);
        if replaced.is_some() {
            log::warn!("replacing duplicate transaction node {id}");
        }

        let mut evicted = None;
        if self.transaction_ids.len() >= self.transaction_capacity() {
            evicted = self.evict_oldest();
        }

        let scale = self.scale();
        let height_fraction = rng.gen_range(PLACEMENT_BAND.0..PLACEMENT_BAND.1);
        let y = self.shape.scaled_height(scale) * height_fraction;
        let angle = rng.gen_range(0.0..TAU);
        let node = Node::transaction(event, self.shape.surface_point(angle, y, scale));

        self.transaction_ids.push(id.clone());
        self.nodes.insert(id.clone(), node);

        let scale_changed = self.recompute_scale();
        let node = self.nodes[&id].clone();

        Ingested {
            node,
            replaced,
            evicted,
            scale_changed,
        }
    }

    fn evict_oldest(&mut self) -> Option<Node> {
        let oldest = self
            .transaction_ids
            .iter()
            .min_by_key(|id| {
                self.nodes
                    .get(id.as_str())
                    .and_then(Node::timestamp)
                    .unwrap_or(0)
            })?
            .clone();

        let node = self.remove_transaction(&oldest)?;
        log::debug!("evicted {} (timestamp {:?})", node.id, node.timestamp());
        Some(node)
    }

    /// Removes a transaction node and drops its id from every neighbour's
    /// connection set. Base nodes are never removed.
    pub fn remove_transaction(&mut self, id: &str) -> Option<Node> {
        let position = self.transaction_ids.iter().position(|known| known == id)?;
        self.transaction_ids.remove(position);
        let node = self.nodes.remove(id)?;

        for neighbor in &node.connections {
            if let Some(other) = self.nodes.get_mut(neighbor) {
                other.connections.remove(id);
            }
        }

        Some(node)
    }

    pub fn recompute_scale(&mut self) -> bool {
        if !self.scale.recompute(self.nodes.len()) {
            return false;
        }

        let scale = self.scale();
        for node in self.nodes.values_mut() {
            node.position = self.shape.project(node.position, scale);
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.base_ids
            .iter()
            .chain(self.transaction_ids.iter())
            .filter_map(|id| self.nodes.get(id))
    }

    pub fn all_nodes(&self) -> Vec<Node> {
        self.iter().cloned().collect()
    }

    pub fn base_nodes(&self) -> Vec<Node> {
        self.base_ids
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .cloned()
            .collect()
    }

    pub fn transaction_nodes(&self) -> Vec<Node> {
        self.transaction_ids
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .cloned()
            .collect()
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes_for_zoom_level(&self, now_ms: u64) -> Vec<Node> {
        self.iter()
            .filter(|node| {
                let Some(data) = node.transaction else {
                    return true;
                };
                data.amount > ZOOM_AMOUNT_THRESHOLD
                    || now_ms.saturating_sub(data.timestamp) < RECENT_WINDOW_MS
            })
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub(super) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub(super) fn link(&mut self, a: &str, b: &str) {
        if let Some(node) = self.nodes.get_mut(a) {
            node.connections.insert(b.to_owned());
        }
        if let Some(node) = self.nodes.get_mut(b) {
            node.connections.insert(a.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::feed::{SizeCategory, TradeSide};

    const TOLERANCE: f64 = 1e-6;

    fn event(id: &str, amount: f64, timestamp: u64) -> TransactionEvent {
        TransactionEvent {
            id: id.to_owned(),
            amount,
            timestamp,
            side: TradeSide::Buy,
            size_category: SizeCategory::for_amount(amount),
        }
    }

    fn small_store(capacity: usize) -> NodeStore {
        let shape = TreeShape::default();
        NodeStore::new(GraphConfig {
            shape,
            max_nodes: shape.base_node_count() + capacity,
        })
        .unwrap()
    }

    fn assert_on_surface(store: &NodeStore) {
        for node in store.iter() {
            let deviation = store.shape().surface_deviation(node.position, store.scale());
            assert!(
                deviation < TOLERANCE,
                "{} is {deviation} off the surface",
                node.id
            );
        }
    }

    #[test]
    fn builds_fixed_lattice_on_the_surface() {
        let store = NodeStore::new(GraphConfig::default()).unwrap();

        assert_eq!(store.base_node_count(), 102);
        assert_eq!(store.transaction_node_count(), 0);
        assert!(store.node_by_id("base-0-0").is_some());
        assert!(store.node_by_id("base-9-7").is_some());
        assert!(store.node_by_id("base-9-8").is_none());
        assert!((store.scale() - ScaleController::target_for(102)).abs() < 1e-12);
        assert!(store.iter().all(|node| node.intensity == 0.5));
        assert_on_surface(&store);
    }

    #[test]
    fn ingest_places_node_inside_height_band() {
        let mut store = NodeStore::new(GraphConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let scale_before = store.scale();

        let ingested = store.ingest(&event("a", 150.0, 1), &mut rng);
        let height = store.shape().scaled_height(scale_before);

        assert_eq!(ingested.node.id, "tx-a");
        assert!(ingested.scale_changed);
        assert!(ingested.evicted.is_none());
        assert!(ingested.node.position.y >= 0.1 * height);
        assert!(ingested.node.position.y <= 0.9 * height);
        assert_eq!(store.node_by_id("tx-a"), Some(&ingested.node));
        assert_on_surface(&store);
    }

    #[test]
    fn all_nodes_lists_base_before_transactions() {
        let mut store = small_store(10);
        let mut rng = StdRng::seed_from_u64(5);
        store.ingest(&event("first", 120.0, 1), &mut rng);
        store.ingest(&event("second", 8_000.0, 2), &mut rng);

        let ids = store
            .all_nodes()
            .into_iter()
            .map(|node| node.id)
            .collect::<Vec<_>>();
        assert_eq!(ids.len(), 104);
        assert!(ids[..102].iter().all(|id| id.starts_with("base-")));
        assert_eq!(&ids[102..], &["tx-first", "tx-second"]);
        assert_eq!(store.base_nodes().len(), 102);
        assert_eq!(store.transaction_nodes().len(), 2);
    }

    #[test]
    fn evicts_oldest_timestamp_not_oldest_insert() {
        let mut store = small_store(3);
        let mut rng = StdRng::seed_from_u64(9);
        store.ingest(&event("late", 150.0, 30), &mut rng);
        store.ingest(&event("early", 150.0, 10), &mut rng);
        store.ingest(&event("middle", 150.0, 20), &mut rng);

        let ingested = store.ingest(&event("newest", 150.0, 40), &mut rng);

        assert_eq!(ingested.evicted.map(|node| node.id).as_deref(), Some("tx-early"));
        assert!(store.node_by_id("tx-early").is_none());
        assert!(store.node_by_id("tx-middle").is_some());
        assert!(store.node_by_id("tx-late").is_some());
        assert_eq!(store.transaction_node_count(), 3);
    }

    #[test]
    fn eviction_unlinks_neighbours() {
        let mut store = small_store(1);
        let mut rng = StdRng::seed_from_u64(1);
        store.ingest(&event("old", 150.0, 1), &mut rng);
        store.link("tx-old", "base-0-0");
        assert!(store.node_by_id("base-0-0").unwrap().connections.contains("tx-old"));

        store.ingest(&event("new", 150.0, 2), &mut rng);

        assert!(store.node_by_id("base-0-0").unwrap().connections.is_empty());
    }

    #[test]
    fn duplicate_event_replaces_the_live_node() {
        let mut store = small_store(2);
        let mut rng = StdRng::seed_from_u64(6);
        store.ingest(&event("dup", 150.0, 1), &mut rng);
        store.ingest(&event("other", 150.0, 2), &mut rng);
        store.link("tx-dup", "base-0-0");

        let ingested = store.ingest(&event("dup", 150.0, 3), &mut rng);

        let replaced = ingested.replaced.unwrap();
        assert_eq!(replaced.id, "tx-dup");
        assert!(replaced.connections.contains("base-0-0"));
        assert!(ingested.evicted.is_none());
        assert!(ingested.node.connections.is_empty());
        assert!(store.node_by_id("base-0-0").unwrap().connections.is_empty());
        assert!(store.node_by_id("tx-other").is_some());
        assert_eq!(store.transaction_node_count(), 2);
    }

    #[test]
    fn base_nodes_cannot_be_removed() {
        let mut store = small_store(1);
        assert!(store.remove_transaction("base-0-0").is_none());
        assert_eq!(store.base_node_count(), 102);
    }

    #[test]
    fn zoom_filter_keeps_large_and_recent() {
        let mut store = small_store(10);
        let mut rng = StdRng::seed_from_u64(2);
        store.ingest(&event("stale-small", 150.0, 1_000), &mut rng);
        store.ingest(&event("stale-large", 2_000.0, 1_000), &mut rng);
        store.ingest(&event("fresh-small", 150.0, 9_000), &mut rng);

        let visible = store
            .nodes_for_zoom_level(10_000)
            .into_iter()
            .filter(|node| !node.is_base())
            .map(|node| node.id)
            .collect::<Vec<_>>();
        assert_eq!(visible, vec!["tx-stale-large", "tx-fresh-small"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn ingest_keeps_surface_and_capacity(
            seed in any::<u64>(),
            capacity in 1usize..40,
            amounts in prop::collection::vec(100.0f64..10_000.0, 1..120),
        ) {
            let mut store = small_store(capacity);
            let mut rng = StdRng::seed_from_u64(seed);

            for (index, amount) in amounts.iter().enumerate() {
                store.ingest(&event(&format!("p{index}"), *amount, index as u64), &mut rng);
                prop_assert!(store.transaction_node_count() <= store.transaction_capacity());
            }

            for node in store.iter() {
                let deviation = store.shape().surface_deviation(node.position, store.scale());
                prop_assert!(deviation < TOLERANCE);
            }
        }
    }
}
