use std::collections::HashSet;
use std::f64::consts::PI;

use serde::Serialize;

use crate::geometry::{TreeShape, Vec3, angular_distance};

use super::node::Node;
use super::store::NodeStore;

pub const MAX_LINKS_PER_NODE: usize = 3;

const LINKABLE_AMOUNT_LIMIT: f64 = 500.0;
const MAX_HEIGHT_GAP: f64 = 1.2;
const MAX_ANGLE_GAP: f64 = PI * 0.75;
const SURFACE_SAMPLES: [f64; 3] = [0.25, 0.5, 0.75];
const SURFACE_TOLERANCE: f64 = 0.3;
const MIXED_KIND_BONUS: f64 = 1.5;
const STRING_INTENSITY: f64 = 1.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub start_id: String,
    pub end_id: String,
    pub start: Vec3,
    pub end: Vec3,
    pub intensity: f64,
    pub animated: bool,
}

impl Connection {
    pub fn touches(&self, node_id: &str) -> bool {
        self.start_id == node_id || self.end_id == node_id
    }
}

pub fn connection_id(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("string-{lo}-{hi}")
}

pub fn is_linkable(node: &Node) -> bool {
    node.amount()
        .is_none_or(|amount| amount < LINKABLE_AMOUNT_LIMIT)
}

fn follows_surface(shape: &TreeShape, scale: f64, start: Vec3, end: Vec3) -> bool {
    let tolerance = SURFACE_TOLERANCE * scale;
    SURFACE_SAMPLES.iter().all(|&t| {
        let sample = start.lerp(end, t);
        (sample.radial() - shape.surface_radius(sample.y, scale)).abs() <= tolerance
    })
}

fn is_candidate(source: &Node, candidate: &Node, shape: &TreeShape, scale: f64) -> bool {
    if candidate.id == source.id
        || candidate.connections.len() >= MAX_LINKS_PER_NODE
        || source.connections.contains(&candidate.id)
        || !is_linkable(candidate)
    {
        return false;
    }

    if (candidate.position.y - source.position.y).abs() > MAX_HEIGHT_GAP {
        return false;
    }

    if angular_distance(source.position.azimuth(), candidate.position.azimuth()) > MAX_ANGLE_GAP {
        return false;
    }

    follows_surface(shape, scale, source.position, candidate.position)
}

fn link_score(source: &Node, candidate: &Node, shape: &TreeShape) -> f64 {
    let distance = source.position.distance(candidate.position);
    let height_gap = (source.position.y - candidate.position.y).abs();
    let height_penalty = 1.0 - height_gap / (shape.tree_height * 2.0);
    let kind_bonus = if source.kind != candidate.kind {
        MIXED_KIND_BONUS
    } else {
        1.0
    };

    (1.0 / (distance + 0.1)) * height_penalty * kind_bonus
}

fn select_targets<'a>(
    source: &Node,
    population: impl Iterator<Item = &'a Node>,
    shape: &TreeShape,
    scale: f64,
    limit: usize,
) -> Vec<&'a Node> {
    let mut ranked = population
        .filter(|candidate| is_candidate(source, candidate, shape, scale))
        .map(|candidate| (link_score(source, candidate, shape), candidate))
        .collect::<Vec<_>>();

    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.truncate(limit);
    ranked.into_iter().map(|(_, candidate)| candidate).collect()
}

#[derive(Clone, Debug, Default)]
pub struct ConnectionSelector {
    connections: Vec<Connection>,
    ids: HashSet<String>,
}

impl ConnectionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn all_connections(&self) -> Vec<Connection> {
        self.connections.clone()
    }

    pub fn visible_connections(&self) -> Vec<Connection> {
        self.connections
            .iter()
            .filter(|connection| {
                let touches_transaction =
                    connection.start_id.starts_with("tx-") || connection.end_id.starts_with("tx-");
                !touches_transaction || connection.animated
            })
            .cloned()
            .collect()
    }

    /// Links `source_id` to up to three nearby nodes and returns only the
    /// connections created by this call.
    pub fn link_node(&mut self, source_id: &str, store: &mut NodeStore) -> Vec<Connection> {
        let Some(source) = store.node_by_id(source_id).cloned() else {
            return Vec::new();
        };

        if !is_linkable(&source) {
            log::debug!(
                "skipping links for large transaction {} ({:?})",
                source.id,
                source.amount()
            );
            return Vec::new();
        }

        let budget = MAX_LINKS_PER_NODE.saturating_sub(source.connections.len());
        if budget == 0 {
            return Vec::new();
        }

        let shape = *store.shape();
        let targets = select_targets(&source, store.iter(), &shape, store.scale(), budget)
            .into_iter()
            .map(|target| (target.id.clone(), target.position, target.kind))
            .collect::<Vec<_>>();

        let mut created = Vec::with_capacity(targets.len());
        for (target_id, target_position, target_kind) in targets {
            let id = connection_id(&source.id, &target_id);
            if !self.ids.insert(id.clone()) {
                continue;
            }

            let connection = Connection {
                id,
                start_id: source.id.clone(),
                end_id: target_id,
                start: source.position,
                end: target_position,
                intensity: STRING_INTENSITY,
                animated: true,
            };
            store.link(&connection.start_id, &connection.end_id);
            log::debug!(
                "linked {} -> {} ({target_kind:?})",
                connection.start_id,
                connection.end_id
            );

            self.connections.push(connection.clone());
            created.push(connection);
        }

        log::debug!("created {} connections for {}", created.len(), source.id);
        created
    }

    pub fn remove_connections_for_node(&mut self, node_id: &str) -> usize {
        let before = self.connections.len();
        let ids = &mut self.ids;
        self.connections.retain(|connection| {
            if connection.touches(node_id) {
                ids.remove(&connection.id);
                false
            } else {
                true
            }
        });
        before - self.connections.len()
    }

    pub fn resync_positions<F>(&mut self, position_of: F)
    where
        F: Fn(&str) -> Option<Vec3>,
    {
        for connection in &mut self.connections {
            if let (Some(start), Some(end)) = (
                position_of(&connection.start_id),
                position_of(&connection.end_id),
            ) {
                connection.start = start;
                connection.end = end;
            }
        }
    }
}
