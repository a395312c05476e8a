use std::collections::BTreeSet;

use serde::Serialize;

use crate::feed::{SizeCategory, TransactionEvent};
use crate::geometry::Vec3;

pub const BASE_INTENSITY: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Base,
    Transaction,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TransactionData {
    pub amount: f64,
    pub size: SizeCategory,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub position: Vec3,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(rename = "transactionData", skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionData>,
    pub connections: BTreeSet<String>,
    pub intensity: f64,
}

impl Node {
    pub fn base(level: usize, index: usize, position: Vec3) -> Self {
        Self {
            id: format!("base-{level}-{index}"),
            position,
            kind: NodeKind::Base,
            transaction: None,
            connections: BTreeSet::new(),
            intensity: BASE_INTENSITY,
        }
    }

    pub fn transaction(event: &TransactionEvent, position: Vec3) -> Self {
        Self {
            id: transaction_node_id(&event.id),
            position,
            kind: NodeKind::Transaction,
            transaction: Some(TransactionData {
                amount: event.amount,
                size: event.size_category,
                timestamp: event.timestamp,
            }),
            connections: BTreeSet::new(),
            intensity: transaction_intensity(event.amount),
        }
    }

    pub fn is_base(&self) -> bool {
        self.kind == NodeKind::Base
    }

    pub fn amount(&self) -> Option<f64> {
        self.transaction.map(|data| data.amount)
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.transaction.map(|data| data.timestamp)
    }
}

pub fn transaction_node_id(event_id: &str) -> String {
    format!("tx-{event_id}")
}

pub fn transaction_intensity(amount: f64) -> f64 {
    (0.5 + (amount / 10_000.0) * 0.4).min(0.9)
}
