mod event;
mod source;

use serde::{Deserialize, Serialize};

use crate::error::{LightsError, Result};

pub use event::{SizeCategory, TradeSide, TransactionEvent};
pub use source::{Subscription, TransactionSource};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub min_amount: f64,
    pub max_amount: f64,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            min_amount: 100.0,
            max_amount: 10_000.0,
            min_interval_ms: 500,
            max_interval_ms: 2000,
        }
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_amount.is_finite() && self.min_amount > 0.0) {
            return Err(LightsError::InvalidConfig(format!(
                "min_amount must be positive, got {}",
                self.min_amount
            )));
        }
        if !(self.max_amount.is_finite() && self.max_amount >= self.min_amount) {
            return Err(LightsError::InvalidConfig(format!(
                "max_amount ({}) must be at least min_amount ({})",
                self.max_amount, self.min_amount
            )));
        }
        if self.min_interval_ms == 0 {
            return Err(LightsError::InvalidConfig(
                "min_interval_ms must be positive".to_owned(),
            ));
        }
        if self.max_interval_ms < self.min_interval_ms {
            return Err(LightsError::InvalidConfig(format!(
                "max_interval_ms ({}) must be at least min_interval_ms ({})",
                self.max_interval_ms, self.min_interval_ms
            )));
        }
        Ok(())
    }
}
