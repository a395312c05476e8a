use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::util::{random_suffix, round_cents};

use super::FeedConfig;

const SMALL_BAND_SHARE: f64 = 0.75;
const SMALL_BAND: (f64, f64) = (100.0, 200.0);
const MEDIUM_THRESHOLD: f64 = 1000.0;
const LARGE_THRESHOLD: f64 = 5000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
}

impl SizeCategory {
    pub fn for_amount(amount: f64) -> Self {
        if amount > LARGE_THRESHOLD {
            Self::Large
        } else if amount > MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Small
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    pub id: String,
    pub amount: f64,
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub size_category: SizeCategory,
}

impl TransactionEvent {
    pub fn generate<R: Rng + ?Sized>(config: &FeedConfig, timestamp: u64, rng: &mut R) -> Self {
        let raw_amount = if rng.gen_bool(SMALL_BAND_SHARE) {
            rng.gen_range(SMALL_BAND.0..SMALL_BAND.1)
        } else if config.max_amount > SMALL_BAND.1 {
            rng.gen_range(SMALL_BAND.1..config.max_amount)
        } else {
            SMALL_BAND.1
        };

        let side = if rng.gen_bool(0.5) {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        };

        Self {
            id: format!("tx-{timestamp}-{}", random_suffix(rng, 9)),
            amount: round_cents(raw_amount),
            timestamp,
            side,
            size_category: SizeCategory::for_amount(raw_amount),
        }
    }
}
