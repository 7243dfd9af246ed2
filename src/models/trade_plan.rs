use serde::{Deserialize, Serialize};

use super::signal::{ConfidenceTier, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryBand {
    pub low: f64,
    pub high: f64,
}

/// The actionable part of a signal. Read-only once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_band: EntryBand,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub r_distance: f64,
    pub reward_risk: f64,
    pub tick_size: f64,
    pub atr: f64,
    pub confidence: f64,
    pub confidence_label: ConfidenceTier,
}

impl TradePlan {
    pub fn with_confidence(self, confidence: f64, tier: ConfidenceTier) -> Self {
        Self {
            confidence,
            confidence_label: tier,
            ..self
        }
    }
}
