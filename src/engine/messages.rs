use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::ConfluenceSummary;
use crate::domain::Timeframe;
use crate::models::{ConfidenceTier, Direction, ReasonCode, SignalLabel, TimeframeSnapshot, TradePlan};

/// One evaluation request. Timeframe payloads are kept raw; ingestion decides
/// what they contain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalRequest {
    #[serde(default)]
    pub symbol: String,

    #[serde(rename = "15m", alias = "m15", alias = "tf_15m", default, skip_serializing_if = "Option::is_none")]
    pub m15: Option<Value>,
    #[serde(rename = "1h", alias = "h1", alias = "tf_1h", default, skip_serializing_if = "Option::is_none")]
    pub h1: Option<Value>,
    #[serde(rename = "4h", alias = "h4", alias = "tf_4h", default, skip_serializing_if = "Option::is_none")]
    pub h4: Option<Value>,
    #[serde(rename = "1d", alias = "d1", alias = "tf_1d", default, skip_serializing_if = "Option::is_none")]
    pub d1: Option<Value>,

    /// Overrides tick inference when positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_size: Option<f64>,
}

impl SignalRequest {
    pub fn field(&self, timeframe: Timeframe) -> Option<&Value> {
        match timeframe {
            Timeframe::M15 => self.m15.as_ref(),
            Timeframe::H1 => self.h1.as_ref(),
            Timeframe::H4 => self.h4.as_ref(),
            Timeframe::D1 => self.d1.as_ref(),
        }
    }
}

/// The engine's answer. HOLD responses always carry a `reason`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResponse {
    pub symbol: String,
    pub last_price: Option<f64>,
    pub signal: SignalLabel,
    pub direction: Option<Direction>,
    pub confidence: f64,
    pub confidence_tier: ConfidenceTier,
    pub reason: Option<ReasonCode>,
    pub order_plan: Option<TradePlan>,
    pub timeframes: Vec<TimeframeSnapshot>,
    pub confluence: ConfluenceSummary,
}

impl SignalResponse {
    /// HOLD with nothing derived: used when a required frame is missing or short.
    pub fn insufficient(symbol: &str, timeframes: Vec<TimeframeSnapshot>) -> Self {
        Self {
            symbol: symbol.to_string(),
            last_price: None,
            signal: SignalLabel::Hold,
            direction: None,
            confidence: 0.0,
            confidence_tier: ConfidenceTier::Low,
            reason: Some(ReasonCode::InsufficientData),
            order_plan: None,
            timeframes,
            confluence: ConfluenceSummary::default(),
        }
    }
}
