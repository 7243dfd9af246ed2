use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// +1 for longs, -1 for shorts. Multiplying a price distance by this turns
    /// "further in the trade's favour" into "larger".
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum SignalLabel {
    #[serde(rename = "STRONG BUY")]
    #[strum(serialize = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    #[strum(serialize = "BUY")]
    Buy,
    #[serde(rename = "HOLD")]
    #[strum(serialize = "HOLD")]
    Hold,
    #[serde(rename = "SELL")]
    #[strum(serialize = "SELL")]
    Sell,
    #[serde(rename = "STRONG SELL")]
    #[strum(serialize = "STRONG SELL")]
    StrongSell,
}

impl SignalLabel {
    /// Bucket a clamped score with symmetric thresholds.
    pub fn from_score(score: f64, strong: f64, weak: f64) -> Self {
        if score >= strong {
            SignalLabel::StrongBuy
        } else if score >= weak {
            SignalLabel::Buy
        } else if score <= -strong {
            SignalLabel::StrongSell
        } else if score <= -weak {
            SignalLabel::Sell
        } else {
            SignalLabel::Hold
        }
    }

    pub fn for_direction(direction: Direction, strong: bool) -> Self {
        match (direction, strong) {
            (Direction::Up, true) => SignalLabel::StrongBuy,
            (Direction::Up, false) => SignalLabel::Buy,
            (Direction::Down, true) => SignalLabel::StrongSell,
            (Direction::Down, false) => SignalLabel::Sell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn from_confidence(confidence: f64, medium_at: f64, high_at: f64) -> Self {
        if confidence >= high_at {
            ConfidenceTier::High
        } else if confidence >= medium_at {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

/// Machine readable reason attached to every HOLD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReasonCode {
    InsufficientData,
    NoTrendBias,
    NoPullback,
    NoTrigger,
    RsiVeto,
    NoValidZone,
    ZoneBroken,
    DegenerateRisk,
    RewardRiskBelowMinimum,
    CooldownActive,
}
