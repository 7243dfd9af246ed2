use serde::{Deserialize, Serialize};

use super::signal::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PivotKind {
    High,
    Low,
}

/// A fractal swing point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub index: usize,
    pub kind: PivotKind,
    pub price: f64,
    pub time: i64,
}

/// A pivot that a later close has confirmed by breaking the previous
/// opposite pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidatedSwing {
    #[serde(flatten)]
    pub pivot: Pivot,
    pub confirmed_at_index: usize,
}

impl ValidatedSwing {
    pub fn price(&self) -> f64 {
        self.pivot.price
    }

    pub fn kind(&self) -> PivotKind {
        self.pivot.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Neutral,
}

impl Trend {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Trend::Up => Some(Direction::Up),
            Trend::Down => Some(Direction::Down),
            Trend::Neutral => None,
        }
    }

    /// +1 up, -1 down, 0 neutral
    pub fn sign(&self) -> f64 {
        self.direction().map_or(0.0, |d| d.sign())
    }
}

/// Trend plus the most recent validated high and low.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StructureState {
    pub trend: Trend,
    pub last_valid_high: Option<ValidatedSwing>,
    pub last_valid_low: Option<ValidatedSwing>,
}

/// A held, volume-backed close beyond the latest validated opposite pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakOfStructure {
    pub direction: Direction,
    pub level: f64,
    pub trigger_index: usize,
}
