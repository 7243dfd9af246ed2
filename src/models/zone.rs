use serde::{Deserialize, Serialize};

use super::signal::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneKind {
    Demand,
    Supply,
}

impl ZoneKind {
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Up => ZoneKind::Demand,
            Direction::Down => ZoneKind::Supply,
        }
    }
}

/// The last tight candle before an impulse, kept as a retest target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub low: f64,
    pub high: f64,
    pub impulse_index: usize,
    pub kind: ZoneKind,
    pub valid: bool,
    pub invalidated_at: Option<usize>,
}

impl Zone {
    pub fn new(low: f64, high: f64, impulse_index: usize, kind: ZoneKind) -> Self {
        Self {
            low,
            high,
            impulse_index,
            kind,
            valid: true,
            invalidated_at: None,
        }
    }

    /// Invalidation is one-way.
    pub fn invalidate(&mut self, index: usize) {
        if self.valid {
            self.valid = false;
            self.invalidated_at = Some(index);
        }
    }

    /// Does `close` sit beyond the far boundary?
    pub fn is_broken_by(&self, close: f64) -> bool {
        match self.kind {
            ZoneKind::Demand => close < self.low,
            ZoneKind::Supply => close > self.high,
        }
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// Inside the zone, or within `tolerance_pct` of either edge.
    pub fn contains(&self, price: f64, tolerance_pct: f64) -> bool {
        let pad = price.abs() * tolerance_pct;
        price >= self.low - pad && price <= self.high + pad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_with_tolerance() {
        let z = Zone::new(100.0, 101.0, 5, ZoneKind::Demand);
        assert!(z.contains(100.5, 0.0));
        assert!(!z.contains(101.05, 0.0));
        assert!(z.contains(101.05, 0.001), "0.1% of ~101 is ~0.10");
        assert!(!z.contains(99.8, 0.001));
    }

    #[test]
    fn test_invalidate_is_one_way() {
        let mut z = Zone::new(1.0, 2.0, 0, ZoneKind::Supply);
        assert!(z.is_broken_by(2.5));
        assert!(!z.is_broken_by(1.5));
        z.invalidate(7);
        z.invalidate(9);
        assert!(!z.valid);
        assert_eq!(z.invalidated_at, Some(7));
    }
}
