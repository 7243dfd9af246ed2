use serde::{Deserialize, Serialize};

use super::signal::{Direction, SignalLabel};
use super::structure::{BreakOfStructure, StructureState, ValidatedSwing};
use super::zone::Zone;
use crate::domain::{Candle, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityRegime {
    Low,
    Medium,
    High,
}

impl VolatilityRegime {
    pub fn from_percentile(pct: f64, low_below: f64, high_above: f64) -> Self {
        if pct < low_below {
            VolatilityRegime::Low
        } else if pct > high_above {
            VolatilityRegime::High
        } else {
            VolatilityRegime::Medium
        }
    }
}

/// Last-bar indicator values. `None` means unavailable (warm-up or degenerate).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub atr: Option<f64>,
    pub supertrend: Option<f64>,
    pub supertrend_direction: Option<Direction>,
    pub atr_percentile: Option<f64>,
    pub volatility_regime: Option<VolatilityRegime>,
}

/// Everything one timeframe contributes. Frames never reference each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeSnapshot {
    pub timeframe: Timeframe,
    pub ready: bool,
    pub bars: usize,
    pub last_candle: Option<Candle>,
    pub indicators: Option<IndicatorSnapshot>,
    pub structure: StructureState,
    pub bos: Option<BreakOfStructure>,
    pub zones: Vec<Zone>,
    #[serde(skip)]
    pub swings: Vec<ValidatedSwing>,
    pub score: f64,
    pub signal: SignalLabel,
}

impl TimeframeSnapshot {
    /// Placeholder for a frame without enough history.
    pub fn neutral(timeframe: Timeframe, bars: usize) -> Self {
        Self {
            timeframe,
            ready: false,
            bars,
            last_candle: None,
            indicators: None,
            structure: StructureState::default(),
            bos: None,
            zones: Vec::new(),
            swings: Vec::new(),
            score: 0.0,
            signal: SignalLabel::Hold,
        }
    }

    pub fn last_close(&self) -> Option<f64> {
        self.last_candle.map(|c| c.close)
    }

    pub fn valid_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.valid)
    }
}
