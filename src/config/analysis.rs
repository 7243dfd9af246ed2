//! Strategy configuration and the named presets.
//!
//! Every trading style runs through the same pipeline; a preset is only a
//! different set of numbers.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::domain::Timeframe;
use crate::error::SignalError;
use crate::utils::TimeUtils;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mode {
    Scalp,
    Swing,
    Structure,
    Impulse,
}

impl Mode {
    pub fn config(&self) -> StrategyConfig {
        match self {
            Mode::Scalp => SCALP,
            Mode::Swing => SWING,
            Mode::Structure => STRUCTURE,
            Mode::Impulse => IMPULSE,
        }
    }
}

/// Which gate turns a directional bias into an actionable trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStyle {
    /// Slow-frame EMA bias, pullback on a faster frame, breakout on the fastest.
    TrendGated,
    /// Price must sit in a still-valid zone matching the prevailing trend.
    ZoneGated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    LastPrice,
    /// Midpoint of the 0.5-0.618 retracement of the latest confirmed leg.
    FibBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub supertrend_period: usize,
    pub supertrend_multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureSettings {
    // Fractal width each side: 2 micro, 3 swing, 6 macro
    pub pivot_lookback: usize,
    pub bos_enabled: bool,
    // Closes after the trigger candle that must stay beyond the level
    pub bos_hold_bars: usize,
    pub bos_volume_ratio: f64,
    pub bos_volume_window: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneSettings {
    pub impulse_multiplier: f64,
    pub consolidation_multiplier: f64,
    pub consolidation_bars: usize,
    // Fractional band around a zone that still counts as "inside"
    pub touch_tolerance_pct: f64,
}

/// Per-timeframe directional score weights and label thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSettings {
    pub price_vs_ema: f64,
    pub ema_alignment: f64,
    pub macd: f64,
    pub supertrend: f64,
    pub rsi_extreme: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub structure: f64,
    pub bos: f64,
    pub strong_threshold: f64,
    pub weak_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeWeights {
    pub m15: f64,
    pub h1: f64,
    pub h4: f64,
    pub d1: f64,
}

impl TimeframeWeights {
    pub fn weight(&self, tf: Timeframe) -> f64 {
        match tf {
            Timeframe::M15 => self.m15,
            Timeframe::H1 => self.h1,
            Timeframe::H4 => self.h4,
            Timeframe::D1 => self.d1,
        }
    }
}

/// Frames and thresholds for the trend/bias gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendGateSettings {
    pub bias: Timeframe,
    pub pullback: Timeframe,
    pub trigger: Timeframe,
    pub pullback_lookback: usize,
    pub breakout_lookback: usize,
    pub breakout_atr_period: usize,
    pub breakout_range_atr: f64,
    // RSI on the pullback frame above this blocks longs
    pub rsi_long_block: f64,
    // ...and below this blocks shorts
    pub rsi_short_block: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskSettings {
    pub entry_mode: EntryMode,
    pub sl_atr_multiple: f64,
    pub sl_buffer_atr: f64,
    // Sanity cap on every level, as a fraction of entry
    pub max_deviation_pct: f64,
    pub tp1_min_r: f64,
    pub tp1_r: f64,
    pub tp2_r: f64,
    pub min_reward_risk: f64,
    pub band_pad_atr: f64,
    pub band_min_atr: f64,
    pub band_max_atr: f64,
    pub fib_extensions: [f64; 2],
    pub tick_lookback: usize,
    pub tick_min: f64,
    pub tick_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSettings {
    pub base: f64,
    pub agreement_step: f64,
    pub agreement_cap: f64,
    pub tight_zone_pct: f64,
    pub tight_zone_bonus: f64,
    pub high_rr: f64,
    pub high_rr_bonus: f64,
    pub disagreement_penalty: f64,
    pub volatility_penalty: f64,
    pub regime_window: usize,
    pub regime_low: f64,
    pub regime_high: f64,
    pub strong_threshold: f64,
    pub tier_medium: f64,
    pub tier_high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CooldownSettings {
    pub enabled: bool,
    pub window_ms: i64,
}

/// The Master Strategy Configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub mode: Mode,
    pub style: DecisionStyle,
    // Frame whose structure drives the zone gate and the volatility regime
    pub primary: Timeframe,
    // Below this a timeframe is reported as not ready
    pub min_bars: usize,
    // Series are truncated to the most recent `max_bars` at ingestion
    pub max_bars: usize,

    // Sub-groups
    pub indicators: IndicatorSettings,
    pub structure: StructureSettings,
    pub zones: ZoneSettings,
    pub scoring: ScoreSettings,
    pub weights: TimeframeWeights,
    pub gate: TrendGateSettings,
    pub risk: RiskSettings,
    pub confidence: ConfidenceSettings,
    pub cooldown: CooldownSettings,
}

impl StrategyConfig {
    /// Timeframes that must be present and ready before anything is computed.
    pub fn required_timeframes(&self) -> Vec<Timeframe> {
        let mut frames = match self.style {
            DecisionStyle::TrendGated => vec![self.gate.bias, self.gate.pullback, self.gate.trigger],
            DecisionStyle::ZoneGated => vec![self.primary],
        };
        frames.sort();
        frames.dedup();
        frames
    }

    /// Frame the regime filter and disagreement penalty read from.
    pub fn anchor_timeframe(&self) -> Timeframe {
        match self.style {
            DecisionStyle::TrendGated => self.gate.bias,
            DecisionStyle::ZoneGated => self.primary,
        }
    }

    /// Reject parameter combinations the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        let ind = &self.indicators;
        let checks = [
            (ind.ema_fast > 0 && ind.ema_fast < ind.ema_slow, "ema_fast must be positive and below ema_slow"),
            (ind.rsi_period > 0 && ind.atr_period > 0, "rsi_period and atr_period must be positive"),
            (ind.macd_fast > 0 && ind.macd_fast < ind.macd_slow, "macd_fast must be positive and below macd_slow"),
            (self.min_bars > 0, "min_bars must be positive"),
            (self.max_bars == 0 || self.max_bars >= self.min_bars, "max_bars must be 0 or at least min_bars"),
            (self.structure.pivot_lookback > 0, "pivot_lookback must be positive"),
            (self.gate.breakout_lookback > 0, "breakout_lookback must be positive"),
            (self.risk.min_reward_risk > 0.0, "min_reward_risk must be positive"),
            (self.risk.max_deviation_pct > 0.0, "max_deviation_pct must be positive"),
            (
                self.risk.tick_min > 0.0 && self.risk.tick_min <= self.risk.tick_max,
                "tick_min must be positive and at most tick_max",
            ),
            (self.cooldown.window_ms >= 0, "cooldown window must not be negative"),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(SignalError::configuration(*message)),
            None => Ok(()),
        }
    }
}

const INDICATORS: IndicatorSettings = IndicatorSettings {
    ema_fast: 20,
    ema_slow: 50,
    rsi_period: 14,
    atr_period: 14,
    macd_fast: 12,
    macd_slow: 26,
    macd_signal: 9,
    supertrend_period: 10,
    supertrend_multiplier: 3.0,
};

const ZONES: ZoneSettings = ZoneSettings {
    impulse_multiplier: 1.5,
    consolidation_multiplier: 0.8,
    consolidation_bars: 3,
    touch_tolerance_pct: 0.001,
};

const SCORING: ScoreSettings = ScoreSettings {
    price_vs_ema: 8.0,
    ema_alignment: 6.0,
    macd: 8.0,
    supertrend: 7.0,
    rsi_extreme: 2.0,
    rsi_oversold: 30.0,
    rsi_overbought: 70.0,
    structure: 5.0,
    bos: 4.0,
    strong_threshold: 26.0,
    weak_threshold: 10.0,
};

const RISK: RiskSettings = RiskSettings {
    entry_mode: EntryMode::LastPrice,
    sl_atr_multiple: 1.5,
    sl_buffer_atr: 0.2,
    max_deviation_pct: 0.03,
    tp1_min_r: 1.0,
    tp1_r: 1.5,
    tp2_r: 3.0,
    min_reward_risk: 2.0,
    band_pad_atr: 0.1,
    band_min_atr: 0.2,
    band_max_atr: 1.0,
    fib_extensions: [1.272, 1.618],
    tick_lookback: 50,
    tick_min: 0.01,
    tick_max: 1.0,
};

const CONFIDENCE: ConfidenceSettings = ConfidenceSettings {
    base: 0.55,
    agreement_step: 0.1,
    agreement_cap: 0.2,
    tight_zone_pct: 0.004,
    tight_zone_bonus: 0.05,
    high_rr: 3.0,
    high_rr_bonus: 0.1,
    disagreement_penalty: 0.15,
    volatility_penalty: 0.1,
    regime_window: 120,
    regime_low: 0.15,
    regime_high: 0.85,
    strong_threshold: 0.8,
    tier_medium: 0.5,
    tier_high: 0.75,
};

const COOLDOWN: CooldownSettings = CooldownSettings {
    enabled: true,
    window_ms: TimeUtils::MS_IN_6_H,
};

pub const SWING: StrategyConfig = StrategyConfig {
    mode: Mode::Swing,
    style: DecisionStyle::TrendGated,
    primary: Timeframe::H4,
    min_bars: 20,
    max_bars: 500,
    indicators: INDICATORS,
    structure: StructureSettings {
        pivot_lookback: 3,
        bos_enabled: true,
        bos_hold_bars: 2,
        bos_volume_ratio: 0.9,
        bos_volume_window: 20,
    },
    zones: ZONES,
    scoring: SCORING,
    weights: TimeframeWeights {
        m15: 0.5,
        h1: 1.0,
        h4: 2.0,
        d1: 1.5,
    },
    gate: TrendGateSettings {
        bias: Timeframe::H4,
        pullback: Timeframe::H1,
        trigger: Timeframe::M15,
        pullback_lookback: 12,
        breakout_lookback: 8,
        breakout_atr_period: 20,
        breakout_range_atr: 1.1,
        rsi_long_block: 75.0,
        rsi_short_block: 25.0,
    },
    risk: RISK,
    confidence: CONFIDENCE,
    cooldown: COOLDOWN,
};

pub const SCALP: StrategyConfig = StrategyConfig {
    mode: Mode::Scalp,
    primary: Timeframe::H1,
    min_bars: 10,
    structure: StructureSettings {
        pivot_lookback: 2,
        bos_enabled: false,
        ..SWING.structure
    },
    weights: TimeframeWeights {
        m15: 3.0,
        h1: 1.5,
        h4: 0.5,
        d1: 0.2,
    },
    gate: TrendGateSettings {
        bias: Timeframe::H1,
        pullback: Timeframe::M15,
        trigger: Timeframe::M15,
        rsi_long_block: 80.0,
        rsi_short_block: 20.0,
        ..SWING.gate
    },
    ..SWING
};

pub const IMPULSE: StrategyConfig = StrategyConfig {
    mode: Mode::Impulse,
    structure: StructureSettings {
        pivot_lookback: 6,
        ..SWING.structure
    },
    risk: RiskSettings {
        entry_mode: EntryMode::FibBand,
        ..RISK
    },
    ..SWING
};

pub const STRUCTURE: StrategyConfig = StrategyConfig {
    mode: Mode::Structure,
    style: DecisionStyle::ZoneGated,
    primary: Timeframe::H1,
    structure: StructureSettings {
        bos_enabled: false,
        ..SWING.structure
    },
    weights: TimeframeWeights {
        m15: 1.0,
        h1: 2.0,
        h4: 1.5,
        d1: 1.0,
    },
    risk: RiskSettings {
        min_reward_risk: 2.5,
        ..RISK
    },
    ..SWING
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_mode_parsing_and_presets() {
        assert_eq!(Mode::from_str("SWING").ok(), Some(Mode::Swing));
        assert_eq!(Mode::from_str("structure").ok(), Some(Mode::Structure));
        for mode in Mode::iter() {
            assert_eq!(mode.config().mode, mode, "Preset for {} carries the wrong mode", mode);
        }
    }

    #[test]
    fn test_presets_validate() {
        for mode in Mode::iter() {
            assert!(mode.config().validate().is_ok(), "{} preset is invalid", mode);
        }
        let inverted = StrategyConfig {
            indicators: IndicatorSettings {
                ema_fast: 60,
                ..SWING.indicators
            },
            ..SWING
        };
        let err = inverted.validate().unwrap_err();
        assert!(err.to_string().contains("ema_fast"), "unexpected error: {}", err);
    }

    #[test]
    fn test_scalp_weights_favour_intraday() {
        let w = SCALP.weights;
        assert!(w.m15 > w.h1 && w.h1 > w.h4 && w.h4 > w.d1);
        assert_eq!(SCALP.gate.rsi_long_block, 80.0);
        assert_eq!(SWING.gate.rsi_long_block, 75.0);
    }

    #[test]
    fn test_required_timeframes() {
        assert_eq!(
            SWING.required_timeframes(),
            vec![Timeframe::M15, Timeframe::H1, Timeframe::H4]
        );
        assert_eq!(SCALP.required_timeframes(), vec![Timeframe::M15, Timeframe::H1]);
        assert_eq!(STRUCTURE.required_timeframes(), vec![Timeframe::H1]);
        assert_eq!(STRUCTURE.risk.min_reward_risk, 2.5);
    }
}
