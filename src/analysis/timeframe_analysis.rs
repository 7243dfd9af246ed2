//! Per-timeframe analysis: indicators, structure and zones folded into one
//! snapshot with a directional score.

use crate::analysis::indicators::{self, MacdOutput, SuperTrendPoint};
use crate::analysis::structure::analyze_structure;
use crate::analysis::zone_detection::detect_zones;
use crate::config::{DEBUG_FLAGS, ScoreSettings, StrategyConfig};
use crate::domain::{CandleSeries, Timeframe};
use crate::models::{
    BreakOfStructure, IndicatorSnapshot, SignalLabel, StructureState, TimeframeSnapshot, VolatilityRegime,
};

/// Full indicator columns, kept for the gates that look back over several bars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorColumns {
    pub ema_fast: Vec<Option<f64>>,
    pub ema_slow: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub atr: Vec<Option<f64>>,
    pub macd: MacdOutput,
    pub supertrend: Vec<Option<SuperTrendPoint>>,
}

/// One analysed timeframe: the reportable snapshot plus the data behind it.
#[derive(Debug, Clone)]
pub struct TimeframeAnalysis {
    pub snapshot: TimeframeSnapshot,
    pub series: CandleSeries,
    pub columns: IndicatorColumns,
}

impl TimeframeAnalysis {
    pub fn is_ready(&self) -> bool {
        self.snapshot.ready
    }
}

fn last<T: Copy>(column: &[Option<T>]) -> Option<T> {
    column.last().copied().flatten()
}

fn compute_columns(series: &CandleSeries, config: &StrategyConfig) -> IndicatorColumns {
    let s = &config.indicators;
    let (highs, lows, closes) = (series.highs(), series.lows(), series.closes());
    IndicatorColumns {
        ema_fast: indicators::ema_values(&closes, s.ema_fast),
        ema_slow: indicators::ema_values(&closes, s.ema_slow),
        rsi: indicators::rsi_wilder(&closes, s.rsi_period),
        atr: indicators::atr(&highs, &lows, &closes, s.atr_period),
        macd: indicators::macd(&closes, s.macd_fast, s.macd_slow, s.macd_signal),
        supertrend: indicators::super_trend(&highs, &lows, &closes, s.supertrend_period, s.supertrend_multiplier),
    }
}

fn snapshot_indicators(columns: &IndicatorColumns, config: &StrategyConfig) -> IndicatorSnapshot {
    let st = last(&columns.supertrend);
    let atr_percentile = indicators::atr_percentile(&columns.atr, config.confidence.regime_window);
    IndicatorSnapshot {
        ema_fast: last(&columns.ema_fast),
        ema_slow: last(&columns.ema_slow),
        rsi: last(&columns.rsi),
        macd: last(&columns.macd.line),
        macd_signal: last(&columns.macd.signal),
        macd_histogram: last(&columns.macd.histogram),
        atr: last(&columns.atr),
        supertrend: st.map(|p| p.value),
        supertrend_direction: st.map(|p| p.direction),
        atr_percentile,
        volatility_regime: atr_percentile.map(|p| {
            VolatilityRegime::from_percentile(p, config.confidence.regime_low, config.confidence.regime_high)
        }),
    }
}

/// +1 / -1 / 0 from a strict comparison; unavailable inputs give 0.
fn vote(a: Option<f64>, b: Option<f64>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if a > b => 1.0,
        (Some(a), Some(b)) if a < b => -1.0,
        _ => 0.0,
    }
}

/// Directional score in [-100, 100].
pub fn score_snapshot(
    indicators: &IndicatorSnapshot,
    last_close: Option<f64>,
    structure: &StructureState,
    bos: Option<&BreakOfStructure>,
    weights: &ScoreSettings,
) -> f64 {
    let mut score = 0.0;

    score += weights.price_vs_ema * vote(last_close, indicators.ema_fast);
    score += weights.ema_alignment * vote(indicators.ema_fast, indicators.ema_slow);

    // MACD line and histogram must agree on the side of zero
    if let (Some(line), Some(hist)) = (indicators.macd, indicators.macd_histogram) {
        if line > 0.0 && hist > 0.0 {
            score += weights.macd;
        } else if line < 0.0 && hist < 0.0 {
            score -= weights.macd;
        }
    }

    if let Some(direction) = indicators.supertrend_direction {
        score += weights.supertrend * direction.sign();
    }

    // RSI extremes lean contrarian
    if let Some(rsi) = indicators.rsi {
        if rsi <= weights.rsi_oversold {
            score += weights.rsi_extreme;
        } else if rsi >= weights.rsi_overbought {
            score -= weights.rsi_extreme;
        }
    }

    score += weights.structure * structure.trend.sign();
    if let Some(bos) = bos {
        score += weights.bos * bos.direction.sign();
    }

    score.clamp(-100.0, 100.0)
}

/// Analyse one timeframe. Fewer than `min_bars` candles gives a neutral,
/// not-ready snapshot with nothing computed.
pub fn analyze_timeframe(timeframe: Timeframe, series: CandleSeries, config: &StrategyConfig) -> TimeframeAnalysis {
    if series.len() < config.min_bars {
        return TimeframeAnalysis {
            snapshot: TimeframeSnapshot::neutral(timeframe, series.len()),
            series,
            columns: IndicatorColumns::default(),
        };
    }

    let columns = compute_columns(&series, config);
    let structure = analyze_structure(series.candles(), &config.structure);
    let zones = detect_zones(series.candles(), &columns.atr, &config.zones);
    let indicators = snapshot_indicators(&columns, config);
    let last_close = series.last_close();

    let score = score_snapshot(
        &indicators,
        last_close,
        &structure.state,
        structure.bos.as_ref(),
        &config.scoring,
    );
    let signal = SignalLabel::from_score(score, config.scoring.strong_threshold, config.scoring.weak_threshold);

    if DEBUG_FLAGS.print_timeframe_scores {
        log::info!(
            "[{}] bars={} score={:.1} ({}) trend={:?} zones={} swings={}",
            timeframe,
            series.len(),
            score,
            signal,
            structure.state.trend,
            zones.len(),
            structure.swings.len()
        );
    }

    let snapshot = TimeframeSnapshot {
        timeframe,
        ready: true,
        bars: series.len(),
        last_candle: series.last().copied(),
        indicators: Some(indicators),
        structure: structure.state,
        bos: structure.bos,
        zones,
        swings: structure.swings,
        score,
        signal,
    };

    TimeframeAnalysis {
        snapshot,
        series,
        columns,
    }
}
