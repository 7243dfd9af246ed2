//! Final decision: gate a directional idea, price it with the risk builder,
//! then attach a bounded confidence.

use serde::{Deserialize, Serialize};

use crate::analysis::confluence::ConfluenceSummary;
use crate::analysis::indicators;
use crate::analysis::risk::{RiskInputs, build_plan, impulse_leg, infer_tick_size};
use crate::analysis::timeframe_analysis::TimeframeAnalysis;
use crate::config::{ConfidenceSettings, DEBUG_FLAGS, DecisionStyle, StrategyConfig, TrendGateSettings};
use crate::domain::Timeframe;
use crate::models::{
    ConfidenceTier, Direction, ReasonCode, SignalLabel, TradePlan, VolatilityRegime, Zone, ZoneKind,
};
use crate::utils::maths_utils::{get_max, get_min};

/// Outcome of one decision run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub signal: SignalLabel,
    pub direction: Option<Direction>,
    pub confidence: f64,
    pub confidence_tier: ConfidenceTier,
    pub reason: Option<ReasonCode>,
    pub plan: Option<TradePlan>,
}

impl Decision {
    pub fn hold(reason: ReasonCode) -> Self {
        Self {
            signal: SignalLabel::Hold,
            direction: None,
            confidence: 0.0,
            confidence_tier: ConfidenceTier::Low,
            reason: Some(reason),
            plan: None,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.plan.is_some() && self.signal != SignalLabel::Hold
    }
}

/// A gated trade idea before it is priced.
#[derive(Debug, Clone, PartialEq)]
struct Setup {
    direction: Direction,
    /// Frame the entry, ATR and tick come from.
    reference: Timeframe,
    structural_stop: Option<f64>,
    zone: Option<Zone>,
}

/// Inputs to the confidence model.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfidenceFactors {
    pub agreeing_frames: usize,
    pub zone_width_pct: Option<f64>,
    pub reward_risk: f64,
    pub disagreement: bool,
    pub regime: Option<VolatilityRegime>,
}

/// Base plus bonuses minus penalties, clamped to [0, 1] however they stack.
pub fn confidence_score(factors: &ConfidenceFactors, settings: &ConfidenceSettings) -> f64 {
    let mut confidence = settings.base;

    let extra_frames = factors.agreeing_frames.saturating_sub(1) as f64;
    confidence += (settings.agreement_step * extra_frames).min(settings.agreement_cap);

    if factors.zone_width_pct.is_some_and(|w| w <= settings.tight_zone_pct) {
        confidence += settings.tight_zone_bonus;
    }
    if factors.reward_risk >= settings.high_rr {
        confidence += settings.high_rr_bonus;
    }
    if factors.disagreement {
        confidence -= settings.disagreement_penalty;
    }
    if matches!(factors.regime, Some(VolatilityRegime::Low | VolatilityRegime::High)) {
        confidence -= settings.volatility_penalty;
    }

    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn frame(frames: &[TimeframeAnalysis], tf: Timeframe) -> Option<&TimeframeAnalysis> {
    frames.iter().find(|f| f.snapshot.timeframe == tf)
}

fn ready_frame(frames: &[TimeframeAnalysis], tf: Timeframe) -> Option<&TimeframeAnalysis> {
    frame(frames, tf).filter(|f| f.is_ready())
}

/// Slow-frame EMA trend: fast above slow with price above fast (mirrored for shorts).
pub fn bias_direction(bias: &TimeframeAnalysis) -> Option<Direction> {
    let ind = bias.snapshot.indicators?;
    let (fast, slow, close) = (ind.ema_fast?, ind.ema_slow?, bias.snapshot.last_close()?);
    if fast > slow && close > fast {
        Some(Direction::Up)
    } else if fast < slow && close < fast {
        Some(Direction::Down)
    } else {
        None
    }
}

/// Price tagged the fast EMA within the last `lookback` closed bars and the
/// latest close is back on the trend side.
pub fn pullback_confirmed(pullback: &TimeframeAnalysis, direction: Direction, lookback: usize) -> bool {
    let candles = pullback.series.candles();
    let ema = &pullback.columns.ema_fast;
    let n = candles.len().min(ema.len());
    if n < 2 {
        return false;
    }
    let (Some(last), Some(last_ema)) = (candles.get(n - 1), ema[n - 1]) else {
        return false;
    };
    let reclaimed = (last.close - last_ema) * direction.sign() > 0.0;

    let start = (n - 1).saturating_sub(lookback);
    let touched = (start..n - 1).any(|j| match (ema[j], direction) {
        (Some(e), Direction::Up) => candles[j].low <= e,
        (Some(e), Direction::Down) => candles[j].high >= e,
        (None, _) => false,
    });
    touched && reclaimed
}

/// Breakout on the trigger frame. Returns the structural stop (extreme of the
/// prior bars on the far side) when the breakout qualifies.
pub fn breakout_stop(trigger: &TimeframeAnalysis, direction: Direction, gate: &TrendGateSettings) -> Option<f64> {
    let candles = trigger.series.candles();
    let n = candles.len();
    if n < 2 || gate.breakout_lookback == 0 {
        return None;
    }
    let last = candles[n - 1];
    let prior = &candles[(n - 1).saturating_sub(gate.breakout_lookback)..n - 1];
    let highs: Vec<f64> = prior.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = prior.iter().map(|c| c.low).collect();

    let broke_out = match direction {
        Direction::Up => last.close > get_max(&highs)?,
        Direction::Down => last.close < get_min(&lows)?,
    };
    if !broke_out {
        return None;
    }

    let atr = indicators::atr(
        &trigger.series.highs(),
        &trigger.series.lows(),
        &trigger.series.closes(),
        gate.breakout_atr_period,
    );
    let prior_atr = atr.get(n - 2).copied().flatten()?;
    if last.range() < gate.breakout_range_atr * prior_atr {
        return None;
    }

    match direction {
        Direction::Up => get_min(&lows),
        Direction::Down => get_max(&highs),
    }
}

fn rsi_vetoes(pullback: &TimeframeAnalysis, direction: Direction, gate: &TrendGateSettings) -> bool {
    let Some(rsi) = pullback.snapshot.indicators.and_then(|i| i.rsi) else {
        return false;
    };
    match direction {
        Direction::Up => rsi > gate.rsi_long_block,
        Direction::Down => rsi < gate.rsi_short_block,
    }
}

fn trend_gated_setup(frames: &[TimeframeAnalysis], config: &StrategyConfig) -> Result<Setup, ReasonCode> {
    let gate = &config.gate;
    let bias = ready_frame(frames, gate.bias).ok_or(ReasonCode::InsufficientData)?;
    let pullback = ready_frame(frames, gate.pullback).ok_or(ReasonCode::InsufficientData)?;
    let trigger = ready_frame(frames, gate.trigger).ok_or(ReasonCode::InsufficientData)?;

    let direction = bias_direction(bias).ok_or(ReasonCode::NoTrendBias)?;
    if !pullback_confirmed(pullback, direction, gate.pullback_lookback) {
        return Err(ReasonCode::NoPullback);
    }
    if rsi_vetoes(pullback, direction, gate) {
        return Err(ReasonCode::RsiVeto);
    }
    let structural_stop = breakout_stop(trigger, direction, gate).ok_or(ReasonCode::NoTrigger)?;

    Ok(Setup {
        direction,
        reference: gate.trigger,
        structural_stop: Some(structural_stop),
        zone: None,
    })
}

/// Most recent zone of `kind` around `price`, valid or not.
fn zone_at_price(zones: &[Zone], kind: ZoneKind, price: f64, tolerance_pct: f64, valid: bool) -> Option<Zone> {
    zones
        .iter()
        .filter(|z| z.kind == kind && z.valid == valid && z.contains(price, tolerance_pct))
        .max_by_key(|z| z.impulse_index)
        .copied()
}

fn zone_gated_setup(frames: &[TimeframeAnalysis], config: &StrategyConfig) -> Result<Setup, ReasonCode> {
    let primary = ready_frame(frames, config.primary).ok_or(ReasonCode::InsufficientData)?;
    let direction = primary
        .snapshot
        .structure
        .trend
        .direction()
        .ok_or(ReasonCode::NoTrendBias)?;
    let price = primary.snapshot.last_close().ok_or(ReasonCode::InsufficientData)?;
    let kind = ZoneKind::for_direction(direction);
    let tolerance = config.zones.touch_tolerance_pct;
    let zones = &primary.snapshot.zones;

    let Some(zone) = zone_at_price(zones, kind, price, tolerance, true) else {
        return Err(if zone_at_price(zones, kind, price, tolerance, false).is_some() {
            ReasonCode::ZoneBroken
        } else {
            ReasonCode::NoValidZone
        });
    };

    let structural_stop = match kind {
        ZoneKind::Demand => zone.low,
        ZoneKind::Supply => zone.high,
    };
    Ok(Setup {
        direction,
        reference: config.primary,
        structural_stop: Some(structural_stop),
        zone: Some(zone),
    })
}

/// Candidate targets from every ready frame: validated swing prices, the near
/// edge of opposing valid zones, and Fibonacci extensions of the anchor leg.
fn collect_levels(frames: &[TimeframeAnalysis], direction: Direction, config: &StrategyConfig) -> Vec<f64> {
    let opposing = ZoneKind::for_direction(direction.opposite());
    let mut levels: Vec<f64> = Vec::new();

    for f in frames.iter().filter(|f| f.is_ready()) {
        levels.extend(f.snapshot.swings.iter().map(|s| s.price()));
        levels.extend(f.snapshot.valid_zones().filter(|z| z.kind == opposing).map(|z| match opposing {
            ZoneKind::Supply => z.low,
            ZoneKind::Demand => z.high,
        }));
    }

    if let Some(anchor) = ready_frame(frames, config.anchor_timeframe()) {
        if let Some(leg) = impulse_leg(anchor.series.candles(), &anchor.snapshot.swings, direction) {
            levels.extend(config.risk.fib_extensions.iter().map(|r| leg.extension(*r)));
        }
    }
    levels
}

fn agreeing_frames(
    frames: &[TimeframeAnalysis],
    direction: Direction,
    confluence: &ConfluenceSummary,
    style: DecisionStyle,
) -> usize {
    match style {
        DecisionStyle::TrendGated => frames
            .iter()
            .filter(|f| f.is_ready())
            .filter(|f| {
                let close = f.snapshot.last_close();
                let ema = f.snapshot.indicators.and_then(|i| i.ema_fast);
                matches!((close, ema), (Some(c), Some(e)) if (c - e) * direction.sign() > 0.0)
            })
            .count(),
        DecisionStyle::ZoneGated => {
            if confluence.dominant_trend.direction() == Some(direction) {
                confluence.confluence_count
            } else {
                0
            }
        }
    }
}

fn trace(config: &StrategyConfig, symbol: &str, msg: std::fmt::Arguments) {
    if DEBUG_FLAGS.print_decision_trace && DEBUG_FLAGS.for_symbol(symbol) {
        log::info!("[{} {}] {}", symbol, config.mode, msg);
    }
}

/// Run the configured gate, price the trade and score it.
pub fn decide(
    symbol: &str,
    frames: &[TimeframeAnalysis],
    confluence: &ConfluenceSummary,
    config: &StrategyConfig,
    tick_size: Option<f64>,
) -> Decision {
    let all_ready = config
        .required_timeframes()
        .iter()
        .all(|tf| ready_frame(frames, *tf).is_some());
    if !all_ready {
        trace(config, symbol, format_args!("required timeframe missing or short"));
        return Decision::hold(ReasonCode::InsufficientData);
    }

    let setup = match config.style {
        DecisionStyle::TrendGated => trend_gated_setup(frames, config),
        DecisionStyle::ZoneGated => zone_gated_setup(frames, config),
    };
    let setup = match setup {
        Ok(s) => s,
        Err(reason) => {
            trace(config, symbol, format_args!("gate closed: {}", reason));
            return Decision::hold(reason);
        }
    };
    trace(config, symbol, format_args!("gate open {} via {}", setup.direction, setup.reference));

    let Some(reference) = ready_frame(frames, setup.reference) else {
        return Decision::hold(ReasonCode::InsufficientData);
    };
    let (Some(last_price), Some(atr)) = (
        reference.snapshot.last_close(),
        reference.snapshot.indicators.and_then(|i| i.atr),
    ) else {
        return Decision::hold(ReasonCode::DegenerateRisk);
    };

    let tick = tick_size
        .filter(|t| t.is_finite() && *t > 0.0)
        .unwrap_or_else(|| infer_tick_size(&reference.series.closes(), &config.risk));
    let leg = impulse_leg(reference.series.candles(), &reference.snapshot.swings, setup.direction);
    let inputs = RiskInputs {
        direction: setup.direction,
        last_price,
        atr,
        structural_stop: setup.structural_stop,
        levels: collect_levels(frames, setup.direction, config),
        leg,
        tick_size: tick,
    };

    let plan = match build_plan(&inputs, &config.risk) {
        Ok(plan) => plan,
        Err(reason) => {
            trace(config, symbol, format_args!("risk rejected: {}", reason));
            return Decision::hold(reason);
        }
    };

    let anchor = ready_frame(frames, config.anchor_timeframe());
    let anchor_trend_opposes = anchor
        .is_some_and(|a| a.snapshot.structure.trend.direction() == Some(setup.direction.opposite()));
    let confluence_opposes = confluence.direction == Some(setup.direction.opposite());
    let factors = ConfidenceFactors {
        agreeing_frames: agreeing_frames(frames, setup.direction, confluence, config.style),
        zone_width_pct: setup.zone.map(|z| z.width() / last_price),
        reward_risk: plan.reward_risk,
        disagreement: anchor_trend_opposes || confluence_opposes,
        regime: anchor.and_then(|a| a.snapshot.indicators).and_then(|i| i.volatility_regime),
    };
    let confidence = confidence_score(&factors, &config.confidence);
    let tier = ConfidenceTier::from_confidence(confidence, config.confidence.tier_medium, config.confidence.tier_high);
    trace(config, symbol, format_args!("{:?} -> confidence {:.3}", factors, confidence));

    Decision {
        signal: SignalLabel::for_direction(setup.direction, confidence >= config.confidence.strong_threshold),
        direction: Some(setup.direction),
        confidence,
        confidence_tier: tier,
        reason: None,
        plan: Some(plan.with_confidence(confidence, tier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::timeframe_analysis::analyze_timeframe;
    use crate::config::{STRUCTURE, SWING};
    use crate::domain::{Candle, CandleSeries};

    fn series_from(rows: &[(f64, f64, f64, f64)]) -> CandleSeries {
        let candles = rows
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| Candle::new(i as i64 * 60_000, o, h, l, c, Some(10.0)))
            .collect();
        CandleSeries::from_candles(candles, 0)
    }

    fn steady(n: usize, start: f64, step: f64) -> Vec<(f64, f64, f64, f64)> {
        (0..n)
            .map(|i| {
                let c = start + step * i as f64;
                let o = c - step;
                (o, o.max(c) + 0.1, o.min(c) - 0.1, c)
            })
            .collect()
    }

    #[test]
    fn test_confidence_is_clamped() {
        let generous = ConfidenceSettings {
            base: 0.9,
            agreement_cap: 5.0,
            tight_zone_bonus: 1.0,
            high_rr_bonus: 1.0,
            ..SWING.confidence
        };
        let all_bonuses = ConfidenceFactors {
            agreeing_frames: 4,
            zone_width_pct: Some(0.0001),
            reward_risk: 10.0,
            disagreement: false,
            regime: Some(VolatilityRegime::Medium),
        };
        assert_eq!(confidence_score(&all_bonuses, &generous), 1.0);

        let harsh = ConfidenceSettings {
            base: 0.1,
            disagreement_penalty: 2.0,
            volatility_penalty: 2.0,
            ..SWING.confidence
        };
        let all_penalties = ConfidenceFactors {
            agreeing_frames: 0,
            disagreement: true,
            regime: Some(VolatilityRegime::High),
            ..ConfidenceFactors::default()
        };
        assert_eq!(confidence_score(&all_penalties, &harsh), 0.0);
    }

    #[test]
    fn test_confidence_components() {
        let s = SWING.confidence;
        let three_frames = ConfidenceFactors {
            agreeing_frames: 3,
            reward_risk: 2.5,
            regime: Some(VolatilityRegime::Medium),
            ..ConfidenceFactors::default()
        };
        assert!((confidence_score(&three_frames, &s) - 0.75).abs() < 1e-12);

        let five_frames = ConfidenceFactors {
            agreeing_frames: 5,
            ..three_frames
        };
        assert!((confidence_score(&five_frames, &s) - 0.75).abs() < 1e-12, "Agreement bonus is capped");

        let low_vol = ConfidenceFactors {
            regime: Some(VolatilityRegime::Low),
            disagreement: true,
            ..three_frames
        };
        assert!((confidence_score(&low_vol, &s) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bias_direction_needs_price_above_fast_ema() {
        let up = analyze_timeframe(Timeframe::H4, series_from(&steady(80, 50.0, 0.5)), &SWING);
        assert_eq!(bias_direction(&up), Some(Direction::Up));
        let down = analyze_timeframe(Timeframe::H4, series_from(&steady(80, 90.0, -0.5)), &SWING);
        assert_eq!(bias_direction(&down), Some(Direction::Down));

        // Too short for the slow EMA: no bias
        let short = analyze_timeframe(Timeframe::H4, series_from(&steady(30, 50.0, 0.5)), &SWING);
        assert_eq!(bias_direction(&short), None);
    }

    #[test]
    fn test_pullback_and_breakout() {
        // Rising series with a dip into the fast EMA three bars before the end
        let mut rows = steady(60, 100.0, 0.1);
        let dip = rows[56].3 - 2.0;
        rows[56] = (rows[55].3, rows[55].3 + 0.1, dip - 0.1, dip);
        rows[57] = (dip, rows[57].3 + 0.1, dip - 0.1, rows[57].3);
        let a = analyze_timeframe(Timeframe::H1, series_from(&rows), &SWING);
        assert!(pullback_confirmed(&a, Direction::Up, 12));
        assert!(!pullback_confirmed(&a, Direction::Down, 12));

        let steady_up = analyze_timeframe(Timeframe::H1, series_from(&steady(60, 100.0, 0.1)), &SWING);
        assert!(!pullback_confirmed(&steady_up, Direction::Up, 12), "Never touched the EMA");

        // Flat bars then a wide bullish candle above the prior 8 highs
        let mut flat: Vec<(f64, f64, f64, f64)> = (0..40).map(|_| (100.0, 100.1, 99.9, 100.0)).collect();
        flat.push((100.0, 100.9, 99.95, 100.8));
        let t = analyze_timeframe(Timeframe::M15, series_from(&flat), &SWING);
        assert_eq!(breakout_stop(&t, Direction::Up, &SWING.gate), Some(99.9));
        assert_eq!(breakout_stop(&t, Direction::Down, &SWING.gate), None);

        // Same close but a narrow bar fails the range test
        let last = flat.len() - 1;
        flat[last] = (100.75, 100.82, 100.7, 100.8);
        let narrow = analyze_timeframe(Timeframe::M15, series_from(&flat), &SWING);
        assert_eq!(breakout_stop(&narrow, Direction::Up, &SWING.gate), None);
    }

    #[test]
    fn test_missing_frames_hold_with_insufficient_data() {
        let only_h4 = vec![analyze_timeframe(Timeframe::H4, series_from(&steady(80, 50.0, 0.5)), &SWING)];
        let d = decide("TEST", &only_h4, &ConfluenceSummary::default(), &SWING, None);
        assert_eq!(d, Decision::hold(ReasonCode::InsufficientData));
        assert!(d.plan.is_none());
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn test_zone_gate_reasons() {
        let demand = Zone::new(99.0, 100.0, 10, ZoneKind::Demand);
        let mut broken = Zone::new(99.0, 100.0, 12, ZoneKind::Demand);
        broken.invalidate(15);
        let tol = STRUCTURE.zones.touch_tolerance_pct;

        assert_eq!(zone_at_price(&[demand], ZoneKind::Demand, 99.5, tol, true), Some(demand));
        // 0.1% above the top still counts as a touch
        assert!(zone_at_price(&[demand], ZoneKind::Demand, 100.09, tol, true).is_some());
        assert!(zone_at_price(&[demand], ZoneKind::Demand, 100.5, tol, true).is_none());
        assert!(zone_at_price(&[demand], ZoneKind::Supply, 99.5, tol, true).is_none());
        assert_eq!(zone_at_price(&[broken], ZoneKind::Demand, 99.5, tol, false), Some(broken));

        let older = Zone::new(98.5, 100.0, 4, ZoneKind::Demand);
        assert_eq!(
            zone_at_price(&[older, demand], ZoneKind::Demand, 99.5, tol, true).map(|z| z.impulse_index),
            Some(10),
            "Most recent zone wins"
        );
    }
}
