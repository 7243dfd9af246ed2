//! Risk plan construction: entry band, stop-loss, two targets and the
//! reward:risk gate, all snapped to the instrument's tick.

use itertools::Itertools;

use crate::config::{DEBUG_FLAGS, EntryMode, RiskSettings};
use crate::domain::Candle;
use crate::models::{ConfidenceTier, Direction, EntryBand, PivotKind, ReasonCode, TradePlan, ValidatedSwing};
use crate::utils::maths_utils::{TickRounding, get_max, get_min, nearest_power_of_ten, round_to_tick};

const RETRACE_SHALLOW: f64 = 0.5;
const RETRACE_DEEP: f64 = 0.618;
/// Targets closer together than this (in price) are the same level.
const LEVEL_EPSILON: f64 = 1e-9;

/// A move from a confirmed swing to the extreme reached since.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseLeg {
    pub start: f64,
    pub end: f64,
}

impl ImpulseLeg {
    pub fn size(&self) -> f64 {
        (self.end - self.start).abs()
    }

    /// Price `ratio` of the way back from `end` toward `start`.
    pub fn retracement(&self, ratio: f64) -> f64 {
        self.end - ratio * (self.end - self.start)
    }

    /// Price at `ratio` times the leg, measured from `start`.
    pub fn extension(&self, ratio: f64) -> f64 {
        self.start + ratio * (self.end - self.start)
    }
}

/// Latest leg in `direction`: from the most recent validated LOW to the highest
/// high since (longs), or from the most recent validated HIGH to the lowest low
/// since (shorts).
pub fn impulse_leg(candles: &[Candle], swings: &[ValidatedSwing], direction: Direction) -> Option<ImpulseLeg> {
    let origin_kind = match direction {
        Direction::Up => PivotKind::Low,
        Direction::Down => PivotKind::High,
    };
    let origin = swings
        .iter()
        .filter(|s| s.kind() == origin_kind)
        .max_by_key(|s| s.pivot.index)?;
    let after = candles.get(origin.pivot.index + 1..)?;
    let end = match direction {
        Direction::Up => get_max(&after.iter().map(|c| c.high).collect::<Vec<f64>>())?,
        Direction::Down => get_min(&after.iter().map(|c| c.low).collect::<Vec<f64>>())?,
    };
    let leg = ImpulseLeg {
        start: origin.price(),
        end,
    };
    ((leg.end - leg.start) * direction.sign() > 0.0).then_some(leg)
}

/// Tick size from the smallest non-zero close-to-close move over the last
/// `lookback` bars, rounded to a power of ten and clamped.
pub fn infer_tick_size(closes: &[f64], settings: &RiskSettings) -> f64 {
    let start = closes.len().saturating_sub(settings.tick_lookback + 1);
    let smallest_move = closes[start..]
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .filter(|d| d.is_finite() && *d > LEVEL_EPSILON)
        .min_by(|a, b| a.total_cmp(b));

    smallest_move
        .and_then(nearest_power_of_ten)
        .map_or(settings.tick_min, |tick| tick.clamp(settings.tick_min, settings.tick_max))
}

/// Everything the builder needs for one trade idea.
#[derive(Debug, Clone)]
pub struct RiskInputs {
    pub direction: Direction,
    pub last_price: f64,
    pub atr: f64,
    /// Price that invalidates the idea (structure low for longs, etc.).
    pub structural_stop: Option<f64>,
    /// Candidate targets: swing levels, opposing zones, Fibonacci extensions.
    pub levels: Vec<f64>,
    pub leg: Option<ImpulseLeg>,
    pub tick_size: f64,
}

fn entry_band(inputs: &RiskInputs, settings: &RiskSettings) -> (f64, EntryBand) {
    let atr = inputs.atr;
    let around_last = || {
        let half = settings.band_min_atr * atr / 2.0;
        (
            inputs.last_price,
            EntryBand {
                low: inputs.last_price - half,
                high: inputs.last_price + half,
            },
        )
    };

    match (settings.entry_mode, inputs.leg) {
        (EntryMode::FibBand, Some(leg)) if leg.size() > 0.0 => {
            let a = leg.retracement(RETRACE_SHALLOW);
            let b = leg.retracement(RETRACE_DEEP);
            let pad = settings.band_pad_atr * atr;
            let (low, high) = (a.min(b) - pad, a.max(b) + pad);
            let mid = (low + high) / 2.0;
            let half = ((high - low) / 2.0).clamp(settings.band_min_atr * atr / 2.0, settings.band_max_atr * atr / 2.0);
            (
                mid,
                EntryBand {
                    low: mid - half,
                    high: mid + half,
                },
            )
        }
        _ => around_last(),
    }
}

/// Build the plan, or say why there is none.
///
/// The stop is the further of the ATR stop and the buffered structural stop.
/// TP1 is the nearest level at least `tp1_min_r` R away, TP2 the next level
/// beyond it; both fall back to R multiples. Every level is capped at
/// `max_deviation_pct` of entry. Reward:risk is measured after quantization.
pub fn build_plan(inputs: &RiskInputs, settings: &RiskSettings) -> Result<TradePlan, ReasonCode> {
    let dir = inputs.direction;
    let sign = dir.sign();
    let atr = inputs.atr;
    if !(inputs.last_price.is_finite() && inputs.last_price > 0.0 && atr.is_finite() && atr > 0.0) {
        return Err(ReasonCode::DegenerateRisk);
    }

    let (entry, band) = entry_band(inputs, settings);
    let cap = settings.max_deviation_pct * entry;

    // Stop: further of the two candidates, then capped
    let atr_stop_distance = settings.sl_atr_multiple * atr;
    let structural_distance = inputs
        .structural_stop
        .filter(|s| s.is_finite())
        .map(|s| (entry - s) * sign + settings.sl_buffer_atr * atr)
        .filter(|d| *d > 0.0);
    let stop_distance = structural_distance
        .map_or(atr_stop_distance, |d| d.max(atr_stop_distance))
        .min(cap);
    let stop = entry - sign * stop_distance;
    let r = stop_distance;

    // Targets: levels on the trade side of entry and inside the cap, nearest first
    let rewards: Vec<f64> = inputs
        .levels
        .iter()
        .map(|lvl| (lvl - entry) * sign)
        .filter(|d| d.is_finite() && *d > 0.0 && *d <= cap)
        .sorted_by(|a, b| a.total_cmp(b))
        .dedup_by(|a, b| (a - b).abs() < LEVEL_EPSILON)
        .collect();

    let tp1_reward = rewards
        .iter()
        .copied()
        .find(|d| *d >= settings.tp1_min_r * r)
        .unwrap_or((settings.tp1_r * r).min(cap));
    let tp2_reward = rewards
        .iter()
        .copied()
        .find(|d| *d > tp1_reward + LEVEL_EPSILON)
        .unwrap_or((settings.tp2_r * r).max(1.5 * tp1_reward).min(cap));

    if DEBUG_FLAGS.print_risk_plan {
        log::info!(
            "   risk {}: entry={:.6} stop={:.6} R={:.6} tp1=+{:.6} tp2=+{:.6} levels={}",
            dir,
            entry,
            stop,
            r,
            tp1_reward,
            tp2_reward,
            rewards.len()
        );
    }

    // Snap: entry nearest, stop away from entry, targets toward entry
    let tick = inputs.tick_size;
    let (away, toward) = match dir {
        Direction::Up => (TickRounding::Down, TickRounding::Down),
        Direction::Down => (TickRounding::Up, TickRounding::Up),
    };
    let entry_q = round_to_tick(entry, tick, TickRounding::Nearest);
    let stop_q = round_to_tick(stop, tick, away);
    let tp1_q = round_to_tick(entry + sign * tp1_reward, tick, toward);
    let tp2_q = round_to_tick(entry + sign * tp2_reward, tick, toward);

    let r_q = (entry_q - stop_q) * sign;
    let reward_q = (tp2_q - entry_q) * sign;
    if !(r_q.is_finite() && r_q > 0.0 && reward_q.is_finite() && reward_q > 0.0) {
        return Err(ReasonCode::DegenerateRisk);
    }
    let reward_risk = reward_q / r_q;
    if reward_risk < settings.min_reward_risk {
        return Err(ReasonCode::RewardRiskBelowMinimum);
    }

    Ok(TradePlan {
        direction: dir,
        entry_price: entry_q,
        entry_band: EntryBand {
            low: round_to_tick(band.low, tick, TickRounding::Nearest),
            high: round_to_tick(band.high, tick, TickRounding::Nearest),
        },
        stop_loss: stop_q,
        take_profit_1: tp1_q,
        take_profit_2: tp2_q,
        r_distance: r_q,
        reward_risk,
        tick_size: tick,
        atr,
        confidence: 0.0,
        confidence_label: ConfidenceTier::Low,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IMPULSE, SWING};
    use crate::models::Pivot;

    fn inputs(direction: Direction) -> RiskInputs {
        RiskInputs {
            direction,
            last_price: 100.0,
            atr: 1.0,
            structural_stop: None,
            levels: Vec::new(),
            leg: None,
            tick_size: 0.01,
        }
    }

    #[test]
    fn test_atr_fallbacks_long() {
        let plan = build_plan(&inputs(Direction::Up), &SWING.risk).expect("plan");
        assert_eq!(plan.entry_price, 100.0);
        assert_eq!(plan.stop_loss, 98.5);
        assert_eq!(plan.take_profit_1, 102.25, "1.5R");
        assert_eq!(plan.take_profit_2, 103.0, "3R, capped at 3% of entry");
        assert!((plan.reward_risk - 2.0).abs() < 1e-9);
        assert_eq!(plan.entry_band, EntryBand { low: 99.9, high: 100.1 });
    }

    #[test]
    fn test_structural_stop_wins_when_further_and_short_mirrors() {
        let mut i = inputs(Direction::Down);
        i.structural_stop = Some(100.9);
        i.atr = 0.3;
        let plan = build_plan(&i, &SWING.risk).expect("plan");
        // structural 100.9 + 0.06 buffer beats the ATR stop at 100.45
        assert_eq!(plan.stop_loss, 100.96);
        assert_eq!(plan.take_profit_1, 98.56);
        assert_eq!(plan.take_profit_2, 97.12);
        assert!((plan.r_distance - 0.96).abs() < 1e-9);
        assert!((plan.reward_risk - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_is_capped() {
        let mut i = inputs(Direction::Up);
        i.structural_stop = Some(80.0);
        let result = build_plan(&i, &SWING.risk);
        // Stop capped at 3%, targets capped at 3% too, so R:R collapses to 1
        assert_eq!(result, Err(ReasonCode::RewardRiskBelowMinimum));
    }

    #[test]
    fn test_levels_drive_targets() {
        let mut i = inputs(Direction::Up);
        i.atr = 0.5; // R = 0.75
        i.levels = vec![100.3, 101.0, 101.0, 102.4, 99.0, 150.0];
        let plan = build_plan(&i, &SWING.risk).expect("plan");
        assert_eq!(plan.take_profit_1, 101.0, "100.3 is under 1R");
        assert_eq!(plan.take_profit_2, 102.4);
        assert!((plan.reward_risk - 2.4 / 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_reward_risk_gate() {
        let mut i = inputs(Direction::Up);
        i.atr = 0.5;
        i.levels = vec![101.0, 101.2];
        assert_eq!(build_plan(&i, &SWING.risk), Err(ReasonCode::RewardRiskBelowMinimum));
    }

    #[test]
    fn test_degenerate_inputs() {
        let mut i = inputs(Direction::Up);
        i.atr = 0.0;
        assert_eq!(build_plan(&i, &SWING.risk), Err(ReasonCode::DegenerateRisk));
        i.atr = f64::NAN;
        assert_eq!(build_plan(&i, &SWING.risk), Err(ReasonCode::DegenerateRisk));
        // Targets collapse onto entry after snapping to a coarse tick
        let mut coarse = inputs(Direction::Up);
        coarse.atr = 0.001;
        coarse.tick_size = 1.0;
        assert_eq!(build_plan(&coarse, &SWING.risk), Err(ReasonCode::DegenerateRisk));
    }

    #[test]
    fn test_fib_band_entry() {
        let mut i = inputs(Direction::Up);
        i.last_price = 109.0;
        i.leg = Some(ImpulseLeg { start: 100.0, end: 110.0 });
        let plan = build_plan(&i, &IMPULSE.risk).expect("plan");
        // 0.5-0.618 retracement is 103.82-105.0, padded to 103.72-105.1 and
        // clamped to 1 ATR wide around its midpoint 104.41
        assert_eq!(plan.entry_price, 104.41);
        assert_eq!(plan.entry_band, EntryBand { low: 103.91, high: 104.91 });
    }

    #[test]
    fn test_impulse_leg_from_swings() {
        let candles: Vec<Candle> = [10.0, 8.0, 9.0, 12.0, 11.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64, c, c + 0.5, c - 0.5, c, None))
            .collect();
        let low = ValidatedSwing {
            pivot: Pivot { index: 1, kind: PivotKind::Low, price: 7.5, time: 1 },
            confirmed_at_index: 3,
        };
        let leg = impulse_leg(&candles, &[low], Direction::Up).expect("leg");
        assert_eq!(leg, ImpulseLeg { start: 7.5, end: 12.5 });
        assert!((leg.extension(1.272) - (7.5 + 1.272 * 5.0)).abs() < 1e-12);
        assert!(impulse_leg(&candles, &[low], Direction::Down).is_none());
    }

    #[test]
    fn test_infer_tick_size() {
        let closes = [100.28, 100.31, 100.28, 100.31, 100.70];
        assert_eq!(infer_tick_size(&closes, &SWING.risk), 0.01);
        assert_eq!(infer_tick_size(&[5000.0, 5004.0, 5010.0], &SWING.risk), 1.0, "Clamped to max");
        assert_eq!(infer_tick_size(&[1.0, 1.0], &SWING.risk), SWING.risk.tick_min);
    }
}
