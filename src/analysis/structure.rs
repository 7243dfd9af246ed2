//! Market structure: fractal pivots, validated swings, trend and break of structure.

use crate::config::StructureSettings;
use crate::domain::Candle;
use crate::models::{BreakOfStructure, Direction, Pivot, PivotKind, StructureState, Trend, ValidatedSwing};
use crate::utils::maths_utils::mean;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureAnalysis {
    pub pivots: Vec<Pivot>,
    pub swings: Vec<ValidatedSwing>,
    pub state: StructureState,
    pub bos: Option<BreakOfStructure>,
}

/// Strict fractal pivots: the bar's high (low) must beat every bar within
/// `lookback` positions on both sides.
pub fn detect_pivots(candles: &[Candle], lookback: usize) -> Vec<Pivot> {
    let n = candles.len();
    if lookback == 0 || n <= 2 * lookback {
        return Vec::new();
    }

    let mut pivots = Vec::new();
    for i in lookback..n - lookback {
        let window = (i - lookback)..=(i + lookback);
        let c = &candles[i];
        if window.clone().filter(|&j| j != i).all(|j| c.high > candles[j].high) {
            pivots.push(Pivot {
                index: i,
                kind: PivotKind::High,
                price: c.high,
                time: c.open_time,
            });
        }
        if window.filter(|&j| j != i).all(|j| c.low < candles[j].low) {
            pivots.push(Pivot {
                index: i,
                kind: PivotKind::Low,
                price: c.low,
                time: c.open_time,
            });
        }
    }
    pivots
}

/// Merge runs of same-kind pivots, keeping the more extreme (earlier on ties),
/// so the result strictly alternates.
pub fn consolidate_pivots(pivots: &[Pivot]) -> Vec<Pivot> {
    let mut out: Vec<Pivot> = Vec::with_capacity(pivots.len());
    for p in pivots {
        match out.last_mut() {
            Some(last) if last.kind == p.kind => {
                let more_extreme = match p.kind {
                    PivotKind::High => p.price > last.price,
                    PivotKind::Low => p.price < last.price,
                };
                if more_extreme {
                    *last = *p;
                }
            }
            _ => out.push(*p),
        }
    }
    out
}

/// A pivot is confirmed by the first later close that breaks the pivot
/// immediately before it (a LOW needs a close above the preceding HIGH).
pub fn validate_swings(pivots: &[Pivot], candles: &[Candle]) -> Vec<ValidatedSwing> {
    pivots
        .windows(2)
        .filter_map(|pair| {
            let (prev, pivot) = (pair[0], pair[1]);
            let confirmed_at_index = candles
                .iter()
                .enumerate()
                .skip(pivot.index + 1)
                .find(|(_, c)| match pivot.kind {
                    PivotKind::Low => c.close > prev.price,
                    PivotKind::High => c.close < prev.price,
                })
                .map(|(j, _)| j)?;
            Some(ValidatedSwing {
                pivot,
                confirmed_at_index,
            })
        })
        .collect()
}

fn latest_of_kind(swings: &[ValidatedSwing], kind: PivotKind) -> Option<ValidatedSwing> {
    swings
        .iter()
        .filter(|s| s.kind() == kind)
        .max_by_key(|s| s.pivot.index)
        .copied()
}

/// Trend from the most recently confirmed swing, with a live override when the
/// last close has already crossed the opposite valid level.
pub fn classify_trend(swings: &[ValidatedSwing], last_close: Option<f64>) -> StructureState {
    let last_valid_high = latest_of_kind(swings, PivotKind::High);
    let last_valid_low = latest_of_kind(swings, PivotKind::Low);

    let base = swings
        .iter()
        .max_by_key(|s| (s.confirmed_at_index, s.pivot.index))
        .map_or(Trend::Neutral, |s| match s.kind() {
            PivotKind::Low => Trend::Up,
            PivotKind::High => Trend::Down,
        });

    let trend = match (base, last_close) {
        (Trend::Up, Some(close)) if last_valid_low.is_some_and(|l| close < l.price()) => Trend::Down,
        (Trend::Down, Some(close)) if last_valid_high.is_some_and(|h| close > h.price()) => Trend::Up,
        (t, _) => t,
    };

    StructureState {
        trend,
        last_valid_high,
        last_valid_low,
    }
}

/// Trigger volume against the mean of up to `window` earlier volumes.
/// Missing volume anywhere it matters fails the check.
fn volume_confirms(candles: &[Candle], trigger: usize, settings: &StructureSettings) -> bool {
    let Some(trigger_volume) = candles[trigger].volume else {
        return false;
    };
    let start = trigger.saturating_sub(settings.bos_volume_window);
    let prior: Vec<f64> = candles[start..trigger].iter().filter_map(|c| c.volume).collect();
    match mean(&prior) {
        Some(avg) => trigger_volume >= settings.bos_volume_ratio * avg,
        None => false,
    }
}

fn break_in_direction(
    candles: &[Candle],
    level_swing: ValidatedSwing,
    direction: Direction,
    settings: &StructureSettings,
) -> Option<BreakOfStructure> {
    let level = level_swing.price();
    let beyond = |close: f64| (close - level) * direction.sign() > 0.0;

    let last = candles.last()?;
    if !beyond(last.close) {
        return None;
    }

    // Trigger is the start of the trailing run of closes beyond the level
    let search_from = level_swing.pivot.index.max(level_swing.confirmed_at_index) + 1;
    let last_index = candles.len() - 1;
    if last_index < search_from {
        return None;
    }
    let trigger = (search_from..=last_index)
        .rev()
        .take_while(|&j| beyond(candles[j].close))
        .last()?;

    let hold_end = trigger + settings.bos_hold_bars;
    if hold_end >= candles.len() {
        return None;
    }
    if !candles[trigger + 1..=hold_end].iter().all(|c| beyond(c.close)) {
        return None;
    }
    if !volume_confirms(candles, trigger, settings) {
        return None;
    }

    Some(BreakOfStructure {
        direction,
        level,
        trigger_index: trigger,
    })
}

/// A close beyond the latest validated opposite pivot that held for
/// `bos_hold_bars` closes on above-threshold volume. Later trigger wins.
pub fn detect_bos(
    candles: &[Candle],
    swings: &[ValidatedSwing],
    settings: &StructureSettings,
) -> Option<BreakOfStructure> {
    let bullish = latest_of_kind(swings, PivotKind::High)
        .and_then(|h| break_in_direction(candles, h, Direction::Up, settings));
    let bearish = latest_of_kind(swings, PivotKind::Low)
        .and_then(|l| break_in_direction(candles, l, Direction::Down, settings));

    match (bullish, bearish) {
        (Some(b), Some(s)) => Some(if s.trigger_index > b.trigger_index { s } else { b }),
        (b, s) => b.or(s),
    }
}

/// Full structure pass over one series.
pub fn analyze_structure(candles: &[Candle], settings: &StructureSettings) -> StructureAnalysis {
    let pivots = consolidate_pivots(&detect_pivots(candles, settings.pivot_lookback));
    let swings = validate_swings(&pivots, candles);
    let state = classify_trend(&swings, candles.last().map(|c| c.close));
    let bos = if settings.bos_enabled {
        detect_bos(candles, &swings, settings)
    } else {
        None
    };
    StructureAnalysis {
        pivots,
        swings,
        state,
        bos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SWING;

    fn candles_from_closes(closes: &[f64], volume: f64) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 60_000, c, c + 0.5, c - 0.5, c, Some(volume)))
            .collect()
    }

    fn settings(lookback: usize) -> StructureSettings {
        StructureSettings {
            pivot_lookback: lookback,
            bos_enabled: true,
            ..SWING.structure
        }
    }

    // L2, H5, L9 with H5 confirmed at 8 and L9 confirmed at 12
    const BOS_CLOSES: [f64; 15] = [
        10.0, 9.0, 8.0, 9.0, 10.0, 12.0, 11.0, 10.0, 7.0, 6.5, 8.0, 10.0, 13.0, 13.5, 14.0,
    ];

    #[test]
    fn test_detect_pivots_strict_fractal() {
        let closes = [10.0, 11.0, 12.0, 14.0, 12.0, 11.0, 9.0, 8.0, 9.0, 10.0, 13.0, 15.0, 16.0, 14.0, 13.0, 12.0];
        let pivots = detect_pivots(&candles_from_closes(&closes, 1.0), 2);
        let summary: Vec<(usize, PivotKind)> = pivots.iter().map(|p| (p.index, p.kind)).collect();
        assert_eq!(
            summary,
            vec![(3, PivotKind::High), (7, PivotKind::Low), (12, PivotKind::High)]
        );
        assert_eq!(pivots[0].price, 14.5);
    }

    #[test]
    fn test_equal_highs_are_not_pivots() {
        let closes = [1.0, 2.0, 3.0, 3.0, 2.0, 1.0];
        let pivots = detect_pivots(&candles_from_closes(&closes, 1.0), 1);
        assert!(pivots.iter().all(|p| p.kind != PivotKind::High), "Strict inequality required");
    }

    #[test]
    fn test_consolidate_keeps_extreme() {
        let p = |index, kind, price| Pivot { index, kind, price, time: 0 };
        let merged = consolidate_pivots(&[
            p(1, PivotKind::High, 10.0),
            p(3, PivotKind::High, 12.0),
            p(5, PivotKind::High, 12.0),
            p(7, PivotKind::Low, 5.0),
            p(9, PivotKind::Low, 6.0),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].index, merged[0].price), (3, 12.0), "Earlier pivot wins ties");
        assert_eq!((merged[1].index, merged[1].price), (7, 5.0));
    }

    #[test]
    fn test_validation_and_trend() {
        let candles = candles_from_closes(&BOS_CLOSES, 100.0);
        let analysis = analyze_structure(&candles, &settings(2));
        let confirmed: Vec<(usize, usize)> = analysis
            .swings
            .iter()
            .map(|s| (s.pivot.index, s.confirmed_at_index))
            .collect();
        assert_eq!(confirmed, vec![(5, 8), (9, 12)]);
        assert_eq!(analysis.state.trend, Trend::Up);
        assert_eq!(analysis.state.last_valid_low.map(|s| s.pivot.index), Some(9));
        assert_eq!(analysis.state.last_valid_high.map(|s| s.pivot.index), Some(5));
    }

    #[test]
    fn test_live_override_flips_trend() {
        // L7 is confirmed at 11 (up), then the last close drops through its low
        let closes = [10.0, 11.0, 12.0, 14.0, 12.0, 11.0, 9.0, 8.0, 9.0, 10.0, 13.0, 15.0, 16.0, 7.0];
        let candles = candles_from_closes(&closes, 1.0);
        let analysis = analyze_structure(&candles, &settings(2));
        assert_eq!(analysis.swings.len(), 1);
        assert_eq!(analysis.swings[0].confirmed_at_index, 11);
        assert_eq!(analysis.state.trend, Trend::Down);

        let no_drop = classify_trend(&analysis.swings, Some(12.0));
        assert_eq!(no_drop.trend, Trend::Up);
        assert_eq!(classify_trend(&[], Some(1.0)).trend, Trend::Neutral);
    }

    #[test]
    fn test_bos_fires_when_held_with_volume() {
        let candles = candles_from_closes(&BOS_CLOSES, 100.0);
        let analysis = analyze_structure(&candles, &settings(2));
        let bos = analysis.bos.expect("bullish break should fire");
        assert_eq!(bos.direction, Direction::Up);
        assert_eq!(bos.level, 12.5);
        assert_eq!(bos.trigger_index, 12);
    }

    #[test]
    fn test_bos_uses_latest_run_after_failed_break() {
        // Breaks 12.5 at 12, falls back at 13, breaks again at 14 and holds
        let closes = [
            10.0, 9.0, 8.0, 9.0, 10.0, 12.0, 11.0, 10.0, 7.0, 6.5, 8.0, 10.0, 13.0, 12.0, 13.0, 13.5, 14.0,
        ];
        let candles = candles_from_closes(&closes, 100.0);
        let analysis = analyze_structure(&candles, &settings(2));
        let bos = analysis.bos.expect("second break holds");
        assert_eq!(bos.direction, Direction::Up);
        assert_eq!(bos.level, 12.5);
        assert_eq!(bos.trigger_index, 14);

        // Same shape one bar short: the second break has not held yet
        let analysis = analyze_structure(&candles[..16], &settings(2));
        assert!(analysis.bos.is_none());
    }

    #[test]
    fn test_bos_requires_hold_bars() {
        let candles = candles_from_closes(&BOS_CLOSES[..14], 100.0);
        let analysis = analyze_structure(&candles, &settings(2));
        assert!(analysis.bos.is_none(), "Only one close after the trigger");
    }

    #[test]
    fn test_bos_requires_volume() {
        let mut candles = candles_from_closes(&BOS_CLOSES, 100.0);
        candles[12].volume = Some(80.0);
        let analysis = analyze_structure(&candles, &settings(2));
        assert!(analysis.bos.is_none(), "80 < 0.9 * 100");

        candles[12].volume = None;
        let analysis = analyze_structure(&candles, &settings(2));
        assert!(analysis.bos.is_none(), "Missing volume must fail");

        candles[12].volume = Some(90.0);
        let analysis = analyze_structure(&candles, &settings(2));
        assert!(analysis.bos.is_some(), "Exactly 90% passes");
    }

    #[test]
    fn test_bos_disabled() {
        let candles = candles_from_closes(&BOS_CLOSES, 100.0);
        let s = StructureSettings {
            bos_enabled: false,
            ..settings(2)
        };
        assert!(analyze_structure(&candles, &s).bos.is_none());
    }
}
