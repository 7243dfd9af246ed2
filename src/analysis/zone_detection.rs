//! Supply/demand zones from consolidation-then-impulse patterns.
//!
//! Zones are rebuilt from the whole series on every call; nothing is carried
//! between calls.

use crate::config::ZoneSettings;
use crate::domain::{Candle, CandleType};
use crate::models::{Zone, ZoneKind};

/// Scan for impulse candles preceded by a tight base.
///
/// * impulse: body of candle `i` > `impulse_multiplier * atr[i - 1]`
/// * base: each of the `consolidation_bars` candles before `i` has a range
///   <= `consolidation_multiplier * atr[i - 1]`
///
/// The zone spans the high/low of candle `i - 1`. Candidates without a prior
/// ATR are skipped.
pub fn detect_zones(candles: &[Candle], atr: &[Option<f64>], settings: &ZoneSettings) -> Vec<Zone> {
    let n = candles.len().min(atr.len());
    let first = settings.consolidation_bars.max(1);
    let mut zones = Vec::new();

    for i in first..n {
        let Some(prior_atr) = atr[i - 1].filter(|a| *a > 0.0) else {
            continue;
        };
        let impulse = &candles[i];
        if impulse.body() <= settings.impulse_multiplier * prior_atr {
            continue;
        }
        let base_is_tight = candles[i - settings.consolidation_bars..i]
            .iter()
            .all(|c| c.range() <= settings.consolidation_multiplier * prior_atr);
        if !base_is_tight {
            continue;
        }

        let kind = match impulse.get_type() {
            CandleType::Bullish => ZoneKind::Demand,
            CandleType::Bearish => ZoneKind::Supply,
        };
        let base = &candles[i - 1];
        let mut zone = Zone::new(base.low, base.high, i, kind);

        if let Some(j) = (i + 1..candles.len()).find(|&j| zone.is_broken_by(candles[j].close)) {
            zone.invalidate(j);
        }
        zones.push(zone);
    }
    zones
}
