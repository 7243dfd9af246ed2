//! Technical indicators.
//!
//! Pure functions over immutable slices. Every output has the same length as
//! the input and holds `None` wherever the value is not yet defined (warm-up)
//! or would not be finite. Running state lives in local variables only.

use serde::{Deserialize, Serialize};

use crate::models::Direction;
use crate::utils::maths_utils::{finite, mean, midrank_percentile};

/// Exponential moving average with `k = 2 / (period + 1)`.
///
/// The first available input seeds the recursion as-is. Indices below
/// `period - 1` are undefined. A missing input yields `None` at that index and
/// the recursion resumes from the last value once data returns.
pub fn ema(series: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; series.len()];
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut prev: Option<f64> = None;

    series
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let x = (*x).and_then(finite)?;
            let next = match prev {
                None => x,
                Some(p) => x * k + p * (1.0 - k),
            };
            prev = Some(next);
            (i + 1 >= period).then_some(next)
        })
        .collect()
}

/// EMA over a fully populated series.
pub fn ema_values(series: &[f64], period: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = series.iter().copied().map(Some).collect();
    ema(&wrapped, period)
}

/// True range. The first bar has no previous close so it is just `high - low`.
pub fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let n = highs.len().min(lows.len()).min(closes.len());
    (0..n)
        .map(|i| {
            let hl = highs[i] - lows[i];
            if i == 0 {
                hl
            } else {
                let prev_close = closes[i - 1];
                hl.max((highs[i] - prev_close).abs())
                    .max((lows[i] - prev_close).abs())
            }
        })
        .collect()
}

/// Wilder ATR, seeded at `period - 1` with the simple mean of the first
/// `period` true ranges.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let tr = true_range(highs, lows, closes);
    let n = tr.len();
    let mut out = vec![None; n];
    if period == 0 || n < period {
        return out;
    }

    let Some(seed) = mean(&tr[..period]) else {
        return out;
    };
    let p = period as f64;
    let mut prev = seed;
    out[period - 1] = finite(seed);

    for i in period..n {
        prev = (prev * (p - 1.0) + tr[i]) / p;
        out[i] = finite(prev);
    }
    out
}

/// Wilder RSI. Defined from index `period` on.
pub fn rsi_wilder(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut out = vec![None; n];
    if period == 0 || n <= period {
        return out;
    }

    let rsi_from = |gain: f64, loss: f64| -> Option<f64> {
        let value = if loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        };
        finite(value).map(|v| v.clamp(0.0, 100.0))
    };

    let p = period as f64;
    let (mut avg_gain, mut avg_loss) = (1..=period).fold((0.0, 0.0), |(g, l), i| {
        let delta = closes[i] - closes[i - 1];
        (g + delta.max(0.0), l + (-delta).max(0.0))
    });
    avg_gain /= p;
    avg_loss /= p;
    out[period] = rsi_from(avg_gain, avg_loss);

    for i in (period + 1)..n {
        let delta = closes[i] - closes[i - 1];
        avg_gain = (avg_gain * (p - 1.0) + delta.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-delta).max(0.0)) / p;
        out[i] = rsi_from(avg_gain, avg_loss);
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdOutput {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// MACD line, signal and histogram.
///
/// The signal EMA is seeded through the line's warm-up as if the line were 0
/// there; its output is only reported where the line itself is defined.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdOutput {
    let fast_ema = ema_values(closes, fast);
    let slow_ema = ema_values(closes, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => finite(f - s),
            _ => None,
        })
        .collect();

    let first_defined = line.iter().position(Option::is_some).unwrap_or(line.len());
    let seeded: Vec<Option<f64>> = line
        .iter()
        .enumerate()
        .map(|(i, v)| if i < first_defined { Some(0.0) } else { *v })
        .collect();

    let signal_line: Vec<Option<f64>> = ema(&seeded, signal)
        .into_iter()
        .zip(line.iter())
        .map(|(s, l)| l.and(s))
        .collect();

    let histogram = line
        .iter()
        .zip(signal_line.iter())
        .map(|(l, s)| match (l, s) {
            (Some(l), Some(s)) => finite(l - s),
            _ => None,
        })
        .collect();

    MacdOutput {
        line,
        signal: signal_line,
        histogram,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuperTrendPoint {
    pub value: f64,
    pub direction: Direction,
    pub upper: f64,
    pub lower: f64,
}

/// SuperTrend, flip-state variant.
///
/// Final upper band only moves down unless the previous close broke above it;
/// final lower band only moves up unless the previous close broke below it.
/// Direction starts Up when the first close is at or above hl2 and flips when
/// price closes through the band on the far side. The reported value is the
/// lower band while Up and the upper band while Down.
pub fn super_trend(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
    multiplier: f64,
) -> Vec<Option<SuperTrendPoint>> {
    let atr_values = atr(highs, lows, closes, period);
    let mut out = vec![None; atr_values.len()];
    let mut state: Option<SuperTrendPoint> = None;

    for (i, atr_i) in atr_values.iter().enumerate() {
        let Some(atr_i) = atr_i else {
            continue;
        };
        let hl2 = (highs[i] + lows[i]) / 2.0;
        let basic_upper = hl2 + multiplier * atr_i;
        let basic_lower = hl2 - multiplier * atr_i;

        let point = match state {
            None => {
                let direction = if closes[i] >= hl2 { Direction::Up } else { Direction::Down };
                SuperTrendPoint {
                    value: 0.0,
                    direction,
                    upper: basic_upper,
                    lower: basic_lower,
                }
            }
            Some(prev) => {
                let prev_close = closes[i - 1];
                let upper = if basic_upper < prev.upper || prev_close > prev.upper {
                    basic_upper
                } else {
                    prev.upper
                };
                let lower = if basic_lower > prev.lower || prev_close < prev.lower {
                    basic_lower
                } else {
                    prev.lower
                };
                let direction = match prev.direction {
                    Direction::Up if closes[i] < lower => Direction::Down,
                    Direction::Down if closes[i] > upper => Direction::Up,
                    held => held,
                };
                SuperTrendPoint {
                    value: 0.0,
                    direction,
                    upper,
                    lower,
                }
            }
        };

        let point = SuperTrendPoint {
            value: match point.direction {
                Direction::Up => point.lower,
                Direction::Down => point.upper,
            },
            ..point
        };
        state = Some(point);
        out[i] = point.value.is_finite().then_some(point);
    }
    out
}

/// Mid-rank percentile of the latest ATR among the trailing `window` defined values.
pub fn atr_percentile(atr_values: &[Option<f64>], window: usize) -> Option<f64> {
    let defined: Vec<f64> = atr_values.iter().filter_map(|v| *v).collect();
    let target = *defined.last()?;
    let start = defined.len().saturating_sub(window.max(1));
    midrank_percentile(&defined[start..], target)
}
