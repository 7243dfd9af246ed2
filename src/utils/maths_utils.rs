use argminmax::ArgMinMax;
use statrs::statistics::Statistics;

/// Slack used when snapping a price onto the tick grid so that values already
/// on the grid (modulo float noise) are not pushed a whole tick away.
const TICK_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickRounding {
    Nearest,
    Up,
    Down,
}

pub fn get_max(vec: &[f64]) -> Option<f64> {
    if vec.is_empty() {
        return None;
    }
    let max_index: usize = vec.argmax();
    Some(vec[max_index])
}

pub fn get_min(vec: &[f64]) -> Option<f64> {
    if vec.is_empty() {
        return None;
    }
    let min_index: usize = vec.argmin();
    Some(vec[min_index])
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(vec: &[f64]) -> Option<f64> {
    if vec.is_empty() {
        return None;
    }
    let m = vec.iter().mean();
    m.is_finite().then_some(m)
}

/// Drop non-finite values so they read as "unavailable" downstream.
#[inline]
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Round a positive magnitude to the nearest power of ten (0.0034 -> 0.001, 0.07 -> 0.1).
pub fn nearest_power_of_ten(value: f64) -> Option<f64> {
    if !(value.is_finite() && value > 0.0) {
        return None;
    }
    Some(10f64.powi(value.log10().round() as i32))
}

/// Number of decimals a tick implies (0.01 -> 2, 1.0 -> 0).
fn tick_decimals(tick: f64) -> i32 {
    (-tick.log10().round()).max(0.0) as i32
}

/// Snap `value` onto the `tick` grid.
pub fn round_to_tick(value: f64, tick: f64, mode: TickRounding) -> f64 {
    if !(tick.is_finite() && tick > 0.0) || !value.is_finite() {
        return value;
    }
    let ratio = value / tick;
    let steps = match mode {
        TickRounding::Nearest => ratio.round(),
        TickRounding::Up => (ratio - TICK_EPSILON).ceil(),
        TickRounding::Down => (ratio + TICK_EPSILON).floor(),
    };
    // Strip representation noise (100.70000000000002 -> 100.7)
    let scale = 10f64.powi(tick_decimals(tick));
    (steps * tick * scale).round() / scale
}

/// Mid-rank percentile of `target` within `window`, in [0, 1].
/// Values within a relative epsilon of the target count as ties and contribute half.
pub fn midrank_percentile(window: &[f64], target: f64) -> Option<f64> {
    if window.is_empty() || !target.is_finite() {
        return None;
    }
    let tolerance = 1e-9 * target.abs().max(1.0);
    let (below, equal) = window.iter().fold((0usize, 0usize), |(b, e), &v| {
        if (v - target).abs() <= tolerance {
            (b, e + 1)
        } else if v < target {
            (b + 1, e)
        } else {
            (b, e)
        }
    });
    Some((below as f64 + 0.5 * equal as f64) / window.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_and_mean() {
        let v = [3.0, 9.5, -1.0, 4.0];
        assert_eq!(get_max(&v), Some(9.5));
        assert_eq!(get_min(&v), Some(-1.0));
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(get_max(&[]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_nearest_power_of_ten() {
        assert_eq!(nearest_power_of_ten(0.03), Some(0.01));
        assert_eq!(nearest_power_of_ten(0.07), Some(0.1));
        assert_eq!(nearest_power_of_ten(5.0), Some(10.0));
        assert_eq!(nearest_power_of_ten(0.0), None);
    }

    #[test]
    fn test_round_to_tick_modes() {
        assert_eq!(round_to_tick(100.704, 0.01, TickRounding::Nearest), 100.7);
        assert_eq!(round_to_tick(100.701, 0.01, TickRounding::Up), 100.71);
        assert_eq!(round_to_tick(100.709, 0.01, TickRounding::Down), 100.7);
        // Already on grid stays put in every mode
        assert_eq!(round_to_tick(100.7, 0.01, TickRounding::Up), 100.7);
        assert_eq!(round_to_tick(100.7, 0.01, TickRounding::Down), 100.7);
        assert_eq!(round_to_tick(12.3, 0.0, TickRounding::Up), 12.3);
    }

    #[test]
    fn test_midrank_percentile() {
        let window = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(midrank_percentile(&window, 4.0), Some(0.875));
        assert_eq!(midrank_percentile(&window, 1.0), Some(0.125));
        // Flat window sits in the middle
        assert_eq!(midrank_percentile(&[0.5; 10], 0.5), Some(0.5));
        assert_eq!(midrank_percentile(&[], 1.0), None);
    }
}
