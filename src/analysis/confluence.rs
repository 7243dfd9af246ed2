//! Cross-timeframe confluence.

use serde::{Deserialize, Serialize};

use crate::config::{ScoreSettings, TimeframeWeights};
use crate::models::{Direction, SignalLabel, TimeframeSnapshot, Trend};

/// Accumulated timeframe weight per label.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelTallies {
    pub strong_buy: f64,
    pub buy: f64,
    pub hold: f64,
    pub sell: f64,
    pub strong_sell: f64,
}

impl LabelTallies {
    fn add(&mut self, label: SignalLabel, weight: f64) {
        let slot = match label {
            SignalLabel::StrongBuy => &mut self.strong_buy,
            SignalLabel::Buy => &mut self.buy,
            SignalLabel::Hold => &mut self.hold,
            SignalLabel::Sell => &mut self.sell,
            SignalLabel::StrongSell => &mut self.strong_sell,
        };
        *slot += weight;
    }

    pub fn buy_weight(&self) -> f64 {
        self.strong_buy + self.buy
    }

    pub fn sell_weight(&self) -> f64 {
        self.strong_sell + self.sell
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceSummary {
    pub direction: Option<Direction>,
    pub label: SignalLabel,
    pub weighted_score: f64,
    pub tallies: LabelTallies,
    pub dominant_trend: Trend,
    /// Ready frames whose structure trend matches the dominant trend,
    /// so anywhere in `0..=frames`.
    pub confluence_count: usize,
    pub frames: usize,
}

impl Default for ConfluenceSummary {
    fn default() -> Self {
        Self {
            direction: None,
            label: SignalLabel::Hold,
            weighted_score: 0.0,
            tallies: LabelTallies::default(),
            dominant_trend: Trend::Neutral,
            confluence_count: 0,
            frames: 0,
        }
    }
}

/// Combine ready snapshots using per-timeframe weights.
/// Equal buy and sell weight resolves to HOLD.
pub fn score_confluence(
    snapshots: &[&TimeframeSnapshot],
    weights: &TimeframeWeights,
    scoring: &ScoreSettings,
) -> ConfluenceSummary {
    let ready: Vec<(&TimeframeSnapshot, f64)> = snapshots
        .iter()
        .filter(|s| s.ready)
        .map(|s| (*s, weights.weight(s.timeframe)))
        .collect();
    if ready.is_empty() {
        return ConfluenceSummary::default();
    }

    let mut tallies = LabelTallies::default();
    let (mut weighted_sum, mut total_weight) = (0.0, 0.0);
    let (mut up_weight, mut down_weight) = (0.0, 0.0);
    for (snap, w) in &ready {
        tallies.add(snap.signal, *w);
        weighted_sum += snap.score * w;
        total_weight += w;
        match snap.structure.trend {
            Trend::Up => up_weight += w,
            Trend::Down => down_weight += w,
            Trend::Neutral => {}
        }
    }
    let weighted_score = if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    };

    let direction = if tallies.buy_weight() > tallies.sell_weight() {
        Some(Direction::Up)
    } else if tallies.sell_weight() > tallies.buy_weight() {
        Some(Direction::Down)
    } else {
        None
    };
    let label = match direction {
        Some(d) => SignalLabel::for_direction(d, weighted_score * d.sign() >= scoring.strong_threshold),
        None => SignalLabel::Hold,
    };

    let dominant_trend = if up_weight > down_weight {
        Trend::Up
    } else if down_weight > up_weight {
        Trend::Down
    } else {
        Trend::Neutral
    };
    let confluence_count = if dominant_trend == Trend::Neutral {
        0
    } else {
        ready.iter().filter(|(s, _)| s.structure.trend == dominant_trend).count()
    };

    ConfluenceSummary {
        direction,
        label,
        weighted_score,
        tallies,
        dominant_trend,
        confluence_count,
        frames: ready.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SCALP, SWING};
    use crate::domain::Timeframe;

    fn snap(tf: Timeframe, score: f64, trend: Trend) -> TimeframeSnapshot {
        let mut s = TimeframeSnapshot::neutral(tf, 100);
        s.ready = true;
        s.score = score;
        s.signal = SignalLabel::from_score(score, 26.0, 10.0);
        s.structure.trend = trend;
        s
    }

    #[test]
    fn test_equal_weight_tie_is_hold() {
        let even = TimeframeWeights { m15: 1.0, h1: 1.0, h4: 1.0, d1: 1.0 };
        let a = snap(Timeframe::M15, 20.0, Trend::Up);
        let b = snap(Timeframe::H1, -20.0, Trend::Down);
        let summary = score_confluence(&[&a, &b], &even, &SWING.scoring);
        assert_eq!(summary.direction, None);
        assert_eq!(summary.label, SignalLabel::Hold);
        assert_eq!(summary.dominant_trend, Trend::Neutral);
        assert_eq!(summary.confluence_count, 0);
    }

    #[test]
    fn test_scalp_weights_let_intraday_win() {
        // 15m buy (3.0) outweighs 1h + 4h + 1d sells (2.2)
        let frames = [
            snap(Timeframe::M15, 30.0, Trend::Up),
            snap(Timeframe::H1, -12.0, Trend::Down),
            snap(Timeframe::H4, -12.0, Trend::Up),
            snap(Timeframe::D1, -12.0, Trend::Up),
        ];
        let refs: Vec<&TimeframeSnapshot> = frames.iter().collect();
        let summary = score_confluence(&refs, &SCALP.weights, &SCALP.scoring);
        assert_eq!(summary.direction, Some(Direction::Up));
        assert_eq!(summary.label, SignalLabel::Buy, "Weighted score is below strong");
        assert_eq!(summary.tallies.strong_buy, 3.0);
        assert!((summary.tallies.sell_weight() - 2.2).abs() < 1e-12);
        assert_eq!(summary.dominant_trend, Trend::Up);
        assert_eq!(summary.confluence_count, 3);
        assert_eq!(summary.frames, 4);
    }

    #[test]
    fn test_strong_needs_score_on_the_winning_side() {
        // Buy weight wins on the 15m alone while the mean is deeply negative
        let frames = [
            snap(Timeframe::M15, 12.0, Trend::Up),
            snap(Timeframe::H1, -100.0, Trend::Down),
            snap(Timeframe::H4, -100.0, Trend::Down),
        ];
        let refs: Vec<&TimeframeSnapshot> = frames.iter().collect();
        let summary = score_confluence(&refs, &SCALP.weights, &SCALP.scoring);
        assert_eq!(summary.direction, Some(Direction::Up));
        assert!(summary.weighted_score <= -SCALP.scoring.strong_threshold);
        assert_eq!(summary.label, SignalLabel::Buy);
    }

    #[test]
    fn test_not_ready_frames_are_ignored() {
        let ready = snap(Timeframe::H4, -40.0, Trend::Down);
        let idle = TimeframeSnapshot::neutral(Timeframe::H1, 3);
        let summary = score_confluence(&[&ready, &idle], &SWING.weights, &SWING.scoring);
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.label, SignalLabel::StrongSell);
        assert_eq!(summary.confluence_count, 1);

        let empty = score_confluence(&[&idle], &SWING.weights, &SWING.scoring);
        assert_eq!(empty, ConfluenceSummary::default());
    }
}
