use itertools::Itertools;

use super::candle::Candle;

/// Ordered, de-duplicated candles for one timeframe.
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Sort by `open_time` (stable), keep the first candle of each timestamp,
    /// then keep only the most recent `max_bars` (0 means unlimited).
    pub fn from_candles(candles: Vec<Candle>, max_bars: usize) -> Self {
        let mut candles: Vec<Candle> = candles
            .into_iter()
            .filter(Candle::is_well_formed)
            .sorted_by_key(|c| c.open_time)
            .dedup_by(|a, b| a.open_time == b.open_time)
            .collect();

        if max_bars > 0 && candles.len() > max_bars {
            candles.drain(..candles.len() - max_bars);
        }
        Self { candles }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.last().map(|c| c.close)
    }

    pub fn opens(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<Option<f64>> {
        self.candles.iter().map(|c| c.volume).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(t: i64, close: f64) -> Candle {
        Candle::new(t, close, close + 1.0, close - 1.0, close, Some(1.0))
    }

    #[test]
    fn test_sort_dedup_keeps_first() {
        let series = CandleSeries::from_candles(vec![bar(3, 30.0), bar(1, 10.0), bar(3, 99.0), bar(2, 20.0)], 0);
        let times: Vec<i64> = series.candles().iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![1, 2, 3]);
        assert_eq!(series.last_close(), Some(30.0), "First occurrence of t=3 should win");
    }

    #[test]
    fn test_truncates_to_most_recent() {
        let series = CandleSeries::from_candles((0..10).map(|t| bar(t, t as f64)).collect(), 4);
        assert_eq!(series.len(), 4);
        assert_eq!(series.candles()[0].open_time, 6);
        assert_eq!(series.closes(), vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_drops_malformed_rows() {
        let bad = Candle::new(5, 1.0, 0.5, 2.0, 1.0, None);
        let series = CandleSeries::from_candles(vec![bar(1, 1.0), bad], 0);
        assert_eq!(series.len(), 1);
    }
}
