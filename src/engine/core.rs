use rayon::prelude::*;
use strum::IntoEnumIterator;

use crate::analysis::{Decision, TimeframeAnalysis, analyze_timeframe, decide, score_confluence};
use crate::config::{DEBUG_FLAGS, DecisionStyle, StrategyConfig};
use crate::data::normalize;
use crate::domain::Timeframe;
use crate::error::{Result, SignalError};
use crate::models::{ReasonCode, SignalLabel, TimeframeSnapshot};

use super::cooldown::CooldownGate;
use super::messages::{SignalRequest, SignalResponse};

/// Runs the full pipeline for one request. Holds no per-request state; the
/// optional cooldown gate is the only thing that remembers earlier calls.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    pub config: StrategyConfig,
    cooldown: Option<CooldownGate>,
}

impl SignalEngine {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config, cooldown: None }
    }

    pub fn with_cooldown(mut self, gate: CooldownGate) -> Self {
        self.cooldown = Some(gate);
        self
    }

    /// Ingest and analyse every timeframe. Order of the result is fast to slow.
    pub fn analyze_all(&self, request: &SignalRequest) -> Vec<TimeframeAnalysis> {
        let timeframes: Vec<Timeframe> = Timeframe::iter().collect();
        timeframes
            .par_iter()
            .map(|tf| {
                let series = normalize(request.field(*tf), self.config.max_bars);
                analyze_timeframe(*tf, series, &self.config)
            })
            .collect()
    }

    pub fn evaluate(&self, request: &SignalRequest) -> Result<SignalResponse> {
        let symbol = request.symbol.as_str();
        let frames = self.analyze_all(request);
        let snapshots: Vec<TimeframeSnapshot> = frames.iter().map(|f| f.snapshot.clone()).collect();

        let missing: Vec<Timeframe> = self
            .config
            .required_timeframes()
            .into_iter()
            .filter(|tf| !frames.iter().any(|f| f.snapshot.timeframe == *tf && f.is_ready()))
            .collect();
        if !missing.is_empty() {
            if DEBUG_FLAGS.print_decision_trace && DEBUG_FLAGS.for_symbol(symbol) {
                log::info!("[{}] insufficient data on {:?}", symbol, missing);
            }
            return Ok(SignalResponse::insufficient(symbol, snapshots));
        }

        let snapshot_refs: Vec<&TimeframeSnapshot> = snapshots.iter().collect();
        let confluence = score_confluence(&snapshot_refs, &self.config.weights, &self.config.scoring);
        let mut decision = decide(symbol, &frames, &confluence, &self.config, request.tick_size);

        let reference = match self.config.style {
            DecisionStyle::TrendGated => self.config.gate.trigger,
            DecisionStyle::ZoneGated => self.config.primary,
        };
        let last_price = frames
            .iter()
            .find(|f| f.snapshot.timeframe == reference)
            .and_then(|f| f.snapshot.last_close())
            .ok_or_else(|| SignalError::internal(format!("ready {} frame has no last candle", reference)))?;

        if let (Some(direction), Some(gate)) = (decision.direction, &self.cooldown) {
            if decision.is_actionable() && !gate.admit(symbol, direction)? {
                decision = Decision::hold(ReasonCode::CooldownActive);
            }
        }

        let response = SignalResponse {
            symbol: symbol.to_string(),
            last_price: Some(last_price),
            signal: decision.signal,
            direction: decision.direction,
            confidence: decision.confidence,
            confidence_tier: decision.confidence_tier,
            reason: decision.reason,
            order_plan: decision.plan,
            timeframes: snapshots,
            confluence,
        };
        debug_assert!(response.signal != SignalLabel::Hold || response.reason.is_some());
        Ok(response)
    }
}
