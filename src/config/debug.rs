//! Debugging feature flags.
//!
//! Toggle individual diagnostics here; keep them `false` by default so the
//! binary stays quiet unless someone is chasing a specific problem.

pub struct DebugFlags {
    /// Emit the per-timeframe score breakdown after each analysis.
    pub print_timeframe_scores: bool,
    /// Emit each gate the decision engine passes or fails.
    pub print_decision_trace: bool,
    /// Emit entry/stop/target candidates before quantization.
    pub print_risk_plan: bool,
    /// Emit counts of rows dropped during candle ingestion.
    pub print_ingestion_drops: bool,
    /// Emit cooldown admissions and suppressions.
    pub print_cooldown_events: bool,
    /// If non-empty, restrict the verbose output above to this symbol.
    /// Example: "BTCUSDT". Use "" to disable the filter.
    pub only_symbol: &'static str,
}

impl DebugFlags {
    pub fn for_symbol(&self, symbol: &str) -> bool {
        self.only_symbol.is_empty() || self.only_symbol.eq_ignore_ascii_case(symbol)
    }
}

pub const DEBUG_FLAGS: DebugFlags = DebugFlags {
    print_timeframe_scores: false,
    print_decision_trace: false,
    print_risk_plan: false,
    print_ingestion_drops: false,
    print_cooldown_events: false,
    only_symbol: "",
};
