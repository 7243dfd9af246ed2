// Domain models for the signal pipeline
// Plain data: every computation lives in `analysis`

pub mod signal;
pub mod snapshot;
pub mod structure;
pub mod trade_plan;
pub mod zone;

// Re-export key types for convenience
pub use signal::{ConfidenceTier, Direction, ReasonCode, SignalLabel};
pub use snapshot::{IndicatorSnapshot, TimeframeSnapshot, VolatilityRegime};
pub use structure::{BreakOfStructure, Pivot, PivotKind, StructureState, Trend, ValidatedSwing};
pub use trade_plan::{EntryBand, TradePlan};
pub use zone::{Zone, ZoneKind};
