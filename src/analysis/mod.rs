// Analysis algorithms: indicators, structure, zones, scoring and decisions
pub mod confluence;
pub mod decision;
pub mod indicators;
pub mod risk;
pub mod structure;
pub mod timeframe_analysis;
pub mod zone_detection;

// Re-export commonly used types
pub use confluence::{ConfluenceSummary, LabelTallies, score_confluence};
pub use decision::{Decision, decide};
pub use risk::{RiskInputs, build_plan};
pub use structure::{StructureAnalysis, analyze_structure};
pub use timeframe_analysis::{TimeframeAnalysis, analyze_timeframe};
pub use zone_detection::detect_zones;
