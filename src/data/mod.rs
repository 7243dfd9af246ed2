// Candle ingestion: raw request payloads to normalised series
pub mod ingestion;

// Re-export commonly used types
pub use ingestion::{RawCandlePayload, RawCandleRow, normalize};
