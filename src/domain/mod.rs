// Domain types and value objects
pub mod candle;
pub mod series;
pub mod timeframe;

// Re-export commonly used types
pub use candle::{Candle, CandleType};
pub use series::CandleSeries;
pub use timeframe::Timeframe;
