pub mod cooldown;
pub mod core;
pub mod messages;

// Re-export key components
pub use cooldown::{Clock, CooldownGate, CooldownStore, InMemoryCooldownStore, ManualClock, SystemClock};
pub use core::SignalEngine;
pub use messages::{SignalRequest, SignalResponse};
