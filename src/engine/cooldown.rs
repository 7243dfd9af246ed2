//! Per symbol and direction signal suppression.
//!
//! The store and the clock are both injected so callers can share state
//! between engines (or back it with something other than memory) and tests
//! can move time by hand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{CooldownSettings, DEBUG_FLAGS};
use crate::error::{Result, SignalError};
use crate::models::Direction;
use crate::utils::TimeUtils;
use crate::utils::time_utils::{epoch_ms_to_utc, utc_now_as_timestamp_ms};

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        utc_now_as_timestamp_ms()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Last-fired timestamps keyed by `SYMBOL:DIRECTION`.
pub trait CooldownStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<i64>>;

    fn set(&self, key: &str, fired_at_ms: i64) -> Result<()>;

    /// Atomically admit `key` at `now_ms` unless it fired less than
    /// `window_ms` ago. Admission records `now_ms`.
    fn check_and_set(&self, key: &str, now_ms: i64, window_ms: i64) -> Result<bool>;
}

#[derive(Debug, Default)]
pub struct InMemoryCooldownStore {
    last_fired: Mutex<HashMap<String, i64>>,
}

impl InMemoryCooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, i64>>> {
        self.last_fired
            .lock()
            .map_err(|_| SignalError::internal("cooldown store lock poisoned"))
    }
}

impl CooldownStore for InMemoryCooldownStore {
    fn get(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.lock()?.get(key).copied())
    }

    fn set(&self, key: &str, fired_at_ms: i64) -> Result<()> {
        self.lock()?.insert(key.to_string(), fired_at_ms);
        Ok(())
    }

    fn check_and_set(&self, key: &str, now_ms: i64, window_ms: i64) -> Result<bool> {
        let mut map = self.lock()?;
        if let Some(&last) = map.get(key) {
            if now_ms.saturating_sub(last) < window_ms {
                return Ok(false);
            }
        }
        map.insert(key.to_string(), now_ms);
        Ok(true)
    }
}

pub fn cooldown_key(symbol: &str, direction: Direction) -> String {
    format!("{}:{}", symbol.to_uppercase(), direction)
}

#[derive(Clone)]
pub struct CooldownGate {
    store: Arc<dyn CooldownStore>,
    clock: Arc<dyn Clock>,
    window_ms: i64,
}

impl CooldownGate {
    pub fn new(store: Arc<dyn CooldownStore>, clock: Arc<dyn Clock>, window_ms: i64) -> Self {
        Self {
            store,
            clock,
            window_ms,
        }
    }

    /// In-memory store on the system clock.
    pub fn from_settings(settings: &CooldownSettings) -> Self {
        Self::new(
            Arc::new(InMemoryCooldownStore::new()),
            Arc::new(SystemClock),
            settings.window_ms,
        )
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// True when the signal may fire; records it if so.
    pub fn admit(&self, symbol: &str, direction: Direction) -> Result<bool> {
        let key = cooldown_key(symbol, direction);
        let now = self.clock.now_ms();
        let admitted = self.store.check_and_set(&key, now, self.window_ms)?;

        if DEBUG_FLAGS.print_cooldown_events && DEBUG_FLAGS.for_symbol(symbol) {
            if admitted {
                log::info!(
                    "Cooldown: {} admitted at {} (window {})",
                    key,
                    epoch_ms_to_utc(now),
                    TimeUtils::window_to_string(self.window_ms)
                );
            } else {
                let last = self.store.get(&key)?.unwrap_or(now);
                log::info!(
                    "Cooldown: {} suppressed, last fired {} ({} left)",
                    key,
                    epoch_ms_to_utc(last),
                    TimeUtils::window_to_string(self.window_ms - (now - last))
                );
            }
        }
        Ok(admitted)
    }
}

impl std::fmt::Debug for CooldownGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownGate")
            .field("window_ms", &self.window_ms)
            .finish_non_exhaustive()
    }
}
