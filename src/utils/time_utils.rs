use chrono::{DateTime, Utc};

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_15_MIN: i64 = Self::MS_IN_MIN * 15;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_4_H: i64 = Self::MS_IN_H * 4;
    pub const MS_IN_6_H: i64 = Self::MS_IN_H * 6;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

    /// Binance-style shorthand for the interval lengths the engine analyses.
    pub fn interval_to_string(interval_ms: i64) -> &'static str {
        match interval_ms {
            Self::MS_IN_15_MIN => "15m",
            Self::MS_IN_H => "1h",
            Self::MS_IN_4_H => "4h",
            Self::MS_IN_D => "1d",
            _ => "unknown",
        }
    }

    /// Human readable cooldown window, e.g. `6h` or `90m`.
    pub fn window_to_string(window_ms: i64) -> String {
        if window_ms > 0 && window_ms % Self::MS_IN_H == 0 {
            format!("{}h", window_ms / Self::MS_IN_H)
        } else {
            format!("{}m", window_ms / Self::MS_IN_MIN)
        }
    }
}

/// Candle open times arrive either in seconds or milliseconds. Anything below
/// this is treated as seconds.
const SECONDS_EPOCH_CEILING: i64 = 100_000_000_000;

pub fn normalize_epoch_ms(raw: i64) -> i64 {
    if raw.abs() < SECONDS_EPOCH_CEILING {
        raw * TimeUtils::MS_IN_S
    } else {
        raw
    }
}

pub fn epoch_ms_to_utc(epoch_ms: i64) -> String {
    // Used for log lines only
    match DateTime::from_timestamp_millis(epoch_ms) {
        Some(dt) => dt.format(TimeUtils::LOG_TIME_FORMAT).to_string(),
        None => String::from("invalid-time"),
    }
}

pub fn utc_now_as_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
