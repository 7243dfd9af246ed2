//! Candle ingestion.
//!
//! Timeframe fields arrive in whatever shape the caller had to hand: JSON text,
//! one flat numeric array, arrays of rows, arrays of keyed objects, or a vendor
//! wrapper around any of those. The payload is first classified into a
//! `RawCandlePayload` and then normalised by a single match. Anything that
//! cannot be understood becomes an empty series.

use std::fmt;

use serde_json::{Map, Value};

use crate::config::DEBUG_FLAGS;
use crate::domain::{Candle, CandleSeries};
use crate::utils::time_utils::normalize_epoch_ms;

/// Wrappers nested deeper than this are ignored.
const MAX_WRAP_DEPTH: usize = 4;
/// Fields per candle in a flat numeric array: t, o, h, l, c, v
const FLAT_STRIDE: usize = 6;
/// Minimum fields in a flat row: t, o, h, l, c
const MIN_ROW_FIELDS: usize = 5;

const WRAPPER_KEYS: [&str; 3] = ["data", "body", "values"];
const TIME_KEYS: [&str; 6] = ["open_time", "openTime", "t", "time", "timestamp", "ts"];
const OPEN_KEYS: [&str; 3] = ["open", "o", "price"];
const HIGH_KEYS: [&str; 2] = ["high", "h"];
const LOW_KEYS: [&str; 2] = ["low", "l"];
const CLOSE_KEYS: [&str; 2] = ["close", "c"];
const VOLUME_KEYS: [&str; 3] = ["volume", "v", "vol"];

/// One candle row in either of the supported encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCandleRow {
    /// `[t, o, h, l, c, v?, ...]`
    Flat(Vec<Value>),
    /// `{ "t": .., "o": .., ... }` with key aliases
    Keyed(Map<String, Value>),
}

/// Every payload shape the ingestion layer understands.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCandlePayload {
    /// JSON text that has to be parsed and classified again.
    Encoded(String),
    /// A single flat array of numbers, `FLAT_STRIDE` per candle.
    FlatNumeric(Vec<f64>),
    Rows(Vec<RawCandleRow>),
    /// Object exposing `data`, `body` or `values`.
    Wrapped(Value),
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowRejection {
    TooFewFields(usize),
    MissingField(&'static str),
    InvertedRange { high: f64, low: f64 },
}

impl std::error::Error for RowRejection {}
impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RowRejection::TooFewFields(n) => {
                write!(f, "row has {} fields, need at least {}", n, MIN_ROW_FIELDS)
            }
            RowRejection::MissingField(name) => write!(f, "row has no usable `{}`", name),
            RowRejection::InvertedRange { high, low } => {
                write!(f, "row high {} is below low {}", high, low)
            }
        }
    }
}

fn as_price(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|p| p.is_finite())
}

fn as_time(value: &Value) -> Option<i64> {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }?;
    Some(normalize_epoch_ms(raw))
}

fn lookup<'a>(map: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|key| map.get(*key))
}

fn build_candle(
    time: Option<i64>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
) -> Result<Candle, RowRejection> {
    let time = time.ok_or(RowRejection::MissingField("time"))?;
    let open = open.ok_or(RowRejection::MissingField("open"))?;
    let high = high.ok_or(RowRejection::MissingField("high"))?;
    let low = low.ok_or(RowRejection::MissingField("low"))?;
    let close = close.ok_or(RowRejection::MissingField("close"))?;
    if high < low {
        return Err(RowRejection::InvertedRange { high, low });
    }
    Ok(Candle::new(time, open, high, low, close, volume))
}

impl TryFrom<&RawCandleRow> for Candle {
    type Error = RowRejection;

    fn try_from(row: &RawCandleRow) -> Result<Self, Self::Error> {
        match row {
            RawCandleRow::Flat(fields) => {
                if fields.len() < MIN_ROW_FIELDS {
                    return Err(RowRejection::TooFewFields(fields.len()));
                }
                build_candle(
                    as_time(&fields[0]),
                    as_price(&fields[1]),
                    as_price(&fields[2]),
                    as_price(&fields[3]),
                    as_price(&fields[4]),
                    fields.get(5).and_then(as_price),
                )
            }
            RawCandleRow::Keyed(map) => build_candle(
                lookup(map, &TIME_KEYS).and_then(as_time),
                lookup(map, &OPEN_KEYS).and_then(as_price),
                lookup(map, &HIGH_KEYS).and_then(as_price),
                lookup(map, &LOW_KEYS).and_then(as_price),
                lookup(map, &CLOSE_KEYS).and_then(as_price),
                lookup(map, &VOLUME_KEYS).and_then(as_price),
            ),
        }
    }
}

fn is_scalar_number(value: &Value) -> bool {
    as_price(value).is_some()
}

impl From<&Value> for RawCandlePayload {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(text) => RawCandlePayload::Encoded(text.clone()),
            Value::Array(items) if !items.is_empty() && items.iter().all(is_scalar_number) => {
                RawCandlePayload::FlatNumeric(items.iter().filter_map(as_price).collect())
            }
            Value::Array(items) => RawCandlePayload::Rows(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Array(fields) => Some(RawCandleRow::Flat(fields.clone())),
                        Value::Object(map) => Some(RawCandleRow::Keyed(map.clone())),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::Object(map) => {
                if let Some(inner) = lookup(map, &WRAPPER_KEYS) {
                    RawCandlePayload::Wrapped(inner.clone())
                } else if lookup(map, &CLOSE_KEYS).is_some() {
                    // A lone candle object
                    RawCandlePayload::Rows(vec![RawCandleRow::Keyed(map.clone())])
                } else {
                    RawCandlePayload::Unrecognized
                }
            }
            _ => RawCandlePayload::Unrecognized,
        }
    }
}

impl RawCandlePayload {
    /// Turn the payload into candles. Rows that cannot be read are dropped.
    fn into_candles(self, depth: usize) -> Vec<Candle> {
        match self {
            RawCandlePayload::Encoded(text) => {
                let text = text.trim();
                if text.is_empty() || depth >= MAX_WRAP_DEPTH {
                    return Vec::new();
                }
                match serde_json::from_str::<Value>(text) {
                    Ok(inner) => RawCandlePayload::from(&inner).into_candles(depth + 1),
                    Err(e) => {
                        log::warn!("Ignoring candle payload that is not valid JSON: {}", e);
                        Vec::new()
                    }
                }
            }
            RawCandlePayload::FlatNumeric(values) => values
                .chunks_exact(FLAT_STRIDE)
                .filter_map(|chunk| {
                    build_candle(
                        normalize_time(chunk[0]),
                        Some(chunk[1]),
                        Some(chunk[2]),
                        Some(chunk[3]),
                        Some(chunk[4]),
                        Some(chunk[5]),
                    )
                    .ok()
                })
                .collect(),
            RawCandlePayload::Rows(rows) => {
                let mut rejected = 0usize;
                let candles: Vec<Candle> = rows
                    .iter()
                    .filter_map(|row| match Candle::try_from(row) {
                        Ok(candle) => Some(candle),
                        Err(reason) => {
                            rejected += 1;
                            if DEBUG_FLAGS.print_ingestion_drops {
                                log::info!("   dropped row: {}", reason);
                            }
                            None
                        }
                    })
                    .collect();
                if rejected > 0 && DEBUG_FLAGS.print_ingestion_drops {
                    log::info!("Ingestion dropped {} of {} rows", rejected, rows.len());
                }
                candles
            }
            RawCandlePayload::Wrapped(inner) => {
                if depth >= MAX_WRAP_DEPTH {
                    return Vec::new();
                }
                RawCandlePayload::from(&inner).into_candles(depth + 1)
            }
            RawCandlePayload::Unrecognized => Vec::new(),
        }
    }
}

fn normalize_time(raw: f64) -> Option<i64> {
    (raw.is_finite() && raw.fract() == 0.0).then(|| normalize_epoch_ms(raw as i64))
}

/// Normalise one timeframe field into a series. Absent, null or unusable
/// payloads give an empty series.
pub fn normalize(value: Option<&Value>, max_bars: usize) -> CandleSeries {
    let Some(value) = value else {
        return CandleSeries::empty();
    };
    let candles = RawCandlePayload::from(value).into_candles(0);
    CandleSeries::from_candles(candles, max_bars)
}
