//! Core domain types for lexiscope
//!
//! Two append-only event logs feed every chart:
//!
//! | Type | Table | Row |
//! |------|-------|-----|
//! | [`WordEvent`] | `Word` | one typed word, with its position in the message |
//! | [`MessageEvent`] | `Message` | one sent message, with its size and timing |
//!
//! Both tables are partitioned by the user id. `lang`, `lemma` and `stem` on
//! `Word` are materialized by the store from `text` and are never written by
//! clients.
//!
//! Charts answer with a [`ChartResult`]: a server-wide series, an optional
//! series scoped to one user, and the summed execution time of every query
//! issued for the request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================
// Identifiers
// ============================================

/// Opaque user identifier (stored as `FixedString(64)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Width of the `userId` columns.
    pub const WIDTH: usize = 64;

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================
// Word events
// ============================================

/// Where a word sits inside its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    First,
    Begin,
    Center,
    End,
    Last,
}

/// Length class of the message a word came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLength {
    Single,
    Short,
    Medium,
    Long,
}

/// One typed word (row of the `Word` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordEvent {
    #[serde(with = "datetime64")]
    pub date_time: DateTime<Utc>,
    pub text: String,
    pub user_id: UserId,
    pub position: Position,
    pub message_length: MessageLength,
    #[serde(default)]
    pub debug: String,
}

// ============================================
// Message events
// ============================================

/// One sent message (row of the `Message` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "dateTime", with = "datetime64")]
    pub date_time: DateTime<Utc>,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "chatId")]
    pub chat_id: String,
    /// Group conversation rather than a direct dialog
    #[serde(rename = "isChat", with = "bool_as_u8")]
    pub is_chat: bool,
    #[serde(rename = "words")]
    pub word_count: i16,
    #[serde(rename = "symbols")]
    pub symbol_count: i16,
    /// Seconds since this user's previous sent message
    #[serde(rename = "timeFromLastSend")]
    pub time_since_last_send: i32,
    /// Seconds since the last message received in this chat
    #[serde(rename = "timeFromLastReceive")]
    pub time_since_last_receive: i32,
}

// ============================================
// Chart results
// ============================================

/// One (x, y) point of a chart series.
///
/// `x` is whatever the chart buckets by (a timestamp string, an integer
/// percentile, a word). `bucket` is only set by charts that emit one curve
/// per time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: serde_json::Value,
    #[serde(deserialize_with = "number")]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<serde_json::Value>,
}

impl Point {
    pub fn new(x: impl Into<serde_json::Value>, y: f64) -> Self {
        Self {
            x: x.into(),
            y,
            bucket: None,
        }
    }
}

/// Chart answer: server-wide series, optional user series, total query time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResult {
    pub server_series: Vec<Point>,
    pub user_series: Option<Vec<Point>>,
    /// Sum of store-reported elapsed time over all sub-queries
    pub elapsed_ms: f64,
}

/// Deserialize a numeric cell the store may send as a number, a quoted
/// number, or null (NaN and infinities).
pub(crate) fn number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cell {
        Number(f64),
        Text(String),
        Null(()),
    }

    match Cell::deserialize(deserializer)? {
        Cell::Number(n) => Ok(n),
        Cell::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Cell::Null(()) => Ok(f64::NAN),
    }
}

/// `DateTime64` text format used by the store's JSON formats.
pub mod datetime64 {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    /// Accepts the store format as well as RFC 3339.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

mod bool_as_u8 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Bool(bool),
            Int(u8),
        }

        Ok(match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => b,
            Flag::Int(n) => n != 0,
        })
    }
}
