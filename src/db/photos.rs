//! Photo record types and the month/day filter.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, SecondsFormat};
use rusqlite::types::{Type, ValueRef};
use rusqlite::Row;
use serde::Serialize;

use super::error::{Result, StoreError};

/// A stored photo: an image reference plus where and when it was taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoRecord {
    pub id: i64,
    pub uri: String,
    pub timestamp: DateTime<FixedOffset>,
    pub latitude: f64,
    pub longitude: f64,
}

impl PhotoRecord {
    /// Build a record from a row selected with `IMAGE_COLUMNS`.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            uri: row.get(1)?,
            timestamp: timestamp_column(row, 2)?,
            latitude: coordinate_column(row, 3)?,
            longitude: coordinate_column(row, 4)?,
        })
    }

    /// Timestamp exactly as it is written to the `timestamp` column.
    pub fn timestamp_text(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

/// A photo that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub uri: String,
    pub timestamp: DateTime<FixedOffset>,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewPhoto {
    pub fn new(
        uri: impl Into<String>,
        timestamp: impl Into<DateTime<FixedOffset>>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self> {
        let photo = Self {
            uri: uri.into(),
            timestamp: timestamp.into(),
            latitude,
            longitude,
        };
        photo.validate()?;
        Ok(photo)
    }

    /// Build a photo from untyped input, as received from a form or the
    /// command line.
    pub fn parse(uri: &str, timestamp: &str, latitude: &str, longitude: &str) -> Result<Self> {
        if timestamp.trim().is_empty() {
            return Err(StoreError::invalid("timestamp is empty"));
        }
        let parsed = parse_timestamp(timestamp)
            .map_err(|e| StoreError::invalid(format!("timestamp {timestamp:?}: {e}")))?;

        Self::new(
            uri,
            parsed,
            parse_coordinate("latitude", latitude)?,
            parse_coordinate("longitude", longitude)?,
        )
    }

    /// Checks run before every insert. Coordinate ranges are left to the
    /// producer.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(StoreError::invalid("uri is empty"));
        }
        // Stored text must stay `YYYY-MM-DD...` to parse back and to match by date.
        if !(0..=9999).contains(&self.timestamp.year()) {
            return Err(StoreError::invalid(format!(
                "timestamp year {} is outside 0000-9999",
                self.timestamp.year()
            )));
        }
        if !self.latitude.is_finite() {
            return Err(StoreError::invalid(format!("latitude {} is not a number", self.latitude)));
        }
        if !self.longitude.is_finite() {
            return Err(StoreError::invalid(format!("longitude {} is not a number", self.longitude)));
        }
        Ok(())
    }

    pub(crate) fn timestamp_text(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

fn parse_coordinate(name: &str, raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| StoreError::invalid(format!("{name} {raw:?} is not a number")))?;
    if !value.is_finite() {
        return Err(StoreError::invalid(format!("{name} {raw:?} is not a number")));
    }
    Ok(value)
}

/// Render a timestamp in the stored form: RFC 3339, `Z` for UTC, fractional
/// seconds only when present.
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<FixedOffset>, chrono::ParseError> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw).or_else(|err| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|dt| dt.and_utc().fixed_offset())
            .map_err(|_| err)
    })
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<FixedOffset>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Coordinates are declared REAL, but rows written by other tools may hold
/// them as text or integers.
fn coordinate_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<f64> {
    match row.get_ref(idx)? {
        ValueRef::Real(v) => Ok(v),
        ValueRef::Integer(v) => Ok(v as f64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .ok_or_else(|| rusqlite::Error::InvalidColumnType(idx, column_name(row, idx), Type::Text)),
        ValueRef::Null => Err(rusqlite::Error::InvalidColumnType(idx, column_name(row, idx), Type::Null)),
        ValueRef::Blob(_) => Err(rusqlite::Error::InvalidColumnType(idx, column_name(row, idx), Type::Blob)),
    }
}

fn column_name(row: &Row<'_>, idx: usize) -> String {
    row.as_ref()
        .column_name(idx)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Why a month/day search was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("both month and day must be selected")]
    Missing,
    #[error("month {0:?} is not between 01 and 12")]
    Month(String),
    #[error("day {0:?} is not between 01 and 31")]
    Day(String),
}

/// "On this day in any year": a calendar month and day, each held as the
/// two-digit text that appears in stored timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFilter {
    month: String,
    day: String,
}

impl DateFilter {
    pub fn new(month: &str, day: &str) -> std::result::Result<Self, FilterError> {
        let (month, day) = (month.trim(), day.trim());
        if month.is_empty() || day.is_empty() {
            return Err(FilterError::Missing);
        }

        let month = two_digits(month, 12).ok_or_else(|| FilterError::Month(month.to_string()))?;
        let day = two_digits(day, 31).ok_or_else(|| FilterError::Day(day.to_string()))?;

        Ok(Self { month, day })
    }

    pub fn month(&self) -> &str {
        &self.month
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    /// Same test the store applies in SQL, against the stored text.
    pub fn matches(&self, record: &PhotoRecord) -> bool {
        let text = record.timestamp_text();
        text.get(5..7) == Some(self.month.as_str()) && text.get(8..10) == Some(self.day.as_str())
    }
}

fn two_digits(raw: &str, max: u32) -> Option<String> {
    if raw.len() > 2 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: u32 = raw.parse().ok()?;
    (1..=max).contains(&value).then(|| format!("{value:02}"))
}
