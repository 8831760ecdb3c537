//! Attribute values: what callers write, what the tables hold and what reads return.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::{AttributeId, BackendType, EntityId, StoreId};
use crate::utils::datetime::{EavDateTime, EavDateTimeExt};

/// A value in the representation of its backend table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Varchar(String),
    Text(String),
    Int(i64),
    Decimal(Decimal),
    Datetime(EavDateTime),
}

impl AttributeValue {
    pub fn backend_type(&self) -> BackendType {
        match self {
            AttributeValue::Varchar(_) => BackendType::Varchar,
            AttributeValue::Text(_) => BackendType::Text,
            AttributeValue::Int(_) => BackendType::Int,
            AttributeValue::Decimal(_) => BackendType::Decimal,
            AttributeValue::Datetime(_) => BackendType::Datetime,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Varchar(s) | AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            AttributeValue::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<EavDateTime> {
        match self {
            AttributeValue::Datetime(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Varchar(s) | AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::Decimal(v) => write!(f, "{v}"),
            AttributeValue::Datetime(v) => f.write_str(&v.to_rfc3339()),
        }
    }
}

/// A loosely typed value supplied by a caller, converted to the attribute's
/// backend type before it is stored.
///
/// `Null` clears the value for the targeted store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputValue {
    Null,
    String(String),
    Int(i64),
    Decimal(Decimal),
    Float(f64),
    Bool(bool),
    Datetime(EavDateTime),
}

impl InputValue {
    pub fn is_null(&self) -> bool {
        matches!(self, InputValue::Null)
    }

    /// Converts the input into `backend`'s representation.
    ///
    /// Returns the human readable reason on failure; callers attach the
    /// attribute code.
    pub fn coerce(&self, backend: BackendType) -> Result<AttributeValue, String> {
        match backend {
            BackendType::Varchar => {
                let text = self.render_text()?;
                let chars = text.chars().count();
                if chars > BackendType::VARCHAR_MAX_CHARS {
                    return Err(format!(
                        "{chars} characters exceed the varchar limit of {}",
                        BackendType::VARCHAR_MAX_CHARS
                    ));
                }
                Ok(AttributeValue::Varchar(text))
            }
            BackendType::Text => self.render_text().map(AttributeValue::Text),
            BackendType::Int => self.to_int().map(AttributeValue::Int),
            BackendType::Decimal => self.to_decimal().map(AttributeValue::Decimal),
            BackendType::Datetime => self.to_datetime().map(AttributeValue::Datetime),
        }
    }

    fn render_text(&self) -> Result<String, String> {
        match self {
            InputValue::Null => Err("null has no text form".into()),
            InputValue::String(s) => Ok(s.clone()),
            InputValue::Int(v) => Ok(v.to_string()),
            InputValue::Decimal(v) => Ok(v.to_string()),
            InputValue::Float(v) => Ok(v.to_string()),
            InputValue::Bool(v) => Ok(v.to_string()),
            InputValue::Datetime(v) => Ok(v.to_rfc3339()),
        }
    }

    fn to_int(&self) -> Result<i64, String> {
        match self {
            InputValue::Int(v) => Ok(*v),
            InputValue::Bool(v) => Ok(i64::from(*v)),
            InputValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("`{s}` is not an integer")),
            InputValue::Decimal(d) => {
                if !d.fract().is_zero() {
                    return Err(format!("{d} has a fractional part"));
                }
                d.to_i64().ok_or_else(|| format!("{d} is out of integer range"))
            }
            InputValue::Float(f) => {
                // 2^63 is exactly representable; anything at or above it overflows.
                const LIMIT: f64 = 9_223_372_036_854_775_808.0;
                if !f.is_finite() || f.fract() != 0.0 || *f >= LIMIT || *f < -LIMIT {
                    return Err(format!("{f} is not an integral value in range"));
                }
                Ok(*f as i64)
            }
            InputValue::Null | InputValue::Datetime(_) => {
                Err(format!("{} cannot be stored as an integer", self.kind()))
            }
        }
    }

    fn to_decimal(&self) -> Result<Decimal, String> {
        match self {
            InputValue::Decimal(d) => Ok(*d),
            InputValue::Int(v) => Ok(Decimal::from(*v)),
            InputValue::Float(f) => {
                Decimal::try_from(*f).map_err(|_| format!("{f} is not representable as a decimal"))
            }
            InputValue::String(s) => {
                Decimal::from_str(s.trim()).map_err(|_| format!("`{s}` is not a decimal number"))
            }
            InputValue::Null | InputValue::Bool(_) | InputValue::Datetime(_) => {
                Err(format!("{} cannot be stored as a decimal", self.kind()))
            }
        }
    }

    /// Datetimes are kept at microsecond precision; finer parts are dropped here so
    /// the coerced value equals what a read returns.
    fn to_datetime(&self) -> Result<EavDateTime, String> {
        let value = match self {
            InputValue::Datetime(v) => *v,
            InputValue::String(s) => {
                parse_datetime(s.trim()).ok_or_else(|| format!("`{s}` is not a recognised date"))?
            }
            _ => return Err(format!("{} cannot be stored as a datetime", self.kind())),
        };
        Ok(value.to_storage_precision())
    }

    fn kind(&self) -> &'static str {
        match self {
            InputValue::Null => "null",
            InputValue::String(_) => "a string",
            InputValue::Int(_) => "an integer",
            InputValue::Decimal(_) => "a decimal",
            InputValue::Float(_) => "a float",
            InputValue::Bool(_) => "a boolean",
            InputValue::Datetime(_) => "a datetime",
        }
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) and `YYYY-MM-DD` (UTC midnight).
pub(crate) fn parse_datetime(s: &str) -> Option<EavDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::String(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::String(value)
    }
}

impl From<i64> for InputValue {
    fn from(value: i64) -> Self {
        InputValue::Int(value)
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        InputValue::Int(i64::from(value))
    }
}

impl From<Decimal> for InputValue {
    fn from(value: Decimal) -> Self {
        InputValue::Decimal(value)
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        InputValue::Float(value)
    }
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        InputValue::Bool(value)
    }
}

impl From<EavDateTime> for InputValue {
    fn from(value: EavDateTime) -> Self {
        InputValue::Datetime(value)
    }
}

impl<T: Into<InputValue>> From<Option<T>> for InputValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(InputValue::Null, Into::into)
    }
}

impl From<AttributeValue> for InputValue {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Varchar(s) | AttributeValue::Text(s) => InputValue::String(s),
            AttributeValue::Int(v) => InputValue::Int(v),
            AttributeValue::Decimal(v) => InputValue::Decimal(v),
            AttributeValue::Datetime(v) => InputValue::Datetime(v),
        }
    }
}

/// One stored row of a typed value table.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub value_id: u64,
    pub entity_id: EntityId,
    pub attribute_id: AttributeId,
    pub store_id: StoreId,
    pub value: AttributeValue,
}

/// Which tier of the fallback chain produced a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// A row scoped to the requested, non-global store.
    Store(StoreId),
    /// The global (store 0) row.
    Global,
    /// The attribute's configured default.
    AttributeDefault,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    pub value: AttributeValue,
    pub source: ValueSource,
}
