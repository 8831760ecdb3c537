//! Static description of the five typed value tables.
//!
//! Each backend type owns one table and one attribute index. Code that works on
//! values is written once, generic over [`ValueTable`], and dispatched on an
//! attribute's [`BackendType`] with `with_value_table!`.

use redb::TableDefinition;
use rust_decimal::Decimal;

use crate::databases::redb_store::tables::{
    DATETIME_INDEX, DATETIME_VALUES, DECIMAL_INDEX, DECIMAL_VALUES, INT_INDEX, INT_VALUES,
    TEXT_INDEX, TEXT_VALUES, ValueIndex, ValueKey, ValueRow, VARCHAR_INDEX, VARCHAR_VALUES,
};
use crate::error::{EavError, EavResult};
use crate::model::{AttributeValue, BackendType};
use crate::utils::datetime::EavDateTimeExt;
use crate::utils::EavDateTime;

pub trait ValueTable {
    const BACKEND: BackendType;
    const VALUES: TableDefinition<'static, ValueKey, ValueRow>;
    const BY_ATTRIBUTE: ValueIndex;
    /// Table name used in corruption reports.
    const NAME: &'static str;

    /// Payload bytes for `value`, or `None` when it belongs to another backend.
    fn encode(value: &AttributeValue) -> Option<Vec<u8>>;

    fn decode(bytes: &[u8]) -> EavResult<AttributeValue>;
}

pub struct VarcharTable;
pub struct TextTable;
pub struct IntTable;
pub struct DecimalTable;
pub struct DatetimeTable;

fn corrupt(table: &'static str, reason: impl ToString) -> EavError {
    EavError::CorruptRecord {
        table,
        reason: reason.to_string(),
    }
}

fn decode_utf8(table: &'static str, bytes: &[u8]) -> EavResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| corrupt(table, e))
}

fn decode_i64(table: &'static str, bytes: &[u8]) -> EavResult<i64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| corrupt(table, format!("expected 8 bytes, found {}", bytes.len())))?;
    Ok(i64::from_be_bytes(raw))
}

impl ValueTable for VarcharTable {
    const BACKEND: BackendType = BackendType::Varchar;
    const VALUES: TableDefinition<'static, ValueKey, ValueRow> = VARCHAR_VALUES;
    const BY_ATTRIBUTE: ValueIndex = VARCHAR_INDEX;
    const NAME: &'static str = "eav_values_varchar";

    fn encode(value: &AttributeValue) -> Option<Vec<u8>> {
        match value {
            AttributeValue::Varchar(s) => Some(s.as_bytes().to_vec()),
            _ => None,
        }
    }

    fn decode(bytes: &[u8]) -> EavResult<AttributeValue> {
        decode_utf8(Self::NAME, bytes).map(AttributeValue::Varchar)
    }
}

impl ValueTable for TextTable {
    const BACKEND: BackendType = BackendType::Text;
    const VALUES: TableDefinition<'static, ValueKey, ValueRow> = TEXT_VALUES;
    const BY_ATTRIBUTE: ValueIndex = TEXT_INDEX;
    const NAME: &'static str = "eav_values_text";

    fn encode(value: &AttributeValue) -> Option<Vec<u8>> {
        match value {
            AttributeValue::Text(s) => Some(s.as_bytes().to_vec()),
            _ => None,
        }
    }

    fn decode(bytes: &[u8]) -> EavResult<AttributeValue> {
        decode_utf8(Self::NAME, bytes).map(AttributeValue::Text)
    }
}

impl ValueTable for IntTable {
    const BACKEND: BackendType = BackendType::Int;
    const VALUES: TableDefinition<'static, ValueKey, ValueRow> = INT_VALUES;
    const BY_ATTRIBUTE: ValueIndex = INT_INDEX;
    const NAME: &'static str = "eav_values_int";

    fn encode(value: &AttributeValue) -> Option<Vec<u8>> {
        match value {
            AttributeValue::Int(v) => Some(v.to_be_bytes().to_vec()),
            _ => None,
        }
    }

    fn decode(bytes: &[u8]) -> EavResult<AttributeValue> {
        decode_i64(Self::NAME, bytes).map(AttributeValue::Int)
    }
}

impl ValueTable for DecimalTable {
    const BACKEND: BackendType = BackendType::Decimal;
    const VALUES: TableDefinition<'static, ValueKey, ValueRow> = DECIMAL_VALUES;
    const BY_ATTRIBUTE: ValueIndex = DECIMAL_INDEX;
    const NAME: &'static str = "eav_values_decimal";

    fn encode(value: &AttributeValue) -> Option<Vec<u8>> {
        match value {
            // Normalized so 1.50 and 1.5 compare equal byte-wise.
            AttributeValue::Decimal(v) => Some(v.normalize().serialize().to_vec()),
            _ => None,
        }
    }

    fn decode(bytes: &[u8]) -> EavResult<AttributeValue> {
        let raw: [u8; 16] = bytes.try_into().map_err(|_| {
            corrupt(Self::NAME, format!("expected 16 bytes, found {}", bytes.len()))
        })?;
        Ok(AttributeValue::Decimal(Decimal::deserialize(raw)))
    }
}

impl ValueTable for DatetimeTable {
    const BACKEND: BackendType = BackendType::Datetime;
    const VALUES: TableDefinition<'static, ValueKey, ValueRow> = DATETIME_VALUES;
    const BY_ATTRIBUTE: ValueIndex = DATETIME_INDEX;
    const NAME: &'static str = "eav_values_datetime";

    fn encode(value: &AttributeValue) -> Option<Vec<u8>> {
        match value {
            AttributeValue::Datetime(v) => Some(v.to_storage_micros().to_be_bytes().to_vec()),
            _ => None,
        }
    }

    fn decode(bytes: &[u8]) -> EavResult<AttributeValue> {
        let micros = decode_i64(Self::NAME, bytes)?;
        EavDateTime::from_storage_micros(micros)
            .map(AttributeValue::Datetime)
            .ok_or_else(|| corrupt(Self::NAME, format!("timestamp {micros} out of range")))
    }
}

/// Runs `$body` with `$table` bound to the [`ValueTable`] for `$backend`.
///
/// ```ignore
/// let rows = with_value_table!(attribute.backend_type, T => values::rows_for_entity::<T, _>(txn, id))?;
/// ```
macro_rules! with_value_table {
    ($backend:expr, $table:ident => $body:expr) => {
        match $backend {
            $crate::model::BackendType::Varchar => {
                type $table = $crate::traits::value_table::VarcharTable;
                $body
            }
            $crate::model::BackendType::Text => {
                type $table = $crate::traits::value_table::TextTable;
                $body
            }
            $crate::model::BackendType::Int => {
                type $table = $crate::traits::value_table::IntTable;
                $body
            }
            $crate::model::BackendType::Decimal => {
                type $table = $crate::traits::value_table::DecimalTable;
                $body
            }
            $crate::model::BackendType::Datetime => {
                type $table = $crate::traits::value_table::DatetimeTable;
                $body
            }
        }
    };
}

pub(crate) use with_value_table;
