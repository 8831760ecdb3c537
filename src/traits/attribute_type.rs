//! Rust types an attribute value can be read as.
//!
//! A typed read is only allowed when the attribute's backend type can produce
//! the requested type; otherwise it fails with `TypeMismatch` before any value
//! is looked up.
//!
//! | Rust type          | Backend types      |
//! |--------------------|--------------------|
//! | `String`           | varchar, text      |
//! | `i64`, `i32`       | int                |
//! | `Decimal`          | decimal            |
//! | `DateTime<Utc>`    | datetime           |
//! | `AttributeValue`   | any                |

use rust_decimal::Decimal;

use crate::model::{AttributeValue, BackendType};
use crate::utils::EavDateTime;

pub trait AttributeType: Sized {
    /// Name used in `TypeMismatch` errors.
    const TYPE_NAME: &'static str;

    fn accepts(backend: BackendType) -> bool;

    /// Converts a value of an accepted backend. `Err` carries the reason.
    fn from_value(value: AttributeValue) -> Result<Self, String>;
}

fn unexpected(expected: &str, value: &AttributeValue) -> String {
    format!("expected {expected}, found {} value", value.backend_type())
}

impl AttributeType for String {
    const TYPE_NAME: &'static str = "String";

    fn accepts(backend: BackendType) -> bool {
        matches!(backend, BackendType::Varchar | BackendType::Text)
    }

    fn from_value(value: AttributeValue) -> Result<Self, String> {
        match value {
            AttributeValue::Varchar(s) | AttributeValue::Text(s) => Ok(s),
            other => Err(unexpected("a string", &other)),
        }
    }
}

impl AttributeType for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn accepts(backend: BackendType) -> bool {
        backend == BackendType::Int
    }

    fn from_value(value: AttributeValue) -> Result<Self, String> {
        value.as_int().ok_or_else(|| unexpected("an integer", &value))
    }
}

impl AttributeType for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn accepts(backend: BackendType) -> bool {
        backend == BackendType::Int
    }

    fn from_value(value: AttributeValue) -> Result<Self, String> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| format!("{wide} does not fit in i32"))
    }
}

impl AttributeType for Decimal {
    const TYPE_NAME: &'static str = "Decimal";

    fn accepts(backend: BackendType) -> bool {
        backend == BackendType::Decimal
    }

    fn from_value(value: AttributeValue) -> Result<Self, String> {
        value
            .as_decimal()
            .ok_or_else(|| unexpected("a decimal", &value))
    }
}

impl AttributeType for EavDateTime {
    const TYPE_NAME: &'static str = "DateTime<Utc>";

    fn accepts(backend: BackendType) -> bool {
        backend == BackendType::Datetime
    }

    fn from_value(value: AttributeValue) -> Result<Self, String> {
        value
            .as_datetime()
            .ok_or_else(|| unexpected("a datetime", &value))
    }
}

impl AttributeType for AttributeValue {
    const TYPE_NAME: &'static str = "AttributeValue";

    fn accepts(_: BackendType) -> bool {
        true
    }

    fn from_value(value: AttributeValue) -> Result<Self, String> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn strings_read_from_both_text_backends() {
        assert!(String::accepts(BackendType::Varchar));
        assert!(String::accepts(BackendType::Text));
        assert!(!String::accepts(BackendType::Int));
    }

    #[test]
    fn dynamic_values_accept_everything() {
        assert!(BackendType::iter().all(AttributeValue::accepts));
    }

    #[test]
    fn narrow_ints_reject_overflow() {
        assert_eq!(i32::from_value(AttributeValue::Int(7)), Ok(7));
        assert!(i32::from_value(AttributeValue::Int(i64::MAX)).is_err());
    }

    #[test]
    fn decimals_do_not_read_as_ints() {
        assert!(!i64::accepts(BackendType::Decimal));
        assert!(i64::from_value(AttributeValue::Decimal(Decimal::ONE)).is_err());
    }
}
