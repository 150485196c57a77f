//! Field-by-field validation of command descriptors.
//!
//! Each parser rejects its field with a dedicated [`ValidationError`] whose
//! message is shown to the caller as-is.

use super::types::{Command, CommandDescriptor};
use crate::modbus::protocol::{FunctionCode, RegisterValue};
use crate::utils::error::ValidationError;

pub const MAX_ADDRESS: i64 = 5000;
pub const MAX_VALUE: f64 = 65535.0;

enum Integer {
    Value(i64),
    /// Integer-shaped text whose magnitude does not fit an `i64`.
    Overflow,
    Invalid,
}

fn parse_integer(text: &str) -> Integer {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Integer::Value(value);
    }
    let digits = text.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Integer::Overflow
    } else {
        Integer::Invalid
    }
}

pub fn parse_function_code(input: Option<&str>) -> Result<FunctionCode, ValidationError> {
    let input = input.ok_or(ValidationError::MissingFunctionCode)?;
    match parse_integer(input) {
        Integer::Value(code) => {
            FunctionCode::from_code(code).ok_or(ValidationError::UnsupportedFunctionCode)
        }
        Integer::Overflow => Err(ValidationError::UnsupportedFunctionCode),
        Integer::Invalid => Err(ValidationError::FunctionCodeNotInteger),
    }
}

pub fn parse_address(input: Option<&str>) -> Result<u16, ValidationError> {
    let input = input.ok_or(ValidationError::MissingAddress)?;
    match parse_integer(input) {
        Integer::Value(address) if (0..=MAX_ADDRESS).contains(&address) => Ok(address as u16),
        Integer::Value(_) | Integer::Overflow => Err(ValidationError::AddressOutOfRange),
        Integer::Invalid => Err(ValidationError::AddressNotInteger),
    }
}

/// Parses the value field. The integer representation wins whenever it is
/// numerically equal to the decimal one, so `"10"` and `"10.0"` both yield
/// `Integer(10)`.
pub fn parse_value(
    input: Option<&str>,
    function: FunctionCode,
) -> Result<Option<RegisterValue>, ValidationError> {
    let input = match input {
        Some(input) => input,
        None if function == FunctionCode::WriteSingle => {
            return Err(ValidationError::MissingValue)
        }
        None => return Ok(None),
    };

    let decimal = input
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::ValueNotNumber)?;

    let value = match parse_integer(input) {
        Integer::Value(integer) => RegisterValue::Integer(integer),
        _ if decimal.is_finite()
            && decimal.fract() == 0.0
            && decimal.abs() < i64::MAX as f64 =>
        {
            RegisterValue::Integer(decimal as i64)
        }
        _ => RegisterValue::Decimal(decimal),
    };

    if function != FunctionCode::WriteSingle {
        return Err(ValidationError::ValueNotAllowed);
    }

    let in_range = match value {
        RegisterValue::Integer(v) => (0..=MAX_VALUE as i64).contains(&v),
        RegisterValue::Decimal(v) => (0.0..=MAX_VALUE).contains(&v),
    };
    if !in_range {
        return Err(ValidationError::ValueOutOfRange);
    }

    Ok(Some(value))
}

pub fn parse_signed(input: Option<&str>) -> Result<bool, ValidationError> {
    match input.map(str::to_lowercase).as_deref() {
        None => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(_) => Err(ValidationError::SignedNotBoolean),
    }
}

/// Validates all four fields in order: function code, address, value, signed.
pub fn validate(descriptor: &CommandDescriptor) -> Result<Command, ValidationError> {
    let function = parse_function_code(descriptor.function_code.as_deref())?;
    let address = parse_address(descriptor.address.as_deref())?;
    let value = parse_value(descriptor.value.as_deref(), function)?;
    let signed = parse_signed(descriptor.signed.as_deref())?;

    Ok(Command {
        function,
        address,
        value,
        signed,
    })
}
