use serde_json::{Number, Value};

use crate::modbus::protocol::{FunctionCode, RegisterValue};

/// Untyped command as received from a caller. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub function_code: Option<String>,
    pub address: Option<String>,
    pub value: Option<String>,
    pub signed: Option<String>,
}

impl CommandDescriptor {
    pub fn new(function_code: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            function_code: Some(function_code.into()),
            address: Some(address.into()),
            value: None,
            signed: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_signed(mut self, signed: impl Into<String>) -> Self {
        self.signed = Some(signed.into());
        self
    }

    /// Builds a descriptor from decoded form fields. The first occurrence of
    /// a key wins, unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut descriptor = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "function_code" => &mut descriptor.function_code,
                "address" => &mut descriptor.address,
                "value" => &mut descriptor.value,
                "signed" => &mut descriptor.signed,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        descriptor
    }

    /// Builds a descriptor from one element of a JSON batch. Numbers and
    /// booleans are taken in their textual form, `null` counts as absent.
    pub fn from_json(command: &Value) -> Self {
        let field = |name: &str| command.get(name).and_then(json_field_text);
        Self {
            function_code: field("function_code"),
            address: field("address"),
            value: field("value"),
            signed: field("signed"),
        }
    }
}

fn json_field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(number_text(n)),
        other => Some(other.to_string()),
    }
}

/// Integral floats such as `16.0` render without the fraction.
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// Validated register operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub function: FunctionCode,
    pub address: u16,
    pub value: Option<RegisterValue>,
    pub signed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_renders_scalars() {
        let descriptor = CommandDescriptor::from_json(&json!({
            "function_code": 16,
            "address": "100",
            "value": 12.5,
            "signed": true,
        }));
        assert_eq!(descriptor.function_code.as_deref(), Some("16"));
        assert_eq!(descriptor.address.as_deref(), Some("100"));
        assert_eq!(descriptor.value.as_deref(), Some("12.5"));
        assert_eq!(descriptor.signed.as_deref(), Some("true"));
    }

    #[test]
    fn test_from_json_null_and_missing_are_absent() {
        let descriptor = CommandDescriptor::from_json(&json!({ "function_code": 3, "value": null }));
        assert_eq!(descriptor.address, None);
        assert_eq!(descriptor.value, None);
        assert_eq!(descriptor.signed, None);

        assert_eq!(CommandDescriptor::from_json(&json!([1, 2])), CommandDescriptor::default());
    }

    #[test]
    fn test_from_json_integral_floats_lose_fraction() {
        let descriptor = CommandDescriptor::from_json(&json!({
            "function_code": 16.0,
            "address": 100.0,
            "value": -3.0,
        }));
        assert_eq!(descriptor.function_code.as_deref(), Some("16"));
        assert_eq!(descriptor.address.as_deref(), Some("100"));
        assert_eq!(descriptor.value.as_deref(), Some("-3"));
    }

    #[test]
    fn test_from_pairs_keeps_first_value() {
        let descriptor = CommandDescriptor::from_pairs([
            ("function_code", "4"),
            ("function_code", "3"),
            ("address", "0"),
            ("colour", "blue"),
        ]);
        assert_eq!(descriptor, CommandDescriptor::new("4", "0"));
        assert_eq!(CommandDescriptor::from_pairs(Vec::<(String, String)>::new()), CommandDescriptor::default());
    }
}
