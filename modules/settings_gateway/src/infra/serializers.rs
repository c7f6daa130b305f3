//! Built-in serializers

use crate::contract::{Serializer, SerializerContext};
use crate::domain::registry::SerializerRegistry;
use crate::domain::schema::SchemaEntry;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use jsonschema::Validator;
use serde_json::{Number, Value};
use std::sync::Arc;

const TRUTHY: &[&str] = &["1", "true", "+", "t", "yes", "y", "on", "enable"];
const FALSY: &[&str] = &["0", "false", "-", "f", "no", "n", "off", "disable"];

/// Register `string`, `number`, `integer`, `float`, `boolean`, `any` and the
/// `object` alias
pub fn register_builtins(registry: &SerializerRegistry) {
    registry.register("string", Arc::new(StringSerializer));
    registry.register("number", Arc::new(NumberSerializer::Number));
    registry.register("integer", Arc::new(NumberSerializer::Integer));
    registry.register("float", Arc::new(NumberSerializer::Float));
    registry.register("boolean", Arc::new(BooleanSerializer));
    registry.register("any", Arc::new(AnySerializer));
    registry.alias("object", "any");
}

impl SerializerRegistry {
    /// Registry with the built-in serializers
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        register_builtins(&registry);
        registry
    }
}

/// Check `value` against the entry bounds
///
/// Inclusive bounds are closed, exclusive bounds are open; a missing bound is
/// unbounded on that side.
fn check_bounds(value: f64, entry: &SchemaEntry, subject: &str) -> Result<()> {
    let inclusive = entry.inclusive();
    let above_min = match entry.minimum() {
        Some(min) if inclusive => value >= min,
        Some(min) => value > min,
        None => true,
    };
    let below_max = match entry.maximum() {
        Some(max) if inclusive => value <= max,
        Some(max) => value < max,
        None => true,
    };
    if above_min && below_max {
        return Ok(());
    }

    let range = match (entry.minimum(), entry.maximum(), inclusive) {
        (Some(min), Some(max), true) => format!("between {min} and {max} (inclusive)"),
        (Some(min), Some(max), false) => format!("between {min} and {max} (exclusive)"),
        (Some(min), None, true) => format!("at least {min}"),
        (Some(min), None, false) => format!("greater than {min}"),
        (None, Some(max), true) => format!("at most {max}"),
        (None, Some(max), false) => format!("less than {max}"),
        (None, None, _) => return Ok(()),
    };
    bail!("{subject} must be {range}")
}

/// Strings; numbers and booleans are stringified, bounds apply to the length
pub struct StringSerializer;

#[async_trait]
impl Serializer for StringSerializer {
    async fn validate(&self, value: &Value, ctx: &SerializerContext<'_>) -> Result<Value> {
        let text = match value {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            other => bail!("expected a string, got {other}"),
        };
        check_bounds(text.chars().count() as f64, ctx.entry, "The length")?;
        Ok(Value::String(text))
    }
}

/// Numbers, accepting numeric strings
pub enum NumberSerializer {
    Number,
    Integer,
    Float,
}

impl NumberSerializer {
    fn parse(value: &Value) -> Result<f64> {
        let parsed = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|number| number.is_finite())
            .ok_or_else(|| anyhow!("expected a number, got {value}"))
    }
}

#[async_trait]
impl Serializer for NumberSerializer {
    async fn validate(&self, value: &Value, ctx: &SerializerContext<'_>) -> Result<Value> {
        let number = Self::parse(value)?;
        check_bounds(number, ctx.entry, "The value")?;

        match self {
            NumberSerializer::Integer => {
                if let Some(integer) = value.as_i64() {
                    return Ok(Value::from(integer));
                }
                if number.fract() != 0.0 {
                    bail!("expected an integer, got {value}");
                }
                if !(i64::MIN as f64..i64::MAX as f64).contains(&number) {
                    bail!("{value} is out of the integer range");
                }
                Ok(Value::from(number as i64))
            }
            NumberSerializer::Number if value.is_number() => Ok(value.clone()),
            NumberSerializer::Number | NumberSerializer::Float => Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("expected a number, got {value}")),
        }
    }
}

/// Booleans, accepting the usual truthy and falsy words
pub struct BooleanSerializer;

#[async_trait]
impl Serializer for BooleanSerializer {
    async fn validate(&self, value: &Value, _ctx: &SerializerContext<'_>) -> Result<Value> {
        let word = match value {
            Value::Bool(flag) => return Ok(Value::Bool(*flag)),
            Value::String(text) => text.trim().to_lowercase(),
            Value::Number(number) => number.to_string(),
            other => bail!("expected a boolean, got {other}"),
        };
        if TRUTHY.contains(&word.as_str()) {
            Ok(Value::Bool(true))
        } else if FALSY.contains(&word.as_str()) {
            Ok(Value::Bool(false))
        } else {
            bail!("expected a boolean, got {value}")
        }
    }
}

/// Pass-through
pub struct AnySerializer;

#[async_trait]
impl Serializer for AnySerializer {
    async fn validate(&self, value: &Value, _ctx: &SerializerContext<'_>) -> Result<Value> {
        Ok(value.clone())
    }
}

/// Values checked against a JSON Schema document
///
/// Registered by the host under a type name of its choice.
pub struct JsonSchemaSerializer {
    validator: Validator,
}

impl JsonSchemaSerializer {
    pub fn new(schema: &Value) -> Result<Self> {
        let validator =
            Validator::new(schema).map_err(|e| anyhow!("Invalid JSON Schema: {}", e))?;
        Ok(Self { validator })
    }
}

#[async_trait]
impl Serializer for JsonSchemaSerializer {
    async fn validate(&self, value: &Value, _ctx: &SerializerContext<'_>) -> Result<Value> {
        if let Err(error) = self.validator.validate(value) {
            bail!("{}", error);
        }
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::EntryOptions;
    use serde_json::json;

    async fn check(serializer: &dyn Serializer, entry: &SchemaEntry, value: Value) -> Result<Value> {
        serializer
            .validate(&value, &SerializerContext::for_entry(entry))
            .await
    }

    fn entry(type_name: &str, options: EntryOptions) -> SchemaEntry {
        SchemaEntry::new("", "test", type_name, options)
    }

    #[tokio::test]
    async fn test_string_serializer() {
        let plain = entry("string", EntryOptions::new());
        assert_eq!(check(&StringSerializer, &plain, json!("hi")).await.unwrap(), json!("hi"));
        assert_eq!(check(&StringSerializer, &plain, json!(12)).await.unwrap(), json!("12"));
        assert!(check(&StringSerializer, &plain, json!({})).await.is_err());

        let bounded = entry(
            "string",
            EntryOptions::new().minimum(2.0).maximum(4.0).inclusive(true),
        );
        assert!(check(&StringSerializer, &bounded, json!("ab")).await.is_ok());
        assert!(check(&StringSerializer, &bounded, json!("abcd")).await.is_ok());
        assert!(check(&StringSerializer, &bounded, json!("abcde")).await.is_err());
    }

    #[tokio::test]
    async fn test_number_serializers() {
        let plain = entry("number", EntryOptions::new());
        assert_eq!(
            check(&NumberSerializer::Number, &plain, json!(64)).await.unwrap(),
            json!(64)
        );
        assert_eq!(
            check(&NumberSerializer::Float, &plain, json!("1.5")).await.unwrap(),
            json!(1.5)
        );
        assert_eq!(
            check(&NumberSerializer::Integer, &plain, json!("3")).await.unwrap(),
            json!(3)
        );
        assert!(check(&NumberSerializer::Integer, &plain, json!(1.5)).await.is_err());
        assert!(check(&NumberSerializer::Number, &plain, json!("abc")).await.is_err());
    }

    #[tokio::test]
    async fn test_integer_outside_i64_range_is_rejected() {
        let plain = entry("integer", EntryOptions::new());
        let err = check(&NumberSerializer::Integer, &plain, json!(1e20))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("out of the integer range"));
        assert!(check(&NumberSerializer::Integer, &plain, json!(-1e20)).await.is_err());
        assert!(check(&NumberSerializer::Integer, &plain, json!(u64::MAX)).await.is_err());
        assert!(check(&NumberSerializer::Integer, &plain, json!("1e20")).await.is_err());
        assert_eq!(
            check(&NumberSerializer::Integer, &plain, json!(i64::MAX)).await.unwrap(),
            json!(i64::MAX)
        );
        assert_eq!(
            check(&NumberSerializer::Integer, &plain, json!(1e15)).await.unwrap(),
            json!(1_000_000_000_000_000_i64)
        );
    }

    #[tokio::test]
    async fn test_number_bounds_exclusive_and_inclusive() {
        let exclusive = entry("number", EntryOptions::new().minimum(1.0).maximum(10.0));
        assert!(check(&NumberSerializer::Number, &exclusive, json!(1)).await.is_err());
        assert!(check(&NumberSerializer::Number, &exclusive, json!(5)).await.is_ok());
        let err = check(&NumberSerializer::Number, &exclusive, json!(10))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The value must be between 1 and 10 (exclusive)");

        let inclusive = entry(
            "number",
            EntryOptions::new().minimum(1.0).maximum(10.0).inclusive(true),
        );
        assert!(check(&NumberSerializer::Number, &inclusive, json!(1)).await.is_ok());
        assert!(check(&NumberSerializer::Number, &inclusive, json!(10)).await.is_ok());

        let floor = entry("number", EntryOptions::new().minimum(0.0).inclusive(true));
        assert!(check(&NumberSerializer::Number, &floor, json!(1_000_000)).await.is_ok());
        assert!(check(&NumberSerializer::Number, &floor, json!(-1)).await.is_err());
    }

    #[tokio::test]
    async fn test_boolean_serializer() {
        let plain = entry("boolean", EntryOptions::new());
        for word in ["yes", "ON", "enable", "1", "t"] {
            assert_eq!(check(&BooleanSerializer, &plain, json!(word)).await.unwrap(), json!(true));
        }
        for word in ["no", "off", "disable", "0", "f"] {
            assert_eq!(check(&BooleanSerializer, &plain, json!(word)).await.unwrap(), json!(false));
        }
        assert_eq!(check(&BooleanSerializer, &plain, json!(0)).await.unwrap(), json!(false));
        assert!(check(&BooleanSerializer, &plain, json!("maybe")).await.is_err());
    }

    #[tokio::test]
    async fn test_json_schema_serializer() {
        let serializer = JsonSchemaSerializer::new(&json!({
            "type": "object",
            "properties": {"enabled": {"type": "boolean"}},
            "required": ["enabled"]
        }))
        .unwrap();
        let plain = entry("backup", EntryOptions::new());

        assert!(check(&serializer, &plain, json!({"enabled": true})).await.is_ok());
        assert!(check(&serializer, &plain, json!({"enabled": "nope"})).await.is_err());
        assert!(check(&serializer, &plain, json!({})).await.is_err());

        assert!(JsonSchemaSerializer::new(&json!({"type": 12})).is_err());
    }
}
