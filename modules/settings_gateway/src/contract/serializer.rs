//! Serializer trait for per-type value handling
//!
//! A serializer is looked up by the `type` name of a schema entry. It
//! validates incoming values, optionally resolves stored values into richer
//! ones, and converts values into their storable form.

use crate::domain::schema::SchemaEntry;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Context passed to serializer calls
#[derive(Debug, Clone, Copy)]
pub struct SerializerContext<'a> {
    /// Entry the value belongs to
    pub entry: &'a SchemaEntry,
    /// Id of the settings instance, if any
    pub settings_id: Option<&'a str>,
    /// Caller supplied extra context
    pub extra_context: Option<&'a Value>,
}

impl<'a> SerializerContext<'a> {
    /// Context for an entry without a settings instance
    pub fn for_entry(entry: &'a SchemaEntry) -> Self {
        Self {
            entry,
            settings_id: None,
            extra_context: None,
        }
    }
}

/// Per-type validate/resolve/serialize capability
#[async_trait]
pub trait Serializer: Send + Sync {
    /// Validate a raw value, returning its normalised form
    async fn validate(&self, value: &Value, ctx: &SerializerContext<'_>) -> Result<Value>;

    /// Resolve a stored value, only called for entries with `should_resolve`
    async fn resolve(&self, value: &Value, _ctx: &SerializerContext<'_>) -> Result<Value> {
        Ok(value.clone())
    }

    /// Convert a value into its storable form
    fn serialize(&self, value: &Value) -> Value {
        value.clone()
    }
}
