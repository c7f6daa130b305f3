//! Schema entries - typed leaf nodes of the schema tree

use crate::domain::registry::SerializerRegistry;
use crate::domain::util::join_path;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Predicate rejecting values at validation time; returning `true` rejects
pub type ValueFilter = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Options used to create or edit an entry
///
/// Unset fields keep their current value on edit, or the documented default
/// on creation.
#[derive(Clone, Default)]
pub struct EntryOptions {
    /// Whether the entry stores an array
    pub array: Option<bool>,
    /// Default value, `null` means auto-generated
    pub default: Option<Value>,
    /// Lower bound
    pub minimum: Option<f64>,
    /// Upper bound
    pub maximum: Option<f64>,
    /// Whether the bounds are closed
    pub inclusive: Option<bool>,
    /// Whether end-users may mutate the entry
    pub configurable: Option<bool>,
    /// Whether stored values go through the serializer's resolve step
    pub resolve: Option<bool>,
    /// Value filter
    pub filter: Option<ValueFilter>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn array(mut self) -> Self {
        self.array = Some(true);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = Some(inclusive);
        self
    }

    pub fn configurable(mut self, configurable: bool) -> Self {
        self.configurable = Some(configurable);
        self
    }

    pub fn resolve(mut self, resolve: bool) -> Self {
        self.resolve = Some(resolve);
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }
}

impl fmt::Debug for EntryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryOptions")
            .field("array", &self.array)
            .field("default", &self.default)
            .field("minimum", &self.minimum)
            .field("maximum", &self.maximum)
            .field("inclusive", &self.inclusive)
            .field("configurable", &self.configurable)
            .field("resolve", &self.resolve)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

/// Leaf schema node describing one value
#[derive(Clone)]
pub struct SchemaEntry {
    key: String,
    path: String,
    type_name: String,
    array: bool,
    default: Value,
    minimum: Option<f64>,
    maximum: Option<f64>,
    inclusive: bool,
    configurable: bool,
    should_resolve: bool,
    filter: Option<ValueFilter>,
}

impl SchemaEntry {
    /// Create an entry under the folder at `parent_path`
    pub fn new(parent_path: &str, key: &str, type_name: &str, options: EntryOptions) -> Self {
        let mut entry = Self {
            key: key.to_string(),
            path: join_path(parent_path, key),
            type_name: type_name.to_lowercase(),
            array: false,
            default: Value::Null,
            minimum: None,
            maximum: None,
            inclusive: false,
            configurable: true,
            should_resolve: true,
            filter: None,
        };
        entry.edit(None, options);
        entry
    }

    /// Merge options (and optionally a new type) into this entry
    pub fn edit(&mut self, type_name: Option<&str>, options: EntryOptions) {
        if let Some(type_name) = type_name {
            self.type_name = type_name.to_lowercase();
        }
        if let Some(array) = options.array {
            self.array = array;
        }
        if let Some(default) = options.default {
            self.default = default;
        }
        if let Some(minimum) = options.minimum {
            self.minimum = Some(minimum);
        }
        if let Some(maximum) = options.maximum {
            self.maximum = Some(maximum);
        }
        if let Some(inclusive) = options.inclusive {
            self.inclusive = inclusive;
        }
        if let Some(configurable) = options.configurable {
            self.configurable = configurable;
        }
        if let Some(resolve) = options.resolve {
            self.should_resolve = resolve;
        }
        if let Some(filter) = options.filter {
            self.filter = Some(filter);
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }

    pub fn inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn configurable(&self) -> bool {
        self.configurable
    }

    pub fn should_resolve(&self) -> bool {
        self.should_resolve
    }

    pub fn filter(&self) -> Option<&ValueFilter> {
        self.filter.as_ref()
    }

    /// Effective default value
    ///
    /// A `null` default is generated from the entry shape: `[]` for arrays,
    /// `false` for booleans and `null` otherwise.
    pub fn default_value(&self) -> Value {
        if self.default.is_null() {
            self.generate_default()
        } else {
            self.default.clone()
        }
    }

    fn generate_default(&self) -> Value {
        if self.array {
            Value::Array(Vec::new())
        } else if self.type_name == "boolean" {
            Value::Bool(false)
        } else {
            Value::Null
        }
    }

    /// Collect every invariant violation of this entry
    pub fn check(&self, serializers: &SerializerRegistry) -> Vec<String> {
        let mut errors = Vec::new();

        if self.type_name.trim().is_empty() {
            errors.push("Parameter 'type' must be a non-empty string.".to_string());
        } else if !serializers.has(&self.type_name) {
            errors.push(format!("'{}' is not a valid type.", self.type_name));
        }

        if let (Some(minimum), Some(maximum)) = (self.minimum, self.maximum) {
            if minimum >= maximum {
                errors.push(
                    "Parameter 'minimum' must contain a value lower than the parameter 'maximum'."
                        .to_string(),
                );
            }
        }

        match (&self.default, self.array) {
            (Value::Null, _) => {}
            (Value::Array(_), true) => {}
            (_, true) => {
                errors.push("Default key must be an array if the key stores an array.".to_string());
            }
            (Value::Array(_), false) => {
                errors.push(
                    "Default key must not be an array if the key does not store an array."
                        .to_string(),
                );
            }
            (default, false) => {
                if !primitive_matches(&self.type_name, default) {
                    errors.push(format!("Default key must be a {}.", self.type_name));
                }
            }
        }

        errors
            .into_iter()
            .map(|reason| format!("{} - {}", self.path, reason))
            .collect()
    }

    /// Plain representation of the entry attributes
    pub fn to_json(&self) -> Value {
        json!({
            "type": self.type_name,
            "array": self.array,
            "configurable": self.configurable,
            "default": self.default_value(),
            "inclusive": self.inclusive,
            "maximum": self.maximum,
            "minimum": self.minimum,
            "resolve": self.should_resolve,
        })
    }
}

/// Type check for the primitive types whose JSON shape is known
fn primitive_matches(type_name: &str, value: &Value) -> bool {
    match type_name {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "number" | "integer" | "float" => value.is_number(),
        _ => true,
    }
}

impl fmt::Debug for SchemaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaEntry")
            .field("path", &self.path)
            .field("type", &self.type_name)
            .field("array", &self.array)
            .field("default", &self.default)
            .field("minimum", &self.minimum)
            .field("maximum", &self.maximum)
            .field("inclusive", &self.inclusive)
            .field("configurable", &self.configurable)
            .field("should_resolve", &self.should_resolve)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}
