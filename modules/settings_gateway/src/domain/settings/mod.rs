//! Settings value trees
//!
//! A [`Settings`] instance holds the values of one entity as a nested JSON
//! object shaped like the gateway schema. [`SettingsFolder`] is a view over a
//! sub-path of that tree; views handed out by a live instance write through
//! to it.

mod array;
mod folder;
#[allow(clippy::module_inception)]
mod settings;

pub use folder::SettingsFolder;
pub use settings::{Settings, SettingsTarget};

use crate::domain::events::ChangeRecord;
use crate::domain::schema::{SchemaEntry, SchemaFolder, SchemaNode};
use crate::domain::util::get_nested;
use serde_json::{Map, Value};

/// Result of a `get` on a settings folder
#[derive(Debug, Clone)]
pub enum SettingsNode {
    /// Leaf value
    Value(Value),
    /// Nested folder view
    Folder(SettingsFolder),
}

impl SettingsNode {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            SettingsNode::Value(value) => Some(value),
            SettingsNode::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&SettingsFolder> {
        match self {
            SettingsNode::Value(_) => None,
            SettingsNode::Folder(folder) => Some(folder),
        }
    }

    /// Plain value, folders become nested objects
    pub fn to_value(&self) -> Value {
        match self {
            SettingsNode::Value(value) => value.clone(),
            SettingsNode::Folder(folder) => folder.to_json(),
        }
    }
}

/// One leaf changed by an update or a reset
#[derive(Debug, Clone)]
pub struct Change {
    /// Entry that changed
    pub entry: SchemaEntry,
    /// Value before the change
    pub previous: Value,
    /// Value after the change
    pub next: Value,
}

impl Change {
    pub fn path(&self) -> &str {
        self.entry.path()
    }

    pub(crate) fn record(&self) -> ChangeRecord {
        ChangeRecord {
            path: self.entry.path().to_string(),
            previous: self.previous.clone(),
            next: self.next.clone(),
        }
    }
}

/// Stored value of an entry, its default when absent
pub(crate) fn read_entry(entry: &SchemaEntry, values: &Map<String, Value>) -> Value {
    get_nested(values, entry.path())
        .cloned()
        .unwrap_or_else(|| entry.default_value())
}

/// Plain object for a schema folder, keeping the schema shape
pub(crate) fn read_folder(folder: &SchemaFolder, values: &Map<String, Value>) -> Map<String, Value> {
    folder
        .entries()
        .map(|(key, node)| {
            let value = match node {
                SchemaNode::Entry(entry) => read_entry(entry, values),
                SchemaNode::Folder(child) => Value::Object(read_folder(child, values)),
            };
            (key.to_string(), value)
        })
        .collect()
}
