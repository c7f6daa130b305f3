//! Settings folder views

use super::{read_entry, read_folder, Change, Settings, SettingsNode};
use crate::contract::{GatewayError, GatewayResult, ResetOptions, UpdateOptions};
use crate::domain::schema::{Schema, SchemaNode};
use crate::domain::util::join_path;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Weak};

#[derive(Clone)]
enum FolderSource {
    /// Live view over a settings instance
    Attached(Weak<Settings>),
    /// Standalone values, read-only
    Detached {
        schema: Arc<Schema>,
        values: Map<String, Value>,
    },
}

/// View over the values below one schema folder
///
/// Keys passed to every operation are relative to the folder path.
#[derive(Clone)]
pub struct SettingsFolder {
    path: String,
    source: FolderSource,
}

impl SettingsFolder {
    /// Standalone folder holding the defaults of `schema`
    ///
    /// Reads work, mutations and resolution fail with `NotReady`.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = schema.default_values();
        Self {
            path: String::new(),
            source: FolderSource::Detached { schema, values },
        }
    }

    pub(crate) fn attached(base: Weak<Settings>, path: String) -> Self {
        Self {
            path,
            source: FolderSource::Attached(base),
        }
    }

    /// Folder path relative to the settings root
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Settings instance this folder writes to, if any
    pub fn base(&self) -> Option<Arc<Settings>> {
        match &self.source {
            FolderSource::Attached(base) => base.upgrade(),
            FolderSource::Detached { .. } => None,
        }
    }

    fn ready_base(&self, operation: &str) -> GatewayResult<Arc<Settings>> {
        self.base().ok_or_else(|| GatewayError::not_ready(operation))
    }

    fn view(&self) -> Option<(Arc<Schema>, Map<String, Value>)> {
        match &self.source {
            FolderSource::Attached(base) => {
                let base = base.upgrade()?;
                Some((base.schema(), base.values_snapshot()))
            }
            FolderSource::Detached { schema, values } => Some((schema.clone(), values.clone())),
        }
    }

    /// Value or nested folder at a relative path
    pub fn get(&self, path: &str) -> Option<SettingsNode> {
        let (schema, values) = self.view()?;
        let full = join_path(&self.path, path);
        match schema.get(&full)? {
            SchemaNode::Entry(entry) => Some(SettingsNode::Value(read_entry(entry, &values))),
            SchemaNode::Folder(_) => Some(SettingsNode::Folder(Self {
                path: full,
                source: self.source.clone(),
            })),
        }
    }

    /// Plain values for each path, `None` for unknown paths
    pub fn pluck(&self, paths: &[&str]) -> Vec<Option<Value>> {
        paths
            .iter()
            .map(|path| self.get(path).map(|node| node.to_value()))
            .collect()
    }

    /// Like [`pluck`](Self::pluck), passing entry values through their serializer
    pub async fn resolve(&self, paths: &[&str]) -> GatewayResult<Vec<Option<Value>>> {
        self.ready_base("resolve")?
            .resolve_at(&self.path, paths)
            .await
    }

    /// Plain nested snapshot of the folder
    pub fn to_json(&self) -> Value {
        match self.view() {
            Some((schema, values)) => match schema.folder_at(&self.path) {
                Some(folder) => Value::Object(read_folder(folder, &values)),
                None => Value::Object(Map::new()),
            },
            None => Value::Object(Map::new()),
        }
    }

    /// Update one key
    pub async fn update(
        &self,
        key: &str,
        value: Value,
        options: UpdateOptions,
    ) -> GatewayResult<Vec<Change>> {
        self.ready_base("update")?
            .update_at(&self.path, vec![(key.to_string(), value)], &options)
            .await
    }

    /// Update several keys in one batch
    pub async fn update_many<K>(
        &self,
        pairs: impl IntoIterator<Item = (K, Value)>,
        options: UpdateOptions,
    ) -> GatewayResult<Vec<Change>>
    where
        K: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        self.ready_base("update")?
            .update_at(&self.path, pairs, &options)
            .await
    }

    /// Update every leaf of a nested object
    pub async fn update_object(
        &self,
        object: Value,
        options: UpdateOptions,
    ) -> GatewayResult<Vec<Change>> {
        let base = self.ready_base("update")?;
        let pairs = expect_object(&self.path, object)?.into_iter().collect();
        base.update_at(&self.path, pairs, &options).await
    }

    /// Reset one key (or every leaf of a folder) to its default
    pub async fn reset(&self, key: &str, options: ResetOptions) -> GatewayResult<Vec<Change>> {
        self.ready_base("reset")?
            .reset_at(&self.path, vec![key.to_string()], &options)
            .await
    }

    /// Reset several keys in one batch
    pub async fn reset_many<K>(
        &self,
        keys: impl IntoIterator<Item = K>,
        options: ResetOptions,
    ) -> GatewayResult<Vec<Change>>
    where
        K: Into<String>,
    {
        let keys = keys.into_iter().map(Into::into).collect();
        self.ready_base("reset")?
            .reset_at(&self.path, keys, &options)
            .await
    }

    /// Reset the leaves named by a nested object, ignoring its values
    pub async fn reset_object(
        &self,
        object: Value,
        options: ResetOptions,
    ) -> GatewayResult<Vec<Change>> {
        let base = self.ready_base("reset")?;
        let object = expect_object(&self.path, object)?;
        base.reset_object_at(&self.path, &object, &options).await
    }

    /// Reset every leaf of the folder
    pub async fn reset_all(&self, options: ResetOptions) -> GatewayResult<Vec<Change>> {
        let base = self.ready_base("reset")?;
        let keys = base
            .schema()
            .folder_at(&self.path)
            .map(|folder| folder.keys().map(str::to_string).collect())
            .unwrap_or_default();
        base.reset_at(&self.path, keys, &options).await
    }
}

fn expect_object(path: &str, object: Value) -> GatewayResult<Map<String, Value>> {
    match object {
        Value::Object(object) => Ok(object),
        other => Err(GatewayError::InvalidValue {
            path: path.to_string(),
            message: format!("expected an object, got {other}"),
        }),
    }
}

impl fmt::Debug for SettingsFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsFolder")
            .field("path", &self.path)
            .field("attached", &matches!(self.source, FolderSource::Attached(_)))
            .field("values", &self.to_json())
            .finish()
    }
}
