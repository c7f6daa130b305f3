//! Schema folders - ordered internal nodes of the schema tree

use super::entry::{EntryOptions, SchemaEntry};
use crate::contract::{GatewayError, GatewayResult};
use crate::domain::registry::SerializerRegistry;
use crate::domain::util::join_path;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A node of the schema tree
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Entry(SchemaEntry),
    Folder(SchemaFolder),
}

impl SchemaNode {
    pub fn key(&self) -> &str {
        match self {
            SchemaNode::Entry(entry) => entry.key(),
            SchemaNode::Folder(folder) => folder.key(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            SchemaNode::Entry(entry) => entry.path(),
            SchemaNode::Folder(folder) => folder.path(),
        }
    }

    pub fn as_entry(&self) -> Option<&SchemaEntry> {
        match self {
            SchemaNode::Entry(entry) => Some(entry),
            SchemaNode::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&SchemaFolder> {
        match self {
            SchemaNode::Entry(_) => None,
            SchemaNode::Folder(folder) => Some(folder),
        }
    }

    /// Default value of the node, a nested object for folders
    pub fn default_value(&self) -> Value {
        match self {
            SchemaNode::Entry(entry) => entry.default_value(),
            SchemaNode::Folder(folder) => Value::Object(folder.default_values()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SchemaNode::Entry(entry) => entry.to_json(),
            SchemaNode::Folder(folder) => folder.to_json(),
        }
    }
}

/// Ordered mapping of child keys to entries or nested folders
#[derive(Debug, Clone, Default)]
pub struct SchemaFolder {
    key: String,
    path: String,
    children: IndexMap<String, SchemaNode>,
}

impl SchemaFolder {
    /// Create an empty folder under `parent_path`
    pub fn new(parent_path: &str, key: &str) -> Self {
        Self {
            key: key.to_string(),
            path: join_path(parent_path, key),
            children: IndexMap::new(),
        }
    }

    /// Folder key, empty for the root
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Dot path, empty for the root
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Create an entry at `key`, or merge `options` into the existing one
    pub fn add(
        &mut self,
        key: &str,
        type_name: &str,
        options: EntryOptions,
    ) -> GatewayResult<&mut Self> {
        match self.children.get_mut(key) {
            Some(SchemaNode::Entry(entry)) => entry.edit(Some(type_name), options),
            Some(SchemaNode::Folder(_)) => {
                return Err(GatewayError::TypeConflict {
                    key: key.to_string(),
                    expected: "a non-Folder".to_string(),
                    got: "Folder".to_string(),
                })
            }
            None => {
                let entry = SchemaEntry::new(&self.path, key, type_name, options);
                self.children
                    .insert(key.to_string(), SchemaNode::Entry(entry));
            }
        }
        Ok(self)
    }

    /// Create a folder at `key` (or reuse the existing one) and run `build` on it
    pub fn add_folder<F>(&mut self, key: &str, build: F) -> GatewayResult<&mut Self>
    where
        F: FnOnce(&mut SchemaFolder) -> GatewayResult<()>,
    {
        if let Some(SchemaNode::Entry(entry)) = self.children.get(key) {
            return Err(GatewayError::TypeConflict {
                key: key.to_string(),
                expected: "type \"Folder\"".to_string(),
                got: entry.type_name().to_string(),
            });
        }

        let path = self.path.clone();
        let node = self
            .children
            .entry(key.to_string())
            .or_insert_with(|| SchemaNode::Folder(SchemaFolder::new(&path, key)));
        if let SchemaNode::Folder(folder) = node {
            build(folder)?;
        }
        Ok(self)
    }

    /// Remove a direct child
    pub fn delete(&mut self, key: &str) -> bool {
        self.children.shift_remove(key).is_some()
    }

    /// Dot path lookup relative to this folder
    pub fn get(&self, path: &str) -> Option<&SchemaNode> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let node = self.children.get(head)?;
        match rest {
            None => Some(node),
            Some(rest) => node.as_folder()?.get(rest),
        }
    }

    /// Folder lookup where the empty path is this folder
    pub fn folder_at(&self, path: &str) -> Option<&SchemaFolder> {
        if path.is_empty() {
            return Some(self);
        }
        self.get(path)?.as_folder()
    }

    pub fn get_entry(&self, path: &str) -> Option<&SchemaEntry> {
        self.get(path)?.as_entry()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &SchemaNode> {
        self.children.values()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.children.iter().map(|(key, node)| (key.as_str(), node))
    }

    /// Leaf keys of the whole subtree, depth-first in insertion order
    pub fn keys_deep(&self) -> Vec<&str> {
        self.values_deep().into_iter().map(SchemaEntry::key).collect()
    }

    /// Leaf entries of the whole subtree, depth-first in insertion order
    pub fn values_deep(&self) -> Vec<&SchemaEntry> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    /// Leaf `(key, entry)` pairs of the whole subtree
    pub fn entries_deep(&self) -> Vec<(&str, &SchemaEntry)> {
        self.values_deep()
            .into_iter()
            .map(|entry| (entry.key(), entry))
            .collect()
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a SchemaEntry>) {
        for node in self.children.values() {
            match node {
                SchemaNode::Entry(entry) => leaves.push(entry),
                SchemaNode::Folder(folder) => folder.collect_leaves(leaves),
            }
        }
    }

    /// Nested default-value object mirroring this folder
    pub fn default_values(&self) -> Map<String, Value> {
        self.children
            .iter()
            .map(|(key, node)| (key.clone(), node.default_value()))
            .collect()
    }

    /// Nested plain representation of the folder
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.children
                .iter()
                .map(|(key, node)| (key.clone(), node.to_json()))
                .collect(),
        )
    }

    /// Collect violations of every entry below this folder
    pub(crate) fn check(&self, serializers: &SerializerRegistry, errors: &mut Vec<String>) {
        for entry in self.values_deep() {
            errors.extend(entry.check(serializers));
        }
    }
}
