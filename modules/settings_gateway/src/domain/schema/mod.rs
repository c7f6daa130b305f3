//! Schema tree
//!
//! A [`Schema`] is the root folder of a tree of [`SchemaFolder`]s and
//! [`SchemaEntry`] leaves. It is editable until a gateway initializes it,
//! after which every mutating entry point fails with `AlreadyReady`.

mod entry;
mod folder;

pub use entry::{EntryOptions, SchemaEntry, ValueFilter};
pub use folder::{SchemaFolder, SchemaNode};

use crate::contract::{GatewayError, GatewayResult};
use crate::domain::registry::SerializerRegistry;
use std::ops::Deref;

/// Root schema folder with a ready flag
#[derive(Debug, Clone, Default)]
pub struct Schema {
    root: SchemaFolder,
    ready: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the schema is frozen
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Create or edit an entry, see [`SchemaFolder::add`]
    pub fn add(
        &mut self,
        key: &str,
        type_name: &str,
        options: EntryOptions,
    ) -> GatewayResult<&mut Self> {
        self.ensure_editable()?;
        self.root.add(key, type_name, options)?;
        Ok(self)
    }

    /// Create or edit a folder, see [`SchemaFolder::add_folder`]
    pub fn add_folder<F>(&mut self, key: &str, build: F) -> GatewayResult<&mut Self>
    where
        F: FnOnce(&mut SchemaFolder) -> GatewayResult<()>,
    {
        self.ensure_editable()?;
        self.root.add_folder(key, build)?;
        Ok(self)
    }

    /// Remove a direct child of the root
    pub fn delete(&mut self, key: &str) -> GatewayResult<bool> {
        self.ensure_editable()?;
        Ok(self.root.delete(key))
    }

    /// Check every entry of the tree, aggregating all violations
    pub fn validate(&self, serializers: &SerializerRegistry) -> GatewayResult<()> {
        let mut errors = Vec::new();
        self.root.check(serializers, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::SchemaValidation { errors })
        }
    }

    /// Mark the schema as ready; it cannot be edited afterwards
    pub(crate) fn freeze(&mut self) {
        self.ready = true;
    }

    fn ensure_editable(&self) -> GatewayResult<()> {
        if self.ready {
            Err(GatewayError::AlreadyReady)
        } else {
            Ok(())
        }
    }
}

impl Deref for Schema {
    type Target = SchemaFolder;

    fn deref(&self) -> &Self::Target {
        &self.root
    }
}
