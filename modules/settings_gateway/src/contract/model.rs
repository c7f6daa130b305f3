//! Contract models for the settings gateway
//!
//! These models are transport-agnostic option and status types shared by the
//! settings engine and its callers.

use serde_json::Value;

/// Whether the backing row of a settings instance has been checked and found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistenceStatus {
    /// Never synchronized, defaults only
    #[default]
    Unsynchronized,
    /// A row exists in the provider
    Exists,
    /// No row exists in the provider
    NotExists,
}

/// How an update mutates an array entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayAction {
    /// Remove the values if all are stored, add the missing ones otherwise
    #[default]
    Auto,
    /// Append (or insert at the index) values that are not stored yet
    Add,
    /// Remove stored values (or positions starting at the index)
    Remove,
    /// Replace the whole array
    Overwrite,
}

/// Options for `update` calls
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Array mutation semantics
    pub array_action: ArrayAction,
    /// Position used by array actions
    pub array_index: Option<usize>,
    /// Reject non-configurable entries
    pub only_configurable: bool,
    /// Opaque value forwarded to notifications
    pub extra_context: Option<Value>,
}

impl UpdateOptions {
    /// Options with the given array action
    pub fn with_action(array_action: ArrayAction) -> Self {
        Self {
            array_action,
            ..Self::default()
        }
    }

    /// Set the array index
    pub fn at_index(mut self, index: usize) -> Self {
        self.array_index = Some(index);
        self
    }

    /// Enable the configurable gate
    pub fn only_configurable(mut self) -> Self {
        self.only_configurable = true;
        self
    }

    /// Attach an extra context value
    pub fn with_extra_context(mut self, extra: Value) -> Self {
        self.extra_context = Some(extra);
        self
    }
}

/// Options for `reset` calls
#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    /// Reject non-configurable entries
    pub only_configurable: bool,
    /// Opaque value forwarded to notifications
    pub extra_context: Option<Value>,
}

impl ResetOptions {
    /// Enable the configurable gate
    pub fn only_configurable(mut self) -> Self {
        self.only_configurable = true;
        self
    }

    /// Attach an extra context value
    pub fn with_extra_context(mut self, extra: Value) -> Self {
        self.extra_context = Some(extra);
        self
    }
}
