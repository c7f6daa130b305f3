//! Named registries for providers and serializers
//!
//! Gateways hold the registries behind `Arc`s and resolve entries by name on
//! every lookup, so registrations and removals are visible to existing
//! gateways.

use crate::contract::{Provider, Serializer};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Provider name -> provider
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
    default: RwLock<Option<String>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any provider with the same name
    pub fn register(&self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.write().insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.read().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.providers.read().contains_key(name)
    }

    /// Remove a provider, returning whether one was registered
    pub fn delete(&self, name: &str) -> bool {
        self.providers.write().remove(name).is_some()
    }

    pub fn clear(&self) {
        self.providers.write().clear();
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Name of the default provider
    pub fn default_name(&self) -> Option<String> {
        self.default.read().clone()
    }

    pub fn set_default(&self, name: Option<String>) {
        *self.default.write() = name;
    }

    /// The default provider, if its name is set and registered
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        let name = self.default_name()?;
        self.get(&name)
    }
}

/// Lowercase type name -> serializer
#[derive(Default)]
pub struct SerializerRegistry {
    serializers: RwLock<HashMap<String, Arc<dyn Serializer>>>,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a serializer under a type name (case-insensitive)
    pub fn register(&self, type_name: &str, serializer: Arc<dyn Serializer>) {
        self.serializers
            .write()
            .insert(type_name.to_lowercase(), serializer);
    }

    /// Make `alias` resolve to the serializer registered under `type_name`
    ///
    /// Returns false when `type_name` is not registered.
    pub fn alias(&self, alias: &str, type_name: &str) -> bool {
        let mut serializers = self.serializers.write();
        match serializers.get(&type_name.to_lowercase()).cloned() {
            Some(serializer) => {
                serializers.insert(alias.to_lowercase(), serializer);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn Serializer>> {
        self.serializers
            .read()
            .get(&type_name.to_lowercase())
            .cloned()
    }

    pub fn has(&self, type_name: &str) -> bool {
        self.serializers
            .read()
            .contains_key(&type_name.to_lowercase())
    }

    pub fn delete(&self, type_name: &str) -> bool {
        self.serializers
            .write()
            .remove(&type_name.to_lowercase())
            .is_some()
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.serializers.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::InMemoryProvider;

    #[test]
    fn test_provider_registry_default() {
        let registry = ProviderRegistry::new();
        assert!(registry.default_provider().is_none());

        registry.set_default(Some("memory".to_string()));
        assert!(registry.default_provider().is_none());

        registry.register("memory", Arc::new(InMemoryProvider::new()));
        assert!(registry.has("memory"));
        assert_eq!(registry.len(), 1);
        assert!(registry.default_provider().is_some());

        assert!(registry.delete("memory"));
        assert!(!registry.delete("memory"));
        assert!(registry.default_provider().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_serializer_registry_is_case_insensitive() {
        let registry = SerializerRegistry::with_builtins();

        assert!(registry.has("String"));
        assert!(registry.has("any"));
        assert!(registry.has("object"));
        assert!(!registry.has("textchannel"));

        assert!(registry.alias("TextChannel", "string"));
        assert!(registry.has("textchannel"));
        assert!(!registry.alias("role", "missing"));

        assert!(registry.delete("textchannel"));
        assert!(!registry.names().contains(&"textchannel".to_string()));
    }
}
