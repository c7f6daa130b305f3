//! Settings Gateway
//!
//! Schema-driven, per-entity settings store with pluggable persistence.
//! A [`Gateway`] binds a [`Schema`] to a provider table and caches one
//! [`Settings`] instance per entity id; updates and resets are validated and
//! diffed against the schema before they are persisted.

// Public exports
pub mod contract;
pub use contract::{
    ArrayAction, ExistenceStatus, GatewayError, GatewayResult, Provider, ResetOptions, Row,
    Serializer, SerializerContext, UpdateOptions,
};

pub mod config;
pub use config::{Config, GatewayConfig};

pub mod domain;
pub use domain::{
    Change, EntryOptions, EventPublisher, Gateway, GatewayDriver, NoOpEventPublisher,
    ProviderRegistry, Schema, SchemaEntry, SchemaFolder, SchemaNode, SerializerRegistry,
    Settings, SettingsEvent, SettingsFolder, SettingsNode,
};

pub mod infra;
pub use infra::{BroadcastEventPublisher, InMemoryProvider, JsonSchemaSerializer, SeaOrmProvider};
