//! Domain layer - schema tree, settings engine and gateways

pub mod driver;
pub mod events;
pub mod gateway;
pub mod registry;
pub mod schema;
pub mod settings;
pub mod util;

pub use driver::GatewayDriver;
pub use events::{EventPublisher, NoOpEventPublisher, SettingsEvent, UpdateContext};
pub use gateway::{Gateway, GatewayBuilder};
pub use registry::{ProviderRegistry, SerializerRegistry};
pub use schema::{EntryOptions, Schema, SchemaEntry, SchemaFolder, SchemaNode};
pub use settings::{Change, Settings, SettingsFolder, SettingsNode, SettingsTarget};
