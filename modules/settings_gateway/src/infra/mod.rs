//! Infrastructure layer - concrete providers, serializers and publishers

pub mod events;
pub mod serializers;
pub mod storage;

pub use events::BroadcastEventPublisher;
pub use serializers::JsonSchemaSerializer;
pub use storage::{InMemoryProvider, SeaOrmProvider};
