//! Contract layer - public types shared with callers and collaborators
//!
//! This layer contains the error type, option/status models and the traits
//! the core consumes but does not implement (providers and serializers).

pub mod error;
pub mod model;
pub mod provider;
pub mod serializer;

pub use error::{GatewayError, GatewayResult};
pub use model::{ArrayAction, ExistenceStatus, ResetOptions, UpdateOptions};
pub use provider::{Provider, Row};
pub use serializer::{Serializer, SerializerContext};
