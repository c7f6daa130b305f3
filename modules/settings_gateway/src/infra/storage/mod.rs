//! Storage layer - provider implementations

pub mod memory;
pub mod sql;

pub use memory::InMemoryProvider;
pub use sql::SeaOrmProvider;
