//! Provider trait for settings persistence
//!
//! A provider stores one table per gateway, keyed by entity id. Rows are
//! untyped nested JSON objects; a stored row always carries its `id`.
//! Implementations are in infra/storage.

use anyhow::Result;
use async_trait::async_trait;

/// A stored row: nested key/value structure including `id`
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Table-oriented storage backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Check whether a table exists
    async fn has_table(&self, table: &str) -> Result<bool>;

    /// Create a table
    async fn create_table(&self, table: &str) -> Result<()>;

    /// Delete a table and all its rows
    async fn delete_table(&self, table: &str) -> Result<()>;

    /// Insert a new row
    async fn create(&self, table: &str, id: &str, data: &Row) -> Result<()>;

    /// Deep-merge `data` into an existing row
    async fn update(&self, table: &str, id: &str, data: &Row) -> Result<()>;

    /// Overwrite an existing row, keeping its id
    async fn replace(&self, table: &str, id: &str, data: &Row) -> Result<()>;

    /// Delete a row
    async fn delete(&self, table: &str, id: &str) -> Result<()>;

    /// Fetch a row
    async fn get(&self, table: &str, id: &str) -> Result<Option<Row>>;

    /// Fetch all rows, or only the rows with the given ids
    async fn get_all(&self, table: &str, ids: Option<&[String]>) -> Result<Vec<Row>>;

    /// List the ids stored in a table
    async fn get_keys(&self, table: &str) -> Result<Vec<String>>;

    /// Check whether a row exists
    async fn has(&self, table: &str, id: &str) -> Result<bool>;
}
