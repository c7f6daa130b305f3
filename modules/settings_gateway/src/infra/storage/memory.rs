//! In-memory provider

use crate::contract::{Provider, Row};
use crate::domain::util::merge_objects;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

type Table = IndexMap<String, Row>;

/// Provider keeping every table in process memory
///
/// Creating an existing table or row fails, as does touching a missing one.
#[derive(Default)]
pub struct InMemoryProvider {
    tables: RwLock<HashMap<String, Table>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_table<R>(&self, table: &str, f: impl FnOnce(&mut Table) -> Result<R>) -> Result<R> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("Table '{table}' does not exist"))?;
        f(rows)
    }

    fn read_table<R>(&self, table: &str, f: impl FnOnce(&Table) -> R) -> Result<R> {
        let tables = self.tables.read();
        let rows = tables
            .get(table)
            .ok_or_else(|| anyhow!("Table '{table}' does not exist"))?;
        Ok(f(rows))
    }
}

/// Stored form of a row: `id` first, then the data without any `id` key
fn stored_row(id: &str, data: &Row) -> Row {
    let mut row = Row::new();
    row.insert("id".to_string(), Value::String(id.to_string()));
    for (key, value) in data {
        if key != "id" {
            row.insert(key.clone(), value.clone());
        }
    }
    row
}

#[async_trait]
impl Provider for InMemoryProvider {
    async fn has_table(&self, table: &str) -> Result<bool> {
        Ok(self.tables.read().contains_key(table))
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(table) {
            bail!("Table '{table}' already exists");
        }
        tables.insert(table.to_string(), Table::new());
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        match self.tables.write().remove(table) {
            Some(_) => Ok(()),
            None => bail!("Table '{table}' does not exist"),
        }
    }

    async fn create(&self, table: &str, id: &str, data: &Row) -> Result<()> {
        self.with_table(table, |rows| {
            if rows.contains_key(id) {
                bail!("Entry '{id}' already exists in table '{table}'");
            }
            rows.insert(id.to_string(), stored_row(id, data));
            Ok(())
        })
    }

    async fn update(&self, table: &str, id: &str, data: &Row) -> Result<()> {
        self.with_table(table, |rows| {
            let row = rows
                .get_mut(id)
                .ok_or_else(|| anyhow!("Entry '{id}' does not exist in table '{table}'"))?;
            merge_objects(row, &stored_row(id, data));
            Ok(())
        })
    }

    async fn replace(&self, table: &str, id: &str, data: &Row) -> Result<()> {
        self.with_table(table, |rows| {
            let row = rows
                .get_mut(id)
                .ok_or_else(|| anyhow!("Entry '{id}' does not exist in table '{table}'"))?;
            *row = stored_row(id, data);
            Ok(())
        })
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        self.with_table(table, |rows| match rows.shift_remove(id) {
            Some(_) => Ok(()),
            None => bail!("Entry '{id}' does not exist in table '{table}'"),
        })
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Row>> {
        self.read_table(table, |rows| rows.get(id).cloned())
    }

    async fn get_all(&self, table: &str, ids: Option<&[String]>) -> Result<Vec<Row>> {
        self.read_table(table, |rows| match ids {
            Some(ids) => ids.iter().filter_map(|id| rows.get(id).cloned()).collect(),
            None => rows.values().cloned().collect(),
        })
    }

    async fn get_keys(&self, table: &str) -> Result<Vec<String>> {
        self.read_table(table, |rows| rows.keys().cloned().collect())
    }

    async fn has(&self, table: &str, id: &str) -> Result<bool> {
        self.read_table(table, |rows| rows.contains_key(id))
    }
}
