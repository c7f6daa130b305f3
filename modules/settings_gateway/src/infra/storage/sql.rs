//! SeaORM provider implementation
//!
//! One SQL table per gateway with two columns: `id` (primary key) and `data`,
//! the JSON text of the row without its id. Table names are dynamic, so
//! statements are built with sea-query rather than entities.

use crate::contract::{Provider, Row};
use crate::domain::util::merge_objects;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use sea_orm::sea_query::{Alias, ColumnDef, Expr, Order, Query, Table};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, QueryResult, Statement};
use serde_json::Value;
use std::sync::Arc;

const ID: &str = "id";
const DATA: &str = "data";

pub struct SeaOrmProvider {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmProvider {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn backend(&self) -> DatabaseBackend {
        self.db.get_database_backend()
    }

    async fn write_data(&self, table: &str, id: &str, data: &Row) -> Result<()> {
        let stmt = Query::update()
            .table(Alias::new(table))
            .value(Alias::new(DATA), encode(data)?)
            .and_where(Expr::col(Alias::new(ID)).eq(id))
            .to_owned();
        let result = self.db.execute(self.backend().build(&stmt)).await?;
        if result.rows_affected() == 0 {
            bail!("Entry '{id}' does not exist in table '{table}'");
        }
        Ok(())
    }
}

/// JSON text of a row, without its id
fn encode(data: &Row) -> Result<String> {
    let mut stored = data.clone();
    stored.remove(ID);
    Ok(serde_json::to_string(&stored)?)
}

/// Rebuild a row from a `(id, data)` result
fn decode(result: &QueryResult) -> Result<Row> {
    let id: String = result.try_get("", ID)?;
    let data: String = result.try_get("", DATA)?;
    let stored: Row = serde_json::from_str(&data)
        .map_err(|e| anyhow!("Corrupted data for entry '{id}': {e}"))?;

    let mut row = Row::new();
    row.insert(ID.to_string(), Value::String(id));
    row.extend(stored);
    Ok(row)
}

#[async_trait]
impl Provider for SeaOrmProvider {
    async fn has_table(&self, table: &str) -> Result<bool> {
        let backend = self.backend();
        let sql = match backend {
            DatabaseBackend::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?"
            }
            DatabaseBackend::Postgres => {
                "SELECT table_name FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = $1"
            }
            DatabaseBackend::MySql => {
                "SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?"
            }
        };
        let stmt = Statement::from_sql_and_values(backend, sql, [table.into()]);
        Ok(self.db.query_one(stmt).await?.is_some())
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        let stmt = Table::create()
            .table(Alias::new(table))
            .col(
                ColumnDef::new(Alias::new(ID))
                    .string_len(255)
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(Alias::new(DATA)).text().not_null())
            .to_owned();
        self.db.execute(self.backend().build(&stmt)).await?;
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        let stmt = Table::drop().table(Alias::new(table)).to_owned();
        self.db.execute(self.backend().build(&stmt)).await?;
        Ok(())
    }

    async fn create(&self, table: &str, id: &str, data: &Row) -> Result<()> {
        let mut stmt = Query::insert();
        stmt.into_table(Alias::new(table))
            .columns([Alias::new(ID), Alias::new(DATA)])
            .values([Expr::value(id.to_string()), Expr::value(encode(data)?)])?;
        self.db.execute(self.backend().build(&stmt)).await?;
        Ok(())
    }

    async fn update(&self, table: &str, id: &str, data: &Row) -> Result<()> {
        let mut row = self
            .get(table, id)
            .await?
            .ok_or_else(|| anyhow!("Entry '{id}' does not exist in table '{table}'"))?;
        let mut patch = data.clone();
        patch.remove(ID);
        merge_objects(&mut row, &patch);
        self.write_data(table, id, &row).await
    }

    async fn replace(&self, table: &str, id: &str, data: &Row) -> Result<()> {
        self.write_data(table, id, data).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let stmt = Query::delete()
            .from_table(Alias::new(table))
            .and_where(Expr::col(Alias::new(ID)).eq(id))
            .to_owned();
        let result = self.db.execute(self.backend().build(&stmt)).await?;
        if result.rows_affected() == 0 {
            bail!("Entry '{id}' does not exist in table '{table}'");
        }
        Ok(())
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Row>> {
        let stmt = Query::select()
            .columns([Alias::new(ID), Alias::new(DATA)])
            .from(Alias::new(table))
            .and_where(Expr::col(Alias::new(ID)).eq(id))
            .to_owned();
        match self.db.query_one(self.backend().build(&stmt)).await? {
            Some(result) => Ok(Some(decode(&result)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self, table: &str, ids: Option<&[String]>) -> Result<Vec<Row>> {
        let mut stmt = Query::select();
        stmt.columns([Alias::new(ID), Alias::new(DATA)])
            .from(Alias::new(table))
            .order_by(Alias::new(ID), Order::Asc);
        if let Some(ids) = ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            stmt.and_where(Expr::col(Alias::new(ID)).is_in(ids.iter().map(String::as_str)));
        }

        self.db
            .query_all(self.backend().build(&stmt))
            .await?
            .iter()
            .map(decode)
            .collect()
    }

    async fn get_keys(&self, table: &str) -> Result<Vec<String>> {
        let stmt = Query::select()
            .column(Alias::new(ID))
            .from(Alias::new(table))
            .order_by(Alias::new(ID), Order::Asc)
            .to_owned();
        let results = self.db.query_all(self.backend().build(&stmt)).await?;
        results
            .iter()
            .map(|result| Ok(result.try_get::<String>("", ID)?))
            .collect()
    }

    async fn has(&self, table: &str, id: &str) -> Result<bool> {
        let stmt = Query::select()
            .column(Alias::new(ID))
            .from(Alias::new(table))
            .and_where(Expr::col(Alias::new(ID)).eq(id))
            .to_owned();
        Ok(self.db.query_one(self.backend().build(&stmt)).await?.is_some())
    }
}
