use super::BatchSink;
use crate::{
    error::IngestError,
    product::{column, Product, PRODUCT_COLUMNS},
};
use log::{debug, info};
use postgres::{types::Type, Client, NoTls, Statement};
use std::{str::FromStr, time::Instant};

/// SQL text for every statement issued against the destination table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawQueries {
    pub create: String,
    pub truncate: String,
    pub insert: String,
}

impl RawQueries {
    pub fn new(table: &str) -> Self {
        let columns = PRODUCT_COLUMNS
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ");

        let definitions = PRODUCT_COLUMNS
            .iter()
            .map(|c| {
                let primary_key = if c.name == column::ID.name {
                    " PRIMARY KEY"
                } else {
                    ""
                };
                format!("{} {}{primary_key}", c.name, c.kind.sql_type())
            })
            .collect::<Vec<_>>()
            .join(", ");

        // The whole batch travels as one JSON array parameter and is expanded
        // server side, so every batch is a single statement regardless of
        // its size.
        Self {
            create: format!(r#"CREATE TABLE IF NOT EXISTS "{table}" ({definitions})"#),
            truncate: format!(r#"TRUNCATE TABLE "{table}""#),
            insert: format!(
                r#"INSERT INTO "{table}" ({columns}) SELECT {columns} FROM jsonb_populate_recordset(NULL::"{table}", $1::jsonb) ON CONFLICT ({}) DO NOTHING"#,
                column::ID.name
            ),
        }
    }
}

/// Writes batches into a PostgreSQL table over a single connection.
pub struct PostgresSink {
    client: Client,
    table: String,
    queries: RawQueries,
    insert: Option<Statement>,
}

impl PostgresSink {
    pub fn connect(url: &str, table: &str) -> Result<Self, IngestError> {
        let config = postgres::Config::from_str(url)
            .map_err(|e| IngestError::database("parsing the connection string", e))?;
        let client = config
            .connect(NoTls)
            .map_err(|e| IngestError::database("connecting", e))?;
        debug!("postgres: connected, writing to table '{table}'");

        Ok(Self {
            client,
            table: table.to_string(),
            queries: RawQueries::new(table),
            insert: None,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of rows currently stored in the destination table.
    pub fn count_rows(&mut self) -> Result<i64, IngestError> {
        let row = self
            .client
            .query_one(&format!(r#"SELECT COUNT(*) FROM "{}""#, self.table), &[])
            .map_err(|e| IngestError::database("counting rows", e))?;
        Ok(row.get(0))
    }

    fn insert_statement(&mut self) -> Result<Statement, IngestError> {
        if let Some(statement) = &self.insert {
            return Ok(statement.clone());
        }

        let statement = self
            .client
            .prepare_typed(&self.queries.insert, &[Type::VARCHAR])
            .map_err(|e| {
                IngestError::database(
                    format!("preparing insert statement `{}`", self.queries.insert),
                    e,
                )
            })?;
        self.insert = Some(statement.clone());
        Ok(statement)
    }
}

impl BatchSink for PostgresSink {
    fn prepare(&mut self) -> Result<(), IngestError> {
        self.client
            .batch_execute(&self.queries.create)
            .map_err(|e| IngestError::database(format!("creating table '{}'", self.table), e))?;
        self.client
            .batch_execute(&self.queries.truncate)
            .map_err(|e| IngestError::database(format!("truncating table '{}'", self.table), e))?;
        self.insert_statement()?;

        info!("postgres: table '{}' is ready", self.table);
        Ok(())
    }

    fn insert_batch(&mut self, products: &[Product]) -> Result<u64, IngestError> {
        if products.is_empty() {
            return Ok(0);
        }

        let statement = self.insert_statement()?;
        let payload = serde_json::to_string(products)?;

        let start = Instant::now();
        let written = self
            .client
            .execute(&statement, &[&payload])
            .map_err(|e| {
                IngestError::database(format!("inserting {} rows", products.len()), e)
            })?;

        debug!(
            "postgres: wrote {written} of {} rows ({} bytes) in {:?}",
            products.len(),
            payload.len(),
            start.elapsed()
        );
        Ok(written)
    }
}
