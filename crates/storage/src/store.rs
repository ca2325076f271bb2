//! Environment-namespaced column store
//!
//! The store is a registry of ordered tables keyed by namespaced name:
//! Testing environments prefix every table name with `test_`, so test and
//! production data can never collide even against the same store process.
//! Table creation and deletion are privileged lifecycle operations and fail
//! outside the Testing environment.

use dashmap::DashMap;
use plume_core::{
    encode_field, serialize_row_key, Environment, Error, Result, RowValues, Schema,
};
use std::sync::Arc;
use tracing::debug;

use crate::entity::Entity;
use crate::scan::ScanOptions;
use crate::table::{RowColumns, Table};

/// CRUD plus range/prefix scans over ordered column-family tables
#[derive(Debug)]
pub struct ColumnStore {
    env: Environment,
    tables: DashMap<String, Arc<Table>>,
}

impl ColumnStore {
    /// Create a store for the given environment
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            tables: DashMap::new(),
        }
    }

    /// The environment this store was constructed for
    pub fn environment(&self) -> Environment {
        self.env
    }

    /// Namespaced table name for a schema
    pub fn table_name(&self, schema: &Schema) -> String {
        if self.env.is_testing() {
            format!("test_{}", schema.table)
        } else {
            schema.table.to_string()
        }
    }

    /// Create the table for a schema. Testing-only; a no-op if the table
    /// already exists.
    pub fn create_table(&self, schema: &Schema) -> Result<()> {
        if !self.env.is_testing() {
            return Err(Error::ProductionForbidden("create_table"));
        }
        let name = self.table_name(schema);
        self.tables.entry(name).or_insert_with(|| Arc::new(Table::new()));
        Ok(())
    }

    /// Drop the table for a schema. Testing-only.
    pub fn drop_table(&self, schema: &Schema) -> Result<()> {
        if !self.env.is_testing() {
            return Err(Error::ProductionForbidden("drop_table"));
        }
        let name = self.table_name(schema);
        self.tables.remove(&name);
        Ok(())
    }

    /// Register a pre-provisioned table
    ///
    /// Production tables are provisioned out-of-band; this attaches the
    /// store to one without going through the Testing-only lifecycle path.
    pub fn attach_table(&self, schema: &Schema) {
        let name = self.table_name(schema);
        self.tables.entry(name).or_insert_with(|| Arc::new(Table::new()));
    }

    fn table(&self, schema: &Schema) -> Result<Arc<Table>> {
        let name = self.table_name(schema);
        self.tables
            .get(&name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::UnknownTable(name))
    }

    /// Serialize the schema's declared columns from `values`
    ///
    /// Fields without a value are skipped without saving, matching the
    /// overwrite-full-column-set mutation model.
    fn serialize_columns(schema: &Schema, values: &RowValues) -> Result<RowColumns> {
        let mut columns = RowColumns::new();
        for field in schema.columns {
            let Some(value) = values.get(field.name) else {
                continue;
            };
            let qualifier = field
                .qualifier()
                .ok_or_else(|| Error::Codec {
                    field: field.name.to_string(),
                    reason: "column field has no family".to_string(),
                })?;
            columns.insert(qualifier, encode_field(field, value)?);
        }
        Ok(columns)
    }

    /// Write the full column set for the row keyed by `values`
    pub fn put(&self, schema: &Schema, values: &RowValues) -> Result<()> {
        let row_key = serialize_row_key(schema, values)?;
        let columns = Self::serialize_columns(schema, values)?;
        self.table(schema)?.put(row_key, columns)
    }

    /// Build the row key and columns from `values`, write them, and return
    /// the stored entity
    pub fn create(&self, schema: &Schema, values: RowValues) -> Result<Entity> {
        self.put(schema, &values)?;
        Ok(Entity::from_values(values))
    }

    /// Read the entity stored under the row key built from `key_values`
    pub fn get(&self, schema: &Schema, key_values: &RowValues) -> Result<Option<Entity>> {
        let row_key = serialize_row_key(schema, key_values)?;
        let table = self.table(schema)?;
        match table.row(&row_key) {
            Some(columns) => Ok(Some(Entity::from_row(schema, &row_key, &columns)?)),
            None => Ok(None),
        }
    }

    /// Delete the row keyed by `key_values`. Returns whether a row existed.
    pub fn delete(&self, schema: &Schema, key_values: &RowValues) -> Result<bool> {
        let row_key = serialize_row_key(schema, key_values)?;
        Ok(self.table(schema)?.delete(&row_key))
    }

    /// Range/prefix scan returning decoded entities
    pub fn scan(&self, schema: &Schema, opts: &ScanOptions) -> Result<Vec<Entity>> {
        let (start, stop) = opts.resolve(schema)?;
        debug!(
            table = %self.table_name(schema),
            reverse = opts.reverse,
            limit = ?opts.limit,
            "column store scan"
        );
        let rows = self.table(schema)?.range(
            start.as_deref(),
            stop.as_deref(),
            opts.reverse,
            opts.limit,
        );
        rows.iter()
            .map(|(key, columns)| Entity::from_row(schema, key, columns))
            .collect()
    }

    /// Number of rows in a schema's table
    pub fn row_count(&self, schema: &Schema) -> Result<usize> {
        Ok(self.table(schema)?.len())
    }
}
