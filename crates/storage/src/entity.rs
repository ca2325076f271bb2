//! Decoded entity rows
//!
//! An `Entity` is the decoded form of one stored row: the row-key field
//! values plus the column values, all keyed by field name. Entities are
//! immutable snapshots — mutation happens by re-writing the full column set
//! under the same row key through the store.

use plume_core::{
    decode_field, deserialize_row_key, ContentId, Error, FieldValue, Result, RowValues, Schema,
    Timestamp, UserId,
};

use crate::table::RowColumns;

/// One decoded row: row-key fields plus column fields, by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    values: RowValues,
}

impl Entity {
    /// Build an entity from a stored row
    ///
    /// Decodes the row key in schema order, then each column value with the
    /// column family stripped from the qualifier. Columns not declared by
    /// the schema are ignored.
    pub fn from_row(schema: &Schema, row_key: &[u8], columns: &RowColumns) -> Result<Self> {
        let mut values = deserialize_row_key(schema, row_key)?;
        for (qualifier, raw) in columns {
            // qualifier is "family:fieldname"
            let name = match qualifier.split_once(':') {
                Some((_, name)) => name,
                None => qualifier.as_str(),
            };
            if let Some(field) = schema.column(name) {
                values.insert(name.to_string(), decode_field(field, raw)?);
            }
        }
        Ok(Self { values })
    }

    /// Build an entity directly from decoded values
    pub fn from_values(values: RowValues) -> Self {
        Self { values }
    }

    /// All decoded values
    pub fn values(&self) -> &RowValues {
        &self.values
    }

    /// A single field value by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Integer field accessor
    pub fn int(&self, name: &str) -> Result<u64> {
        self.get(name)
            .and_then(FieldValue::as_int)
            .ok_or_else(|| Error::Codec {
                field: name.to_string(),
                reason: "missing or non-integer field".to_string(),
            })
    }

    /// Timestamp field accessor
    pub fn timestamp(&self, name: &str) -> Result<Timestamp> {
        self.get(name)
            .and_then(FieldValue::as_timestamp)
            .ok_or_else(|| Error::Codec {
                field: name.to_string(),
                reason: "missing or non-timestamp field".to_string(),
            })
    }

    /// Integer field as a `UserId`
    pub fn user_id(&self, name: &str) -> Result<UserId> {
        Ok(UserId(self.int(name)?))
    }

    /// Integer field as a `ContentId`
    pub fn content_id(&self, name: &str) -> Result<ContentId> {
        Ok(ContentId(self.int(name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_core::{serialize_row_key, FieldDescriptor, FieldKind};

    const EDGES: Schema = Schema {
        table: "edges",
        row_key: &[
            FieldDescriptor::key("owner_id", FieldKind::Integer),
            FieldDescriptor::key("created_at", FieldKind::Timestamp),
        ],
        columns: &[FieldDescriptor::column("peer_id", FieldKind::Integer, "cf")],
    };

    fn sample_row() -> (Vec<u8>, RowColumns) {
        let mut values = RowValues::new();
        values.insert("owner_id".to_string(), FieldValue::Int(1));
        values.insert(
            "created_at".to_string(),
            FieldValue::Timestamp(Timestamp::from_micros(99)),
        );
        let key = serialize_row_key(&EDGES, &values).unwrap();

        let mut columns = RowColumns::new();
        columns.insert("cf:peer_id".to_string(), "0000000000000007".to_string());
        (key, columns)
    }

    #[test]
    fn test_from_row_decodes_key_and_columns() {
        let (key, columns) = sample_row();
        let entity = Entity::from_row(&EDGES, &key, &columns).unwrap();
        assert_eq!(entity.int("owner_id").unwrap(), 1);
        assert_eq!(
            entity.timestamp("created_at").unwrap(),
            Timestamp::from_micros(99)
        );
        assert_eq!(entity.int("peer_id").unwrap(), 7);
    }

    #[test]
    fn test_undeclared_columns_ignored() {
        let (key, mut columns) = sample_row();
        columns.insert("cf:unknown".to_string(), "junk".to_string());
        let entity = Entity::from_row(&EDGES, &key, &columns).unwrap();
        assert!(entity.get("unknown").is_none());
        assert_eq!(entity.int("peer_id").unwrap(), 7);
    }

    #[test]
    fn test_typed_accessors() {
        let (key, columns) = sample_row();
        let entity = Entity::from_row(&EDGES, &key, &columns).unwrap();
        assert_eq!(entity.user_id("owner_id").unwrap(), UserId(1));
        assert_eq!(entity.content_id("peer_id").unwrap(), ContentId(7));
        assert!(entity.int("created_at").is_err());
        assert!(entity.timestamp("owner_id").is_err());
    }
}
