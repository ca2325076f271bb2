//! Statically declared entity schemas
//!
//! An entity schema is an explicit, const-declared value: an ordered list of
//! row-key field descriptors plus a list of column descriptors. There is no
//! runtime scanning of type members — the declaration order of `row_key` is
//! the encode order, and exactly the same order is used for decode.

use crate::value::FieldValue;

/// Scalar kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned integer, 16-digit zero-padded token
    Integer,
    /// Microsecond timestamp, same token rules as integers
    Timestamp,
}

/// Declaration of a single field within an entity schema
///
/// Row-key fields have `family: None`; column fields name the column family
/// their value is stored under (`family:fieldname` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, unique within the schema
    pub name: &'static str,
    /// Scalar kind
    pub kind: FieldKind,
    /// Reverse the encoded character sequence so numerically adjacent
    /// values scatter across the keyspace instead of clustering on one
    /// shard
    pub reverse: bool,
    /// Column family for column fields, `None` for row-key fields
    pub family: Option<&'static str>,
}

impl FieldDescriptor {
    /// A row-key field
    pub const fn key(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            reverse: false,
            family: None,
        }
    }

    /// A row-key field with the reverse-sort transform
    pub const fn key_reversed(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            reverse: true,
            family: None,
        }
    }

    /// A column field stored under the given family
    pub const fn column(name: &'static str, kind: FieldKind, family: &'static str) -> Self {
        Self {
            name,
            kind,
            reverse: false,
            family: Some(family),
        }
    }

    /// Wire qualifier for a column field: `family:fieldname`
    ///
    /// Returns `None` for row-key fields.
    pub fn qualifier(&self) -> Option<String> {
        self.family.map(|cf| format!("{}:{}", cf, self.name))
    }

    /// Whether the given value matches this field's declared kind
    pub fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self.kind, value),
            (FieldKind::Integer, FieldValue::Int(_))
                | (FieldKind::Timestamp, FieldValue::Timestamp(_))
        )
    }
}

/// Static schema for one entity type
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    /// Base table name, namespaced per environment by the column store
    pub table: &'static str,
    /// Row-key fields in declared (encode and decode) order
    pub row_key: &'static [FieldDescriptor],
    /// Column fields
    pub columns: &'static [FieldDescriptor],
}

impl Schema {
    /// Look up a column descriptor by field name
    pub fn column(&self, name: &str) -> Option<&FieldDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up any descriptor (row-key or column) by field name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.row_key
            .iter()
            .chain(self.columns.iter())
            .find(|f| f.name == name)
    }

    /// Distinct column families declared by this schema
    pub fn families(&self) -> Vec<&'static str> {
        let mut families: Vec<&'static str> = self.columns.iter().filter_map(|c| c.family).collect();
        families.sort_unstable();
        families.dedup();
        families
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDGES: Schema = Schema {
        table: "edges",
        row_key: &[
            FieldDescriptor::key_reversed("owner_id", FieldKind::Integer),
            FieldDescriptor::key("created_at", FieldKind::Timestamp),
        ],
        columns: &[FieldDescriptor::column("peer_id", FieldKind::Integer, "cf")],
    };

    #[test]
    fn test_row_key_order_is_declaration_order() {
        assert_eq!(EDGES.row_key[0].name, "owner_id");
        assert_eq!(EDGES.row_key[1].name, "created_at");
        assert!(EDGES.row_key[0].reverse);
        assert!(!EDGES.row_key[1].reverse);
    }

    #[test]
    fn test_qualifier() {
        let peer = EDGES.column("peer_id").unwrap();
        assert_eq!(peer.qualifier(), Some("cf:peer_id".to_string()));
        assert_eq!(EDGES.row_key[0].qualifier(), None);
    }

    #[test]
    fn test_field_lookup() {
        assert!(EDGES.field("owner_id").is_some());
        assert!(EDGES.field("peer_id").is_some());
        assert!(EDGES.field("missing").is_none());
        assert!(EDGES.column("owner_id").is_none());
    }

    #[test]
    fn test_families() {
        assert_eq!(EDGES.families(), vec!["cf"]);
    }

    #[test]
    fn test_accepts() {
        use crate::Timestamp;
        let owner = EDGES.field("owner_id").unwrap();
        assert!(owner.accepts(&FieldValue::Int(1)));
        assert!(!owner.accepts(&FieldValue::Timestamp(Timestamp::EPOCH)));
    }
}
