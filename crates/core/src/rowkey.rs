//! Row-key codec: composite key construction and parsing
//!
//! A row key is the ordered tuple of a schema's row-key field values, each
//! encoded to a token by the field codec and joined with the reserved `:`
//! separator. Serialized keys sort the entity inside its ordered table, so
//! encode order is exactly the schema's declared field order.
//!
//! Scan bounds are built from *partial* tuples: `prefix_key` fixes leading
//! fields, and `bound_key` accepts a trailing `None` sentinel that sorts
//! after any concretely-valued key sharing the same leading fields.

use crate::codec::{decode_field, encode_field, SEPARATOR};
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::value::FieldValue;
use std::collections::BTreeMap;

/// Decoded field values, keyed by field name
pub type RowValues = BTreeMap<String, FieldValue>;

/// Sentinel byte for the unbounded trailing tuple element
///
/// Tokens contain only decimal digits and keys only digits plus the `:`
/// separator, so `~` (0x7E) sorts after every concretely-valued key that
/// shares the preceding fields.
const UNBOUNDED_SENTINEL: u8 = b'~';

/// Serialize a full row key from field values
///
/// Encodes each row-key field in declared order and joins the tokens with
/// the reserved separator.
///
/// # Errors
///
/// `BadRowKey` if a row-key field is absent from `values` or an encoded
/// token contains the separator.
pub fn serialize_row_key(schema: &Schema, values: &RowValues) -> Result<Vec<u8>> {
    let mut tokens = Vec::with_capacity(schema.row_key.len());
    for field in schema.row_key {
        let value = values
            .get(field.name)
            .ok_or_else(|| Error::BadRowKey(format!("{} is not set", field.name)))?;
        let token = encode_field(field, value)?;
        if token.contains(SEPARATOR) {
            return Err(Error::BadRowKey(format!(
                "{} must not contain '{}' in encoded value {:?}",
                field.name, SEPARATOR, token
            )));
        }
        tokens.push(token);
    }
    Ok(tokens.join(&SEPARATOR.to_string()).into_bytes())
}

/// Deserialize a row key back into field values
///
/// Appends a trailing separator so every token ends with one, then splits
/// greedily in schema order. Tokens beyond the declared row-key fields are
/// ignored (forward-compatible extra key segments). Running out of tokens
/// stops deserialization early without failing — callers must treat a
/// partially populated key as router-level only, not as a valid stored
/// entity, unless every key field resolved.
pub fn deserialize_row_key(schema: &Schema, bytes: &[u8]) -> Result<RowValues> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::BadRowKey("row key is not valid UTF-8".to_string()))?;

    let mut values = RowValues::new();
    // Trailing separator makes every token boundary a separator search
    let padded = format!("{}{}", text, SEPARATOR);
    let mut rest: &str = &padded;

    for field in schema.row_key {
        let Some(index) = rest.find(SEPARATOR) else {
            break;
        };
        let token = &rest[..index];
        values.insert(field.name.to_string(), decode_field(field, token)?);
        rest = &rest[index + 1..];
    }
    Ok(values)
}

/// Build the byte prefix covering all keys whose leading fields equal the
/// given values
///
/// With fewer parts than the schema's row-key arity the prefix ends with a
/// separator, so it matches exactly the keys extending it; with full arity
/// it is the exact key.
pub fn prefix_key(schema: &Schema, parts: &[FieldValue]) -> Result<Vec<u8>> {
    if parts.len() > schema.row_key.len() {
        return Err(Error::BadRowKey(format!(
            "prefix has {} fields but the schema declares {}",
            parts.len(),
            schema.row_key.len()
        )));
    }
    let mut tokens = Vec::with_capacity(parts.len());
    for (field, value) in schema.row_key.iter().zip(parts) {
        tokens.push(encode_field(field, value)?);
    }
    let mut key = tokens.join(&SEPARATOR.to_string()).into_bytes();
    if parts.len() < schema.row_key.len() {
        key.push(SEPARATOR as u8);
    }
    Ok(key)
}

/// Build a scan bound from a partial tuple with optional `None` sentinels
///
/// Concrete leading values encode as usual. The first `None` emits the
/// unbounded sentinel, which sorts after any concretely-valued key sharing
/// the preceding fields; elements after it are ignored, as are elements
/// beyond the schema's row-key arity. Returns `None` when the tuple is
/// empty or starts with `None` (fully unbounded).
pub fn bound_key(schema: &Schema, parts: &[Option<FieldValue>]) -> Result<Option<Vec<u8>>> {
    let mut key: Vec<u8> = Vec::new();
    let mut wrote_any = false;

    for (field, part) in schema.row_key.iter().zip(parts) {
        match part {
            Some(value) => {
                if wrote_any {
                    key.push(SEPARATOR as u8);
                }
                key.extend_from_slice(encode_field(field, value)?.as_bytes());
                wrote_any = true;
            }
            None => {
                if !wrote_any {
                    return Ok(None);
                }
                key.push(SEPARATOR as u8);
                key.push(UNBOUNDED_SENTINEL);
                return Ok(Some(key));
            }
        }
    }

    if wrote_any {
        Ok(Some(key))
    } else {
        Ok(None)
    }
}
