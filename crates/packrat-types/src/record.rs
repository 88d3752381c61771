//! Line codec shared by the transaction log and snapshots.
//!
//! One record per line, each a JSON object:
//!
//! ```text
//! {"id":1,"name":"rat"}              map-like item
//! {"$elements":[1,2],"id":2}         sequence-like item
//! {"deleted":true,"id":1}            tombstone
//! {"$fields":{"deleted":true},"id":3} map-like item with a reserved key
//! ```
//!
//! An object holding exactly `id` and `"deleted": true` is always a
//! tombstone. A map item whose only field is `deleted`, `$elements` or
//! `$fields` is written inside `$fields` so it cannot be read back as one of
//! the other shapes. There is no header, framing or checksum.

use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::id::Id;
use crate::item::{Body, Item};

pub const ID_FIELD: &str = "id";
pub const DELETED_FIELD: &str = "deleted";
pub const ELEMENTS_FIELD: &str = "$elements";
pub const FIELDS_FIELD: &str = "$fields";

/// Keys that give a two-key record a meaning other than "map item".
const RESERVED_FIELDS: [&str; 3] = [DELETED_FIELD, ELEMENTS_FIELD, FIELDS_FIELD];

/// A single log entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    /// Full item; replay upserts it.
    Set(Item),
    /// A prior drop; replay removes the id.
    Tombstone(Id),
}

impl Record {
    pub fn id(&self) -> &Id {
        match self {
            Self::Set(item) => item.id(),
            Self::Tombstone(id) => id,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Self::Tombstone(_))
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        match self {
            Self::Set(item) => {
                map.insert(ID_FIELD.to_string(), item.id().to_value());
                match item.body() {
                    Body::Fields(fields) if needs_wrapping(fields) => {
                        map.insert(FIELDS_FIELD.to_string(), Value::Object(fields.clone()));
                    }
                    Body::Fields(fields) => {
                        for (key, value) in fields {
                            map.insert(key.clone(), value.clone());
                        }
                    }
                    Body::Elements(elements) => {
                        map.insert(ELEMENTS_FIELD.to_string(), Value::Array(elements.clone()));
                    }
                }
            }
            Self::Tombstone(id) => {
                map.insert(ID_FIELD.to_string(), id.to_value());
                map.insert(DELETED_FIELD.to_string(), Value::Bool(true));
            }
        }
        Value::Object(map)
    }

    /// Encode as a single line, without the trailing newline.
    pub fn to_line(&self) -> Result<String, TypeError> {
        serde_json::to_string(&self.to_value()).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Decode one line. Surrounding whitespace is ignored.
    pub fn from_line(line: &str) -> Result<Self, TypeError> {
        let value: Value = serde_json::from_str(line.trim())
            .map_err(|e| TypeError::MalformedRecord(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, TypeError> {
        let Value::Object(mut map) = value else {
            return Err(TypeError::MalformedRecord("record is not an object".into()));
        };
        let raw_id = map
            .remove(ID_FIELD)
            .ok_or_else(|| TypeError::MalformedRecord("record has no id".into()))?;
        let id = Id::from_value(&raw_id)
            .map_err(|_| TypeError::MalformedRecord(format!("record has invalid id {raw_id}")))?;

        if map.len() == 1 {
            let body = match map.iter().next() {
                Some((key, Value::Bool(true))) if key == DELETED_FIELD => {
                    return Ok(Self::Tombstone(id));
                }
                Some((key, Value::Array(elements))) if key == ELEMENTS_FIELD => {
                    Some(Body::Elements(elements.clone()))
                }
                Some((key, Value::Object(fields))) if key == FIELDS_FIELD => {
                    Some(Body::Fields(fields.clone()))
                }
                _ => None,
            };
            if let Some(body) = body {
                return Ok(Self::Set(Item::new(id, body)));
            }
        }
        Ok(Self::Set(Item::new(id, Body::Fields(map))))
    }
}

/// A one-field map whose key is reserved would decode as a tombstone or a
/// sequence item unless wrapped.
fn needs_wrapping(fields: &Map<String, Value>) -> bool {
    fields.len() == 1 && fields.keys().all(|key| RESERVED_FIELDS.contains(&key.as_str()))
}
