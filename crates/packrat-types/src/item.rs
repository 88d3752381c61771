use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::id::Id;
use crate::record::ID_FIELD;
use crate::validate::is_invalid_item;

/// Payload of an item.
///
/// The store never looks inside a body; it only carries it between the
/// caller, the in-memory map, and the log.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// Map-like item. The `id` field is held by [`Item`], never in the map.
    Fields(Map<String, Value>),
    /// Sequence-like item.
    Elements(Vec<Value>),
}

impl Body {
    pub fn is_fields(&self) -> bool {
        matches!(self, Self::Fields(_))
    }

    pub fn is_elements(&self) -> bool {
        matches!(self, Self::Elements(_))
    }
}

/// A validated item that has not been admitted to a store yet.
///
/// `id` is `None` when the caller left it out; the store allocates one on
/// admission. Sequence-like input never carries an id.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub id: Option<Id>,
    pub body: Body,
}

impl Candidate {
    /// Validate raw JSON as an item.
    ///
    /// Fails with [`TypeError::InvalidItem`] unless the value is an object or
    /// an array, then with [`TypeError::InvalidId`] if an `id` field is
    /// present but unusable.
    pub fn from_value(value: Value) -> Result<Self, TypeError> {
        if is_invalid_item(&value) {
            return Err(TypeError::InvalidItem);
        }
        match value {
            Value::Object(mut fields) => {
                let id = match fields.remove(ID_FIELD) {
                    Some(raw) => Some(Id::from_value(&raw)?),
                    None => None,
                };
                Ok(Self {
                    id,
                    body: Body::Fields(fields),
                })
            }
            Value::Array(elements) => Ok(Self {
                id: None,
                body: Body::Elements(elements),
            }),
            _ => Err(TypeError::InvalidItem),
        }
    }

    /// Admit this candidate under `id`.
    pub fn into_item(self, id: Id) -> Item {
        Item { id, body: self.body }
    }
}

/// An item owned by a store: an id plus an opaque body.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    id: Id,
    body: Body,
}

impl Item {
    pub fn new(id: Id, body: Body) -> Self {
        Self { id, body }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Look up a field of a map-like item. `"id"` resolves to the item id.
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == ID_FIELD {
            return Some(self.id.to_value());
        }
        match &self.body {
            Body::Fields(fields) => fields.get(name).cloned(),
            Body::Elements(_) => None,
        }
    }

    /// Elements of a sequence-like item.
    pub fn elements(&self) -> Option<&[Value]> {
        match &self.body {
            Body::Elements(elements) => Some(elements),
            Body::Fields(_) => None,
        }
    }

    /// The item as the caller would see it: an object carrying its `id`, or
    /// the bare array for sequence-like items.
    pub fn to_value(&self) -> Value {
        match &self.body {
            Body::Fields(fields) => {
                let mut map = Map::with_capacity(fields.len() + 1);
                map.insert(ID_FIELD.to_string(), self.id.to_value());
                for (key, value) in fields {
                    map.insert(key.clone(), value.clone());
                }
                Value::Object(map)
            }
            Body::Elements(elements) => Value::Array(elements.clone()),
        }
    }

    pub fn into_parts(self) -> (Id, Body) {
        (self.id, self.body)
    }
}
