//! Field-mask derivation for PATCH requests.
//!
//! When a PATCH request carries no update mask, the gateway derives one from
//! the fields actually present in the raw JSON body, so that only those fields
//! are updated instead of the whole resource.
//!
//! The body is read against a [`MaskFields`] table generated for the body's
//! message type. Only singular message fields are descended into; map and
//! repeated fields, and anything else, end a path.

use std::collections::VecDeque;
use std::fmt;

use prost_types::FieldMask;
use serde_json::{Map, Value};
use thiserror::Error;

/// Failures while deriving a field mask
#[derive(Debug, Error)]
pub enum FieldMaskError {
    /// The body is not valid JSON
    #[error("invalid request body: {0}")]
    Json(#[from] serde_json::Error),
    /// The body is JSON but not an object
    #[error("request body must be a JSON object to derive a field mask")]
    NotAnObject,
    /// A key names no field of the message it appears in
    #[error("unknown field {path:?} in request body")]
    UnknownField {
        /// Dotted path of the key, proto names up to the unknown one
        path: String,
    },
}

/// Fields of one message, as seen by mask derivation
#[derive(Debug)]
pub struct MaskFields {
    fields: &'static [MaskField],
}

impl MaskFields {
    /// Table over `fields`
    pub const fn new(fields: &'static [MaskField]) -> Self { Self { fields } }

    /// Field whose proto name or JSON name is `key`
    pub fn find(&self, key: &str) -> Option<&MaskField> {
        self.fields.iter().find(|field| field.name == key || field.json_name == key)
    }
}

/// One field of a [`MaskFields`] table
#[derive(Debug)]
pub struct MaskField {
    /// Proto field name
    pub name: &'static str,
    /// lowerCamelCase JSON name
    pub json_name: &'static str,
    /// How a present value is treated
    pub kind: MaskKind,
}

impl MaskField {
    /// A field that always ends a path
    pub const fn leaf(name: &'static str, json_name: &'static str) -> Self {
        Self { name, json_name, kind: MaskKind::Leaf }
    }

    /// A singular message field whose fields are listed in `fields`
    pub const fn message(name: &'static str, json_name: &'static str, fields: &'static MaskFields) -> Self {
        Self { name, json_name, kind: MaskKind::Message(fields) }
    }
}

/// Shape of a masked field
#[derive(Clone, Copy)]
pub enum MaskKind {
    /// Scalar, enum, repeated, map or well-known type
    Leaf,
    /// Singular message
    Message(&'static MaskFields),
}

// Tables may be cyclic; print only the shape.
impl fmt::Debug for MaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskKind::Leaf => f.write_str("Leaf"),
            MaskKind::Message(fields) => write!(f, "Message({} fields)", fields.fields.len()),
        }
    }
}

/// Derive a field mask listing every leaf field present in `body`.
///
/// Keys are resolved against `fields` by proto or JSON name and reported by
/// proto name. A message field holding a non-empty object is descended into;
/// any other value is a leaf. A key that names no field is an error. An empty
/// body yields an empty mask.
pub fn from_request_body(body: &[u8], fields: &MaskFields) -> Result<FieldMask, FieldMaskError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FieldMask::default());
    }
    let root: Value = serde_json::from_slice(body)?;
    let Value::Object(root) = root else {
        return Err(FieldMaskError::NotAnObject);
    };

    let mut paths = Vec::new();
    let mut queue: VecDeque<(String, &MaskFields, Map<String, Value>)> = VecDeque::from([(String::new(), fields, root)]);
    while let Some((prefix, table, object)) = queue.pop_front() {
        for (key, value) in object {
            let Some(field) = table.find(&key) else {
                return Err(FieldMaskError::UnknownField { path: join(&prefix, &key) });
            };
            let path = join(&prefix, field.name);
            match (field.kind, value) {
                (MaskKind::Message(nested), Value::Object(children)) if !children.is_empty() => {
                    queue.push_back((path, nested, children));
                }
                _ => paths.push(path),
            }
        }
    }
    paths.sort();
    Ok(FieldMask { paths })
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
