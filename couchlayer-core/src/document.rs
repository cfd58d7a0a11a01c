//! Core traits for entities: caller-owned objects carrying an id and revision.
//!
//! An [`Entity`] is any serializable type that exposes a mutable `(id, revision)`
//! pair. Its serialized form must carry that pair under the server's field names,
//! [`ID_FIELD`] and [`REV_FIELD`] (`#[serde(rename = "_id")]` and
//! `#[serde(rename = "_rev")]`). After every successful round trip the client writes
//! the server-confirmed pair back onto the entity in place.
//!
//! # Deriving with `#[derive(Entity)]`
//!
//! ```ignore
//! use couchlayer::prelude::*;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
//! pub struct User {
//!     #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
//!     pub id: Option<String>,
//!     #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
//!     pub rev: Option<String>,
//!     pub name: String,
//! }
//! ```

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::{CouchError, CouchResult};

/// Wire name of the document identifier.
pub const ID_FIELD: &str = "_id";
/// Wire name of the document revision.
pub const REV_FIELD: &str = "_rev";

/// A document object whose identity is kept in sync with the server.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Returns the document id, if one is assigned.
    fn id(&self) -> Option<&str>;

    /// Returns the current revision, if one is known.
    fn revision(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);

    fn set_revision(&mut self, revision: String);
}

/// Field types usable as the id or revision of a derived [`Entity`].
pub trait EntityField {
    fn field_value(&self) -> Option<&str>;

    fn assign(&mut self, value: String);
}

impl EntityField for String {
    fn field_value(&self) -> Option<&str> {
        Some(self.as_str())
    }

    fn assign(&mut self, value: String) {
        *self = value;
    }
}

impl EntityField for Option<String> {
    fn field_value(&self) -> Option<&str> {
        self.as_deref()
    }

    fn assign(&mut self, value: String) {
        *self = Some(value);
    }
}

/// Raw JSON documents are entities through their `_id` and `_rev` members.
impl Entity for Value {
    fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).and_then(Value::as_str)
    }

    fn revision(&self) -> Option<&str> {
        self.get(REV_FIELD).and_then(Value::as_str)
    }

    fn set_id(&mut self, id: String) {
        if let Some(object) = self.as_object_mut() {
            object.insert(ID_FIELD.to_string(), Value::String(id));
        }
    }

    fn set_revision(&mut self, revision: String) {
        if let Some(object) = self.as_object_mut() {
            object.insert(REV_FIELD.to_string(), Value::String(revision));
        }
    }
}

/// Returns the value if it is present and not blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Extension trait providing serialization utilities for entities.
///
/// Automatically implemented for all types that implement [`Entity`].
pub trait EntityExt: Entity {
    /// Converts this entity to a JSON value.
    fn to_json(&self) -> CouchResult<Value>;

    /// Creates an entity from a JSON value.
    fn from_json(value: Value) -> CouchResult<Self>;

    /// Serializes this entity for a save request.
    ///
    /// A blank revision is removed so the server treats the write as a creation.
    /// A blank id is removed too, letting the server assign one.
    ///
    /// # Errors
    ///
    /// Returns [`CouchError::InvalidArgument`] if the entity does not serialize to a
    /// JSON object.
    fn to_save_body(&self) -> CouchResult<Value>;

    /// Writes a server-confirmed id and revision back onto this entity. Absent
    /// values leave the current ones untouched.
    fn apply_identity(&mut self, id: Option<&str>, revision: Option<&str>);
}

impl<E: Entity> EntityExt for E {
    fn to_json(&self) -> CouchResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> CouchResult<Self> {
        Ok(from_value(value)?)
    }

    fn to_save_body(&self) -> CouchResult<Value> {
        let mut body = self.to_json()?;
        let object = body
            .as_object_mut()
            .ok_or_else(|| CouchError::invalid_argument("an entity must serialize to a JSON object"))?;

        if non_blank(self.revision()).is_none() {
            object.remove(REV_FIELD);
        }
        if non_blank(self.id()).is_none() {
            object.remove(ID_FIELD);
        }

        Ok(body)
    }

    fn apply_identity(&mut self, id: Option<&str>, revision: Option<&str>) {
        if let Some(id) = id {
            self.set_id(id.to_string());
        }
        if let Some(revision) = revision {
            self.set_revision(revision.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Note {
        #[serde(rename = "_id", default)]
        id: String,
        #[serde(rename = "_rev", default)]
        rev: Option<String>,
        text: String,
    }

    impl Entity for Note {
        fn id(&self) -> Option<&str> {
            self.id.field_value()
        }

        fn revision(&self) -> Option<&str> {
            self.rev.field_value()
        }

        fn set_id(&mut self, id: String) {
            self.id.assign(id);
        }

        fn set_revision(&mut self, revision: String) {
            self.rev.assign(revision);
        }
    }

    #[test]
    fn test_save_body_omits_blank_revision_only() {
        let note = Note { id: "n1".into(), rev: Some("  ".into()), text: "hi".into() };

        assert_eq!(note.to_save_body().unwrap(), json!({"_id": "n1", "text": "hi"}));
    }

    #[test]
    fn test_save_body_omits_blank_id() {
        let note = Note { id: String::new(), rev: None, text: "hi".into() };

        assert_eq!(note.to_save_body().unwrap(), json!({"text": "hi"}));
    }

    #[test]
    fn test_save_body_keeps_present_pair() {
        let note = Note { id: "n1".into(), rev: Some("1-a".into()), text: "hi".into() };

        assert_eq!(
            note.to_save_body().unwrap(),
            json!({"_id": "n1", "_rev": "1-a", "text": "hi"})
        );
    }

    #[test]
    fn test_apply_identity() {
        let mut note = Note { id: String::new(), rev: None, text: "hi".into() };

        note.apply_identity(Some("n2"), Some("1-b"));
        assert_eq!(note.id(), Some("n2"));
        assert_eq!(note.revision(), Some("1-b"));

        note.apply_identity(None, Some("2-c"));
        assert_eq!(note.id(), Some("n2"));
        assert_eq!(note.revision(), Some("2-c"));
    }

    #[test]
    fn test_value_is_an_entity() {
        let mut doc = json!({"_id": "a", "n": 1});

        assert_eq!(Entity::id(&doc), Some("a"));
        assert_eq!(doc.revision(), None);

        doc.set_revision("1-x".into());
        assert_eq!(doc, json!({"_id": "a", "_rev": "1-x", "n": 1}));

        let mut scalar = json!(5);
        scalar.set_id("ignored".into());
        assert_eq!(scalar, json!(5));
    }

    #[test]
    fn test_non_object_entity_cannot_be_saved() {
        assert!(matches!(json!([1]).to_save_body(), Err(CouchError::InvalidArgument(_))));
    }
}
