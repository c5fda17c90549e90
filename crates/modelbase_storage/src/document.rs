//! Stored entity documents.
//!
//! A [`Document`] is an ordered JSON object. Typed accessors report absent
//! keys as [`ErrorKind::MissingField`](modelbase_foundation::ErrorKind::MissingField)
//! and wrongly typed values as
//! [`ErrorKind::InvalidField`](modelbase_foundation::ErrorKind::InvalidField).
//! The `*_or` accessors are reserved for fields that are versioned as optional;
//! they fall back to the given default and log the fallback.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use modelbase_foundation::{EntityIdentity, Error, Result, number};

/// Key holding the entity identifier.
pub const ENTITY_ID_KEY: &str = "EntityID";
/// Key holding the entity version.
pub const VERSION_KEY: &str = "Version";
/// Key holding the entity type tag.
pub const SCHEMA_TYPE_KEY: &str = "SchemaType";

/// Returns the key under which the schema version of `type_name` is stored.
#[must_use]
pub fn schema_version_key(type_name: &str) -> String {
    format!("schemaVersion_{type_name}")
}

/// An ordered JSON object persisted for one entity version.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Json>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing JSON object.
    #[must_use]
    pub fn from_map(fields: Map<String, Json>) -> Self {
        Self { fields }
    }

    /// Parses a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the text is not a JSON object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::serialization(e.to_string()))
    }

    /// Renders the document as JSON text.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        Json::Object(self.fields.clone()).to_string()
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Json> {
        &self.fields
    }

    /// Consumes the document, returning the JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Json> {
        self.fields
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Json>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Sets `key` to a number, keeping NaN and the infinities readable.
    pub fn insert_f64(&mut self, key: impl Into<String>, value: f64) {
        self.fields.insert(key.into(), number::to_json(value));
    }

    /// Sets `key` to an array of numbers, keeping NaN and the infinities readable.
    pub fn insert_f64_array(&mut self, key: impl Into<String>, values: &[f64]) {
        self.fields.insert(key.into(), number::array_to_json(values));
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Json> {
        self.fields.shift_remove(key)
    }

    /// Returns the raw value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Json> {
        self.fields.get(key)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns the raw value under `key`, or a missing field error.
    ///
    /// # Errors
    ///
    /// Returns a missing field error if `key` is absent.
    pub fn require(&self, key: &str) -> Result<&Json> {
        self.fields.get(key).ok_or_else(|| Error::missing_field(key))
    }

    /// Reads an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_u64(&self, key: &str) -> Result<u64> {
        self.require(key)?
            .as_u64()
            .ok_or_else(|| Error::invalid_field(key, "unsigned integer"))
    }

    /// Reads a signed integer.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.require(key)?
            .as_i64()
            .ok_or_else(|| Error::invalid_field(key, "integer"))
    }

    /// Reads a number as `f64`. Integers are accepted.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_f64(&self, key: &str) -> Result<f64> {
        number::from_json(self.require(key)?).ok_or_else(|| Error::invalid_field(key, "number"))
    }

    /// Reads a boolean.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| Error::invalid_field(key, "boolean"))
    }

    /// Reads a string.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| Error::invalid_field(key, "string"))
    }

    /// Reads an array.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_array(&self, key: &str) -> Result<&Vec<Json>> {
        self.require(key)?
            .as_array()
            .ok_or_else(|| Error::invalid_field(key, "array"))
    }

    /// Reads an array of unsigned integers.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_u64_array(&self, key: &str) -> Result<Vec<u64>> {
        self.get_array(key)?
            .iter()
            .map(|v| v.as_u64().ok_or_else(|| Error::invalid_field(key, "array of unsigned integers")))
            .collect()
    }

    /// Reads an array of signed integers.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_i64_array(&self, key: &str) -> Result<Vec<i64>> {
        self.get_array(key)?
            .iter()
            .map(|v| v.as_i64().ok_or_else(|| Error::invalid_field(key, "array of integers")))
            .collect()
    }

    /// Reads an array of numbers.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_f64_array(&self, key: &str) -> Result<Vec<f64>> {
        self.get_array(key)?
            .iter()
            .map(|v| number::from_json(v).ok_or_else(|| Error::invalid_field(key, "array of numbers")))
            .collect()
    }

    /// Reads an array of booleans.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_bool_array(&self, key: &str) -> Result<Vec<bool>> {
        self.get_array(key)?
            .iter()
            .map(|v| v.as_bool().ok_or_else(|| Error::invalid_field(key, "array of booleans")))
            .collect()
    }

    /// Reads an array of strings.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn get_string_array(&self, key: &str) -> Result<Vec<String>> {
        self.get_array(key)?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| Error::invalid_field(key, "array of strings"))
            })
            .collect()
    }

    /// Reads an optional boolean, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns an invalid field error if the key is present with another type.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        if self.fields.contains_key(key) {
            self.get_bool(key)
        } else {
            tracing::warn!(field = key, default, "optional field missing, using default");
            Ok(default)
        }
    }

    /// Reads an optional string, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns an invalid field error if the key is present with another type.
    pub fn str_or(&self, key: &str, default: &str) -> Result<String> {
        if self.fields.contains_key(key) {
            self.get_str(key).map(str::to_owned)
        } else {
            tracing::warn!(field = key, default, "optional field missing, using default");
            Ok(default.to_owned())
        }
    }

    /// Reads an optional unsigned integer, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns an invalid field error if the key is present with another type.
    pub fn u64_or(&self, key: &str, default: u64) -> Result<u64> {
        if self.fields.contains_key(key) {
            self.get_u64(key)
        } else {
            tracing::warn!(field = key, default, "optional field missing, using default");
            Ok(default)
        }
    }

    /// Reads the `(EntityID, Version)` pair.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn identity(&self) -> Result<EntityIdentity> {
        Ok(EntityIdentity::new(
            self.get_u64(ENTITY_ID_KEY)?,
            self.get_u64(VERSION_KEY)?,
        ))
    }

    /// Reads the entity type tag.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error.
    pub fn schema_type(&self) -> Result<&str> {
        self.get_str(SCHEMA_TYPE_KEY)
    }
}

impl From<Map<String, Json>> for Document {
    fn from(fields: Map<String, Json>) -> Self {
        Self::from_map(fields)
    }
}
