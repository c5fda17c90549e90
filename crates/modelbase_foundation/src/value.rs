//! Typed property values.

use serde_json::{Map, Value as Json};

use crate::types::PropertyType;
use crate::{Error, Result, number};

/// Value held by an entity property.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// 64-bit floating point.
    Double(f64),
    /// 64-bit signed integer.
    Integer(i64),
    /// Boolean flag.
    Boolean(bool),
    /// Free text.
    String(String),
    /// One choice out of a list of options.
    Selection {
        /// The allowed choices.
        options: Vec<String>,
        /// The current choice.
        value: String,
    },
    /// RGB color.
    Color {
        /// Red component.
        r: f64,
        /// Green component.
        g: f64,
        /// Blue component.
        b: f64,
    },
    /// Reference to an entity inside a named container.
    EntityList {
        /// Name of the container the choices come from.
        container_name: String,
        /// Identifier of that container.
        container_id: u64,
        /// Name of the selected entity.
        value_name: String,
        /// Identifier of the selected entity.
        value_id: u64,
    },
}

impl PropertyValue {
    /// Returns the type of this value.
    #[must_use]
    pub const fn value_type(&self) -> PropertyType {
        match self {
            Self::Double(_) => PropertyType::Double,
            Self::Integer(_) => PropertyType::Integer,
            Self::Boolean(_) => PropertyType::Boolean,
            Self::String(_) => PropertyType::String,
            Self::Selection { .. } => PropertyType::Selection,
            Self::Color { .. } => PropertyType::Color,
            Self::EntityList { .. } => PropertyType::EntityList,
        }
    }

    /// Creates a selection value.
    #[must_use]
    pub fn selection<S: Into<String>>(options: impl IntoIterator<Item = S>, value: impl Into<String>) -> Self {
        Self::Selection {
            options: options.into_iter().map(Into::into).collect(),
            value: value.into(),
        }
    }

    /// Attempts to extract a double value.
    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to extract a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to extract text: a string, a selection choice, or a selected entity name.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Selection { value, .. } => Some(value),
            Self::EntityList { value_name, .. } => Some(value_name),
            _ => None,
        }
    }

    /// Attempts to extract a color as `[r, g, b]`.
    #[must_use]
    pub const fn as_color(&self) -> Option<[f64; 3]> {
        match self {
            Self::Color { r, g, b } => Some([*r, *g, *b]),
            _ => None,
        }
    }

    /// Checks internal consistency (a selection's choice must be one of its options).
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for an invalid selection.
    pub fn validate(&self) -> Result<()> {
        if let Self::Selection { options, value } = self {
            if !options.is_empty() && !options.iter().any(|o| o == value) {
                return Err(Error::precondition(format!(
                    "selection value {value:?} is not one of the options"
                )));
            }
        }
        Ok(())
    }

    /// Writes the value-specific members of a property snapshot object.
    pub fn write_json(&self, object: &mut Map<String, Json>) {
        match self {
            Self::Double(v) => {
                object.insert("Value".into(), number::to_json(*v));
            }
            Self::Integer(v) => {
                object.insert("Value".into(), Json::from(*v));
            }
            Self::Boolean(v) => {
                object.insert("Value".into(), Json::from(*v));
            }
            Self::String(v) => {
                object.insert("Value".into(), Json::from(v.as_str()));
            }
            Self::Selection { options, value } => {
                object.insert("Value".into(), Json::from(value.as_str()));
                object.insert("Options".into(), Json::from(options.clone()));
            }
            Self::Color { r, g, b } => {
                object.insert("R".into(), number::to_json(*r));
                object.insert("G".into(), number::to_json(*g));
                object.insert("B".into(), number::to_json(*b));
            }
            Self::EntityList {
                container_name,
                container_id,
                value_name,
                value_id,
            } => {
                object.insert("ContainerName".into(), Json::from(container_name.as_str()));
                object.insert("ContainerID".into(), Json::from(*container_id));
                object.insert("ValueName".into(), Json::from(value_name.as_str()));
                object.insert("ValueID".into(), Json::from(*value_id));
            }
        }
    }

    /// Reads a value of type `ty` from a property snapshot object.
    ///
    /// # Errors
    ///
    /// Returns a missing or invalid field error naming the offending member.
    pub fn read_json(ty: PropertyType, object: &Map<String, Json>) -> Result<Self> {
        Ok(match ty {
            PropertyType::Double => Self::Double(member_f64(object, "Value")?),
            PropertyType::Integer => Self::Integer(
                member(object, "Value")?
                    .as_i64()
                    .ok_or_else(|| Error::invalid_field("Value", "integer"))?,
            ),
            PropertyType::Boolean => Self::Boolean(
                member(object, "Value")?
                    .as_bool()
                    .ok_or_else(|| Error::invalid_field("Value", "boolean"))?,
            ),
            PropertyType::String => Self::String(member_str(object, "Value")?),
            PropertyType::Selection => {
                let options = member(object, "Options")?
                    .as_array()
                    .ok_or_else(|| Error::invalid_field("Options", "array of strings"))?
                    .iter()
                    .map(|o| {
                        o.as_str()
                            .map(str::to_owned)
                            .ok_or_else(|| Error::invalid_field("Options", "array of strings"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::Selection {
                    options,
                    value: member_str(object, "Value")?,
                }
            }
            PropertyType::Color => Self::Color {
                r: member_f64(object, "R")?,
                g: member_f64(object, "G")?,
                b: member_f64(object, "B")?,
            },
            PropertyType::EntityList => Self::EntityList {
                container_name: member_str(object, "ContainerName")?,
                container_id: member_u64(object, "ContainerID")?,
                value_name: member_str(object, "ValueName")?,
                value_id: member_u64(object, "ValueID")?,
            },
        })
    }
}

fn member<'a>(object: &'a Map<String, Json>, key: &str) -> Result<&'a Json> {
    object.get(key).ok_or_else(|| Error::missing_field(key))
}

fn member_f64(object: &Map<String, Json>, key: &str) -> Result<f64> {
    number::from_json(member(object, key)?).ok_or_else(|| Error::invalid_field(key, "number"))
}

fn member_u64(object: &Map<String, Json>, key: &str) -> Result<u64> {
    member(object, key)?
        .as_u64()
        .ok_or_else(|| Error::invalid_field(key, "unsigned integer"))
}

fn member_str(object: &Map<String, Json>, key: &str) -> Result<String> {
    member(object, key)?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::invalid_field(key, "string"))
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}
