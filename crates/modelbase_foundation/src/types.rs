//! Type descriptors for entity properties.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type descriptor for a property value.
///
/// The type string is what the property snapshot stores under `"Type"`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    /// 64-bit floating point.
    Double,
    /// 64-bit signed integer.
    Integer,
    /// Boolean flag.
    Boolean,
    /// Free text.
    String,
    /// One choice out of a fixed list of options.
    Selection,
    /// RGB color with components in `[0, 1]`.
    Color,
    /// Reference to an entity inside a named container.
    EntityList,
}

impl PropertyType {
    /// All property types, in snapshot order.
    pub const ALL: [PropertyType; 7] = [
        Self::Double,
        Self::Integer,
        Self::Boolean,
        Self::String,
        Self::Selection,
        Self::Color,
        Self::EntityList,
    ];

    /// Returns the type string used in property snapshots.
    #[must_use]
    pub const fn type_string(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Selection => "selection",
            Self::Color => "color",
            Self::EntityList => "entitylist",
        }
    }

    /// Parses a snapshot type string.
    #[must_use]
    pub fn from_type_string(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.type_string() == s)
    }

    /// Returns true if a value of type `other` may be copied into a property of this type.
    ///
    /// A plain selection is accepted by an entity-list property, since an
    /// entity list is presented to users as a selection of entity names.
    #[must_use]
    pub const fn accepts(self, other: PropertyType) -> bool {
        matches!(
            (self, other),
            (Self::Double, Self::Double)
                | (Self::Integer, Self::Integer)
                | (Self::Boolean, Self::Boolean)
                | (Self::String, Self::String)
                | (Self::Selection, Self::Selection)
                | (Self::Color, Self::Color)
                | (Self::EntityList, Self::EntityList | Self::Selection)
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_string())
    }
}
