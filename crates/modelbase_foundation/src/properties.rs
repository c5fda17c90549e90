//! Named, typed properties attached to every entity.
//!
//! A [`PropertyBag`] keeps its properties in creation order, which is also the
//! order of the JSON snapshot. Properties are keyed by `(group, name)`; lookups
//! by bare name return the first property with that name in any group.
//!
//! Two kinds of dirtiness are tracked independently:
//! - the per-property `needs_update` flag, raised by [`PropertyBag::set_value`]
//!   and consumed by whoever reacts to property edits;
//! - the bag-level `changed` flag, meaning "differs from the persisted snapshot",
//!   cleared by a successful store.

use serde_json::{Map, Value as Json};

use crate::types::PropertyType;
use crate::value::PropertyValue;
use crate::{Error, ErrorKind, Result};

/// A single named property.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    name: String,
    group: String,
    value: PropertyValue,
    read_only: bool,
    visible: bool,
    protected: bool,
    multiple_values: bool,
    needs_update: bool,
}

impl Property {
    /// Creates a visible, writable, protected property in the default (empty) group.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            group: String::new(),
            value: value.into(),
            read_only: false,
            visible: true,
            protected: true,
            multiple_values: false,
            needs_update: false,
        }
    }

    /// Builder method to set the group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Builder method to set the read-only flag.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Builder method to set the visible flag.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Builder method to set the protected flag.
    #[must_use]
    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    /// Returns the property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the group name.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Returns the declared type.
    #[must_use]
    pub fn value_type(&self) -> PropertyType {
        self.value.value_type()
    }

    /// Returns true if the property cannot be edited.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns true if the property is shown to users.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns true if the property is protected from bulk reset.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Returns true if a merged selection disagreed on this value.
    #[must_use]
    pub fn has_multiple_values(&self) -> bool {
        self.multiple_values
    }

    /// Returns true if the value was edited and not yet acted upon.
    #[must_use]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Sets the read-only flag.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Sets the visible flag.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Sets the protected flag.
    pub fn set_protected(&mut self, protected: bool) {
        self.protected = protected;
    }

    fn matches(&self, group: &str, name: &str) -> bool {
        self.group == group && self.name == name
    }

    /// Assigns a new value without flag checks. Returns the type error if incompatible.
    fn assign(&mut self, value: PropertyValue) -> Result<()> {
        let expected = self.value_type();
        let actual = value.value_type();
        if !expected.accepts(actual) {
            return Err(Error::type_mismatch(expected, actual));
        }
        value.validate()?;

        match (&mut self.value, value) {
            (PropertyValue::EntityList { value_name, value_id, .. }, PropertyValue::Selection { value, .. }) => {
                if *value_name != value {
                    *value_name = value;
                    *value_id = 0;
                }
            }
            (slot, value) => *slot = value,
        }
        Ok(())
    }

    fn to_json(&self) -> Json {
        let mut object = Map::new();
        object.insert("Name".into(), Json::from(self.name.as_str()));
        object.insert("Group".into(), Json::from(self.group.as_str()));
        object.insert("Type".into(), Json::from(self.value_type().type_string()));
        object.insert("ReadOnly".into(), Json::from(self.read_only));
        object.insert("Visible".into(), Json::from(self.visible));
        object.insert("Protected".into(), Json::from(self.protected));
        self.value.write_json(&mut object);
        Json::Object(object)
    }

    fn from_json(json: &Json) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::invalid_field("Properties", "array of objects"))?;

        let text = |key: &str| -> Result<String> {
            object
                .get(key)
                .ok_or_else(|| Error::missing_field(key))?
                .as_str()
                .map(str::to_owned)
                .ok_or_else(|| Error::invalid_field(key, "string"))
        };
        let flag = |key: &str, default: bool| -> Result<bool> {
            match object.get(key) {
                None => Ok(default),
                Some(v) => v.as_bool().ok_or_else(|| Error::invalid_field(key, "boolean")),
            }
        };

        let type_string = text("Type")?;
        let ty = PropertyType::from_type_string(&type_string)
            .ok_or_else(|| Error::invalid_field("Type", "property type string"))?;

        Ok(Self {
            name: text("Name")?,
            group: if object.contains_key("Group") {
                text("Group")?
            } else {
                String::new()
            },
            value: PropertyValue::read_json(ty, object)?,
            read_only: flag("ReadOnly", false)?,
            visible: flag("Visible", true)?,
            protected: flag("Protected", true)?,
            multiple_values: false,
            needs_update: false,
        })
    }
}

/// Ordered collection of properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyBag {
    properties: Vec<Property>,
    changed: bool,
}

impl PropertyBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true if the bag holds no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterates properties in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    /// Returns true if the bag differs from its last persisted snapshot.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Marks the bag as persisted.
    pub fn clear_changed(&mut self) {
        self.changed = false;
    }

    /// Adds a new property.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `(group, name)` already exists, or
    /// a validation error for an inconsistent value.
    pub fn create(&mut self, property: Property) -> Result<()> {
        if self.position(&property.group, &property.name).is_some() {
            return Err(Error::precondition(format!(
                "property {}/{} already exists",
                property.group, property.name
            )));
        }
        property.value.validate()?;
        self.properties.push(property);
        self.changed = true;
        Ok(())
    }

    /// Inserts `property`, replacing any property with the same `(group, name)`.
    pub fn update(&mut self, property: Property) {
        match self.position(&property.group, &property.name) {
            Some(index) => self.properties[index] = property,
            None => self.properties.push(property),
        }
        self.changed = true;
    }

    /// Removes the first property named `name`. Returns it if present.
    pub fn delete(&mut self, name: &str) -> Option<Property> {
        let index = self.properties.iter().position(|p| p.name == name)?;
        self.changed = true;
        Some(self.properties.remove(index))
    }

    /// Removes the property keyed by `(group, name)`.
    pub fn delete_in(&mut self, group: &str, name: &str) -> Option<Property> {
        let index = self.position(group, name)?;
        self.changed = true;
        Some(self.properties.remove(index))
    }

    /// Returns the first property named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns the property keyed by `(group, name)`.
    #[must_use]
    pub fn get_in(&self, group: &str, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.matches(group, name))
    }

    /// Returns the first property named `name` for editing its flags.
    ///
    /// The bag is conservatively marked changed.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        let property = self.properties.iter_mut().find(|p| p.name == name)?;
        self.changed = true;
        Some(property)
    }

    /// Returns true if a property named `name` exists in any group.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets the value of the first property named `name`.
    ///
    /// Raises the property's `needs_update` flag and marks the bag changed.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::MissingField`] if no such property exists
    /// - [`ErrorKind::ReadOnlyProperty`] if it is read-only
    /// - [`ErrorKind::TypeMismatch`] if the value has an incompatible type
    pub fn set_value(&mut self, name: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let property = self
            .properties
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::missing_field(name))?;
        if property.read_only {
            return Err(Error::new(ErrorKind::ReadOnlyProperty(name.to_owned())));
        }
        property.assign(value.into())?;
        property.multiple_values = false;
        property.needs_update = true;
        self.changed = true;
        Ok(())
    }

    /// Returns true if any property has an unconsumed edit.
    #[must_use]
    pub fn any_needs_update(&self) -> bool {
        self.properties.iter().any(|p| p.needs_update)
    }

    /// Names of properties with unconsumed edits, in creation order.
    #[must_use]
    pub fn needing_update(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|p| p.needs_update)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Clears every `needs_update` flag.
    pub fn reset_needs_update(&mut self) {
        for property in &mut self.properties {
            property.needs_update = false;
        }
    }

    /// Adds the properties of `other` that this bag does not have yet.
    pub fn merge(&mut self, other: &PropertyBag) {
        for property in &other.properties {
            if self.position(&property.group, &property.name).is_none() {
                self.properties.push(property.clone());
                self.changed = true;
            }
        }
    }

    /// Narrows this bag to what it has in common with `other`.
    ///
    /// Used to build the shared property view of a multi-selection: properties
    /// missing from `other` or of a different type are dropped, differing values
    /// are flagged as multiple values, and read-only or protected status
    /// on either side carries over.
    pub fn check_matching(&mut self, other: &PropertyBag) {
        self.properties.retain_mut(|mine| {
            let Some(theirs) = other.get_in(&mine.group, &mine.name) else {
                return false;
            };
            if theirs.value_type() != mine.value_type() {
                return false;
            }
            if theirs.value != mine.value {
                mine.multiple_values = true;
            }
            mine.read_only |= theirs.read_only;
            mine.protected |= theirs.protected;
            true
        });
    }

    /// Copies edited values from `other` into the matching writable properties.
    ///
    /// Properties of `other` flagged as multiple values carry no single value
    /// and are skipped, as are read-only targets. Nothing is changed unless
    /// every matching pair has compatible types.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for the first incompatible pair.
    pub fn read_from(&mut self, other: &PropertyBag) -> Result<()> {
        for theirs in &other.properties {
            if let Some(mine) = self.get_in(&theirs.group, &theirs.name) {
                if !mine.value_type().accepts(theirs.value_type()) {
                    return Err(Error::type_mismatch(mine.value_type(), theirs.value_type()));
                }
            }
        }

        for theirs in &other.properties {
            if theirs.multiple_values {
                continue;
            }
            let Some(index) = self.position(&theirs.group, &theirs.name) else {
                continue;
            };
            let mine = &mut self.properties[index];
            if mine.read_only || mine.value == theirs.value {
                continue;
            }
            mine.assign(theirs.value.clone())?;
            mine.needs_update = true;
            self.changed = true;
        }
        Ok(())
    }

    /// Produces the JSON snapshot persisted under `"Properties"`.
    #[must_use]
    pub fn to_json(&self) -> Json {
        Json::Array(self.properties.iter().map(Property::to_json).collect())
    }

    /// Rebuilds a bag from its JSON snapshot.
    ///
    /// The result has no pending edits and is not marked changed.
    ///
    /// # Errors
    ///
    /// Returns an invalid or missing field error for a malformed snapshot.
    pub fn from_json(json: &Json) -> Result<Self> {
        let items = json
            .as_array()
            .ok_or_else(|| Error::invalid_field("Properties", "array of objects"))?;
        let properties = items
            .iter()
            .map(Property::from_json)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            properties,
            changed: false,
        })
    }

    fn position(&self, group: &str, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.matches(group, name))
    }
}
