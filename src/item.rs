//! Item types and the records loaded from them.
//!
//! An [`ItemType`] is declared once and never mutated afterwards. Every call
//! to [`ItemType::load`] builds a fresh [`Record`] holding its own deep copy
//! of each field, bound to that record only.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use uuid::Uuid;

use crate::error::{DropItem, SchemaError};
use crate::extraction::Extractor;
use crate::fields::Field;
use crate::value::FieldValue;

/// Identity of one record instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named collection of field templates
#[derive(Debug, Clone)]
pub struct ItemType {
    name: String,
    fields: IndexMap<String, Field>,
}

impl ItemType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Declare a field; names must be unique
    ///
    /// # Example
    ///
    /// ```
    /// use crawlit::{Field, ItemType};
    ///
    /// let listing = ItemType::new("Listing")
    ///     .field("title", Field::string("h1::text").build()?)?
    ///     .field("rooms", Field::integer(".rooms::text").default(1i64).build()?)?;
    /// assert_eq!(listing.len(), 2);
    /// # Ok::<(), crawlit::SchemaError>(())
    /// ```
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Result<Self, SchemaError> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(SchemaError::DuplicateField(name));
        }
        self.fields.insert(name, field);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Create an empty record with freshly bound copies of every field
    pub fn instantiate(&self) -> Record {
        let id = RecordId::new();
        let fields = self
            .fields
            .iter()
            .map(|(name, template)| (name.clone(), template.link_to_item(name.clone(), id)))
            .collect();

        Record {
            id,
            item_type: self.name.clone(),
            fields,
            values: IndexMap::new(),
        }
    }

    /// Extract one record from `document`.
    ///
    /// Fields are processed in declaration order; the first field that drops
    /// aborts the whole load.
    pub fn load<E>(&self, extractor: &E, document: &E::Document) -> Result<Record, DropItem>
    where
        E: Extractor + ?Sized,
    {
        let mut record = self.instantiate();

        for (name, field) in &record.fields {
            let matches = extractor
                .extract(document, field.selector(), field.dialect(), field.pattern())
                .map_err(|reason| DropItem::Extraction {
                    field: name.clone(),
                    reason,
                })?;

            let value = field.process(matches)?;
            tracing::debug!(item = %self.name, field = %name, value = %value, "field loaded");

            if !value.is_null() {
                record.values.insert(name.clone(), value);
            }
        }

        tracing::debug!(item = %self.name, record = %record.id, fields = record.values.len(), "record loaded");
        Ok(record)
    }
}

/// One loaded record
#[derive(Debug, Clone)]
pub struct Record {
    id: RecordId,
    item_type: String,
    fields: IndexMap<String, Field>,
    values: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    /// This record's bound copy of a field
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Whether `field` is bound to this record
    pub fn owns(&self, field: &Field) -> bool {
        field
            .binding()
            .is_some_and(|b| b.record == self.id && self.fields.contains_key(&b.name))
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), SchemaError> {
        if !self.fields.contains_key(name) {
            return Err(SchemaError::UnknownField(name.to_string()));
        }
        self.values.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Value of `name`, or its default when never set.
    ///
    /// An unset field yields `[default]`, or `[]` without a default. Returns
    /// `None` only for names the item type does not declare.
    pub fn get_or_default(&self, name: &str) -> Option<FieldValue> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        let field = self.fields.get(name)?;
        Some(FieldValue::List(field.default_value().cloned().into_iter().collect()))
    }

    /// Set values in declaration order
    pub fn values(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields
            .keys()
            .filter_map(|name| self.values.get(name).map(|v| (name.as_str(), v)))
    }

    pub fn into_values(self) -> IndexMap<String, FieldValue> {
        let Record { fields, mut values, .. } = self;
        fields
            .keys()
            .filter_map(|name| values.swap_remove(name).map(|v| (name.clone(), v)))
            .collect()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.values() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
