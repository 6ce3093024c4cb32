//! YAML item declarations.
//!
//! Loads item definitions from YAML and builds them into [`ItemType`]s.
//!
//! ```yaml
//! item:
//!   name: Listing
//!   fields:
//!     - name: title
//!       type: string
//!       selector: "h1::text"
//!     - name: price
//!       type: float
//!       selector: ".price::text"
//!       delimiter: ","
//!       default: 0.0
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::choices::Choices;
use crate::error::SchemaError;
use crate::fields::{Field, FieldKind};
use crate::item::ItemType;
use crate::transform_registry::TransformRegistry;
use crate::value::FieldValue;

/// Top-level schema document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaFile {
    item: ItemDef,
}

/// Item definition from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// Field definition from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,

    #[serde(rename = "type", default = "default_kind")]
    pub kind: FieldKind,

    pub selector: String,

    #[serde(default)]
    pub multi: bool,

    #[serde(default)]
    pub regexp: Option<String>,

    #[serde(default)]
    pub default: Option<FieldValue>,

    /// Unset means the kind's default
    #[serde(default)]
    pub strip: Option<bool>,

    #[serde(default)]
    pub lower: bool,

    #[serde(default)]
    pub upper: bool,

    #[serde(default)]
    pub choices: Option<Choices>,

    #[serde(default)]
    pub multi_choices: bool,

    #[serde(default)]
    pub delimiter: Option<char>,

    /// Names resolved against a [`TransformRegistry`]
    #[serde(default)]
    pub transforms: Vec<String>,
}

fn default_kind() -> FieldKind {
    FieldKind::String
}

impl ItemDef {
    /// Load an item definition from a YAML file.
    ///
    /// # Errors
    /// Returns error if the file can't be read or isn't a valid schema
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let def = Self::from_yaml_str(&contents)?;
        tracing::info!("Loaded item '{}' ({} fields) from {}", def.name, def.fields.len(), path.display());
        Ok(def)
    }

    /// Parse an item definition from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_yaml::from_str(yaml)?;
        Ok(file.item)
    }

    /// Build the item type, resolving transforms through `registry`
    pub fn build(&self, registry: &TransformRegistry) -> Result<ItemType, SchemaError> {
        let mut item = ItemType::new(&self.name);
        for def in &self.fields {
            item = item.field(&def.name, def.build(registry)?)?;
        }
        Ok(item)
    }
}

impl FieldDef {
    pub fn build(&self, registry: &TransformRegistry) -> Result<Field, SchemaError> {
        let mut builder = Field::builder(self.kind, &self.selector)
            .lower(self.lower)
            .upper(self.upper)
            .multi_choices(self.multi_choices);

        if self.multi {
            builder = builder.multi();
        }
        if let Some(regexp) = &self.regexp {
            builder = builder.regexp(regexp);
        }
        if let Some(default) = &self.default {
            builder = builder.default(default.clone());
        }
        if let Some(strip) = self.strip {
            builder = builder.strip(strip);
        }
        if let Some(choices) = &self.choices {
            builder = builder.choices(choices.clone());
        }
        if let Some(delimiter) = self.delimiter {
            builder = builder.delimiter(delimiter);
        }
        for name in &self.transforms {
            builder = builder.user_stage(registry.get(name)?);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Multiplicity, StageKind};

    const LISTING: &str = r#"
item:
  name: Listing
  fields:
    - name: title
      selector: "h1::text"
      transforms: [collapse_whitespace]
    - name: price
      type: float
      selector: ".price::text"
      delimiter: ","
      default: 0.0
    - name: amenities
      selector: ".description::text"
      multi: true
      choices:
        microwave: [kitchen, microwave]
        shower: [bathroom, shower]
      multi_choices: true
"#;

    #[test]
    fn test_parse_and_build() {
        let def = ItemDef::from_yaml_str(LISTING).unwrap();
        assert_eq!(def.name, "Listing");
        assert_eq!(def.fields.len(), 3);
        assert_eq!(def.fields[0].kind, FieldKind::String);
        assert_eq!(def.fields[1].delimiter, Some(','));
        assert_eq!(def.fields[1].default, Some(FieldValue::Float(0.0)));

        let item = def.build(&TransformRegistry::with_builtins()).unwrap();
        let fields: Vec<_> = item.fields().collect();

        assert_eq!(fields[0].0, "title");
        assert_eq!(
            fields[0].1.pipeline().kinds(),
            vec![StageKind::Collapse, StageKind::Normalize, StageKind::User]
        );
        assert_eq!(fields[2].1.multiplicity(), Multiplicity::Multi);
        assert!(matches!(fields[2].1.choices(), Some(Choices::Mapping(_))));
    }

    #[test]
    fn test_unknown_transform() {
        let def = ItemDef::from_yaml_str(LISTING).unwrap();
        let err = def.build(&TransformRegistry::new()).unwrap_err();

        assert!(matches!(err, SchemaError::UnknownTransform(name) if name == "collapse_whitespace"));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let yaml = "item:\n  name: T\n  fields:\n    - name: a\n      selector: p\n      colour: red\n";
        assert!(matches!(ItemDef::from_yaml_str(yaml), Err(SchemaError::Yaml(_))));
    }

    #[test]
    fn test_conflicting_flags_surface() {
        let yaml = "item:\n  name: T\n  fields:\n    - name: a\n      selector: p\n      lower: true\n      upper: true\n";
        let def = ItemDef::from_yaml_str(yaml).unwrap();

        assert!(matches!(
            def.build(&TransformRegistry::new()),
            Err(SchemaError::ConflictingOption(_))
        ));
    }
}
