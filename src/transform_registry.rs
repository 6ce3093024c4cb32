//! Caller-supplied pipeline stages and a registry for looking them up by name.
//!
//! Stages declared in code are attached to a field directly; stages named in
//! a YAML schema are resolved through a [`TransformRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::value::FieldValue;

/// Trait for caller-supplied transformation functions
///
/// A transform receives the whole value produced by the built-in stages and
/// returns the replacement value. Returning `Err(reason)` drops the record.
pub trait TransformFn: Send + Sync {
    fn apply(&self, value: FieldValue) -> Result<FieldValue, String>;
}

/// Simple function-based implementation of TransformFn
impl<F> TransformFn for F
where
    F: Fn(FieldValue) -> Result<FieldValue, String> + Send + Sync,
{
    fn apply(&self, value: FieldValue) -> Result<FieldValue, String> {
        self(value)
    }
}

/// A named, shareable transform
#[derive(Clone)]
pub struct UserStage {
    name: String,
    func: Arc<dyn TransformFn>,
}

impl UserStage {
    pub fn new(name: impl Into<String>, func: impl TransformFn + 'static) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: FieldValue) -> Result<FieldValue, String> {
        self.func.apply(value)
    }
}

impl fmt::Debug for UserStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserStage").field(&self.name).finish()
    }
}

/// Registry for storing transforms referenced by name
#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, UserStage>,
}

impl TransformRegistry {
    /// Create a new empty transform registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `collapse_whitespace` and `slugify`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("collapse_whitespace", |value: FieldValue| -> Result<FieldValue, String> {
            Ok(map_strings(value, collapse_whitespace))
        });
        registry.register("slugify", |value: FieldValue| -> Result<FieldValue, String> {
            Ok(map_strings(value, slugify))
        });
        registry
    }

    /// Register a transformation function
    ///
    /// # Example
    ///
    /// ```
    /// use crawlit::{FieldValue, TransformRegistry};
    ///
    /// let mut registry = TransformRegistry::new();
    /// registry.register("reverse", |value: FieldValue| -> Result<FieldValue, String> {
    ///     match value {
    ///         FieldValue::String(s) => Ok(FieldValue::String(s.chars().rev().collect())),
    ///         other => Ok(other),
    ///     }
    /// });
    /// assert!(registry.has_transform("reverse"));
    /// ```
    pub fn register(&mut self, name: impl Into<String>, func: impl TransformFn + 'static) {
        let name = name.into();
        self.transforms.insert(name.clone(), UserStage::new(name, func));
    }

    /// Look up a registered transform
    pub fn get(&self, name: &str) -> Result<UserStage, SchemaError> {
        self.transforms
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownTransform(name.to_string()))
    }

    /// Check if a transform is registered
    pub fn has_transform(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Get list of all registered transform names, sorted
    pub fn list_transforms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transforms.keys().cloned().collect();
        names.sort();
        names
    }
}

fn map_strings(value: FieldValue, f: fn(&str) -> String) -> FieldValue {
    match value {
        FieldValue::String(s) => FieldValue::String(f(&s)),
        FieldValue::List(items) => {
            FieldValue::List(items.into_iter().map(|v| map_strings(v, f)).collect())
        }
        other => other,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
