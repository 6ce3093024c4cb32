//! Field descriptors.
//!
//! A [`Field`] says where a value lives (a selector, plus an optional
//! sub-pattern), how many matches to keep, and which pipeline the matches go
//! through. Fields are declared unbound; an item binds a copy of each field to
//! a record by giving it a name and the record's id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::choices::Choices;
use crate::error::{DropItem, SchemaError};
use crate::extraction::{Dialect, SubPattern};
use crate::item::RecordId;
use crate::pipeline::{build_pipeline, Conversion, Multiplicity, Pipeline, PipelineConfig, StageContext};
use crate::transform_registry::{TransformFn, UserStage};
use crate::value::FieldValue;

/// Optionally-signed integers, including exponential integers like `12e+3`
pub const INTEGER_PATTERN: &str = r"[\-+]?\d+[eE]\+\d+|[\-+]?\d+";

/// Optionally-signed floats; `\.` is rewritten for custom delimiters
pub const FLOAT_PATTERN: &str = r"[\-+]?\d+[eE][\-+]\d+|[\-+]?\d*\.?\d+";

/// Email addresses, also in the spelled-out `name at example dot com` form
pub const EMAIL_PATTERN: &str = r#"(?P<extract>[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*(?:@|\sat\s)(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.|\sdot\s))+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)"#;

const UNBOUND: &str = "<unbound>";

/// Field variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Raw matches, no normalization
    Raw,
    String,
    Integer,
    Float,
    Boolean,
    Email,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Raw => "raw",
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Email => "email",
        }
    }

    /// String-family kinds accept strip/lower/upper/choices
    fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldKind::String | FieldKind::Integer | FieldKind::Float | FieldKind::Email
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name and owning record of a bound field.
///
/// The record id is only an identifier; it is used for diagnostics and never
/// gives access to the record itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub name: String,
    pub record: RecordId,
}

/// A named, typed unit of extraction configuration
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    selector: String,
    multiplicity: Multiplicity,
    pattern: Option<SubPattern>,
    default: Option<FieldValue>,
    choices: Option<Choices>,
    pipeline: Pipeline,
    binding: Option<FieldBinding>,
}

impl Field {
    pub fn builder(kind: FieldKind, selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(kind, selector)
    }

    pub fn raw(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(FieldKind::Raw, selector)
    }

    pub fn string(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(FieldKind::String, selector)
    }

    pub fn integer(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(FieldKind::Integer, selector)
    }

    pub fn float(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(FieldKind::Float, selector)
    }

    pub fn boolean(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(FieldKind::Boolean, selector)
    }

    pub fn email(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(FieldKind::Email, selector)
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::classify(&self.selector)
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    /// Effective sub-pattern: the caller's, else the kind's default
    pub fn pattern(&self) -> Option<&SubPattern> {
        self.pattern.as_ref()
    }

    pub fn default_value(&self) -> Option<&FieldValue> {
        self.default.as_ref()
    }

    pub fn choices(&self) -> Option<&Choices> {
        self.choices.as_ref()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Name assigned at binding, `None` before
    pub fn name(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.name.as_str())
    }

    pub fn binding(&self) -> Option<&FieldBinding> {
        self.binding.as_ref()
    }

    /// Copy of this field bound to a record instance.
    ///
    /// The receiver is left untouched, so a template can be bound to any
    /// number of records while each bound copy keeps its one binding.
    pub(crate) fn link_to_item(&self, field_name: impl Into<String>, record: RecordId) -> Field {
        Field {
            binding: Some(FieldBinding {
                name: field_name.into(),
                record,
            }),
            ..self.clone()
        }
    }

    /// Run the pipeline over raw matches
    pub fn process(&self, matches: Vec<String>) -> Result<FieldValue, DropItem> {
        let ctx = StageContext {
            field: self.name().unwrap_or(UNBOUND),
            default: self.default.as_ref(),
        };
        self.pipeline.run(matches, &ctx)
    }
}

/// Builder for [`Field`]
///
/// # Example
///
/// ```
/// use crawlit::{Choices, Field};
///
/// let field = Field::string(".description::text")
///     .lower(true)
///     .choices(Choices::tags(["microwave", "shower"]))
///     .multi_choices(true)
///     .build()
///     .unwrap();
/// assert_eq!(field.pipeline().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    kind: FieldKind,
    selector: String,
    multiplicity: Multiplicity,
    regexp: Option<String>,
    default: Option<FieldValue>,
    strip: Option<bool>,
    lower: bool,
    upper: bool,
    choices: Option<Choices>,
    multi_choices: bool,
    delimiter: Option<char>,
    stages: Vec<UserStage>,
}

impl FieldBuilder {
    pub fn new(kind: FieldKind, selector: impl Into<String>) -> Self {
        Self {
            kind,
            selector: selector.into(),
            multiplicity: Multiplicity::Single,
            regexp: None,
            default: None,
            strip: None,
            lower: false,
            upper: false,
            choices: None,
            multi_choices: false,
            delimiter: None,
            stages: Vec::new(),
        }
    }

    /// Keep every match instead of the first one
    pub fn multi(mut self) -> Self {
        self.multiplicity = Multiplicity::Multi;
        self
    }

    pub fn multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    /// Override the kind's default sub-pattern
    pub fn regexp(mut self, pattern: impl Into<String>) -> Self {
        self.regexp = Some(pattern.into());
        self
    }

    pub fn default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn strip(mut self, strip: bool) -> Self {
        self.strip = Some(strip);
        self
    }

    pub fn lower(mut self, lower: bool) -> Self {
        self.lower = lower;
        self
    }

    pub fn upper(mut self, upper: bool) -> Self {
        self.upper = upper;
        self
    }

    pub fn choices(mut self, choices: Choices) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn multi_choices(mut self, multi_choices: bool) -> Self {
        self.multi_choices = multi_choices;
        self
    }

    /// Decimal separator for float fields
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Append a caller-supplied stage; these always run after built-in stages
    pub fn stage(mut self, name: impl Into<String>, func: impl TransformFn + 'static) -> Self {
        self.stages.push(UserStage::new(name, func));
        self
    }

    pub fn user_stage(mut self, stage: UserStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Result<Field, SchemaError> {
        self.check_supported()?;

        let delimiter = self.delimiter.unwrap_or('.');
        let pattern = match &self.regexp {
            Some(p) => Some(SubPattern::new(p)?),
            None => self.default_pattern(delimiter).map(|p| SubPattern::new(&p)).transpose()?,
        };

        let conversion = match self.kind {
            FieldKind::Integer => Some(Conversion::Integer),
            FieldKind::Float => Some(Conversion::Float { delimiter }),
            FieldKind::Boolean => Some(Conversion::Boolean),
            _ => None,
        };

        let config = PipelineConfig {
            multiplicity: self.multiplicity,
            strip: self.strip.unwrap_or(self.kind.is_textual()),
            lower: self.lower,
            upper: self.upper,
            choices: self.choices.clone(),
            multi_choices: self.multi_choices,
            conversion,
            extra_stages: self.stages,
        };
        let pipeline = build_pipeline(&config)?;

        Ok(Field {
            kind: self.kind,
            selector: self.selector,
            multiplicity: self.multiplicity,
            pattern,
            default: self.default,
            choices: self.choices,
            pipeline,
            binding: None,
        })
    }

    fn check_supported(&self) -> Result<(), SchemaError> {
        let unsupported = |option| SchemaError::UnsupportedOption {
            option,
            kind: self.kind.as_str(),
        };

        if !self.kind.is_textual() {
            if self.strip == Some(true) {
                return Err(unsupported("strip"));
            }
            if self.lower {
                return Err(unsupported("lower"));
            }
            if self.upper {
                return Err(unsupported("upper"));
            }
            if self.choices.is_some() {
                return Err(unsupported("choices"));
            }
            if self.multi_choices {
                return Err(unsupported("multi_choices"));
            }
        }
        if self.delimiter.is_some() && self.kind != FieldKind::Float {
            return Err(unsupported("delimiter"));
        }
        Ok(())
    }

    fn default_pattern(&self, delimiter: char) -> Option<String> {
        match self.kind {
            FieldKind::Integer => Some(INTEGER_PATTERN.to_string()),
            FieldKind::Float if delimiter == '.' => Some(FLOAT_PATTERN.to_string()),
            FieldKind::Float => Some(
                FLOAT_PATTERN.replace(r"\.", &regex::escape(&delimiter.to_string())),
            ),
            FieldKind::Email => Some(EMAIL_PATTERN.to_string()),
            _ => None,
        }
    }
}
