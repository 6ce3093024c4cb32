//! Controlled vocabularies and token-boundary choice matching.
//!
//! A vocabulary tag matches a string when it appears as a whole token, i.e.
//! bounded by the start/end of the string, whitespace or one of
//! [`CHOICE_SEPARATORS`]. `"cat"` matches `"a cat sat"` and `"cat,dog"` but
//! not `"category"`.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DropItem, SchemaError};
use crate::value::FieldValue;

/// Characters that delimit a token in addition to whitespace.
pub const CHOICE_SEPARATORS: &str = " .,¿?¡!:;-";

/// A controlled vocabulary.
///
/// Either plain tags, or tags mapped to an associated value. A mapped value
/// is atomic or a group (`FieldValue::List`) of atomic values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Choices {
    Tags(Vec<String>),
    Mapping(IndexMap<String, FieldValue>),
}

impl Choices {
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Choices::Tags(tags.into_iter().map(Into::into).collect())
    }

    pub fn mapping<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        Choices::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Choices::Tags(tags) => tags.len(),
            Choices::Mapping(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in vocabulary order as (tag, value accumulated on a hit)
    fn entries(&self) -> Vec<(&str, FieldValue)> {
        match self {
            Choices::Tags(tags) => tags
                .iter()
                .map(|t| (t.as_str(), FieldValue::String(t.clone())))
                .collect(),
            Choices::Mapping(map) => map.iter().map(|(k, v)| (k.as_str(), v.clone())).collect(),
        }
    }
}

/// Compiled matcher for one vocabulary.
#[derive(Debug, Clone)]
pub struct ChoiceMatcher {
    choices: Choices,
    multi: bool,
    patterns: Vec<Regex>,
}

impl ChoiceMatcher {
    /// Compile one token-boundary pattern per vocabulary tag.
    pub fn new(choices: Choices, multi: bool) -> Result<Self, SchemaError> {
        let separators = regex::escape(CHOICE_SEPARATORS);
        let patterns = choices
            .entries()
            .into_iter()
            .map(|(tag, _)| {
                let pattern = format!(
                    r"(?:^|[\s{sep}]){word}(?:$|[\s{sep}])",
                    sep = separators,
                    word = regex::escape(tag)
                );
                Regex::new(&pattern).map_err(|source| SchemaError::InvalidPattern { pattern, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            choices,
            multi,
            patterns,
        })
    }

    pub fn choices(&self) -> &Choices {
        &self.choices
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Accumulate vocabulary hits for `raw`, in vocabulary order.
    ///
    /// Strings are matched on token boundaries; a list is matched by exact
    /// membership of the tag. Other scalars never match.
    pub fn hits(&self, raw: &FieldValue) -> Vec<FieldValue> {
        let mut matched = Vec::new();
        for ((tag, value), pattern) in self.choices.entries().into_iter().zip(&self.patterns) {
            let found = match raw {
                FieldValue::String(s) => pattern.is_match(s),
                FieldValue::List(items) => items.iter().any(|item| item.as_str() == Some(tag)),
                _ => false,
            };
            if found {
                matched.push(value);
                if !self.multi {
                    break;
                }
            }
        }
        matched
    }

    /// Map `raw` onto the vocabulary and merge the hits.
    ///
    /// No hit resolves to `default`, or drops the record when there is none.
    pub fn resolve(
        &self,
        raw: &FieldValue,
        field: &str,
        default: Option<&FieldValue>,
    ) -> Result<FieldValue, DropItem> {
        let matched = self.hits(raw);

        if matched.is_empty() {
            tracing::debug!("\"{}\": unknown choice \"{}\"", field, raw);
            return match default {
                Some(value) => Ok(value.clone()),
                None => Err(DropItem::InvalidChoice {
                    field: field.to_string(),
                    value: raw.to_string(),
                }),
            };
        }

        Ok(merge_hits(matched))
    }
}

/// Merge accumulated hits into a single value.
///
/// A single scalar hit is returned as is. Otherwise the result is the sorted,
/// deduplicated union: of all group elements when every hit is a group, of
/// the hits themselves when any hit is a scalar.
fn merge_hits(mut matched: Vec<FieldValue>) -> FieldValue {
    if matched.len() == 1 && !matched[0].is_list() {
        return matched.remove(0);
    }

    if matched.iter().all(FieldValue::is_list) {
        let union = matched
            .into_iter()
            .flat_map(|group| match group {
                FieldValue::List(items) => items,
                other => vec![other],
            })
            .collect();
        return FieldValue::List(FieldValue::sorted_unique(union));
    }

    FieldValue::List(FieldValue::sorted_unique(matched))
}
