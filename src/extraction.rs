//! Selector dialects and the extraction engine interface.
//!
//! Fields only carry selector strings; turning a selector plus a document into
//! raw string matches is the job of an [`Extractor`].

use std::fmt;

use regex::Regex;

use crate::error::SchemaError;

/// Selector dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// XPath-style, e.g. `//div[@class='price']/text()`
    Path,
    /// CSS-style, e.g. `div.price::text`
    Pattern,
}

impl Dialect {
    /// Classify a selector: anything starting with `/` is a path.
    pub fn classify(selector: &str) -> Self {
        if selector.starts_with('/') {
            Dialect::Path
        } else {
            Dialect::Pattern
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Path => write!(f, "path"),
            Dialect::Pattern => write!(f, "pattern"),
        }
    }
}

/// Regex applied to every selected string before the pipeline runs.
///
/// - a named group `extract` yields that group of the first match only
/// - otherwise every match yields the whole match when the pattern has no
///   groups, or each participating group, in order, when it has some
#[derive(Debug, Clone)]
pub struct SubPattern {
    regex: Regex,
}

impl SubPattern {
    pub fn new(pattern: &str) -> Result<Self, SchemaError> {
        let regex = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Apply the pattern to one selected string
    pub fn apply(&self, text: &str) -> Vec<String> {
        if self.regex.capture_names().any(|name| name == Some("extract")) {
            return self
                .regex
                .captures(text)
                .and_then(|caps| caps.name("extract"))
                .map(|m| vec![m.as_str().to_string()])
                .unwrap_or_default();
        }

        if self.regex.captures_len() == 1 {
            return self
                .regex
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect();
        }

        self.regex
            .captures_iter(text)
            .flat_map(|caps| {
                caps.iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str().to_string())
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// One step of a path selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// `true` for `//` (any descendant), `false` for `/` (direct child)
    pub descendant: bool,
    /// Element name, `*` for any
    pub name: String,
    pub predicates: Vec<AttrPredicate>,
}

/// `[@attr]` or `[@attr='value']`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPredicate {
    pub attr: String,
    pub value: Option<String>,
}

/// What a path selector yields for each matched element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTarget {
    Element,
    /// `/text()`: direct child text nodes
    Text,
    /// `//text()`: every text node below the element
    DescendantText,
    Attr(String),
}

/// Parsed path selector (the supported XPath subset)
///
/// # Examples
///
/// - `//h1/text()` - text of every `h1`
/// - `//p//text()` - all text below every `p`, nested elements included
/// - `/html/body/a/@href` - `href` of `a` children of `body`
/// - `//div[@class='price']//span` - spans below price divs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    pub raw: String,
    pub steps: Vec<PathStep>,
    pub target: PathTarget,
}

impl PathExpr {
    pub fn parse(path: &str) -> Result<Self, String> {
        let mut steps = Vec::new();
        let mut target = PathTarget::Element;
        let mut rest = path;

        while !rest.is_empty() {
            if target != PathTarget::Element {
                return Err(format!("'{}': nothing may follow text() or @attribute", path));
            }

            let descendant = if let Some(r) = rest.strip_prefix("//") {
                rest = r;
                true
            } else if let Some(r) = rest.strip_prefix('/') {
                rest = r;
                false
            } else {
                return Err(format!("'{}': expected '/' before '{}'", path, rest));
            };

            let end = step_end(rest);
            let step = &rest[..end];
            rest = &rest[end..];

            if step == "text()" {
                target = if descendant {
                    PathTarget::DescendantText
                } else {
                    PathTarget::Text
                };
            } else if let Some(attr) = step.strip_prefix('@') {
                if descendant {
                    return Err(format!("'{}': descendant attributes are not supported", path));
                }
                target = PathTarget::Attr(attr.to_string());
            } else {
                steps.push(parse_step(path, step, descendant)?);
            }
        }

        if steps.is_empty() {
            return Err(format!("'{}': no element step", path));
        }

        Ok(Self {
            raw: path.to_string(),
            steps,
            target,
        })
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Index of the next `/` outside of a predicate
fn step_end(s: &str) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => return i,
            _ => {}
        }
    }
    s.len()
}

fn parse_step(path: &str, step: &str, descendant: bool) -> Result<PathStep, String> {
    let (name, mut preds) = match step.find('[') {
        Some(i) => (&step[..i], &step[i..]),
        None => (step, ""),
    };

    let valid_name = name == "*"
        || (!name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    if !valid_name {
        return Err(format!("'{}': unsupported step '{}'", path, step));
    }

    let mut predicates = Vec::new();
    while !preds.is_empty() {
        let close = preds
            .find(']')
            .ok_or_else(|| format!("'{}': unclosed predicate in '{}'", path, step))?;
        let body = preds[1..close].trim();
        preds = &preds[close + 1..];

        let attr_expr = body
            .strip_prefix('@')
            .ok_or_else(|| format!("'{}': unsupported predicate '[{}]'", path, body))?;
        let predicate = match attr_expr.split_once('=') {
            Some((attr, value)) => AttrPredicate {
                attr: attr.trim().to_string(),
                value: Some(unquote(value.trim()).ok_or_else(|| {
                    format!("'{}': predicate value must be quoted in '[{}]'", path, body)
                })?),
            },
            None => AttrPredicate {
                attr: attr_expr.to_string(),
                value: None,
            },
        };
        predicates.push(predicate);
    }

    Ok(PathStep {
        descendant,
        name: name.to_string(),
        predicates,
    })
}

fn unquote(s: &str) -> Option<String> {
    let quote = s.chars().next()?;
    if (quote == '\'' || quote == '"') && s.len() >= 2 && s.ends_with(quote) {
        Some(s[1..s.len() - 1].to_string())
    } else {
        None
    }
}

/// Trait for extraction engines
///
/// Implementations select raw strings out of a document, preserving document
/// order. The provided [`Extractor::extract`] then applies the field's
/// sub-pattern to each selected string.
///
/// # Example
///
/// ```
/// use crawlit::{Dialect, Extractor};
/// use std::collections::HashMap;
///
/// struct MapExtractor;
///
/// impl Extractor for MapExtractor {
///     type Document = HashMap<String, Vec<String>>;
///
///     fn select(&self, document: &Self::Document, selector: &str, _: Dialect)
///         -> Result<Vec<String>, String>
///     {
///         Ok(document.get(selector).cloned().unwrap_or_default())
///     }
/// }
/// ```
pub trait Extractor {
    type Document: ?Sized;

    /// Run `selector` against `document`
    fn select(
        &self,
        document: &Self::Document,
        selector: &str,
        dialect: Dialect,
    ) -> Result<Vec<String>, String>;

    /// Select, then apply the sub-pattern to every selected string
    fn extract(
        &self,
        document: &Self::Document,
        selector: &str,
        dialect: Dialect,
        pattern: Option<&SubPattern>,
    ) -> Result<Vec<String>, String> {
        let selected = self.select(document, selector, dialect)?;
        Ok(match pattern {
            Some(pattern) => selected.iter().flat_map(|s| pattern.apply(s)).collect(),
            None => selected,
        })
    }
}
