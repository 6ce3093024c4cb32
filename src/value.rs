//! Dynamic values flowing through field pipelines.
//!
//! Raw matches enter a pipeline as strings; stages may turn them into numbers,
//! booleans or lists, so every stage speaks [`FieldValue`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Represents the value of a field at any point of its pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<FieldValue>),
    Null,
}

impl FieldValue {
    /// Build a list of string values
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::List(
            items
                .into_iter()
                .map(|s| FieldValue::String(s.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldValue::List(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Truthiness used by boolean fields.
    ///
    /// Null, empty strings, zero, `false` and empty lists are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::String(s) => !s.is_empty(),
            FieldValue::Int(i) => *i != 0,
            FieldValue::Float(f) => *f != 0.0,
            FieldValue::Bool(b) => *b,
            FieldValue::List(items) => !items.is_empty(),
            FieldValue::Null => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int(_) | FieldValue::Float(_) => 2,
            FieldValue::String(_) => 3,
            FieldValue::List(_) => 4,
        }
    }

    /// Total order over values, independent of any hashing.
    ///
    /// Null < Bool < numbers < String < List. Integers and floats compare
    /// numerically; an integer sorts before an equal float.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        use FieldValue::*;

        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (String(a), String(b)) => a.cmp(b),
            (List(a), List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Sort and deduplicate values by [`FieldValue::total_cmp`].
    pub fn sorted_unique(mut values: Vec<FieldValue>) -> Vec<FieldValue> {
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
        values
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::List(l) => {
                write!(f, "[")?;
                for (i, item) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_unique_strings() {
        let values = vec![
            FieldValue::from("shower"),
            FieldValue::from("bathroom"),
            FieldValue::from("shower"),
            FieldValue::from("kitchen"),
        ];

        assert_eq!(
            FieldValue::sorted_unique(values),
            vec![
                FieldValue::from("bathroom"),
                FieldValue::from("kitchen"),
                FieldValue::from("shower"),
            ]
        );
    }

    #[test]
    fn test_total_cmp_mixed_numbers() {
        assert_eq!(FieldValue::Int(1).total_cmp(&FieldValue::Float(1.5)), Ordering::Less);
        assert_eq!(FieldValue::Float(2.0).total_cmp(&FieldValue::Int(1)), Ordering::Greater);
        assert_eq!(FieldValue::Int(2).total_cmp(&FieldValue::Float(2.0)), Ordering::Less);
        assert_eq!(FieldValue::Int(5).total_cmp(&FieldValue::from("a")), Ordering::Less);
    }

    #[test]
    fn test_truthiness() {
        assert!(!FieldValue::Null.is_truthy());
        assert!(!FieldValue::from("").is_truthy());
        assert!(!FieldValue::Int(0).is_truthy());
        assert!(!FieldValue::List(vec![]).is_truthy());
        assert!(FieldValue::from("yes").is_truthy());
        assert!(FieldValue::Float(0.1).is_truthy());
    }

    #[test]
    fn test_display_list() {
        let value = FieldValue::from(vec!["a", "b"]);
        assert_eq!(value.to_string(), "[a, b]");
    }

    #[test]
    fn test_deserialize_untagged() {
        let value: FieldValue = serde_json::from_str(r#"["kitchen", 3, null]"#).unwrap();
        assert_eq!(
            value,
            FieldValue::List(vec![
                FieldValue::from("kitchen"),
                FieldValue::Int(3),
                FieldValue::Null,
            ])
        );
    }
}
