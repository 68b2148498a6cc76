//! Insertion-ordered, uniquely-named attribute list (spec §4.B).
//!
//! Grounded in `original_source/base/rDataType.h`'s global-attribute API,
//! which widens float<->double and int<->long on get with a logged
//! convenience cast rather than failing outright.

use crate::error::{RapioError, Result};
use indexmap::IndexMap;

/// A single attribute value. Widening casts (float<->double, int<->long)
/// are explicit and logged (see `DataAttributeList::get`); there is no
/// implicit coercion baked into the variant itself.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl AttributeValue {
    fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Str(_) => "string",
            AttributeValue::Long(_) => "long",
            AttributeValue::Float(_) => "float",
            AttributeValue::Double(_) => "double",
        }
    }
}

/// Ordered name -> typed-value mapping. A later `put` with an existing
/// name replaces the prior value in place, preserving its original
/// insertion position (matches `spec.md`'s "uniquely named" + "insertion
/// order" invariants).
#[derive(Debug, Clone, Default)]
pub struct DataAttributeList {
    values: IndexMap<String, AttributeValue>,
}

impl DataAttributeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.values.insert(name.into(), value);
    }

    pub fn put_string(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.put(name, AttributeValue::Str(value.into()));
    }

    pub fn put_long(&mut self, name: impl Into<String>, value: i64) {
        self.put(name, AttributeValue::Long(value));
    }

    pub fn put_float(&mut self, name: impl Into<String>, value: f32) {
        self.put(name, AttributeValue::Float(value));
    }

    pub fn put_double(&mut self, name: impl Into<String>, value: f64) {
        self.put(name, AttributeValue::Double(value));
    }

    pub fn raw(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.values.shift_remove(name)
    }

    /// Iterate (name, value) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.values.iter()
    }

    pub fn get_string(&self, name: &str) -> Result<Option<String>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(AttributeValue::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(RapioError::TypeMismatch {
                attribute: name.to_string(),
                expected: "string",
                found: other.type_name(),
            }),
        }
    }

    pub fn get_long(&self, name: &str) -> Result<Option<i64>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(AttributeValue::Long(v)) => Ok(Some(*v)),
            Some(other) => Err(RapioError::TypeMismatch {
                attribute: name.to_string(),
                expected: "long",
                found: other.type_name(),
            }),
        }
    }

    /// Widens a stored `Float` to `f64` with a warning, per `spec.md`'s
    /// "tolerates widening with a silent cast and a warning".
    pub fn get_double(&self, name: &str) -> Result<Option<f64>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(AttributeValue::Double(v)) => Ok(Some(*v)),
            Some(AttributeValue::Float(v)) => {
                tracing::warn!(target: "rapio::attribute", attribute = name, "widening float->double");
                Ok(Some(*v as f64))
            }
            Some(other) => Err(RapioError::TypeMismatch {
                attribute: name.to_string(),
                expected: "double",
                found: other.type_name(),
            }),
        }
    }

    /// Widens a stored `Double` down to `f32` with a warning (used when a
    /// caller asks for a float but the file stored a double, e.g. the
    /// MRMS `LatGridSpacing` convention).
    pub fn get_float(&self, name: &str) -> Result<Option<f32>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(AttributeValue::Float(v)) => Ok(Some(*v)),
            Some(AttributeValue::Double(v)) => {
                tracing::warn!(target: "rapio::attribute", attribute = name, "narrowing double->float");
                Ok(Some(*v as f32))
            }
            Some(other) => Err(RapioError::TypeMismatch {
                attribute: name.to_string(),
                expected: "float",
                found: other.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_replaces_in_place() {
        let mut attrs = DataAttributeList::new();
        attrs.put_string("a", "1");
        attrs.put_string("b", "2");
        attrs.put_string("a", "3");
        let names: Vec<_> = attrs.iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(attrs.get_string("a").unwrap(), Some("3".to_string()));
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let mut attrs = DataAttributeList::new();
        attrs.put_string("name", "x");
        assert!(attrs.get_long("name").is_err());
    }

    #[test]
    fn widening_float_to_double_succeeds() {
        let mut attrs = DataAttributeList::new();
        attrs.put_float("v", 1.5);
        assert_eq!(attrs.get_double("v").unwrap(), Some(1.5));
    }
}
