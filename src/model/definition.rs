//! Property definitions
//!
//! A [`PropertyDefinition`] is the immutable schema of one model property:
//! its value domain, constraints, indexing flags and default. It converts
//! between caller values and the engine's storage values and derives the
//! index values a property contributes.

use crate::error::{GraphError, GraphResult, ValidationError};
use crate::graph::PropertyValue;
use std::fmt;

/// Value domain of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    String,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInteger,
    Float,
    Boolean,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::String => write!(f, "String"),
            PropertyKind::Integer => write!(f, "Integer"),
            PropertyKind::BigInteger => write!(f, "BigInteger"),
            PropertyKind::Float => write!(f, "Float"),
            PropertyKind::Boolean => write!(f, "Boolean"),
        }
    }
}

/// Schema of one typed model property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    kind: PropertyKind,
    indexed: bool,
    index_fulltext: bool,
    index_icase: bool,
    nullable: bool,
    blank: bool,
    default: Option<PropertyValue>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min: Option<f64>,
    max: Option<f64>,
}

impl PropertyDefinition {
    fn of_kind(kind: PropertyKind) -> Self {
        PropertyDefinition {
            kind,
            indexed: false,
            index_fulltext: false,
            index_icase: false,
            nullable: false,
            blank: false,
            default: None,
            min_length: None,
            max_length: None,
            min: None,
            max: None,
        }
    }

    /// A string property. Unless marked [`blank`](Self::blank), the empty
    /// string is rejected.
    pub fn string() -> Self {
        Self::of_kind(PropertyKind::String)
    }

    pub fn integer() -> Self {
        Self::of_kind(PropertyKind::Integer)
    }

    pub fn big_integer() -> Self {
        Self::of_kind(PropertyKind::BigInteger)
    }

    pub fn float() -> Self {
        Self::of_kind(PropertyKind::Float)
    }

    pub fn boolean() -> Self {
        Self::of_kind(PropertyKind::Boolean)
    }

    /// Index values in the model's exact index
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Index values in the model's full-text index
    pub fn index_fulltext(mut self) -> Self {
        self.indexed = true;
        self.index_fulltext = true;
        self
    }

    /// Index lowercased values in the model's exact index
    pub fn index_icase(mut self) -> Self {
        self.indexed = true;
        self.index_icase = true;
        self
    }

    /// Allow the property to have no value
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Allow the empty string
    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// Value written when the property is saved without one.
    ///
    /// The value is coerced into the property's domain; one that cannot be
    /// coerced is kept as given and fails validation on save.
    pub fn default(mut self, value: impl Into<PropertyValue>) -> Self {
        let value = value.into();
        self.default = match self.clean_value(value.clone()) {
            Ok(cleaned) => cleaned,
            Err(_) => Some(value),
        };
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn is_fulltext(&self) -> bool {
        self.index_fulltext
    }

    pub fn is_icase(&self) -> bool {
        self.index_icase
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&PropertyValue> {
        self.default.as_ref()
    }

    /// Effective minimum string length
    pub fn effective_min_length(&self) -> Option<usize> {
        match (self.min_length, self.kind) {
            (Some(min), _) => Some(min),
            (None, PropertyKind::String) if !self.blank => Some(1),
            _ => None,
        }
    }

    fn coercion_error(&self, value: PropertyValue, reason: &str) -> GraphError {
        let message = format!("cannot convert {} to {}: {}", value.type_name(), self.kind, reason);
        ValidationError::new(Some(value), self, message).into()
    }

    /// Coerce a caller value into this property's domain; `Null` becomes `None`
    pub fn clean_value(&self, value: PropertyValue) -> GraphResult<Option<PropertyValue>> {
        if value.is_null() {
            return Ok(None);
        }
        if let PropertyValue::List(_) = value {
            return Err(self.coercion_error(value, "lists are not supported"));
        }
        let cleaned = match self.kind {
            PropertyKind::String => match value {
                PropertyValue::String(s) => PropertyValue::String(s),
                other => PropertyValue::String(other.to_string()),
            },
            PropertyKind::Integer => match self.to_integer(&value) {
                Some(i) => match i32::try_from(i) {
                    Ok(i) => PropertyValue::Int(i),
                    Err(_) => return Err(self.coercion_error(value, "out of range")),
                },
                None => return Err(self.coercion_error(value, "not a number")),
            },
            PropertyKind::BigInteger => match self.to_integer(&value) {
                Some(l) => PropertyValue::Long(l),
                None => return Err(self.coercion_error(value, "not a number")),
            },
            PropertyKind::Float => match &value {
                PropertyValue::Boolean(b) => PropertyValue::Float(if *b { 1.0 } else { 0.0 }),
                PropertyValue::String(s) => match s.trim().parse::<f64>() {
                    Ok(f) => PropertyValue::Float(f),
                    Err(_) => return Err(self.coercion_error(value, "not a number")),
                },
                other => match other.as_f64() {
                    Some(f) => PropertyValue::Float(f),
                    None => return Err(self.coercion_error(value, "not a number")),
                },
            },
            // Only `true` itself is true
            PropertyKind::Boolean => PropertyValue::Boolean(value == PropertyValue::Boolean(true)),
        };
        Ok(Some(cleaned))
    }

    fn to_integer(&self, value: &PropertyValue) -> Option<i64> {
        match value {
            PropertyValue::Int(i) => Some(i64::from(*i)),
            PropertyValue::Long(l) => Some(*l),
            PropertyValue::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                Some(f.trunc() as i64)
            }
            PropertyValue::Boolean(b) => Some(i64::from(*b)),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Value to store on the entity
    pub fn to_storage(&self, value: &PropertyValue) -> GraphResult<PropertyValue> {
        self.clean_value(value.clone())?
            .ok_or_else(|| ValidationError::new(None, self, "cannot store None").into())
    }

    /// Caller value for a raw stored value
    pub fn from_storage(&self, raw: PropertyValue) -> GraphResult<Option<PropertyValue>> {
        self.clean_value(raw)
    }

    /// Index values `value` contributes: one per scalar, lowercased for
    /// case-insensitive indexing
    pub fn to_index_values(&self, value: &PropertyValue) -> Vec<PropertyValue> {
        match value {
            PropertyValue::String(s) if self.index_icase => {
                vec![PropertyValue::String(s.to_lowercase())]
            }
            PropertyValue::Null => Vec::new(),
            PropertyValue::List(items) => items
                .iter()
                .flat_map(|item| self.to_index_values(item))
                .collect(),
            other => vec![other.clone()],
        }
    }

    /// Check `value` against the constraints, collecting every failure.
    ///
    /// An absent value passes when the property has a default (which is then
    /// checked instead) or is nullable.
    pub fn validate(&self, value: Option<&PropertyValue>) -> Result<(), ValidationError> {
        let value = match (value, &self.default) {
            (Some(value), _) => value,
            (None, Some(default)) => default,
            (None, None) if self.nullable => return Ok(()),
            (None, None) => return Err(ValidationError::new(None, self, "cannot be None")),
        };

        let mut errors = Vec::new();
        match self.kind {
            PropertyKind::String => match value.as_str() {
                Some(s) => {
                    let len = s.chars().count();
                    if let Some(max) = self.max_length {
                        if len > max {
                            errors.push(format!("More than {} characters", max));
                        }
                    }
                    if let Some(min) = self.effective_min_length() {
                        if len < min {
                            errors.push(format!("Fewer than {} characters", min));
                        }
                    }
                }
                None => errors.push(format!("Expected a String, got {}", value.type_name())),
            },
            PropertyKind::Integer | PropertyKind::BigInteger | PropertyKind::Float => {
                match value.as_f64() {
                    Some(n) => {
                        if let Some(min) = self.min {
                            if n < min {
                                errors.push(format!("Less than {}", min));
                            }
                        }
                        if let Some(max) = self.max {
                            if n > max {
                                errors.push(format!("Greater than {}", max));
                            }
                        }
                    }
                    None => errors.push(format!("Expected a number, got {}", value.type_name())),
                }
            }
            PropertyKind::Boolean => {
                if value.as_bool().is_none() {
                    errors.push(format!("Expected a Boolean, got {}", value.type_name()));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            let mut err = ValidationError::new(Some(value.clone()), self, errors.remove(0));
            err.errors.extend(errors);
            Err(err)
        }
    }
}
