//! Property value types for nodes and relationships
//!
//! The engine stores scalars only: strings, 32-bit ints, 64-bit longs,
//! floats and booleans. `List` and `Null` exist on the host side so callers
//! can express them, but the engine rejects them on write.

use crate::error::GraphError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Property value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Int(i32),
    Long(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<PropertyValue>),
    Null,
}

impl PropertyValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Whether the engine can store this value
    pub fn is_storable(&self) -> bool {
        !matches!(self, PropertyValue::List(_) | PropertyValue::Null)
    }

    /// Get string value if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get an integral value, widening `Int` to `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i as i64),
            PropertyValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Get a numeric value as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(i) => Some(*i as f64),
            PropertyValue::Long(l) => Some(*l as f64),
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Int(_) => "Int",
            PropertyValue::Long(_) => "Long",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::List(_) => "List",
            PropertyValue::Null => "Null",
        }
    }

    /// Textual form used as an index term
    pub fn index_term(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Long(l) => write!(f, "{}", l),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::List(items) => {
                write!(f, "[")?;
                for (i, val) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<&String> for PropertyValue {
    fn from(s: &String) -> Self {
        PropertyValue::String(s.clone())
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<i64> for PropertyValue {
    fn from(l: i64) -> Self {
        PropertyValue::Long(l)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(items: Vec<PropertyValue>) -> Self {
        PropertyValue::List(items)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropertyValue::Null)
    }
}

impl TryFrom<serde_json::Value> for PropertyValue {
    type Error = GraphError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;
        Ok(match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(l) => match i32::try_from(l) {
                    Ok(i) => PropertyValue::Int(i),
                    Err(_) => PropertyValue::Long(l),
                },
                None => PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => PropertyValue::String(s),
            Value::Array(items) => PropertyValue::List(
                items
                    .into_iter()
                    .map(PropertyValue::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::Object(_) => {
                return Err(GraphError::UnsupportedValueType {
                    key: String::new(),
                    type_name: "Object".to_string(),
                })
            }
        })
    }
}

/// Property map for nodes and relationships, in insertion order
pub type PropertyMap = IndexMap<String, PropertyValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_types() {
        assert_eq!(PropertyValue::String("test".to_string()).type_name(), "String");
        assert_eq!(PropertyValue::Int(42).type_name(), "Int");
        assert_eq!(PropertyValue::Long(42).type_name(), "Long");
        assert_eq!(PropertyValue::Float(3.5).type_name(), "Float");
        assert_eq!(PropertyValue::Boolean(true).type_name(), "Boolean");
        assert_eq!(PropertyValue::List(vec![]).type_name(), "List");
        assert_eq!(PropertyValue::Null.type_name(), "Null");
    }

    #[test]
    fn test_property_value_conversions() {
        let string_prop: PropertyValue = "hello".into();
        assert_eq!(string_prop.as_str(), Some("hello"));

        let int_prop: PropertyValue = 42.into();
        assert_eq!(int_prop, PropertyValue::Int(42));
        assert_eq!(int_prop.as_i64(), Some(42));

        let long_prop: PropertyValue = 42i64.into();
        assert_eq!(long_prop, PropertyValue::Long(42));

        let float_prop: PropertyValue = 3.5.into();
        assert_eq!(float_prop.as_f64(), Some(3.5));

        let bool_prop: PropertyValue = true.into();
        assert_eq!(bool_prop.as_bool(), Some(true));

        let none: PropertyValue = Option::<i32>::None.into();
        assert!(none.is_null());
    }

    #[test]
    fn test_storable() {
        assert!(PropertyValue::from("x").is_storable());
        assert!(!PropertyValue::Null.is_storable());
        assert!(!PropertyValue::List(vec![1.into()]).is_storable());
    }

    #[test]
    fn test_index_term() {
        assert_eq!(PropertyValue::from("Perennial herb").index_term(), "Perennial herb");
        assert_eq!(PropertyValue::Int(5).index_term(), "5");
        assert_eq!(PropertyValue::Boolean(false).index_term(), "false");
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({"name": "test", "number": 5, "big": 5_000_000_000i64, "ratio": 0.5});
        let obj = json.as_object().unwrap();
        let convert = |key: &str| PropertyValue::try_from(obj[key].clone()).unwrap();
        assert_eq!(convert("name"), PropertyValue::from("test"));
        assert_eq!(convert("number"), PropertyValue::Int(5));
        assert_eq!(convert("big"), PropertyValue::Long(5_000_000_000));
        assert_eq!(convert("ratio"), PropertyValue::Float(0.5));
        assert!(PropertyValue::try_from(json.clone()).is_err());
    }

    #[test]
    fn test_property_map_keeps_order() {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), "Alice".into());
        props.insert("age".to_string(), 30.into());
        props.insert("active".to_string(), true.into());

        let keys: Vec<&str> = props.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "age", "active"]);
    }
}
