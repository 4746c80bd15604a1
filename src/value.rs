//! Value types carried by observation events.
//!
//! Events deliver positional argument values drawn from the monitored
//! program; stores bind them to property variables. Values are compared
//! structurally everywhere in the engine. Reference identity of monitored
//! objects is modeled by [`Value::Obj`], an opaque handle assigned by the
//! instrumentation: two handles are equal exactly when they name the same
//! object, so structural equality on `Obj` *is* identity equality.

use serde::{Deserialize, Serialize};

/// A single argument value of an observation event.
///
/// # Examples
///
/// ```
/// use vigil::Value;
///
/// let flag = Value::Bool(true);
/// let count = Value::Int(42);
/// let handle = Value::Obj(0xbeef);
///
/// assert!(flag.is_bool());
/// assert!(count.is_int());
/// assert!(handle.is_obj());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    /// Opaque handle to a monitored-program object; equality is identity.
    Obj(u64),
    Null,
}

impl Value {
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_str(&self) -> bool {
        matches!(self, Self::Str(_))
    }

    pub const fn is_obj(&self) -> bool {
        matches!(self, Self::Obj(_))
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_obj(&self) -> Option<u64> {
        match self {
            Self::Obj(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "str",
            Self::Obj(_) => "obj",
            Self::Null => "null",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Obj(v) => write!(f, "obj:{v:#x}"),
            Self::Null => write!(f, "null"),
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_bool() {
        let val = Value::Bool(true);
        assert!(val.is_bool());
        assert_eq!(val.as_bool(), Some(true));
        assert_eq!(val.type_name(), "bool");
    }

    #[test]
    fn test_value_int() {
        let val = Value::Int(42);
        assert!(val.is_int());
        assert_eq!(val.as_int(), Some(42));
        assert_eq!(val.type_name(), "int");
    }

    #[test]
    fn test_value_obj_identity() {
        let a = Value::Obj(1);
        let b = Value::Obj(1);
        let c = Value::Obj(2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_obj(), Some(1));
    }

    #[test]
    fn test_value_null() {
        let val = Value::Null;
        assert!(val.is_null());
        assert_eq!(val.type_name(), "null");
        assert_eq!(Value::default(), Value::Null);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::Int(42)), "42");
        assert_eq!(format!("{}", Value::Str("hi".into())), "\"hi\"");
        assert_eq!(format!("{}", Value::Obj(255)), "obj:0xff");
        assert_eq!(format!("{}", Value::Null), "null");
    }

    #[test]
    fn test_value_from_conversions() {
        let _: Value = true.into();
        let _: Value = 42i32.into();
        let _: Value = 42i64.into();
        let _: Value = "hello".into();
        let _: Value = String::from("hello").into();
    }

    #[test]
    fn test_value_serialization() {
        let val = Value::Str("test".into());
        let json = serde_json::to_string(&val).unwrap();
        let deserialized: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(val, deserialized);
    }

    #[test]
    fn test_value_type_mismatch() {
        let val = Value::Bool(true);
        assert!(val.as_int().is_none());
        assert!(val.as_str().is_none());
        assert!(val.as_obj().is_none());
    }
}
