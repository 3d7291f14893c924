//! Typed session keys and values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The value map carried by a session.
pub type SessionValues = HashMap<SessionKey, SessionValue>;

/// Key of a session value.
///
/// The JSON serializer accepts only [`SessionKey::Text`]; the binary
/// serializer accepts both variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SessionKey {
    Text(String),
    Int(i64),
}

impl SessionKey {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SessionKey::Text(s) => Some(s),
            SessionKey::Int(_) => None,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Text(s) => write!(f, "{}", s),
            SessionKey::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        SessionKey::Text(s.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        SessionKey::Text(s)
    }
}

impl From<i64> for SessionKey {
    fn from(i: i64) -> Self {
        SessionKey::Int(i)
    }
}

impl From<i32> for SessionKey {
    fn from(i: i32) -> Self {
        SessionKey::Int(i64::from(i))
    }
}

/// A session value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<SessionValue>),
}

impl SessionValue {
    /// Variant name, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            SessionValue::Null => "null",
            SessionValue::Bool(_) => "bool",
            SessionValue::Int(_) => "int",
            SessionValue::Float(_) => "float",
            SessionValue::Text(_) => "text",
            SessionValue::Bytes(_) => "bytes",
            SessionValue::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SessionValue::Null)
    }
}

impl From<bool> for SessionValue {
    fn from(b: bool) -> Self {
        SessionValue::Bool(b)
    }
}

impl From<i64> for SessionValue {
    fn from(i: i64) -> Self {
        SessionValue::Int(i)
    }
}

impl From<i32> for SessionValue {
    fn from(i: i32) -> Self {
        SessionValue::Int(i64::from(i))
    }
}

impl From<u32> for SessionValue {
    fn from(i: u32) -> Self {
        SessionValue::Int(i64::from(i))
    }
}

impl From<f64> for SessionValue {
    fn from(f: f64) -> Self {
        SessionValue::Float(f)
    }
}

impl From<String> for SessionValue {
    fn from(s: String) -> Self {
        SessionValue::Text(s)
    }
}

impl From<&str> for SessionValue {
    fn from(s: &str) -> Self {
        SessionValue::Text(s.to_string())
    }
}

impl From<Vec<u8>> for SessionValue {
    fn from(bytes: Vec<u8>) -> Self {
        SessionValue::Bytes(bytes)
    }
}

impl From<Vec<SessionValue>> for SessionValue {
    fn from(items: Vec<SessionValue>) -> Self {
        SessionValue::List(items)
    }
}

impl<T: Into<SessionValue>> From<Option<T>> for SessionValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SessionValue::Null)
    }
}

/// Conversion out of a stored [`SessionValue`].
///
/// Returns `None` when the stored variant cannot represent `Self`; callers
/// turn that into [`crate::SessionError::TypeMismatch`].
pub trait FromSessionValue: Sized {
    /// Name of the expected shape, for error messages.
    const EXPECTED: &'static str;

    fn from_session_value(value: &SessionValue) -> Option<Self>;
}

impl FromSessionValue for SessionValue {
    const EXPECTED: &'static str = "any";

    fn from_session_value(value: &SessionValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromSessionValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_session_value(value: &SessionValue) -> Option<Self> {
        match value {
            SessionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromSessionValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_session_value(value: &SessionValue) -> Option<Self> {
        match value {
            SessionValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromSessionValue for i32 {
    const EXPECTED: &'static str = "int (i32)";

    fn from_session_value(value: &SessionValue) -> Option<Self> {
        i64::from_session_value(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl FromSessionValue for u32 {
    const EXPECTED: &'static str = "int (u32)";

    fn from_session_value(value: &SessionValue) -> Option<Self> {
        i64::from_session_value(value).and_then(|i| u32::try_from(i).ok())
    }
}

impl FromSessionValue for u64 {
    const EXPECTED: &'static str = "int (u64)";

    fn from_session_value(value: &SessionValue) -> Option<Self> {
        i64::from_session_value(value).and_then(|i| u64::try_from(i).ok())
    }
}

impl FromSessionValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_session_value(value: &SessionValue) -> Option<Self> {
        match value {
            SessionValue::Float(f) => Some(*f),
            SessionValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromSessionValue for String {
    const EXPECTED: &'static str = "text";

    fn from_session_value(value: &SessionValue) -> Option<Self> {
        match value {
            SessionValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromSessionValue for Vec<u8> {
    const EXPECTED: &'static str = "bytes";

    fn from_session_value(value: &SessionValue) -> Option<Self> {
        match value {
            SessionValue::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl<T: FromSessionValue> FromSessionValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_session_value(value: &SessionValue) -> Option<Self> {
        match value {
            SessionValue::List(items) => items.iter().map(T::from_session_value).collect(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_conversions() {
        assert_eq!(SessionKey::from("user"), SessionKey::Text("user".to_string()));
        assert_eq!(SessionKey::from(7), SessionKey::Int(7));
        assert_eq!(SessionKey::from("user").as_str(), Some("user"));
        assert_eq!(SessionKey::Int(7).to_string(), "7");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(SessionValue::from(42), SessionValue::Int(42));
        assert_eq!(SessionValue::from("alice"), SessionValue::Text("alice".to_string()));
        assert_eq!(SessionValue::from(None::<i64>), SessionValue::Null);
        assert_eq!(SessionValue::from(vec![1u8, 2]), SessionValue::Bytes(vec![1, 2]));
    }

    #[test]
    fn test_typed_extraction() {
        let value = SessionValue::Int(42);
        assert_eq!(i64::from_session_value(&value), Some(42));
        assert_eq!(u32::from_session_value(&value), Some(42));
        assert_eq!(f64::from_session_value(&value), Some(42.0));
        assert_eq!(String::from_session_value(&value), None);

        assert_eq!(u32::from_session_value(&SessionValue::Int(-1)), None);
        assert_eq!(i32::from_session_value(&SessionValue::Int(i64::MAX)), None);
    }

    #[test]
    fn test_list_extraction() {
        let value = SessionValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(
            Vec::<String>::from_session_value(&value),
            Some(vec!["a".to_string(), "b".to_string()])
        );

        let mixed = SessionValue::List(vec!["a".into(), 1.into()]);
        assert_eq!(Vec::<String>::from_session_value(&mixed), None);
    }

    #[test]
    fn test_type_name() {
        assert_eq!(SessionValue::Null.type_name(), "null");
        assert_eq!(SessionValue::Bytes(vec![]).type_name(), "bytes");
        assert!(SessionValue::Null.is_null());
    }
}
