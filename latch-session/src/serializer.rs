//! Session value serializers.
//!
//! A store writes its value map to the cache through one serializer. Changing
//! the serializer of a running deployment makes existing sessions unreadable.

use crate::error::{SessionError, SessionResult};
use crate::value::{SessionKey, SessionValue, SessionValues};
use serde_json::{Map, Number, Value};

/// Converts a session's value map to and from bytes.
pub trait SessionSerializer: Send + Sync {
    /// Short identifier, for logs.
    fn name(&self) -> &'static str;

    /// Serialize the value map.
    fn serialize(&self, values: &SessionValues) -> SessionResult<Vec<u8>>;

    /// Deserialize `data` into `values`, replacing entries with the same key.
    fn deserialize(&self, data: &[u8], values: &mut SessionValues) -> SessionResult<()>;
}

/// JSON text serializer.
///
/// Keys must be [`SessionKey::Text`]. Byte values and non-finite floats have
/// no JSON form and are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    fn to_json(value: &SessionValue) -> SessionResult<Value> {
        Ok(match value {
            SessionValue::Null => Value::Null,
            SessionValue::Bool(b) => Value::Bool(*b),
            SessionValue::Int(i) => Value::Number(Number::from(*i)),
            SessionValue::Float(f) => Value::Number(Number::from_f64(*f).ok_or_else(|| {
                SessionError::Serialization(format!("{} has no JSON representation", f))
            })?),
            SessionValue::Text(s) => Value::String(s.clone()),
            SessionValue::Bytes(_) => {
                return Err(SessionError::Serialization(
                    "byte values cannot be stored with the JSON serializer".to_string(),
                ));
            }
            SessionValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(Self::to_json)
                    .collect::<SessionResult<Vec<_>>>()?,
            ),
        })
    }

    fn from_json(value: Value) -> SessionResult<SessionValue> {
        Ok(match value {
            Value::Null => SessionValue::Null,
            Value::Bool(b) => SessionValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SessionValue::Int(i),
                None => SessionValue::Float(n.as_f64().ok_or_else(|| {
                    SessionError::Deserialization(format!("unsupported number {}", n))
                })?),
            },
            Value::String(s) => SessionValue::Text(s),
            Value::Array(items) => SessionValue::List(
                items
                    .into_iter()
                    .map(Self::from_json)
                    .collect::<SessionResult<Vec<_>>>()?,
            ),
            Value::Object(_) => {
                return Err(SessionError::Deserialization(
                    "nested objects are not supported in session values".to_string(),
                ));
            }
        })
    }
}

impl SessionSerializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, values: &SessionValues) -> SessionResult<Vec<u8>> {
        let mut map = Map::with_capacity(values.len());
        for (key, value) in values {
            let SessionKey::Text(key) = key else {
                return Err(SessionError::Serialization(format!(
                    "non-string key {} cannot be serialized to JSON",
                    key
                )));
            };
            map.insert(key.clone(), Self::to_json(value)?);
        }

        serde_json::to_vec(&Value::Object(map))
            .map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn deserialize(&self, data: &[u8], values: &mut SessionValues) -> SessionResult<()> {
        let map: Map<String, Value> = serde_json::from_slice(data)
            .map_err(|e| SessionError::Deserialization(e.to_string()))?;

        for (key, value) in map {
            values.insert(SessionKey::Text(key), Self::from_json(value)?);
        }
        Ok(())
    }
}

/// Compact binary serializer backed by postcard.
///
/// Accepts every key and value variant. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer;

impl SessionSerializer for BinarySerializer {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn serialize(&self, values: &SessionValues) -> SessionResult<Vec<u8>> {
        postcard::to_allocvec(values).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn deserialize(&self, data: &[u8], values: &mut SessionValues) -> SessionResult<()> {
        let decoded: SessionValues =
            postcard::from_bytes(data).map_err(|e| SessionError::Deserialization(e.to_string()))?;
        values.extend(decoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionValues {
        let mut values = SessionValues::new();
        values.insert("userId".into(), SessionValue::Int(42));
        values.insert("name".into(), SessionValue::Text("alice".to_string()));
        values.insert("ratio".into(), SessionValue::Float(0.5));
        values.insert("admin".into(), SessionValue::Bool(false));
        values.insert(
            "roles".into(),
            SessionValue::List(vec!["read".into(), "write".into()]),
        );
        values
    }

    #[test]
    fn test_json_roundtrip() {
        let values = sample();
        let bytes = JsonSerializer.serialize(&values).unwrap();

        let mut decoded = SessionValues::new();
        JsonSerializer.deserialize(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_json_output_is_plain_object() {
        let mut values = SessionValues::new();
        values.insert("userId".into(), SessionValue::Int(42));

        let bytes = JsonSerializer.serialize(&values).unwrap();
        assert_eq!(bytes, br#"{"userId":42}"#);
    }

    #[test]
    fn test_json_rejects_int_keys() {
        let mut values = SessionValues::new();
        values.insert(SessionKey::Int(1), SessionValue::Null);

        let err = JsonSerializer.serialize(&values).unwrap_err();
        assert!(matches!(err, SessionError::Serialization(_)));
    }

    #[test]
    fn test_json_rejects_unrepresentable_values() {
        let mut values = SessionValues::new();
        values.insert("blob".into(), SessionValue::Bytes(vec![1, 2, 3]));
        assert!(JsonSerializer.serialize(&values).is_err());

        let mut values = SessionValues::new();
        values.insert("nan".into(), SessionValue::Float(f64::NAN));
        assert!(JsonSerializer.serialize(&values).is_err());
    }

    #[test]
    fn test_json_rejects_nested_objects() {
        let mut values = SessionValues::new();
        let err = JsonSerializer
            .deserialize(br#"{"user": {"id": 1}}"#, &mut values)
            .unwrap_err();
        assert!(matches!(err, SessionError::Deserialization(_)));
    }

    #[test]
    fn test_json_rejects_garbage() {
        let mut values = SessionValues::new();
        assert!(JsonSerializer.deserialize(b"not json", &mut values).is_err());
        assert!(JsonSerializer.deserialize(b"[1, 2]", &mut values).is_err());
    }

    #[test]
    fn test_binary_roundtrip_with_int_keys_and_bytes() {
        let mut values = sample();
        values.insert(SessionKey::Int(7), SessionValue::Bytes(vec![0, 255, 9]));

        let bytes = BinarySerializer.serialize(&values).unwrap();
        let mut decoded = SessionValues::new();
        BinarySerializer.deserialize(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_binary_rejects_truncated_input() {
        let bytes = BinarySerializer.serialize(&sample()).unwrap();
        let mut decoded = SessionValues::new();
        assert!(
            BinarySerializer
                .deserialize(&bytes[..bytes.len() / 2], &mut decoded)
                .is_err()
        );
    }
}
