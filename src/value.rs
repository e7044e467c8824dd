use std::collections::BTreeMap;
use std::fmt;

use crate::Error;

/// Schema-free JSON value, the payload type of every call and notification.
///
/// Deserialization is driven by the actual JSON type of the wire data, tried
/// string, number, boolean, object, array, null in that order, so a numeric
/// string stays a string and a number stays a number.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(serde_json::Number),
    Boolean(bool),
    Object(BTreeMap<String, Value>),
    Array(Vec<Value>),
    Null,
}

impl Value {
    /// Recodes a serializable record into a `Value` through the same data
    /// model the transport puts on the wire.
    pub fn from_typed<T: serde::Serialize>(record: &T) -> crate::Result<Self> {
        serde_json::from_value(serde_json::to_value(record).map_err(Error::Encode)?)
            .map_err(Error::Decode)
    }

    /// Recodes this value back into a typed record. Object keys the record
    /// does not declare are dropped.
    pub fn to_typed<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_value(serde_json::to_value(self).map_err(Error::Encode)?)
            .map_err(Error::Decode)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        // NaN and infinity are not representable in JSON
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str("<unencodable>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Operator, Player};

    #[test]
    fn decode_follows_wire_type_tags() {
        assert_eq!(
            serde_json::from_str::<Value>("\"7\"").unwrap(),
            Value::String("7".to_string())
        );
        assert_eq!(
            serde_json::from_str::<Value>("7").unwrap(),
            Value::Number(7.into())
        );
        assert_eq!(
            serde_json::from_str::<Value>("true").unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(serde_json::from_str::<Value>("null").unwrap(), Value::Null);
        assert_eq!(
            serde_json::from_str::<Value>("[1, \"a\"]").unwrap(),
            Value::Array(vec![Value::Number(1.into()), Value::String("a".to_string())])
        );
    }

    #[test]
    fn typed_records_round_trip() {
        let operator = Operator {
            permission_level: 4,
            bypasses_player_limit: true,
            player: Player {
                name: "alice".to_string(),
                id: Some("f84c6a79-0a4e-45e0-879b-cd49ebd4c4e2".to_string()),
            },
        };
        let value = Value::from_typed(&operator).unwrap();
        assert_eq!(value.to_typed::<Operator>().unwrap(), operator);
    }

    #[test]
    fn integers_survive_recoding() {
        let value = Value::from_typed(&7i64).unwrap();
        assert_eq!(value, Value::Number(7.into()));
        assert_eq!(value.to_typed::<i64>().unwrap(), 7);
    }

    #[test]
    fn unknown_keys_are_dropped_on_decode() {
        let value: Value =
            serde_json::from_str("{\"name\": \"alice\", \"favouriteBlock\": \"dirt\"}").unwrap();
        let player = value.to_typed::<Player>().unwrap();
        assert_eq!(player.name, "alice");
        assert_eq!(player.id, None);
    }
}
