//! Records the management server puts on the wire inside notifications.
//! Optional fields are omitted when absent rather than serialized as null.

use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    pub id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Version {
    pub protocol: u32,
    pub name: String,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServerState {
    pub players: Option<Vec<Player>>,
    #[serde(rename = "started")]
    pub is_started: bool,
    pub version: Version,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub permission_level: u8,
    pub bypasses_player_limit: bool,
    pub player: Player,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserBan {
    pub reason: String,
    pub expires: Option<String>,
    pub source: String,
    pub player: Player,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IpBan {
    pub reason: String,
    pub expires: Option<String>,
    pub source: String,
    pub ip: String,
}

/// A gamerule with its value decoded according to the `type` tag. The server
/// sends values as strings; encoding emits them natively.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedGamerule {
    pub key: String,
    pub value: GameruleValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameruleValue {
    Integer(i64),
    Boolean(bool),
}

impl Serialize for TypedGamerule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TypedGamerule", 3)?;
        state.serialize_field("key", &self.key)?;
        match &self.value {
            GameruleValue::Integer(value) => {
                state.serialize_field("type", "integer")?;
                state.serialize_field("value", value)?;
            }
            GameruleValue::Boolean(value) => {
                state.serialize_field("type", "boolean")?;
                state.serialize_field("value", value)?;
            }
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for TypedGamerule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wire {
            key: String,
            #[serde(rename = "type")]
            kind: String,
            value: WireValue,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WireValue {
            Boolean(bool),
            Integer(i64),
            Text(String),
        }

        let wire = Wire::deserialize(deserializer)?;
        let value = match (wire.kind.as_str(), wire.value) {
            ("integer", WireValue::Integer(value)) => GameruleValue::Integer(value),
            ("integer", WireValue::Text(text)) => GameruleValue::Integer(text.parse().unwrap_or(0)),
            ("boolean", WireValue::Boolean(value)) => GameruleValue::Boolean(value),
            ("boolean", WireValue::Text(text)) => {
                GameruleValue::Boolean(text.parse().unwrap_or(false))
            }
            (kind, _) => {
                return Err(D::Error::custom(format!(
                    "invalid gamerule value for type \"{kind}\""
                )))
            }
        };
        Ok(TypedGamerule {
            key: wire.key,
            value,
        })
    }
}
