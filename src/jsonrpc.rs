//! Wire envelopes. The server speaks JSON-RPC shaped frames without the
//! version tag: requests are `{method, params?, id?}`, responses are
//! `{id, result}` or `{id, error}`.

use std::collections::BTreeMap;

use crate::value::Value;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct Request {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params: Option<Params>,
    // could technically be a string as well, but integers only in practice
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<i64>,
}

/// Call parameters, either keyed by name or positional. Servers may emit the
/// same logical notification in either form.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Params {
    Named(BTreeMap<String, Value>),
    Positional(Vec<Value>),
}

impl Params {
    pub fn named<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Params::Named(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn positional<I: IntoIterator<Item = Value>>(values: I) -> Self {
        Params::Positional(values.into_iter().collect())
    }

    /// Looks a parameter up by name, falling back to `position` when the
    /// params came in positional form.
    pub fn get(&self, name: &str, position: usize) -> Option<&Value> {
        match self {
            Params::Named(map) => map.get(name),
            Params::Positional(list) => list.get(position),
        }
    }
}

/// Server failure detail from an error response. An expected outcome of a
/// call, not a transport fault.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RpcError: {{\"code\": {}, \"message\": \"{}\"}}",
            self.code, self.message
        )
    }
}

impl std::error::Error for RpcError {}

/// One decoded inbound frame. Variant order matters: an error response is
/// recognized before a result, and anything with a `method` lands last.
#[derive(serde::Deserialize, Debug)]
#[serde(untagged)]
pub(crate) enum Inbound {
    Error { id: i64, error: RpcError },
    Result { id: i64, result: Value },
    Request(Request),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_absent_fields() {
        let request = Request {
            method: "minecraft:server/status".to_string(),
            params: None,
            id: Some(3),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            "{\"method\":\"minecraft:server/status\",\"id\":3}"
        );

        let notification = Request {
            method: "minecraft:notification/server/started".to_string(),
            params: None,
            id: None,
        };
        assert_eq!(
            serde_json::to_string(&notification).unwrap(),
            "{\"method\":\"minecraft:notification/server/started\"}"
        );
    }

    #[test]
    fn inbound_discriminates_on_field_presence() {
        match serde_json::from_str::<Inbound>("{\"id\": 7, \"result\": true}").unwrap() {
            Inbound::Result { id, result } => {
                assert_eq!(id, 7);
                assert_eq!(result, Value::Boolean(true));
            }
            other => panic!("expected result, got {other:?}"),
        }

        match serde_json::from_str::<Inbound>(
            "{\"id\": 7, \"error\": {\"code\": -32601, \"message\": \"method not found\"}}",
        )
        .unwrap()
        {
            Inbound::Error { id, error } => {
                assert_eq!(id, 7);
                assert_eq!(error.code, -32601);
                assert_eq!(error.message, "method not found");
                assert_eq!(error.data, None);
            }
            other => panic!("expected error, got {other:?}"),
        }

        match serde_json::from_str::<Inbound>("{\"method\": \"minecraft:notification/server/saved\"}")
            .unwrap()
        {
            Inbound::Request(request) => {
                assert_eq!(request.method, "minecraft:notification/server/saved");
                assert_eq!(request.id, None);
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn error_wins_when_both_fields_are_present() {
        match serde_json::from_str::<Inbound>(
            "{\"id\": 1, \"result\": null, \"error\": {\"code\": 1, \"message\": \"boom\"}}",
        )
        .unwrap()
        {
            Inbound::Error { error, .. } => assert_eq!(error.code, 1),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn params_lookup_prefers_names() {
        let named = Params::named([("player", Value::String("alice".to_string()))]);
        assert_eq!(
            named.get("player", 0),
            Some(&Value::String("alice".to_string()))
        );
        assert_eq!(named.get("missing", 0), None);

        let positional = Params::positional([Value::String("bob".to_string())]);
        assert_eq!(
            positional.get("player", 0),
            Some(&Value::String("bob".to_string()))
        );
        assert_eq!(positional.get("player", 1), None);
    }
}
