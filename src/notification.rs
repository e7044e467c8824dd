use crate::jsonrpc::Request;
use crate::types::{IpBan, Operator, Player, ServerState, TypedGamerule, UserBan};

/// A server-initiated event, parsed from an id-less inbound request by its
/// method name.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ServerStarted,
    ServerStopping,
    ServerSaving,
    ServerSaved,
    /// Heartbeat carrying the full server status.
    ServerStatus(ServerState),
    ServerActivity,
    PlayerJoined(Player),
    PlayerLeft(Player),
    OperatorAdded(Operator),
    OperatorRemoved(Operator),
    AllowlistAdded(Player),
    AllowlistRemoved(Player),
    IpBanAdded(IpBan),
    IpBanRemoved(String),
    BanAdded(UserBan),
    BanRemoved(Player),
    GameruleUpdated(TypedGamerule),
}

fn payload<T: serde::de::DeserializeOwned>(request: &Request, name: &str) -> crate::Result<Option<T>> {
    let Some(value) = request.params.as_ref().and_then(|params| params.get(name, 0)) else {
        return Ok(None);
    };
    value.to_typed().map(Some)
}

impl Notification {
    /// Returns `Ok(None)` for unknown methods and for known methods missing
    /// their payload; both are discarded by the caller.
    pub(crate) fn parse(request: &Request) -> crate::Result<Option<Self>> {
        let notification = match request.method.as_str() {
            "minecraft:notification/server/started" => Some(Self::ServerStarted),
            "minecraft:notification/server/stopping" => Some(Self::ServerStopping),
            "minecraft:notification/server/saving" => Some(Self::ServerSaving),
            "minecraft:notification/server/saved" => Some(Self::ServerSaved),
            "minecraft:notification/server/status" => {
                payload(request, "status")?.map(Self::ServerStatus)
            }
            "minecraft:notification/server/activity" => Some(Self::ServerActivity),
            "minecraft:notification/players/joined" => {
                payload(request, "player")?.map(Self::PlayerJoined)
            }
            "minecraft:notification/players/left" => {
                payload(request, "player")?.map(Self::PlayerLeft)
            }
            "minecraft:notification/operators/added" => {
                payload(request, "player")?.map(Self::OperatorAdded)
            }
            "minecraft:notification/operators/removed" => {
                payload(request, "player")?.map(Self::OperatorRemoved)
            }
            "minecraft:notification/allowlist/added" => {
                payload(request, "player")?.map(Self::AllowlistAdded)
            }
            "minecraft:notification/allowlist/removed" => {
                payload(request, "player")?.map(Self::AllowlistRemoved)
            }
            "minecraft:notification/ip_bans/added" => {
                payload(request, "player")?.map(Self::IpBanAdded)
            }
            "minecraft:notification/ip_bans/removed" => {
                payload(request, "player")?.map(Self::IpBanRemoved)
            }
            "minecraft:notification/bans/added" => payload(request, "player")?.map(Self::BanAdded),
            "minecraft:notification/bans/removed" => {
                payload(request, "player")?.map(Self::BanRemoved)
            }
            "minecraft:notification/gamerules/updated" => {
                payload(request, "gamerule")?.map(Self::GameruleUpdated)
            }
            method => {
                tracing::debug!("ignoring unknown notification method {method}");
                None
            }
        };
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> Request {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_bare_methods() {
        let parsed =
            Notification::parse(&request("{\"method\": \"minecraft:notification/server/started\"}"))
                .unwrap();
        assert_eq!(parsed, Some(Notification::ServerStarted));
    }

    #[test]
    fn parses_named_params() {
        let parsed = Notification::parse(&request(
            "{\"method\": \"minecraft:notification/players/joined\", \
             \"params\": {\"player\": {\"name\": \"alice\"}}}",
        ))
        .unwrap();
        assert_eq!(
            parsed,
            Some(Notification::PlayerJoined(Player {
                name: "alice".to_string(),
                id: None,
            }))
        );
    }

    #[test]
    fn parses_positional_params() {
        let parsed = Notification::parse(&request(
            "{\"method\": \"minecraft:notification/players/left\", \
             \"params\": [{\"name\": \"bob\", \"id\": \"8667ba71\"}]}",
        ))
        .unwrap();
        assert_eq!(
            parsed,
            Some(Notification::PlayerLeft(Player {
                name: "bob".to_string(),
                id: Some("8667ba71".to_string()),
            }))
        );
    }

    #[test]
    fn unknown_method_is_discarded() {
        let parsed =
            Notification::parse(&request("{\"method\": \"minecraft:notification/weather/changed\"}"))
                .unwrap();
        assert_eq!(parsed, None);
    }

    #[test]
    fn missing_payload_is_discarded() {
        let parsed =
            Notification::parse(&request("{\"method\": \"minecraft:notification/players/joined\"}"))
                .unwrap();
        assert_eq!(parsed, None);
    }

    #[test]
    fn undecodable_payload_is_an_error() {
        let result = Notification::parse(&request(
            "{\"method\": \"minecraft:notification/players/joined\", \"params\": [42]}",
        ));
        assert!(result.is_err());
    }
}
