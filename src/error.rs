use crate::jsonrpc::RpcError;
use crate::ws::Close;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Rpc error {0}")]
    Rpc(#[from] RpcError),
    #[error("Encode error {0}")]
    Encode(serde_json::Error),
    #[error("Decode error {0}")]
    Decode(serde_json::Error),
    #[error("Connect error {0}")]
    Connect(tokio_tungstenite::tungstenite::Error),
    #[error("Websocket error {0}")]
    Websocket(tokio_tungstenite::tungstenite::Error),
    #[error("Disconnected: {0}")]
    Disconnected(Close),
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Already waiting for the next notification")]
    AlreadyWaiting,
}
