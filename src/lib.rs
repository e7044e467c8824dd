mod error;
mod jsonrpc;
mod notification;
pub mod types;
mod value;
mod ws;

pub use error::Error;
pub use jsonrpc::{Params, RpcError};
pub use notification::Notification;
pub use value::Value;
pub use ws::{Close, ConnectConfig, Connection};

pub type Result<T> = std::result::Result<T, Error>;
