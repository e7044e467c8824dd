use msmp_rs::types::ServerState;
use msmp_rs::{ConnectConfig, Connection, Params, Result, Value};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let connection =
        Connection::connect(ConnectConfig::new("localhost", 25585, "<management-secret>")).await?;

    let status: ServerState = connection
        .call("minecraft:server/status", None)
        .await?
        .to_typed()?;
    println!("{status:?}");

    let saving: bool = connection
        .call(
            "minecraft:server/save",
            Some(Params::named([("flush", Value::Boolean(true))])),
        )
        .await?
        .to_typed()?;
    println!("saving: {saving}");

    connection.close().await
}
