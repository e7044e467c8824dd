use tokio::signal;

use msmp_rs::{ConnectConfig, Connection, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let connection =
        Connection::connect(ConnectConfig::new("localhost", 25585, "<management-secret>")).await?;

    let listener = connection.clone();
    tokio::spawn(async move {
        loop {
            match listener.next_notification().await {
                Ok(notification) => println!("{notification:?}"),
                Err(e) => {
                    eprintln!("notification stream ended: {e}");
                    break;
                }
            }
        }
    });

    println!("waiting for ctrl-c");
    signal::ctrl_c().await.ok();

    connection.close().await
}
