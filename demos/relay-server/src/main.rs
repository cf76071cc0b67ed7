//! Standalone relay: listens on `ROOMCAST_BIND` (default `0.0.0.0:443`).
//!
//! Log verbosity comes from `RUST_LOG`, e.g. `RUST_LOG=roomcast=debug`.

use roomcast::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "0.0.0.0:443";

#[tokio::main]
async fn main() -> Result<(), RoomcastError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind = std::env::var("ROOMCAST_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());

    let server = RoomcastServer::builder().bind(&bind).build().await?;
    tracing::info!(addr = %bind, "relay listening");
    server.run().await
}
