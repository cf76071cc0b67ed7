//! Per-connection handler.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the relay, which queues `INIT`
//!   2. Spawn a writer that drains the outbound queue onto the socket
//!   3. Loop: receive frames → decode → hand to the relay
//!   4. On exit, the drop guard tells the relay the connection is gone

use std::sync::Arc;

use roomcast_protocol::{ClientMessage, Codec, ConnectionId};
use roomcast_session::Outbound;
use roomcast_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::RoomcastError;
use crate::actor::RelayHandle;

/// Disconnects the connection from the relay when the handler exits,
/// including on panic. `Drop` is synchronous, so the command is sent
/// from a spawned task.
struct DisconnectGuard {
    conn_id: ConnectionId,
    relay: RelayHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let relay = self.relay.clone();
        tokio::spawn(async move {
            if relay.disconnect(conn_id).await.is_err() {
                tracing::debug!(%conn_id, "relay gone before disconnect");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    relay: RelayHandle,
    codec: C,
) -> Result<(), RoomcastError>
where
    C: Codec + Clone,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let outbound = relay.connect(conn_id).await?;
    let _guard = DisconnectGuard {
        conn_id,
        relay: relay.clone(),
    };

    tokio::spawn(write_loop(Arc::clone(&conn), outbound, codec.clone()));

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed by peer");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let message: ClientMessage = match codec.decode(&data) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode message");
                continue;
            }
        };

        relay.inbound(conn_id, message).await?;
    }

    // _guard drops here → relay disconnect fires.
    Ok(())
}

/// Writes queued messages until the relay drops the queue or the socket
/// fails, then closes the socket.
///
/// On a send failure the receiver is dropped with the task, which the
/// relay sees as a closed queue on its next delivery.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut outbound: mpsc::Receiver<Outbound>,
    codec: C,
) {
    let conn_id = conn.id();

    while let Some(message) = outbound.recv().await {
        let bytes = match codec.encode(message.as_ref()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(%conn_id, error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
}
