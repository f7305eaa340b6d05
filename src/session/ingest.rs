//! Ingest session
//!
//! Reads position updates from one bus connection and applies them to the
//! store. The protocol is fire-and-forget: nothing is ever written back, and
//! malformed frames are dropped without closing the connection.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::Result;
use crate::positions::PositionStore;
use crate::protocol::parse_position;
use crate::stats::RelayStats;

use super::context::SessionContext;

/// Handler for one producer connection
pub struct IngestSession<S> {
    ctx: SessionContext,
    ws: WebSocketStream<S>,
    store: Arc<PositionStore>,
    stats: Arc<RelayStats>,
}

impl<S> IngestSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        ctx: SessionContext,
        ws: WebSocketStream<S>,
        store: Arc<PositionStore>,
        stats: Arc<RelayStats>,
    ) -> Self {
        Self {
            ctx,
            ws,
            store,
            stats,
        }
    }

    /// Read until the peer goes away
    ///
    /// Returns `Ok` on a clean close or end of stream, `Err` on a transport
    /// failure. Either way the store keeps every position already applied.
    pub async fn run(mut self) -> Result<()> {
        while let Some(frame) = self.ws.next().await {
            match frame? {
                Message::Text(text) => self.apply(text.as_bytes()).await,
                Message::Binary(data) => self.apply(&data).await,
                Message::Close(_) => {
                    super::finish_close(&mut self.ws).await?;
                    break;
                }
                _ => {}
            }
        }

        tracing::debug!(
            session_id = self.ctx.session_id,
            peer = %self.ctx.peer_addr,
            "Bus disconnected"
        );
        Ok(())
    }

    async fn apply(&self, payload: &[u8]) {
        match parse_position(payload) {
            Some(position) => {
                tracing::trace!(session_id = self.ctx.session_id, position = %position, "Update");
                self.store.upsert(position).await;
                self.stats.record_accepted();
            }
            None => {
                tracing::trace!(
                    session_id = self.ctx.session_id,
                    len = payload.len(),
                    "Dropped malformed update"
                );
                self.stats.record_rejected();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use futures_util::SinkExt;
    use tokio::io::DuplexStream;
    use tokio_tungstenite::tungstenite::protocol::Role as WsRole;

    use super::*;
    use crate::positions::Position;
    use crate::session::Role;

    async fn pipe() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client, WsRole::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server, WsRole::Server, None).await;
        (client, server)
    }

    fn spawn_session(
        ws: WebSocketStream<DuplexStream>,
        store: Arc<PositionStore>,
        stats: Arc<RelayStats>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let ctx = SessionContext::new(1, addr, Role::Ingest);
        tokio::spawn(IngestSession::new(ctx, ws, store, stats).run())
    }

    async fn wait_for_bus(store: &PositionStore, bus_id: &str) -> Position {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(p) = store.snapshot().await.into_iter().find(|p| p.bus_id == bus_id) {
                    return p;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("bus never reached the store")
    }

    #[tokio::test]
    async fn test_valid_update_applied() {
        let (mut client, server) = pipe().await;
        let store = Arc::new(PositionStore::new());
        let stats = Arc::new(RelayStats::new());
        let handle = spawn_session(server, Arc::clone(&store), Arc::clone(&stats));

        client
            .send(Message::text(
                r#"{"busId":"156-0","lat":55.751244,"lng":37.618423,"route":"156"}"#,
            ))
            .await
            .unwrap();

        let position = wait_for_bus(&store, "156-0").await;
        assert_eq!(position, Position::new("156-0", 55.751244, 37.618423, "156"));

        client.close(None).await.unwrap();
        assert!(handle.await.unwrap().is_ok());
        assert_eq!(stats.snapshot().updates_accepted, 1);
    }

    #[tokio::test]
    async fn test_garbage_then_valid() {
        let (mut client, server) = pipe().await;
        let store = Arc::new(PositionStore::new());
        let stats = Arc::new(RelayStats::new());
        let _handle = spawn_session(server, Arc::clone(&store), Arc::clone(&stats));

        client.send(Message::text("not a json")).await.unwrap();
        client
            .send(Message::text(r#"{"lat":55.75,"lng":37.61,"route":"132"}"#))
            .await
            .unwrap();
        client
            .send(Message::text(r#"{"busId":"test-bad","lng":37.61,"route":"132"}"#))
            .await
            .unwrap();
        client
            .send(Message::Binary(bytes::Bytes::from_static(
                br#"{"busId":"test-good","lat":55.751244,"lng":37.618423,"route":"132"}"#,
            )))
            .await
            .unwrap();

        wait_for_bus(&store, "test-good").await;
        assert_eq!(store.len().await, 1);
        assert_eq!(stats.snapshot().updates_rejected, 3);
    }

    #[tokio::test]
    async fn test_no_response_sent() {
        let (mut client, server) = pipe().await;
        let store = Arc::new(PositionStore::new());
        let _handle = spawn_session(server, Arc::clone(&store), Arc::new(RelayStats::new()));

        client.send(Message::text("not a json")).await.unwrap();
        client
            .send(Message::text(r#"{"busId":"a","lat":1,"lng":2,"route":"1"}"#))
            .await
            .unwrap();

        let reply = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
        assert!(reply.is_err(), "ingest endpoint must stay silent");
    }

    #[tokio::test]
    async fn test_positions_survive_disconnect() {
        let (mut client, server) = pipe().await;
        let store = Arc::new(PositionStore::new());
        let handle = spawn_session(server, Arc::clone(&store), Arc::new(RelayStats::new()));

        client
            .send(Message::text(r#"{"busId":"a","lat":1,"lng":2,"route":"1"}"#))
            .await
            .unwrap();
        wait_for_bus(&store, "a").await;

        drop(client);
        let _ = handle.await.unwrap();

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_close_handshake_answered() {
        let (mut client, server) = pipe().await;
        let handle = spawn_session(server, Arc::new(PositionStore::new()), Arc::new(RelayStats::new()));

        client.close(None).await.unwrap();

        let reply = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("no close reply within deadline");
        assert!(matches!(reply, Some(Ok(Message::Close(_)))));
        assert!(handle.await.unwrap().is_ok());
    }
}
