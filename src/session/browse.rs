//! Browse session
//!
//! Each browser connection runs two loops over one socket:
//!
//! ```text
//!            ┌──────────── listen ────────────┐
//!  browser ──┤ newBounds ──► watch::Sender ───┼──┐
//!            │ bad input ──► Errors ──────────┼──┼──► sink (Mutex)
//!            └────────────────────────────────┘  │      ▲
//!            ┌──────────── publish ───────────┐  │      │
//!            │ every tick: snapshot ∩ viewport├──┘      │
//!            │             ──► Buses ─────────┼─────────┘
//!            └────────────────────────────────┘
//! ```
//!
//! Both loops are futures polled by one `select!` inside the session task, so
//! whichever finishes first (peer closed, write failed) drops the other. The
//! viewport lives in a session-local watch channel: the listen loop is its
//! only writer and replaces all four bounds in one step.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::Result;
use crate::positions::{Position, PositionStore};
use crate::protocol::{parse_control, ControlMessage, ServerMessage};
use crate::stats::RelayStats;

use super::context::SessionContext;
use super::viewport::Viewport;

type WsSink<S> = Mutex<SplitSink<WebSocketStream<S>, Message>>;

/// Handler for one subscriber connection
pub struct BrowseSession<S> {
    ctx: SessionContext,
    ws: WebSocketStream<S>,
    store: Arc<PositionStore>,
    stats: Arc<RelayStats>,
    publish_interval: Duration,
}

impl<S> BrowseSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        ctx: SessionContext,
        ws: WebSocketStream<S>,
        store: Arc<PositionStore>,
        stats: Arc<RelayStats>,
        publish_interval: Duration,
    ) -> Self {
        Self {
            ctx,
            ws,
            store,
            stats,
            publish_interval,
        }
    }

    /// Serve the browser until either loop ends
    pub async fn run(self) -> Result<()> {
        let Self {
            ctx,
            ws,
            store,
            stats,
            publish_interval,
        } = self;

        let (sink, stream) = ws.split();
        let sink = Mutex::new(sink);
        let (viewport_tx, viewport_rx) = watch::channel(Viewport::default());

        let result = tokio::select! {
            result = listen(&ctx, stream, &sink, viewport_tx) => result,
            result = publish(&ctx, &store, &stats, &sink, viewport_rx, publish_interval) => result,
        };

        tracing::debug!(
            session_id = ctx.session_id,
            peer = %ctx.peer_addr,
            duration_secs = ctx.duration().as_secs(),
            "Browser disconnected"
        );
        result
    }
}

async fn listen<S>(
    ctx: &SessionContext,
    mut stream: SplitStream<WebSocketStream<S>>,
    sink: &WsSink<S>,
    viewport: watch::Sender<Viewport>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(frame) = stream.next().await {
        let parsed = match frame? {
            Message::Text(text) => parse_control(text.as_bytes()),
            Message::Binary(data) => parse_control(&data),
            Message::Close(_) => {
                super::finish_close(&mut *sink.lock().await).await?;
                break;
            }
            _ => continue,
        };

        match parsed {
            Ok(ControlMessage::NewBounds(bounds)) => {
                tracing::debug!(session_id = ctx.session_id, bounds = %bounds, "New bounds");
                viewport.send_replace(bounds);
            }
            Err(error) => {
                tracing::debug!(session_id = ctx.session_id, error = %error, "Rejected control message");
                send(sink, &ServerMessage::error(error)).await?;
            }
        }
    }

    Ok(())
}

async fn publish<S>(
    ctx: &SessionContext,
    store: &PositionStore,
    stats: &RelayStats,
    sink: &WsSink<S>,
    viewport: watch::Receiver<Viewport>,
    period: Duration,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let bounds = *viewport.borrow();
        let buses = visible(store.snapshot().await, &bounds);
        tracing::trace!(session_id = ctx.session_id, buses = buses.len(), "Publishing");

        send(sink, &ServerMessage::Buses { buses }).await?;
        stats.record_snapshot();
    }
}

/// Positions inside the viewport
pub fn visible(snapshot: Vec<Position>, viewport: &Viewport) -> Vec<Position> {
    snapshot
        .into_iter()
        .filter(|p| viewport.is_inside(p.lat, p.lng))
        .collect()
}

async fn send<S>(sink: &WsSink<S>, message: &ServerMessage) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let text = serde_json::to_string(message)?;
    sink.lock().await.send(Message::text(text)).await?;
    Ok(())
}
