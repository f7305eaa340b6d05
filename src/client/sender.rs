//! Lane sender
//!
//! Owns one persistent connection to the relay and drains one lane into it.
//! Reconnection is an outer loop around [`SenderTask::drain`]; the drain
//! itself knows nothing about retries.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};

use crate::error::{Error, Result};
use crate::positions::Position;

/// Drains one lane over one outbound websocket
pub struct SenderTask {
    lane_id: usize,
    url: String,
    queue: mpsc::Receiver<Position>,
    reconnect_delay: Duration,
}

impl SenderTask {
    pub fn new(
        lane_id: usize,
        url: impl Into<String>,
        queue: mpsc::Receiver<Position>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            lane_id,
            url: url.into(),
            queue,
            reconnect_delay,
        }
    }

    /// Connect, drain, and reconnect after every transport failure
    ///
    /// Returns once every producer of the lane has gone away. A message being
    /// written when the connection fails is lost; nothing is redelivered.
    pub async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            match connect_async(self.url.as_str()).await {
                Ok((ws, _)) => {
                    tracing::info!(lane = self.lane_id, url = %self.url, attempt = attempt, "Lane connected");
                    attempt = 0;

                    match self.drain(ws).await {
                        Ok(()) => {
                            tracing::debug!(lane = self.lane_id, "Lane queue closed");
                            return;
                        }
                        Err(e) => {
                            tracing::warn!(lane = self.lane_id, error = %e, "Lane connection lost");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(lane = self.lane_id, url = %self.url, error = %e, "Lane connect failed");
                }
            }

            attempt = attempt.saturating_add(1);
            tokio::time::sleep(self.reconnect_delay).await;

            if self.queue.is_closed() && self.queue.is_empty() {
                tracing::debug!(lane = self.lane_id, "Lane queue closed while reconnecting");
                return;
            }
        }
    }

    /// Forward queued positions until the queue closes or the transport fails
    ///
    /// Inbound frames are read only to notice the relay going away.
    pub async fn drain<S>(&mut self, ws: WebSocketStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                next = self.queue.recv() => {
                    let Some(position) = next else {
                        let _ = sink.close().await;
                        return Ok(());
                    };
                    let text = serde_json::to_string(&position)?;
                    sink.send(Message::text(text)).await?;
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Close(_))) | None => return Err(Error::ConnectionClosed),
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(_)) => {}
                },
            }
        }
    }
}
