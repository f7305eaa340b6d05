//! Per-connection protocol handlers
//!
//! Both handlers are generic over the underlying byte stream so they run the
//! same over TCP in production and over in-memory pipes in tests.

pub mod browse;
pub mod context;
pub mod ingest;
pub mod viewport;

pub use browse::BrowseSession;
pub use context::{Role, SessionContext};
pub use ingest::IngestSession;
pub use viewport::Viewport;

use futures_util::{Sink, SinkExt};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::error::{Error, Result};

/// Write out the close reply tungstenite queues after a peer's close frame
async fn finish_close<K>(sink: &mut K) -> Result<()>
where
    K: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match sink.flush().await.map_err(Error::from) {
        Err(e) if !e.is_disconnect() => Err(e),
        _ => Ok(()),
    }
}
