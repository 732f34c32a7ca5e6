//! Async edge delivery (requires the `async` feature).
//!
//! Interrupt-style callbacks should return quickly. [`edge_channel`] turns
//! each edge into a message on an unbounded queue, and [`drive_edges`] runs
//! the dispatcher for every queued edge on tokio's blocking pool, one at a
//! time and in arrival order.

use radiolink_transport::{ChipSelect, DuplexBus, SignalSource};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::handle::SessionHandle;
use crate::session::DispatchOutcome;

/// Register a callback on `source` that queues one message per edge.
pub fn edge_channel(source: &mut impl SignalSource) -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    source.on_edge(Box::new(move || {
        if tx.send(()).is_err() {
            trace!("edge dropped, driver stopped");
        }
    }));
    rx
}

/// Dispatch once per queued edge until every sender is dropped.
///
/// Returns the number of edges that delivered a frame.
pub async fn drive_edges<B, C>(
    handle: SessionHandle<B, C>,
    mut edges: mpsc::UnboundedReceiver<()>,
) -> u64
where
    B: DuplexBus + Send + 'static,
    C: ChipSelect + Send + 'static,
{
    let mut delivered = 0u64;
    while edges.recv().await.is_some() {
        let session = handle.clone();
        match tokio::task::spawn_blocking(move || session.dispatch()).await {
            Ok(DispatchOutcome::Delivered(_)) => delivered += 1,
            Ok(_) => {}
            Err(err) => warn!(%err, "dispatch task failed"),
        }
    }
    debug!(delivered, "edge driver stopped");
    delivered
}
