use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use radiolink_transport::{ChipSelect, DuplexBus, SignalSource};
use tracing::{debug, trace};

use crate::error::SessionError;
use crate::session::{DispatchOutcome, Pulled, Session};

/// A cloneable, thread-safe handle to a [`Session`].
///
/// Application threads and the edge callback each hold a clone; the inner
/// mutex serialises their use of the channel. The dispatcher releases the
/// lock before calling sinks, so a sink may reply through the handle. Sinks
/// fired by an operation the caller runs under [`lock`](Self::lock) still
/// run while that guard is held.
///
/// At most one edge is handled at a time. An edge that arrives while another
/// is still being dispatched is dropped and counted, not queued.
pub struct SessionHandle<B, C> {
    inner: Arc<Shared<B, C>>,
}

struct Shared<B, C> {
    session: Mutex<Session<B, C>>,
    decoding: AtomicBool,
    dropped_edges: AtomicU64,
}

impl<B: DuplexBus, C: ChipSelect> SessionHandle<B, C> {
    pub fn new(session: Session<B, C>) -> Self {
        Self {
            inner: Arc::new(Shared {
                session: Mutex::new(session),
                decoding: AtomicBool::new(false),
                dropped_edges: AtomicU64::new(0),
            }),
        }
    }

    /// Lock the session for a sequence of operations.
    ///
    /// A panic in another holder does not poison the handle; the session
    /// keeps no invariant that a half-finished operation could break.
    pub fn lock(&self) -> MutexGuard<'_, Session<B, C>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the session.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut Session<B, C>) -> T) -> T {
        f(&mut self.lock())
    }

    /// Run the receive dispatcher once, unless an edge is already in flight.
    pub fn dispatch(&self) -> DispatchOutcome {
        if self.inner.decoding.swap(true, Ordering::AcqRel) {
            self.inner.dropped_edges.fetch_add(1, Ordering::Relaxed);
            debug!("edge dropped, dispatch already in flight");
            return DispatchOutcome::Busy;
        }
        let _in_flight = InFlight(&self.inner.decoding);

        let (pulled, sinks) = {
            let mut session = self.lock();
            (session.pull(), session.sinks())
        };
        match pulled {
            Pulled::Empty => DispatchOutcome::Empty,
            Pulled::Failed(message) => {
                sinks.notify_error(&message);
                DispatchOutcome::Failed
            }
            Pulled::Frame(delivery) => match delivery.deliver(&sinks) {
                Ok(packet) => DispatchOutcome::Delivered(packet),
                Err(panic) => {
                    let message = self.lock().latch_failure(&SessionError::SinkPanicked(panic));
                    sinks.notify_error(&message);
                    DispatchOutcome::Failed
                }
            },
        }
    }

    /// Recover the session once every other clone is gone.
    pub fn try_into_inner(self) -> Result<Session<B, C>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(shared) => Ok(shared
                .session
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl<B, C> SessionHandle<B, C> {
    /// Edges dropped because a dispatch was already in flight.
    pub fn dropped_edges(&self) -> u64 {
        self.inner.dropped_edges.load(Ordering::Relaxed)
    }
}

impl<B, C> SessionHandle<B, C>
where
    B: DuplexBus + Send + 'static,
    C: ChipSelect + Send + 'static,
{
    /// Run the dispatcher on every edge raised by `source`.
    pub fn attach(&self, source: &mut impl SignalSource) {
        let handle = self.clone();
        source.on_edge(Box::new(move || {
            let outcome = handle.dispatch();
            trace!(?outcome, "edge handled");
        }));
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<B, C> Clone for SessionHandle<B, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B, C> std::fmt::Debug for SessionHandle<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("clones", &Arc::strong_count(&self.inner))
            .field("dropped_edges", &self.dropped_edges())
            .finish()
    }
}
