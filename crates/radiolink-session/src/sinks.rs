//! Single-slot event handlers.
//!
//! Each category holds at most one handler; registering again replaces it.
//! A handler is taken out of its slot while it runs, so it may send through
//! a [`SessionHandle`](crate::SessionHandle) or re-register handlers without
//! deadlocking the dispatcher.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

pub type MessageSink = Box<dyn FnMut(&str, u32) + Send>;
pub type BufferSink = Box<dyn FnMut(&[u8], u32) + Send>;
pub type ErrorSink = Box<dyn FnMut(&str) + Send>;
pub type RssiSink = Box<dyn FnMut(i32) + Send>;
pub type NumberSink = Box<dyn FnMut(i32, u32) + Send>;
pub type StringSink = Box<dyn FnMut(&str, u32) + Send>;
pub type ValueSink = Box<dyn FnMut(&str, i32, u32) + Send>;

/// Event categories a handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Message,
    MessageBuffer,
    Error,
    Rssi,
    Number,
    String,
    Value,
}

#[derive(Default)]
pub(crate) struct Sinks {
    pub(crate) message: Option<MessageSink>,
    pub(crate) message_buffer: Option<BufferSink>,
    pub(crate) error: Option<ErrorSink>,
    pub(crate) rssi: Option<RssiSink>,
    pub(crate) number: Option<NumberSink>,
    pub(crate) string: Option<StringSink>,
    pub(crate) value: Option<ValueSink>,
}

impl Sinks {
    /// Remove the handler for one category.
    fn clear(&mut self, kind: SinkKind) {
        match kind {
            SinkKind::Message => self.message = None,
            SinkKind::MessageBuffer => self.message_buffer = None,
            SinkKind::Error => self.error = None,
            SinkKind::Rssi => self.rssi = None,
            SinkKind::Number => self.number = None,
            SinkKind::String => self.string = None,
            SinkKind::Value => self.value = None,
        }
    }

    fn is_registered(&self, kind: SinkKind) -> bool {
        match kind {
            SinkKind::Message => self.message.is_some(),
            SinkKind::MessageBuffer => self.message_buffer.is_some(),
            SinkKind::Error => self.error.is_some(),
            SinkKind::Rssi => self.rssi.is_some(),
            SinkKind::Number => self.number.is_some(),
            SinkKind::String => self.string.is_some(),
            SinkKind::Value => self.value.is_some(),
        }
    }
}

impl std::fmt::Debug for Sinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sinks")
            .field("message", &self.message.is_some())
            .field("message_buffer", &self.message_buffer.is_some())
            .field("error", &self.error.is_some())
            .field("rssi", &self.rssi.is_some())
            .field("number", &self.number.is_some())
            .field("string", &self.string.is_some())
            .field("value", &self.value.is_some())
            .finish()
    }
}

/// Handler slots shared between a session and its in-flight deliveries.
#[derive(Clone, Default)]
pub(crate) struct SinkRegistry {
    slots: Arc<Mutex<Sinks>>,
}

impl SinkRegistry {
    pub(crate) fn set(&self, install: impl FnOnce(&mut Sinks)) {
        install(&mut self.lock());
    }

    pub(crate) fn clear(&self, kind: SinkKind) {
        self.lock().clear(kind);
    }

    pub(crate) fn is_registered(&self, kind: SinkKind) -> bool {
        self.lock().is_registered(kind)
    }

    /// Run the handler in `slot`, if any, with no lock held.
    ///
    /// The handler goes back into its slot afterwards unless a new one was
    /// registered meanwhile. Returns the panic message if it panicked.
    pub(crate) fn call<S>(
        &self,
        slot: fn(&mut Sinks) -> &mut Option<S>,
        invoke: impl FnOnce(&mut S),
    ) -> Result<(), String> {
        let taken = slot(&mut *self.lock()).take();
        let Some(mut sink) = taken else {
            return Ok(());
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| invoke(&mut sink)));

        let mut sinks = self.lock();
        let entry = slot(&mut *sinks);
        if entry.is_none() {
            *entry = Some(sink);
        }
        outcome.map_err(|panic| panic_message(panic.as_ref()))
    }

    /// Hand a latched error message to the error handler.
    pub(crate) fn notify_error(&self, message: &str) {
        if self.call(|s| &mut s.error, |sink| sink(message)).is_err() {
            warn!("error sink panicked");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sinks> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.lock(), f)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_is_restored_after_call() {
        let registry = SinkRegistry::default();
        registry.set(|s| s.rssi = Some(Box::new(|_: i32| {})));
        assert!(registry.call(|s| &mut s.rssi, |sink| sink(-40)).is_ok());
        assert!(registry.is_registered(SinkKind::Rssi));
    }

    #[test]
    fn registration_during_call_wins() {
        let registry = SinkRegistry::default();
        let inner = registry.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        registry.set(move |s| {
            s.number = Some(Box::new(move |_: i32, _: u32| {
                let log = Arc::clone(&log);
                inner.set(move |s| {
                    s.number = Some(Box::new(move |n: i32, _: u32| log.lock().unwrap().push(n)))
                });
            }))
        });

        registry.call(|s| &mut s.number, |sink| sink(1, 0)).unwrap();
        registry.call(|s| &mut s.number, |sink| sink(2, 0)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn panicking_handler_is_reported_and_kept() {
        let registry = SinkRegistry::default();
        registry.set(|s| s.error = Some(Box::new(|_: &str| panic!("bad handler"))));
        let err = registry.call(|s| &mut s.error, |sink| sink("x")).unwrap_err();
        assert_eq!(err, "bad handler");
        assert!(registry.is_registered(SinkKind::Error));
    }

    #[test]
    fn empty_slot_is_a_no_op() {
        let registry = SinkRegistry::default();
        assert!(registry.call(|s| &mut s.value, |sink| sink("a", 1, 2)).is_ok());
        registry.clear(SinkKind::Value);
        assert!(!registry.is_registered(SinkKind::Value));
    }
}
