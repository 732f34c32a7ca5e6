//! Radio link session: the layer applications talk to.
//!
//! A [`Session`] owns a duplex transport and adds:
//! - typed sends stamped with a millisecond timestamp and a serial number
//! - an edge-driven receive dispatcher that fans frames out to sinks
//! - latched "last error" and "last RSSI" state
//! - an optional RSSI request command
//!
//! Use [`SessionHandle`] to share a session between threads and a "data
//! ready" line.

pub mod config;
#[cfg(feature = "async")]
pub mod edges;
pub mod error;
pub mod handle;
pub mod rssi;
pub mod session;
pub mod sinks;
pub mod state;
pub mod tagger;

pub use config::SessionConfig;
#[cfg(feature = "async")]
pub use edges::{drive_edges, edge_channel};
pub use error::{Result, SessionError};
pub use handle::SessionHandle;
pub use rssi::{rssi_from_reply, rssi_from_trailing_byte, HEURISTIC_MAX};
pub use session::{DispatchOutcome, Session};
pub use sinks::SinkKind;
pub use state::{LinkState, SessionStats, NO_RSSI};
pub use tagger::Tagger;
