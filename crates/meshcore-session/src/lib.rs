//! MeshCore companion session engine
//!
//! Sequencing on top of [`meshcore_protocol`]:
//!
//! - [`Session`]: sans-IO half-duplex command/response state machine with
//!   delivery-ACK correlation
//! - [`spawn_session`] / [`SessionHandle`]: the same session driven by a
//!   tokio task over byte channels, with per-command deadlines
//! - [`OfflineQueue`], [`ExpectedAckTable`], [`ContactIterator`]: the bounded
//!   structures a companion radio keeps for message sync, ACKs and contact
//!   sync
//! - [`ReferencePeer`] / [`PeerLink`]: an in-process radio for tests
//!
//! # Example
//!
//! ```rust,ignore
//! use meshcore_session::{spawn_session, SessionConfig, Transport};
//!
//! let config = SessionConfig::load("session.yaml")?;
//! let (handle, mut events) = spawn_session(&config, Transport { outbound, inbound });
//! let info = handle.device_query().await?;
//! let sync = handle.get_contacts(None).await?;
//! ```

pub mod ack_table;
pub mod client;
pub mod clock;
pub mod config;
pub mod contact_sync;
pub mod error;
pub mod logging;
pub mod offline_queue;
pub mod peer;
pub mod session;

pub use ack_table::{ExpectedAck, ExpectedAckTable};
pub use client::{spawn_session, ContactSync, SentReceipt, SessionHandle, Transport};
pub use clock::unix_now;
pub use config::SessionConfig;
pub use contact_sync::ContactIterator;
pub use error::{ConfigError, SessionError};
pub use offline_queue::{OfflineEntry, OfflineQueue};
pub use peer::{PeerLink, ReferencePeer};
pub use session::{
    Completion, FrameOutcome, Reply, RequestToken, Session, SessionEvent, SessionState,
};
