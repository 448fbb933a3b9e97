//! MeshCore companion protocol codec
//!
//! Types and codecs for talking to MeshCore companion radio firmware over BLE,
//! serial or TCP. Every frame starts with a code byte:
//!
//! - **Commands** (host → radio): a `CMD_*` byte
//! - **Responses** (radio → host): a `RESP_CODE_*` byte
//! - **Push notifications** (radio → host): a `PUSH_CODE_*` byte (0x80+)
//!
//! Stream transports additionally wrap each frame in a delimiter and length,
//! see [`frame`].
//!
//! # Example
//!
//! ```rust
//! use meshcore_protocol::{Command, Framer, Message, Response, StreamFramer};
//!
//! let framer = StreamFramer::host();
//! let wire = framer.wrap(&Command::DeviceQuery { app_version: 3 }.encode()).unwrap();
//! assert_eq!(&wire[..], &[b'<', 2, 0, 0x16, 3]);
//!
//! match Message::parse(&[0x09, 0x10, 0, 0, 0]) {
//!     Message::Response(Response::CurrentTime { time_secs }) => assert_eq!(time_secs, 16),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

mod commands;
mod constants;
mod error;
pub mod frame;
mod records;
mod responses;
mod types;
pub mod wire;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::{DatagramFramer, Framer, Framing, StreamFramer};
pub use responses::*;
pub use types::*;
pub use wire::WireReader;
