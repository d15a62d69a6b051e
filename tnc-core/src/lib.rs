//! # tnc-core
//!
//! Platform-independent WA8DED host-link protocol engine for carrying
//! AX.25-style TNC sessions over TCP/Telnet instead of radio.
//!
//! This crate contains the protocol engine with **zero socket
//! dependencies** — all I/O is abstracted through the [`io::TcpIo`]
//! trait, so the same state machine drives a real non-blocking socket in
//! `tnc-telnet` and a fully scripted fake in this crate's own tests.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  tnc-core (platform-independent, no socket/thread deps      │
//! │            beyond std::thread in the Engine itself)         │
//! │  ├── stations   (callsign -> host:port directory)           │
//! │  ├── monitor    (channel 0: synthesized AX.25 frame trace)  │
//! │  ├── channel    (channels 1..N: state machine + tx/rx)      │
//! │  ├── codec      (terminal/host wire framing)                │
//! │  ├── dispatch   (command interpreter)                       │
//! │  └── io::TcpIo  (abstracts the per-channel socket)          │
//! └─────────────────────────────────────────────────────────────┘
//!                 ▲
//!    ┌────────────┴────────────┐
//!    │  tnc-telnet             │
//!    │  (native TcpIo, CLI)    │
//!    └─────────────────────────┘
//! ```
//!
//! ## Example: polling a freshly constructed channel
//!
//! ```rust
//! use tnc_core::channel::Channel;
//! use tnc_core::io::fake::FakeTcpIo;
//!
//! let mut channel: Channel<FakeTcpIo> = Channel::new(1, b"N0CALL");
//! assert_eq!(channel.link_status(), "0 0 0 0 0 0");
//! assert!(channel.poll(None).is_none());
//! ```

pub mod channel;
pub mod codec;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod io;
pub mod monitor;
pub mod stations;

pub use channel::{Channel, ChannelState};
pub use engine::{Engine, Mode};
pub use error::{ConnectError, TncError};
pub use event::{Event, EventKind};
pub use io::TcpIo;
pub use monitor::Monitor;
pub use stations::Station;
