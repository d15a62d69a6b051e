//! Error types for the host-link protocol engine.

use thiserror::Error;

/// Errors surfaced by the host-link codec and engine.
///
/// Per the propagation policy (spec §7): channel workers and the
/// command interpreter never raise these. Only [`TncError::ClosedStream`]
/// is permitted to unwind out of the engine's host-link read loop (EOF
/// on the host stream, either direction).
#[derive(Error, Debug)]
pub enum TncError {
    /// The host stream hit EOF while reading a frame.
    #[error("host stream closed")]
    ClosedStream,

    /// Any other I/O failure on the host stream.
    #[error("host stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-blocking TCP connect outcomes distinguished by [`crate::io::TcpIo`].
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The connect attempt is still in progress; poll again next tick.
    #[error("connect in progress")]
    WouldBlock,

    /// DNS/address resolution failed before a socket could be opened.
    #[error("domain resolution failed")]
    ResolutionFailed,

    /// Any other OS-level connect failure.
    #[error("connect failed: {0}")]
    Other(#[from] std::io::Error),
}
