//! I/O abstraction for the connection channel state machine.
//!
//! This trait abstracts a single non-blocking TCP socket so that
//! [`crate::channel::Channel`] can be driven tick-by-tick in unit tests
//! with a fake implementation, while `tnc-telnet` supplies a real one
//! backed by `socket2`/`std::net`.
//!
//! # Poll-based design
//!
//! All operations are non-blocking. `recv` returns
//! `Err(io::ErrorKind::WouldBlock)` when no data is available instead of
//! blocking, matching the worker-tick model of spec §5 (10ms ticks,
//! strictly non-blocking socket operations).

use std::io;

use crate::error::ConnectError;

/// A single non-blocking TCP connection, as seen by one [`crate::channel::Channel`].
///
/// Implementations own at most one underlying socket at a time; calling
/// `connect` while already connected is undefined behavior from the
/// channel's point of view (the state machine only ever calls `connect`
/// from `DISC`).
pub trait TcpIo {
    /// Begin a non-blocking connection attempt to `host:port`.
    ///
    /// Returns `Ok(())` if the connection completed synchronously (rare
    /// for non-blocking sockets), `Err(ConnectError::WouldBlock)` if the
    /// attempt is in progress, or another error for resolution/OS
    /// failures.
    fn connect(&mut self, host: &str, port: u16) -> Result<(), ConnectError>;

    /// Poll a connection in progress. Returns `Ok(())` once connected,
    /// `Err(ConnectError::WouldBlock)` while still connecting, or the
    /// terminal connect error (refused, timed out, other).
    fn poll_connect(&mut self) -> Result<(), ConnectError>;

    /// Send up to `buf.len()` bytes without blocking.
    ///
    /// Returns the number of bytes actually written.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Receive up to `buf.len()` bytes without blocking.
    ///
    /// `Ok(0)` means the peer performed an orderly shutdown (EOF).
    /// `Err(io::ErrorKind::WouldBlock)` means no data is available yet.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Tear down the socket. Errors are ignored by callers (spec §4.3:
    /// "force state to DISC and close the socket, ignoring close errors").
    fn close(&mut self);
}

/// A fully in-memory [`TcpIo`] double for exercising the channel state
/// machine without real sockets. Kept public (not `#[cfg(test)]`-gated)
/// so downstream crates — `tnc-telnet` included — can script the same
/// state machine in their own tests without opening a socket.
pub mod fake {

    use super::*;
    use std::collections::VecDeque;

    /// Scripted behavior for [`FakeTcpIo`].
    #[derive(Debug, Clone)]
    pub enum Script {
        /// `connect` immediately succeeds.
        ConnectOk,
        /// `connect` returns `WouldBlock`; `poll_connect` succeeds after
        /// `ticks_until_ready` more calls.
        ConnectPending { ticks_until_ready: u32 },
        /// `connect` fails outright with the given error.
        ConnectFails(ConnectErrorKind),
        /// `connect` returns `WouldBlock`; `poll_connect` eventually
        /// fails with the given error.
        ConnectPendingThenFails {
            ticks_until_fail: u32,
            err: ConnectErrorKind,
        },
    }

    #[derive(Debug, Clone, Copy)]
    pub enum ConnectErrorKind {
        Refused,
        TimedOut,
        Other,
    }

    impl ConnectErrorKind {
        fn into_connect_error(self) -> ConnectError {
            match self {
                ConnectErrorKind::Refused => {
                    ConnectError::Other(io::Error::from(io::ErrorKind::ConnectionRefused))
                }
                ConnectErrorKind::TimedOut => {
                    ConnectError::Other(io::Error::from(io::ErrorKind::TimedOut))
                }
                ConnectErrorKind::Other => {
                    ConnectError::Other(io::Error::other("simulated failure"))
                }
            }
        }
    }

    /// In-memory, scriptable [`TcpIo`] for tests.
    pub struct FakeTcpIo {
        script: Script,
        ticks: u32,
        pub connected: bool,
        pub sent: Vec<u8>,
        pub inbox: VecDeque<Vec<u8>>,
        pub reset_on_next_op: bool,
        pub eof_on_next_recv: bool,
    }

    impl FakeTcpIo {
        pub fn new(script: Script) -> Self {
            Self {
                script,
                ticks: 0,
                connected: false,
                sent: Vec::new(),
                inbox: VecDeque::new(),
                reset_on_next_op: false,
                eof_on_next_recv: false,
            }
        }

        pub fn push_inbound(&mut self, data: &[u8]) {
            self.inbox.push_back(data.to_vec());
        }
    }

    impl TcpIo for FakeTcpIo {
        fn connect(&mut self, _host: &str, _port: u16) -> Result<(), ConnectError> {
            match self.script {
                Script::ConnectOk => {
                    self.connected = true;
                    Ok(())
                }
                Script::ConnectFails(err) => Err(err.into_connect_error()),
                Script::ConnectPending { .. } | Script::ConnectPendingThenFails { .. } => {
                    Err(ConnectError::WouldBlock)
                }
            }
        }

        fn poll_connect(&mut self) -> Result<(), ConnectError> {
            self.ticks += 1;
            match self.script {
                Script::ConnectOk => {
                    self.connected = true;
                    Ok(())
                }
                Script::ConnectFails(err) => Err(err.into_connect_error()),
                Script::ConnectPending { ticks_until_ready } => {
                    if self.ticks >= ticks_until_ready {
                        self.connected = true;
                        Ok(())
                    } else {
                        Err(ConnectError::WouldBlock)
                    }
                }
                Script::ConnectPendingThenFails {
                    ticks_until_fail,
                    err,
                } => {
                    if self.ticks >= ticks_until_fail {
                        Err(err.into_connect_error())
                    } else {
                        Err(ConnectError::WouldBlock)
                    }
                }
            }
        }

        fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.reset_on_next_op {
                self.reset_on_next_op = false;
                return Err(io::Error::from(io::ErrorKind::ConnectionReset));
            }
            self.sent.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.reset_on_next_op {
                self.reset_on_next_op = false;
                return Err(io::Error::from(io::ErrorKind::ConnectionReset));
            }
            if self.eof_on_next_recv {
                return Ok(0);
            }
            match self.inbox.pop_front() {
                Some(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            }
        }

        fn close(&mut self) {
            self.connected = false;
        }
    }
}
