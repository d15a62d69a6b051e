//! Non-blocking TCP socket backing [`tnc_core::io::TcpIo`], built on
//! `socket2` the way the teacher's `TokioIoProvider` sets up sockets
//! (`Socket::new` + `set_nonblocking`), minus the tokio runtime: this
//! engine drives its own tick loop, so a plain non-blocking `std`socket
//! is enough.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, ToSocketAddrs};

use socket2::{Domain, Protocol, Socket, Type};
use tnc_core::error::ConnectError;
use tnc_core::io::TcpIo;

/// A single non-blocking TCP socket, created lazily on `connect`.
#[derive(Default)]
pub struct NativeTcpIo {
    socket: Option<Socket>,
}

impl NativeTcpIo {
    pub fn new() -> Self {
        NativeTcpIo { socket: None }
    }
}

fn resolve_one(host: &str, port: u16) -> Result<SocketAddr, ConnectError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|_| ConnectError::ResolutionFailed)?
        .next()
        .ok_or(ConnectError::ResolutionFailed)
}

/// True if `e` indicates a non-blocking connect is merely in progress.
fn is_connect_in_progress(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    #[cfg(unix)]
    {
        if e.raw_os_error() == Some(libc::EINPROGRESS) {
            return true;
        }
    }
    false
}

impl TcpIo for NativeTcpIo {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), ConnectError> {
        let addr = resolve_one(host, port)?;
        let domain = match addr {
            SocketAddr::V4(_) => Domain::IPV4,
            SocketAddr::V6(_) => Domain::IPV6,
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).map_err(ConnectError::Other)?;
        socket.set_nonblocking(true).map_err(ConnectError::Other)?;

        match socket.connect(&addr.into()) {
            Ok(()) => {
                self.socket = Some(socket);
                Ok(())
            }
            Err(e) if is_connect_in_progress(&e) => {
                self.socket = Some(socket);
                Err(ConnectError::WouldBlock)
            }
            Err(e) => Err(ConnectError::Other(e)),
        }
    }

    fn poll_connect(&mut self) -> Result<(), ConnectError> {
        let socket = self.socket.as_ref().ok_or_else(|| ConnectError::Other(io::Error::other("no socket in progress")))?;

        match socket.take_error() {
            Ok(Some(e)) => Err(ConnectError::Other(e)),
            Err(e) => Err(ConnectError::Other(e)),
            Ok(None) => match socket.peer_addr() {
                Ok(_) => Ok(()),
                Err(e) if is_connect_in_progress(&e) || e.kind() == io::ErrorKind::NotConnected => {
                    Err(ConnectError::WouldBlock)
                }
                Err(e) => Err(ConnectError::Other(e)),
            },
        }
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let socket = self.socket.as_mut().ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        socket.write(buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let socket = self.socket.as_mut().ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        socket.read(buf)
    }

    fn close(&mut self) {
        self.socket = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn would_block_is_connect_in_progress() {
        assert!(is_connect_in_progress(&io::Error::from(io::ErrorKind::WouldBlock)));
    }

    #[test]
    fn connection_refused_is_not_connect_in_progress() {
        assert!(!is_connect_in_progress(&io::Error::from(io::ErrorKind::ConnectionRefused)));
    }

    #[test]
    fn resolve_one_finds_loopback() {
        let addr = resolve_one("127.0.0.1", 6300).unwrap();
        assert_eq!(addr.port(), 6300);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn fresh_native_io_recv_without_connect_is_not_connected() {
        let mut io = NativeTcpIo::new();
        let mut buf = [0u8; 8];
        let err = io.recv(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
