//! Connection Channel state machine (spec §4.3): channels 1..N, each
//! owning a non-blocking TCP socket, a transmit buffer, a unified
//! receive queue, and a `{DISC, SETUP, CONN}` state machine driven by an
//! independent worker tick.
//!
//! Grounded in `original_source/TNC/channel.py`'s `Channel.run()` tick
//! loop, restructured the way the teacher structures a tick-driven state
//! machine generic over its I/O: an explicit state enum, one state-
//! transition method per state, and a `tick<I: IoProvider>()` entry
//! point that dispatches to them.

use std::collections::VecDeque;
use std::io;

use crate::error::ConnectError;
use crate::event::{poll_queue, Event, EventKind};
use crate::io::TcpIo;
use crate::monitor::{Control, Monitor};
use crate::stations::Station;

pub const MAX_PKTLEN: usize = 254;
pub const MAX_I_MSGS: usize = 9;

/// The 16-value AX.25 link-state table collapses to three states a
/// Telnet-backed channel can actually occupy (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disc,
    Setup,
    Conn,
}

impl ChannelState {
    /// Code used in the `L` link-status sextet.
    pub fn code(self) -> u8 {
        match self {
            ChannelState::Disc => 0,
            ChannelState::Setup => 1,
            ChannelState::Conn => 4,
        }
    }
}

/// One connection channel (1..N). Generic over [`TcpIo`] so the state
/// machine can be driven tick-by-tick against [`crate::io::fake::FakeTcpIo`]
/// in tests, and against a real non-blocking socket in `tnc-telnet`.
pub struct Channel<I: TcpIo> {
    id: u8,
    mycall: Vec<u8>,
    remote: Option<Vec<u8>>,
    state: ChannelState,
    tx_buffer: Vec<u8>,
    queue: VecDeque<Event>,
    seq: u8,
    nxt: u8,
    io: Option<I>,
}

impl<I: TcpIo> Channel<I> {
    pub fn new(id: u8, mycall: &[u8]) -> Self {
        Channel {
            id,
            mycall: mycall.to_ascii_uppercase(),
            remote: None,
            state: ChannelState::Disc,
            tx_buffer: Vec::new(),
            queue: VecDeque::new(),
            seq: 0,
            nxt: 0,
            io: None,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn callsign_get(&self) -> Vec<u8> {
        self.mycall.clone()
    }

    pub fn callsign_set(&mut self, callsign: &[u8]) {
        self.mycall = callsign.to_ascii_uppercase();
    }

    pub fn remote_get(&self) -> Option<Vec<u8>> {
        self.remote.clone()
    }

    /// Sets `remote`; the worker picks this up on its next tick. Calling
    /// this while already connected has no immediate effect here — the
    /// reconnect behavior is entirely worker-driven (spec §4.3).
    pub fn connect(&mut self, callsign: &[u8]) {
        self.remote = Some(callsign.to_ascii_uppercase());
    }

    /// Emits the DISC→UA monitor pair and a `DISCONNECTED` status if the
    /// channel isn't already idle, then clears `remote` so the worker
    /// tears the socket down on its next tick.
    pub fn disconnect(&mut self, monitor: &mut Monitor) {
        if self.state == ChannelState::Disc {
            return;
        }
        if let Some(remote) = &self.remote {
            monitor.log(Control::Disc, &self.mycall, remote, None, None, None);
            monitor.log(Control::Ua, remote, &self.mycall, None, None, None);
            self.queue
                .push_back(Event::link_status(format!("DISCONNECTED fm {}", display(remote)).into_bytes()));
        }
        self.remote = None;
    }

    /// Appends to `tx_buffer`. A trailing bare `CR` gets an `LF`
    /// appended, matching hosts that expect `CRLF`.
    pub fn transmit(&mut self, bytes: &[u8]) {
        self.tx_buffer.extend_from_slice(bytes);
        if bytes.last() == Some(&b'\r') {
            self.tx_buffer.push(b'\n');
        }
    }

    pub fn poll(&mut self, kind: Option<EventKind>) -> Option<Event> {
        poll_queue(&mut self.queue, kind)
    }

    fn info_count(&self) -> usize {
        self.queue.iter().filter(|e| e.kind == EventKind::Info).count()
    }

    fn status_count(&self) -> usize {
        self.queue.iter().filter(|e| e.kind == EventKind::LinkStatus).count()
    }

    /// Six ASCII integers: status count, info count, `ceil(tx_buffer /
    /// MAX_PKTLEN)`, two reserved zero fields, and the link-state code.
    pub fn link_status(&self) -> String {
        let pending_packets = self.tx_buffer.len().div_ceil(MAX_PKTLEN);
        format!(
            "{} {} {} 0 0 {}",
            self.status_count(),
            self.info_count(),
            pending_packets,
            self.state.code()
        )
    }

    /// Advance the state machine by one worker tick.
    ///
    /// `resolve` looks up a callsign in the Station Directory; `new_io`
    /// constructs a fresh, unconnected socket for a DISC→SETUP/CONN
    /// transition; `monitor` is the shared channel-0 sink.
    pub fn tick(
        &mut self,
        resolve: &dyn Fn(&[u8]) -> Option<Station>,
        new_io: &dyn Fn() -> I,
        monitor: &mut Monitor,
    ) {
        match self.state {
            ChannelState::Disc => self.tick_disc(resolve, new_io, monitor),
            ChannelState::Setup => self.tick_setup(monitor),
            ChannelState::Conn => self.tick_conn(monitor),
        }

        if self.remote.is_none() {
            if let Some(mut io) = self.io.take() {
                io.close();
            }
            self.state = ChannelState::Disc;
        }
    }

    fn tick_disc(&mut self, resolve: &dyn Fn(&[u8]) -> Option<Station>, new_io: &dyn Fn() -> I, monitor: &mut Monitor) {
        let remote = match &self.remote {
            Some(r) => r.clone(),
            None => return,
        };

        let station = match resolve(&remote) {
            Some(s) => s,
            None => {
                self.queue.push_back(Event::link_status(
                    format!("LINK FAILURE with {}: Unknown station", display(&remote)).into_bytes(),
                ));
                self.remote = None;
                return;
            }
        };

        let mut io = new_io();
        monitor.log(Control::Sabm, &self.mycall, &remote, None, None, None);
        match io.connect(&station.host, station.port) {
            Ok(()) => {
                self.io = Some(io);
                monitor.log(Control::Ua, &remote, &self.mycall, None, None, None);
                self.queue
                    .push_back(Event::link_status(format!("CONNECTED to {} via Telnet", display(&remote)).into_bytes()));
                self.state = ChannelState::Conn;
            }
            Err(ConnectError::WouldBlock) => {
                self.io = Some(io);
                self.state = ChannelState::Setup;
            }
            Err(ConnectError::ResolutionFailed) => {
                self.queue.push_back(Event::link_status(
                    format!("LINK FAILURE with {}: domain resolution failed", display(&remote)).into_bytes(),
                ));
                self.remote = None;
            }
            Err(ConnectError::Other(e)) => {
                log::warn!("channel {}: connect to {} failed: {}", self.id, display(&remote), e);
                monitor.log(Control::Dm, &remote, &self.mycall, None, None, None);
                self.queue.push_back(Event::link_status(
                    format!("LINK FAILURE with {}", display(&remote)).into_bytes(),
                ));
                self.remote = None;
            }
        }
    }

    fn tick_setup(&mut self, monitor: &mut Monitor) {
        let remote = match &self.remote {
            Some(r) => r.clone(),
            None => return,
        };
        let io = match self.io.as_mut() {
            Some(io) => io,
            None => return,
        };

        match io.poll_connect() {
            Ok(()) => {
                monitor.log(Control::Ua, &remote, &self.mycall, None, None, None);
                self.queue
                    .push_back(Event::link_status(format!("CONNECTED to {} via Telnet", display(&remote)).into_bytes()));
                self.state = ChannelState::Conn;
            }
            // Still connecting: the source's ST_SETUP -> ST_SETUP transition
            // used equality instead of assignment; the spec treats this as
            // a latent bug and mandates assignment (a no-op here either way).
            Err(ConnectError::WouldBlock) => {
                self.state = ChannelState::Setup;
            }
            Err(ConnectError::Other(e)) => {
                self.fail_setup(&remote, e, monitor);
            }
            Err(ConnectError::ResolutionFailed) => {
                self.fail_setup(&remote, io::Error::other("resolution failed during setup"), monitor);
            }
        }
    }

    fn fail_setup(&mut self, remote: &[u8], e: io::Error, monitor: &mut Monitor) {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => {
                monitor.log(Control::Dm, remote, &self.mycall, None, None, None);
                self.queue
                    .push_back(Event::link_status(format!("BUSY fm {}", display(remote)).into_bytes()));
            }
            io::ErrorKind::TimedOut => {
                monitor.log(Control::Dm, &self.mycall, remote, None, None, None);
                self.queue
                    .push_back(Event::link_status(format!("LINK FAILURE with {}", display(remote)).into_bytes()));
            }
            _ => {
                log::warn!("channel {}: setup with {} failed: {}", self.id, display(remote), e);
                monitor.log(Control::Dm, remote, &self.mycall, None, None, None);
                self.queue
                    .push_back(Event::link_status(format!("LINK FAILURE with {}", display(remote)).into_bytes()));
            }
        }
        self.remote = None;
    }

    fn tick_conn(&mut self, monitor: &mut Monitor) {
        let remote = match &self.remote {
            Some(r) => r.clone(),
            None => return,
        };

        self.tick_conn_tx(&remote, monitor);
        if self.remote.is_some() {
            self.tick_conn_rx(&remote, monitor);
        }
    }

    fn tick_conn_tx(&mut self, remote: &[u8], monitor: &mut Monitor) {
        if self.tx_buffer.is_empty() {
            return;
        }
        let n_attempt = self.tx_buffer.len().min(MAX_PKTLEN);
        let io = match self.io.as_mut() {
            Some(io) => io,
            None => return,
        };

        match io.send(&self.tx_buffer[..n_attempt]) {
            Ok(0) => {}
            Ok(n) => {
                let sent = self.tx_buffer[..n].to_vec();
                self.tx_buffer.drain(..n);
                monitor.log(Control::I, &self.mycall, remote, Some(self.seq), Some(self.nxt), Some(&sent));
                monitor.log(Control::Rr, remote, &self.mycall, None, Some(self.nxt), None);
                self.seq = self.nxt;
                self.nxt = (self.seq + 1) % 8;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                monitor.log(Control::Dm, remote, &self.mycall, None, None, None);
                self.queue
                    .push_back(Event::link_status(format!("LINK RESET fm {}", display(remote)).into_bytes()));
                self.remote = None;
            }
            Err(e) => {
                log::warn!("channel {}: send to {} failed: {}", self.id, display(remote), e);
            }
        }
    }

    fn tick_conn_rx(&mut self, remote: &[u8], monitor: &mut Monitor) {
        if self.info_count() >= MAX_I_MSGS {
            return;
        }
        let io = match self.io.as_mut() {
            Some(io) => io,
            None => return,
        };

        let mut buf = [0u8; MAX_PKTLEN];
        match io.recv(&mut buf) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                monitor.log(Control::Dm, remote, &self.mycall, None, None, None);
                self.queue
                    .push_back(Event::link_status(format!("LINK RESET fm {}", display(remote)).into_bytes()));
                self.remote = None;
            }
            Err(e) => {
                log::warn!("channel {}: recv from {} failed: {}", self.id, display(remote), e);
            }
            Ok(0) => {
                monitor.log(Control::Disc, remote, &self.mycall, None, None, None);
                monitor.log(Control::Ua, &self.mycall, remote, None, None, None);
                self.queue
                    .push_back(Event::link_status(format!("DISCONNECTED fm {}", display(remote)).into_bytes()));
                self.remote = None;
            }
            Ok(n) => {
                let data = &buf[..n];
                if data[0] == 0xFF {
                    let reply = telnet_refuse(data);
                    if let Some(io) = self.io.as_mut() {
                        let _ = io.send(&reply);
                    }
                } else {
                    monitor.log(Control::I, remote, &self.mycall, Some(self.seq), Some(self.nxt), Some(data));
                    monitor.log(Control::Rr, &self.mycall, remote, None, Some(self.nxt), None);
                    self.seq = self.nxt;
                    self.nxt = (self.seq + 1) % 8;
                    self.queue.push_back(Event::info(data.to_vec()));
                }
            }
        }
    }
}

fn display(callsign: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(callsign)
}

/// Telnet option refusal (spec §4.3.1): unconditional byte substitution,
/// `WON'T(0xFC) -> DON'T(0xFE)` and `DO(0xFD) -> WON'T(0xFC)`. No state is
/// tracked across calls.
fn telnet_refuse(data: &[u8]) -> Vec<u8> {
    data.iter()
        .map(|&b| match b {
            0xFC => 0xFE,
            0xFD => 0xFC,
            other => other,
        })
        .collect()
}
