//! Engine (spec §4.6): owns the monitor and connection channels, starts
//! worker threads, and runs the single host-link read loop.
//!
//! Grounded in `mayara-core/src/engine/mod.rs`'s `RadarController`
//! dispatch-by-slot pattern, reworked from "one controller per detected
//! radar" into "one connection channel per configured slot plus channel
//! 0's monitor".

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::channel::Channel;
use crate::codec::{read_host_request, write_host_response, write_terminal_response, TerminalReader};
use crate::dispatch::{dispatch_channel_command, dispatch_channel_count, dispatch_data, dispatch_disconnect, dispatch_monitor_command, Response};
use crate::error::TncError;
use crate::io::TcpIo;
use crate::monitor::Monitor;
use crate::stations::Station;

/// Worker tick interval (spec §5: "ticks roughly every 10 ms").
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Terminal,
    Host,
}

/// What the host-link loop must do after writing a dispatched response.
enum PostAction {
    None,
    SwitchToTerminalWithOk,
}

/// Owns `channels[0..N]` (monitor at slot 0, connection channels 1..N)
/// and the current host-link mode. Does not own the host stream itself —
/// [`Engine::run`] borrows it for the duration of the read loop, matching
/// spec §4.6 ("runs the host-link read loop in the calling thread").
pub struct Engine<I: TcpIo> {
    mode: Mode,
    n_channels: u8,
    monitor: Arc<Mutex<Monitor>>,
    channels: Vec<Arc<Mutex<Channel<I>>>>,
}

impl<I: TcpIo + Send + 'static> Engine<I> {
    pub fn new(mode: Mode, mycall: &[u8], n_channels: u8) -> Self {
        let channels = (1..=n_channels)
            .map(|id| Arc::new(Mutex::new(Channel::new(id, mycall))))
            .collect();
        Engine {
            mode,
            n_channels,
            monitor: Arc::new(Mutex::new(Monitor::new())),
            channels,
        }
    }

    /// Launch one worker thread per connection channel. Workers tick
    /// every [`TICK_INTERVAL`] for the lifetime of the process; the
    /// engine has no cooperative cancellation (spec §5).
    pub fn start_workers(
        &self,
        resolve: Arc<dyn Fn(&[u8]) -> Option<Station> + Send + Sync>,
        new_io: Arc<dyn Fn() -> I + Send + Sync>,
    ) {
        for channel in &self.channels {
            let channel = Arc::clone(channel);
            let monitor = Arc::clone(&self.monitor);
            let resolve = Arc::clone(&resolve);
            let new_io = Arc::clone(&new_io);
            thread::spawn(move || loop {
                {
                    let mut channel = channel.lock().unwrap();
                    let mut monitor = monitor.lock().unwrap();
                    channel.tick(resolve.as_ref(), new_io.as_ref(), &mut monitor);
                }
                thread::sleep(TICK_INTERVAL);
            });
        }
    }

    /// Run the host-link read loop until the host stream closes.
    /// Terminates cleanly (logs at CRITICAL, returns) on
    /// [`TncError::ClosedStream`]; every other channel/command fault is
    /// absorbed into a queued event or a `COND_ERRMSG` response and never
    /// reaches this loop.
    pub fn run<S: Read + Write>(&mut self, stream: &mut S) {
        if let Err(e) = self.run_host_link(stream) {
            log::error!("host stream closed, shutting down: {}", e);
        }
    }

    fn run_host_link<S: Read + Write>(&mut self, stream: &mut S) -> Result<(), TncError> {
        let mut term_reader = TerminalReader::new();
        loop {
            match self.mode {
                Mode::Terminal => {
                    let frame = term_reader.read_frame(stream)?;
                    if frame.is_command {
                        // Command letters are upper-cased before dispatch
                        // (spec §4.6); data buffers pass through untouched
                        // and are discarded (spec §9 Open Question).
                        let cmd = frame.buffer.to_ascii_uppercase();
                        if cmd == b"JHOST1" {
                            self.mode = Mode::Host;
                        } else {
                            let msg = format!("INVALID COMMAND: {}", String::from_utf8_lossy(&cmd));
                            write_terminal_response(stream, msg.as_bytes())?;
                        }
                    }
                }
                Mode::Host => {
                    let req = read_host_request(stream)?;
                    let (resp, action) = self.dispatch_host_request(req.channel, req.is_command, req.payload);
                    write_host_response(stream, resp.channel, resp.cond, &resp.message)?;
                    if let PostAction::SwitchToTerminalWithOk = action {
                        self.mode = Mode::Terminal;
                        write_terminal_response(stream, b"ok")?;
                    }
                }
            }
        }
    }

    fn dispatch_host_request(&mut self, channel: u8, is_command: bool, payload: Vec<u8>) -> (Response, PostAction) {
        if channel > self.n_channels {
            return (Response::err_msg(channel, "INVALID CHANNEL NUMBER"), PostAction::None);
        }

        if !is_command {
            if channel == 0 {
                return (Response::ok(0), PostAction::None);
            }
            let mut ch = self.channels[(channel - 1) as usize].lock().unwrap();
            return (dispatch_data(&mut ch, &payload), PostAction::None);
        }

        if payload.is_empty() {
            return (Response::err_msg(channel, "INVALID COMMAND: "), PostAction::None);
        }
        let letter = payload[0].to_ascii_uppercase();
        let arg = std::str::from_utf8(&payload[1..]).unwrap_or("").trim().to_string();

        match letter {
            b'Y' => (dispatch_channel_count(channel, &arg, self.n_channels), PostAction::None),
            b'J' => {
                if arg.eq_ignore_ascii_case("HOST0") {
                    (Response::ok(channel), PostAction::SwitchToTerminalWithOk)
                } else {
                    (Response::ok(channel), PostAction::None)
                }
            }
            b'D' if channel != 0 => {
                let mut ch = self.channels[(channel - 1) as usize].lock().unwrap();
                let mut monitor = self.monitor.lock().unwrap();
                (dispatch_disconnect(&mut ch, &mut monitor), PostAction::None)
            }
            _ if channel == 0 => {
                let mut monitor = self.monitor.lock().unwrap();
                (dispatch_monitor_command(&mut monitor, &payload), PostAction::None)
            }
            _ => {
                let mut ch = self.channels[(channel - 1) as usize].lock().unwrap();
                (dispatch_channel_command(&mut ch, &payload), PostAction::None)
            }
        }
    }
}
