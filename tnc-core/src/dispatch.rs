//! Command Interpreter (spec §4.5): dispatches host-mode commands to the
//! appropriate channel or the monitor, and formats responses under the
//! correct [`OutputCondition`].
//!
//! Grounded in `original_source/TNC/tnc.py`'s `host_cmd()` dispatch table,
//! reshaped into the typed per-channel/monitor operations exposed by
//! [`crate::channel::Channel`] and [`crate::monitor::Monitor`].

use crate::channel::Channel;
use crate::codec::OutputCondition;
use crate::event::EventKind;
use crate::io::TcpIo;
use crate::monitor::Monitor;

/// One formatted host-mode response, ready for [`crate::codec::write_host_response`].
pub struct Response {
    pub channel: u8,
    pub cond: OutputCondition,
    pub message: Vec<u8>,
}

impl Response {
    fn new(channel: u8, cond: OutputCondition, message: impl Into<Vec<u8>>) -> Self {
        Response {
            channel,
            cond,
            message: message.into(),
        }
    }

    pub(crate) fn ok(channel: u8) -> Self {
        Self::new(channel, OutputCondition::Ok, Vec::new())
    }

    pub(crate) fn err_msg(channel: u8, message: impl Into<Vec<u8>>) -> Self {
        Self::new(channel, OutputCondition::ErrMsg, message)
    }

    fn ok_msg(channel: u8, message: impl Into<Vec<u8>>) -> Self {
        Self::new(channel, OutputCondition::OkMsg, message)
    }
}

/// Dispatch one data frame: forward `payload` to channel `ch`'s transmit
/// buffer. Channel-number validation has already happened in the caller
/// (spec §4.5: "If `ch > N`" applies uniformly to data and commands).
pub fn dispatch_data<I: TcpIo>(channel: &mut Channel<I>, payload: &[u8]) -> Response {
    channel.transmit(payload);
    Response::ok(channel.id())
}

/// Dispatch one host-mode command frame addressed at a connection
/// channel (channels 1..N; channel 0 commands go through
/// [`dispatch_monitor_command`]).
pub fn dispatch_channel_command<I: TcpIo>(channel: &mut Channel<I>, buffer: &[u8]) -> Response {
    let id = channel.id();
    if buffer.is_empty() {
        return Response::err_msg(id, "INVALID COMMAND: ");
    }
    let letter = buffer[0].to_ascii_uppercase();
    let arg = std::str::from_utf8(&buffer[1..]).unwrap_or("").trim();

    match letter {
        b'G' => dispatch_poll(channel, arg),
        b'C' => dispatch_connect_or_query(channel, arg),
        b'I' => dispatch_callsign(channel, arg),
        b'L' => Response::ok_msg(id, channel.link_status()),
        b'D' => {
            // Requires the shared monitor; handled by the caller via
            // `dispatch_disconnect` since `disconnect()` needs `&mut Monitor`.
            Response::ok(id)
        }
        b'U' | b'K' | b'Z' | b'H' => Response::ok(id),
        b'@' => dispatch_at(id, arg),
        other => Response::err_msg(id, format!("INVALID COMMAND: {}", other as char)),
    }
}

/// `D` needs both the channel and the shared monitor, unlike every other
/// channel command, so it is split out rather than threading `&mut
/// Monitor` through every branch of [`dispatch_channel_command`].
pub fn dispatch_disconnect<I: TcpIo>(channel: &mut Channel<I>, monitor: &mut Monitor) -> Response {
    channel.disconnect(monitor);
    Response::ok(channel.id())
}

fn dispatch_poll<I: TcpIo>(channel: &mut Channel<I>, arg: &str) -> Response {
    let filter = poll_filter(arg);
    match channel.poll(filter) {
        None => Response::ok(channel.id()),
        Some(event) => event_to_response(channel.id(), event.kind, event.payload),
    }
}

/// `"0"` → INFO only, `"1"` → STATUS only, empty → any kind.
fn poll_filter(arg: &str) -> Option<EventKind> {
    match arg {
        "0" => Some(EventKind::Info),
        "1" => Some(EventKind::LinkStatus),
        _ => None,
    }
}

fn event_to_response(channel: u8, kind: EventKind, payload: Vec<u8>) -> Response {
    let cond = match kind {
        EventKind::Info => OutputCondition::ConInfo,
        EventKind::LinkStatus => OutputCondition::Lnk,
        EventKind::MonHdr => OutputCondition::Mon,
        EventKind::MonHdrInfo => OutputCondition::MonHdr,
        EventKind::MonInfo => OutputCondition::MonInf,
    };
    Response::new(channel, cond, payload)
}

fn dispatch_connect_or_query<I: TcpIo>(channel: &mut Channel<I>, arg: &str) -> Response {
    let id = channel.id();
    if arg.is_empty() {
        match channel.remote_get() {
            None => Response::err_msg(id, "CHANNEL NOT CONNECTED"),
            Some(remote) => Response::ok_msg(id, remote),
        }
    } else {
        channel.connect(arg.as_bytes());
        Response::ok(id)
    }
}

fn dispatch_callsign<I: TcpIo>(channel: &mut Channel<I>, arg: &str) -> Response {
    let id = channel.id();
    if arg.is_empty() {
        Response::ok_msg(id, channel.callsign_get())
    } else {
        channel.callsign_set(arg.as_bytes());
        Response::ok(id)
    }
}

fn dispatch_at(channel: u8, arg: &str) -> Response {
    if arg.to_ascii_uppercase().starts_with('B') {
        Response::ok_msg(channel, "512")
    } else {
        Response::ok(channel)
    }
}

/// Dispatch a host-mode command addressed at channel 0 (the monitor).
///
/// Channel 0 answers the same generic `C`/`I`/`L` letters a connection
/// channel does, but against the monitor's own fields rather than a
/// socket: `C` gets/sets the CQ callsign, `I` the global callsign, and
/// `L` returns the monitor's status counts — `original_source/TNC/tnc.py`'s
/// `host_cmd` dispatches these through `self.channels[ch]` uniformly for
/// every channel including 0, so channel 0 must answer them too instead
/// of falling through to `INVALID COMMAND`. `M` (filter) has no
/// connection-channel analogue; `Y` (channel count) and `J` (mode
/// switch) are handled by the engine directly since they touch
/// engine-wide state.
pub fn dispatch_monitor_command(monitor: &mut Monitor, buffer: &[u8]) -> Response {
    if buffer.is_empty() {
        return Response::err_msg(0, "INVALID COMMAND: ");
    }
    let letter = buffer[0].to_ascii_uppercase();
    let arg = std::str::from_utf8(&buffer[1..]).unwrap_or("").trim();

    match letter {
        b'G' => {
            let filter = poll_filter(arg);
            match monitor.poll(filter) {
                None => Response::ok(0),
                Some(event) => event_to_response(0, event.kind, event.payload),
            }
        }
        b'C' => {
            if arg.is_empty() {
                Response::ok_msg(0, monitor.cq_callsign_get())
            } else {
                monitor.cq_callsign_set(arg.as_bytes());
                Response::ok(0)
            }
        }
        b'I' => {
            if arg.is_empty() {
                Response::ok_msg(0, monitor.global_callsign_get())
            } else {
                monitor.global_callsign_set(arg.as_bytes());
                Response::ok(0)
            }
        }
        b'L' => {
            let (status_count, info_count) = monitor.stats();
            Response::ok_msg(0, format!("{} {}", status_count, info_count))
        }
        b'M' => {
            if arg.is_empty() {
                Response::ok_msg(0, monitor.filter_get())
            } else {
                monitor.filter_set(arg.as_bytes());
                Response::ok(0)
            }
        }
        b'U' | b'K' | b'Z' | b'H' => Response::ok(0),
        b'@' => dispatch_at(0, arg),
        other => Response::err_msg(0, format!("INVALID COMMAND: {}", other as char)),
    }
}

/// `Y` validates/reports the configured channel count `n_channels`
/// (everything but a handful of plumbing details lives in the engine,
/// since it alone knows `n_channels`).
pub fn dispatch_channel_count(channel: u8, arg: &str, n_channels: u8) -> Response {
    if arg.is_empty() {
        return Response::ok_msg(channel, n_channels.to_string());
    }
    match arg.parse::<u32>() {
        Ok(n) if n <= n_channels as u32 => Response::ok(channel),
        _ => Response::err_msg(channel, "INVALID CHANNEL COUNT"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::fake::{FakeTcpIo, Script};

    fn fresh_channel(id: u8) -> Channel<FakeTcpIo> {
        Channel::new(id, b"N0CALL")
    }

    #[test]
    fn poll_idle_channel_returns_ok() {
        let mut ch = fresh_channel(1);
        let resp = dispatch_channel_command(&mut ch, b"G0");
        assert_eq!(resp.channel, 1);
        assert!(matches!(resp.cond, OutputCondition::Ok));
    }

    #[test]
    fn set_remote_then_get_status_matches_spec_scenario() {
        let mut ch = fresh_channel(1);
        let mut monitor = Monitor::new();
        let resp = dispatch_channel_command(&mut ch, b"C NOCALL");
        assert!(matches!(resp.cond, OutputCondition::Ok));

        ch.tick(&|_| None, &|| FakeTcpIo::new(Script::ConnectOk), &mut monitor);

        let resp = dispatch_channel_command(&mut ch, b"G1");
        assert!(matches!(resp.cond, OutputCondition::Lnk));
        assert_eq!(resp.message, b"LINK FAILURE with NOCALL: Unknown station");
    }

    #[test]
    fn link_status_sextet_on_fresh_channel() {
        let mut ch = fresh_channel(1);
        let resp = dispatch_channel_command(&mut ch, b"L");
        assert!(matches!(resp.cond, OutputCondition::OkMsg));
        assert_eq!(resp.message, b"0 0 0 0 0 0");
    }

    #[test]
    fn unknown_command_is_err_msg() {
        let mut ch = fresh_channel(1);
        let resp = dispatch_channel_command(&mut ch, b"X");
        assert!(matches!(resp.cond, OutputCondition::ErrMsg));
        assert_eq!(resp.message, b"INVALID COMMAND: X");
    }

    #[test]
    fn callsign_round_trips() {
        let mut ch = fresh_channel(1);
        dispatch_channel_command(&mut ch, b"Iea4bao");
        let resp = dispatch_channel_command(&mut ch, b"I");
        assert_eq!(resp.message, b"EA4BAO");
    }

    #[test]
    fn channel_count_validates_against_configured_n() {
        assert!(matches!(dispatch_channel_count(1, "4", 4).cond, OutputCondition::Ok));
        assert!(matches!(dispatch_channel_count(1, "5", 4).cond, OutputCondition::ErrMsg));
        let resp = dispatch_channel_count(1, "", 4);
        assert_eq!(resp.message, b"4");
    }

    #[test]
    fn monitor_filter_round_trips_upper_cased() {
        let mut monitor = Monitor::new();
        dispatch_monitor_command(&mut monitor, b"Miu");
        let resp = dispatch_monitor_command(&mut monitor, b"M");
        assert_eq!(resp.message, b"IU");
    }

    #[test]
    fn monitor_cq_callsign_defaults_and_round_trips() {
        let mut monitor = Monitor::new();
        let resp = dispatch_monitor_command(&mut monitor, b"C");
        assert!(matches!(resp.cond, OutputCondition::OkMsg));
        assert_eq!(resp.message, b"NOCALL");

        dispatch_monitor_command(&mut monitor, b"C GP160");
        let resp = dispatch_monitor_command(&mut monitor, b"C");
        assert_eq!(resp.message, b"GP160");
    }

    #[test]
    fn monitor_global_callsign_defaults_and_round_trips() {
        let mut monitor = Monitor::new();
        let resp = dispatch_monitor_command(&mut monitor, b"I");
        assert!(matches!(resp.cond, OutputCondition::OkMsg));
        assert_eq!(resp.message, b"NOCALL");

        dispatch_monitor_command(&mut monitor, b"Iea4bao");
        let resp = dispatch_monitor_command(&mut monitor, b"I");
        assert_eq!(resp.message, b"EA4BAO");
    }

    #[test]
    fn monitor_l_reports_stats_counts() {
        let mut monitor = Monitor::new();
        monitor.filter_set(b"U");
        monitor.log(crate::monitor::Control::Sabm, b"N0CALL", b"EA4BAO", None, None, None);
        let resp = dispatch_monitor_command(&mut monitor, b"L");
        assert!(matches!(resp.cond, OutputCondition::OkMsg));
        assert_eq!(resp.message, b"1 0");
    }
}
