//! Host-Link Codec: the two wire framings carried on the host byte
//! stream, keyed by [`crate::engine::Mode`] (spec §4.4).
//!
//! Grounded in `original_source/TNC/tnc.py`'s `term_read`/`host_read`/
//! `host_response`, reshaped into a `Read`-generic reader/writer pair in
//! the teacher's style of small, independently testable codec units.

use std::io::{self, Read, Write};

use crate::error::TncError;

/// One frame read off the host stream in terminal mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalFrame {
    pub is_command: bool,
    pub buffer: Vec<u8>,
}

/// Byte-at-a-time terminal-mode line reader (spec §4.4 "Terminal framing").
///
/// `0x1B` (ESC) discards the buffer and marks the next emitted line as a
/// command; `0x18` (CAN) discards the buffer outright; `0x0D` (CR) emits
/// the accumulated line and resets.
pub struct TerminalReader {
    buffer: Vec<u8>,
    pending_command: bool,
}

impl Default for TerminalReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReader {
    pub fn new() -> Self {
        TerminalReader {
            buffer: Vec::new(),
            pending_command: false,
        }
    }

    /// Read and assemble exactly one [`TerminalFrame`] from `stream`.
    pub fn read_frame<R: Read>(&mut self, stream: &mut R) -> Result<TerminalFrame, TncError> {
        loop {
            let mut byte = [0u8; 1];
            let n = stream.read(&mut byte)?;
            if n == 0 {
                return Err(TncError::ClosedStream);
            }
            match byte[0] {
                0x1B => {
                    self.buffer.clear();
                    self.pending_command = true;
                }
                0x18 => {
                    self.buffer.clear();
                }
                0x0D => {
                    let is_command = self.pending_command;
                    self.pending_command = false;
                    let buffer = std::mem::take(&mut self.buffer);
                    return Ok(TerminalFrame { is_command, buffer });
                }
                b => self.buffer.push(b),
            }
        }
    }
}

/// One request read off the host stream in host mode (spec §4.4 "Host
/// framing (request)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    pub channel: u8,
    pub is_command: bool,
    pub payload: Vec<u8>,
}

/// Read exactly one [`HostRequest`]: header bytes `CH`, `IC`, `L`, then
/// exactly `L+1` payload bytes. Any EOF raises [`TncError::ClosedStream`].
pub fn read_host_request<R: Read>(stream: &mut R) -> Result<HostRequest, TncError> {
    let mut header = [0u8; 3];
    read_exact_or_closed(stream, &mut header)?;
    let channel = header[0];
    let is_command = header[1] != 0;
    let len = header[2] as usize + 1;

    let mut payload = vec![0u8; len];
    read_exact_or_closed(stream, &mut payload)?;

    Ok(HostRequest {
        channel,
        is_command,
        payload,
    })
}

fn read_exact_or_closed<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<(), TncError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..])?;
        if n == 0 {
            return Err(TncError::ClosedStream);
        }
        filled += n;
    }
    Ok(())
}

/// Output-condition codes for host-mode responses (spec §4.4 "Host
/// framing (response)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCondition {
    Ok = 0,
    OkMsg = 1,
    ErrMsg = 2,
    Lnk = 3,
    Mon = 4,
    MonHdr = 5,
    MonInf = 6,
    ConInfo = 7,
}

/// Write one host-mode response frame for `channel` with condition
/// `cond` and `message` to `stream`.
///
/// `COND_LNK` messages get the `"(<ch>) "` prefix observed in the
/// source (spec §9 Open Question: preserved as client-depended-upon
/// behavior). `COND_MONINF`/`COND_CONINFO` encode the message length
/// minus one as a single byte with no terminator; every other code
/// null-terminates.
pub fn write_host_response<W: Write>(
    stream: &mut W,
    channel: u8,
    cond: OutputCondition,
    message: &[u8],
) -> io::Result<()> {
    match cond {
        OutputCondition::Ok => {
            stream.write_all(&[channel, OutputCondition::Ok as u8])?;
        }
        OutputCondition::OkMsg | OutputCondition::ErrMsg => {
            stream.write_all(&[channel, cond as u8])?;
            stream.write_all(message)?;
            stream.write_all(&[0])?;
        }
        OutputCondition::Lnk => {
            stream.write_all(&[channel, OutputCondition::Lnk as u8])?;
            stream.write_all(format!("({}) ", channel).as_bytes())?;
            stream.write_all(message)?;
            stream.write_all(&[0])?;
        }
        OutputCondition::Mon | OutputCondition::MonHdr => {
            stream.write_all(&[channel, cond as u8])?;
            stream.write_all(message)?;
            stream.write_all(&[0])?;
        }
        OutputCondition::MonInf | OutputCondition::ConInfo => {
            let len_byte = message.len().saturating_sub(1) as u8;
            stream.write_all(&[channel, cond as u8, len_byte])?;
            stream.write_all(message)?;
        }
    }
    Ok(())
}

/// Write one terminal-mode response line (`term_response` in the
/// original): a CRLF-terminated banner, preceded by a CRLF so it starts
/// on its own line regardless of what the legacy client last echoed.
/// Used for the `JHOST0` "ok" banner and for unrecognized terminal
/// commands (spec §4.5 "In terminal mode the only recognized command is
/// ... `JHOST1`"; everything else gets `INVALID COMMAND: <cmd>`).
pub fn write_terminal_response<W: Write>(stream: &mut W, message: &[u8]) -> io::Result<()> {
    stream.write_all(b"\r\n")?;
    stream.write_all(message)?;
    stream.write_all(b"\r\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn terminal_reader_emits_plain_line() {
        let mut r = TerminalReader::new();
        let mut stream = Cursor::new(b"hello\r".to_vec());
        let frame = r.read_frame(&mut stream).unwrap();
        assert_eq!(frame, TerminalFrame { is_command: false, buffer: b"hello".to_vec() });
    }

    #[test]
    fn terminal_reader_esc_marks_command_and_discards_buffer() {
        let mut r = TerminalReader::new();
        let mut stream = Cursor::new(b"junk\x1bJHOST1\r".to_vec());
        let frame = r.read_frame(&mut stream).unwrap();
        assert_eq!(frame, TerminalFrame { is_command: true, buffer: b"JHOST1".to_vec() });
    }

    #[test]
    fn terminal_reader_can_discards_buffer_without_command_flag() {
        let mut r = TerminalReader::new();
        let mut stream = Cursor::new(b"abc\x18def\r".to_vec());
        let frame = r.read_frame(&mut stream).unwrap();
        assert_eq!(frame, TerminalFrame { is_command: false, buffer: b"def".to_vec() });
    }

    #[test]
    fn terminal_reader_eof_raises_closed_stream() {
        let mut r = TerminalReader::new();
        let mut stream = Cursor::new(Vec::new());
        assert!(matches!(r.read_frame(&mut stream), Err(TncError::ClosedStream)));
    }

    #[test]
    fn host_request_reads_header_and_len_plus_one_payload() {
        let mut stream = Cursor::new(vec![0x01, 0x01, 0x01, b'G', b'0']);
        let req = read_host_request(&mut stream).unwrap();
        assert_eq!(
            req,
            HostRequest {
                channel: 1,
                is_command: true,
                payload: b"G0".to_vec()
            }
        );
    }

    #[test]
    fn host_request_eof_mid_payload_raises_closed_stream() {
        let mut stream = Cursor::new(vec![0x01, 0x01, 0x05, b'G']);
        assert!(matches!(read_host_request(&mut stream), Err(TncError::ClosedStream)));
    }

    #[test]
    fn cond_ok_is_two_bytes() {
        let mut out = Vec::new();
        write_host_response(&mut out, 1, OutputCondition::Ok, b"").unwrap();
        assert_eq!(out, vec![1, 0]);
    }

    #[test]
    fn cond_lnk_has_channel_prefix_and_terminator() {
        let mut out = Vec::new();
        write_host_response(&mut out, 1, OutputCondition::Lnk, b"CONNECTED to X").unwrap();
        let mut expected = vec![1, 3];
        expected.extend_from_slice(b"(1) CONNECTED to X");
        expected.push(0);
        assert_eq!(out, expected);
    }

    #[test]
    fn cond_coninfo_has_length_minus_one_byte_and_no_terminator() {
        let mut out = Vec::new();
        write_host_response(&mut out, 2, OutputCondition::ConInfo, b"hi").unwrap();
        assert_eq!(out, vec![2, 7, 1, b'h', b'i']);
    }

    #[test]
    fn link_status_sextet_matches_spec_example() {
        let mut out = Vec::new();
        write_host_response(&mut out, 1, OutputCondition::OkMsg, b"0 0 0 0 0 0").unwrap();
        let expected: Vec<u8> = vec![
            0x01, 0x01, 0x30, 0x20, 0x30, 0x20, 0x30, 0x20, 0x30, 0x20, 0x30, 0x20, 0x30, 0x00,
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn terminal_response_is_crlf_wrapped() {
        let mut out = Vec::new();
        write_terminal_response(&mut out, b"INVALID COMMAND: FOO").unwrap();
        assert_eq!(out, b"\r\nINVALID COMMAND: FOO\r\n");
    }
}
