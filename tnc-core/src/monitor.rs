//! Monitor Channel (channel 0): synthesizes AX.25-style frame traces from
//! connection-channel activity for client-side debugging (spec §4.2).
//!
//! Grounded in `original_source/TNC/monitor.py`'s `Monitor.log()` text
//! formats, generalized to the typed [`Event`]/[`EventKind`] model shared
//! with [`crate::channel::Channel`].

use std::collections::VecDeque;

use crate::event::{poll_queue, Event, EventKind};

pub const MAX_MSGS: usize = 10;

/// AX.25 control codes the Monitor can synthesize a frame for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Sabm,
    Disc,
    Ua,
    Dm,
    Rr,
    I,
}

impl Control {
    /// The frame-class letter used for filter admission (`I`, `S`, `U`).
    fn class(self) -> u8 {
        match self {
            Control::Sabm | Control::Disc | Control::Ua | Control::Dm => b'U',
            Control::Rr => b'S',
            Control::I => b'I',
        }
    }
}

/// Channel 0: the monitor filter plus a bounded FIFO of synthesized frames.
pub struct Monitor {
    filter: Vec<u8>,
    queue: VecDeque<Event>,
    cq_callsign: Vec<u8>,
    global_callsign: Vec<u8>,
}

impl Default for Monitor {
    fn default() -> Self {
        Monitor {
            // Default "N" admits nothing; no real frame class is "N".
            filter: b"N".to_vec(),
            queue: VecDeque::new(),
            cq_callsign: b"NOCALL".to_vec(),
            global_callsign: b"NOCALL".to_vec(),
        }
    }
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_get(&self) -> Vec<u8> {
        self.filter.clone()
    }

    pub fn filter_set(&mut self, filter: &[u8]) {
        self.filter = filter.to_ascii_uppercase();
    }

    pub fn cq_callsign_get(&self) -> Vec<u8> {
        self.cq_callsign.clone()
    }

    pub fn cq_callsign_set(&mut self, callsign: &[u8]) {
        self.cq_callsign = callsign.to_ascii_uppercase();
    }

    pub fn global_callsign_get(&self) -> Vec<u8> {
        self.global_callsign.clone()
    }

    pub fn global_callsign_set(&mut self, callsign: &[u8]) {
        self.global_callsign = callsign.to_ascii_uppercase();
    }

    /// `(status_count, info_count)` backing channel 0's `L` command —
    /// counted directly from the queue, not tracked separately, so they
    /// can never drift from reality.
    pub fn stats(&self) -> (usize, usize) {
        let status_count = self
            .queue
            .iter()
            .filter(|e| matches!(e.kind, EventKind::MonHdr | EventKind::MonHdrInfo))
            .count();
        let info_count = self.queue.iter().filter(|e| e.kind == EventKind::MonInfo).count();
        (status_count, info_count)
    }

    pub fn poll(&mut self, kind: Option<EventKind>) -> Option<Event> {
        poll_queue(&mut self.queue, kind)
    }

    fn admit(&self, class: u8) -> bool {
        self.filter.contains(&class)
    }

    fn push_control(&mut self, header: Vec<u8>) {
        self.queue.push_back(Event::mon_hdr(header));
    }

    fn push_control_with_info(&mut self, header: Vec<u8>, info: Vec<u8>) {
        // MAX_MSGS bounds only I-class admission (spec §4.2); control
        // frames are always admitted once they pass the filter.
        self.queue.push_back(Event::mon_hdr_info(header));
        self.queue.push_back(Event::mon_info(info));
    }

    /// Synthesize one or two monitor Events from `ctl`. Unknown control
    /// codes never arise here since `ctl` is statically typed; callers
    /// map their own command space onto [`Control`] before calling.
    #[allow(clippy::too_many_arguments)]
    pub fn log(&mut self, ctl: Control, src: &[u8], dst: &[u8], seq: Option<u8>, nxt: Option<u8>, info: Option<&[u8]>) {
        let class = ctl.class();
        if !self.admit(class) {
            return;
        }

        match ctl {
            Control::Sabm => self.push_control(format_hdr(src, dst, b"SABM+")),
            Control::Disc => self.push_control(format_hdr(src, dst, b"DISC+")),
            Control::Ua => self.push_control(format_hdr(src, dst, b"UA-")),
            Control::Dm => self.push_control(format_hdr(src, dst, b"DM-")),
            Control::Rr => {
                let nxt = nxt.unwrap_or(0);
                let mut tail = format!("RR{}-", nxt).into_bytes();
                let mut header = format_hdr_prefix(src, dst);
                header.append(&mut tail);
                self.push_control(header);
            }
            Control::I => {
                if self.queue.len() >= MAX_MSGS {
                    // I-class dropped once the bound is reached; control
                    // classes above are exempt.
                    return;
                }
                let nxt = nxt.unwrap_or(0);
                let seq = seq.unwrap_or(0);
                let mut tail = format!("I{}{} pid F0+", nxt, seq).into_bytes();
                let mut header = format_hdr_prefix(src, dst);
                header.append(&mut tail);
                let payload = collapse_crlf(info.unwrap_or(&[]));
                self.push_control_with_info(header, payload);
            }
        }
    }
}

fn format_hdr_prefix(src: &[u8], dst: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() + dst.len() + 16);
    out.extend_from_slice(b"fm ");
    out.extend_from_slice(src);
    out.extend_from_slice(b" to ");
    out.extend_from_slice(dst);
    out.extend_from_slice(b" ctl ");
    out
}

fn format_hdr(src: &[u8], dst: &[u8], tail: &[u8]) -> Vec<u8> {
    let mut out = format_hdr_prefix(src, dst);
    out.extend_from_slice(tail);
    out
}

/// Collapse every `CRLF` in `data` down to a bare `CR` (spec §4.2's `I`
/// monitor payload rule).
fn collapse_crlf(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'\r' && i + 1 < data.len() && data[i + 1] == b'\n' {
            out.push(b'\r');
            i += 2;
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sabm_frame_text_and_class() {
        let mut m = Monitor::new();
        m.filter_set(b"u");
        m.log(Control::Sabm, b"N0CALL", b"EA4BAO", None, None, None);
        let e = m.poll(None).unwrap();
        assert_eq!(e.kind, EventKind::MonHdr);
        assert_eq!(e.payload, b"fm N0CALL to EA4BAO ctl SABM+");
    }

    #[test]
    fn rr_uses_nxt_and_class_s() {
        let mut m = Monitor::new();
        m.filter_set(b"S");
        m.log(Control::Rr, b"EA4BAO", b"N0CALL", None, Some(3), None);
        let e = m.poll(None).unwrap();
        assert_eq!(e.payload, b"fm EA4BAO to N0CALL ctl RR3-");
    }

    #[test]
    fn i_frame_emits_header_then_info_with_crlf_collapsed() {
        let mut m = Monitor::new();
        m.filter_set(b"I");
        m.log(Control::I, b"N0CALL", b"EA4BAO", Some(1), Some(2), Some(b"hello\r\nworld"));
        let hdr = m.poll(None).unwrap();
        assert_eq!(hdr.kind, EventKind::MonHdrInfo);
        assert_eq!(hdr.payload, b"fm N0CALL to EA4BAO ctl I21 pid F0+");
        let info = m.poll(None).unwrap();
        assert_eq!(info.kind, EventKind::MonInfo);
        assert_eq!(info.payload, b"hello\rworld");
    }

    #[test]
    fn filter_drops_unadmitted_class() {
        let mut m = Monitor::new();
        m.filter_set(b"U");
        m.log(Control::Rr, b"a", b"b", None, Some(0), None);
        assert!(m.poll(None).is_none());
    }

    #[test]
    fn default_filter_admits_nothing() {
        let mut m = Monitor::new();
        m.log(Control::Sabm, b"a", b"b", None, None, None);
        assert!(m.poll(None).is_none());
    }

    #[test]
    fn i_class_dropped_once_full_but_control_class_still_admitted() {
        let mut m = Monitor::new();
        m.filter_set(b"IU");
        for _ in 0..MAX_MSGS {
            m.log(Control::I, b"a", b"b", Some(0), Some(0), Some(b"x"));
        }
        // Each I log pushes 2 events (hdr+info); queue is already >= MAX_MSGS
        // after the 5th, so later ones are dropped.
        let (status, info) = m.stats();
        assert!(status + info <= MAX_MSGS + 1);

        m.log(Control::Sabm, b"a", b"b", None, None, None);
        // Control-class SABM must still be admitted even though the queue
        // is at/over the I-only bound.
        let mut saw_sabm = false;
        while let Some(e) = m.poll(None) {
            if e.payload.ends_with(b"SABM+") {
                saw_sabm = true;
            }
        }
        assert!(saw_sabm);
    }

    #[test]
    fn filter_round_trips_upper_cased() {
        let mut m = Monitor::new();
        m.filter_set(b"iu");
        assert_eq!(m.filter_get(), b"IU");
    }

    #[test]
    fn cq_and_global_callsign_default_to_nocall_and_round_trip() {
        let mut m = Monitor::new();
        assert_eq!(m.cq_callsign_get(), b"NOCALL");
        assert_eq!(m.global_callsign_get(), b"NOCALL");

        m.cq_callsign_set(b"gp160");
        assert_eq!(m.cq_callsign_get(), b"GP160");
        m.global_callsign_set(b"ea4bao");
        assert_eq!(m.global_callsign_get(), b"EA4BAO");
    }
}
