//! # tnc-telnet
//!
//! WA8DED-style AX.25 TNC emulator: carries each logical connection over
//! TCP/Telnet instead of a radio modem, so legacy packet-radio software
//! (BBS clients, cluster clients) can talk to modern IP endpoints
//! unmodified.
//!
//! This crate supplies the native collaborators [`tnc_core::engine::Engine`]
//! expects but does not implement itself: argument parsing, logging
//! setup, the host-link byte stream, and the Station Directory file.
//! The protocol engine itself lives in [`tnc_core`].

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use miette::{IntoDiagnostic, Result};
use tnc_core::engine::{Engine, Mode};

pub mod native_io;

use native_io::NativeTcpIo;

/// Command-line surface (spec §6 "CLI surface").
#[derive(Parser, Debug)]
#[command(name = "tnc-telnet", version, about = "WA8DED TNC emulator over TCP/Telnet")]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Host stream path (named pipe or regular file the legacy client attaches to).
    #[arg(long, default_value = r"\\.\PIPE\tnc")]
    pub file: PathBuf,

    /// Station directory file.
    #[arg(long, default_value = "stations.txt")]
    pub stations: PathBuf,

    /// Default callsign assigned to every channel at startup.
    #[arg(long, default_value = "NOCALL")]
    pub mycall: String,

    /// Start already in host mode instead of terminal mode.
    #[arg(long)]
    pub jhost1: bool,

    /// Number of connection channels (1..N; channel 0 is always the monitor).
    #[arg(long, default_value_t = 4)]
    pub ch: u8,
}

/// Build the engine and run its host-link loop against `cli.file` until
/// the host stream closes.
pub fn run(cli: Cli) -> Result<()> {
    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let mode = if cli.jhost1 { Mode::Host } else { Mode::Terminal };
    let mut engine: Engine<NativeTcpIo> = Engine::new(mode, cli.mycall.as_bytes(), cli.ch);

    // A stations file that can't be read is a startup-time warning, not a
    // fatal error (spec §4.1): the engine still starts, every resolve
    // from here on just returns NOT_FOUND.
    let directory = tnc_core::stations::StationDirectory::load(&cli.stations).unwrap_or_else(|e| {
        log::warn!("stations file {:?} unreadable: {}", cli.stations, e);
        tnc_core::stations::StationDirectory::empty()
    });
    let resolve = Arc::new(move |callsign: &[u8]| -> Option<tnc_core::Station> {
        let query = String::from_utf8_lossy(callsign);
        directory.resolve(&query)
    });
    let new_io: Arc<dyn Fn() -> NativeTcpIo + Send + Sync> = Arc::new(NativeTcpIo::new);

    engine.start_workers(resolve, new_io);

    let mut stream = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&cli.file)
        .into_diagnostic()?;

    engine.run(&mut stream);
    Ok(())
}
