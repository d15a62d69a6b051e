//! Station Directory: resolves a callsign to a `(host, port)` pair,
//! loaded once from a whitespace-delimited text file with `#` comments
//! (spec §4.1).

use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// A resolved station endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub host: String,
    pub port: u16,
}

/// A stations file read into memory once at startup, so repeated
/// channel-worker lookups never re-open or re-scan the file.
///
/// `resolve` itself can never fail — a missing entry yields `None`
/// exactly as if the file were empty (spec §4.1: "never propagate to
/// the caller as failures"). The one place an I/O failure is
/// observable is `load`, whose caller logs it once at startup and
/// proceeds with an empty directory.
pub struct StationDirectory {
    entries: Vec<(String, Station)>,
}

impl StationDirectory {
    /// An empty directory in which every `resolve` call returns `None`,
    /// used when `load` fails so the engine can still start.
    pub fn empty() -> Self {
        StationDirectory { entries: Vec::new() }
    }

    /// Read and parse `path` in full. Each non-empty, non-`#` line is
    /// split on runs of whitespace into `ssid host port [ignored...]`;
    /// malformed lines are skipped individually with a `warn!` log
    /// naming the 1-based line number, not treated as fatal.
    ///
    /// Returns `Err` only if `path` itself cannot be opened; the caller
    /// decides how to report that (spec §4.1: "a warning to the logger
    /// collaborator").
    pub fn load(path: &Path) -> io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut entries = Vec::new();
        let reader = BufReader::new(file);

        for (lineno, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    log::warn!("stations file {:?}: I/O error at line {}: {}", path, lineno + 1, e);
                    continue;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match parse_line(trimmed) {
                Some((ssid, station)) => entries.push((ssid, station)),
                None => log::warn!("stations file {:?}: malformed line {}: {:?}", path, lineno + 1, trimmed),
            }
        }

        Ok(StationDirectory { entries })
    }

    /// Look up `query` (case-insensitive, surrounding whitespace
    /// trimmed) among the loaded entries.
    pub fn resolve(&self, query: &str) -> Option<Station> {
        let query = query.trim();
        self.entries
            .iter()
            .find(|(ssid, _)| ssid.eq_ignore_ascii_case(query))
            .map(|(_, station)| station.clone())
    }
}

fn parse_line(line: &str) -> Option<(String, Station)> {
    let mut fields = line.split_whitespace();
    let ssid = fields.next()?;
    let host = fields.next()?;
    let port: u16 = fields.next()?.parse().ok()?;
    Some((ssid.to_string(), Station { host: host.to_string(), port }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn resolves_exact_and_case_insensitive_match() {
        let f = write_temp("EA4BAO   bbs.example.org   6300\nW1AW  other.host  23\n");
        let dir = StationDirectory::load(f.path()).unwrap();
        assert_eq!(
            dir.resolve("ea4bao"),
            Some(Station {
                host: "bbs.example.org".into(),
                port: 6300
            })
        );
        assert_eq!(
            dir.resolve("  W1AW  "),
            Some(Station {
                host: "other.host".into(),
                port: 23
            })
        );
    }

    #[test]
    fn ignores_comments_blank_lines_and_trailing_fields() {
        let f = write_temp("# a comment\n\nEA4BAO host 1234 extra ignored fields\n");
        let dir = StationDirectory::load(f.path()).unwrap();
        assert_eq!(
            dir.resolve("EA4BAO"),
            Some(Station {
                host: "host".into(),
                port: 1234
            })
        );
    }

    #[test]
    fn unknown_callsign_yields_none() {
        let f = write_temp("EA4BAO host 1234\n");
        let dir = StationDirectory::load(f.path()).unwrap();
        assert_eq!(dir.resolve("NOCALL"), None);
    }

    #[test]
    fn unreadable_file_fails_load_and_empty_directory_resolves_nothing() {
        assert!(StationDirectory::load(Path::new("/nonexistent/path/stations.txt")).is_err());
        assert_eq!(StationDirectory::empty().resolve("NOCALL"), None);
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let f = write_temp("BADLINE\nEA4BAO host 1234\n");
        let dir = StationDirectory::load(f.path()).unwrap();
        assert_eq!(
            dir.resolve("EA4BAO"),
            Some(Station {
                host: "host".into(),
                port: 1234
            })
        );
    }

    #[test]
    fn load_once_then_resolve_many_times_without_reopening() {
        let f = write_temp("EA4BAO host 1234\n");
        let dir = StationDirectory::load(f.path()).unwrap();
        drop(f); // the backing file is gone; further resolves must still work
        assert_eq!(dir.resolve("EA4BAO").unwrap().port, 1234);
        assert_eq!(dir.resolve("EA4BAO").unwrap().port, 1234);
    }
}
