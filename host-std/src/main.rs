//! Sorter Scanner — terminal station.
//!
//! Thread-based: the intake session runs on its own thread, a reader
//! thread turns stdin lines into session events, and the main thread
//! prints notices as NDJSON and writes label/report artifacts.
//!
//! Input lines:
//! - `{"cmd":"..."}`: a display-layer command
//! - `cam <code>`: a camera decode (subject to the cooldown)
//! - anything else: a typed code
//!
//! Usage: `sorter-scanner [DATA_DIR]`. The data directory defaults to
//! `$SORTER_SCANNER_DATA` or `./sorter-data`; artifacts go to its `out/`
//! subdirectory. Log level follows `RUST_LOG` (default `info`, on stderr).

mod artifacts;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::SyncSender;
use std::thread;

use anyhow::Context;
use sorter_scanner::protocol::parse_command;
use sorter_scanner::store::FileStore;
use sorter_scanner::{
    cooldown::SystemClock, Collaborators, IntakeConfig, IntakeController, Output, Session,
    SessionEvent,
};

use artifacts::{artifact_path, write_artifact, JsonLabels, JsonReports};

const DATA_DIR_ENV: &str = "SORTER_SCANNER_DATA";
const DEFAULT_DATA_DIR: &str = "sorter-data";
const CAMERA_PREFIX: &str = "cam ";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(DATA_DIR_ENV).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let out_dir = data_dir.join("out");
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let store = FileStore::open(&data_dir)?;
    log::info!(
        "Sorter Scanner v{} starting, data in {}",
        env!("CARGO_PKG_VERSION"),
        store.dir().display()
    );

    let controller = IntakeController::new(
        Box::new(store),
        Box::new(SystemClock),
        IntakeConfig::new(),
    );
    let session = Session::spawn(
        controller,
        Collaborators {
            labels: Box::new(JsonLabels),
            reports: Box::new(JsonReports),
        },
    )?;

    // ── Reader thread ────────────────────────────────────────────────

    let events = session.events();
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || reader_thread(events))?;

    // ── Output loop ──────────────────────────────────────────────────

    let stdout = io::stdout();
    while let Ok(output) = session.outputs().recv() {
        let mut out = stdout.lock();
        match output {
            Output::Notice(notice) => {
                log::debug!("{}", notice);
                out.write_all(notice.to_ndjson()?.as_bytes())?;
                out.flush()?;
            }
            Output::Label { file_name, image } => {
                let path = artifact_path(&out_dir, &file_name, &image.mime_type);
                save(&path, &image.bytes);
            }
            Output::Report(document) => {
                save(&out_dir.join(&document.file_name), &document.bytes);
            }
        }
    }

    let history = session.shutdown()?;
    match history.get(0) {
        Some(newest) => log::info!(
            "Stopped with {} records in history, newest {} at {}",
            history.len(),
            newest.code(),
            newest.formatted_timestamp()
        ),
        None => log::info!("Stopped with an empty history"),
    }
    Ok(())
}

fn save(path: &Path, bytes: &[u8]) {
    match write_artifact(path, bytes) {
        Ok(()) => log::info!("Wrote {}", path.display()),
        Err(e) => log::error!("{}", e),
    }
}

// ── Input ────────────────────────────────────────────────────────────

fn reader_thread(events: SyncSender<SessionEvent>) {
    log::info!("Reading codes from stdin");

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("stdin read failed: {}", e);
                break;
            }
        };
        let Some(event) = parse_line(&line) else {
            continue;
        };
        if events.send(event).is_err() {
            return;
        }
    }

    log::info!("stdin closed, shutting down");
    let _ = events.send(SessionEvent::Shutdown);
}

/// One stdin line to an event. Unparseable command lines are logged and
/// skipped.
fn parse_line(line: &str) -> Option<SessionEvent> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('{') {
        let cmd = parse_command(trimmed);
        if cmd.is_none() {
            log::warn!("Unknown command: {}", trimmed.trim_end());
        }
        return cmd.map(SessionEvent::Command);
    }
    if let Some(code) = trimmed.strip_prefix(CAMERA_PREFIX) {
        return Some(SessionEvent::Decoded(vec![Some(code.to_string())]));
    }
    Some(SessionEvent::Manual(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorter_scanner::Command;

    #[test]
    fn json_line_is_command() {
        assert_eq!(
            parse_line(r#"{"cmd":"delete","position":2}"#),
            Some(SessionEvent::Command(Command::Delete { position: 2 }))
        );
    }

    #[test]
    fn bad_json_line_is_skipped() {
        assert_eq!(parse_line(r#"{"cmd":"explode"}"#), None);
    }

    #[test]
    fn cam_prefix_is_decode() {
        assert_eq!(
            parse_line("cam WAW-1"),
            Some(SessionEvent::Decoded(vec![Some("WAW-1".into())]))
        );
    }

    #[test]
    fn other_lines_are_typed_codes() {
        assert_eq!(
            parse_line(" AB12 "),
            Some(SessionEvent::Manual(" AB12 ".into()))
        );
        assert_eq!(parse_line(""), Some(SessionEvent::Manual(String::new())));
    }
}
