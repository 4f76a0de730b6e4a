use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use trade_journal::config::default_sessions;
use trade_journal::core::sessions::SessionClassifier;
use trade_journal::journal::FileJournal;
use trade_journal::models::{Direction, RecordDraft, RecordKind};

pub fn at(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts)
        .unwrap()
        .with_timezone(&Utc)
}

/// Minimal valid draft: outcome and session are left for validation to derive.
pub fn draft(instrument: &str, pnl: f64, ts: &str) -> RecordDraft {
    RecordDraft {
        kind: Some(RecordKind::Trade),
        instrument: Some(instrument.to_string()),
        direction: Some(Direction::Buy),
        pnl: Some(pnl),
        timestamp: Some(at(ts)),
        ..RecordDraft::default()
    }
}

pub fn with_model(mut d: RecordDraft, model: &str) -> RecordDraft {
    d.model = Some(model.to_string());
    d
}

pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "trade_journal_integ_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

pub fn reopen(dir: &Path) -> FileJournal {
    FileJournal::open_dir(dir, SessionClassifier::new(&default_sessions())).unwrap()
}

pub fn open_journal(name: &str) -> (FileJournal, PathBuf) {
    let dir = temp_dir(name);
    (reopen(&dir), dir)
}
