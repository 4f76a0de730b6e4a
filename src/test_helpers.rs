use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::models::{Direction, Outcome, RecordDraft, RecordKind, Session, TradeRecord};

pub fn at(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts)
        .unwrap()
        .with_timezone(&Utc)
}

/// A record closed at 2024-01-15 10:00 UTC with the given P&L.
pub fn record(id: u64, instrument: &str, pnl: f64, outcome: Outcome) -> TradeRecord {
    let ts = at("2024-01-15T10:00:00Z");
    TradeRecord {
        id,
        kind: RecordKind::Trade,
        instrument: instrument.to_string(),
        direction: Direction::Buy,
        entry_price: None,
        exit_price: None,
        stop_loss: None,
        pnl,
        commission: 0.0,
        swap: 0.0,
        outcome,
        risk_reward: None,
        session: Session::London,
        model: None,
        timestamp: ts,
        tags: Vec::new(),
        notes: String::new(),
        images: Vec::new(),
        created_at: ts,
        updated_at: ts,
    }
}

pub fn record_at(id: u64, ts: &str, pnl: f64, outcome: Outcome) -> TradeRecord {
    let mut r = record(id, "EURUSD", pnl, outcome);
    r.timestamp = at(ts);
    r
}

/// A long EURUSD win that passes validation as-is.
pub fn complete_draft() -> RecordDraft {
    RecordDraft {
        kind: Some(RecordKind::Trade),
        instrument: Some(" eurusd ".to_string()),
        direction: Some(Direction::Buy),
        entry_price: Some(1.1000),
        exit_price: Some(1.1100),
        stop_loss: Some(1.0950),
        pnl: Some(100.0),
        commission: Some(-3.5),
        swap: None,
        outcome: Some(Outcome::Win),
        risk_reward: Some(2.0),
        session: Some(Session::NewYork),
        model: Some("Silver Bullet".to_string()),
        timestamp: Some(at("2024-01-15T13:30:00Z")),
        tags: vec!["fvg".to_string()],
        notes: Some("clean displacement".to_string()),
        images: Vec::new(),
    }
}

/// Fresh directory per test name and process.
pub fn temp_journal_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "trade_journal_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
