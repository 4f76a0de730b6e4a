use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Direction, DisplayMode, Outcome, RecordKind, Session};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: u64,
    pub kind: RecordKind,
    pub instrument: String,
    pub direction: Direction,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    pub pnl: f64,
    #[serde(default)]
    pub commission: f64,
    #[serde(default)]
    pub swap: f64,
    pub outcome: Outcome,
    #[serde(default)]
    pub risk_reward: Option<f64>,
    pub session: Session,
    #[serde(default)]
    pub model: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TradeRecord {
    pub fn from_valid(id: u64, valid: ValidRecord, now: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: valid.kind,
            instrument: valid.instrument,
            direction: valid.direction,
            entry_price: valid.entry_price,
            exit_price: valid.exit_price,
            stop_loss: valid.stop_loss,
            pnl: valid.pnl,
            commission: valid.commission,
            swap: valid.swap,
            outcome: valid.outcome,
            risk_reward: valid.risk_reward,
            session: valid.session,
            model: valid.model,
            timestamp: valid.timestamp,
            tags: valid.tags,
            notes: valid.notes,
            images: valid.images,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every user-editable field, keeping identity and creation time.
    pub fn apply(&mut self, valid: ValidRecord, now: DateTime<Utc>) {
        let id = self.id;
        let created_at = self.created_at;
        *self = Self::from_valid(id, valid, now);
        self.created_at = created_at;
    }

    /// P&L after commission and swap. All aggregation runs on this value.
    pub fn net_pnl(&self) -> f64 {
        self.pnl + self.commission + self.swap
    }

    pub fn model_or_default(&self) -> &str {
        match self.model.as_deref() {
            Some(m) if !m.trim().is_empty() => m,
            _ => "unassigned",
        }
    }
}

/// A draft that passed validation, with derived fields filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidRecord {
    pub kind: RecordKind,
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub pnl: f64,
    pub commission: f64,
    pub swap: f64,
    pub outcome: Outcome,
    pub risk_reward: Option<f64>,
    pub session: Session,
    pub model: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub tags: Vec<String>,
    pub notes: String,
    pub images: Vec<String>,
}

/// Unvalidated form input for creating or editing a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    #[serde(default)]
    pub kind: Option<RecordKind>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub pnl: Option<f64>,
    #[serde(default)]
    pub commission: Option<f64>,
    #[serde(default)]
    pub swap: Option<f64>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub risk_reward: Option<f64>,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl From<&TradeRecord> for RecordDraft {
    fn from(r: &TradeRecord) -> Self {
        Self {
            kind: Some(r.kind),
            instrument: Some(r.instrument.clone()),
            direction: Some(r.direction),
            entry_price: r.entry_price,
            exit_price: r.exit_price,
            stop_loss: r.stop_loss,
            pnl: Some(r.pnl),
            commission: Some(r.commission),
            swap: Some(r.swap),
            outcome: Some(r.outcome),
            risk_reward: r.risk_reward,
            session: Some(r.session),
            model: r.model.clone(),
            timestamp: Some(r.timestamp),
            tags: r.tags.clone(),
            notes: Some(r.notes.clone()),
            images: r.images.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub display_mode: DisplayMode,
}
