use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::core::sessions::SessionClassifier;
use crate::error::{JournalError, JournalResult};
use crate::journal::JournalBackend;
use crate::models::{RecordDraft, RecordKind, Settings, TradeRecord};

const JOURNAL_FILE: &str = "journal.json";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct JournalState {
    next_id: u64,
    records: Vec<TradeRecord>,
}

/// Journal kept as pretty-printed JSON in a local directory. The whole
/// file is rewritten after every mutation.
pub struct FileJournal {
    dir: PathBuf,
    state: JournalState,
    settings: Settings,
    sessions: SessionClassifier,
}

impl FileJournal {
    pub fn open(cfg: &Config) -> JournalResult<Self> {
        Self::open_dir(&cfg.journal_dir, SessionClassifier::new(&cfg.sessions))
    }

    pub fn open_dir(dir: &Path, sessions: SessionClassifier) -> JournalResult<Self> {
        let state: JournalState = read_json(&dir.join(JOURNAL_FILE))?.unwrap_or_default();
        let settings: Settings = read_json(&dir.join(SETTINGS_FILE))?.unwrap_or_default();
        info!(
            "Opened journal at {} ({} records)",
            dir.display(),
            state.records.len()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            state,
            settings,
            sessions,
        })
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.state.records
    }

    /// Persist `next` and only then make it the live state, so a failed
    /// write leaves memory matching disk.
    fn commit(&mut self, next: JournalState) -> JournalResult<()> {
        write_json(&self.dir.join(JOURNAL_FILE), &next)?;
        self.state = next;
        Ok(())
    }

    fn position(&self, id: u64) -> JournalResult<usize> {
        self.state
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(JournalError::NotFound(id))
    }
}

#[async_trait]
impl JournalBackend for FileJournal {
    async fn list(&mut self, kind: Option<RecordKind>) -> JournalResult<Vec<TradeRecord>> {
        let mut out: Vec<TradeRecord> = self
            .state
            .records
            .iter()
            .filter(|r| kind.map_or(true, |k| r.kind == k))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn get(&mut self, id: u64) -> JournalResult<TradeRecord> {
        let idx = self.position(id)?;
        Ok(self.state.records[idx].clone())
    }

    async fn create(&mut self, draft: RecordDraft) -> JournalResult<TradeRecord> {
        let valid = draft.validate(&self.sessions)?;
        let id = self.state.next_id + 1;
        let record = TradeRecord::from_valid(id, valid, Utc::now());
        let mut records = self.state.records.clone();
        records.push(record.clone());
        self.commit(JournalState {
            next_id: id,
            records,
        })?;
        info!(
            "Recorded {} #{} {} {} {:+.2}",
            record.kind,
            record.id,
            record.instrument,
            record.direction,
            record.net_pnl()
        );
        Ok(record)
    }

    async fn update(&mut self, id: u64, draft: RecordDraft) -> JournalResult<TradeRecord> {
        let idx = self.position(id)?;
        let valid = draft.validate(&self.sessions)?;
        let mut records = self.state.records.clone();
        records[idx].apply(valid, Utc::now());
        let updated = records[idx].clone();
        self.commit(JournalState {
            next_id: self.state.next_id,
            records,
        })?;
        debug!("Updated record #{}", id);
        Ok(updated)
    }

    async fn delete(&mut self, id: u64) -> JournalResult<()> {
        let idx = self.position(id)?;
        let mut records = self.state.records.clone();
        records.remove(idx);
        self.commit(JournalState {
            next_id: self.state.next_id,
            records,
        })?;
        info!("Deleted record #{}", id);
        Ok(())
    }

    async fn settings(&mut self) -> JournalResult<Settings> {
        Ok(self.settings)
    }

    async fn save_settings(&mut self, settings: Settings) -> JournalResult<Settings> {
        write_json(&self.dir.join(SETTINGS_FILE), &settings)?;
        self.settings = settings;
        debug!("Display mode set to {}", settings.display_mode);
        Ok(settings)
    }
}

/// Missing file is not an error; it means nothing was saved yet.
fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> JournalResult<Option<T>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(JournalError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> JournalResult<()> {
    let io_err = |source| JournalError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_sessions;
    use crate::models::{DisplayMode, Outcome};
    use crate::test_helpers::{complete_draft, temp_journal_dir};

    fn open(dir: &Path) -> FileJournal {
        FileJournal::open_dir(dir, SessionClassifier::new(&default_sessions())).unwrap()
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids_and_persists() {
        let dir = temp_journal_dir("store_create");
        let mut journal = open(&dir);
        let a = journal.create(complete_draft()).await.unwrap();
        let b = journal.create(complete_draft()).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let mut reopened = open(&dir);
        assert_eq!(reopened.list(None).await.unwrap().len(), 2);
        let c = reopened.create(complete_draft()).await.unwrap();
        assert_eq!(c.id, 3);
    }

    #[tokio::test]
    async fn invalid_draft_is_not_saved() {
        let dir = temp_journal_dir("store_invalid");
        let mut journal = open(&dir);
        let err = journal.create(RecordDraft::default()).await.unwrap_err();
        assert!(matches!(err, JournalError::Validation(_)));
        assert!(journal.records().is_empty());
        assert!(!dir.join(JOURNAL_FILE).exists());
    }

    #[tokio::test]
    async fn update_keeps_id_and_creation_time() {
        let dir = temp_journal_dir("store_update");
        let mut journal = open(&dir);
        let created = journal.create(complete_draft()).await.unwrap();

        let mut draft = RecordDraft::from(&created);
        draft.pnl = Some(-30.0);
        draft.outcome = Some(Outcome::Loss);
        draft.exit_price = Some(1.0970);
        let updated = journal.update(created.id, draft).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.outcome, Outcome::Loss);
        assert_eq!(journal.get(created.id).await.unwrap().pnl, -30.0);
    }

    #[tokio::test]
    async fn delete_and_missing_ids() {
        let dir = temp_journal_dir("store_delete");
        let mut journal = open(&dir);
        let r = journal.create(complete_draft()).await.unwrap();
        journal.delete(r.id).await.unwrap();
        assert!(matches!(journal.get(r.id).await, Err(JournalError::NotFound(1))));
        assert!(matches!(journal.delete(r.id).await, Err(JournalError::NotFound(1))));
        assert!(matches!(
            journal.update(99, complete_draft()).await,
            Err(JournalError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_kind_newest_first() {
        let dir = temp_journal_dir("store_list");
        let mut journal = open(&dir);
        let mut backtest = complete_draft();
        backtest.kind = Some(RecordKind::Backtest);
        journal.create(complete_draft()).await.unwrap();
        journal.create(backtest).await.unwrap();

        let backtests = journal.list(Some(RecordKind::Backtest)).await.unwrap();
        assert_eq!(backtests.len(), 1);
        assert_eq!(backtests[0].kind, RecordKind::Backtest);
        let all = journal.list(None).await.unwrap();
        assert_eq!(all[0].id, 2);
    }

    #[tokio::test]
    async fn settings_round_trip_through_disk() {
        let dir = temp_journal_dir("store_settings");
        let mut journal = open(&dir);
        assert_eq!(journal.settings().await.unwrap().display_mode, DisplayMode::Currency);
        journal
            .save_settings(Settings {
                display_mode: DisplayMode::Percentage,
            })
            .await
            .unwrap();
        let mut reopened = open(&dir);
        assert_eq!(
            reopened.settings().await.unwrap().display_mode,
            DisplayMode::Percentage
        );
    }

    #[tokio::test]
    async fn failed_write_leaves_journal_unchanged() {
        let dir = temp_journal_dir("store_failed_write");
        let mut journal = open(&dir);
        let kept = journal.create(complete_draft()).await.unwrap();

        // A plain file where the directory should be makes every write fail.
        fs::remove_dir_all(&dir).unwrap();
        fs::write(&dir, "not a directory").unwrap();

        let err = journal.create(complete_draft()).await.unwrap_err();
        assert!(matches!(err, JournalError::Io { .. }));
        assert_eq!(journal.records().len(), 1);

        let mut draft = RecordDraft::from(&kept);
        draft.pnl = Some(-30.0);
        draft.outcome = Some(Outcome::Loss);
        draft.exit_price = Some(1.0970);
        assert!(journal.update(kept.id, draft).await.is_err());
        assert_eq!(journal.get(kept.id).await.unwrap().pnl, 100.0);

        assert!(journal.delete(kept.id).await.is_err());
        assert_eq!(journal.records().len(), 1);

        fs::remove_file(&dir).unwrap();
        let next = journal.create(complete_draft()).await.unwrap();
        assert_eq!(next.id, 2);
        assert_eq!(open(&dir).records().len(), 2);
    }

    #[test]
    fn corrupt_journal_is_reported() {
        let dir = temp_journal_dir("store_corrupt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(JOURNAL_FILE), "{not json").unwrap();
        let res = FileJournal::open_dir(&dir, SessionClassifier::new(&default_sessions()));
        assert!(matches!(res, Err(JournalError::Json(_))));
    }
}
