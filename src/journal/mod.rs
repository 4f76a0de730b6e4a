pub mod http;
pub mod import;
pub mod store;

pub use http::HttpJournal;
pub use store::FileJournal;

use async_trait::async_trait;

use crate::error::JournalResult;
use crate::models::{RecordDraft, RecordKind, Settings, TradeRecord};

/// CRUD access to persisted records and the display settings.
#[async_trait]
pub trait JournalBackend: Send + Sync {
    async fn list(&mut self, kind: Option<RecordKind>) -> JournalResult<Vec<TradeRecord>>;
    async fn get(&mut self, id: u64) -> JournalResult<TradeRecord>;
    async fn create(&mut self, draft: RecordDraft) -> JournalResult<TradeRecord>;
    async fn update(&mut self, id: u64, draft: RecordDraft) -> JournalResult<TradeRecord>;
    async fn delete(&mut self, id: u64) -> JournalResult<()>;
    async fn settings(&mut self) -> JournalResult<Settings>;
    async fn save_settings(&mut self, settings: Settings) -> JournalResult<Settings>;
}
