pub mod direction;
pub mod record;

pub use direction::*;
pub use record::{RecordDraft, Settings, TradeRecord, ValidRecord};
