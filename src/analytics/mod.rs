pub mod calendar;
pub mod drawdown;
pub mod performance;
pub mod report;
pub mod search;

pub use drawdown::{DrawdownReport, PropFirmRules};
pub use performance::{summarize, PerformanceSummary, ProfitFactor};
pub use report::JournalReport;
