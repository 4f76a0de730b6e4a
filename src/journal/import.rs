//! Broker statement import.
//!
//! Statements are CSV exports with one closed position per row:
//! `ID, Close Time, Profit, Commission, Swap`, optionally `Symbol`, `Type`,
//! `Open Price` and `Close Price`. The trailing `Total` row and rows without
//! a close time are skipped.

use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{JournalError, JournalResult};
use crate::journal::JournalBackend;
use crate::models::{Direction, RecordDraft, RecordKind, TradeRecord};

const CLOSE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Deserialize)]
struct StatementRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Close Time", default)]
    close_time: Option<String>,
    #[serde(rename = "Symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "Type", default)]
    side: Option<String>,
    #[serde(rename = "Open Price", default)]
    open_price: Option<String>,
    #[serde(rename = "Close Price", default)]
    close_price: Option<String>,
    #[serde(rename = "Profit", default)]
    profit: Option<String>,
    #[serde(rename = "Commission", default)]
    commission: Option<String>,
    #[serde(rename = "Swap", default)]
    swap: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub kind: RecordKind,
    /// Used when the statement has no `Symbol` column.
    pub instrument: Option<String>,
    /// Used when the statement has no `Type` column.
    pub direction: Option<Direction>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            kind: RecordKind::Trade,
            instrument: None,
            direction: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based line in the file, header included.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<TradeRecord>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Default)]
pub struct ParsedStatement {
    pub drafts: Vec<(usize, RecordDraft)>,
    pub skipped: Vec<SkippedRow>,
}

pub fn parse_statement<R: Read>(reader: R, opts: &ImportOptions) -> JournalResult<ParsedStatement> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();

    let mut parsed = ParsedStatement::default();
    for (i, result) in rdr.records().enumerate() {
        // Quoted fields may span lines, so ask the reader where a row began.
        let fallback = i + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                parsed.skipped.push(SkippedRow {
                    line: e.position().map_or(fallback, |p| p.line() as usize),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map_or(fallback, |p| p.line() as usize);
        let row: StatementRow = match record.deserialize(Some(&headers)) {
            Ok(r) => r,
            Err(e) => {
                parsed.skipped.push(SkippedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if row.id.eq_ignore_ascii_case("total") {
            continue;
        }
        let close_time = match row.close_time.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => s,
            None => continue,
        };

        match row_to_draft(&row, close_time, opts) {
            Ok(draft) => parsed.drafts.push((line, draft)),
            Err(reason) => parsed.skipped.push(SkippedRow { line, reason }),
        }
    }
    Ok(parsed)
}

fn row_to_draft(
    row: &StatementRow,
    close_time: &str,
    opts: &ImportOptions,
) -> Result<RecordDraft, String> {
    let naive = NaiveDateTime::parse_from_str(close_time, CLOSE_TIME_FORMAT)
        .map_err(|_| format!("unreadable close time '{}'", close_time))?;

    let direction = match row.side.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(s.parse::<Direction>()?),
        None => opts.direction,
    };

    Ok(RecordDraft {
        kind: Some(opts.kind),
        instrument: row
            .symbol
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| opts.instrument.clone()),
        direction,
        entry_price: parse_optional(&row.open_price, "Open Price")?,
        exit_price: parse_optional(&row.close_price, "Close Price")?,
        pnl: Some(parse_amount(&row.profit, "Profit")?),
        commission: Some(parse_amount(&row.commission, "Commission")?),
        swap: Some(parse_amount(&row.swap, "Swap")?),
        timestamp: Some(Utc.from_utc_datetime(&naive)),
        tags: vec!["imported".to_string()],
        notes: Some(format!("Statement ticket {}", row.id)),
        ..RecordDraft::default()
    })
}

/// Blank amounts count as zero.
fn parse_amount(value: &Option<String>, column: &str) -> Result<f64, String> {
    Ok(parse_optional(value, column)?.unwrap_or(0.0))
}

fn parse_optional(value: &Option<String>, column: &str) -> Result<Option<f64>, String> {
    match value.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .replace(',', "")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("{} '{}' is not a number", column, s)),
    }
}

/// Parse a statement and submit each row. Rows the backend rejects for
/// validation are reported and skipped; any other error aborts.
pub async fn import_statement(
    backend: &mut dyn JournalBackend,
    path: &Path,
    opts: &ImportOptions,
) -> JournalResult<ImportReport> {
    let file = std::fs::File::open(path).map_err(|source| JournalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_statement(file, opts)?;

    let mut report = ImportReport {
        imported: Vec::new(),
        skipped: parsed.skipped,
    };
    for (line, draft) in parsed.drafts {
        match backend.create(draft).await {
            Ok(record) => report.imported.push(record),
            Err(JournalError::Validation(errs)) => {
                warn!("Skipping line {}: {}", line, errs);
                report.skipped.push(SkippedRow {
                    line,
                    reason: errs.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    report.skipped.sort_by_key(|s| s.line);

    info!(
        "Imported {} records from {} ({} skipped)",
        report.imported.len(),
        path.display(),
        report.skipped.len()
    );
    Ok(report)
}
