use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use trade_journal::analytics::calendar;
use trade_journal::analytics::drawdown::{self, DrawdownType};
use trade_journal::analytics::report::{print_drawdown, render_month};
use trade_journal::analytics::search::search;
use trade_journal::analytics::JournalReport;
use trade_journal::config::{BackendKind, Config};
use trade_journal::core::format::format_pnl;
use trade_journal::journal::import::{import_statement, ImportOptions};
use trade_journal::journal::{FileJournal, HttpJournal, JournalBackend};
use trade_journal::models::{
    Direction, DisplayMode, Outcome, RecordDraft, RecordKind, Session, Settings, TradeRecord,
};

#[derive(Parser)]
#[command(
    name = "trade-journal",
    about = "Trading journal: record trades and backtests, review performance"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new trade or backtest.
    Add(RecordArgs),
    /// Edit fields of an existing record.
    Edit {
        id: u64,
        #[command(flatten)]
        fields: RecordArgs,
    },
    /// Show one record in full.
    Show { id: u64 },
    /// List records, newest first.
    List {
        #[arg(long)]
        kind: Option<RecordKind>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a record.
    Delete { id: u64 },
    /// Performance report with breakdowns.
    Stats {
        #[arg(long)]
        kind: Option<RecordKind>,
        /// Print the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Monthly P&L calendar.
    Calendar {
        /// Month as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        kind: Option<RecordKind>,
    },
    /// Fuzzy search by instrument, tags, model or notes.
    Search {
        query: String,
        #[arg(long)]
        kind: Option<RecordKind>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Import a broker statement CSV.
    Import {
        path: PathBuf,
        #[arg(long, default_value = "trade")]
        kind: RecordKind,
        /// Instrument for statements without a Symbol column.
        #[arg(long)]
        instrument: Option<String>,
        /// Direction for statements without a Type column.
        #[arg(long)]
        direction: Option<Direction>,
    },
    /// Check records against prop-firm drawdown rules.
    Drawdown {
        #[arg(long, default_value = "trade")]
        kind: RecordKind,
        #[arg(long)]
        account_size: Option<f64>,
        #[arg(long)]
        daily_pct: Option<f64>,
        #[arg(long)]
        max_pct: Option<f64>,
        /// Measure max drawdown from the peak balance.
        #[arg(long, default_value_t = false)]
        trailing: bool,
    },
    /// Show or change display settings.
    Settings {
        #[arg(long)]
        display_mode: Option<DisplayMode>,
    },
}

#[derive(Args, Default)]
struct RecordArgs {
    #[arg(long)]
    kind: Option<RecordKind>,
    #[arg(long)]
    instrument: Option<String>,
    #[arg(long)]
    direction: Option<Direction>,
    #[arg(long)]
    entry: Option<f64>,
    #[arg(long)]
    exit: Option<f64>,
    #[arg(long)]
    stop: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pnl: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    commission: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    swap: Option<f64>,
    #[arg(long)]
    outcome: Option<Outcome>,
    /// Risk:reward; derived from entry/exit/stop when omitted.
    #[arg(long)]
    rr: Option<f64>,
    /// Derived from the close time when omitted.
    #[arg(long)]
    session: Option<Session>,
    #[arg(long)]
    model: Option<String>,
    /// Close time, RFC 3339 or "YYYY-MM-DD HH:MM" (UTC).
    #[arg(long, value_parser = parse_time)]
    time: Option<DateTime<Utc>>,
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long = "image")]
    images: Vec<String>,
}

impl RecordArgs {
    fn apply_to(self, draft: &mut RecordDraft) {
        // Derived fields are recomputed when their inputs change.
        if (self.pnl.is_some() || self.commission.is_some() || self.swap.is_some())
            && self.outcome.is_none()
        {
            draft.outcome = None;
        }
        if (self.entry.is_some() || self.exit.is_some() || self.stop.is_some())
            && self.rr.is_none()
        {
            draft.risk_reward = None;
        }
        if self.time.is_some() && self.session.is_none() {
            draft.session = None;
        }

        draft.kind = self.kind.or(draft.kind);
        draft.direction = self.direction.or(draft.direction);
        draft.entry_price = self.entry.or(draft.entry_price);
        draft.exit_price = self.exit.or(draft.exit_price);
        draft.stop_loss = self.stop.or(draft.stop_loss);
        draft.pnl = self.pnl.or(draft.pnl);
        draft.commission = self.commission.or(draft.commission);
        draft.swap = self.swap.or(draft.swap);
        draft.outcome = self.outcome.or(draft.outcome);
        draft.risk_reward = self.rr.or(draft.risk_reward);
        draft.session = self.session.or(draft.session);
        draft.timestamp = self.time.or(draft.timestamp);
        if self.instrument.is_some() {
            draft.instrument = self.instrument;
        }
        if self.model.is_some() {
            draft.model = self.model;
        }
        if self.notes.is_some() {
            draft.notes = self.notes;
        }
        if !self.tags.is_empty() {
            draft.tags = self.tags;
        }
        if !self.images.is_empty() {
            draft.images = self.images;
        }
    }
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .map(|n| Utc.from_utc_datetime(&n))
        .map_err(|_| format!("unrecognised time '{}'", s))
}

fn parse_month(s: &str) -> Result<(i32, u32)> {
    let (y, m) = s
        .split_once('-')
        .with_context(|| format!("month '{}' is not YYYY-MM", s))?;
    Ok((
        y.parse().with_context(|| format!("bad year in '{}'", s))?,
        m.parse().with_context(|| format!("bad month in '{}'", s))?,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut backend: Box<dyn JournalBackend> = match cfg.backend {
        BackendKind::File => Box::new(FileJournal::open(&cfg).context("Failed to open journal")?),
        BackendKind::Http => Box::new(HttpJournal::new(&cfg).context("Failed to build API client")?),
    };

    run(cli.command, backend.as_mut(), &cfg).await
}

async fn run(command: Commands, backend: &mut dyn JournalBackend, cfg: &Config) -> Result<()> {
    match command {
        Commands::Add(args) => {
            let mut draft = RecordDraft {
                kind: Some(RecordKind::Trade),
                timestamp: Some(Utc::now()),
                ..RecordDraft::default()
            };
            args.apply_to(&mut draft);
            let record = backend.create(draft).await?;
            println!("Recorded #{}", record.id);
            print_record(&record);
        }
        Commands::Edit { id, fields } => {
            let existing = backend.get(id).await?;
            let mut draft = RecordDraft::from(&existing);
            fields.apply_to(&mut draft);
            let record = backend.update(id, draft).await?;
            println!("Updated #{}", record.id);
            print_record(&record);
        }
        Commands::Show { id } => print_record(&backend.get(id).await?),
        Commands::List { kind, limit } => {
            let mode = backend.settings().await?.display_mode;
            let records = backend.list(kind).await?;
            let shown = limit.unwrap_or(records.len());
            for r in records.iter().take(shown) {
                print_row(r, mode, cfg.account_size);
            }
            println!("{} of {} records", shown.min(records.len()), records.len());
        }
        Commands::Delete { id } => {
            backend.delete(id).await?;
            println!("Deleted #{}", id);
        }
        Commands::Stats { kind, json } => {
            let records = backend.list(kind).await?;
            let report = JournalReport::build(&records, &cfg.prop_firm_rules());
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print_summary(backend.settings().await?.display_mode);
            }
        }
        Commands::Calendar { month, kind } => {
            let (year, month) = match month {
                Some(m) => parse_month(&m)?,
                None => {
                    let now = Utc::now();
                    (now.year(), now.month())
                }
            };
            let mode = backend.settings().await?.display_mode;
            let records = backend.list(kind).await?;
            let grid = calendar::month_grid(&records, year, month)?;
            print!("{}", render_month(&grid, mode, cfg.account_size));
        }
        Commands::Search { query, kind, limit } => {
            let mode = backend.settings().await?.display_mode;
            let records = backend.list(kind).await?;
            let hits = search(&records, &query);
            for hit in hits.iter().take(limit) {
                print_row(hit.record, mode, cfg.account_size);
            }
            println!("{} matches", hits.len());
        }
        Commands::Import {
            path,
            kind,
            instrument,
            direction,
        } => {
            let opts = ImportOptions {
                kind,
                instrument,
                direction,
            };
            let report = import_statement(backend, &path, &opts)
                .await
                .with_context(|| format!("Failed to import {}", path.display()))?;
            println!("Imported {} records", report.imported.len());
            for s in &report.skipped {
                println!("  skipped line {}: {}", s.line, s.reason);
            }
        }
        Commands::Drawdown {
            kind,
            account_size,
            daily_pct,
            max_pct,
            trailing,
        } => {
            let mut rules = cfg.prop_firm_rules();
            if let Some(v) = account_size {
                rules.account_size = v;
            }
            if let Some(v) = daily_pct {
                rules.daily_drawdown_pct = v;
            }
            if let Some(v) = max_pct {
                rules.max_drawdown_pct = v;
            }
            if trailing {
                rules.max_drawdown_type = DrawdownType::Trailing;
            }
            if rules.account_size <= 0.0 {
                bail!("account size must be positive");
            }
            let records = backend.list(Some(kind)).await?;
            let report = drawdown::evaluate(&records, &rules);
            for d in &report.days {
                println!(
                    "{}  start ${:.2}  pnl ${:+.2} ({} trades)  loss ${:.2}  {}",
                    d.date,
                    d.start_balance,
                    d.pnl,
                    d.trades,
                    d.day_loss,
                    if d.breached { "VIOLATION" } else { "OK" }
                );
            }
            print_drawdown(&report);
        }
        Commands::Settings { display_mode } => {
            let settings = match display_mode {
                Some(mode) => {
                    backend
                        .save_settings(Settings { display_mode: mode })
                        .await?
                }
                None => backend.settings().await?,
            };
            println!("display_mode = {}", settings.display_mode);
        }
    }
    Ok(())
}

fn print_row(r: &TradeRecord, mode: DisplayMode, account_size: f64) {
    println!(
        "#{:<5} {} {:<8} {:<10} {:<4} {:<9} {:>10}  {}",
        r.id,
        r.timestamp.format("%Y-%m-%d %H:%M"),
        r.kind.to_string(),
        r.instrument,
        r.direction.to_string(),
        r.outcome.to_string(),
        format_pnl(r.net_pnl(), mode, account_size),
        r.model_or_default()
    );
}

fn print_record(r: &TradeRecord) {
    let price = |p: Option<f64>| p.map_or("-".to_string(), |v| format!("{}", v));
    println!("  Kind:        {}", r.kind);
    println!("  Instrument:  {} ({})", r.instrument, r.direction);
    println!(
        "  Prices:      entry {} | exit {} | stop {}",
        price(r.entry_price),
        price(r.exit_price),
        price(r.stop_loss)
    );
    println!(
        "  P&L:         {:+.2} (commission {:+.2}, swap {:+.2}) net {:+.2}",
        r.pnl,
        r.commission,
        r.swap,
        r.net_pnl()
    );
    println!("  Outcome:     {}", r.outcome);
    println!(
        "  R:R:         {}",
        r.risk_reward.map_or("-".to_string(), |v| format!("{:.2}", v))
    );
    println!("  Session:     {}", r.session);
    println!("  Model:       {}", r.model_or_default());
    println!("  Closed:      {}", r.timestamp.to_rfc3339());
    if !r.tags.is_empty() {
        println!("  Tags:        {}", r.tags.join(", "));
    }
    if !r.notes.is_empty() {
        println!("  Notes:       {}", r.notes);
    }
    for img in &r.images {
        println!("  Image:       {}", img);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trade_journal::config::default_sessions;
    use trade_journal::core::sessions::SessionClassifier;

    fn existing() -> RecordDraft {
        RecordDraft {
            kind: Some(RecordKind::Trade),
            instrument: Some("EURUSD".to_string()),
            direction: Some(Direction::Buy),
            entry_price: Some(1.1000),
            exit_price: Some(1.1100),
            stop_loss: Some(1.0950),
            pnl: Some(100.0),
            outcome: Some(Outcome::Win),
            risk_reward: Some(2.0),
            session: Some(Session::NewYork),
            model: Some("Silver Bullet".to_string()),
            timestamp: parse_time("2024-01-15T13:30:00Z").ok(),
            tags: vec!["fvg".to_string()],
            ..RecordDraft::default()
        }
    }

    #[test]
    fn pnl_edit_rederives_outcome() {
        let mut draft = existing();
        RecordArgs {
            pnl: Some(-20.0),
            ..RecordArgs::default()
        }
        .apply_to(&mut draft);
        assert_eq!(draft.outcome, None);
        assert_eq!(draft.pnl, Some(-20.0));

        let valid = draft
            .validate(&SessionClassifier::new(&default_sessions()))
            .unwrap();
        assert_eq!(valid.outcome, Outcome::Loss);
    }

    #[test]
    fn explicit_outcome_is_kept() {
        let mut draft = existing();
        RecordArgs {
            pnl: Some(-20.0),
            outcome: Some(Outcome::Loss),
            ..RecordArgs::default()
        }
        .apply_to(&mut draft);
        assert_eq!(draft.outcome, Some(Outcome::Loss));
    }

    #[test]
    fn price_and_time_edits_clear_derived_fields() {
        let mut draft = existing();
        RecordArgs {
            exit: Some(1.1200),
            time: parse_time("2024-01-15 08:00").ok(),
            ..RecordArgs::default()
        }
        .apply_to(&mut draft);
        assert_eq!(draft.risk_reward, None);
        assert_eq!(draft.session, None);
        assert_eq!(draft.outcome, Some(Outcome::Win));

        let valid = draft
            .validate(&SessionClassifier::new(&default_sessions()))
            .unwrap();
        // 200 pips of reward over 50 of risk; 08:00 UTC is 03:00 ET.
        assert_eq!(valid.risk_reward, Some(4.0));
        assert_eq!(valid.session, Session::London);
    }

    #[test]
    fn untouched_fields_survive_an_edit() {
        let mut draft = existing();
        RecordArgs {
            notes: Some("moved stop".to_string()),
            tags: vec!["news".to_string()],
            ..RecordArgs::default()
        }
        .apply_to(&mut draft);
        assert_eq!(draft.outcome, Some(Outcome::Win));
        assert_eq!(draft.risk_reward, Some(2.0));
        assert_eq!(draft.model.as_deref(), Some("Silver Bullet"));
        assert_eq!(draft.tags, vec!["news".to_string()]);
        assert_eq!(draft.notes.as_deref(), Some("moved stop"));
    }
}
