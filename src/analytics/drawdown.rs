//! Funded-account rule check: daily loss limit and overall drawdown limit,
//! replayed over closed trades.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::format::round2;
use crate::models::TradeRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawdownType {
    /// Measured from the starting account size.
    Static,
    /// Measured from the highest balance reached.
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropFirmRules {
    pub account_size: f64,
    pub daily_drawdown_pct: f64,
    pub max_drawdown_pct: f64,
    pub max_drawdown_type: DrawdownType,
}

impl Default for PropFirmRules {
    fn default() -> Self {
        Self {
            account_size: 5000.0,
            daily_drawdown_pct: 4.0,
            max_drawdown_pct: 8.0,
            max_drawdown_type: DrawdownType::Static,
        }
    }
}

impl PropFirmRules {
    pub fn daily_limit(&self) -> f64 {
        self.account_size * self.daily_drawdown_pct / 100.0
    }

    pub fn max_limit(&self) -> f64 {
        self.account_size * self.max_drawdown_pct / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDrawdown {
    pub date: NaiveDate,
    pub trades: usize,
    pub start_balance: f64,
    pub pnl: f64,
    pub end_balance: f64,
    pub day_loss: f64,
    pub breached: bool,
    /// How far past the limit the day went, 0 when within it.
    pub excess: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawdownReport {
    pub rules: PropFirmRules,
    pub days: Vec<DailyDrawdown>,
    pub final_balance: f64,
    pub lowest_balance: f64,
    pub peak_balance: f64,
    pub max_drawdown_used: f64,
    pub max_drawdown_breached: bool,
}

impl DrawdownReport {
    pub fn daily_violations(&self) -> impl Iterator<Item = &DailyDrawdown> {
        self.days.iter().filter(|d| d.breached)
    }

    pub fn passed(&self) -> bool {
        !self.max_drawdown_breached && self.daily_violations().next().is_none()
    }
}

pub fn evaluate(records: &[TradeRecord], rules: &PropFirmRules) -> DrawdownReport {
    let mut ordered: Vec<&TradeRecord> = records.iter().collect();
    ordered.sort_by_key(|r| (r.timestamp, r.id));

    // Max drawdown is walked trade by trade so intraday dips count.
    let mut balance = rules.account_size;
    let mut lowest = rules.account_size;
    let mut peak = rules.account_size;
    let mut used: f64 = 0.0;
    for r in &ordered {
        balance += r.net_pnl();
        lowest = lowest.min(balance);
        peak = peak.max(balance);
        let dd = match rules.max_drawdown_type {
            DrawdownType::Static => rules.account_size - balance,
            DrawdownType::Trailing => peak - balance,
        };
        used = used.max(dd);
    }

    let mut by_day: BTreeMap<NaiveDate, Vec<&TradeRecord>> = BTreeMap::new();
    for r in &ordered {
        by_day.entry(r.timestamp.date_naive()).or_default().push(r);
    }

    let daily_limit = rules.daily_limit();
    let mut running = rules.account_size;
    let days = by_day
        .into_iter()
        .map(|(date, trades)| {
            let pnl: f64 = trades.iter().map(|t| t.net_pnl()).sum();
            let day_loss = if pnl < 0.0 { pnl.abs() } else { 0.0 };
            let breached = day_loss > daily_limit;
            let start_balance = running;
            running += pnl;
            DailyDrawdown {
                date,
                trades: trades.len(),
                start_balance: round2(start_balance),
                pnl: round2(pnl),
                end_balance: round2(running),
                day_loss: round2(day_loss),
                breached,
                excess: if breached {
                    round2(day_loss - daily_limit)
                } else {
                    0.0
                },
            }
        })
        .collect();

    DrawdownReport {
        rules: *rules,
        days,
        final_balance: round2(balance),
        lowest_balance: round2(lowest),
        peak_balance: round2(peak),
        max_drawdown_used: round2(used),
        max_drawdown_breached: used > rules.max_limit(),
    }
}
