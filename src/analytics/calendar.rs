use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::format::round2;
use crate::error::{JournalError, JournalResult};
use crate::models::{Outcome, TradeRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DaySummary {
    pub pnl: f64,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
}

impl DaySummary {
    fn add(&mut self, r: &TradeRecord) {
        self.pnl += r.net_pnl();
        self.trades += 1;
        match r.outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Breakeven => self.breakeven += 1,
        }
    }

    fn rounded(self) -> Self {
        Self {
            pnl: round2(self.pnl),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekSummary {
    /// Monday of the week.
    pub week_start: NaiveDate,
    pub pnl: f64,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub trading_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub pnl: f64,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub green_days: usize,
    pub red_days: usize,
    pub best_day: Option<(NaiveDate, f64)>,
    pub worst_day: Option<(NaiveDate, f64)>,
}

/// P&L per UTC calendar day.
pub fn daily(records: &[TradeRecord]) -> BTreeMap<NaiveDate, DaySummary> {
    let mut days = daily_unrounded(records);
    for d in days.values_mut() {
        *d = d.rounded();
    }
    days
}

/// Rollups sum these and round once at the end.
fn daily_unrounded(records: &[TradeRecord]) -> BTreeMap<NaiveDate, DaySummary> {
    let mut days: BTreeMap<NaiveDate, DaySummary> = BTreeMap::new();
    for r in records {
        days.entry(r.timestamp.date_naive()).or_default().add(r);
    }
    days
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = Duration::days(date.weekday().num_days_from_monday() as i64);
    date.checked_sub_signed(offset).unwrap_or(NaiveDate::MIN)
}

pub fn weekly(records: &[TradeRecord]) -> Vec<WeekSummary> {
    let mut weeks: BTreeMap<NaiveDate, WeekSummary> = BTreeMap::new();
    for (date, day) in daily_unrounded(records) {
        let start = week_start(date);
        let w = weeks.entry(start).or_insert_with(|| WeekSummary {
            week_start: start,
            pnl: 0.0,
            trades: 0,
            wins: 0,
            losses: 0,
            trading_days: 0,
        });
        w.pnl += day.pnl;
        w.trades += day.trades;
        w.wins += day.wins;
        w.losses += day.losses;
        w.trading_days += 1;
    }
    weeks
        .into_values()
        .map(|mut w| {
            w.pnl = round2(w.pnl);
            w
        })
        .collect()
}

pub fn monthly(records: &[TradeRecord]) -> Vec<MonthSummary> {
    let mut months: BTreeMap<(i32, u32), MonthSummary> = BTreeMap::new();
    for (date, day) in daily_unrounded(records) {
        let key = (date.year(), date.month());
        let m = months.entry(key).or_insert_with(|| MonthSummary {
            year: key.0,
            month: key.1,
            pnl: 0.0,
            trades: 0,
            wins: 0,
            losses: 0,
            green_days: 0,
            red_days: 0,
            best_day: None,
            worst_day: None,
        });
        m.pnl += day.pnl;
        m.trades += day.trades;
        m.wins += day.wins;
        m.losses += day.losses;
        if day.pnl > 0.0 {
            m.green_days += 1;
        } else if day.pnl < 0.0 {
            m.red_days += 1;
        }
        if m.best_day.map_or(true, |(_, p)| day.pnl > p) {
            m.best_day = Some((date, day.pnl));
        }
        if m.worst_day.map_or(true, |(_, p)| day.pnl < p) {
            m.worst_day = Some((date, day.pnl));
        }
    }
    months
        .into_values()
        .map(|mut m| {
            m.pnl = round2(m.pnl);
            m.best_day = m.best_day.map(|(d, p)| (d, round2(p)));
            m.worst_day = m.worst_day.map(|(d, p)| (d, round2(p)));
            m
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub day: Option<DaySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarRow {
    /// Monday..Sunday; `None` for days outside the month.
    pub cells: [Option<CalendarCell>; 7],
    pub week_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub rows: Vec<CalendarRow>,
    pub month_pnl: f64,
}

/// Lay a month out as Monday-first weeks for calendar display.
pub fn month_grid(records: &[TradeRecord], year: i32, month: u32) -> JournalResult<MonthGrid> {
    let invalid = || JournalError::InvalidMonth { year, month };
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let lead = Duration::days(first.weekday().num_days_from_monday() as i64);
    let mut cursor = first.checked_sub_signed(lead).ok_or_else(invalid)?;
    let days = daily_unrounded(records);

    let mut rows = Vec::new();
    let mut month_pnl = 0.0;

    while cursor.year() < year || (cursor.year() == year && cursor.month() <= month) {
        let mut cells: [Option<CalendarCell>; 7] = Default::default();
        let mut week_pnl = 0.0;
        for (i, cell) in cells.iter_mut().enumerate() {
            // Past the last representable date nothing can be in the month.
            let Some(date) = cursor.checked_add_signed(Duration::days(i as i64)) else {
                break;
            };
            if date.year() != year || date.month() != month {
                continue;
            }
            let day = days.get(&date).copied();
            if let Some(d) = day {
                week_pnl += d.pnl;
            }
            *cell = Some(CalendarCell {
                date,
                day: day.map(DaySummary::rounded),
            });
        }
        month_pnl += week_pnl;
        rows.push(CalendarRow {
            cells,
            week_pnl: round2(week_pnl),
        });
        match cursor.checked_add_signed(Duration::days(7)) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    Ok(MonthGrid {
        year,
        month,
        rows,
        month_pnl: round2(month_pnl),
    })
}
