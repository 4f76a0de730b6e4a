use chrono::Weekday;
use serde::Serialize;
use std::fmt::Display;

use crate::analytics::calendar::{self, MonthGrid, MonthSummary};
use crate::analytics::drawdown::{self, DrawdownReport, PropFirmRules};
use crate::analytics::performance::{
    self, by_instrument, by_model, by_session, by_weekday, GroupStats, PerformanceSummary,
    Streaks,
};
use crate::core::format::{format_percent, format_pnl};
use crate::models::{DisplayMode, Session, TradeRecord};

#[derive(Debug, Clone, Serialize)]
pub struct JournalReport {
    pub summary: PerformanceSummary,
    pub streaks: Streaks,
    pub by_model: Vec<GroupStats<String>>,
    pub by_session: Vec<GroupStats<Session>>,
    pub by_instrument: Vec<GroupStats<String>>,
    pub by_weekday: Vec<GroupStats<Weekday>>,
    pub months: Vec<MonthSummary>,
    pub drawdown: DrawdownReport,
}

impl JournalReport {
    pub fn build(records: &[TradeRecord], rules: &PropFirmRules) -> Self {
        Self {
            summary: performance::summarize(records),
            streaks: performance::streaks(records),
            by_model: by_model(records),
            by_session: by_session(records),
            by_instrument: by_instrument(records),
            by_weekday: by_weekday(records),
            months: calendar::monthly(records),
            drawdown: drawdown::evaluate(records, rules),
        }
    }

    pub fn print_summary(&self, mode: DisplayMode) {
        let acct = self.drawdown.rules.account_size;
        let pnl = |v: f64| format_pnl(v, mode, acct);
        let s = &self.summary;

        println!("\n{}", "=".repeat(70));
        println!("  JOURNAL REPORT");
        println!("{}", "=".repeat(70));
        println!();
        println!("  PERFORMANCE");
        println!("  ───────────────────────────────────");
        println!("  Records:     {}", s.total);
        println!(
            "  W / L / BE:  {} / {} / {}",
            s.wins, s.losses, s.breakeven
        );
        println!("  Win Rate:    {}", format_percent(s.win_rate));
        println!("  Net P&L:     {}", pnl(s.total_pnl));
        println!("  Avg Win:     {}", pnl(s.avg_win));
        println!("  Avg Loss:    {}", pnl(s.avg_loss));
        println!("  Largest Win: {}", pnl(s.largest_win));
        println!("  Largest Loss:{}", pnl(s.largest_loss));
        println!("  Expectancy:  {}", pnl(s.expectancy));
        println!("  Avg R:R:     {:.2}", s.avg_risk_reward);
        println!("  Profit Factor: {}", s.profit_factor);
        println!();
        println!("  STREAKS");
        println!("  ───────────────────────────────────");
        println!("  Longest Win:  {}", self.streaks.longest_win);
        println!("  Longest Loss: {}", self.streaks.longest_loss);
        println!("  Current:      {:+}", self.streaks.current);

        print_groups("BY MODEL", &self.by_model, &pnl);
        print_groups("BY SESSION", &self.by_session, &pnl);
        print_groups("BY INSTRUMENT", &self.by_instrument, &pnl);
        print_groups("BY WEEKDAY", &self.by_weekday, &pnl);

        if !self.months.is_empty() {
            println!();
            println!("  BY MONTH");
            println!("  ───────────────────────────────────");
            for m in &self.months {
                println!(
                    "  {}-{:02}: {} trades | {} green / {} red days | P&L {}",
                    m.year,
                    m.month,
                    m.trades,
                    m.green_days,
                    m.red_days,
                    pnl(m.pnl)
                );
            }
        }

        print_drawdown(&self.drawdown);
        println!("{}", "=".repeat(70));
    }
}

fn print_groups<K: Display>(title: &str, groups: &[GroupStats<K>], pnl: &dyn Fn(f64) -> String) {
    if groups.is_empty() {
        return;
    }
    println!();
    println!("  {}", title);
    println!("  ───────────────────────────────────");
    for g in groups {
        println!(
            "  {:>14}: {} trades | WR {} | PnL {} | PF {}",
            g.key.to_string(),
            g.summary.total,
            format_percent(g.summary.win_rate),
            pnl(g.summary.total_pnl),
            g.summary.profit_factor
        );
    }
}

pub fn print_drawdown(report: &DrawdownReport) {
    let rules = &report.rules;
    println!();
    println!("  PROP-FIRM RULES");
    println!("  ───────────────────────────────────");
    println!(
        "  Account:     ${:.2} | Daily limit ${:.2} ({}%) | Max ${:.2} ({}%, {:?})",
        rules.account_size,
        rules.daily_limit(),
        rules.daily_drawdown_pct,
        rules.max_limit(),
        rules.max_drawdown_pct,
        rules.max_drawdown_type
    );
    for d in report.daily_violations() {
        println!(
            "  !!! {} lost ${:.2}, over the daily limit by ${:.2}",
            d.date, d.day_loss, d.excess
        );
    }
    println!(
        "  Lowest Balance: ${:.2} | Drawdown Used: ${:.2}",
        report.lowest_balance, report.max_drawdown_used
    );
    if report.max_drawdown_breached {
        println!("  !!! MAX DRAWDOWN LIMIT EXCEEDED !!!");
    }
    println!(
        "  Verdict:     {}",
        if report.passed() {
            "NO VIOLATIONS FOUND"
        } else {
            "VIOLATION DETECTED"
        }
    );
}

/// Text calendar: one row per week, Monday first, weekly P&L on the right.
pub fn render_month(grid: &MonthGrid, mode: DisplayMode, account_size: f64) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}-{:02}\n", grid.year, grid.month));
    out.push_str(&format!(
        "{:>10}{:>10}{:>10}{:>10}{:>10}{:>10}{:>10} | {:>10}\n",
        "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun", "Week"
    ));
    for row in &grid.rows {
        let mut dates = String::new();
        let mut values = String::new();
        for cell in &row.cells {
            match cell {
                Some(c) => {
                    dates.push_str(&format!("{:>10}", c.date.format("%d")));
                    let v = c
                        .day
                        .map(|d| format_pnl(d.pnl, mode, account_size))
                        .unwrap_or_else(|| "·".to_string());
                    values.push_str(&format!("{:>10}", v));
                }
                None => {
                    dates.push_str(&" ".repeat(10));
                    values.push_str(&" ".repeat(10));
                }
            }
        }
        out.push_str(&format!("{} |\n", dates));
        out.push_str(&format!(
            "{} | {:>10}\n",
            values,
            format_pnl(row.week_pnl, mode, account_size)
        ));
    }
    out.push_str(&format!(
        "Month: {}\n",
        format_pnl(grid.month_pnl, mode, account_size)
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;
    use crate::test_helpers::record_at;

    #[test]
    fn report_collects_every_view() {
        let records = vec![
            record_at(1, "2024-01-15T09:00:00Z", 100.0, Outcome::Win),
            record_at(2, "2024-01-16T09:00:00Z", -50.0, Outcome::Loss),
        ];
        let report = JournalReport::build(&records, &PropFirmRules::default());
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.by_weekday.len(), 2);
        assert_eq!(report.months.len(), 1);
        assert!(report.drawdown.passed());
    }

    #[test]
    fn month_rendering_marks_weeks_and_totals() {
        let records = vec![record_at(1, "2024-02-01T10:00:00Z", 10.0, Outcome::Win)];
        let grid = calendar::month_grid(&records, 2024, 2).unwrap();
        let text = render_month(&grid, DisplayMode::Currency, 5000.0);
        assert!(text.starts_with("2024-02\n"));
        assert!(text.contains("+$10.00"));
        assert!(text.trim_end().ends_with("Month: +$10.00"));
        // header + two lines per week + month total
        assert_eq!(text.lines().count(), 2 + grid.rows.len() * 2 + 1);
    }
}
