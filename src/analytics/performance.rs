use chrono::{Datelike, Weekday};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::format::{round1, round2};
use crate::models::{Outcome, Session, TradeRecord};

/// Gross profit over gross loss, with sentinels for the degenerate cases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitFactor {
    /// Winners and no losers.
    Infinite,
    Value(f64),
}

impl ProfitFactor {
    pub fn as_f64(&self) -> f64 {
        match self {
            ProfitFactor::Infinite => f64::INFINITY,
            ProfitFactor::Value(v) => *v,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, ProfitFactor::Infinite)
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitFactor::Infinite => write!(f, "∞"),
            ProfitFactor::Value(v) => write!(f, "{:.2}", v),
        }
    }
}

impl Serialize for ProfitFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProfitFactor::Infinite => serializer.serialize_str("infinite"),
            ProfitFactor::Value(v) => serializer.serialize_f64(*v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    /// Percent, 1 dp.
    pub win_rate: f64,
    pub total_pnl: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub expectancy: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_risk_reward: f64,
    pub profit_factor: ProfitFactor,
}

const MIN_GROSS_LOSS: f64 = 0.01;

/// Fold records into summary statistics. Sums are taken unrounded and
/// rounded once for display.
pub fn summarize<'a, I>(records: I) -> PerformanceSummary
where
    I: IntoIterator<Item = &'a TradeRecord>,
{
    let mut total = 0usize;
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut breakeven = 0usize;
    let mut total_pnl = 0.0;
    let mut gross_profit = 0.0;
    let mut gross_loss = 0.0;
    let mut largest_win: Option<f64> = None;
    let mut largest_loss: Option<f64> = None;
    let mut rr_sum = 0.0;
    let mut rr_count = 0usize;

    for r in records {
        let pnl = r.net_pnl();
        total += 1;
        total_pnl += pnl;
        match r.outcome {
            Outcome::Win => {
                wins += 1;
                gross_profit += pnl;
                largest_win = Some(largest_win.map_or(pnl, |w| w.max(pnl)));
            }
            Outcome::Loss => {
                losses += 1;
                gross_loss += pnl.abs();
                largest_loss = Some(largest_loss.map_or(pnl, |l| l.min(pnl)));
            }
            Outcome::Breakeven => breakeven += 1,
        }
        if let Some(rr) = r.risk_reward.filter(|rr| rr.is_finite() && *rr > 0.0) {
            rr_sum += rr;
            rr_count += 1;
        }
    }

    // Losses that net to zero (unvalidated API data) count as one cent so
    // the ratio stays finite whenever a loss exists.
    let profit_factor = if wins == 0 {
        ProfitFactor::Value(0.0)
    } else if losses == 0 {
        ProfitFactor::Infinite
    } else {
        ProfitFactor::Value(round2(gross_profit / gross_loss.max(MIN_GROSS_LOSS)))
    };

    let ratio = |num: f64, den: usize| if den > 0 { num / den as f64 } else { 0.0 };

    PerformanceSummary {
        total,
        wins,
        losses,
        breakeven,
        win_rate: round1(ratio(wins as f64 * 100.0, total)),
        total_pnl: round2(total_pnl),
        gross_profit: round2(gross_profit),
        gross_loss: round2(gross_loss),
        avg_win: round2(ratio(gross_profit, wins)),
        avg_loss: round2(-ratio(gross_loss, losses)),
        expectancy: round2(ratio(total_pnl, total)),
        largest_win: round2(largest_win.unwrap_or(0.0)),
        largest_loss: round2(largest_loss.unwrap_or(0.0)),
        avg_risk_reward: round2(ratio(rr_sum, rr_count)),
        profit_factor,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats<K> {
    pub key: K,
    pub summary: PerformanceSummary,
}

/// Partition records by key. Every record lands in exactly one group.
pub fn group_by<'a, K, F>(records: &'a [TradeRecord], key_fn: F) -> BTreeMap<K, Vec<&'a TradeRecord>>
where
    K: Ord,
    F: Fn(&TradeRecord) -> K,
{
    let mut groups: BTreeMap<K, Vec<&TradeRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(key_fn(r)).or_default().push(r);
    }
    groups
}

/// Group then summarize each group, in key order.
pub fn breakdown<K, F>(records: &[TradeRecord], key_fn: F) -> Vec<GroupStats<K>>
where
    K: Ord + Clone,
    F: Fn(&TradeRecord) -> K,
{
    group_by(records, key_fn)
        .into_iter()
        .map(|(key, group)| GroupStats {
            summary: summarize(group),
            key,
        })
        .collect()
}

pub fn by_model(records: &[TradeRecord]) -> Vec<GroupStats<String>> {
    breakdown(records, |r| r.model_or_default().to_string())
}

pub fn by_session(records: &[TradeRecord]) -> Vec<GroupStats<Session>> {
    breakdown(records, |r| r.session)
}

pub fn by_instrument(records: &[TradeRecord]) -> Vec<GroupStats<String>> {
    breakdown(records, |r| r.instrument.clone())
}

/// Keyed by days from Monday so groups come out Monday..Sunday.
pub fn by_weekday(records: &[TradeRecord]) -> Vec<GroupStats<Weekday>> {
    breakdown(records, |r| r.timestamp.weekday().num_days_from_monday())
        .into_iter()
        .map(|g| GroupStats {
            key: weekday_from_index(g.key),
            summary: g.summary,
        })
        .collect()
}

fn weekday_from_index(i: u32) -> Weekday {
    match i {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streaks {
    pub longest_win: usize,
    pub longest_loss: usize,
    /// Positive for a running win streak, negative for losses.
    pub current: i64,
}

/// Consecutive outcomes in close-time order. A breakeven ends any streak.
pub fn streaks(records: &[TradeRecord]) -> Streaks {
    let mut ordered: Vec<&TradeRecord> = records.iter().collect();
    ordered.sort_by_key(|r| (r.timestamp, r.id));

    let mut s = Streaks::default();
    for r in ordered {
        s.current = match r.outcome {
            Outcome::Win if s.current > 0 => s.current + 1,
            Outcome::Win => 1,
            Outcome::Loss if s.current < 0 => s.current - 1,
            Outcome::Loss => -1,
            Outcome::Breakeven => 0,
        };
        if s.current > 0 {
            s.longest_win = s.longest_win.max(s.current as usize);
        } else if s.current < 0 {
            s.longest_loss = s.longest_loss.max(s.current.unsigned_abs() as usize);
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{record, record_at};

    #[test]
    fn reference_example() {
        let records = vec![
            record(1, "EURUSD", 100.0, Outcome::Win),
            record(2, "EURUSD", -50.0, Outcome::Loss),
            record(3, "EURUSD", 0.0, Outcome::Breakeven),
        ];
        let s = summarize(&records);
        assert_eq!(s.win_rate, 33.3);
        assert_eq!(s.total_pnl, 50.0);
        assert_eq!(s.profit_factor, ProfitFactor::Value(2.0));
        assert_eq!(s.wins + s.losses + s.breakeven, s.total);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let s = summarize(&Vec::<TradeRecord>::new());
        assert_eq!(s.total, 0);
        assert_eq!(s.win_rate, 0.0);
        assert_eq!(s.profit_factor, ProfitFactor::Value(0.0));
        assert_eq!(s.largest_win, 0.0);
        assert_eq!(s.largest_loss, 0.0);
    }

    #[test]
    fn no_losses_is_infinite() {
        let records = vec![
            record(1, "NAS100", 40.0, Outcome::Win),
            record(2, "NAS100", 0.0, Outcome::Breakeven),
        ];
        let s = summarize(&records);
        assert!(s.profit_factor.is_infinite());
        assert_eq!(s.profit_factor.to_string(), "∞");
    }

    #[test]
    fn zero_pnl_loss_keeps_factor_finite() {
        let records = vec![
            record(1, "EURUSD", 100.0, Outcome::Win),
            record(2, "EURUSD", 0.0, Outcome::Loss),
        ];
        let s = summarize(&records);
        assert_eq!(s.losses, 1);
        assert!(!s.profit_factor.is_infinite());
        assert_eq!(s.profit_factor, ProfitFactor::Value(10000.0));
    }

    #[test]
    fn no_wins_is_zero() {
        let records = vec![
            record(1, "XAUUSD", -20.0, Outcome::Loss),
            record(2, "XAUUSD", -30.0, Outcome::Loss),
        ];
        let s = summarize(&records);
        assert_eq!(s.profit_factor, ProfitFactor::Value(0.0));
        assert_eq!(s.largest_loss, -30.0);
        assert_eq!(s.avg_loss, -25.0);
    }

    #[test]
    fn net_pnl_includes_costs() {
        let mut r = record(1, "EURUSD", 100.0, Outcome::Win);
        r.commission = -7.0;
        r.swap = -0.5;
        let s = summarize(std::slice::from_ref(&r));
        assert_eq!(s.total_pnl, 92.5);
        assert_eq!(s.largest_win, 92.5);
    }

    #[test]
    fn avg_risk_reward_skips_undefined_and_non_positive() {
        let mut a = record(1, "EURUSD", 10.0, Outcome::Win);
        a.risk_reward = Some(3.0);
        let mut b = record(2, "EURUSD", 10.0, Outcome::Win);
        b.risk_reward = Some(1.0);
        let mut c = record(3, "EURUSD", -10.0, Outcome::Loss);
        c.risk_reward = Some(0.0);
        let mut d = record(4, "EURUSD", -10.0, Outcome::Loss);
        d.risk_reward = None;
        let s = summarize(&[a, b, c, d]);
        assert_eq!(s.avg_risk_reward, 2.0);
    }

    #[test]
    fn groups_partition_total_pnl() {
        let mut records = vec![
            record(1, "EURUSD", 120.0, Outcome::Win),
            record(2, "GBPUSD", -45.5, Outcome::Loss),
            record(3, "EURUSD", -30.25, Outcome::Loss),
            record(4, "XAUUSD", 88.0, Outcome::Win),
        ];
        records[0].model = Some("silver bullet".into());
        records[1].model = Some("silver bullet".into());

        let total = summarize(&records).total_pnl;
        for groups in [by_instrument(&records), by_model(&records)] {
            let sum: f64 = groups.iter().map(|g| g.summary.total_pnl).sum();
            let count: usize = groups.iter().map(|g| g.summary.total).sum();
            assert!((sum - total).abs() < 1e-9);
            assert_eq!(count, records.len());
        }

        let models = by_model(&records);
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].key, "silver bullet");
        assert_eq!(models[1].key, "unassigned");
    }

    #[test]
    fn weekday_groups_ordered_from_monday() {
        let records = vec![
            record_at(1, "2024-01-19T10:00:00Z", 10.0, Outcome::Win), // Fri
            record_at(2, "2024-01-15T10:00:00Z", -5.0, Outcome::Loss), // Mon
            record_at(3, "2024-01-17T10:00:00Z", 7.0, Outcome::Win),  // Wed
        ];
        let keys: Vec<Weekday> = by_weekday(&records).into_iter().map(|g| g.key).collect();
        assert_eq!(keys, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
    }

    #[test]
    fn streaks_follow_close_time() {
        let records = vec![
            record_at(1, "2024-01-15T10:00:00Z", 10.0, Outcome::Win),
            record_at(2, "2024-01-15T11:00:00Z", 10.0, Outcome::Win),
            record_at(3, "2024-01-15T12:00:00Z", 10.0, Outcome::Win),
            record_at(4, "2024-01-15T13:00:00Z", 0.0, Outcome::Breakeven),
            record_at(5, "2024-01-16T10:00:00Z", -5.0, Outcome::Loss),
            record_at(6, "2024-01-16T11:00:00Z", -5.0, Outcome::Loss),
        ];
        let mut shuffled = records.clone();
        shuffled.reverse();
        let s = streaks(&shuffled);
        assert_eq!(s.longest_win, 3);
        assert_eq!(s.longest_loss, 2);
        assert_eq!(s.current, -2);
    }
}
