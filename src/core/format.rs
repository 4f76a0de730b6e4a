//! Display policy: P&L to 2 decimal places, percentages to 1.

use thiserror::Error;

use crate::models::DisplayMode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("empty value")]
    Empty,
    #[error("'{0}' is not a currency amount")]
    BadCurrency(String),
    #[error("'{0}' is not a percentage")]
    BadPercent(String),
}

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `$1,234.50`, `-$50.00`.
pub fn format_currency(value: f64) -> String {
    let rounded = round2(value);
    let sign = if rounded < 0.0 { "-" } else { "" };
    let cents = (rounded.abs() * 100.0).round() as u64;
    format!(
        "{}${}.{:02}",
        sign,
        group_thousands(cents / 100),
        cents % 100
    )
}

/// Same as [`format_currency`] but always carries a sign.
pub fn format_signed_currency(value: f64) -> String {
    if round2(value) > 0.0 {
        format!("+{}", format_currency(value))
    } else {
        format_currency(value)
    }
}

pub fn format_percent(value: f64) -> String {
    let rounded = round1(value);
    // Avoid "-0.0%"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.1}%", rounded)
}

/// Render a P&L figure in the user's preferred mode.
pub fn format_pnl(value: f64, mode: DisplayMode, account_size: f64) -> String {
    match mode {
        DisplayMode::Currency => format_signed_currency(value),
        DisplayMode::Percentage => {
            let pct = if account_size > 0.0 {
                value / account_size * 100.0
            } else {
                0.0
            };
            let s = format_percent(pct);
            if round1(pct) > 0.0 {
                format!("+{}", s)
            } else {
                s
            }
        }
    }
}

pub fn parse_currency(s: &str) -> Result<f64, FormatError> {
    let t = s.trim();
    if t.is_empty() {
        return Err(FormatError::Empty);
    }
    let (negative, rest) = match t.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let digits: String = rest
        .strip_prefix('$')
        .unwrap_or(rest)
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let value: f64 = digits
        .parse()
        .map_err(|_| FormatError::BadCurrency(s.to_string()))?;
    Ok(if negative { -value } else { value })
}

pub fn parse_percent(s: &str) -> Result<f64, FormatError> {
    let t = s.trim();
    if t.is_empty() {
        return Err(FormatError::Empty);
    }
    let body = t
        .strip_suffix('%')
        .ok_or_else(|| FormatError::BadPercent(s.to_string()))?;
    body.trim_start_matches('+')
        .trim()
        .parse()
        .map_err(|_| FormatError::BadPercent(s.to_string()))
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
