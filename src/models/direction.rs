use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "long" => Ok(Direction::Buy),
            "sell" | "short" => Ok(Direction::Sell),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Breakeven => write!(f, "breakeven"),
        }
    }
}

impl Outcome {
    /// Outcome implied by the sign of a net P&L.
    pub fn from_pnl(net_pnl: f64) -> Self {
        if net_pnl > 0.0 {
            Outcome::Win
        } else if net_pnl < 0.0 {
            Outcome::Loss
        } else {
            Outcome::Breakeven
        }
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "win" => Ok(Outcome::Win),
            "loss" => Ok(Outcome::Loss),
            "breakeven" | "be" => Ok(Outcome::Breakeven),
            other => Err(format!("unknown outcome '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    Asian,
    London,
    NewYork,
    OffSession,
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Session {
    pub const ALL: [Session; 4] = [
        Session::Asian,
        Session::London,
        Session::NewYork,
        Session::OffSession,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Session::Asian => "asian",
            Session::London => "london",
            Session::NewYork => "new_york",
            Session::OffSession => "off_session",
        }
    }
}

impl FromStr for Session {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "asian" | "asia" => Ok(Session::Asian),
            "london" => Ok(Session::London),
            "new_york" | "newyork" | "ny" => Ok(Session::NewYork),
            "off_session" | "off" => Ok(Session::OffSession),
            other => Err(format!("unknown session '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Trade,
    Backtest,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Trade => "trade",
            RecordKind::Backtest => "backtest",
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trade" => Ok(RecordKind::Trade),
            "backtest" => Ok(RecordKind::Backtest),
            other => Err(format!("unknown record kind '{}'", other)),
        }
    }
}

/// How P&L figures are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Currency,
    Percentage,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Currency => write!(f, "currency"),
            DisplayMode::Percentage => write!(f, "percentage"),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "currency" | "$" => Ok(DisplayMode::Currency),
            "percentage" | "percent" | "%" => Ok(DisplayMode::Percentage),
            other => Err(format!("unknown display mode '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_pnl_sign() {
        assert_eq!(Outcome::from_pnl(12.5), Outcome::Win);
        assert_eq!(Outcome::from_pnl(-0.01), Outcome::Loss);
        assert_eq!(Outcome::from_pnl(0.0), Outcome::Breakeven);
    }

    #[test]
    fn parses_loose_spellings() {
        assert_eq!("LONG".parse::<Direction>().unwrap(), Direction::Buy);
        assert_eq!("New York".parse::<Session>().unwrap(), Session::NewYork);
        assert_eq!("be".parse::<Outcome>().unwrap(), Outcome::Breakeven);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn session_serializes_snake_case() {
        let json = serde_json::to_string(&Session::NewYork).unwrap();
        assert_eq!(json, "\"new_york\"");
    }
}
