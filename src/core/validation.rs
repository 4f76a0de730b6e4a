//! Submission-time checks for record drafts.
//!
//! Validation collects every problem in one pass so a form can mark all
//! offending fields at once. On success the draft is normalised and the
//! derived fields (outcome, session, risk:reward) are filled in.

use crate::core::format::round2;
use crate::core::sessions::SessionClassifier;
use crate::error::ValidationErrors;
use crate::models::{Direction, Outcome, RecordDraft, ValidRecord};

impl RecordDraft {
    pub fn validate(&self, sessions: &SessionClassifier) -> Result<ValidRecord, ValidationErrors> {
        let mut errs = ValidationErrors::default();

        if self.kind.is_none() {
            errs.push("kind", "required");
        }

        let instrument = self
            .instrument
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_default();
        if instrument.is_empty() {
            errs.push("instrument", "required");
        }

        if self.direction.is_none() {
            errs.push("direction", "required");
        }

        match self.pnl {
            None => errs.push("pnl", "required"),
            Some(p) if !p.is_finite() => errs.push("pnl", "must be a finite number"),
            _ => {}
        }

        check_price(&mut errs, "entry_price", self.entry_price);
        check_price(&mut errs, "exit_price", self.exit_price);
        check_price(&mut errs, "stop_loss", self.stop_loss);
        check_finite(&mut errs, "commission", self.commission);
        check_finite(&mut errs, "swap", self.swap);

        if let Some(rr) = self.risk_reward {
            if !rr.is_finite() || rr < 0.0 {
                errs.push("risk_reward", "must be zero or positive");
            }
        }

        if let (Some(dir), Some(entry), Some(stop)) =
            (self.direction, self.entry_price, self.stop_loss)
        {
            let wrong_side = match dir {
                Direction::Buy => stop >= entry,
                Direction::Sell => stop <= entry,
            };
            if wrong_side && entry > 0.0 && stop > 0.0 {
                errs.push(
                    "stop_loss",
                    format!("must be {} entry for a {}", below_above(dir), dir),
                );
            }
        }

        if self.timestamp.is_none() {
            errs.push("timestamp", "required");
        }

        let commission = self.commission.unwrap_or(0.0);
        let swap = self.swap.unwrap_or(0.0);
        let net = self.pnl.unwrap_or(0.0) + commission + swap;

        if let Some(outcome) = self.outcome {
            if self.pnl.is_some() {
                match outcome {
                    Outcome::Win if net <= 0.0 => {
                        errs.push("outcome", "win requires a positive net P&L")
                    }
                    Outcome::Loss if net >= 0.0 => {
                        errs.push("outcome", "loss requires a negative net P&L")
                    }
                    _ => {}
                }
            }
        }

        if !errs.is_empty() {
            return Err(errs);
        }

        // All required fields checked above.
        let (Some(kind), Some(direction), Some(pnl), Some(timestamp)) =
            (self.kind, self.direction, self.pnl, self.timestamp)
        else {
            return Err(errs);
        };

        let risk_reward = self.risk_reward.or_else(|| {
            derive_risk_reward(self.entry_price, self.exit_price, self.stop_loss)
        });

        Ok(ValidRecord {
            kind,
            instrument,
            direction,
            entry_price: self.entry_price,
            exit_price: self.exit_price,
            stop_loss: self.stop_loss,
            pnl,
            commission,
            swap,
            outcome: self.outcome.unwrap_or_else(|| Outcome::from_pnl(net)),
            risk_reward,
            session: self
                .session
                .unwrap_or_else(|| sessions.classify(timestamp)),
            model: self
                .model
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            timestamp,
            tags: normalize_tags(&self.tags),
            notes: self.notes.clone().unwrap_or_default(),
            images: self
                .images
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}

fn check_price(errs: &mut ValidationErrors, field: &'static str, value: Option<f64>) {
    if let Some(v) = value {
        if !v.is_finite() || v <= 0.0 {
            errs.push(field, "must be a positive number");
        }
    }
}

fn check_finite(errs: &mut ValidationErrors, field: &'static str, value: Option<f64>) {
    if let Some(v) = value {
        if !v.is_finite() {
            errs.push(field, "must be a finite number");
        }
    }
}

fn below_above(dir: Direction) -> &'static str {
    match dir {
        Direction::Buy => "below",
        Direction::Sell => "above",
    }
}

/// Reward distance over risk distance, both measured from entry.
pub fn derive_risk_reward(
    entry: Option<f64>,
    exit: Option<f64>,
    stop: Option<f64>,
) -> Option<f64> {
    let (entry, exit, stop) = (entry?, exit?, stop?);
    let risk = (entry - stop).abs();
    if risk == 0.0 {
        return None;
    }
    Some(round2((exit - entry).abs() / risk))
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let t = tag.trim();
        if !t.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(t)) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_sessions;
    use crate::models::{RecordKind, Session};
    use crate::test_helpers::{at, complete_draft};

    fn classifier() -> SessionClassifier {
        SessionClassifier::new(&default_sessions())
    }

    #[test]
    fn complete_draft_is_accepted() {
        let valid = complete_draft().validate(&classifier()).unwrap();
        assert_eq!(valid.instrument, "EURUSD");
        assert_eq!(valid.kind, RecordKind::Trade);
        assert_eq!(valid.outcome, Outcome::Win);
    }

    #[test]
    fn empty_draft_reports_every_required_field() {
        let errs = RecordDraft::default().validate(&classifier()).unwrap_err();
        for field in ["kind", "instrument", "direction", "pnl", "timestamp"] {
            assert!(errs.has(field), "missing error for {}", field);
        }
        assert_eq!(errs.errors.len(), 5);
    }

    #[test]
    fn blank_instrument_is_rejected() {
        let mut draft = complete_draft();
        draft.instrument = Some("   ".to_string());
        let errs = draft.validate(&classifier()).unwrap_err();
        assert!(errs.has("instrument"));
    }

    #[test]
    fn non_positive_prices_are_rejected() {
        let mut draft = complete_draft();
        draft.entry_price = Some(0.0);
        draft.exit_price = Some(-1.0);
        let errs = draft.validate(&classifier()).unwrap_err();
        assert!(errs.has("entry_price"));
        assert!(errs.has("exit_price"));
    }

    #[test]
    fn stop_must_sit_on_losing_side() {
        let mut draft = complete_draft();
        draft.stop_loss = Some(1.1050);
        let errs = draft.validate(&classifier()).unwrap_err();
        assert!(errs.has("stop_loss"));

        draft.direction = Some(Direction::Sell);
        draft.exit_price = Some(1.0950);
        assert!(draft.validate(&classifier()).is_ok());
    }

    #[test]
    fn outcome_must_agree_with_net_pnl() {
        let mut draft = complete_draft();
        draft.outcome = Some(Outcome::Loss);
        let errs = draft.validate(&classifier()).unwrap_err();
        assert!(errs.has("outcome"));

        // Commission pushes a tiny gross win below zero.
        draft.pnl = Some(3.0);
        draft.commission = Some(-5.0);
        assert!(draft.validate(&classifier()).is_ok());
    }

    #[test]
    fn outcome_derived_when_missing() {
        let mut draft = complete_draft();
        draft.outcome = None;
        draft.pnl = Some(0.0);
        draft.commission = None;
        let valid = draft.validate(&classifier()).unwrap();
        assert_eq!(valid.outcome, Outcome::Breakeven);
    }

    #[test]
    fn risk_reward_derived_from_prices() {
        let mut draft = complete_draft();
        draft.risk_reward = None;
        let valid = draft.validate(&classifier()).unwrap();
        // entry 1.1000, exit 1.1100, stop 1.0950 -> 100 / 50 pips
        assert_eq!(valid.risk_reward, Some(2.0));
    }

    #[test]
    fn session_classified_from_timestamp() {
        let mut draft = complete_draft();
        draft.session = None;
        // 08:00 UTC in January is 03:00 ET
        draft.timestamp = Some(at("2024-01-15T08:00:00Z"));
        let valid = draft.validate(&classifier()).unwrap();
        assert_eq!(valid.session, Session::London);
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let mut draft = complete_draft();
        draft.tags = vec![" fvg ".into(), "FVG".into(), "".into(), "news".into()];
        let valid = draft.validate(&classifier()).unwrap();
        assert_eq!(valid.tags, vec!["fvg".to_string(), "news".to_string()]);
    }

    #[test]
    fn zero_risk_has_no_ratio() {
        assert_eq!(derive_risk_reward(Some(1.0), Some(2.0), Some(1.0)), None);
        assert_eq!(derive_risk_reward(Some(1.0), None, Some(0.5)), None);
    }
}
