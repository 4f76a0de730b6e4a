use chrono::{DateTime, Timelike, Utc};
use chrono_tz::US::Eastern;
use std::collections::HashMap;

use crate::config::SessionTime;
use crate::models::Session;

/// Maps a close timestamp onto the trading session it fell in.
pub struct SessionClassifier {
    windows: Vec<(Session, u32, u32)>,
}

impl SessionClassifier {
    pub fn new(sessions: &HashMap<Session, SessionTime>) -> Self {
        let mut windows: Vec<(Session, u32, u32)> = sessions
            .iter()
            .map(|(session, times)| {
                (
                    *session,
                    times.start.0 * 60 + times.start.1,
                    times.end.0 * 60 + times.end.1,
                )
            })
            .collect();
        // HashMap order is arbitrary; overlapping windows resolve in session order.
        windows.sort_by_key(|(s, _, _)| *s);
        Self { windows }
    }

    pub fn classify(&self, utc: DateTime<Utc>) -> Session {
        let et = utc.with_timezone(&Eastern);
        let current = et.hour() * 60 + et.minute();

        for &(session, start_min, end_min) in &self.windows {
            let in_session = if start_min < end_min {
                current >= start_min && current < end_min
            } else {
                // Wraps midnight (e.g. Asian session 20:00 - 00:00)
                current >= start_min || current < end_min
            };
            if in_session {
                return session;
            }
        }
        Session::OffSession
    }
}
