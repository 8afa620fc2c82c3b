//! Legal state transitions for donations, requests, and matches.
//!
//! Every persisted transition is a guarded compare-and-swap: the UPDATE
//! carries the expected source status in its WHERE clause, so of two
//! concurrent callers only one commits and the other observes zero rows.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::{DonationStatus, MatchStatus, RequestStatus};
use crate::db::{bad_enum, DbPool};
use crate::error::AppError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DonationAction {
    Accept,
    Decline,
    Deliver,
}

impl DonationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            DonationAction::Accept => "accept",
            DonationAction::Decline => "decline",
            DonationAction::Deliver => "deliver",
        }
    }
}

impl fmt::Display for DonationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestAction {
    Accept,
    Decline,
    Fulfill,
}

impl RequestAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestAction::Accept => "accept",
            RequestAction::Decline => "decline",
            RequestAction::Fulfill => "fulfill",
        }
    }
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAction {
    Deliver,
    Cancel,
}

impl DonationStatus {
    /// Target status for the action, or None when the transition is illegal.
    /// `delivered` and `cancelled` are terminal.
    pub fn next(self, action: DonationAction) -> Option<DonationStatus> {
        match (self, action) {
            (DonationStatus::Pending, DonationAction::Accept) => Some(DonationStatus::Accepted),
            (DonationStatus::Pending, DonationAction::Decline) => Some(DonationStatus::Cancelled),
            (DonationStatus::Accepted, DonationAction::Deliver) => Some(DonationStatus::Delivered),
            _ => None,
        }
    }
}

impl RequestStatus {
    pub fn next(self, action: RequestAction) -> Option<RequestStatus> {
        match (self, action) {
            (RequestStatus::Pending, RequestAction::Accept) => Some(RequestStatus::Accepted),
            (RequestStatus::Pending, RequestAction::Decline) => Some(RequestStatus::Cancelled),
            (RequestStatus::Accepted, RequestAction::Fulfill) => Some(RequestStatus::Fulfilled),
            _ => None,
        }
    }
}

impl MatchStatus {
    pub fn next(self, action: MatchAction) -> Option<MatchStatus> {
        match (self, action) {
            (MatchStatus::Matched, MatchAction::Deliver) => Some(MatchStatus::Delivered),
            (MatchStatus::Matched, MatchAction::Cancel) => Some(MatchStatus::Cancelled),
            _ => None,
        }
    }
}

fn ensure_ngo(conn: &rusqlite::Connection, ngo_id: i64) -> Result<(), AppError> {
    let known = conn
        .query_row("SELECT 1 FROM ngos WHERE ngo_id = ?1", params![ngo_id], |_| Ok(()))
        .optional()?
        .is_some();
    if !known {
        return Err(AppError::Authorization(format!("ngo {ngo_id} is not registered")));
    }
    Ok(())
}

/// Applies an NGO action to a donation. On accept the acting NGO becomes the
/// donation's owner; on deliver the donation's open match is closed out too.
pub async fn transition_donation(
    pool: &DbPool,
    donation_id: i64,
    action: DonationAction,
    actor_ngo_id: i64,
) -> Result<DonationStatus, AppError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    ensure_ngo(&tx, actor_ngo_id)?;

    let current = tx
        .query_row(
            "SELECT status FROM donations WHERE donation_id = ?1",
            params![donation_id],
            |row| {
                let s: String = row.get(0)?;
                DonationStatus::parse(&s).ok_or_else(|| bad_enum(0, &s))
            },
        )
        .optional()?
        .ok_or(AppError::NotFound { entity: "donation", id: donation_id })?;

    let next = current.next(action).ok_or_else(|| AppError::InvalidState {
        entity: "donation",
        current: current.to_string(),
        action: action.to_string(),
    })?;

    let updated = match action {
        DonationAction::Accept => tx.execute(
            "UPDATE donations SET status = ?1, ngo_id = ?2 WHERE donation_id = ?3 AND status = ?4",
            params![next.as_str(), actor_ngo_id, donation_id, current.as_str()],
        )?,
        _ => tx.execute(
            "UPDATE donations SET status = ?1 WHERE donation_id = ?2 AND status = ?3",
            params![next.as_str(), donation_id, current.as_str()],
        )?,
    };
    if updated == 0 {
        return Err(AppError::InvalidState {
            entity: "donation",
            current: current.to_string(),
            action: action.to_string(),
        });
    }

    if action == DonationAction::Deliver {
        tx.execute(
            "UPDATE matches SET status = ?1, delivered_at = ?2 WHERE donation_id = ?3 AND status = ?4",
            params![
                MatchStatus::Delivered.as_str(),
                Utc::now(),
                donation_id,
                MatchStatus::Matched.as_str()
            ],
        )?;
    }

    tx.commit()?;
    Ok(next)
}

/// Applies an NGO action to a request.
pub async fn transition_request(
    pool: &DbPool,
    request_id: i64,
    action: RequestAction,
    actor_ngo_id: i64,
) -> Result<RequestStatus, AppError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    ensure_ngo(&tx, actor_ngo_id)?;

    let current = tx
        .query_row(
            "SELECT status FROM requests WHERE request_id = ?1",
            params![request_id],
            |row| {
                let s: String = row.get(0)?;
                RequestStatus::parse(&s).ok_or_else(|| bad_enum(0, &s))
            },
        )
        .optional()?
        .ok_or(AppError::NotFound { entity: "request", id: request_id })?;

    let next = current.next(action).ok_or_else(|| AppError::InvalidState {
        entity: "request",
        current: current.to_string(),
        action: action.to_string(),
    })?;

    let updated = match action {
        RequestAction::Accept => tx.execute(
            "UPDATE requests SET status = ?1, ngo_id = ?2 WHERE request_id = ?3 AND status = ?4",
            params![next.as_str(), actor_ngo_id, request_id, current.as_str()],
        )?,
        _ => tx.execute(
            "UPDATE requests SET status = ?1 WHERE request_id = ?2 AND status = ?3",
            params![next.as_str(), request_id, current.as_str()],
        )?,
    };
    if updated == 0 {
        return Err(AppError::InvalidState {
            entity: "request",
            current: current.to_string(),
            action: action.to_string(),
        });
    }

    tx.commit()?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn donation_machine_allows_only_legal_paths() {
        use DonationAction::*;
        use DonationStatus::*;

        assert_eq!(Pending.next(Accept), Some(Accepted));
        assert_eq!(Pending.next(Decline), Some(Cancelled));
        assert_eq!(Accepted.next(Deliver), Some(Delivered));

        assert_eq!(Pending.next(Deliver), None);
        assert_eq!(Accepted.next(Accept), None);
        assert_eq!(Accepted.next(Decline), None);
        for terminal in [Delivered, Cancelled] {
            for action in [Accept, Decline, Deliver] {
                assert_eq!(terminal.next(action), None, "{terminal} must be terminal");
            }
        }
    }

    #[test]
    fn request_machine_allows_only_legal_paths() {
        use RequestAction::*;
        use RequestStatus::*;

        assert_eq!(Pending.next(Accept), Some(Accepted));
        assert_eq!(Pending.next(Decline), Some(Cancelled));
        assert_eq!(Accepted.next(Fulfill), Some(Fulfilled));

        assert_eq!(Pending.next(Fulfill), None);
        assert_eq!(Accepted.next(Accept), None);
        for terminal in [Fulfilled, Cancelled] {
            for action in [Accept, Decline, Fulfill] {
                assert_eq!(terminal.next(action), None, "{terminal} must be terminal");
            }
        }
    }

    #[test]
    fn match_machine_is_terminal_after_either_outcome() {
        use MatchAction::*;
        use MatchStatus::*;

        assert_eq!(Matched.next(Deliver), Some(Delivered));
        assert_eq!(Matched.next(Cancel), Some(Cancelled));
        for terminal in [Delivered, Cancelled] {
            for action in [Deliver, Cancel] {
                assert_eq!(terminal.next(action), None);
            }
        }
    }
}
