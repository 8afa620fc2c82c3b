//! The matching engine: assign a pending donation to an NGO in the donor's
//! city, linking a compatible pending request when one exists.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::Serialize;

use crate::db::models::{DonationStatus, MatchStatus, RequestStatus};
use crate::db::{bad_enum, DbPool};
use crate::error::AppError;

#[derive(Serialize, Debug, Clone)]
pub struct MatchOutcome {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ngo_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
}

impl MatchOutcome {
    fn unmatched() -> Self {
        MatchOutcome { matched: false, ngo_id: None, match_id: None, request_id: None }
    }
}

/// Matches a pending donation to the NGO in the donor's city with the lowest
/// identifier. The sort key is explicit; registration order is irrelevant.
///
/// The no-candidate path performs zero writes. On success the donation flips
/// to accepted, a compatible pending request (same category, most urgent
/// first, then lowest id) is accepted alongside it when one exists, and the
/// authoritative match row is inserted, all in one transaction.
pub async fn match_donation(pool: &DbPool, donation_id: i64) -> Result<MatchOutcome, AppError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let (status, category, donor_city) = tx
        .query_row(
            "SELECT d.status, d.category, donors.city \
             FROM donations d JOIN donors ON donors.donor_id = d.donor_id \
             WHERE d.donation_id = ?1",
            params![donation_id],
            |row| {
                let status: String = row.get(0)?;
                let status = DonationStatus::parse(&status).ok_or_else(|| bad_enum(0, &status))?;
                Ok((status, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            },
        )
        .optional()?
        .ok_or(AppError::NotFound { entity: "donation", id: donation_id })?;

    if status != DonationStatus::Pending {
        return Err(AppError::InvalidState {
            entity: "donation",
            current: status.to_string(),
            action: "match".to_string(),
        });
    }

    let ngo_id: Option<i64> = tx
        .query_row(
            "SELECT ngo_id FROM ngos WHERE city = ?1 ORDER BY ngo_id LIMIT 1",
            params![donor_city],
            |row| row.get(0),
        )
        .optional()?;
    let Some(ngo_id) = ngo_id else {
        return Ok(MatchOutcome::unmatched());
    };

    let candidate_request: Option<i64> = tx
        .query_row(
            "SELECT request_id FROM requests WHERE status = ?1 AND category = ?2 \
             ORDER BY CASE urgency \
                 WHEN 'critical' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 \
             END, request_id \
             LIMIT 1",
            params![RequestStatus::Pending.as_str(), category],
            |row| row.get(0),
        )
        .optional()?;

    let updated = tx.execute(
        "UPDATE donations SET ngo_id = ?1, status = ?2 WHERE donation_id = ?3 AND status = ?4",
        params![
            ngo_id,
            DonationStatus::Accepted.as_str(),
            donation_id,
            DonationStatus::Pending.as_str()
        ],
    )?;
    if updated == 0 {
        // A concurrent matcher or NGO action won the row.
        return Err(AppError::InvalidState {
            entity: "donation",
            current: DonationStatus::Pending.to_string(),
            action: "match".to_string(),
        });
    }

    let linked_request = match candidate_request {
        Some(request_id) => {
            let linked = tx.execute(
                "UPDATE requests SET status = ?1, ngo_id = ?2 WHERE request_id = ?3 AND status = ?4",
                params![
                    RequestStatus::Accepted.as_str(),
                    ngo_id,
                    request_id,
                    RequestStatus::Pending.as_str()
                ],
            )?;
            (linked == 1).then_some(request_id)
        }
        None => None,
    };

    tx.execute(
        "INSERT INTO matches (donation_id, request_id, ngo_id, status, matched_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![donation_id, linked_request, ngo_id, MatchStatus::Matched.as_str(), Utc::now()],
    )?;
    let match_id = tx.last_insert_rowid();

    tx.commit()?;
    Ok(MatchOutcome {
        matched: true,
        ngo_id: Some(ngo_id),
        match_id: Some(match_id),
        request_id: linked_request,
    })
}
