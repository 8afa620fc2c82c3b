use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::env;

pub mod models;

use crate::error::AppError;
use crate::validate;
use models::{
    Donation, DonationStatus, Donor, Feedback, Match, MatchStatus, Ngo, Recipient, Request,
    RequestStatus, Urgency,
};

pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = include_str!("../../migrations/init.sql");

pub async fn init_pool() -> anyhow::Result<DbPool> {
    let url = env::var("DATABASE_URL").unwrap_or_else(|_| "givebridge.db".to_string());
    init_pool_at(&url)
}

/// Opens a pool against the given SQLite path or URI and applies the schema.
/// URI filenames are enabled so tests can use shared in-memory databases.
pub fn init_pool_at(url: &str) -> anyhow::Result<DbPool> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let manager = SqliteConnectionManager::file(url).with_flags(flags).with_init(|conn| {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)
    });
    // One connection is established up front; it applies the schema and, for
    // shared in-memory databases, keeps the database alive.
    let pool = Pool::builder()
        .max_size(10)
        .min_idle(Some(1))
        .connection_timeout(std::time::Duration::from_secs(60))
        .build(manager)
        .map_err(|e| anyhow::anyhow!("Failed to create DB pool: {}", e))?;
    Ok(pool)
}

pub(crate) fn bad_enum(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unrecognized value: {value}").into(),
    )
}

fn row_exists(conn: &Connection, sql: &str, id: i64) -> Result<bool, rusqlite::Error> {
    conn.query_row(sql, params![id], |_| Ok(())).optional().map(|o| o.is_some())
}

/// UNIQUE(email) violations surface as a validation failure, everything else
/// stays a database error.
fn map_unique_email(err: rusqlite::Error) -> AppError {
    if let rusqlite::Error::SqliteFailure(ref e, _) = err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            return AppError::Validation {
                field: "email",
                constraint: "already registered".to_string(),
            };
        }
    }
    AppError::Database(err)
}

// ---- donors ----

const DONOR_COLS: &str = "donor_id, name, email, phone, address, city, state, pincode";

fn donor_from_row(row: &Row) -> rusqlite::Result<Donor> {
    Ok(Donor {
        donor_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        city: row.get(5)?,
        state: row.get(6)?,
        pincode: row.get(7)?,
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn create_donor(
    pool: &DbPool,
    name: &str,
    email: &str,
    phone: &str,
    address: &str,
    city: &str,
    state: &str,
    pincode: &str,
) -> Result<i64, AppError> {
    validate::email(email)?;
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO donors (name, email, phone, address, city, state, pincode) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![name, email, phone, address, city, state, pincode],
    )
    .map_err(map_unique_email)?;
    Ok(conn.last_insert_rowid())
}

pub async fn get_donor(pool: &DbPool, donor_id: i64) -> Result<Option<Donor>, AppError> {
    let conn = pool.get()?;
    let donor = conn
        .query_row(
            &format!("SELECT {DONOR_COLS} FROM donors WHERE donor_id = ?1"),
            params![donor_id],
            donor_from_row,
        )
        .optional()?;
    Ok(donor)
}

pub async fn list_donors(pool: &DbPool) -> Result<Vec<Donor>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!("SELECT {DONOR_COLS} FROM donors ORDER BY donor_id"))?;
    let rows = stmt.query_map([], donor_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// ---- recipients ----

const RECIPIENT_COLS: &str =
    "recipient_id, name, email, phone, family_size, urgency, address, city, state, pincode";

fn recipient_from_row(row: &Row) -> rusqlite::Result<Recipient> {
    let urgency: String = row.get(5)?;
    Ok(Recipient {
        recipient_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        family_size: row.get(4)?,
        urgency: Urgency::parse(&urgency).ok_or_else(|| bad_enum(5, &urgency))?,
        address: row.get(6)?,
        city: row.get(7)?,
        state: row.get(8)?,
        pincode: row.get(9)?,
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn create_recipient(
    pool: &DbPool,
    name: &str,
    email: &str,
    phone: &str,
    family_size: i64,
    urgency: Urgency,
    address: &str,
    city: &str,
    state: &str,
    pincode: &str,
) -> Result<i64, AppError> {
    validate::email(email)?;
    validate::family_size(family_size)?;
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO recipients (name, email, phone, family_size, urgency, address, city, state, pincode) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![name, email, phone, family_size, urgency.as_str(), address, city, state, pincode],
    )
    .map_err(map_unique_email)?;
    Ok(conn.last_insert_rowid())
}

pub async fn list_recipients(pool: &DbPool) -> Result<Vec<Recipient>, AppError> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare(&format!("SELECT {RECIPIENT_COLS} FROM recipients ORDER BY recipient_id"))?;
    let rows = stmt.query_map([], recipient_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// ---- ngos ----

const NGO_COLS: &str = "ngo_id, name, email, phone, website, address, city, state, pincode";

fn ngo_from_row(row: &Row) -> rusqlite::Result<Ngo> {
    Ok(Ngo {
        ngo_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        website: row.get(4)?,
        address: row.get(5)?,
        city: row.get(6)?,
        state: row.get(7)?,
        pincode: row.get(8)?,
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn create_ngo(
    pool: &DbPool,
    name: &str,
    email: &str,
    phone: &str,
    website: &str,
    address: &str,
    city: &str,
    state: &str,
    pincode: &str,
) -> Result<i64, AppError> {
    validate::email(email)?;
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO ngos (name, email, phone, website, address, city, state, pincode) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![name, email, phone, website, address, city, state, pincode],
    )
    .map_err(map_unique_email)?;
    Ok(conn.last_insert_rowid())
}

pub async fn list_ngos(pool: &DbPool) -> Result<Vec<Ngo>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!("SELECT {NGO_COLS} FROM ngos ORDER BY ngo_id"))?;
    let rows = stmt.query_map([], ngo_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// ---- donations ----

const DONATION_COLS: &str =
    "donation_id, donor_id, ngo_id, title, description, category, quantity, status, image_key, created_at";

fn donation_from_row(row: &Row) -> rusqlite::Result<Donation> {
    let status: String = row.get(7)?;
    Ok(Donation {
        donation_id: row.get(0)?,
        donor_id: row.get(1)?,
        ngo_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        quantity: row.get(6)?,
        status: DonationStatus::parse(&status).ok_or_else(|| bad_enum(7, &status))?,
        image_key: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub async fn create_donation(
    pool: &DbPool,
    donor_id: i64,
    title: &str,
    description: &str,
    category: &str,
    quantity: i64,
    image_key: Option<&str>,
) -> Result<i64, AppError> {
    let title = validate::title(title)?;
    validate::quantity(quantity)?;
    let conn = pool.get()?;
    if !row_exists(&conn, "SELECT 1 FROM donors WHERE donor_id = ?1", donor_id)? {
        return Err(AppError::NotFound { entity: "donor", id: donor_id });
    }
    conn.execute(
        "INSERT INTO donations (donor_id, title, description, category, quantity, status, image_key, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            donor_id,
            title,
            description,
            category,
            quantity,
            DonationStatus::Pending.as_str(),
            image_key,
            Utc::now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub async fn get_donation(pool: &DbPool, donation_id: i64) -> Result<Option<Donation>, AppError> {
    let conn = pool.get()?;
    let donation = conn
        .query_row(
            &format!("SELECT {DONATION_COLS} FROM donations WHERE donation_id = ?1"),
            params![donation_id],
            donation_from_row,
        )
        .optional()?;
    Ok(donation)
}

pub async fn list_donations(
    pool: &DbPool,
    donor_id: Option<i64>,
    status: Option<DonationStatus>,
) -> Result<Vec<Donation>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {DONATION_COLS} FROM donations \
         WHERE (?1 IS NULL OR donor_id = ?1) AND (?2 IS NULL OR status = ?2) \
         ORDER BY donation_id"
    ))?;
    let rows = stmt.query_map(params![donor_id, status.map(|s| s.as_str())], donation_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Owner-only edit, legal while pending. Returns false when the row is
/// missing, foreign, or no longer pending.
pub async fn update_donation(
    pool: &DbPool,
    donor_id: i64,
    donation_id: i64,
    title: Option<&str>,
    description: Option<&str>,
    category: Option<&str>,
    quantity: Option<i64>,
) -> Result<bool, AppError> {
    let title = match title {
        Some(t) => Some(validate::title(t)?),
        None => None,
    };
    if let Some(q) = quantity {
        validate::quantity(q)?;
    }
    let conn = pool.get()?;
    let updated = conn.execute(
        "UPDATE donations SET \
             title = COALESCE(?1, title), \
             description = COALESCE(?2, description), \
             category = COALESCE(?3, category), \
             quantity = COALESCE(?4, quantity) \
         WHERE donation_id = ?5 AND donor_id = ?6 AND status = ?7",
        params![
            title,
            description,
            category,
            quantity,
            donation_id,
            donor_id,
            DonationStatus::Pending.as_str()
        ],
    )?;
    Ok(updated == 1)
}

pub async fn delete_donation(
    pool: &DbPool,
    donor_id: i64,
    donation_id: i64,
) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let deleted = conn.execute(
        "DELETE FROM donations WHERE donation_id = ?1 AND donor_id = ?2 AND status = ?3",
        params![donation_id, donor_id, DonationStatus::Pending.as_str()],
    )?;
    Ok(deleted == 1)
}

pub async fn set_donation_image(
    pool: &DbPool,
    donor_id: i64,
    donation_id: i64,
    image_key: &str,
) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let updated = conn.execute(
        "UPDATE donations SET image_key = ?1 WHERE donation_id = ?2 AND donor_id = ?3",
        params![image_key, donation_id, donor_id],
    )?;
    Ok(updated == 1)
}

// ---- requests ----

const REQUEST_COLS: &str =
    "request_id, recipient_id, ngo_id, title, description, category, urgency, status, created_at";

fn request_from_row(row: &Row) -> rusqlite::Result<Request> {
    let urgency: String = row.get(6)?;
    let status: String = row.get(7)?;
    Ok(Request {
        request_id: row.get(0)?,
        recipient_id: row.get(1)?,
        ngo_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        urgency: Urgency::parse(&urgency).ok_or_else(|| bad_enum(6, &urgency))?,
        status: RequestStatus::parse(&status).ok_or_else(|| bad_enum(7, &status))?,
        created_at: row.get(8)?,
    })
}

pub async fn create_request(
    pool: &DbPool,
    recipient_id: i64,
    title: &str,
    description: &str,
    category: &str,
    urgency: Urgency,
) -> Result<i64, AppError> {
    let title = validate::title(title)?;
    let conn = pool.get()?;
    if !row_exists(&conn, "SELECT 1 FROM recipients WHERE recipient_id = ?1", recipient_id)? {
        return Err(AppError::NotFound { entity: "recipient", id: recipient_id });
    }
    conn.execute(
        "INSERT INTO requests (recipient_id, title, description, category, urgency, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            recipient_id,
            title,
            description,
            category,
            urgency.as_str(),
            RequestStatus::Pending.as_str(),
            Utc::now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub async fn get_request(pool: &DbPool, request_id: i64) -> Result<Option<Request>, AppError> {
    let conn = pool.get()?;
    let request = conn
        .query_row(
            &format!("SELECT {REQUEST_COLS} FROM requests WHERE request_id = ?1"),
            params![request_id],
            request_from_row,
        )
        .optional()?;
    Ok(request)
}

pub async fn list_requests(
    pool: &DbPool,
    status: Option<RequestStatus>,
) -> Result<Vec<Request>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLS} FROM requests WHERE (?1 IS NULL OR status = ?1) ORDER BY request_id"
    ))?;
    let rows = stmt.query_map(params![status.map(|s| s.as_str())], request_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// ---- matches ----

const MATCH_COLS: &str =
    "match_id, donation_id, request_id, ngo_id, status, matched_at, delivered_at";

fn match_from_row(row: &Row) -> rusqlite::Result<Match> {
    let status: String = row.get(4)?;
    Ok(Match {
        match_id: row.get(0)?,
        donation_id: row.get(1)?,
        request_id: row.get(2)?,
        ngo_id: row.get(3)?,
        status: MatchStatus::parse(&status).ok_or_else(|| bad_enum(4, &status))?,
        matched_at: row.get(5)?,
        delivered_at: row.get(6)?,
    })
}

pub async fn list_matches(
    pool: &DbPool,
    status: Option<MatchStatus>,
) -> Result<Vec<Match>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {MATCH_COLS} FROM matches WHERE (?1 IS NULL OR status = ?1) ORDER BY match_id"
    ))?;
    let rows = stmt.query_map(params![status.map(|s| s.as_str())], match_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub async fn find_match_by_donation(
    pool: &DbPool,
    donation_id: i64,
) -> Result<Option<Match>, AppError> {
    let conn = pool.get()?;
    let m = conn
        .query_row(
            &format!("SELECT {MATCH_COLS} FROM matches WHERE donation_id = ?1 ORDER BY match_id DESC LIMIT 1"),
            params![donation_id],
            match_from_row,
        )
        .optional()?;
    Ok(m)
}

// ---- feedback ----

const FEEDBACK_COLS: &str = "feedback_id, user_id, donation_id, rating, comment, created_at";

fn feedback_from_row(row: &Row) -> rusqlite::Result<Feedback> {
    Ok(Feedback {
        feedback_id: row.get(0)?,
        user_id: row.get(1)?,
        donation_id: row.get(2)?,
        rating: row.get(3)?,
        comment: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub async fn create_feedback(
    pool: &DbPool,
    user_id: i64,
    donation_id: Option<i64>,
    rating: i64,
    comment: &str,
) -> Result<i64, AppError> {
    validate::rating(rating)?;
    let conn = pool.get()?;
    if let Some(id) = donation_id {
        if !row_exists(&conn, "SELECT 1 FROM donations WHERE donation_id = ?1", id)? {
            return Err(AppError::NotFound { entity: "donation", id });
        }
    }
    conn.execute(
        "INSERT INTO feedback (user_id, donation_id, rating, comment, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, donation_id, rating, comment, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub async fn list_feedback(pool: &DbPool) -> Result<Vec<Feedback>, AppError> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare(&format!("SELECT {FEEDBACK_COLS} FROM feedback ORDER BY feedback_id"))?;
    let rows = stmt.query_map([], feedback_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// ---- reporting ----

pub async fn donation_status_counts(pool: &DbPool) -> Result<Vec<(String, i64)>, AppError> {
    status_counts(pool, "donations").await
}

pub async fn request_status_counts(pool: &DbPool) -> Result<Vec<(String, i64)>, AppError> {
    status_counts(pool, "requests").await
}

async fn status_counts(pool: &DbPool, table: &str) -> Result<Vec<(String, i64)>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT status, COUNT(*) FROM {table} GROUP BY status ORDER BY status"
    ))?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub async fn delivered_match_count(pool: &DbPool) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM matches WHERE status = ?1",
        params![MatchStatus::Delivered.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub async fn top_recipient_cities(
    pool: &DbPool,
    limit: i64,
) -> Result<Vec<(String, i64)>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT city, COUNT(*) AS c FROM recipients WHERE city <> '' \
         GROUP BY city ORDER BY c DESC, city LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    #[tokio::test]
    async fn pool_initializes_and_applies_schema() {
        let url = format!("file:schema-{}?mode=memory&cache=shared", Uuid::new_v4());
        let pool = super::init_pool_at(&url).expect("init pool");
        let conn = pool.get().expect("checkout");
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('donors', 'recipients', 'ngos', 'donations', 'requests', 'matches', 'feedback')",
                [],
                |row| row.get(0),
            )
            .expect("count tables");
        assert_eq!(tables, 7);
    }
}
