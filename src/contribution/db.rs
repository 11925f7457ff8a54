//! Defines the contribution model and its database queries.

use rusqlite::{Connection, OptionalExtension, Row};
use time::Date;

use crate::{Error, database_id::DatabaseId, fortnight::Fortnight, member::MemberId};

// ============================================================================
// MODELS
// ============================================================================

/// One entry in a member's contribution ledger.
///
/// Monetary columns may be `NULL` in the database and are read as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub id: DatabaseId,
    pub member_id: MemberId,
    pub fortnight: Fortnight,
    pub date: Date,
    pub shares: f64,
    pub social_fund: f64,
    pub late_fee: f64,
    pub absent_fee: f64,
    /// The member's unpaid fee balance.
    ///
    /// Only the member's latest row carries a non-zero balance, see [get_latest_contribution].
    pub outstanding_fee: f64,
    pub notes: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the contribution table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_contribution_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS contribution (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id INTEGER NOT NULL,
                fortnight INTEGER NOT NULL CHECK (fortnight BETWEEN 1 AND 23),
                date TEXT NOT NULL,
                shares REAL,
                social_fund REAL,
                late_fee REAL,
                absent_fee REAL,
                outstanding_fee REAL,
                notes TEXT,
                FOREIGN KEY(member_id) REFERENCES member(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_contribution_member_fortnight
            ON contribution(member_id, fortnight, id);",
        (),
    )?;

    Ok(())
}

const SELECT_CONTRIBUTION: &str = "SELECT id, member_id, fortnight, date, shares, social_fund, \
    late_fee, absent_fee, outstanding_fee, notes FROM contribution";

/// Map a database row to a [Contribution].
pub fn map_contribution_row(row: &Row) -> Result<Contribution, rusqlite::Error> {
    let amount = |index: usize| -> Result<f64, rusqlite::Error> {
        Ok(row.get::<_, Option<f64>>(index)?.unwrap_or(0.0))
    };

    Ok(Contribution {
        id: row.get(0)?,
        member_id: row.get(1)?,
        fortnight: row.get(2)?,
        date: row.get(3)?,
        shares: amount(4)?,
        social_fund: amount(5)?,
        late_fee: amount(6)?,
        absent_fee: amount(7)?,
        outstanding_fee: amount(8)?,
        notes: row.get(9)?,
    })
}

/// Retrieve a contribution by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a contribution.
pub fn get_contribution(id: DatabaseId, connection: &Connection) -> Result<Contribution, Error> {
    connection
        .prepare(&format!("{SELECT_CONTRIBUTION} WHERE id = :id"))?
        .query_one(&[(":id", &id)], map_contribution_row)
        .map_err(Error::from)
}

/// Get a member's contributions in ledger order, i.e. by fortnight then by ID.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_member_contributions(
    member_id: MemberId,
    connection: &Connection,
) -> Result<Vec<Contribution>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CONTRIBUTION} WHERE member_id = :member_id ORDER BY fortnight ASC, id ASC"
        ))?
        .query_map(&[(":member_id", &member_id)], map_contribution_row)?
        .map(|maybe_contribution| maybe_contribution.map_err(Error::from))
        .collect()
}

/// Get every member's contributions, grouped by member and in ledger order.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_all_contributions(connection: &Connection) -> Result<Vec<Contribution>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CONTRIBUTION} ORDER BY member_id ASC, fortnight ASC, id ASC"
        ))?
        .query_map([], map_contribution_row)?
        .map(|maybe_contribution| maybe_contribution.map_err(Error::from))
        .collect()
}

/// Get the member's latest contribution: the greatest fortnight, ties broken by the greatest ID.
///
/// This row holds the member's outstanding fee balance.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_latest_contribution(
    member_id: MemberId,
    connection: &Connection,
) -> Result<Option<Contribution>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CONTRIBUTION} WHERE member_id = :member_id
            ORDER BY fortnight DESC, id DESC LIMIT 1"
        ))?
        .query_row(&[(":member_id", &member_id)], map_contribution_row)
        .optional()
        .map_err(Error::from)
}

/// Get the `limit` most recent contributions of a member, newest first.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_recent_contributions(
    member_id: MemberId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Contribution>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_CONTRIBUTION} WHERE member_id = :member_id
            ORDER BY fortnight DESC, id DESC LIMIT :limit"
        ))?
        .query_map(
            rusqlite::named_params! { ":member_id": member_id, ":limit": limit },
            map_contribution_row,
        )?
        .map(|maybe_contribution| maybe_contribution.map_err(Error::from))
        .collect()
}
