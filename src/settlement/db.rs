//! Payment records created when a member settles their outstanding fee.
//!
//! Payments are an append-only history. The balance itself lives on the
//! member's contributions, see [crate::contribution::settle_payment].

use rusqlite::{Connection, Row};
use time::Date;

use crate::{Error, database_id::DatabaseId, member::MemberId};

/// A settled payment.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: DatabaseId,
    pub member_id: MemberId,
    pub amount: f64,
    pub payment_date: Date,
    pub notes: Option<String>,
    /// The administrator who recorded the payment.
    pub created_by: MemberId,
}

/// The data needed to record a payment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub member_id: MemberId,
    pub amount: f64,
    pub payment_date: Date,
    pub notes: Option<String>,
    pub created_by: MemberId,
}

/// Create the payment table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_payment_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS payment (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id INTEGER NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                payment_date TEXT NOT NULL,
                notes TEXT,
                created_by INTEGER NOT NULL,
                FOREIGN KEY(member_id) REFERENCES member(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(created_by) REFERENCES member(id) ON UPDATE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_payment_row(row: &Row) -> Result<Payment, rusqlite::Error> {
    Ok(Payment {
        id: row.get(0)?,
        member_id: row.get(1)?,
        amount: row.get(2)?,
        payment_date: row.get(3)?,
        notes: row.get(4)?,
        created_by: row.get(5)?,
    })
}

/// Record a payment.
///
/// # Errors
/// Returns [Error::NotFound] if the member or the administrator does not
/// exist, or [Error::SqlError] if there is some other SQL error.
pub fn insert_payment(payment: NewPayment, connection: &Connection) -> Result<Payment, Error> {
    connection
        .prepare(
            "INSERT INTO payment (member_id, amount, payment_date, notes, created_by)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, member_id, amount, payment_date, notes, created_by",
        )?
        .query_row(
            (
                payment.member_id,
                payment.amount,
                payment.payment_date,
                payment.notes,
                payment.created_by,
            ),
            map_payment_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })
}

/// Get a member's payments, newest first.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_member_payments(
    member_id: MemberId,
    connection: &Connection,
) -> Result<Vec<Payment>, Error> {
    connection
        .prepare(
            "SELECT id, member_id, amount, payment_date, notes, created_by FROM payment
            WHERE member_id = :member_id
            ORDER BY payment_date DESC, id DESC",
        )?
        .query_map(&[(":member_id", &member_id)], map_payment_row)?
        .map(|maybe_payment| maybe_payment.map_err(Error::from))
        .collect()
}
