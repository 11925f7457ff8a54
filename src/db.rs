//! Creates the application's database schema.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    attendance::create_attendance_table,
    auth::create_password_reset_table,
    contribution::create_contribution_table,
    member::create_member_table,
    settlement::create_payment_table,
    sheet::create_sheet_table,
};

/// Create every table used by the application if it does not exist yet.
///
/// The tables are created in one transaction so that a failure leaves the
/// database untouched.
///
/// # Errors
/// Returns an [Error::SqlError] if any table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_member_table(&transaction)?;
    create_password_reset_table(&transaction)?;
    create_contribution_table(&transaction)?;
    create_attendance_table(&transaction)?;
    create_payment_table(&transaction)?;
    create_sheet_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
