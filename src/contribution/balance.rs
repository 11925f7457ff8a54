//! Operations that change a member's outstanding fee balance.
//!
//! The balance lives on the member's latest contribution row (see
//! [get_latest_contribution]) and every other row of the member carries zero.
//! Each operation validates its input first and then reads and writes the
//! balance inside one `IMMEDIATE` transaction, so concurrent requests are
//! serialised by SQLite and a failed write leaves no partial changes.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use time::Date;

use crate::{
    Error,
    contribution::{Contribution, get_contribution, get_latest_contribution},
    database_id::DatabaseId,
    fortnight::Fortnight,
    member::{MemberId, get_member},
    settlement::{NewPayment, Payment, insert_payment},
};

/// The notes recorded with a settlement when the administrator leaves them blank.
pub const DEFAULT_SETTLEMENT_NOTE: &str = "Payment settlement";

/// The notes recorded with a fee when the administrator gives no reason.
const DEFAULT_FEE_REASON: &str = "Outstanding fee";

/// A contribution entered by an administrator.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContribution {
    pub member_id: MemberId,
    pub fortnight: Fortnight,
    pub date: Date,
    pub shares: f64,
    pub social_fund: f64,
    pub late_fee: f64,
    pub absent_fee: f64,
    pub notes: Option<String>,
}

/// A fee added to a member's balance outside of a contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeAdjustment {
    pub member_id: MemberId,
    pub amount: f64,
    pub reason: String,
    /// The fortnight and date to use if the member has no contributions yet.
    pub fortnight: Fortnight,
    pub date: Date,
}

/// A payment towards a member's outstanding fee.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub member_id: MemberId,
    pub amount: f64,
    pub date: Date,
    pub notes: Option<String>,
    /// The administrator recording the payment.
    pub created_by: MemberId,
}

fn check_non_negative(amounts: &[f64]) -> Result<(), Error> {
    for amount in amounts {
        if !amount.is_finite() {
            return Err(Error::InvalidInput(format!("{amount} is not a valid amount")));
        }

        if *amount < 0.0 {
            return Err(Error::NegativeAmount);
        }
    }

    Ok(())
}

fn check_positive(amount: f64) -> Result<(), Error> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidAmount)
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

fn insert_contribution(
    new: &NewContribution,
    outstanding_fee: f64,
    connection: &Connection,
) -> Result<DatabaseId, Error> {
    connection
        .query_row(
            "INSERT INTO contribution
                (member_id, fortnight, date, shares, social_fund, late_fee, absent_fee,
                outstanding_fee, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING id",
            rusqlite::params![
                new.member_id,
                new.fortnight,
                new.date,
                new.shares,
                new.social_fund,
                new.late_fee,
                new.absent_fee,
                outstanding_fee,
                new.notes,
            ],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

fn set_outstanding(id: DatabaseId, outstanding_fee: f64, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "UPDATE contribution SET outstanding_fee = ?1 WHERE id = ?2",
        (outstanding_fee, id),
    )?;

    Ok(())
}

/// Record a contribution and add its late and absent fees to the member's balance.
///
/// If the new row becomes the member's latest row it takes over the balance.
/// Otherwise the balance stays on the existing latest row.
///
/// # Errors
/// Returns:
/// - [Error::NegativeAmount] if any amount is negative,
/// - [Error::NotFound] if the member does not exist,
/// - [Error::SqlError] if there is some other SQL error.
pub fn add_contribution(new: NewContribution, connection: &Connection) -> Result<Contribution, Error> {
    check_non_negative(&[new.shares, new.social_fund, new.late_fee, new.absent_fee])?;
    let new = NewContribution {
        notes: non_empty(new.notes),
        ..new
    };
    let fees = new.late_fee + new.absent_fee;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    get_member(new.member_id, &transaction)?;

    let previous_latest = get_latest_contribution(new.member_id, &transaction)?;
    let id = insert_contribution(&new, 0.0, &transaction)?;

    match previous_latest {
        None => set_outstanding(id, fees, &transaction)?,
        Some(latest) if new.fortnight >= latest.fortnight => {
            set_outstanding(id, latest.outstanding_fee + fees, &transaction)?;
            set_outstanding(latest.id, 0.0, &transaction)?;
        }
        Some(latest) => {
            if fees > 0.0 {
                set_outstanding(latest.id, latest.outstanding_fee + fees, &transaction)?;
            }
        }
    }

    let contribution = get_contribution(id, &transaction)?;
    transaction.commit()?;

    tracing::debug!(
        "added contribution {id} for member {} in fortnight {}",
        contribution.member_id,
        contribution.fortnight
    );

    Ok(contribution)
}

/// Add a fee to the member's outstanding balance.
///
/// The reason is appended to the notes of the row holding the balance. If the
/// member has no contributions, a row with zero amounts is created to hold it.
///
/// Returns the row that holds the balance afterwards.
///
/// # Errors
/// Returns:
/// - [Error::InvalidAmount] if `amount` is not greater than zero,
/// - [Error::NotFound] if the member does not exist,
/// - [Error::SqlError] if there is some other SQL error.
pub fn add_outstanding_fee(fee: FeeAdjustment, connection: &Connection) -> Result<Contribution, Error> {
    check_positive(fee.amount)?;
    let reason = non_empty(Some(fee.reason)).unwrap_or_else(|| DEFAULT_FEE_REASON.to_owned());

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    get_member(fee.member_id, &transaction)?;

    let id = match get_latest_contribution(fee.member_id, &transaction)? {
        Some(latest) => {
            let notes = match non_empty(latest.notes) {
                Some(existing) => format!("{existing}; Fee added: {reason}"),
                None => format!("Fee added: {reason}"),
            };

            transaction.execute(
                "UPDATE contribution SET outstanding_fee = ?1, notes = ?2 WHERE id = ?3",
                (latest.outstanding_fee + fee.amount, notes, latest.id),
            )?;

            latest.id
        }
        None => {
            let placeholder = NewContribution {
                member_id: fee.member_id,
                fortnight: fee.fortnight,
                date: fee.date,
                shares: 0.0,
                social_fund: 0.0,
                late_fee: 0.0,
                absent_fee: 0.0,
                notes: Some(reason),
            };

            insert_contribution(&placeholder, fee.amount, &transaction)?
        }
    };

    let contribution = get_contribution(id, &transaction)?;
    transaction.commit()?;

    tracing::debug!(
        "added fee of {} for member {}, balance now {}",
        fee.amount,
        fee.member_id,
        contribution.outstanding_fee
    );

    Ok(contribution)
}

/// Record a payment and apply it to the member's balance.
///
/// The payment reduces the outstanding fee, never below zero, and the full
/// amount is added to the social fund of the row holding the balance. When the
/// member has no contributions only the payment is recorded.
///
/// # Errors
/// Returns:
/// - [Error::InvalidAmount] if `amount` is not greater than zero,
/// - [Error::NotFound] if the member does not exist,
/// - [Error::SqlError] if there is some other SQL error.
pub fn settle_payment(settlement: Settlement, connection: &Connection) -> Result<Payment, Error> {
    check_positive(settlement.amount)?;
    let notes =
        non_empty(settlement.notes).unwrap_or_else(|| DEFAULT_SETTLEMENT_NOTE.to_owned());

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    get_member(settlement.member_id, &transaction)?;

    let payment = insert_payment(
        NewPayment {
            member_id: settlement.member_id,
            amount: settlement.amount,
            payment_date: settlement.date,
            notes: Some(notes),
            created_by: settlement.created_by,
        },
        &transaction,
    )?;

    if let Some(latest) = get_latest_contribution(settlement.member_id, &transaction)? {
        let outstanding_fee = (latest.outstanding_fee - settlement.amount).max(0.0);
        let social_fund = latest.social_fund + settlement.amount;

        transaction.execute(
            "UPDATE contribution SET outstanding_fee = ?1, social_fund = ?2 WHERE id = ?3",
            (outstanding_fee, social_fund, latest.id),
        )?;
    }

    transaction.commit()?;

    tracing::info!(
        "settled payment {} of {} for member {}",
        payment.id,
        payment.amount,
        payment.member_id
    );

    Ok(payment)
}

/// Delete a contribution.
///
/// If the row held the member's balance, the balance moves to the member's new
/// latest row. It is dropped with the row when the member has no rows left.
///
/// # Errors
/// Returns:
/// - [Error::DeleteMissingContribution] if `id` does not refer to a contribution,
/// - [Error::SqlError] if there is some other SQL error.
pub fn delete_contribution(id: DatabaseId, connection: &Connection) -> Result<Contribution, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let contribution = match get_contribution(id, &transaction) {
        Ok(contribution) => contribution,
        Err(Error::NotFound) => return Err(Error::DeleteMissingContribution),
        Err(error) => return Err(error),
    };
    let was_latest = get_latest_contribution(contribution.member_id, &transaction)?
        .is_some_and(|latest| latest.id == id);

    transaction.execute("DELETE FROM contribution WHERE id = ?1", [id])?;

    if was_latest
        && contribution.outstanding_fee != 0.0
        && let Some(new_latest) = get_latest_contribution(contribution.member_id, &transaction)?
    {
        set_outstanding(
            new_latest.id,
            new_latest.outstanding_fee + contribution.outstanding_fee,
            &transaction,
        )?;
    }

    transaction.commit()?;

    tracing::info!(
        "deleted contribution {id} of member {}",
        contribution.member_id
    );

    Ok(contribution)
}
