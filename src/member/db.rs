//! Code for creating the member table and fetching members from the database.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer member IDs.
///
/// This helps disambiguate member IDs from other types of IDs, e.g. contribution IDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct MemberId(i64);

impl MemberId {
    /// Create a new member ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the member ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for MemberId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for MemberId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(MemberId)
    }
}

/// What a member is allowed to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can see their own contributions.
    #[default]
    Member,
    /// Can manage the club.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            other => Err(Error::InvalidRole(other.to_owned())),
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        text.parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A member of the savings club.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: MemberId,
    /// The email the member logs in with, stored in lowercase.
    pub email: String,
    pub password_hash: PasswordHash,
    pub full_name: String,
    pub role: Role,
    pub address: Option<String>,
    pub created_at: OffsetDateTime,
}

/// The data needed to create a member.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub email: String,
    pub password_hash: PasswordHash,
    pub full_name: String,
    pub role: Role,
    pub address: Option<String>,
}

/// The fields an administrator may change on a member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberUpdate {
    pub full_name: String,
    pub address: Option<String>,
    pub role: Role,
}

/// Create the member table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_member_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS member (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                full_name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('member', 'admin')),
                address TEXT,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Normalise an email address for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn map_row_to_member(row: &Row) -> Result<Member, rusqlite::Error> {
    let raw_password_hash: String = row.get(2)?;

    Ok(Member {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        full_name: row.get(3)?,
        role: row.get(4)?,
        address: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const SELECT_MEMBER: &str =
    "SELECT id, email, password, full_name, role, address, created_at FROM member";

/// Create and insert a new member into the database.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - [Error::SqlError] if an SQL related error occurred.
pub fn create_member(new_member: NewMember, connection: &Connection) -> Result<Member, Error> {
    let email = normalize_email(&new_member.email);
    let address = new_member
        .address
        .map(|address| address.trim().to_owned())
        .filter(|address| !address.is_empty());
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO member (email, password, full_name, role, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                email,
                new_member.password_hash.to_string(),
                new_member.full_name.trim(),
                new_member.role,
                address,
                created_at
            ],
        )
        .map_err(|error| match Error::from(error) {
            Error::DuplicateEmail(_) => Error::DuplicateEmail(email.clone()),
            error => error,
        })?;

    Ok(Member {
        id: MemberId::new(connection.last_insert_rowid()),
        email,
        password_hash: new_member.password_hash,
        full_name: new_member.full_name.trim().to_owned(),
        role: new_member.role,
        address,
        created_at,
    })
}

/// Get the member with the ID `member_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if `member_id` does not belong to a member.
pub fn get_member(member_id: MemberId, connection: &Connection) -> Result<Member, Error> {
    connection
        .query_row(
            &format!("{SELECT_MEMBER} WHERE id = ?1"),
            [member_id],
            map_row_to_member,
        )
        .map_err(Error::from)
}

/// Get the member who logs in with `email`, if there is one.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn get_member_by_email(email: &str, connection: &Connection) -> Result<Option<Member>, Error> {
    connection
        .query_row(
            &format!("{SELECT_MEMBER} WHERE email = ?1"),
            [normalize_email(email)],
            map_row_to_member,
        )
        .optional()
        .map_err(Error::from)
}

/// Get every member ordered by name.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn get_all_members(connection: &Connection) -> Result<Vec<Member>, Error> {
    connection
        .prepare(&format!("{SELECT_MEMBER} ORDER BY full_name COLLATE NOCASE, id"))?
        .query_map([], map_row_to_member)?
        .map(|maybe_member| maybe_member.map_err(Error::from))
        .collect()
}

/// Get the number of members in the database.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn count_members(connection: &Connection) -> Result<usize, Error> {
    let count: i64 = connection.query_row("SELECT COUNT(id) FROM member", [], |row| row.get(0))?;

    usize::try_from(count).map_err(|error| {
        tracing::error!("member count {count} does not fit in usize: {error}");
        Error::InvalidInput(format!("invalid member count {count}"))
    })
}

/// Change a member's name, address and role.
///
/// # Errors
///
/// Returns [Error::UpdateMissingMember] if `member_id` does not belong to a member.
pub fn update_member(
    member_id: MemberId,
    update: &MemberUpdate,
    connection: &Connection,
) -> Result<(), Error> {
    let address = update
        .address
        .as_deref()
        .map(str::trim)
        .filter(|address| !address.is_empty());

    let rows_affected = connection.execute(
        "UPDATE member SET full_name = ?1, address = ?2, role = ?3 WHERE id = ?4",
        params![update.full_name.trim(), address, update.role, member_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingMember);
    }

    Ok(())
}

/// Replace a member's password hash.
///
/// # Errors
///
/// Returns [Error::UpdateMissingMember] if `member_id` does not belong to a member.
pub fn set_member_password(
    member_id: MemberId,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE member SET password = ?1 WHERE id = ?2",
        params![password_hash.to_string(), member_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingMember);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_members {
    //! Helpers for inserting members in tests.

    use rusqlite::Connection;

    use crate::PasswordHash;

    use super::{Member, NewMember, Role, create_member};

    /// A bcrypt hash of "okon".
    pub const TEST_PASSWORD_HASH: &str =
        "$2b$12$Gwf0uvxH3L7JLfo0CC/NCOoijK2vQ/wbgP.LeNup8vj6gg31IiFkm";

    #[track_caller]
    pub fn must_create_member(name: &str, role: Role, connection: &Connection) -> Member {
        create_member(
            NewMember {
                email: format!("{}@club.test", name.to_lowercase().replace(' ', ".")),
                password_hash: PasswordHash::new_unchecked(TEST_PASSWORD_HASH),
                full_name: name.to_owned(),
                role,
                address: None,
            },
            connection,
        )
        .expect("could not create test member")
    }
}
