//! Attendance records, one per member and fortnight.

use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use time::Date;

use crate::{Error, database_id::DatabaseId, fortnight::Fortnight, member::MemberId};

/// Whether a member attended the meeting of a fortnight.
#[derive(Debug, Clone, PartialEq)]
pub struct Attendance {
    pub id: DatabaseId,
    pub member_id: MemberId,
    pub fortnight: Fortnight,
    pub date: Date,
    pub present: bool,
    pub notes: Option<String>,
}

/// A member's attendance as entered by an administrator.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceEntry {
    pub member_id: MemberId,
    pub present: bool,
    pub notes: Option<String>,
}

/// Create the attendance table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_attendance_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS attendance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id INTEGER NOT NULL,
                fortnight INTEGER NOT NULL CHECK (fortnight BETWEEN 1 AND 23),
                date TEXT NOT NULL,
                present INTEGER NOT NULL,
                notes TEXT,
                UNIQUE(member_id, fortnight),
                FOREIGN KEY(member_id) REFERENCES member(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_attendance_row(row: &Row) -> Result<Attendance, rusqlite::Error> {
    Ok(Attendance {
        id: row.get(0)?,
        member_id: row.get(1)?,
        fortnight: row.get(2)?,
        date: row.get(3)?,
        present: row.get(4)?,
        notes: row.get(5)?,
    })
}

/// Save the attendance of several members for one fortnight.
///
/// Saving a fortnight again replaces the earlier record of each member.
/// Either every entry is saved or none are.
///
/// # Errors
/// Returns [Error::NotFound] if a member does not exist, or
/// [Error::SqlError] if there is some other SQL error.
pub fn save_attendance(
    fortnight: Fortnight,
    date: Date,
    entries: &[AttendanceEntry],
    connection: &Connection,
) -> Result<usize, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    {
        let mut statement = transaction.prepare(
            "INSERT INTO attendance (member_id, fortnight, date, present, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(member_id, fortnight) DO UPDATE SET
                date = excluded.date,
                present = excluded.present,
                notes = excluded.notes",
        )?;

        for entry in entries {
            statement
                .execute((entry.member_id, fortnight, date, entry.present, &entry.notes))
                .map_err(|error| match error {
                    rusqlite::Error::SqliteFailure(
                        rusqlite::ffi::Error {
                            code: _,
                            extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                        },
                        _,
                    ) => Error::NotFound,
                    error => error.into(),
                })?;
        }
    }

    transaction.commit()?;

    Ok(entries.len())
}

/// Get a member's attendance ordered by fortnight.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_member_attendance(
    member_id: MemberId,
    connection: &Connection,
) -> Result<Vec<Attendance>, Error> {
    connection
        .prepare(
            "SELECT id, member_id, fortnight, date, present, notes FROM attendance
            WHERE member_id = :member_id
            ORDER BY fortnight ASC",
        )?
        .query_map(&[(":member_id", &member_id)], map_attendance_row)?
        .map(|maybe_attendance| maybe_attendance.map_err(Error::from))
        .collect()
}

/// Get every member's attendance for one fortnight.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_fortnight_attendance(
    fortnight: Fortnight,
    connection: &Connection,
) -> Result<Vec<Attendance>, Error> {
    connection
        .prepare(
            "SELECT id, member_id, fortnight, date, present, notes FROM attendance
            WHERE fortnight = :fortnight
            ORDER BY member_id ASC",
        )?
        .query_map(&[(":fortnight", &fortnight)], map_attendance_row)?
        .map(|maybe_attendance| maybe_attendance.map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod attendance_tests {
    use time::macros::date;

    use crate::{
        Error,
        fortnight::Fortnight,
        member::{MemberId, Role, test_members::must_create_member},
        test_utils::must_open_test_db,
    };

    use super::{AttendanceEntry, get_fortnight_attendance, get_member_attendance, save_attendance};

    fn entry(member_id: MemberId, present: bool, notes: Option<&str>) -> AttendanceEntry {
        AttendanceEntry {
            member_id,
            present,
            notes: notes.map(str::to_owned),
        }
    }

    #[test]
    fn saving_twice_updates_instead_of_duplicating() {
        let connection = must_open_test_db();
        let member = must_create_member("Ana Ramo", Role::Member, &connection);
        let fortnight = Fortnight::new(3).unwrap();

        save_attendance(
            fortnight,
            date!(2025 - 02 - 07),
            &[entry(member.id, true, None)],
            &connection,
        )
        .unwrap();
        save_attendance(
            fortnight,
            date!(2025 - 02 - 08),
            &[entry(member.id, false, Some("Sick"))],
            &connection,
        )
        .unwrap();

        let records = get_member_attendance(member.id, &connection).unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].present);
        assert_eq!(records[0].date, date!(2025 - 02 - 08));
        assert_eq!(records[0].notes.as_deref(), Some("Sick"));
    }

    #[test]
    fn member_history_is_ordered_by_fortnight() {
        let connection = must_open_test_db();
        let member = must_create_member("Ana Ramo", Role::Member, &connection);
        for fortnight in [5, 1, 3] {
            save_attendance(
                Fortnight::new(fortnight).unwrap(),
                date!(2025 - 01 - 10),
                &[entry(member.id, true, None)],
                &connection,
            )
            .unwrap();
        }

        let fortnights: Vec<_> = get_member_attendance(member.id, &connection)
            .unwrap()
            .iter()
            .map(|record| record.fortnight.as_i64())
            .collect();

        assert_eq!(fortnights, [1, 3, 5]);
    }

    #[test]
    fn unknown_member_rolls_back_whole_save() {
        let connection = must_open_test_db();
        let member = must_create_member("Ana Ramo", Role::Member, &connection);
        let fortnight = Fortnight::new(1).unwrap();

        let result = save_attendance(
            fortnight,
            date!(2025 - 01 - 10),
            &[
                entry(member.id, true, None),
                entry(MemberId::new(member.id.as_i64() + 100), true, None),
            ],
            &connection,
        );

        assert_eq!(result, Err(Error::NotFound));
        assert!(get_fortnight_attendance(fortnight, &connection).unwrap().is_empty());
    }
}
