//! Records of uploaded contribution sheets.

use rusqlite::{Connection, Row};
use time::Date;

use crate::{Error, database_id::DatabaseId, fortnight::Fortnight, member::MemberId};

// ============================================================================
// MODELS
// ============================================================================

/// A scan or photo of the signed collection list for a fortnight.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionSheet {
    pub id: DatabaseId,
    pub fortnight: Fortnight,
    pub upload_date: Date,
    /// The name of the file in the sheet storage.
    pub file_name: String,
    pub uploaded_by: MemberId,
    /// The total reported on the sheet, if the administrator entered one.
    pub total_collected: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSheet {
    pub fortnight: Fortnight,
    pub upload_date: Date,
    pub file_name: String,
    pub uploaded_by: MemberId,
    pub total_collected: Option<f64>,
    pub notes: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the contribution sheet table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_sheet_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS contribution_sheet (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fortnight INTEGER NOT NULL CHECK (fortnight BETWEEN 1 AND 23),
                upload_date TEXT NOT NULL,
                file_name TEXT NOT NULL UNIQUE,
                uploaded_by INTEGER NOT NULL,
                total_collected REAL,
                notes TEXT,
                FOREIGN KEY(uploaded_by) REFERENCES member(id) ON UPDATE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_sheet_row(row: &Row) -> Result<ContributionSheet, rusqlite::Error> {
    Ok(ContributionSheet {
        id: row.get(0)?,
        fortnight: row.get(1)?,
        upload_date: row.get(2)?,
        file_name: row.get(3)?,
        uploaded_by: row.get(4)?,
        total_collected: row.get(5)?,
        notes: row.get(6)?,
    })
}

/// Record an uploaded sheet.
///
/// # Errors
/// Returns [Error::NotFound] if the uploader does not exist, or
/// [Error::SqlError] if there is some other SQL error.
pub fn insert_sheet(sheet: NewSheet, connection: &Connection) -> Result<ContributionSheet, Error> {
    connection
        .prepare(
            "INSERT INTO contribution_sheet
                (fortnight, upload_date, file_name, uploaded_by, total_collected, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, fortnight, upload_date, file_name, uploaded_by, total_collected, notes",
        )?
        .query_row(
            (
                sheet.fortnight,
                sheet.upload_date,
                sheet.file_name,
                sheet.uploaded_by,
                sheet.total_collected,
                sheet.notes,
            ),
            map_sheet_row,
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

/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a sheet.
pub fn get_sheet(id: DatabaseId, connection: &Connection) -> Result<ContributionSheet, Error> {
    connection
        .prepare(
            "SELECT id, fortnight, upload_date, file_name, uploaded_by, total_collected, notes
            FROM contribution_sheet WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_sheet_row)
        .map_err(Error::from)
}

/// Get every sheet, newest fortnight first.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_all_sheets(connection: &Connection) -> Result<Vec<ContributionSheet>, Error> {
    connection
        .prepare(
            "SELECT id, fortnight, upload_date, file_name, uploaded_by, total_collected, notes
            FROM contribution_sheet
            ORDER BY fortnight DESC, id DESC",
        )?
        .query_map([], map_sheet_row)?
        .map(|maybe_sheet| maybe_sheet.map_err(Error::from))
        .collect()
}

/// Remove the record of a sheet. The stored file is left alone.
///
/// # Errors
/// Returns [Error::DeleteMissingSheet] if `id` does not refer to a sheet.
pub fn delete_sheet(id: DatabaseId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM contribution_sheet WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingSheet);
    }

    Ok(())
}
