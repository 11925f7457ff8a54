//! CSV downloads of contribution ledgers and club totals.

use axum::{
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use csv::Writer;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    contribution::{MemberTotals, RunningRow},
    html::format_date,
};

/// The label of the last row of the club totals download.
pub const GRAND_TOTAL_LABEL: &str = "GRAND TOTAL";

fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

#[derive(Serialize)]
struct LedgerRecord<'a> {
    #[serde(rename = "Fortnight")]
    fortnight: i64,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Shares")]
    shares: String,
    #[serde(rename = "Social Fund")]
    social_fund: String,
    #[serde(rename = "Late Fee")]
    late_fee: String,
    #[serde(rename = "Absent Fee")]
    absent_fee: String,
    #[serde(rename = "Outstanding Fee")]
    outstanding_fee: String,
    #[serde(rename = "Total")]
    total: String,
    #[serde(rename = "Cumulative")]
    cumulative: String,
    #[serde(rename = "Notes")]
    notes: &'a str,
}

#[derive(Serialize)]
struct TotalsRecord<'a> {
    #[serde(rename = "Member Name")]
    member_name: &'a str,
    #[serde(rename = "Shares")]
    shares: String,
    #[serde(rename = "Social Fund")]
    social_fund: String,
    #[serde(rename = "Late Fees")]
    late_fees: String,
    #[serde(rename = "Absent Fees")]
    absent_fees: String,
    #[serde(rename = "Outstanding")]
    outstanding: String,
    #[serde(rename = "Total")]
    total: String,
}

impl<'a> TotalsRecord<'a> {
    fn new(member_name: &'a str, totals: &MemberTotals) -> Self {
        Self {
            member_name,
            shares: format_amount(totals.shares),
            social_fund: format_amount(totals.social_fund),
            late_fees: format_amount(totals.late_fee),
            absent_fees: format_amount(totals.absent_fee),
            outstanding: format_amount(totals.outstanding),
            total: format_amount(totals.total),
        }
    }
}

fn into_csv_string(writer: Writer<Vec<u8>>) -> Result<String, Error> {
    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

/// Write a member's ledger, with row and cumulative totals, as CSV.
///
/// # Errors
/// Returns [Error::CsvError] if a record could not be written.
pub fn ledger_csv(rows: &[RunningRow<'_>]) -> Result<String, Error> {
    let mut writer = Writer::from_writer(Vec::new());

    for row in rows {
        let contribution = row.contribution;

        writer
            .serialize(LedgerRecord {
                fortnight: contribution.fortnight.as_i64(),
                date: format_date(contribution.date),
                shares: format_amount(contribution.shares),
                social_fund: format_amount(contribution.social_fund),
                late_fee: format_amount(contribution.late_fee),
                absent_fee: format_amount(contribution.absent_fee),
                outstanding_fee: format_amount(contribution.outstanding_fee),
                total: format_amount(row.row_total),
                cumulative: format_amount(row.cumulative),
                notes: contribution.notes.as_deref().unwrap_or_default(),
            })
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    if rows.is_empty() {
        writer
            .write_record([
                "Fortnight",
                "Date",
                "Shares",
                "Social Fund",
                "Late Fee",
                "Absent Fee",
                "Outstanding Fee",
                "Total",
                "Cumulative",
                "Notes",
            ])
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    into_csv_string(writer)
}

/// Write each member's totals followed by a grand total row as CSV.
///
/// # Errors
/// Returns [Error::CsvError] if a record could not be written.
pub fn totals_csv(per_member: &[(String, MemberTotals)], grand: &MemberTotals) -> Result<String, Error> {
    let mut writer = Writer::from_writer(Vec::new());

    for (member_name, totals) in per_member {
        writer
            .serialize(TotalsRecord::new(member_name, totals))
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    writer
        .serialize(TotalsRecord::new(GRAND_TOTAL_LABEL, grand))
        .map_err(|error| Error::CsvError(error.to_string()))?;

    into_csv_string(writer)
}

/// Respond with `body` as a CSV attachment named `<prefix>-<YYYY-MM-DD>.csv`.
pub fn csv_attachment(prefix: &str, date: Date, body: String) -> Response {
    let file_name = format!("{prefix}-{}.csv", format_date(date));

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod export_tests {
    use time::macros::date;

    use crate::{
        contribution::{Contribution, MemberTotals, running_totals},
        fortnight::Fortnight,
        member::MemberId,
    };

    use super::{csv_attachment, ledger_csv, totals_csv};

    fn row(id: i64, fortnight: i64, shares: f64, notes: Option<&str>) -> Contribution {
        Contribution {
            id,
            member_id: MemberId::new(1),
            fortnight: Fortnight::new(fortnight).unwrap(),
            date: date!(2025 - 05 - 02),
            shares,
            social_fund: 10.0,
            late_fee: 0.0,
            absent_fee: 0.0,
            outstanding_fee: 0.0,
            notes: notes.map(str::to_owned),
        }
    }

    #[test]
    fn ledger_has_header_and_running_total() {
        let rows = [row(1, 1, 100.0, Some("cash, thanks")), row(2, 2, 50.0, None)];

        let csv = ledger_csv(&running_totals(&rows)).unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            [
                "Fortnight,Date,Shares,Social Fund,Late Fee,Absent Fee,Outstanding Fee,Total,Cumulative,Notes",
                "1,2025-05-02,100.00,10.00,0.00,0.00,0.00,110.00,110.00,\"cash, thanks\"",
                "2,2025-05-02,50.00,10.00,0.00,0.00,0.00,60.00,170.00,",
            ]
        );
    }

    #[test]
    fn empty_ledger_still_has_header() {
        let csv = ledger_csv(&[]).unwrap();

        assert!(csv.starts_with("Fortnight,Date,Shares"));
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn totals_end_with_grand_total() {
        let first = MemberTotals {
            shares: 100.0,
            social_fund: 50.0,
            total: 150.0,
            ..Default::default()
        };
        let second = MemberTotals {
            shares: 200.0,
            total: 200.0,
            outstanding: 5.0,
            ..Default::default()
        };
        let grand = MemberTotals {
            shares: 300.0,
            social_fund: 50.0,
            outstanding: 5.0,
            total: 350.0,
            ..Default::default()
        };

        let csv = totals_csv(
            &[("Ana".to_owned(), first), ("Ben".to_owned(), second)],
            &grand,
        )
        .unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Member Name,Shares,Social Fund,Late Fees,Absent Fees,Outstanding,Total"
        );
        assert_eq!(lines[3], "GRAND TOTAL,300.00,50.00,0.00,0.00,5.00,350.00");
    }

    #[test]
    fn attachment_has_dated_file_name() {
        let response = csv_attachment("contributions", date!(2025 - 06 - 09), String::new());

        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"contributions-2025-06-09.csv\""
        );
        assert_eq!(
            response.headers()["content-type"],
            "text/csv; charset=utf-8"
        );
    }
}
