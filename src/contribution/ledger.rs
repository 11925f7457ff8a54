//! The signed-in member's own contribution ledger and its CSV download.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    contribution::{
        Contribution, RunningRow,
        export::{csv_attachment, ledger_csv},
        get_member_contributions, member_totals, running_totals,
    },
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency, format_date, stat_card,
    },
    member::{Member, MemberId, get_member},
    navigation::NavBar,
    timezone::local_today,
};

/// The state needed for the ledger page and its download.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for LedgerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn load_ledger(
    member_id: MemberId,
    state: &LedgerState,
) -> Result<(Member, Vec<Contribution>), Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let member = get_member(member_id, &connection)?;
    let contributions = get_member_contributions(member_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve contributions: {error}"))?;

    Ok((member, contributions))
}

/// Render the signed-in member's ledger.
pub async fn get_ledger_page(
    State(state): State<LedgerState>,
    Extension(member_id): Extension<MemberId>,
) -> Result<Response, Error> {
    let (member, contributions) = load_ledger(member_id, &state)?;

    Ok(ledger_view(&member, &contributions).into_response())
}

/// Download the signed-in member's ledger as CSV.
pub async fn get_ledger_export(
    State(state): State<LedgerState>,
    Extension(member_id): Extension<MemberId>,
) -> Result<Response, Error> {
    let (_, contributions) = load_ledger(member_id, &state)?;
    let today = local_today(&state.local_timezone)?;
    let csv = ledger_csv(&running_totals(&contributions))?;

    Ok(csv_attachment("contributions", today, csv))
}

/// Table rows of a contribution ledger with running totals.
///
/// `actions` renders the last cell of each row, if any.
pub(super) fn ledger_table(
    rows: &[RunningRow<'_>],
    actions: Option<&dyn Fn(&Contribution) -> Markup>,
) -> Markup {
    let column_count = if actions.is_some() { 11 } else { 10 };

    html! {
        div class="overflow-x-auto dark:bg-gray-800"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Fortnight" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Shares" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Social Fund" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Late Fee" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Absent Fee" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Outstanding" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Total" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Cumulative" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Notes" }
                        @if actions.is_some() {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }
                }

                tbody
                {
                    @for row in rows {
                        @let contribution = row.contribution;
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (contribution.fortnight) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                time datetime=(format_date(contribution.date)) { (format_date(contribution.date)) }
                            }
                            td class=(TABLE_CELL_STYLE) { (format_currency(contribution.shares)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(contribution.social_fund)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(contribution.late_fee)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(contribution.absent_fee)) }
                            td class={ (TABLE_CELL_STYLE) " text-red-600 dark:text-red-400" }
                            {
                                (format_currency(contribution.outstanding_fee))
                            }
                            td class={ (TABLE_CELL_STYLE) " font-semibold" } { (format_currency(row.row_total)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(row.cumulative)) }
                            td class=(TABLE_CELL_STYLE) { (contribution.notes.as_deref().unwrap_or("-")) }
                            @if let Some(actions) = actions {
                                td class=(TABLE_CELL_STYLE) { (actions(contribution)) }
                            }
                        }
                    }

                    @if rows.is_empty() {
                        tr
                        {
                            td
                                colspan=(column_count)
                                class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                            {
                                "No contributions recorded yet."
                            }
                        }
                    }
                }
            }
        }
    }
}

fn ledger_view(member: &Member, contributions: &[Contribution]) -> Markup {
    let nav_bar = NavBar::new(endpoints::LEDGER_VIEW, member.role).into_html();
    let totals = member_totals(contributions);
    let rows = running_totals(contributions);

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "My Contributions" }

                    a href=(endpoints::LEDGER_EXPORT) class=(LINK_STYLE) download
                    {
                        "Download CSV"
                    }
                }

                div class="grid gap-4 sm:grid-cols-3"
                {
                    (stat_card("Lifetime Total", &format_currency(totals.total), Some("Shares plus social fund")))
                    (stat_card("Shares", &format_currency(totals.shares), None))
                    (stat_card("Social Fund", &format_currency(totals.social_fund), None))
                }

                (ledger_table(&rows, None))
            }
        }
    };

    base("Ledger", &[], &content)
}

#[cfg(test)]
mod ledger_page_tests {
    use axum::{Extension, extract::State, http::StatusCode};
    use time::macros::date;

    use crate::{
        contribution::test_contributions::must_insert_row,
        member::{Role, test_members::must_create_member},
        test_utils::{
            assert_valid_html, must_get_table_rows, must_open_shared_test_db, parse_html_document,
            parse_text_body,
        },
    };

    use super::{LedgerState, get_ledger_export, get_ledger_page};

    fn get_test_state() -> LedgerState {
        LedgerState {
            db_connection: must_open_shared_test_db(),
            local_timezone: "Pacific/Guadalcanal".to_owned(),
        }
    }

    #[tokio::test]
    async fn shows_only_own_rows_with_running_total() {
        let state = get_test_state();
        let (member, other) = {
            let connection = state.db_connection.lock().unwrap();
            let member = must_create_member("Ana Ramo", Role::Member, &connection);
            let other = must_create_member("Ben Suri", Role::Member, &connection);
            let day = date!(2025 - 01 - 10);
            must_insert_row(member.id, 2, day, [20.0, 5.0, 0.0, 0.0, 0.0], &connection);
            must_insert_row(member.id, 1, day, [100.0, 50.0, 10.0, 0.0, 0.0], &connection);
            must_insert_row(other.id, 1, day, [999.0, 0.0, 0.0, 0.0, 0.0], &connection);
            (member, other)
        };

        let response = get_ledger_page(State(state), Extension(member.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let rows = must_get_table_rows(&document);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "1");
        assert_eq!(rows[0][7], "$150.00");
        assert_eq!(rows[1][8], "$175.00");
        let text = document.root_element().text().collect::<String>();
        assert!(!text.contains("$999.00"), "member {} rows leaked", other.id);
    }

    #[tokio::test]
    async fn export_is_csv_attachment() {
        let state = get_test_state();
        let member = {
            let connection = state.db_connection.lock().unwrap();
            let member = must_create_member("Ana Ramo", Role::Member, &connection);
            must_insert_row(
                member.id,
                1,
                date!(2025 - 01 - 10),
                [100.0, 50.0, 0.0, 0.0, 0.0],
                &connection,
            );
            member
        };

        let response = get_ledger_export(State(state), Extension(member.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .to_owned();
        assert!(disposition.starts_with("attachment; filename=\"contributions-"));
        let body = parse_text_body(response).await;
        assert_eq!(body.lines().count(), 2);
        assert!(body.lines().nth(1).unwrap().contains("150.00,150.00"));
    }
}
