//! The landing page for signed-in members.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};

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
        Contribution, MemberTotals, get_member_contributions, get_recent_contributions,
        member_totals, row_total,
    },
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency, format_date, stat_card,
    },
    member::{Member, MemberId, get_member},
    navigation::NavBar,
};

/// How many contributions the dashboard lists.
const RECENT_CONTRIBUTION_COUNT: u32 = 5;

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the signed-in member's dashboard.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(member_id): Extension<MemberId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let member = get_member(member_id, &connection)?;
    let contributions = get_member_contributions(member_id, &connection)?;
    let recent = get_recent_contributions(member_id, RECENT_CONTRIBUTION_COUNT, &connection)?;

    let totals = member_totals(&contributions);
    let fortnights = contributions
        .iter()
        .map(|contribution| contribution.fortnight)
        .collect::<BTreeSet<_>>()
        .len();

    Ok(dashboard_view(&member, &totals, fortnights, &recent).into_response())
}

fn recent_table(recent: &[Contribution]) -> Markup {
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
                        th scope="col" class=(TABLE_CELL_STYLE) { "Total" }
                    }
                }

                tbody
                {
                    @for contribution in recent {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (contribution.fortnight) }
                            td class=(TABLE_CELL_STYLE) { (format_date(contribution.date)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(contribution.shares)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(contribution.social_fund)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(row_total(contribution))) }
                        }
                    }

                    @if recent.is_empty() {
                        tr
                        {
                            td
                                colspan="5"
                                class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                            {
                                "No contributions yet."
                            }
                        }
                    }
                }
            }
        }
    }
}

fn dashboard_view(
    member: &Member,
    totals: &MemberTotals,
    fortnights: usize,
    recent: &[Contribution],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, member.role).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                h1 class="text-xl font-bold" { "Welcome, " (member.full_name) }

                div class="grid gap-4 sm:grid-cols-2 lg:grid-cols-5"
                {
                    (stat_card("Total Savings", &format_currency(totals.total), Some("Shares plus social fund")))
                    (stat_card("Shares", &format_currency(totals.shares), None))
                    (stat_card("Social Fund", &format_currency(totals.social_fund), None))
                    (stat_card("Outstanding Fee", &format_currency(totals.outstanding), None))
                    (stat_card("Fortnights Contributed", &fortnights.to_string(), None))
                }

                header class="flex justify-between flex-wrap items-end"
                {
                    h2 class="text-lg font-semibold" { "Recent Contributions" }
                    a href=(endpoints::LEDGER_VIEW) class=(LINK_STYLE) { "View full ledger" }
                }

                (recent_table(recent))
            }
        }
    };

    base("Dashboard", &[], &content)
}

#[cfg(test)]
mod dashboard_page_tests {
    use axum::{Extension, extract::State};
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        contribution::test_contributions::must_insert_row,
        member::{Role, test_members::must_create_member},
        test_utils::{
            assert_status_ok, assert_valid_html, must_get_table_rows, must_open_shared_test_db,
            parse_html_document,
        },
    };

    use super::{DashboardState, get_dashboard_page};

    fn stat_value(document: &scraper::Html, title: &str) -> String {
        let selector = Selector::parse(&format!("[data-stat-card=\"{title}\"] p")).unwrap();

        document
            .select(&selector)
            .next()
            .unwrap_or_else(|| panic!("No stat card titled {title}"))
            .text()
            .collect::<String>()
            .trim()
            .to_owned()
    }

    #[tokio::test]
    async fn shows_cards_and_five_most_recent() {
        let state = DashboardState {
            db_connection: must_open_shared_test_db(),
        };
        let member = {
            let connection = state.db_connection.lock().unwrap();
            let member = must_create_member("Ana Ramo", Role::Member, &connection);
            for fortnight in 1..=6 {
                must_insert_row(
                    member.id,
                    fortnight,
                    date!(2025 - 01 - 10),
                    [10.0, 5.0, 0.0, 0.0, 0.0],
                    &connection,
                );
            }
            member
        };

        let response = get_dashboard_page(State(state), Extension(member.id))
            .await
            .unwrap();

        assert_status_ok(&response);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        assert_eq!(stat_value(&document, "Total Savings"), "$90.00");
        assert_eq!(stat_value(&document, "Fortnights Contributed"), "6");
        let rows = must_get_table_rows(&document);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0][0], "6");
        assert_eq!(rows[4][0], "2");
        assert!(document.html().contains("Welcome, Ana Ramo"));
    }
}
