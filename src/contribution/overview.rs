//! The club-wide contributions overview for administrators.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    contribution::{
        MemberTotals,
        export::{GRAND_TOTAL_LABEL, csv_attachment, totals_csv},
        get_all_contributions, grand_totals, totals_by_member,
    },
    endpoints::{self, format_endpoint},
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        TABLE_TOTAL_ROW_STYLE, base, format_currency,
    },
    member::{Member, Role, get_all_members},
    navigation::NavBar,
    timezone::local_today,
};

/// The state needed for the overview page and its download.
#[derive(Debug, Clone)]
pub struct OverviewState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for OverviewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Every member in name order with their totals, and the grand total.
///
/// Members without contributions are included with zero totals.
fn load_totals(state: &OverviewState) -> Result<(Vec<(Member, MemberTotals)>, MemberTotals), Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let members = get_all_members(&connection)?;
    let contributions = get_all_contributions(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve contributions: {error}"))?;
    let mut totals = totals_by_member(&contributions);

    let per_member: Vec<_> = members
        .into_iter()
        .map(|member| {
            let member_totals = totals.remove(&member.id).unwrap_or_default();
            (member, member_totals)
        })
        .collect();
    let grand = grand_totals(per_member.iter().map(|(_, totals)| totals));

    Ok((per_member, grand))
}

/// Render the per-member totals table.
pub async fn get_overview_page(State(state): State<OverviewState>) -> Result<Response, Error> {
    let (per_member, grand) = load_totals(&state)?;

    Ok(overview_view(&per_member, &grand).into_response())
}

/// Download the per-member totals as CSV.
pub async fn get_overview_export(State(state): State<OverviewState>) -> Result<Response, Error> {
    let (per_member, grand) = load_totals(&state)?;
    let today = local_today(&state.local_timezone)?;

    let named: Vec<_> = per_member
        .into_iter()
        .map(|(member, totals)| (member.full_name, totals))
        .collect();
    let csv = totals_csv(&named, &grand)?;

    Ok(csv_attachment("club-contributions", today, csv))
}

fn totals_cells(totals: &MemberTotals) -> Markup {
    html! {
        td class=(TABLE_CELL_STYLE) { (format_currency(totals.shares)) }
        td class=(TABLE_CELL_STYLE) { (format_currency(totals.social_fund)) }
        td class=(TABLE_CELL_STYLE) { (format_currency(totals.late_fee)) }
        td class=(TABLE_CELL_STYLE) { (format_currency(totals.absent_fee)) }
        td class=(TABLE_CELL_STYLE) { (format_currency(totals.outstanding)) }
        td class=(TABLE_CELL_STYLE) { (format_currency(totals.total)) }
    }
}

fn overview_view(per_member: &[(Member, MemberTotals)], grand: &MemberTotals) -> Markup {
    let nav_bar = NavBar::new(endpoints::CONTRIBUTIONS_OVERVIEW_VIEW, Role::Admin).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Club Contributions" }

                    a href=(endpoints::CONTRIBUTIONS_OVERVIEW_EXPORT) class=(LINK_STYLE) download
                    {
                        "Download CSV"
                    }
                }

                div class="overflow-x-auto dark:bg-gray-800"
                {
                    table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Member" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Shares" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Social Fund" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Late Fees" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Absent Fees" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Outstanding" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Total" }
                            }
                        }

                        tbody
                        {
                            @for (member, totals) in per_member {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    th scope="row" class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
                                    {
                                        a
                                            href=(format_endpoint(endpoints::MEMBER_VIEW, member.id.as_i64()))
                                            class=(LINK_STYLE)
                                        {
                                            (member.full_name)
                                        }
                                    }
                                    (totals_cells(totals))
                                }
                            }

                            @if per_member.is_empty() {
                                tr
                                {
                                    td
                                        colspan="7"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No members yet."
                                    }
                                }
                            }
                        }

                        tfoot
                        {
                            tr class=(TABLE_TOTAL_ROW_STYLE)
                            {
                                th scope="row" class=(TABLE_CELL_STYLE) { (GRAND_TOTAL_LABEL) }
                                (totals_cells(grand))
                            }
                        }
                    }
                }
            }
        }
    };

    base("Contributions", &[], &content)
}
