//! The administrator's club-wide dashboard.

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
        MemberTotals, average_total_per_member, fortnight_totals, get_all_contributions,
        grand_totals, totals_by_member,
    },
    endpoints,
    html::{PAGE_CONTAINER_STYLE, base, format_currency, stat_card},
    member::{Role, count_members},
    navigation::NavBar,
};

use super::chart::{DashboardChart, chart_container, chart_head_elements, fortnight_collections_chart};

#[derive(Debug, Clone)]
pub struct AdminDashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminDashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Club-wide figures shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClubSummary {
    member_count: usize,
    totals: MemberTotals,
    /// Club total divided by member count, zero when there are no members.
    average_per_member: f64,
}

impl ClubSummary {
    fn new(member_count: usize, totals: MemberTotals) -> Self {
        Self {
            member_count,
            totals,
            average_per_member: average_total_per_member(&totals, member_count),
        }
    }
}

pub async fn get_admin_dashboard_page(
    State(state): State<AdminDashboardState>,
) -> Result<Response, Error> {
    let (summary, chart) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let member_count = count_members(&connection)?;
        let contributions = get_all_contributions(&connection)?;
        let totals = grand_totals(totals_by_member(&contributions).values());

        (
            ClubSummary::new(member_count, totals),
            fortnight_collections_chart(&fortnight_totals(&contributions)),
        )
    };

    Ok(admin_dashboard_view(&summary, &chart).into_response())
}

fn summary_cards(summary: &ClubSummary) -> Markup {
    let totals = &summary.totals;

    html! {
        div class="grid gap-4 sm:grid-cols-2 lg:grid-cols-4"
        {
            (stat_card("Members", &summary.member_count.to_string(), None))
            (stat_card("Total Shares", &format_currency(totals.shares), None))
            (stat_card("Total Social Fund", &format_currency(totals.social_fund), None))
            (stat_card("Club Total", &format_currency(totals.total), Some("Shares plus social fund")))
            (stat_card("Average per Member", &format_currency(summary.average_per_member), None))
            (stat_card("Late Fees", &format_currency(totals.late_fee), None))
            (stat_card("Absent Fees", &format_currency(totals.absent_fee), None))
            (stat_card("Outstanding Fees", &format_currency(totals.outstanding), None))
        }
    }
}

fn admin_dashboard_view(summary: &ClubSummary, chart: &DashboardChart) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADMIN_DASHBOARD_VIEW, Role::Admin).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                h1 class="text-xl font-bold" { "Club Dashboard" }

                (summary_cards(summary))
                (chart_container(chart))
            }
        }
    };

    base("Admin Dashboard", &chart_head_elements(chart), &content)
}
