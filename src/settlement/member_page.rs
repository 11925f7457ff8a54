//! The signed-in member's outstanding fee and payment history.

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
    contribution::{Contribution, get_member_contributions, member_totals},
    endpoints,
    html::{
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency, format_date, stat_card,
    },
    member::{MemberId, Role, get_member},
    navigation::NavBar,
    settlement::{Payment, get_member_payments},
};

/// The state needed for the member's settlements page.
#[derive(Debug, Clone)]
pub struct SettlementsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettlementsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the signed-in member's outstanding fee and payments.
pub async fn get_settlements_page(
    State(state): State<SettlementsPageState>,
    Extension(member_id): Extension<MemberId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let member = get_member(member_id, &connection)?;
    let contributions = get_member_contributions(member_id, &connection)?;
    let payments = get_member_payments(member_id, &connection)?;

    Ok(settlements_view(member.role, &contributions, &payments).into_response())
}

fn settlements_view(role: Role, contributions: &[Contribution], payments: &[Payment]) -> Markup {
    let nav_bar = NavBar::new(endpoints::SETTLEMENTS_VIEW, role).into_html();
    let outstanding = member_totals(contributions).outstanding;
    let owing_rows: Vec<_> = contributions
        .iter()
        .filter(|contribution| contribution.outstanding_fee > 0.0)
        .collect();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                h1 class="text-xl font-bold" { "Settlements" }

                div class="grid gap-4 sm:grid-cols-2"
                {
                    (stat_card("Outstanding Fee", &format_currency(outstanding), None))
                    (stat_card("Payments Made", &payments.len().to_string(), None))
                }

                @if outstanding > 0.0 {
                    p class="text-sm text-red-600 dark:text-red-400"
                    {
                        "Please settle your outstanding fee with a club administrator."
                    }
                }

                @if !owing_rows.is_empty() {
                    h2 class="text-lg font-semibold" { "Fees Owing" }

                    ul class="space-y-1 text-sm"
                    {
                        @for row in &owing_rows {
                            li
                            {
                                "Fortnight " (row.fortnight) " (" (format_date(row.date)) "): "
                                span class="font-semibold" { (format_currency(row.outstanding_fee)) }
                            }
                        }
                    }
                }

                h2 class="text-lg font-semibold" { "Payment History" }

                div class="overflow-x-auto dark:bg-gray-800"
                {
                    table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Notes" }
                            }
                        }

                        tbody
                        {
                            @for payment in payments {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (format_date(payment.payment_date)) }
                                    td class=(TABLE_CELL_STYLE) { (format_currency(payment.amount)) }
                                    td class=(TABLE_CELL_STYLE) { (payment.notes.as_deref().unwrap_or("-")) }
                                }
                            }

                            @if payments.is_empty() {
                                tr
                                {
                                    td
                                        colspan="3"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No payments yet."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Settlements", &[], &content)
}
