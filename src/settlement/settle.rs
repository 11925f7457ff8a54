//! The administrator's settlement page and the endpoint that records payments.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    contribution::{
        DEFAULT_SETTLEMENT_NOTE, MemberTotals, Settlement, get_all_contributions, settle_payment,
        totals_by_member,
    },
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    member::{Member, MemberId, Role, get_all_members},
    navigation::NavBar,
    timezone::local_today,
};

/// The state needed for settling payments.
#[derive(Debug, Clone)]
pub struct SettleState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for SettleState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render every member's outstanding fee with a settle form for those who owe.
pub async fn get_admin_settlements_page(
    State(state): State<SettleState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let members = get_all_members(&connection)?;
    let totals = totals_by_member(&get_all_contributions(&connection)?);

    let balances: Vec<_> = members
        .iter()
        .map(|member| {
            let outstanding = totals
                .get(&member.id)
                .map(|totals: &MemberTotals| totals.outstanding)
                .unwrap_or_default();
            (member, outstanding)
        })
        .collect();

    Ok(admin_settlements_view(&balances).into_response())
}

fn settle_form(member_id: MemberId, outstanding: f64) -> Markup {
    html! {
        form
            hx-post=(format_endpoint(endpoints::POST_SETTLEMENT, member_id.as_i64()))
            hx-target-error="#alert-container"
            class="flex flex-wrap items-center gap-2"
        {
            input
                type="number"
                name="amount"
                aria-label="Amount"
                min="0.01"
                step="0.01"
                value=(format!("{outstanding:.2}"))
                required
                class={ (FORM_TEXT_INPUT_STYLE) " max-w-32" };

            input
                type="text"
                name="notes"
                aria-label="Notes"
                placeholder=(DEFAULT_SETTLEMENT_NOTE)
                class={ (FORM_TEXT_INPUT_STYLE) " max-w-48" };

            button type="submit" class={ (BUTTON_PRIMARY_STYLE) " w-auto" } { "Settle" }
        }
    }
}

fn admin_settlements_view(balances: &[(&Member, f64)]) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADMIN_SETTLEMENTS_VIEW, Role::Admin).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                h1 class="text-xl font-bold" { "Settle Outstanding Fees" }

                div class="overflow-x-auto dark:bg-gray-800"
                {
                    table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Member" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Outstanding" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Settle" }
                            }
                        }

                        tbody
                        {
                            @for (member, outstanding) in balances {
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
                                    td class=(TABLE_CELL_STYLE) { (format_currency(*outstanding)) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        @if *outstanding > 0.0 {
                                            (settle_form(member.id, *outstanding))
                                        } @else {
                                            "Nothing owing"
                                        }
                                    }
                                }
                            }

                            @if balances.is_empty() {
                                tr
                                {
                                    td
                                        colspan="3"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No members yet."
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

/// The fields of the settle form.
#[derive(Debug, Deserialize)]
pub struct SettleForm {
    pub amount: f64,
    pub notes: Option<String>,
}

/// Record a payment from a member, dated today in the club's timezone.
///
/// The signed-in administrator is recorded as the creator of the payment.
pub async fn settle_payment_endpoint(
    Path(member_id): Path<MemberId>,
    State(state): State<SettleState>,
    Extension(admin_id): Extension<MemberId>,
    Form(form): Form<SettleForm>,
) -> Response {
    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };

    let settlement = Settlement {
        member_id,
        amount: form.amount,
        date: today,
        notes: form.notes,
        created_by: admin_id,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match settle_payment(settlement, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::ADMIN_SETTLEMENTS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => error.into_alert_response(),
    }
}
