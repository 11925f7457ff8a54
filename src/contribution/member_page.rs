//! The administrator's view of one member: totals, history and the forms that
//! change the member's contributions.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    contribution::{
        Contribution, MemberTotals, get_member_contributions, ledger::ledger_table,
        member_totals, running_totals,
    },
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE,
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base,
        format_currency, format_date, fortnight_input, money_input, stat_card,
    },
    member::{Member, MemberId, Role, get_member},
    navigation::NavBar,
    timezone::local_today,
};

/// The state needed for the member page.
#[derive(Debug, Clone)]
pub struct MemberPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for MemberPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the page for the member with `member_id`.
pub async fn get_member_page(
    Path(member_id): Path<MemberId>,
    State(state): State<MemberPageState>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let member = get_member(member_id, &connection)?;
    let contributions = get_member_contributions(member_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve contributions: {error}"))?;

    Ok(member_view(&member, &contributions, today).into_response())
}

fn delete_button(contribution: &Contribution) -> Markup {
    html! {
        button
            hx-delete=(format_endpoint(endpoints::DELETE_CONTRIBUTION, contribution.id))
            hx-confirm={
                "Delete the contribution for fortnight " (contribution.fortnight)
                "? Any outstanding fee on it moves to the member's latest contribution."
            }
            hx-target-error="#alert-container"
            class=(BUTTON_DELETE_STYLE)
        {
            "Delete"
        }
    }
}

fn date_input(today: Date) -> Markup {
    html! {
        div
        {
            label for="date" class=(FORM_LABEL_STYLE) { "Date" }

            input
                id="date"
                type="date"
                name="date"
                value=(format_date(today))
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

fn contribution_form(member_id: MemberId, today: Date) -> Markup {
    html! {
        form
            hx-post=(format_endpoint(endpoints::POST_CONTRIBUTION, member_id.as_i64()))
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div class="grid gap-4 sm:grid-cols-2"
            {
                (fortnight_input(None))
                (date_input(today))
                (money_input("shares", "Shares", "0", false))
                (money_input("social_fund", "Social fund", "0", false))
                (money_input("late_fee", "Late fee", "0", false))
                (money_input("absent_fee", "Absent fee", "0", false))
            }

            div
            {
                label for="notes" class=(FORM_LABEL_STYLE) { "Notes" }

                input
                    id="notes"
                    type="text"
                    name="notes"
                    placeholder="Optional"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Contribution" }
        }
    }
}

fn fee_form(member_id: MemberId, today: Date) -> Markup {
    html! {
        form
            hx-post=(format_endpoint(endpoints::POST_FEE, member_id.as_i64()))
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (money_input("amount", "Amount", "0.01", true))

            div
            {
                label for="reason" class=(FORM_LABEL_STYLE) { "Reason" }

                input
                    id="reason"
                    type="text"
                    name="reason"
                    placeholder="e.g. Missed meeting"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            p class="text-sm text-gray-500 dark:text-gray-400"
            {
                "The fortnight and date are only used when the member has no contributions yet."
            }

            div class="grid gap-4 sm:grid-cols-2"
            {
                (fortnight_input(Some(1)))
                (date_input(today))
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Fee" }
        }
    }
}

fn totals_cards(totals: &MemberTotals, fortnights: usize) -> Markup {
    html! {
        div class="grid gap-4 sm:grid-cols-2 lg:grid-cols-4"
        {
            (stat_card("Total Savings", &format_currency(totals.total), Some("Shares plus social fund")))
            (stat_card("Shares", &format_currency(totals.shares), None))
            (stat_card("Social Fund", &format_currency(totals.social_fund), None))
            (stat_card("Outstanding Fee", &format_currency(totals.outstanding), None))
            (stat_card("Late Fees", &format_currency(totals.late_fee), None))
            (stat_card("Absent Fees", &format_currency(totals.absent_fee), None))
            (stat_card("Fortnights", &fortnights.to_string(), Some("Contributions recorded")))
        }
    }
}

fn member_view(member: &Member, contributions: &[Contribution], today: Date) -> Markup {
    let nav_bar = NavBar::new(endpoints::MEMBERS_VIEW, Role::Admin).into_html();
    let totals = member_totals(contributions);
    let rows = running_totals(contributions);
    let edit_url = format_endpoint(endpoints::EDIT_MEMBER_VIEW, member.id.as_i64());
    let reset_link_url = format_endpoint(endpoints::MEMBER_RESET_LINK, member.id.as_i64());

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    div
                    {
                        h1 class="text-xl font-bold" { (member.full_name) }
                        p class="text-sm text-gray-500 dark:text-gray-400"
                        {
                            (member.email) " · " (member.role)
                            @if let Some(address) = &member.address {
                                " · " (address)
                            }
                        }
                    }

                    div class="flex items-center gap-4"
                    {
                        a href=(edit_url) class=(LINK_STYLE) { "Edit" }

                        button
                            hx-post=(reset_link_url)
                            hx-target="#alert-container"
                            hx-target-error="#alert-container"
                            class={ (BUTTON_SECONDARY_STYLE) " w-auto" }
                        {
                            "Create Reset Link"
                        }
                    }
                }

                (totals_cards(&totals, contributions.len()))

                h2 class="text-lg font-semibold" { "Contribution History" }

                (ledger_table(&rows, Some(&delete_button)))
            }

            div class="grid gap-4 lg:grid-cols-2"
            {
                section class=(CARD_STYLE)
                {
                    h2 class="mb-4 text-lg font-semibold" { "Add Contribution" }

                    (contribution_form(member.id, today))
                }

                section class=(CARD_STYLE)
                {
                    h2 class="mb-4 text-lg font-semibold" { "Add Outstanding Fee" }

                    (fee_form(member.id, today))
                }
            }
        }
    };

    base(&member.full_name, &[], &content)
}

#[cfg(test)]
mod member_page_tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
    };
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        Error,
        contribution::test_contributions::must_insert_row,
        endpoints::{self, format_endpoint},
        member::{MemberId, Role, test_members::must_create_member},
        test_utils::{
            assert_hx_endpoint, assert_form_input, assert_form_submit_button_with_text,
            assert_valid_html, must_get_table_rows, must_open_shared_test_db,
            parse_html_document,
        },
    };

    use super::{MemberPageState, get_member_page};

    fn get_test_state() -> MemberPageState {
        MemberPageState {
            db_connection: must_open_shared_test_db(),
            local_timezone: "Pacific/Guadalcanal".to_owned(),
        }
    }

    #[tokio::test]
    async fn shows_history_with_delete_buttons() {
        let state = get_test_state();
        let (member, row_id) = {
            let connection = state.db_connection.lock().unwrap();
            let member = must_create_member("Ana Ramo", Role::Member, &connection);
            let row_id = must_insert_row(
                member.id,
                3,
                date!(2025 - 02 - 07),
                [40.0, 10.0, 5.0, 0.0, 5.0],
                &connection,
            );
            (member, row_id)
        };

        let response = get_member_page(Path(member.id), State(state)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let rows = must_get_table_rows(&document);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][6], "$5.00");
        assert_eq!(rows[0][8], "$50.00");

        let delete_selector = Selector::parse("button[hx-delete]").unwrap();
        let delete_button = document
            .select(&delete_selector)
            .next()
            .expect("No delete button found");
        assert_eq!(
            delete_button.value().attr("hx-delete"),
            Some(format_endpoint(endpoints::DELETE_CONTRIBUTION, row_id).as_str())
        );
        assert!(delete_button.value().attr("hx-confirm").is_some());
    }

    #[tokio::test]
    async fn has_contribution_and_fee_forms() {
        let state = get_test_state();
        let member = {
            let connection = state.db_connection.lock().unwrap();
            must_create_member("Ana Ramo", Role::Member, &connection)
        };

        let response = get_member_page(Path(member.id), State(state)).await.unwrap();

        let document = parse_html_document(response).await;
        let form_selector = Selector::parse("form").unwrap();
        let forms: Vec<_> = document.select(&form_selector).collect();
        assert_eq!(forms.len(), 2);

        let contribution_form = forms[0];
        assert_hx_endpoint(
            &contribution_form,
            &format_endpoint(endpoints::POST_CONTRIBUTION, member.id.as_i64()),
            "hx-post",
        );
        assert_form_input(&contribution_form, "fortnight", "number");
        assert_form_input(&contribution_form, "date", "date");
        assert_form_submit_button_with_text(&contribution_form, "Add Contribution");

        let fee_form = forms[1];
        assert_hx_endpoint(
            &fee_form,
            &format_endpoint(endpoints::POST_FEE, member.id.as_i64()),
            "hx-post",
        );
        assert_form_input(&fee_form, "amount", "number");
        assert_form_submit_button_with_text(&fee_form, "Add Fee");

        let reset_selector = Selector::parse("button[hx-post]").unwrap();
        let reset_button = document.select(&reset_selector).next().unwrap();
        assert_eq!(
            reset_button.value().attr("hx-post"),
            Some(format_endpoint(endpoints::MEMBER_RESET_LINK, member.id.as_i64()).as_str())
        );
    }

    #[tokio::test]
    async fn unknown_member_is_not_found() {
        let result = get_member_page(Path(MemberId::new(404)), State(get_test_state())).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }
}
