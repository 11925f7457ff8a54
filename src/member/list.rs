//! The administrator's member list, with a form for adding members.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{
        CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base,
    },
    member::{
        Member, Role,
        create::{MemberFormData, create_member_form_view},
        get_all_members,
    },
    navigation::NavBar,
};

/// The state needed for the members page.
#[derive(Debug, Clone)]
pub struct MembersPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for MembersPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the list of members.
pub async fn get_members_page(State(state): State<MembersPageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let members = get_all_members(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve members: {error}"))?;

    Ok(members_view(&members).into_response())
}

fn members_view(members: &[Member]) -> Markup {
    let nav_bar = NavBar::new(endpoints::MEMBERS_VIEW, Role::Admin).into_html();

    let table_row = |member: &Member| {
        let member_url = endpoints::format_endpoint(endpoints::MEMBER_VIEW, member.id.as_i64());
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_MEMBER_VIEW, member.id.as_i64());

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                th scope="row" class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
                {
                    a href=(member_url) class=(LINK_STYLE) { (member.full_name) }
                }
                td class=(TABLE_CELL_STYLE) { (member.email) }
                td class=(TABLE_CELL_STYLE) { (member.role) }
                td class=(TABLE_CELL_STYLE) { (member.address.as_deref().unwrap_or("-")) }
                td class=(TABLE_CELL_STYLE)
                {
                    a href=(edit_url) class=(LINK_STYLE) { "Edit" }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Members" }
                    span class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        (members.len()) " registered"
                    }
                }

                div class="overflow-x-auto dark:bg-gray-800"
                {
                    table class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Role" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Address" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for member in members {
                                (table_row(member))
                            }

                            @if members.is_empty() {
                                tr
                                {
                                    td
                                        colspan="5"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No members yet. Add the first one below."
                                    }
                                }
                            }
                        }
                    }
                }
            }

            section class={ (CARD_STYLE) " max-w-md" }
            {
                h2 class="mb-4 text-lg font-semibold" { "Add Member" }

                (create_member_form_view(&MemberFormData::default(), ""))
            }
        }
    );

    base("Members", &[], &content)
}

#[cfg(test)]
mod members_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode};

    use crate::{
        endpoints,
        member::{Role, test_members::must_create_member},
        test_utils::{
            assert_form_input, assert_hx_endpoint, assert_valid_html, must_get_form,
            must_get_table_rows, must_open_test_db, parse_html_document,
        },
    };

    use super::{MembersPageState, get_members_page};

    #[tokio::test]
    async fn lists_members_by_name() {
        let connection = must_open_test_db();
        must_create_member("Zed Pita", Role::Member, &connection);
        must_create_member("Alice Sade", Role::Admin, &connection);
        let state = MembersPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_members_page(State(state)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let rows = must_get_table_rows(&document);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0][..4],
            ["Alice Sade", "alice.sade@club.test", "admin", "-"]
        );
        assert_eq!(rows[1][0], "Zed Pita");
    }

    #[tokio::test]
    async fn shows_create_form() {
        let state = MembersPageState {
            db_connection: Arc::new(Mutex::new(must_open_test_db())),
        };

        let response = get_members_page(State(state)).await.unwrap();

        let document = parse_html_document(response).await;
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::POST_MEMBER, "hx-post");
        assert_form_input(&form, "full_name", "text");
        assert_form_input(&form, "email", "email");
        assert_form_input(&form, "password", "password");
        let rows = must_get_table_rows(&document);
        assert_eq!(rows.len(), 1, "want a single placeholder row");
    }
}
