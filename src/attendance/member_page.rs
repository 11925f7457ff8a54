//! The signed-in member's attendance history.

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
    attendance::{Attendance, get_member_attendance},
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_date, stat_card,
    },
    member::{MemberId, Role, get_member},
    navigation::NavBar,
};

#[derive(Debug, Clone)]
pub struct AttendancePageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AttendancePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn get_attendance_page(
    State(state): State<AttendancePageState>,
    Extension(member_id): Extension<MemberId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let member = get_member(member_id, &connection)?;
    let records = get_member_attendance(member_id, &connection)?;

    Ok(attendance_view(member.role, &records).into_response())
}

fn status_badge(present: bool) -> Markup {
    let (style, text) = if present {
        (
            "bg-green-100 text-green-800 dark:bg-green-900/30 dark:text-green-300",
            "Present",
        )
    } else {
        (
            "bg-red-100 text-red-800 dark:bg-red-900/30 dark:text-red-300",
            "Absent",
        )
    };

    html! {
        span class={ "px-2 py-0.5 rounded text-xs font-medium " (style) } { (text) }
    }
}

fn attendance_view(role: Role, records: &[Attendance]) -> Markup {
    let nav_bar = NavBar::new(endpoints::ATTENDANCE_VIEW, role).into_html();
    let absences = records.iter().filter(|record| !record.present).count();
    let absences_caption = if absences == 1 {
        "Absent 1 time".to_owned()
    } else {
        format!("Absent {absences} times")
    };

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                h1 class="text-xl font-bold" { "My Attendance" }

                div class="grid gap-4 sm:grid-cols-2"
                {
                    (stat_card("Sessions", &records.len().to_string(), Some(&absences_caption)))
                    (stat_card("Absences", &absences.to_string(), None))
                }

                @if absences > 0 {
                    p class="text-sm text-red-600 dark:text-red-400"
                    {
                        "Please settle any associated fees in "
                        a href=(endpoints::SETTLEMENTS_VIEW) class=(LINK_STYLE) { "Settlements" }
                        "."
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Fortnight" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Notes" }
                            }
                        }

                        tbody
                        {
                            @for record in records {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (record.fortnight) }
                                    td class=(TABLE_CELL_STYLE) { (format_date(record.date)) }
                                    td class=(TABLE_CELL_STYLE) { (status_badge(record.present)) }
                                    td class=(TABLE_CELL_STYLE) { (record.notes.as_deref().unwrap_or("-")) }
                                }
                            }

                            @if records.is_empty() {
                                tr
                                {
                                    td
                                        colspan="4"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No attendance recorded yet."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Attendance", &[], &content)
}
