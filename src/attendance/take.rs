//! Taking attendance for a fortnight.
//!
//! The form has one checkbox `present_<member id>` and one text input
//! `notes_<member id>` per member, so it is read as a list of key-value
//! pairs rather than into a fixed struct.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    attendance::{Attendance, AttendanceEntry, get_fortnight_attendance, save_attendance},
    endpoints,
    fortnight::Fortnight,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base, format_date, fortnight_input,
    },
    member::{Member, MemberId, Role, get_all_members},
    navigation::NavBar,
    timezone::local_today,
};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The state needed for taking attendance.
#[derive(Debug, Clone)]
pub struct TakeAttendanceState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for TakeAttendanceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AttendanceQuery {
    pub fortnight: Option<i64>,
}

/// Render the attendance form, prefilled with the saved attendance of the
/// fortnight in the query string.
pub async fn get_take_attendance_page(
    State(state): State<TakeAttendanceState>,
    Query(query): Query<AttendanceQuery>,
) -> Result<Response, Error> {
    let fortnight = query.fortnight.and_then(|value| {
        Fortnight::new(value)
            .inspect_err(|error| tracing::warn!("ignoring attendance query: {error}"))
            .ok()
    });
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let members = get_all_members(&connection)?;
    let saved = match fortnight {
        Some(fortnight) => get_fortnight_attendance(fortnight, &connection)?,
        None => Vec::new(),
    };

    Ok(take_attendance_view(&members, fortnight, &saved, today).into_response())
}

fn member_row(member: &Member, saved: Option<&Attendance>) -> Markup {
    let present_name = format!("present_{}", member.id);
    let notes_name = format!("notes_{}", member.id);
    // Members without a saved record default to present.
    let present = saved.is_none_or(|record| record.present);
    let notes = saved.and_then(|record| record.notes.as_deref());

    html! {
        div
            class="flex flex-wrap items-center gap-4 p-4 border rounded-lg border-gray-200 dark:border-gray-700"
            data-member-id=(member.id)
        {
            p class="flex-1 font-medium" { (member.full_name) }

            div class="flex items-center gap-2"
            {
                input
                    id=(present_name)
                    type="checkbox"
                    name=(present_name)
                    value="true"
                    checked[present]
                    class="w-4 h-4";

                label for=(present_name) class="text-sm" { "Present" }
            }

            input
                type="text"
                name=(notes_name)
                aria-label={ "Notes for " (member.full_name) }
                value=[notes]
                placeholder="Notes (optional)"
                class={ (FORM_TEXT_INPUT_STYLE) " max-w-xs" };
        }
    }
}

fn take_attendance_view(
    members: &[Member],
    fortnight: Option<Fortnight>,
    saved: &[Attendance],
    today: Date,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADMIN_ATTENDANCE_VIEW, Role::Admin).into_html();
    let saved_by_member: HashMap<MemberId, &Attendance> =
        saved.iter().map(|record| (record.member_id, record)).collect();
    let date = saved.first().map(|record| record.date).unwrap_or(today);

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold" { "Take Attendance" }

                    form method="get" action=(endpoints::ADMIN_ATTENDANCE_VIEW) class="flex items-end gap-2"
                    {
                        div
                        {
                            label for="load_fortnight" class=(FORM_LABEL_STYLE) { "Load fortnight" }
                            input
                                id="load_fortnight"
                                type="number"
                                name="fortnight"
                                min="1"
                                max="23"
                                value=[fortnight.map(Fortnight::as_i64)]
                                class=(FORM_TEXT_INPUT_STYLE);
                        }

                        button type="submit" class={ (BUTTON_SECONDARY_STYLE) " w-auto mb-0" } { "Load" }
                    }
                }

                section class=(CARD_STYLE)
                {
                    form
                        hx-post=(endpoints::POST_ATTENDANCE)
                        hx-target-error="#alert-container"
                        class="w-full space-y-4 md:space-y-6"
                    {
                        div class="grid gap-4 md:grid-cols-2"
                        {
                            (fortnight_input(fortnight.map(Fortnight::as_i64)))

                            div
                            {
                                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                                input
                                    id="date"
                                    type="date"
                                    name="date"
                                    value=(format_date(date))
                                    required
                                    class=(FORM_TEXT_INPUT_STYLE);
                            }
                        }

                        h2 class="text-lg font-semibold" { "Members (" (members.len()) ")" }

                        div class="space-y-4"
                        {
                            @for member in members {
                                (member_row(member, saved_by_member.get(&member.id).copied()))
                            }

                            @if members.is_empty() {
                                p class="p-8 text-center text-gray-500 dark:text-gray-400" { "No members yet" }
                            }
                        }

                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Attendance" }
                    }
                }
            }
        }
    };

    base("Take Attendance", &[], &content)
}

/// Read the fortnight, date and per-member entries from the submitted fields.
///
/// Every member gets an entry. A member whose `present_<id>` field is
/// missing is recorded as absent, since browsers omit unchecked checkboxes.
fn parse_attendance_form(
    fields: &[(String, String)],
    members: &[Member],
) -> Result<(Fortnight, Date, Vec<AttendanceEntry>), Error> {
    let fields: HashMap<&str, &str> = fields
        .iter()
        .map(|(key, value)| (key.as_str(), value.trim()))
        .collect();

    let fortnight = fields
        .get("fortnight")
        .ok_or_else(|| Error::InvalidInput("Fortnight is required".to_owned()))?
        .parse::<i64>()
        .map_err(|_| Error::InvalidInput("Fortnight must be a number".to_owned()))
        .and_then(Fortnight::new)?;

    let date = fields
        .get("date")
        .ok_or_else(|| Error::InvalidInput("Date is required".to_owned()))
        .and_then(|date| {
            Date::parse(date, DATE_FORMAT)
                .map_err(|_| Error::InvalidInput(format!("\"{date}\" is not a valid date")))
        })?;

    let entries = members
        .iter()
        .map(|member| {
            let present = fields
                .get(format!("present_{}", member.id).as_str())
                .is_some_and(|value| matches!(*value, "true" | "on"));
            let notes = fields
                .get(format!("notes_{}", member.id).as_str())
                .filter(|notes| !notes.is_empty())
                .map(|notes| notes.to_string());

            AttendanceEntry {
                member_id: member.id,
                present,
                notes,
            }
        })
        .collect();

    Ok((fortnight, date, entries))
}

/// Save attendance for every member and reload the form for the fortnight.
pub async fn save_attendance_endpoint(
    State(state): State<TakeAttendanceState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let members = match get_all_members(&connection) {
        Ok(members) => members,
        Err(error) => return error.into_alert_response(),
    };

    let (fortnight, date, entries) = match parse_attendance_form(&fields, &members) {
        Ok(parsed) => parsed,
        Err(error) => {
            tracing::warn!("rejected attendance form: {error}");
            return error.into_alert_response();
        }
    };

    match save_attendance(fortnight, date, &entries, &connection) {
        Ok(count) => {
            tracing::info!("saved attendance of {count} members for fortnight {fortnight}");
            (
                HxRedirect(format!(
                    "{}?fortnight={fortnight}",
                    endpoints::ADMIN_ATTENDANCE_VIEW
                )),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}
