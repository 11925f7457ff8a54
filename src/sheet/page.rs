//! The contribution sheets page, with uploading and deleting sheets.

use std::{
    path::Path as FilePath,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Multipart, Path, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::Alert,
    database_id::DatabaseId,
    endpoints::{self, format_endpoint},
    fortnight::Fortnight,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base, format_currency,
        format_date, fortnight_input,
    },
    member::{MemberId, Role},
    navigation::NavBar,
    sheet::{ContributionSheet, NewSheet, SheetStorage, delete_sheet, get_all_sheets, get_sheet, insert_sheet},
    timezone::local_today,
};

/// The largest signed sheet upload accepted, in bytes.
///
/// Phone photos of a sheet are often several megabytes, well over axum's
/// default request body limit.
pub const MAX_SHEET_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// The state needed for managing contribution sheets.
#[derive(Debug, Clone)]
pub struct SheetsState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
    pub sheet_storage: Arc<dyn SheetStorage>,
}

impl FromRef<AppState> for SheetsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            sheet_storage: state.sheet_storage.clone(),
        }
    }
}

pub async fn get_sheets_page(State(state): State<SheetsState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let sheets = get_all_sheets(&connection)?;

    Ok(sheets_view(&sheets, state.sheet_storage.as_ref()).into_response())
}

fn upload_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_SHEET)
            hx-encoding="multipart/form-data"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div class="grid gap-4 md:grid-cols-3"
            {
                (fortnight_input(None))

                div
                {
                    label for="total_collected" class=(FORM_LABEL_STYLE) { "Total collected (optional)" }

                    input
                        id="total_collected"
                        type="number"
                        name="total_collected"
                        min="0"
                        step="0.01"
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="signed_sheet" class=(FORM_LABEL_STYLE) { "Signed sheet photo or scan" }

                    input
                        id="signed_sheet"
                        type="file"
                        name="signed_sheet"
                        accept="image/*,.pdf"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label for="notes" class=(FORM_LABEL_STYLE) { "Notes (optional)" }

                input
                    id="notes"
                    type="text"
                    name="notes"
                    placeholder="e.g. Collected by John, 15 members present"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Upload Sheet" }
        }
    }
}

fn sheet_item(sheet: &ContributionSheet, storage: &dyn SheetStorage) -> Markup {
    html! {
        li class="flex justify-between items-start gap-4 p-4 border rounded-lg border-gray-200 dark:border-gray-700"
        {
            div
            {
                p class="font-medium" { "Fortnight " (sheet.fortnight) }
                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "Uploaded on " (format_date(sheet.upload_date))
                }

                @if let Some(total) = sheet.total_collected {
                    p class="text-sm font-medium mt-1" { "Reported total: " (format_currency(total)) }
                }

                @if let Some(notes) = &sheet.notes {
                    p class="text-sm mt-1" { (notes) }
                }

                a
                    href=(storage.url(&sheet.file_name))
                    target="_blank"
                    class={ (LINK_STYLE) " text-sm" }
                {
                    "View sheet"
                }
            }

            button
                hx-delete=(format_endpoint(endpoints::DELETE_SHEET, sheet.id))
                hx-confirm={ "Delete the sheet for fortnight " (sheet.fortnight) "? This cannot be undone." }
                hx-target="closest li"
                hx-target-error="#alert-container"
                hx-swap="delete"
                class=(BUTTON_DELETE_STYLE)
            {
                "Delete"
            }
        }
    }
}

fn sheets_view(sheets: &[ContributionSheet], storage: &dyn SheetStorage) -> Markup {
    let nav_bar = NavBar::new(endpoints::SHEETS_VIEW, Role::Admin).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                h1 class="text-xl font-bold" { "Fortnightly Contribution Sheets" }
                p class="text-gray-500 dark:text-gray-400"
                {
                    "Upload a photo or scan of the signed collection list each fortnight."
                }

                section class=(CARD_STYLE)
                {
                    h2 class="mb-4 text-lg font-semibold" { "Upload Signed Sheet" }

                    (upload_form())
                }

                section class=(CARD_STYLE)
                {
                    h2 class="mb-4 text-lg font-semibold" { "Previous Sheets" }

                    @if sheets.is_empty() {
                        p class="p-8 text-center text-gray-500 dark:text-gray-400"
                        {
                            "No sheets uploaded yet."
                        }
                    } @else {
                        ul class="space-y-4"
                        {
                            @for sheet in sheets {
                                (sheet_item(sheet, storage))
                            }
                        }
                    }
                }
            }
        }
    };

    base("Contribution Sheets", &[], &content)
}

/// The parsed fields of a sheet upload.
#[derive(Debug, Default)]
struct SheetUpload {
    fortnight: Option<String>,
    total_collected: Option<String>,
    notes: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

async fn field_text(field: Field<'_>) -> Result<String, Error> {
    field
        .text()
        .await
        .map(|text| text.trim().to_owned())
        .map_err(|error| Error::MultipartError(error.body_text()))
}

async fn read_upload(multipart: &mut Multipart) -> Result<SheetUpload, Error> {
    let mut upload = SheetUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.body_text()))?
    {
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some("fortnight") => upload.fortnight = Some(field_text(field).await?),
            Some("total_collected") => upload.total_collected = Some(field_text(field).await?),
            Some("notes") => upload.notes = Some(field_text(field).await?),
            Some("signed_sheet") => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|error| Error::MultipartError(error.body_text()))?;

                tracing::debug!("Received file '{file_name}' that is {} bytes", bytes.len());
                upload.file = Some((file_name, bytes.to_vec()));
            }
            name => tracing::warn!("ignoring unexpected multipart field {name:?}"),
        }
    }

    Ok(upload)
}

/// The name a sheet is stored under: `contrib-sheet-fn<N>-<unix millis>.<ext>`.
fn stored_file_name(fortnight: Fortnight, original_name: &str, now: OffsetDateTime) -> String {
    let extension = FilePath::new(original_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .filter(|extension| extension.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_owned());
    let millis = now.unix_timestamp_nanos() / 1_000_000;

    format!("contrib-sheet-fn{fortnight}-{millis}.{extension}")
}

fn validate_upload(upload: SheetUpload) -> Result<(Fortnight, Option<f64>, Option<String>, String, Vec<u8>), Error> {
    let fortnight = upload
        .fortnight
        .ok_or_else(|| Error::InvalidInput("Fortnight is required".to_owned()))?
        .parse::<i64>()
        .map_err(|_| Error::InvalidInput("Fortnight must be a number".to_owned()))
        .and_then(Fortnight::new)?;

    let total_collected = match upload.total_collected.filter(|total| !total.is_empty()) {
        Some(total) => {
            let total = total
                .parse::<f64>()
                .map_err(|_| Error::InvalidInput(format!("\"{total}\" is not a valid amount")))?;
            if !total.is_finite() || total < 0.0 {
                return Err(Error::NegativeAmount);
            }
            Some(total)
        }
        None => None,
    };

    let notes = upload.notes.filter(|notes| !notes.is_empty());

    let (file_name, bytes) = upload
        .file
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or(Error::MissingFile)?;

    Ok((fortnight, total_collected, notes, file_name, bytes))
}

/// Store an uploaded sheet and record it.
pub async fn upload_sheet_endpoint(
    State(state): State<SheetsState>,
    Extension(admin_id): Extension<MemberId>,
    mut multipart: Multipart,
) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(error) => {
            tracing::warn!("could not read sheet upload: {error}");
            return error.into_alert_response();
        }
    };

    let (fortnight, total_collected, notes, original_name, bytes) = match validate_upload(upload) {
        Ok(parts) => parts,
        Err(error) => return error.into_alert_response(),
    };

    let upload_date = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };

    let file_name = stored_file_name(fortnight, &original_name, OffsetDateTime::now_utc());

    if let Err(error) = state.sheet_storage.put(&file_name, &bytes) {
        tracing::error!("could not store sheet {file_name}: {error}");
        return error.into_alert_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let new_sheet = NewSheet {
        fortnight,
        upload_date,
        file_name: file_name.clone(),
        uploaded_by: admin_id,
        total_collected,
        notes,
    };

    match insert_sheet(new_sheet, &connection) {
        Ok(sheet) => {
            tracing::info!("uploaded sheet {} for fortnight {fortnight}", sheet.file_name);
            (
                HxRedirect(endpoints::SHEETS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            if let Err(storage_error) = state.sheet_storage.delete(&file_name) {
                tracing::error!("could not remove orphaned sheet {file_name}: {storage_error}");
            }
            error.into_alert_response()
        }
    }
}

/// Delete a sheet's file and then its record.
///
/// A file that cannot be removed is logged and the record is still deleted.
pub async fn delete_sheet_endpoint(
    Path(sheet_id): Path<DatabaseId>,
    State(state): State<SheetsState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let sheet = match get_sheet(sheet_id, &connection) {
        Ok(sheet) => sheet,
        Err(Error::NotFound) => return Error::DeleteMissingSheet.into_alert_response(),
        Err(error) => return error.into_alert_response(),
    };

    if let Err(error) = state.sheet_storage.delete(&sheet.file_name) {
        tracing::error!(
            "storage delete of {} failed, removing the record anyway: {error}",
            sheet.file_name
        );
    }

    match delete_sheet(sheet_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: format!("Deleted the sheet for fortnight {}", sheet.fortnight),
        }
        .into_response(),
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
mod stored_file_name_tests {
    use time::macros::datetime;

    use crate::fortnight::Fortnight;

    use super::stored_file_name;

    #[test]
    fn uses_fortnight_millis_and_extension() {
        let now = datetime!(2025-03-07 10:00:00.123 UTC);

        let name = stored_file_name(Fortnight::new(5).unwrap(), "Sheet.JPG", now);

        assert_eq!(name, "contrib-sheet-fn5-1741341600123.jpg");
    }

    #[test]
    fn falls_back_without_extension() {
        let now = datetime!(2025-03-07 10:00:00 UTC);

        let name = stored_file_name(Fortnight::new(1).unwrap(), "scan", now);

        assert_eq!(name, "contrib-sheet-fn1-1741341600000.bin");
    }
}

#[cfg(test)]
mod sheets_page_tests {
    use std::sync::Arc;

    use axum::{
        Extension,
        body::Body,
        extract::{FromRequest, Multipart, Path, State},
        http::{Request, StatusCode},
    };
    use time::macros::date;

    use crate::{
        endpoints::{self, format_endpoint},
        fortnight::Fortnight,
        member::{Member, Role, test_members::must_create_member},
        sheet::{
            NewSheet, SheetStorage, get_all_sheets, insert_sheet,
            test_storage::must_create_temp_storage,
        },
        test_utils::{
            assert_hx_endpoint, assert_hx_redirect, assert_valid_html, must_get_alert_text,
            must_get_form, must_open_shared_test_db, parse_html_document,
        },
    };

    use super::{SheetsState, delete_sheet_endpoint, get_sheets_page, upload_sheet_endpoint};

    fn setup() -> (SheetsState, Member) {
        let state = SheetsState {
            db_connection: must_open_shared_test_db(),
            local_timezone: "Pacific/Guadalcanal".to_owned(),
            sheet_storage: Arc::new(must_create_temp_storage()),
        };
        let admin = {
            let connection = state.db_connection.lock().unwrap();
            must_create_member("Ada Admin", Role::Admin, &connection)
        };

        (state, admin)
    }

    async fn must_make_multipart(fields: &[(&str, Option<&str>, &str)]) -> Multipart {
        let boundary = "SHEET_BOUNDARY123456789";
        let mut lines: Vec<String> = Vec::new();

        for (name, file_name, value) in fields {
            lines.push(format!("--{boundary}"));
            match file_name {
                Some(file_name) => {
                    lines.push(format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\""
                    ));
                    lines.push("Content-Type: image/png".to_owned());
                }
                None => lines.push(format!("Content-Disposition: form-data; name=\"{name}\"")),
            }
            lines.push(String::new());
            lines.push(value.to_string());
        }

        lines.push(format!("--{boundary}--"));

        let request = Request::builder()
            .method("POST")
            .uri(endpoints::POST_SHEET)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(lines.join("\r\n")))
            .unwrap();

        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn upload_stores_file_and_record() {
        let (state, admin) = setup();
        let multipart = must_make_multipart(&[
            ("fortnight", None, "3"),
            ("total_collected", None, "1250.50"),
            ("notes", None, "15 present"),
            ("signed_sheet", Some("sheet.png"), "png bytes"),
        ])
        .await;

        let response =
            upload_sheet_endpoint(State(state.clone()), Extension(admin.id), multipart).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::SHEETS_VIEW);
        let connection = state.db_connection.lock().unwrap();
        let sheets = get_all_sheets(&connection).unwrap();
        assert_eq!(sheets.len(), 1);
        let sheet = &sheets[0];
        assert_eq!(sheet.fortnight.as_i64(), 3);
        assert_eq!(sheet.total_collected, Some(1250.5));
        assert_eq!(sheet.notes.as_deref(), Some("15 present"));
        assert_eq!(sheet.uploaded_by, admin.id);
        assert!(sheet.file_name.starts_with("contrib-sheet-fn3-"));
        assert!(sheet.file_name.ends_with(".png"));
    }

    #[tokio::test]
    async fn upload_rejects_bad_fortnight_and_missing_file() {
        for fields in [
            vec![("fortnight", None, "24"), ("signed_sheet", Some("a.png"), "bytes")],
            vec![("fortnight", None, "3")],
            vec![("fortnight", None, "3"), ("signed_sheet", Some("a.png"), "")],
        ] {
            let (state, admin) = setup();
            let multipart = must_make_multipart(&fields).await;

            let response =
                upload_sheet_endpoint(State(state.clone()), Extension(admin.id), multipart).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            must_get_alert_text(response, "error").await;
            let connection = state.db_connection.lock().unwrap();
            assert!(get_all_sheets(&connection).unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn delete_removes_record_even_if_file_is_gone() {
        let (state, admin) = setup();
        let sheet = {
            let connection = state.db_connection.lock().unwrap();
            insert_sheet(
                NewSheet {
                    fortnight: Fortnight::new(2).unwrap(),
                    upload_date: date!(2025 - 01 - 24),
                    file_name: "never-stored.png".to_owned(),
                    uploaded_by: admin.id,
                    total_collected: None,
                    notes: None,
                },
                &connection,
            )
            .unwrap()
        };

        let response = delete_sheet_endpoint(Path(sheet.id), State(state.clone())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let text = must_get_alert_text(response, "success").await;
        assert!(text.contains("fortnight 2"));
        let connection = state.db_connection.lock().unwrap();
        assert!(get_all_sheets(&connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_sheet_is_not_found() {
        let (state, _) = setup();

        let response = delete_sheet_endpoint(Path(77), State(state)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn page_lists_sheets_with_links() {
        let (state, admin) = setup();
        let sheet = {
            let connection = state.db_connection.lock().unwrap();
            insert_sheet(
                NewSheet {
                    fortnight: Fortnight::new(9).unwrap(),
                    upload_date: date!(2025 - 05 - 02),
                    file_name: "contrib-sheet-fn9-1.png".to_owned(),
                    uploaded_by: admin.id,
                    total_collected: Some(800.0),
                    notes: None,
                },
                &connection,
            )
            .unwrap()
        };

        let response = get_sheets_page(State(state.clone())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::POST_SHEET, "hx-post");
        let html = document.html();
        assert!(html.contains(&state.sheet_storage.url(&sheet.file_name)));
        assert!(html.contains(&format_endpoint(endpoints::DELETE_SHEET, sheet.id)));
        assert!(html.contains("$800.00"));
    }
}
