#![allow(missing_docs)]

pub(crate) mod alert;
pub(crate) mod db;
pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use alert::must_get_alert_text;
pub(crate) use db::{must_open_shared_test_db, must_open_test_db};
pub(crate) use form::{
    assert_form_error_message, assert_form_input, assert_form_input_with_value,
    assert_form_submit_button, assert_form_submit_button_with_text, assert_hx_endpoint,
    must_get_form,
};
pub(crate) use html::{
    assert_valid_html, must_get_table_rows, parse_html_document, parse_html_fragment,
};
pub(crate) use http::{
    assert_content_type, assert_hx_redirect, assert_status_ok, get_header, parse_json_body,
    parse_text_body,
};
