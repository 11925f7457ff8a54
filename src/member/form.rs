//! Form fields shared by the member creation and editing forms.

use maud::{Markup, html};

use crate::{
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    member::Role,
};

pub(super) fn full_name_input(value: &str) -> Markup {
    html! {
        div
        {
            label for="full_name" class=(FORM_LABEL_STYLE) { "Full name" }

            input
                id="full_name"
                type="text"
                name="full_name"
                value=(value)
                placeholder="Full name"
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

pub(super) fn address_input(value: Option<&str>) -> Markup {
    html! {
        div
        {
            label for="address" class=(FORM_LABEL_STYLE) { "Address" }

            input
                id="address"
                type="text"
                name="address"
                value=[value]
                placeholder="Village, island or street"
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

pub(super) fn role_select(selected: Role) -> Markup {
    html! {
        div
        {
            label for="role" class=(FORM_LABEL_STYLE) { "Role" }

            select id="role" name="role" class=(FORM_TEXT_INPUT_STYLE)
            {
                @for role in [Role::Member, Role::Admin] {
                    option value=(role.as_str()) selected[role == selected] { (role) }
                }
            }
        }
    }
}

pub(super) fn form_error(error_message: &str) -> Markup {
    html! {
        @if !error_message.is_empty() {
            p class="text-red-600 dark:text-red-400" { (error_message) }
        }
    }
}
