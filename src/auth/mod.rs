mod admin;
mod cookie;
mod forgot_password;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod redirect;
mod reset_password;
mod token;

pub use admin::{admin_guard, admin_guard_hx, admin_guard_json};
pub use cookie::DEFAULT_COOKIE_DURATION;
pub(crate) use cookie::{invalidate_auth_cookie, set_auth_cookie};
pub use forgot_password::get_forgot_password_page;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{auth_guard, auth_guard_hx, auth_guard_json};
pub use password::{MIN_PASSWORD_LENGTH, PasswordHash, ValidatedPassword};
pub use reset_password::{
    create_password_reset_table, create_reset_token, get_reset_password_page,
    post_reset_password, reset_link,
};

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
