//! Landing pages for members and administrators.

mod admin;
mod chart;
mod member;

pub use admin::get_admin_dashboard_page;
pub use member::get_dashboard_page;
