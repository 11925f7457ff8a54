//! Payments against members' outstanding fees.

mod db;
mod member_page;
mod settle;

pub use db::{NewPayment, Payment, create_payment_table, get_member_payments, insert_payment};
pub use member_page::get_settlements_page;
pub use settle::{get_admin_settlements_page, settle_payment_endpoint};
