//! Fortnightly attendance records.

mod db;
mod member_page;
mod take;

pub use db::{
    Attendance, AttendanceEntry, create_attendance_table, get_fortnight_attendance,
    get_member_attendance, save_attendance,
};
pub use member_page::get_attendance_page;
pub use take::{get_take_attendance_page, save_attendance_endpoint};
