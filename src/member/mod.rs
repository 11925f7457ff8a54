//! Club members: storage, the administrator's member pages and the member API.

mod create;
mod db;
mod edit;
mod form;
mod list;
mod reset_link;

pub use create::{create_member_endpoint, create_member_json};
pub use db::{
    Member, MemberId, MemberUpdate, NewMember, Role, count_members, create_member,
    create_member_table, get_all_members, get_member, get_member_by_email, normalize_email,
    set_member_password, update_member,
};
pub use edit::{get_edit_member_page, update_member_endpoint, update_member_json};
pub use list::get_members_page;
pub use reset_link::{create_reset_link_endpoint, reset_password_json};

#[cfg(test)]
pub(crate) use db::test_members;
