//! Signed contribution sheets uploaded by administrators each fortnight.

mod db;
mod page;
mod storage;

pub use db::{
    ContributionSheet, NewSheet, create_sheet_table, delete_sheet, get_all_sheets, get_sheet,
    insert_sheet,
};
pub use page::{MAX_SHEET_UPLOAD_BYTES, delete_sheet_endpoint, get_sheets_page, upload_sheet_endpoint};
pub use storage::{LocalSheetStorage, SheetStorage};

#[cfg(test)]
pub(crate) use storage::test_storage;
