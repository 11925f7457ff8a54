//! Contribution rows, the totals derived from them and the operations that
//! move a member's outstanding fee balance.

mod aggregate;
mod balance;
mod db;
mod export;
mod ledger;
mod member_page;
mod overview;
mod record;

pub use aggregate::{
    FortnightTotals, MemberTotals, RunningRow, average_total_per_member, fortnight_totals,
    grand_totals, member_totals, row_total, running_totals, totals_by_member,
};
pub use balance::{
    DEFAULT_SETTLEMENT_NOTE, FeeAdjustment, NewContribution, Settlement, add_contribution,
    add_outstanding_fee, delete_contribution, settle_payment,
};
pub use db::{
    Contribution, create_contribution_table, get_all_contributions, get_contribution,
    get_latest_contribution, get_member_contributions, get_recent_contributions,
};
pub use ledger::{get_ledger_export, get_ledger_page};
pub use member_page::get_member_page;
pub use overview::{get_overview_export, get_overview_page};
pub use record::{create_contribution_endpoint, create_fee_endpoint, delete_contribution_endpoint};

#[cfg(test)]
pub(crate) use db::test_contributions;
