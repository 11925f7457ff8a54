//! Folds contribution rows into per-member and club-wide totals.
//!
//! A row's total is its shares plus its social fund. Late fees, absent fees
//! and the outstanding balance are liabilities and are reported separately,
//! never folded into a total.

use std::{collections::BTreeMap, ops::AddAssign};

use crate::{contribution::Contribution, fortnight::Fortnight, member::MemberId};

/// Sums of the monetary columns over a set of contribution rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemberTotals {
    pub shares: f64,
    pub social_fund: f64,
    pub late_fee: f64,
    pub absent_fee: f64,
    pub outstanding: f64,
    /// Shares plus social fund.
    pub total: f64,
}

impl AddAssign<&Contribution> for MemberTotals {
    fn add_assign(&mut self, row: &Contribution) {
        self.shares += row.shares;
        self.social_fund += row.social_fund;
        self.late_fee += row.late_fee;
        self.absent_fee += row.absent_fee;
        self.outstanding += row.outstanding_fee;
        self.total += row_total(row);
    }
}

impl AddAssign<&MemberTotals> for MemberTotals {
    fn add_assign(&mut self, other: &MemberTotals) {
        self.shares += other.shares;
        self.social_fund += other.social_fund;
        self.late_fee += other.late_fee;
        self.absent_fee += other.absent_fee;
        self.outstanding += other.outstanding;
        self.total += other.total;
    }
}

/// The total of a single row: shares plus social fund.
pub fn row_total(row: &Contribution) -> f64 {
    row.shares + row.social_fund
}

/// Sum one member's rows.
pub fn member_totals(rows: &[Contribution]) -> MemberTotals {
    rows.iter().fold(MemberTotals::default(), |mut totals, row| {
        totals += row;
        totals
    })
}

/// Sum the rows of each member separately.
pub fn totals_by_member(rows: &[Contribution]) -> BTreeMap<MemberId, MemberTotals> {
    let mut totals: BTreeMap<MemberId, MemberTotals> = BTreeMap::new();

    for row in rows {
        *totals.entry(row.member_id).or_default() += row;
    }

    totals
}

/// The element-wise sum of per-member totals.
pub fn grand_totals<'a>(per_member: impl IntoIterator<Item = &'a MemberTotals>) -> MemberTotals {
    per_member
        .into_iter()
        .fold(MemberTotals::default(), |mut totals, member| {
            totals += member;
            totals
        })
}

/// The club total averaged over `member_count` members, zero when there are none.
pub fn average_total_per_member(totals: &MemberTotals, member_count: usize) -> f64 {
    if member_count == 0 {
        0.0
    } else {
        totals.total / member_count as f64
    }
}

/// A ledger row with its own total and the cumulative total up to and including it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningRow<'a> {
    pub contribution: &'a Contribution,
    pub row_total: f64,
    pub cumulative: f64,
}

/// Pair each row with the running total, in ascending fortnight order (ties by ID).
pub fn running_totals(rows: &[Contribution]) -> Vec<RunningRow<'_>> {
    let mut ordered: Vec<&Contribution> = rows.iter().collect();
    ordered.sort_by_key(|row| (row.fortnight, row.id));

    let mut cumulative = 0.0;

    ordered
        .into_iter()
        .map(|contribution| {
            let row_total = row_total(contribution);
            cumulative += row_total;

            RunningRow {
                contribution,
                row_total,
                cumulative,
            }
        })
        .collect()
}

/// Shares and social fund collected across the club in one fortnight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FortnightTotals {
    pub fortnight: Fortnight,
    pub shares: f64,
    pub social_fund: f64,
}

/// The shares and social fund collected in each fortnight of the cycle, in order.
///
/// Fortnights without contributions are included with zero amounts.
pub fn fortnight_totals(rows: &[Contribution]) -> Vec<FortnightTotals> {
    let mut totals: Vec<FortnightTotals> = Fortnight::all()
        .map(|fortnight| FortnightTotals {
            fortnight,
            shares: 0.0,
            social_fund: 0.0,
        })
        .collect();

    for row in rows {
        let entry = &mut totals[row.fortnight.index()];
        entry.shares += row.shares;
        entry.social_fund += row.social_fund;
    }

    totals
}
