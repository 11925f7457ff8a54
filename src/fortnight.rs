//! The club's contribution period index.

use std::fmt::Display;

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A contribution period within a cycle, numbered from 1 to 23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Fortnight(u8);

impl Fortnight {
    /// The first fortnight of a cycle.
    pub const FIRST: Fortnight = Fortnight(1);
    /// The last fortnight of a cycle.
    pub const LAST: Fortnight = Fortnight(23);

    /// Create a fortnight, checking that it lies within the cycle.
    ///
    /// # Errors
    /// Returns [Error::InvalidFortnight] if `value` is not between 1 and 23.
    pub fn new(value: i64) -> Result<Self, Error> {
        if (Self::FIRST.0 as i64..=Self::LAST.0 as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(Error::InvalidFortnight(value))
        }
    }

    /// Every fortnight of a cycle in ascending order.
    pub fn all() -> impl Iterator<Item = Fortnight> {
        (Self::FIRST.0..=Self::LAST.0).map(Fortnight)
    }

    /// The fortnight as a zero-based index, useful for per-fortnight arrays.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

impl TryFrom<i64> for Fortnight {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Fortnight::new(value)
    }
}

impl From<Fortnight> for i64 {
    fn from(value: Fortnight) -> Self {
        value.as_i64()
    }
}

impl Display for Fortnight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for Fortnight {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_i64()))
    }
}

impl FromSql for Fortnight {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;

        Fortnight::new(raw).map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

#[cfg(test)]
mod fortnight_tests {
    use crate::{Error, fortnight::Fortnight};

    #[test]
    fn accepts_cycle_bounds() {
        assert_eq!(Fortnight::new(1), Ok(Fortnight::FIRST));
        assert_eq!(Fortnight::new(23), Ok(Fortnight::LAST));
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(Fortnight::new(0), Err(Error::InvalidFortnight(0)));
        assert_eq!(Fortnight::new(24), Err(Error::InvalidFortnight(24)));
        assert_eq!(Fortnight::new(-3), Err(Error::InvalidFortnight(-3)));
    }

    #[test]
    fn all_covers_the_cycle() {
        let fortnights: Vec<_> = Fortnight::all().collect();

        assert_eq!(fortnights.len(), 23);
        assert_eq!(fortnights.first(), Some(&Fortnight::FIRST));
        assert_eq!(fortnights.last(), Some(&Fortnight::LAST));
        assert_eq!(Fortnight::LAST.index(), 22);
    }

    #[test]
    fn deserializes_from_number() {
        let fortnight: Fortnight = serde_json::from_str("7").unwrap();
        assert_eq!(fortnight.as_i64(), 7);

        assert!(serde_json::from_str::<Fortnight>("30").is_err());
    }
}
