//! Membership numbers and the per-year counter that hands them out.

use std::fmt;

use crate::error::{NausError, NausResult};
use crate::store::{MemberRecords, SequenceRecords};

/// A membership number like `NAUS-2025007`: the year followed by a sequence
/// padded to at least three digits.
///
/// Legacy numbers were issued without the `NAUS-` prefix, so parsing accepts
/// both forms while [`Display`](fmt::Display) always writes the prefixed one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipNumber {
    digits: String,
}

impl MembershipNumber {
    pub const PREFIX: &'static str = "NAUS-";

    pub fn new(year: i32, sequence: i64) -> Self {
        Self {
            digits: format!("{}{:03}", year, sequence),
        }
    }

    pub fn parse(number: &str) -> NausResult<Self> {
        Self::parse_opt(number).ok_or_else(|| {
            NausError::validation(
                "membershipNumber",
                format!("{} is not a valid membership number", number.trim()),
            )
        })
    }

    pub fn parse_opt(number: &str) -> Option<Self> {
        let number = number.trim();
        let digits = number
            .get(..Self::PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(Self::PREFIX))
            .map(|_| &number[Self::PREFIX.len()..])
            .unwrap_or(number);

        if digits.len() >= 7 && digits.chars().all(|c| c.is_ascii_digit()) {
            Some(Self {
                digits: digits.to_owned(),
            })
        } else {
            None
        }
    }

    pub fn year(&self) -> i32 {
        self.digits[..4].parse().unwrap_or_default()
    }

    pub fn sequence(&self) -> i64 {
        self.digits[4..].parse().unwrap_or_default()
    }

    /// The number as legacy records stored it, without the prefix.
    pub fn legacy(&self) -> &str {
        &self.digits
    }

    /// Whether two stored numbers name the same membership, whatever their format.
    pub fn same(left: &str, right: &str) -> bool {
        match (Self::parse_opt(left), Self::parse_opt(right)) {
            (Some(left), Some(right)) => left == right,
            _ => left == right,
        }
    }
}

impl fmt::Display for MembershipNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.digits)
    }
}

/// Allocates the next membership number for `year`.
///
/// The counter row is advanced with a single conditional increment, so two
/// transactions can never observe the same value. The first allocation of a
/// year creates the row, seeded past any numbers already held by members of
/// that year (imports of legacy members predate the counter).
pub async fn allocate<T>(year: i32, tx: &mut T) -> NausResult<MembershipNumber>
where
    T: SequenceRecords + MemberRecords + ?Sized,
{
    let sequence = match tx
        .increment_sequence(year)
        .await
        .map_err(NausError::allocation)?
    {
        Some(sequence) => sequence,
        None => {
            let highest = tx
                .highest_member_sequence(year)
                .await
                .map_err(NausError::allocation)?
                .unwrap_or(0);
            tx.create_sequence(year, highest + 1)
                .await
                .map_err(NausError::allocation)?
        }
    };

    Ok(MembershipNumber::new(year, sequence))
}

/// Keeps the counter for `number`'s year past a number assigned by hand, and
/// past every number members of that year already hold.
pub async fn reserve<T>(number: &MembershipNumber, tx: &mut T) -> NausResult<i64>
where
    T: SequenceRecords + MemberRecords + ?Sized,
{
    let year = number.year();
    let highest = tx
        .highest_member_sequence(year)
        .await
        .map_err(NausError::allocation)?
        .unwrap_or(0);

    tx.raise_sequence(year, highest.max(number.sequence()))
        .await
        .map_err(NausError::allocation)
}
