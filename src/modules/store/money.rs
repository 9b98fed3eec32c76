use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a decimal string cannot be parsed into a Money value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid money amount: {0}")]
pub struct MoneyParseError(pub String);

/// Fixed-point monetary amount with exactly two fractional digits.
///
/// Stored as a signed count of cents so that balance arithmetic is exact;
/// the ledger never accumulates floating-point drift. Inputs with more than
/// two fractional digits are rounded half-to-even at parse time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    /// Build a Money value from a raw cent count
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Raw cent count, mainly for persistence and assertions
    pub fn cents(self) -> i64 {
        self.cents
    }

    /// Subtract another amount, returning None on overflow
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.cents.checked_sub(other.cents).map(Money::from_cents)
    }

    /// Parse a decimal string such as "8.00", "1.1" or "-0.30".
    ///
    /// Digits beyond the second fractional place are rounded half-to-even,
    /// matching the rounding rule used when balances are debited.
    pub fn parse(input: &str) -> Result<Money, MoneyParseError> {
        let trimmed = input.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        if rest.is_empty() {
            return Err(MoneyParseError(input.to_string()));
        }

        let (int_part, frac_part) = match rest.split_once('.') {
            Some((i, f)) => (i, f),
            None => (rest, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(MoneyParseError(input.to_string()));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(MoneyParseError(input.to_string()));
        }

        let whole: i64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| MoneyParseError(input.to_string()))?
        };

        // First two fractional digits are the cents; the rest decide rounding
        let mut frac_digits = frac_part.chars();
        let tens = frac_digits.next().map_or(0, |c| c as i64 - '0' as i64);
        let units = frac_digits.next().map_or(0, |c| c as i64 - '0' as i64);
        let mut cents = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(tens * 10 + units))
            .ok_or_else(|| MoneyParseError(input.to_string()))?;

        let remainder: &str = frac_part.get(2..).unwrap_or("");
        if !remainder.is_empty() {
            cents += round_half_even_carry(cents, remainder);
        }

        Ok(Money {
            cents: if negative { -cents } else { cents },
        })
    }
}

/// Decide whether the sub-cent remainder rounds the magnitude up by one cent.
///
/// The remainder is compared against exactly one half; ties go to the even
/// cent (banker's rounding).
fn round_half_even_carry(cents: i64, remainder: &str) -> i64 {
    let first = remainder.chars().next().map_or(0, |c| c as u32 - '0' as u32);
    let tail_nonzero = remainder.chars().skip(1).any(|c| c != '0');
    if first > 5 || (first == 5 && tail_nonzero) {
        1
    } else if first == 5 && !tail_nonzero {
        // Exactly half a cent: round to even
        i64::from(cents % 2 != 0)
    } else {
        0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}
