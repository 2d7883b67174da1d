//! Monetary amounts in integer minor units.
//!
//! Catalog prices are entered and stored as decimals in major units
//! (`249.00`), but everything that is persisted on an order or invoice is an
//! integer number of cents. [`Cents`] is that integer; [`Currency`] knows how
//! to turn it back into a display string.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors from money conversions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount does not fit in an `i64` number of cents.
    #[error("amount out of range: {0}")]
    OutOfRange(String),
    /// A negative amount was given where only non-negative amounts make sense.
    #[error("amount cannot be negative: {0}")]
    Negative(String),
}

/// An amount of money in minor units (cents).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
pub struct Cents(i64);

impl Cents {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw number of cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Raw number of cents.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Convert a major-unit decimal (e.g. `249.00`) into cents.
    ///
    /// Rounds half away from zero, so `0.005` becomes one cent.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for negative amounts and
    /// [`MoneyError::OutOfRange`] if the result does not fit in an `i64`.
    pub fn from_major(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount.to_string()));
        }
        let scaled = amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| MoneyError::OutOfRange(amount.to_string()))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        i64::try_from(scaled)
            .map(Self)
            .map_err(|_| MoneyError::OutOfRange(amount.to_string()))
    }

    /// Convert back to a major-unit decimal with two decimal places.
    #[must_use]
    pub fn to_major(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Multiply by a quantity, returning `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }

    /// Add two amounts, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Sum an iterator of amounts, returning `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_major())
    }
}

/// Store currencies (ISO 4217) with their display conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    EUR,
    USD,
    GBP,
    CHF,
}

impl Currency {
    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EUR => "EUR",
            Self::USD => "USD",
            Self::GBP => "GBP",
            Self::CHF => "CHF",
        }
    }

    /// Format an amount of cents the way customers of this currency expect.
    ///
    /// ```
    /// use mytechgear_core::{Cents, Currency};
    ///
    /// assert_eq!(Currency::USD.format(Cents::new(24_900)), "$249.00");
    /// assert_eq!(Currency::EUR.format(Cents::new(24_900)), "249,00\u{a0}€");
    /// ```
    #[must_use]
    pub fn format(self, amount: Cents) -> String {
        let negative = amount.get() < 0;
        let abs = amount.get().unsigned_abs();
        let whole = abs / 100;
        let fraction = abs % 100;
        let sign = if negative { "-" } else { "" };

        match self {
            Self::EUR => format!(
                "{sign}{},{fraction:02}\u{a0}€",
                group_thousands(whole, '\u{202f}')
            ),
            Self::CHF => format!(
                "{sign}CHF\u{a0}{}.{fraction:02}",
                group_thousands(whole, '\u{2019}')
            ),
            Self::USD => format!("{sign}${}.{fraction:02}", group_thousands(whole, ',')),
            Self::GBP => format!("{sign}£{}.{fraction:02}", group_thousands(whole, ',')),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EUR" => Ok(Self::EUR),
            "USD" => Ok(Self::USD),
            "GBP" => Ok(Self::GBP),
            "CHF" => Ok(Self::CHF),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

fn group_thousands(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("valid decimal")
    }

    #[test]
    fn test_from_major_exact() {
        assert_eq!(Cents::from_major(dec("249.00")), Ok(Cents::new(24_900)));
        assert_eq!(Cents::from_major(dec("0")), Ok(Cents::ZERO));
        assert_eq!(Cents::from_major(dec("19.99")), Ok(Cents::new(1999)));
    }

    #[test]
    fn test_from_major_rounds_half_away_from_zero() {
        assert_eq!(Cents::from_major(dec("0.005")), Ok(Cents::new(1)));
        assert_eq!(Cents::from_major(dec("0.004")), Ok(Cents::ZERO));
        assert_eq!(Cents::from_major(dec("10.125")), Ok(Cents::new(1013)));
    }

    #[test]
    fn test_from_major_rejects_negative() {
        assert!(matches!(
            Cents::from_major(dec("-1.00")),
            Err(MoneyError::Negative(_))
        ));
    }

    #[test]
    fn test_to_major_roundtrip() {
        assert_eq!(Cents::new(24_900).to_major(), dec("249.00"));
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(Cents::new(1999).checked_mul(3), Some(Cents::new(5997)));
        assert_eq!(Cents::new(i64::MAX).checked_mul(2), None);
        assert_eq!(
            Cents::checked_sum([Cents::new(100), Cents::new(250)]),
            Some(Cents::new(350))
        );
        assert_eq!(Cents::checked_sum([Cents::new(i64::MAX), Cents::new(1)]), None);
    }

    #[test]
    fn test_format_per_currency() {
        let amount = Cents::new(123_456_789);
        assert_eq!(Currency::USD.format(amount), "$1,234,567.89");
        assert_eq!(Currency::GBP.format(amount), "£1,234,567.89");
        assert_eq!(
            Currency::EUR.format(amount),
            "1\u{202f}234\u{202f}567,89\u{a0}€"
        );
        assert_eq!(Currency::EUR.format(Cents::new(5)), "0,05\u{a0}€");
        assert_eq!(Currency::USD.format(Cents::new(-150)), "-$1.50");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("eur".parse::<Currency>(), Ok(Currency::EUR));
        assert!("XYZ".parse::<Currency>().is_err());
    }
}
