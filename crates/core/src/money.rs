//! Money value object: an exact decimal amount tagged with a currency.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult, ErrorCode};
use crate::value_object::ValueObject;

/// ISO 4217 currencies the ledger accepts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Cny,
    Usd,
    Eur,
    Gbp,
    Jpy,
    Hkd,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Cny => "CNY",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Hkd => "HKD",
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CNY" => Ok(Currency::Cny),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "JPY" => Ok(Currency::Jpy),
            "HKD" => Ok(Currency::Hkd),
            other => Err(DomainError::validation(
                ErrorCode::InvalidCurrency,
                format!("unsupported currency: {other}"),
            )),
        }
    }
}

/// Immutable monetary amount.
///
/// The type itself allows any sign (refunds and credits are negative);
/// aggregates reject non-positive inputs at their own boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl ValueObject for Money {}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn cny(amount: Decimal) -> Self {
        Self::new(amount, Currency::Cny)
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn checked_add(&self, other: &Money) -> DomainResult<Money> {
        self.ensure_same_currency(other, "add")?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| DomainError::validation(ErrorCode::InvalidAmount, "money overflow"))?;
        Ok(Money::new(amount, self.currency))
    }

    pub fn checked_sub(&self, other: &Money) -> DomainResult<Money> {
        self.ensure_same_currency(other, "subtract")?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| DomainError::validation(ErrorCode::InvalidAmount, "money overflow"))?;
        Ok(Money::new(amount, self.currency))
    }

    pub fn multiply(&self, factor: Decimal) -> DomainResult<Money> {
        let amount = self
            .amount
            .checked_mul(factor)
            .ok_or_else(|| DomainError::validation(ErrorCode::InvalidAmount, "money overflow"))?;
        Ok(Money::new(amount, self.currency))
    }

    pub fn negate(&self) -> Money {
        Money::new(-self.amount, self.currency)
    }

    pub fn abs(&self) -> Money {
        Money::new(self.amount.abs(), self.currency)
    }

    /// Round half away from zero to `places` decimal places.
    pub fn round(&self, places: u32) -> Money {
        Money::new(
            self.amount
                .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero),
            self.currency,
        )
    }

    /// `self / whole * 100`, rounded to two places.
    ///
    /// A zero `whole` reports 100: there is nothing left to cover.
    pub fn percentage_of(&self, whole: &Money) -> DomainResult<Decimal> {
        self.ensure_same_currency(whole, "compare")?;
        percentage(self.amount, whole.amount)
    }

    fn ensure_same_currency(&self, other: &Money, op: &str) -> DomainResult<()> {
        if self.currency != other.currency {
            return Err(DomainError::validation(
                ErrorCode::CurrencyMismatch,
                format!(
                    "cannot {op} money with different currencies: {} and {}",
                    self.currency, other.currency
                ),
            ));
        }
        Ok(())
    }
}

/// `part / whole * 100` rounded half away from zero to two places; 100 when
/// `whole` is zero.
///
/// Fails with `INVALID_AMOUNT` when the ratio is outside the decimal range.
pub fn percentage(part: Decimal, whole: Decimal) -> DomainResult<Decimal> {
    if whole.is_zero() {
        return Ok(Decimal::ONE_HUNDRED);
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .ok_or_else(|| {
            DomainError::validation(
                ErrorCode::InvalidAmount,
                format!("percentage of {part} over {whole} is out of range"),
            )
        })
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn add_and_subtract_are_exact() {
        let a = Money::cny(dec!(0.1));
        let b = Money::cny(dec!(0.2));
        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(0.3));
        assert_eq!(
            Money::cny(dec!(1000))
                .checked_sub(&Money::cny(dec!(999.99)))
                .unwrap()
                .amount(),
            dec!(0.01)
        );
    }

    #[test]
    fn mixing_currencies_is_rejected() {
        let err = Money::cny(dec!(1))
            .checked_add(&Money::new(dec!(1), Currency::Usd))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CurrencyMismatch);
    }

    #[test]
    fn round_goes_half_away_from_zero() {
        assert_eq!(Money::cny(dec!(2.345)).round(2).amount(), dec!(2.35));
        assert_eq!(Money::cny(dec!(-2.345)).round(2).amount(), dec!(-2.35));
    }

    #[test]
    fn percentage_of_zero_whole_is_one_hundred() {
        assert_eq!(percentage(dec!(0), dec!(0)).unwrap(), dec!(100));
        assert_eq!(
            Money::cny(dec!(1)).percentage_of(&Money::cny(dec!(3))).unwrap(),
            dec!(33.33)
        );
    }

    #[test]
    fn percentage_out_of_range_is_an_error() {
        let err = Money::cny(Decimal::MAX)
            .percentage_of(&Money::cny(Decimal::new(1, 28)))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);

        let err = percentage(Decimal::MAX, dec!(0.5)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);
    }

    #[test]
    fn serializes_amount_as_string_with_currency_tag() {
        let json = serde_json::to_value(Money::cny(dec!(99.99))).unwrap();
        assert_eq!(json, serde_json::json!({"amount": "99.99", "currency": "CNY"}));

        let back: Money = serde_json::from_value(json).unwrap();
        assert_eq!(back, Money::cny(dec!(99.99)));
    }

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("hkd".parse::<Currency>().unwrap(), Currency::Hkd);
        assert_eq!(
            "XYZ".parse::<Currency>().unwrap_err().code(),
            ErrorCode::InvalidCurrency
        );
    }

    proptest! {
        #[test]
        fn add_then_sub_returns_original(a in 0i64..1_000_000_000i64, b in 0i64..1_000_000_000i64) {
            let x = Money::cny(Decimal::new(a, 2));
            let y = Money::cny(Decimal::new(b, 2));
            let back = x.checked_add(&y).unwrap().checked_sub(&y).unwrap();
            prop_assert_eq!(back, x);
        }
    }
}
