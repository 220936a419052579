//! Precondition helpers shared by the finance factories and mutators.

use rust_decimal::Decimal;

use finledger_core::{Currency, DomainError, DomainResult, ErrorCode, Money};

/// Longest document number accepted (receivable, payable, voucher, memo, income).
pub const MAX_NUMBER_LEN: usize = 50;

pub(crate) fn document_number(code: ErrorCode, label: &str, value: &str) -> DomainResult<()> {
    if value.is_empty() {
        return Err(DomainError::validation(
            code,
            format!("{label} number cannot be empty"),
        ));
    }
    if value.chars().count() > MAX_NUMBER_LEN {
        return Err(DomainError::validation(
            code,
            format!("{label} number cannot exceed {MAX_NUMBER_LEN} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn non_empty(code: ErrorCode, message: &str, value: &str) -> DomainResult<()> {
    if value.is_empty() {
        return Err(DomainError::validation(code, message));
    }
    Ok(())
}

pub(crate) fn max_len(code: ErrorCode, label: &str, value: &str, max: usize) -> DomainResult<()> {
    if value.chars().count() > max {
        return Err(DomainError::validation(
            code,
            format!("{label} cannot exceed {max} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn present(code: ErrorCode, message: &str, is_nil: bool) -> DomainResult<()> {
    if is_nil {
        return Err(DomainError::validation(code, message));
    }
    Ok(())
}

/// Amount must be in `currency` and strictly positive; returns the decimal.
pub(crate) fn positive_amount(amount: &Money, currency: Currency, what: &str) -> DomainResult<Decimal> {
    if amount.currency() != currency {
        return Err(DomainError::validation(
            ErrorCode::CurrencyMismatch,
            format!(
                "{what} is in {} but the ledger is kept in {currency}",
                amount.currency()
            ),
        ));
    }
    if !amount.is_positive() {
        return Err(DomainError::validation(
            ErrorCode::InvalidAmount,
            format!("{what} must be positive"),
        ));
    }
    Ok(amount.amount())
}
