//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Stable, machine-readable tag for a rejected business rule.
///
/// Callers branch on this rather than on message text; `as_str()` is the
/// form exposed to API clients and logs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Document numbers.
    InvalidReceivableNumber,
    InvalidPayableNumber,
    InvalidVoucherNumber,
    InvalidMemoNumber,
    InvalidIncomeNumber,
    InvalidExpenseNumber,

    // Counterparties and source documents.
    InvalidCustomer,
    InvalidCustomerName,
    InvalidSupplier,
    InvalidSupplierName,
    InvalidSourceType,
    InvalidSourceId,
    InvalidSourceNumber,
    InvalidSalesReturn,
    InvalidSalesOrder,
    InvalidPurchaseReturn,
    InvalidPurchaseOrder,
    InvalidReceivable,
    InvalidPayable,
    InvalidVoucher,
    InvalidUser,

    // Amounts and money.
    InvalidAmount,
    InvalidQuantity,
    InvalidCurrency,
    CurrencyMismatch,
    ExceedsOutstanding,
    ExceedsUnallocated,
    ExceedsRemaining,
    NoRemaining,

    // Lifecycle.
    InvalidState,
    InvalidStatus,
    InvalidReason,
    HasPayments,
    HasAllocations,
    HasApplications,
    AlreadyAllocated,
    AlreadyReversed,
    AlreadyReceived,
    AlreadyPaid,

    // Attributes.
    InvalidPaymentMethod,
    InvalidMethod,
    InvalidReference,
    InvalidCategory,
    InvalidDescription,
    InvalidPolicy,

    // Generic.
    InvalidId,
    NotFound,
    Conflict,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidReceivableNumber => "INVALID_RECEIVABLE_NUMBER",
            ErrorCode::InvalidPayableNumber => "INVALID_PAYABLE_NUMBER",
            ErrorCode::InvalidVoucherNumber => "INVALID_VOUCHER_NUMBER",
            ErrorCode::InvalidMemoNumber => "INVALID_MEMO_NUMBER",
            ErrorCode::InvalidIncomeNumber => "INVALID_INCOME_NUMBER",
            ErrorCode::InvalidExpenseNumber => "INVALID_EXPENSE_NUMBER",
            ErrorCode::InvalidCustomer => "INVALID_CUSTOMER",
            ErrorCode::InvalidCustomerName => "INVALID_CUSTOMER_NAME",
            ErrorCode::InvalidSupplier => "INVALID_SUPPLIER",
            ErrorCode::InvalidSupplierName => "INVALID_SUPPLIER_NAME",
            ErrorCode::InvalidSourceType => "INVALID_SOURCE_TYPE",
            ErrorCode::InvalidSourceId => "INVALID_SOURCE_ID",
            ErrorCode::InvalidSourceNumber => "INVALID_SOURCE_NUMBER",
            ErrorCode::InvalidSalesReturn => "INVALID_SALES_RETURN",
            ErrorCode::InvalidSalesOrder => "INVALID_SALES_ORDER",
            ErrorCode::InvalidPurchaseReturn => "INVALID_PURCHASE_RETURN",
            ErrorCode::InvalidPurchaseOrder => "INVALID_PURCHASE_ORDER",
            ErrorCode::InvalidReceivable => "INVALID_RECEIVABLE",
            ErrorCode::InvalidPayable => "INVALID_PAYABLE",
            ErrorCode::InvalidVoucher => "INVALID_VOUCHER",
            ErrorCode::InvalidUser => "INVALID_USER",
            ErrorCode::InvalidAmount => "INVALID_AMOUNT",
            ErrorCode::InvalidQuantity => "INVALID_QUANTITY",
            ErrorCode::InvalidCurrency => "INVALID_CURRENCY",
            ErrorCode::CurrencyMismatch => "CURRENCY_MISMATCH",
            ErrorCode::ExceedsOutstanding => "EXCEEDS_OUTSTANDING",
            ErrorCode::ExceedsUnallocated => "EXCEEDS_UNALLOCATED",
            ErrorCode::ExceedsRemaining => "EXCEEDS_REMAINING",
            ErrorCode::NoRemaining => "NO_REMAINING",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::InvalidStatus => "INVALID_STATUS",
            ErrorCode::InvalidReason => "INVALID_REASON",
            ErrorCode::HasPayments => "HAS_PAYMENTS",
            ErrorCode::HasAllocations => "HAS_ALLOCATIONS",
            ErrorCode::HasApplications => "HAS_APPLICATIONS",
            ErrorCode::AlreadyAllocated => "ALREADY_ALLOCATED",
            ErrorCode::AlreadyReversed => "ALREADY_REVERSED",
            ErrorCode::AlreadyReceived => "ALREADY_RECEIVED",
            ErrorCode::AlreadyPaid => "ALREADY_PAID",
            ErrorCode::InvalidPaymentMethod => "INVALID_PAYMENT_METHOD",
            ErrorCode::InvalidMethod => "INVALID_METHOD",
            ErrorCode::InvalidReference => "INVALID_REFERENCE",
            ErrorCode::InvalidCategory => "INVALID_CATEGORY",
            ErrorCode::InvalidDescription => "INVALID_DESCRIPTION",
            ErrorCode::InvalidPolicy => "INVALID_POLICY",
            ErrorCode::InvalidId => "INVALID_ID",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An input value failed validation (e.g. empty reason, non-positive amount).
    #[error("validation failed [{code}]: {message}")]
    Validation { code: ErrorCode, message: String },

    /// The aggregate's current state does not allow the operation.
    #[error("invariant violated [{code}]: {message}")]
    InvariantViolation { code: ErrorCode, message: String },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: msg.into(),
        }
    }

    pub fn invariant(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::InvariantViolation {
            code,
            message: msg.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Shorthand for the most common rejection: wrong lifecycle state.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::invariant(ErrorCode::InvalidState, msg)
    }

    /// The rule tag identifying which precondition failed.
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::Validation { code, .. } | DomainError::InvariantViolation { code, .. } => {
                *code
            }
            DomainError::InvalidId(_) => ErrorCode::InvalidId,
            DomainError::NotFound => ErrorCode::NotFound,
            DomainError::Conflict(_) => ErrorCode::Conflict,
        }
    }

    pub fn message(&self) -> String {
        match self {
            DomainError::Validation { message, .. }
            | DomainError::InvariantViolation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_reported_for_every_variant() {
        assert_eq!(
            DomainError::validation(ErrorCode::InvalidAmount, "x").code(),
            ErrorCode::InvalidAmount
        );
        assert_eq!(
            DomainError::invalid_state("closed").code(),
            ErrorCode::InvalidState
        );
        assert_eq!(DomainError::not_found().code(), ErrorCode::NotFound);
        assert_eq!(DomainError::conflict("stale").code(), ErrorCode::Conflict);
        assert_eq!(DomainError::invalid_id("bad").code(), ErrorCode::InvalidId);
    }

    #[test]
    fn display_includes_wire_tag() {
        let err = DomainError::invariant(ErrorCode::ExceedsOutstanding, "too much");
        assert_eq!(
            err.to_string(),
            "invariant violated [EXCEEDS_OUTSTANDING]: too much"
        );
        assert_eq!(err.message(), "too much");
    }
}
