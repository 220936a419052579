//! Finance ledger domain module.
//!
//! Account receivables and payables (with reversal and refund compensation),
//! payment and receipt vouchers with their allocations, credit and debit
//! memos, other-income and expense records. Aggregates are state-based: each
//! mutating method validates everything up front, mutates, bumps the version
//! and returns the events it produced for the caller to seal and dispatch.
//!
//! Pure domain logic (no IO, no HTTP, no storage). Cross-aggregate effects,
//! such as a voucher allocation reducing a payable, belong to the caller.
//! Behaviour switches come from [`LedgerPolicy::from_env`].

pub mod config;
pub mod credit_memo;
pub mod debit_memo;
pub mod expense_record;
pub mod ids;
pub mod ledger;
pub mod other_income;
pub mod payable;
pub mod payment_record;
pub mod payment_voucher;
pub mod persistence;
pub mod receipt_voucher;
pub mod receivable;

mod validation;

pub use config::{LedgerPolicy, RepeatReversal};
pub use credit_memo::{
    CreateCreditMemo, CreditMemo, CreditMemoApplication, CreditMemoEvent, CreditMemoItem,
    CreditMemoStatus, NewCreditMemoItem,
};
pub use debit_memo::{
    CreateDebitMemo, DebitMemo, DebitMemoApplication, DebitMemoEvent, DebitMemoItem,
    DebitMemoStatus, NewDebitMemoItem,
};
pub use expense_record::{
    CreateExpense, ExpenseCategory, ExpenseEvent, ExpensePaymentStatus, ExpenseRecord,
    ExpenseStatus,
};
pub use ids::{
    AllocationId, CompensationRecordId, CreditApplicationId, CreditMemoId, CreditMemoItemId,
    DebitApplicationId, DebitMemoId, DebitMemoItemId, ExpenseId, OtherIncomeId, PartyId,
    PayableId, PaymentRecordId, PaymentVoucherId, ProductId, ReceiptVoucherId, ReceivableId,
    ReturnItemId, SourceDocumentId,
};
pub use ledger::{
    LedgerStatus, PayableReversalResult, PayableStatus, ReceivableReversalResult,
    ReceivableStatus, ReversalResult, ReversedPayment,
};
pub use other_income::{
    CreateOtherIncome, IncomeCategory, IncomeStatus, OtherIncomeEvent, OtherIncomeRecord,
    ReceiptStatus,
};
pub use payable::{AccountPayable, CreatePayable, PayableEvent, PayableSourceType};
pub use payment_record::{
    PayablePaymentRecord, PaymentRecord, PaymentRecordStatus, ReceivablePaymentRecord,
};
pub use payment_voucher::{
    CreatePaymentVoucher, PayableAllocation, PaymentMethod, PaymentVoucher, PaymentVoucherEvent,
    VoucherStatus,
};
pub use persistence::{ColumnError, decode_payment_records, encode_payment_records};
pub use receipt_voucher::{
    CreateReceiptVoucher, ReceiptVoucher, ReceiptVoucherEvent, ReceivableAllocation,
};
pub use receivable::{AccountReceivable, CreateReceivable, ReceivableEvent, ReceivableSourceType};
