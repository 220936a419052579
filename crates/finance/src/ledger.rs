//! Ledger balance shared by account receivables and account payables.
//!
//! Both aggregates track a fixed total against accumulated payments, follow
//! the same `PENDING → PARTIAL → PAID` lifecycle and unwind the same way on
//! reversal. The rules live here once; the aggregates add counterparty data
//! and turn each outcome into their own events.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finledger_core::money::percentage;
use finledger_core::{Currency, DomainError, DomainResult, ErrorCode, Money};

use crate::ids::{
    CompensationRecordId, PayableId, PaymentRecordId, PaymentVoucherId, ReceiptVoucherId,
    ReceivableId,
};
use crate::payment_record::PaymentRecord;
use crate::validation;

/// Lifecycle of a receivable or payable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerStatus {
    /// Nothing paid yet.
    Pending,
    /// Some but not all of the total has been paid.
    Partial,
    /// Outstanding reached exactly zero.
    Paid,
    /// Written off; collected money is owed back.
    Reversed,
    /// Withdrawn before any payment.
    Cancelled,
}

pub type ReceivableStatus = LedgerStatus;
pub type PayableStatus = LedgerStatus;

impl LedgerStatus {
    pub const ALL: [LedgerStatus; 5] = [
        LedgerStatus::Pending,
        LedgerStatus::Partial,
        LedgerStatus::Paid,
        LedgerStatus::Reversed,
        LedgerStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::Pending => "PENDING",
            LedgerStatus::Partial => "PARTIAL",
            LedgerStatus::Paid => "PAID",
            LedgerStatus::Reversed => "REVERSED",
            LedgerStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LedgerStatus::Paid | LedgerStatus::Reversed | LedgerStatus::Cancelled
        )
    }

    pub fn can_apply_payment(self) -> bool {
        matches!(self, LedgerStatus::Pending | LedgerStatus::Partial)
    }
}

impl core::fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LedgerStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(ErrorCode::InvalidStatus, format!("unknown status: {s}"))
            })
    }
}

/// Identifier of an aggregate that owns a ledger balance.
pub trait LedgerOwner: Copy + core::fmt::Display {
    /// Lower-case noun used in messages ("receivable", "payable").
    const NOUN: &'static str;
}

impl LedgerOwner for ReceivableId {
    const NOUN: &'static str = "receivable";
}

impl LedgerOwner for PayableId {
    const NOUN: &'static str = "payable";
}

/// Identifier of the voucher a payment arrives through.
pub trait CounterVoucher: Copy + core::fmt::Display {
    /// Label used in messages ("Receipt voucher", "Payment voucher").
    const LABEL: &'static str;

    fn is_nil(&self) -> bool;
}

impl CounterVoucher for ReceiptVoucherId {
    const LABEL: &'static str = "Receipt voucher";

    fn is_nil(&self) -> bool {
        ReceiptVoucherId::is_nil(self)
    }
}

impl CounterVoucher for PaymentVoucherId {
    const LABEL: &'static str = "Payment voucher";

    fn is_nil(&self) -> bool {
        PaymentVoucherId::is_nil(self)
    }
}

/// What a caller needs to trigger refunds after a reversal.
///
/// Transient: returned from `reverse`, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReversalResult<O, V> {
    /// Money was collected and has to go back.
    pub refund_required: bool,
    /// Paid amount at the moment of reversal.
    pub refund_amount: Money,
    /// Outstanding amount at the moment of reversal, now written off.
    pub outstanding_waived: Money,
    pub reversed_payment_count: usize,
    /// One per reversed payment record, in record order.
    pub compensation_record_ids: Vec<CompensationRecordId>,
    /// Every payment record of the entry after the reversal.
    pub payment_records: Vec<PaymentRecord<O, V>>,
}

pub type ReceivableReversalResult = ReversalResult<ReceivableId, ReceiptVoucherId>;
pub type PayableReversalResult = ReversalResult<PayableId, PaymentVoucherId>;

/// Audit line for one payment undone by a reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversedPayment<V> {
    pub payment_record_id: PaymentRecordId,
    pub voucher_id: V,
    pub amount: Decimal,
    pub applied_at: DateTime<Utc>,
    pub reversed_at: DateTime<Utc>,
    pub compensation_record_id: CompensationRecordId,
}

/// Outcome of a successful payment application.
#[derive(Debug, Clone)]
pub(crate) struct PaymentApplied<O, V> {
    pub record: PaymentRecord<O, V>,
    pub fully_paid: bool,
}

/// Outcome of a successful reversal.
#[derive(Debug, Clone)]
pub(crate) struct Reversal<O, V> {
    pub previous_status: LedgerStatus,
    pub result: ReversalResult<O, V>,
    pub audit: Vec<ReversedPayment<V>>,
}

/// Totals, status, payment records and terminal metadata of one ledger entry.
///
/// Invariants while non-terminal: `outstanding == total - paid` and
/// `paid == sum(active record amounts)`. Reversal and cancellation force
/// `outstanding` to zero and leave `paid` as the historical amount collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "O: Deserialize<'de>, V: Deserialize<'de>"))]
pub struct LedgerBalance<O, V> {
    owner_id: O,
    currency: Currency,
    total_amount: Decimal,
    paid_amount: Decimal,
    outstanding_amount: Decimal,
    status: LedgerStatus,
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    payment_records: Vec<PaymentRecord<O, V>>,
    #[serde(default)]
    remark: String,
    paid_at: Option<DateTime<Utc>>,
    reversed_at: Option<DateTime<Utc>>,
    reversal_reason: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
}

impl<O: LedgerOwner, V: CounterVoucher> LedgerBalance<O, V> {
    /// Open a pending balance. `total` must already be validated as positive.
    pub(crate) fn open(owner_id: O, total: Money, due_date: Option<DateTime<Utc>>) -> Self {
        Self {
            owner_id,
            currency: total.currency(),
            total_amount: total.amount(),
            paid_amount: Decimal::ZERO,
            outstanding_amount: total.amount(),
            status: LedgerStatus::Pending,
            due_date,
            payment_records: Vec::new(),
            remark: String::new(),
            paid_at: None,
            reversed_at: None,
            reversal_reason: None,
            cancelled_at: None,
            cancel_reason: None,
        }
    }

    pub(crate) fn apply_payment(
        &mut self,
        amount: &Money,
        voucher_id: V,
        remark: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<PaymentApplied<O, V>> {
        if !self.status.can_apply_payment() {
            return Err(DomainError::invalid_state(format!(
                "Cannot apply payment to {} in {} status",
                O::NOUN,
                self.status
            )));
        }
        let value = validation::positive_amount(amount, self.currency, "Payment amount")?;
        if value > self.outstanding_amount {
            return Err(DomainError::invariant(
                ErrorCode::ExceedsOutstanding,
                format!(
                    "Payment amount {value} exceeds outstanding amount {}",
                    self.outstanding_amount
                ),
            ));
        }
        validation::present(
            ErrorCode::InvalidVoucher,
            &format!("{} ID cannot be empty", V::LABEL),
            voucher_id.is_nil(),
        )?;
        let paid_amount = self
            .paid_amount
            .checked_add(value)
            .ok_or_else(|| DomainError::validation(ErrorCode::InvalidAmount, "paid amount overflow"))?;

        let record = PaymentRecord::new(self.owner_id, voucher_id, value, remark, at);
        self.payment_records.push(record.clone());
        self.paid_amount = paid_amount;
        self.outstanding_amount = self.total_amount - self.paid_amount;

        let fully_paid = self.outstanding_amount.is_zero();
        if fully_paid {
            self.status = LedgerStatus::Paid;
            self.paid_at = Some(at);
            tracing::info!(
                owner = O::NOUN,
                id = %self.owner_id,
                total = %self.total_amount,
                "ledger entry fully paid"
            );
        } else {
            self.status = LedgerStatus::Partial;
            tracing::debug!(
                owner = O::NOUN,
                id = %self.owner_id,
                amount = %value,
                outstanding = %self.outstanding_amount,
                "payment applied"
            );
        }

        Ok(PaymentApplied { record, fully_paid })
    }

    pub(crate) fn reverse(&mut self, reason: &str, at: DateTime<Utc>) -> DomainResult<Reversal<O, V>> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "Cannot reverse {} in {} status",
                O::NOUN,
                self.status
            )));
        }
        validation::non_empty(ErrorCode::InvalidReason, "Reversal reason is required", reason)?;

        let previous_status = self.status;
        let refund_amount = self.paid_amount;
        let outstanding_waived = self.outstanding_amount;

        let mut compensation_record_ids = Vec::with_capacity(self.payment_records.len());
        let mut audit = Vec::with_capacity(self.payment_records.len());
        for record in self.payment_records.iter_mut().filter(|r| r.is_active()) {
            record.stamp_reversed(reason, at);
            let compensation_record_id = CompensationRecordId::generate();
            compensation_record_ids.push(compensation_record_id);
            audit.push(ReversedPayment {
                payment_record_id: record.record_id(),
                voucher_id: *record.voucher_id(),
                amount: record.amount(),
                applied_at: record.applied_at(),
                reversed_at: at,
                compensation_record_id,
            });
        }

        self.status = LedgerStatus::Reversed;
        self.reversed_at = Some(at);
        self.reversal_reason = Some(reason.to_string());
        self.outstanding_amount = Decimal::ZERO;

        let result = ReversalResult {
            refund_required: refund_amount > Decimal::ZERO,
            refund_amount: Money::new(refund_amount, self.currency),
            outstanding_waived: Money::new(outstanding_waived, self.currency),
            reversed_payment_count: compensation_record_ids.len(),
            compensation_record_ids,
            payment_records: self.payment_records.clone(),
        };

        tracing::info!(
            owner = O::NOUN,
            id = %self.owner_id,
            %previous_status,
            refund_amount = %refund_amount,
            outstanding_waived = %outstanding_waived,
            reversed_payments = result.reversed_payment_count,
            "ledger entry reversed"
        );

        Ok(Reversal {
            previous_status,
            result,
            audit,
        })
    }

    pub(crate) fn cancel(&mut self, reason: &str, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "Cannot cancel {} in {} status",
                O::NOUN,
                self.status
            )));
        }
        if self.status == LedgerStatus::Partial || self.paid_amount > Decimal::ZERO {
            return Err(DomainError::invariant(
                ErrorCode::HasPayments,
                format!("Cannot cancel {} with existing payments", O::NOUN),
            ));
        }
        validation::non_empty(ErrorCode::InvalidReason, "Cancel reason is required", reason)?;

        self.status = LedgerStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.cancel_reason = Some(reason.to_string());
        self.outstanding_amount = Decimal::ZERO;

        tracing::info!(owner = O::NOUN, id = %self.owner_id, "ledger entry cancelled");
        Ok(())
    }

    pub(crate) fn set_due_date(&mut self, due_date: Option<DateTime<Utc>>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "Cannot modify due date for {} in terminal state",
                O::NOUN
            )));
        }
        self.due_date = due_date;
        Ok(())
    }

    pub(crate) fn set_remark(&mut self, remark: impl Into<String>) {
        self.remark = remark.into();
    }
}

impl<O, V> LedgerBalance<O, V> {
    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn total_amount(&self) -> Money {
        Money::new(self.total_amount, self.currency)
    }

    pub fn paid_amount(&self) -> Money {
        Money::new(self.paid_amount, self.currency)
    }

    pub fn outstanding_amount(&self) -> Money {
        Money::new(self.outstanding_amount, self.currency)
    }

    pub fn status(&self) -> LedgerStatus {
        self.status
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn payment_records(&self) -> &[PaymentRecord<O, V>] {
        &self.payment_records
    }

    pub fn remark(&self) -> &str {
        &self.remark
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn reversed_at(&self) -> Option<DateTime<Utc>> {
        self.reversed_at
    }

    pub fn reversal_reason(&self) -> Option<&str> {
        self.reversal_reason.as_deref()
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn payment_count(&self) -> usize {
        self.payment_records.len()
    }

    /// Sum of records still counting towards the paid amount.
    pub fn active_payment_total(&self) -> Money {
        let sum = self
            .payment_records
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.amount())
            .sum();
        Money::new(sum, self.currency)
    }

    /// Past its due date and still open.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) if !self.status.is_terminal() => now > due,
            _ => false,
        }
    }

    /// Whole days past due; 0 when not overdue.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        match self.due_date {
            Some(due) if self.is_overdue(now) => (now - due).num_days(),
            _ => 0,
        }
    }

    /// Paid share of the total in percent, two decimals.
    pub fn paid_percentage(&self) -> DomainResult<Decimal> {
        percentage(self.paid_amount, self.total_amount)
    }
}
