use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finledger_core::{
    AggregateId, AggregateRoot, Currency, DomainError, DomainResult, ErrorCode, Money, TenantId,
};
use finledger_events::{Event, TenantAggregate, TenantScoped};

use crate::ids::{PartyId, PaymentRecordId, ReceiptVoucherId, ReceivableId, SourceDocumentId};
use crate::ledger::{
    LedgerBalance, ReceivableReversalResult, ReceivableStatus, ReversedPayment,
};
use crate::payment_record::ReceivablePaymentRecord;
use crate::validation;

/// Document a receivable was raised from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceivableSourceType {
    SalesOrder,
    SalesReturn,
    Manual,
}

impl ReceivableSourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReceivableSourceType::SalesOrder => "SALES_ORDER",
            ReceivableSourceType::SalesReturn => "SALES_RETURN",
            ReceivableSourceType::Manual => "MANUAL",
        }
    }
}

impl core::fmt::Display for ReceivableSourceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceivableSourceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SALES_ORDER" => Ok(ReceivableSourceType::SalesOrder),
            "SALES_RETURN" => Ok(ReceivableSourceType::SalesReturn),
            "MANUAL" => Ok(ReceivableSourceType::Manual),
            _ => Err(DomainError::validation(
                ErrorCode::InvalidSourceType,
                "Source type is not valid",
            )),
        }
    }
}

/// Command: CreateReceivable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReceivable {
    pub tenant_id: TenantId,
    pub receivable_number: String,
    pub customer_id: PartyId,
    pub customer_name: String,
    pub source_type: ReceivableSourceType,
    pub source_id: SourceDocumentId,
    pub source_number: String,
    pub total_amount: Money,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: AccountReceivable.
///
/// Money a customer owes. Payments arrive through receipt vouchers; each one
/// becomes a [`ReceivablePaymentRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReceivable {
    id: ReceivableId,
    tenant_id: TenantId,
    receivable_number: String,
    customer_id: PartyId,
    customer_name: String,
    source_type: ReceivableSourceType,
    source_id: SourceDocumentId,
    source_number: String,
    balance: LedgerBalance<ReceivableId, ReceiptVoucherId>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountReceivable {
    /// Open a pending receivable. Fails on the first violated precondition.
    pub fn create(cmd: CreateReceivable) -> DomainResult<(Self, ReceivableEvent)> {
        validation::document_number(
            ErrorCode::InvalidReceivableNumber,
            "Receivable",
            &cmd.receivable_number,
        )?;
        validation::present(
            ErrorCode::InvalidCustomer,
            "Customer ID cannot be empty",
            cmd.customer_id.is_nil(),
        )?;
        validation::non_empty(
            ErrorCode::InvalidCustomerName,
            "Customer name cannot be empty",
            &cmd.customer_name,
        )?;
        validation::present(
            ErrorCode::InvalidSourceId,
            "Source ID cannot be empty",
            cmd.source_id.is_nil(),
        )?;
        validation::non_empty(
            ErrorCode::InvalidSourceNumber,
            "Source number cannot be empty",
            &cmd.source_number,
        )?;
        if !cmd.total_amount.is_positive() {
            return Err(DomainError::validation(
                ErrorCode::InvalidAmount,
                "Total amount must be positive",
            ));
        }

        let id = ReceivableId::generate();
        let receivable = Self {
            id,
            tenant_id: cmd.tenant_id,
            receivable_number: cmd.receivable_number,
            customer_id: cmd.customer_id,
            customer_name: cmd.customer_name,
            source_type: cmd.source_type,
            source_id: cmd.source_id,
            source_number: cmd.source_number,
            balance: LedgerBalance::open(id, cmd.total_amount, cmd.due_date),
            version: 1,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        };

        tracing::info!(
            receivable_id = %id,
            tenant_id = %receivable.tenant_id,
            total = %cmd.total_amount,
            "receivable created"
        );

        let event = ReceivableEvent::Created(ReceivableCreated {
            tenant_id: receivable.tenant_id,
            receivable_id: id,
            receivable_number: receivable.receivable_number.clone(),
            customer_id: receivable.customer_id,
            customer_name: receivable.customer_name.clone(),
            source_type: receivable.source_type,
            source_id: receivable.source_id,
            source_number: receivable.source_number.clone(),
            total_amount: cmd.total_amount,
            due_date: cmd.due_date,
            occurred_at: cmd.occurred_at,
        });

        Ok((receivable, event))
    }

    /// Apply a receipt against the outstanding amount.
    ///
    /// Emits `Paid` once outstanding reaches exactly zero, `PartiallyPaid`
    /// otherwise.
    pub fn apply_payment(
        &mut self,
        amount: Money,
        voucher_id: ReceiptVoucherId,
        remark: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<ReceivableEvent> {
        let applied = self
            .balance
            .apply_payment(&amount, voucher_id, remark, occurred_at)?;
        self.touch(occurred_at);

        let event = if applied.fully_paid {
            ReceivableEvent::Paid(ReceivablePaid {
                tenant_id: self.tenant_id,
                receivable_id: self.id,
                receivable_number: self.receivable_number.clone(),
                customer_id: self.customer_id,
                payment_record_id: applied.record.record_id(),
                receipt_voucher_id: voucher_id,
                payment_amount: amount,
                total_amount: self.balance.total_amount(),
                occurred_at,
            })
        } else {
            ReceivableEvent::PartiallyPaid(ReceivablePartiallyPaid {
                tenant_id: self.tenant_id,
                receivable_id: self.id,
                receivable_number: self.receivable_number.clone(),
                customer_id: self.customer_id,
                payment_record_id: applied.record.record_id(),
                receipt_voucher_id: voucher_id,
                payment_amount: amount,
                paid_amount: self.balance.paid_amount(),
                outstanding_amount: self.balance.outstanding_amount(),
                occurred_at,
            })
        };
        Ok(event)
    }

    /// Write off the receivable and flag every collected receipt for refund.
    ///
    /// `paid_amount` keeps what was collected; `outstanding_amount` drops to
    /// zero. Each reversed payment record gets its own compensation id.
    pub fn reverse(
        &mut self,
        reason: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<(ReceivableReversalResult, ReceivableEvent)> {
        let reversal = self.balance.reverse(reason, occurred_at)?;
        self.touch(occurred_at);

        let event = ReceivableEvent::Reversed(ReceivableReversed {
            tenant_id: self.tenant_id,
            receivable_id: self.id,
            receivable_number: self.receivable_number.clone(),
            customer_id: self.customer_id,
            customer_name: self.customer_name.clone(),
            previous_status: reversal.previous_status,
            total_amount: self.balance.total_amount(),
            refund_required: reversal.result.refund_required,
            refund_amount: reversal.result.refund_amount,
            outstanding_waived: reversal.result.outstanding_waived,
            reason: reason.to_string(),
            reversed_payments: reversal.audit,
            occurred_at,
        });
        Ok((reversal.result, event))
    }

    /// Withdraw a receivable nothing has been paid against.
    pub fn cancel(&mut self, reason: &str, occurred_at: DateTime<Utc>) -> DomainResult<ReceivableEvent> {
        self.balance.cancel(reason, occurred_at)?;
        self.touch(occurred_at);

        Ok(ReceivableEvent::Cancelled(ReceivableCancelled {
            tenant_id: self.tenant_id,
            receivable_id: self.id,
            receivable_number: self.receivable_number.clone(),
            customer_id: self.customer_id,
            total_amount: self.balance.total_amount(),
            reason: reason.to_string(),
            occurred_at,
        }))
    }

    /// Set or clear (`None`) the due date. Rejected once terminal.
    pub fn set_due_date(
        &mut self,
        due_date: Option<DateTime<Utc>>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.balance.set_due_date(due_date)?;
        self.touch(occurred_at);
        Ok(())
    }

    pub fn set_remark(&mut self, remark: impl Into<String>, occurred_at: DateTime<Utc>) {
        self.balance.set_remark(remark);
        self.touch(occurred_at);
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }
}

// Accessors and derived queries.
impl AccountReceivable {
    pub fn id_typed(&self) -> ReceivableId {
        self.id
    }

    pub fn receivable_number(&self) -> &str {
        &self.receivable_number
    }

    pub fn customer_id(&self) -> PartyId {
        self.customer_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn source_type(&self) -> ReceivableSourceType {
        self.source_type
    }

    pub fn source_id(&self) -> SourceDocumentId {
        self.source_id
    }

    pub fn source_number(&self) -> &str {
        &self.source_number
    }

    pub fn currency(&self) -> Currency {
        self.balance.currency()
    }

    pub fn total_amount(&self) -> Money {
        self.balance.total_amount()
    }

    pub fn paid_amount(&self) -> Money {
        self.balance.paid_amount()
    }

    pub fn outstanding_amount(&self) -> Money {
        self.balance.outstanding_amount()
    }

    pub fn status(&self) -> ReceivableStatus {
        self.balance.status()
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.balance.due_date()
    }

    pub fn payment_records(&self) -> &[ReceivablePaymentRecord] {
        self.balance.payment_records()
    }

    pub fn remark(&self) -> &str {
        self.balance.remark()
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.balance.paid_at()
    }

    pub fn reversed_at(&self) -> Option<DateTime<Utc>> {
        self.balance.reversed_at()
    }

    pub fn reversal_reason(&self) -> Option<&str> {
        self.balance.reversal_reason()
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.balance.cancelled_at()
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.balance.cancel_reason()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_pending(&self) -> bool {
        self.status() == ReceivableStatus::Pending
    }

    pub fn is_partial(&self) -> bool {
        self.status() == ReceivableStatus::Partial
    }

    pub fn is_paid(&self) -> bool {
        self.status() == ReceivableStatus::Paid
    }

    pub fn is_reversed(&self) -> bool {
        self.status() == ReceivableStatus::Reversed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == ReceivableStatus::Cancelled
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.balance.is_overdue(now)
    }

    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        self.balance.days_overdue(now)
    }

    pub fn payment_count(&self) -> usize {
        self.balance.payment_count()
    }

    pub fn active_payment_total(&self) -> Money {
        self.balance.active_payment_total()
    }

    pub fn paid_percentage(&self) -> DomainResult<Decimal> {
        self.balance.paid_percentage()
    }
}

impl AggregateRoot for AccountReceivable {
    type Id = ReceivableId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantScoped for AccountReceivable {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl TenantAggregate for AccountReceivable {
    const AGGREGATE_TYPE: &'static str = "finance.account_receivable";

    fn aggregate_id(&self) -> AggregateId {
        self.id.as_aggregate_id()
    }
}

/// Event: ReceivableCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivableCreated {
    pub tenant_id: TenantId,
    pub receivable_id: ReceivableId,
    pub receivable_number: String,
    pub customer_id: PartyId,
    pub customer_name: String,
    pub source_type: ReceivableSourceType,
    pub source_id: SourceDocumentId,
    pub source_number: String,
    pub total_amount: Money,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceivablePartiallyPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivablePartiallyPaid {
    pub tenant_id: TenantId,
    pub receivable_id: ReceivableId,
    pub receivable_number: String,
    pub customer_id: PartyId,
    pub payment_record_id: PaymentRecordId,
    pub receipt_voucher_id: ReceiptVoucherId,
    /// This payment only.
    pub payment_amount: Money,
    pub paid_amount: Money,
    pub outstanding_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceivablePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivablePaid {
    pub tenant_id: TenantId,
    pub receivable_id: ReceivableId,
    pub receivable_number: String,
    pub customer_id: PartyId,
    pub payment_record_id: PaymentRecordId,
    pub receipt_voucher_id: ReceiptVoucherId,
    pub payment_amount: Money,
    pub total_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceivableReversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivableReversed {
    pub tenant_id: TenantId,
    pub receivable_id: ReceivableId,
    pub receivable_number: String,
    pub customer_id: PartyId,
    pub customer_name: String,
    pub previous_status: ReceivableStatus,
    pub total_amount: Money,
    pub refund_required: bool,
    pub refund_amount: Money,
    pub outstanding_waived: Money,
    pub reason: String,
    pub reversed_payments: Vec<ReversedPayment<ReceiptVoucherId>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceivableCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivableCancelled {
    pub tenant_id: TenantId,
    pub receivable_id: ReceivableId,
    pub receivable_number: String,
    pub customer_id: PartyId,
    pub total_amount: Money,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceivableEvent {
    Created(ReceivableCreated),
    PartiallyPaid(ReceivablePartiallyPaid),
    Paid(ReceivablePaid),
    Reversed(ReceivableReversed),
    Cancelled(ReceivableCancelled),
}

impl Event for ReceivableEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReceivableEvent::Created(_) => "finance.receivable.created",
            ReceivableEvent::PartiallyPaid(_) => "finance.receivable.partially_paid",
            ReceivableEvent::Paid(_) => "finance.receivable.paid",
            ReceivableEvent::Reversed(_) => "finance.receivable.reversed",
            ReceivableEvent::Cancelled(_) => "finance.receivable.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReceivableEvent::Created(e) => e.occurred_at,
            ReceivableEvent::PartiallyPaid(e) => e.occurred_at,
            ReceivableEvent::Paid(e) => e.occurred_at,
            ReceivableEvent::Reversed(e) => e.occurred_at,
            ReceivableEvent::Cancelled(e) => e.occurred_at,
        }
    }
}
