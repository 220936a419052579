use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finledger_core::{
    AggregateId, AggregateRoot, Currency, DomainError, DomainResult, ErrorCode, Money, TenantId,
};
use finledger_events::{Event, TenantAggregate, TenantScoped};

use crate::ids::{PartyId, PayableId, PaymentRecordId, PaymentVoucherId, SourceDocumentId};
use crate::ledger::{LedgerBalance, PayableReversalResult, PayableStatus, ReversedPayment};
use crate::payment_record::PayablePaymentRecord;
use crate::validation;

/// Document a payable was raised from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayableSourceType {
    PurchaseOrder,
    /// Goods sent back to the supplier.
    PurchaseReturn,
    Manual,
}

impl PayableSourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            PayableSourceType::PurchaseOrder => "PURCHASE_ORDER",
            PayableSourceType::PurchaseReturn => "PURCHASE_RETURN",
            PayableSourceType::Manual => "MANUAL",
        }
    }
}

impl core::fmt::Display for PayableSourceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayableSourceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PURCHASE_ORDER" => Ok(PayableSourceType::PurchaseOrder),
            "PURCHASE_RETURN" => Ok(PayableSourceType::PurchaseReturn),
            "MANUAL" => Ok(PayableSourceType::Manual),
            _ => Err(DomainError::validation(
                ErrorCode::InvalidSourceType,
                "Source type is not valid",
            )),
        }
    }
}

/// Command: CreatePayable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePayable {
    pub tenant_id: TenantId,
    pub payable_number: String,
    pub supplier_id: PartyId,
    pub supplier_name: String,
    pub source_type: PayableSourceType,
    pub source_id: SourceDocumentId,
    pub source_number: String,
    pub total_amount: Money,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: AccountPayable.
///
/// Money owed to a supplier, settled through payment vouchers. Same lifecycle
/// and reversal rules as [`crate::AccountReceivable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPayable {
    id: PayableId,
    tenant_id: TenantId,
    payable_number: String,
    supplier_id: PartyId,
    supplier_name: String,
    source_type: PayableSourceType,
    source_id: SourceDocumentId,
    source_number: String,
    balance: LedgerBalance<PayableId, PaymentVoucherId>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountPayable {
    pub fn create(cmd: CreatePayable) -> DomainResult<(Self, PayableEvent)> {
        validation::document_number(ErrorCode::InvalidPayableNumber, "Payable", &cmd.payable_number)?;
        validation::present(
            ErrorCode::InvalidSupplier,
            "Supplier ID cannot be empty",
            cmd.supplier_id.is_nil(),
        )?;
        validation::non_empty(
            ErrorCode::InvalidSupplierName,
            "Supplier name cannot be empty",
            &cmd.supplier_name,
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

        let id = PayableId::generate();
        let payable = Self {
            id,
            tenant_id: cmd.tenant_id,
            payable_number: cmd.payable_number,
            supplier_id: cmd.supplier_id,
            supplier_name: cmd.supplier_name,
            source_type: cmd.source_type,
            source_id: cmd.source_id,
            source_number: cmd.source_number,
            balance: LedgerBalance::open(id, cmd.total_amount, cmd.due_date),
            version: 1,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        };

        tracing::info!(
            payable_id = %id,
            tenant_id = %payable.tenant_id,
            total = %cmd.total_amount,
            "payable created"
        );

        let event = PayableEvent::Created(PayableCreated {
            tenant_id: payable.tenant_id,
            payable_id: id,
            payable_number: payable.payable_number.clone(),
            supplier_id: payable.supplier_id,
            supplier_name: payable.supplier_name.clone(),
            source_type: payable.source_type,
            source_id: payable.source_id,
            source_number: payable.source_number.clone(),
            total_amount: cmd.total_amount,
            due_date: cmd.due_date,
            occurred_at: cmd.occurred_at,
        });

        Ok((payable, event))
    }

    pub fn apply_payment(
        &mut self,
        amount: Money,
        voucher_id: PaymentVoucherId,
        remark: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<PayableEvent> {
        let applied = self
            .balance
            .apply_payment(&amount, voucher_id, remark, occurred_at)?;
        self.touch(occurred_at);

        let event = if applied.fully_paid {
            PayableEvent::Paid(PayablePaid {
                tenant_id: self.tenant_id,
                payable_id: self.id,
                payable_number: self.payable_number.clone(),
                supplier_id: self.supplier_id,
                payment_record_id: applied.record.record_id(),
                payment_voucher_id: voucher_id,
                payment_amount: amount,
                total_amount: self.balance.total_amount(),
                occurred_at,
            })
        } else {
            PayableEvent::PartiallyPaid(PayablePartiallyPaid {
                tenant_id: self.tenant_id,
                payable_id: self.id,
                payable_number: self.payable_number.clone(),
                supplier_id: self.supplier_id,
                payment_record_id: applied.record.record_id(),
                payment_voucher_id: voucher_id,
                payment_amount: amount,
                paid_amount: self.balance.paid_amount(),
                outstanding_amount: self.balance.outstanding_amount(),
                occurred_at,
            })
        };
        Ok(event)
    }

    /// Write off the payable; payments already made are owed back by the supplier.
    pub fn reverse(
        &mut self,
        reason: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<(PayableReversalResult, PayableEvent)> {
        let reversal = self.balance.reverse(reason, occurred_at)?;
        self.touch(occurred_at);

        let event = PayableEvent::Reversed(PayableReversed {
            tenant_id: self.tenant_id,
            payable_id: self.id,
            payable_number: self.payable_number.clone(),
            supplier_id: self.supplier_id,
            supplier_name: self.supplier_name.clone(),
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

    pub fn cancel(&mut self, reason: &str, occurred_at: DateTime<Utc>) -> DomainResult<PayableEvent> {
        self.balance.cancel(reason, occurred_at)?;
        self.touch(occurred_at);

        Ok(PayableEvent::Cancelled(PayableCancelled {
            tenant_id: self.tenant_id,
            payable_id: self.id,
            payable_number: self.payable_number.clone(),
            supplier_id: self.supplier_id,
            total_amount: self.balance.total_amount(),
            reason: reason.to_string(),
            occurred_at,
        }))
    }

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

impl AccountPayable {
    pub fn id_typed(&self) -> PayableId {
        self.id
    }

    pub fn payable_number(&self) -> &str {
        &self.payable_number
    }

    pub fn supplier_id(&self) -> PartyId {
        self.supplier_id
    }

    pub fn supplier_name(&self) -> &str {
        &self.supplier_name
    }

    pub fn source_type(&self) -> PayableSourceType {
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

    pub fn status(&self) -> PayableStatus {
        self.balance.status()
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.balance.due_date()
    }

    pub fn payment_records(&self) -> &[PayablePaymentRecord] {
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
        self.status() == PayableStatus::Pending
    }

    pub fn is_partial(&self) -> bool {
        self.status() == PayableStatus::Partial
    }

    pub fn is_paid(&self) -> bool {
        self.status() == PayableStatus::Paid
    }

    pub fn is_reversed(&self) -> bool {
        self.status() == PayableStatus::Reversed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == PayableStatus::Cancelled
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

impl AggregateRoot for AccountPayable {
    type Id = PayableId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantScoped for AccountPayable {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl TenantAggregate for AccountPayable {
    const AGGREGATE_TYPE: &'static str = "finance.account_payable";

    fn aggregate_id(&self) -> AggregateId {
        self.id.as_aggregate_id()
    }
}

/// Event: PayableCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayableCreated {
    pub tenant_id: TenantId,
    pub payable_id: PayableId,
    pub payable_number: String,
    pub supplier_id: PartyId,
    pub supplier_name: String,
    pub source_type: PayableSourceType,
    pub source_id: SourceDocumentId,
    pub source_number: String,
    pub total_amount: Money,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PayablePartiallyPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayablePartiallyPaid {
    pub tenant_id: TenantId,
    pub payable_id: PayableId,
    pub payable_number: String,
    pub supplier_id: PartyId,
    pub payment_record_id: PaymentRecordId,
    pub payment_voucher_id: PaymentVoucherId,
    pub payment_amount: Money,
    pub paid_amount: Money,
    pub outstanding_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PayablePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayablePaid {
    pub tenant_id: TenantId,
    pub payable_id: PayableId,
    pub payable_number: String,
    pub supplier_id: PartyId,
    pub payment_record_id: PaymentRecordId,
    pub payment_voucher_id: PaymentVoucherId,
    pub payment_amount: Money,
    pub total_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PayableReversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayableReversed {
    pub tenant_id: TenantId,
    pub payable_id: PayableId,
    pub payable_number: String,
    pub supplier_id: PartyId,
    pub supplier_name: String,
    pub previous_status: PayableStatus,
    pub total_amount: Money,
    pub refund_required: bool,
    pub refund_amount: Money,
    pub outstanding_waived: Money,
    pub reason: String,
    pub reversed_payments: Vec<ReversedPayment<PaymentVoucherId>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PayableCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayableCancelled {
    pub tenant_id: TenantId,
    pub payable_id: PayableId,
    pub payable_number: String,
    pub supplier_id: PartyId,
    pub total_amount: Money,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayableEvent {
    Created(PayableCreated),
    PartiallyPaid(PayablePartiallyPaid),
    Paid(PayablePaid),
    Reversed(PayableReversed),
    Cancelled(PayableCancelled),
}

impl Event for PayableEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PayableEvent::Created(_) => "finance.payable.created",
            PayableEvent::PartiallyPaid(_) => "finance.payable.partially_paid",
            PayableEvent::Paid(_) => "finance.payable.paid",
            PayableEvent::Reversed(_) => "finance.payable.reversed",
            PayableEvent::Cancelled(_) => "finance.payable.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PayableEvent::Created(e) => e.occurred_at,
            PayableEvent::PartiallyPaid(e) => e.occurred_at,
            PayableEvent::Paid(e) => e.occurred_at,
            PayableEvent::Reversed(e) => e.occurred_at,
            PayableEvent::Cancelled(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(total: Decimal) -> CreatePayable {
        CreatePayable {
            tenant_id: TenantId::new(),
            payable_number: "AP-2024-0001".to_string(),
            supplier_id: PartyId::generate(),
            supplier_name: "Northwind Supplies".to_string(),
            source_type: PayableSourceType::PurchaseOrder,
            source_id: SourceDocumentId::generate(),
            source_number: "PO-2024-0001".to_string(),
            total_amount: Money::cny(total),
            due_date: None,
            occurred_at: test_time(),
        }
    }

    fn payable(total: Decimal) -> AccountPayable {
        AccountPayable::create(create_cmd(total)).unwrap().0
    }

    fn pay(ap: &mut AccountPayable, amount: Decimal) -> PayableEvent {
        ap.apply_payment(Money::cny(amount), PaymentVoucherId::generate(), "", test_time())
            .unwrap()
    }

    #[test]
    fn create_validates_supplier_fields() {
        let err = AccountPayable::create(CreatePayable {
            supplier_id: PartyId::new(AggregateId::nil()),
            ..create_cmd(dec!(10))
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSupplier);

        let err = AccountPayable::create(CreatePayable {
            supplier_name: String::new(),
            ..create_cmd(dec!(10))
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSupplierName);

        let err = AccountPayable::create(CreatePayable {
            payable_number: "P".repeat(51),
            ..create_cmd(dec!(10))
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPayableNumber);
    }

    #[test]
    fn payments_drive_status_to_paid() {
        let (mut ap, event) = AccountPayable::create(create_cmd(dec!(500))).unwrap();
        assert!(matches!(event, PayableEvent::Created(_)));
        assert!(ap.is_pending());

        assert!(matches!(pay(&mut ap, dec!(200)), PayableEvent::PartiallyPaid(_)));
        assert!(ap.is_partial());
        assert_eq!(ap.paid_percentage().unwrap(), dec!(40));

        assert!(matches!(pay(&mut ap, dec!(300)), PayableEvent::Paid(_)));
        assert!(ap.is_paid());
        assert_eq!(ap.outstanding_amount().amount(), Decimal::ZERO);
        assert_eq!(ap.paid_percentage().unwrap(), dec!(100));
        assert_eq!(ap.version(), 3);
    }

    #[test]
    fn reversal_marks_supplier_payments_for_refund() {
        let mut ap = payable(dec!(900));
        pay(&mut ap, dec!(100));
        pay(&mut ap, dec!(200));

        let (result, event) = ap.reverse("goods rejected", test_time()).unwrap();
        assert!(result.refund_required);
        assert_eq!(result.refund_amount.amount(), dec!(300));
        assert_eq!(result.outstanding_waived.amount(), dec!(600));
        assert_eq!(result.reversed_payment_count, 2);
        assert!(ap.payment_records().iter().all(|r| r.is_reversed()));
        assert_eq!(ap.paid_amount().amount(), dec!(300));
        assert_eq!(ap.outstanding_amount().amount(), Decimal::ZERO);

        match event {
            PayableEvent::Reversed(e) => {
                assert_eq!(e.previous_status, PayableStatus::Partial);
                assert_eq!(e.reversed_payments.len(), 2);
                assert_eq!(e.reason, "goods rejected");
            }
            other => panic!("Expected Reversed event, got {other:?}"),
        }
    }

    #[test]
    fn cancel_and_payment_rules_match_receivable() {
        let mut ap = payable(dec!(100));
        pay(&mut ap, dec!(10));
        assert_eq!(ap.cancel("dup", test_time()).unwrap_err().code(), ErrorCode::HasPayments);

        let mut ap = payable(dec!(100));
        ap.cancel("duplicate entry", test_time()).unwrap();
        let err = ap
            .apply_payment(Money::cny(dec!(1)), PaymentVoucherId::generate(), "", test_time())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[test]
    fn event_types_are_namespaced() {
        let mut ap = payable(dec!(100));
        let event = ap.cancel("dup", test_time()).unwrap();
        assert_eq!(event.event_type(), "finance.payable.cancelled");
        assert_eq!(ap.envelope(event).sequence_number(), 2);
    }
}
