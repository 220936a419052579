//! Payment vouchers: money paid out to a supplier, then allocated to payables.
//!
//! Allocation only records the split on the voucher. Reducing each payable's
//! outstanding amount is done by the caller through
//! [`crate::AccountPayable::apply_payment`], in its own transaction boundary.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finledger_core::money::percentage;
use finledger_core::{
    AggregateId, AggregateRoot, Currency, DomainError, DomainResult, Entity, ErrorCode, Money,
    TenantId, UserId,
};
use finledger_events::{Event, TenantAggregate, TenantScoped};

use crate::ids::{AllocationId, PartyId, PayableId, PaymentVoucherId};
use crate::validation;

/// Longest payment reference accepted (bank transaction id, check number).
pub const MAX_REFERENCE_LEN: usize = 100;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoucherStatus {
    Draft,
    Confirmed,
    /// Every unit of the voucher has been assigned to payables.
    Allocated,
    Cancelled,
}

impl VoucherStatus {
    pub const ALL: [VoucherStatus; 4] = [
        VoucherStatus::Draft,
        VoucherStatus::Confirmed,
        VoucherStatus::Allocated,
        VoucherStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VoucherStatus::Draft => "DRAFT",
            VoucherStatus::Confirmed => "CONFIRMED",
            VoucherStatus::Allocated => "ALLOCATED",
            VoucherStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, VoucherStatus::Allocated | VoucherStatus::Cancelled)
    }

    pub fn can_confirm(self) -> bool {
        self == VoucherStatus::Draft
    }

    /// Confirmed and not cancelled. A fully allocated voucher still passes
    /// the state check but has nothing left to hand out.
    pub fn can_allocate(self) -> bool {
        matches!(self, VoucherStatus::Confirmed | VoucherStatus::Allocated)
    }

    pub fn can_cancel(self) -> bool {
        matches!(self, VoucherStatus::Draft | VoucherStatus::Confirmed)
    }
}

impl core::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoucherStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VoucherStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(ErrorCode::InvalidStatus, format!("unknown voucher status: {s}"))
            })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Wechat,
    Alipay,
    Check,
    /// Drawn from a prepaid balance.
    Balance,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 7] = [
        PaymentMethod::Cash,
        PaymentMethod::BankTransfer,
        PaymentMethod::Wechat,
        PaymentMethod::Alipay,
        PaymentMethod::Check,
        PaymentMethod::Balance,
        PaymentMethod::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Wechat => "WECHAT",
            PaymentMethod::Alipay => "ALIPAY",
            PaymentMethod::Check => "CHECK",
            PaymentMethod::Balance => "BALANCE",
            PaymentMethod::Other => "OTHER",
        }
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(
                    ErrorCode::InvalidPaymentMethod,
                    "Payment method is not valid",
                )
            })
    }
}

/// Share of a voucher assigned to one payable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayableAllocation {
    id: AllocationId,
    payment_voucher_id: PaymentVoucherId,
    payable_id: PayableId,
    payable_number: String,
    amount: Decimal,
    allocated_at: DateTime<Utc>,
    #[serde(default)]
    remark: String,
}

impl PayableAllocation {
    pub fn allocation_id(&self) -> AllocationId {
        self.id
    }

    pub fn payment_voucher_id(&self) -> PaymentVoucherId {
        self.payment_voucher_id
    }

    pub fn payable_id(&self) -> PayableId {
        self.payable_id
    }

    pub fn payable_number(&self) -> &str {
        &self.payable_number
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn allocated_at(&self) -> DateTime<Utc> {
        self.allocated_at
    }

    pub fn remark(&self) -> &str {
        &self.remark
    }
}

impl Entity for PayableAllocation {
    type Id = AllocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreatePaymentVoucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentVoucher {
    pub tenant_id: TenantId,
    pub voucher_number: String,
    pub supplier_id: PartyId,
    pub supplier_name: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: PaymentVoucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVoucher {
    id: PaymentVoucherId,
    tenant_id: TenantId,
    voucher_number: String,
    supplier_id: PartyId,
    supplier_name: String,
    currency: Currency,
    amount: Decimal,
    allocated_amount: Decimal,
    unallocated_amount: Decimal,
    payment_method: PaymentMethod,
    #[serde(default)]
    payment_reference: String,
    status: VoucherStatus,
    payment_date: DateTime<Utc>,
    #[serde(default)]
    allocations: Vec<PayableAllocation>,
    #[serde(default)]
    remark: String,
    confirmed_at: Option<DateTime<Utc>>,
    confirmed_by: Option<UserId>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<UserId>,
    cancel_reason: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentVoucher {
    pub fn create(cmd: CreatePaymentVoucher) -> DomainResult<(Self, PaymentVoucherEvent)> {
        validation::document_number(ErrorCode::InvalidVoucherNumber, "Voucher", &cmd.voucher_number)?;
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
        if !cmd.amount.is_positive() {
            return Err(DomainError::validation(
                ErrorCode::InvalidAmount,
                "Amount must be positive",
            ));
        }

        let voucher = Self {
            id: PaymentVoucherId::generate(),
            tenant_id: cmd.tenant_id,
            voucher_number: cmd.voucher_number,
            supplier_id: cmd.supplier_id,
            supplier_name: cmd.supplier_name,
            currency: cmd.amount.currency(),
            amount: cmd.amount.amount(),
            allocated_amount: Decimal::ZERO,
            unallocated_amount: cmd.amount.amount(),
            payment_method: cmd.payment_method,
            payment_reference: String::new(),
            status: VoucherStatus::Draft,
            payment_date: cmd.payment_date,
            allocations: Vec::new(),
            remark: String::new(),
            confirmed_at: None,
            confirmed_by: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
            version: 1,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        };

        let event = PaymentVoucherEvent::Created(PaymentVoucherCreated {
            tenant_id: voucher.tenant_id,
            voucher_id: voucher.id,
            voucher_number: voucher.voucher_number.clone(),
            supplier_id: voucher.supplier_id,
            supplier_name: voucher.supplier_name.clone(),
            amount: cmd.amount,
            payment_method: voucher.payment_method,
            payment_date: voucher.payment_date,
            occurred_at: cmd.occurred_at,
        });

        Ok((voucher, event))
    }

    /// DRAFT → CONFIRMED; allocations are accepted from here on.
    pub fn confirm(
        &mut self,
        confirmed_by: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<PaymentVoucherEvent> {
        if !self.status.can_confirm() {
            return Err(DomainError::invalid_state(format!(
                "Cannot confirm voucher in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidUser,
            "Confirming user ID is required",
            confirmed_by.is_nil(),
        )?;

        self.status = VoucherStatus::Confirmed;
        self.confirmed_at = Some(occurred_at);
        self.confirmed_by = Some(confirmed_by);
        self.touch(occurred_at);

        tracing::info!(voucher_id = %self.id, "payment voucher confirmed");

        Ok(PaymentVoucherEvent::Confirmed(PaymentVoucherConfirmed {
            tenant_id: self.tenant_id,
            voucher_id: self.id,
            voucher_number: self.voucher_number.clone(),
            supplier_id: self.supplier_id,
            amount: self.amount(),
            confirmed_by,
            occurred_at,
        }))
    }

    /// Assign part of the voucher to a payable. One allocation per payable.
    pub fn allocate_to_payable(
        &mut self,
        payable_id: PayableId,
        payable_number: &str,
        amount: Money,
        remark: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<(PayableAllocation, PaymentVoucherEvent)> {
        if !self.status.can_allocate() {
            return Err(DomainError::invalid_state(format!(
                "Cannot allocate voucher in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidPayable,
            "Payable ID cannot be empty",
            payable_id.is_nil(),
        )?;
        validation::non_empty(
            ErrorCode::InvalidPayableNumber,
            "Payable number is required",
            payable_number,
        )?;
        let value = validation::positive_amount(&amount, self.currency, "Allocation amount")?;
        if value > self.unallocated_amount {
            return Err(DomainError::invariant(
                ErrorCode::ExceedsUnallocated,
                format!(
                    "Allocation amount {value} exceeds unallocated amount {}",
                    self.unallocated_amount
                ),
            ));
        }
        if self.allocation_for_payable(payable_id).is_some() {
            return Err(DomainError::invariant(
                ErrorCode::AlreadyAllocated,
                format!("Already allocated to payable {payable_number}"),
            ));
        }

        let allocation = PayableAllocation {
            id: AllocationId::generate(),
            payment_voucher_id: self.id,
            payable_id,
            payable_number: payable_number.to_string(),
            amount: value,
            allocated_at: occurred_at,
            remark: remark.to_string(),
        };
        self.allocations.push(allocation.clone());
        self.allocated_amount += value;
        self.unallocated_amount = self.amount - self.allocated_amount;

        let fully_allocated = self.unallocated_amount.is_zero();
        if fully_allocated {
            self.status = VoucherStatus::Allocated;
        }
        self.touch(occurred_at);

        tracing::debug!(
            voucher_id = %self.id,
            payable_id = %payable_id,
            amount = %value,
            unallocated = %self.unallocated_amount,
            "voucher allocated to payable"
        );

        let event = PaymentVoucherEvent::Allocated(PaymentVoucherAllocated {
            tenant_id: self.tenant_id,
            voucher_id: self.id,
            voucher_number: self.voucher_number.clone(),
            supplier_id: self.supplier_id,
            allocation_id: allocation.id,
            payable_id,
            payable_number: allocation.payable_number.clone(),
            allocation_amount: amount,
            allocated_amount: self.allocated_amount(),
            unallocated_amount: self.unallocated_amount(),
            fully_allocated,
            occurred_at,
        });
        Ok((allocation, event))
    }

    /// Cancel a voucher nothing has been allocated from.
    pub fn cancel(
        &mut self,
        cancelled_by: UserId,
        reason: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<PaymentVoucherEvent> {
        if !self.status.can_cancel() {
            return Err(DomainError::invalid_state(format!(
                "Cannot cancel voucher in {} status",
                self.status
            )));
        }
        if self.allocated_amount > Decimal::ZERO {
            return Err(DomainError::invariant(
                ErrorCode::HasAllocations,
                "Cannot cancel voucher with existing allocations",
            ));
        }
        validation::present(
            ErrorCode::InvalidUser,
            "Cancelling user ID is required",
            cancelled_by.is_nil(),
        )?;
        validation::non_empty(ErrorCode::InvalidReason, "Cancel reason is required", reason)?;

        let previous_status = self.status;
        self.status = VoucherStatus::Cancelled;
        self.cancelled_at = Some(occurred_at);
        self.cancelled_by = Some(cancelled_by);
        self.cancel_reason = Some(reason.to_string());
        self.touch(occurred_at);

        tracing::info!(voucher_id = %self.id, %previous_status, "payment voucher cancelled");

        Ok(PaymentVoucherEvent::Cancelled(PaymentVoucherCancelled {
            tenant_id: self.tenant_id,
            voucher_id: self.id,
            voucher_number: self.voucher_number.clone(),
            supplier_id: self.supplier_id,
            amount: self.amount(),
            previous_status,
            cancelled_by,
            reason: reason.to_string(),
            occurred_at,
        }))
    }

    pub fn set_payment_reference(
        &mut self,
        reference: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_editable()?;
        validation::max_len(
            ErrorCode::InvalidReference,
            "Payment reference",
            reference,
            MAX_REFERENCE_LEN,
        )?;

        self.payment_reference = reference.to_string();
        self.touch(occurred_at);
        Ok(())
    }

    pub fn set_remark(&mut self, remark: &str, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_editable()?;

        self.remark = remark.to_string();
        self.touch(occurred_at);
        Ok(())
    }

    fn ensure_editable(&self) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(
                "Cannot modify voucher in terminal state",
            ));
        }
        Ok(())
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }
}

impl PaymentVoucher {
    pub fn id_typed(&self) -> PaymentVoucherId {
        self.id
    }

    pub fn voucher_number(&self) -> &str {
        &self.voucher_number
    }

    pub fn supplier_id(&self) -> PartyId {
        self.supplier_id
    }

    pub fn supplier_name(&self) -> &str {
        &self.supplier_name
    }

    pub fn amount(&self) -> Money {
        Money::new(self.amount, self.currency)
    }

    pub fn allocated_amount(&self) -> Money {
        Money::new(self.allocated_amount, self.currency)
    }

    pub fn unallocated_amount(&self) -> Money {
        Money::new(self.unallocated_amount, self.currency)
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_reference(&self) -> &str {
        &self.payment_reference
    }

    pub fn status(&self) -> VoucherStatus {
        self.status
    }

    pub fn payment_date(&self) -> DateTime<Utc> {
        self.payment_date
    }

    pub fn allocations(&self) -> &[PayableAllocation] {
        &self.allocations
    }

    pub fn remark(&self) -> &str {
        &self.remark
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn confirmed_by(&self) -> Option<UserId> {
        self.confirmed_by
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancelled_by(&self) -> Option<UserId> {
        self.cancelled_by
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn is_draft(&self) -> bool {
        self.status == VoucherStatus::Draft
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == VoucherStatus::Confirmed
    }

    pub fn is_allocated(&self) -> bool {
        self.status == VoucherStatus::Allocated
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == VoucherStatus::Cancelled
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.unallocated_amount.is_zero()
    }

    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    pub fn allocated_percentage(&self) -> DomainResult<Decimal> {
        percentage(self.allocated_amount, self.amount)
    }

    pub fn allocation_for_payable(&self, payable_id: PayableId) -> Option<&PayableAllocation> {
        self.allocations.iter().find(|a| a.payable_id == payable_id)
    }
}

impl AggregateRoot for PaymentVoucher {
    type Id = PaymentVoucherId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantScoped for PaymentVoucher {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl TenantAggregate for PaymentVoucher {
    const AGGREGATE_TYPE: &'static str = "finance.payment_voucher";

    fn aggregate_id(&self) -> AggregateId {
        self.id.as_aggregate_id()
    }
}

/// Event: PaymentVoucherCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVoucherCreated {
    pub tenant_id: TenantId,
    pub voucher_id: PaymentVoucherId,
    pub voucher_number: String,
    pub supplier_id: PartyId,
    pub supplier_name: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentVoucherConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVoucherConfirmed {
    pub tenant_id: TenantId,
    pub voucher_id: PaymentVoucherId,
    pub voucher_number: String,
    pub supplier_id: PartyId,
    pub amount: Money,
    pub confirmed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentVoucherAllocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVoucherAllocated {
    pub tenant_id: TenantId,
    pub voucher_id: PaymentVoucherId,
    pub voucher_number: String,
    pub supplier_id: PartyId,
    pub allocation_id: AllocationId,
    pub payable_id: PayableId,
    pub payable_number: String,
    pub allocation_amount: Money,
    pub allocated_amount: Money,
    pub unallocated_amount: Money,
    pub fully_allocated: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentVoucherCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVoucherCancelled {
    pub tenant_id: TenantId,
    pub voucher_id: PaymentVoucherId,
    pub voucher_number: String,
    pub supplier_id: PartyId,
    pub amount: Money,
    pub previous_status: VoucherStatus,
    pub cancelled_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentVoucherEvent {
    Created(PaymentVoucherCreated),
    Confirmed(PaymentVoucherConfirmed),
    Allocated(PaymentVoucherAllocated),
    Cancelled(PaymentVoucherCancelled),
}

impl Event for PaymentVoucherEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentVoucherEvent::Created(_) => "finance.payment_voucher.created",
            PaymentVoucherEvent::Confirmed(_) => "finance.payment_voucher.confirmed",
            PaymentVoucherEvent::Allocated(_) => "finance.payment_voucher.allocated",
            PaymentVoucherEvent::Cancelled(_) => "finance.payment_voucher.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PaymentVoucherEvent::Created(e) => e.occurred_at,
            PaymentVoucherEvent::Confirmed(e) => e.occurred_at,
            PaymentVoucherEvent::Allocated(e) => e.occurred_at,
            PaymentVoucherEvent::Cancelled(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(amount: Decimal) -> CreatePaymentVoucher {
        CreatePaymentVoucher {
            tenant_id: TenantId::new(),
            voucher_number: "PV-2024-0001".to_string(),
            supplier_id: PartyId::generate(),
            supplier_name: "Northwind Supplies".to_string(),
            amount: Money::cny(amount),
            payment_method: PaymentMethod::BankTransfer,
            payment_date: test_time(),
            occurred_at: test_time(),
        }
    }

    fn confirmed_voucher(amount: Decimal) -> PaymentVoucher {
        let (mut pv, _) = PaymentVoucher::create(create_cmd(amount)).unwrap();
        pv.confirm(UserId::new(), test_time()).unwrap();
        pv
    }

    fn allocate(pv: &mut PaymentVoucher, amount: Decimal) -> DomainResult<(PayableAllocation, PaymentVoucherEvent)> {
        pv.allocate_to_payable(PayableId::generate(), "AP-1", Money::cny(amount), "", test_time())
    }

    #[test]
    fn status_predicates() {
        use VoucherStatus::*;
        assert!(Draft.can_confirm() && !Confirmed.can_confirm());
        assert!(!Draft.can_allocate() && Confirmed.can_allocate() && Allocated.can_allocate());
        assert!(!Cancelled.can_allocate());
        assert!(Draft.can_cancel() && Confirmed.can_cancel());
        assert!(!Allocated.can_cancel() && !Cancelled.can_cancel());
        assert!(Allocated.is_terminal() && Cancelled.is_terminal());
        assert!(!Draft.is_terminal() && !Confirmed.is_terminal());
    }

    #[test]
    fn payment_method_parses_wire_tags() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
        let err = "BITCOIN".parse::<PaymentMethod>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPaymentMethod);
    }

    #[test]
    fn create_starts_in_draft_with_nothing_allocated() {
        let (pv, event) = PaymentVoucher::create(create_cmd(dec!(1000))).unwrap();
        assert!(pv.is_draft());
        assert_eq!(pv.unallocated_amount().amount(), dec!(1000));
        assert_eq!(pv.allocated_amount().amount(), Decimal::ZERO);
        assert_eq!(pv.version(), 1);
        assert!(matches!(event, PaymentVoucherEvent::Created(_)));

        let err = PaymentVoucher::create(create_cmd(dec!(0))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);
    }

    #[test]
    fn draft_voucher_cannot_be_allocated() {
        let (mut pv, _) = PaymentVoucher::create(create_cmd(dec!(100))).unwrap();
        let err = allocate(&mut pv, dec!(10)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[test]
    fn confirm_requires_user_and_draft() {
        let (mut pv, _) = PaymentVoucher::create(create_cmd(dec!(100))).unwrap();
        let err = pv.confirm(UserId::nil(), test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidUser);

        let user = UserId::new();
        pv.confirm(user, test_time()).unwrap();
        assert!(pv.is_confirmed());
        assert_eq!(pv.confirmed_by(), Some(user));

        let err = pv.confirm(user, test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[test]
    fn allocations_fill_the_voucher() {
        let mut pv = confirmed_voucher(dec!(1000));

        let (first, event) = allocate(&mut pv, dec!(600)).unwrap();
        assert_eq!(first.amount(), dec!(600));
        assert_eq!(first.payment_voucher_id(), pv.id_typed());
        match event {
            PaymentVoucherEvent::Allocated(e) => {
                assert!(!e.fully_allocated);
                assert_eq!(e.unallocated_amount.amount(), dec!(400));
            }
            other => panic!("Expected Allocated event, got {other:?}"),
        }
        assert!(pv.is_confirmed());

        let (_, event) = allocate(&mut pv, dec!(400)).unwrap();
        assert!(matches!(event, PaymentVoucherEvent::Allocated(ref e) if e.fully_allocated));
        assert!(pv.is_allocated());
        assert!(pv.is_fully_allocated());
        assert_eq!(pv.allocated_percentage().unwrap(), dec!(100));
        assert_eq!(pv.allocation_count(), 2);

        let err = allocate(&mut pv, dec!(0.01)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExceedsUnallocated);
    }

    #[test]
    fn one_allocation_per_payable() {
        let mut pv = confirmed_voucher(dec!(1000));
        let payable_id = PayableId::generate();
        pv.allocate_to_payable(payable_id, "AP-7", Money::cny(dec!(100)), "", test_time())
            .unwrap();

        let err = pv
            .allocate_to_payable(payable_id, "AP-7", Money::cny(dec!(100)), "", test_time())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyAllocated);
        assert_eq!(pv.allocation_for_payable(payable_id).map(|a| a.amount()), Some(dec!(100)));
        assert_eq!(pv.allocated_amount().amount(), dec!(100));
    }

    #[test]
    fn allocate_validates_payable_reference() {
        let mut pv = confirmed_voucher(dec!(100));
        let err = pv
            .allocate_to_payable(PayableId::new(AggregateId::nil()), "AP-1", Money::cny(dec!(1)), "", test_time())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPayable);

        let err = pv
            .allocate_to_payable(PayableId::generate(), "", Money::cny(dec!(1)), "", test_time())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPayableNumber);
    }

    #[test]
    fn cancel_rules() {
        let mut pv = confirmed_voucher(dec!(100));
        allocate(&mut pv, dec!(10)).unwrap();
        let err = pv.cancel(UserId::new(), "mistake", test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::HasAllocations);

        let mut pv = confirmed_voucher(dec!(100));
        assert_eq!(
            pv.cancel(UserId::nil(), "mistake", test_time()).unwrap_err().code(),
            ErrorCode::InvalidUser
        );
        assert_eq!(
            pv.cancel(UserId::new(), "", test_time()).unwrap_err().code(),
            ErrorCode::InvalidReason
        );

        let event = pv.cancel(UserId::new(), "duplicate", test_time()).unwrap();
        match event {
            PaymentVoucherEvent::Cancelled(e) => assert_eq!(e.previous_status, VoucherStatus::Confirmed),
            other => panic!("Expected Cancelled event, got {other:?}"),
        }
        assert!(pv.is_cancelled());
    }

    #[test]
    fn reference_and_remark_edits() {
        let mut pv = confirmed_voucher(dec!(100));
        pv.set_payment_reference("TXN-889201", test_time()).unwrap();
        assert_eq!(pv.payment_reference(), "TXN-889201");

        let err = pv.set_payment_reference(&"x".repeat(101), test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidReference);

        pv.set_remark("March rent", test_time()).unwrap();
        allocate(&mut pv, dec!(100)).unwrap();
        let err = pv.set_remark("late edit", test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
        assert_eq!(pv.remark(), "March rent");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn allocated_plus_unallocated_is_total(
            total_cents in 1i64..10_000_000i64,
            allocations in prop::collection::vec(1i64..5_000_000i64, 0..10)
        ) {
            let total = Decimal::new(total_cents, 2);
            let mut pv = confirmed_voucher(total);

            for cents in allocations {
                let _ = allocate(&mut pv, Decimal::new(cents, 2));
                prop_assert_eq!(
                    pv.allocated_amount().amount() + pv.unallocated_amount().amount(),
                    total
                );
                let sum: Decimal = pv.allocations().iter().map(|a| a.amount()).sum();
                prop_assert_eq!(sum, pv.allocated_amount().amount());
                prop_assert_eq!(pv.is_allocated(), pv.is_fully_allocated());
            }
        }
    }
}
