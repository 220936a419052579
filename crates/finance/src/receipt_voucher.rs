//! Receipt vouchers: money collected from a customer, then allocated to
//! receivables.
//!
//! Same lifecycle as [`crate::PaymentVoucher`]. Each allocation is turned into
//! a payment on the receivable by the caller through
//! [`crate::AccountReceivable::apply_payment`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finledger_core::money::percentage;
use finledger_core::{
    AggregateId, AggregateRoot, Currency, DomainError, DomainResult, Entity, ErrorCode, Money,
    TenantId, UserId,
};
use finledger_events::{Event, TenantAggregate, TenantScoped};

use crate::ids::{AllocationId, PartyId, ReceiptVoucherId, ReceivableId};
use crate::payment_voucher::{MAX_REFERENCE_LEN, PaymentMethod, VoucherStatus};
use crate::validation;

/// Share of a receipt assigned to one receivable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivableAllocation {
    id: AllocationId,
    receipt_voucher_id: ReceiptVoucherId,
    receivable_id: ReceivableId,
    receivable_number: String,
    amount: Decimal,
    allocated_at: DateTime<Utc>,
    #[serde(default)]
    remark: String,
}

impl ReceivableAllocation {
    pub fn allocation_id(&self) -> AllocationId {
        self.id
    }

    pub fn receipt_voucher_id(&self) -> ReceiptVoucherId {
        self.receipt_voucher_id
    }

    pub fn receivable_id(&self) -> ReceivableId {
        self.receivable_id
    }

    pub fn receivable_number(&self) -> &str {
        &self.receivable_number
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

impl Entity for ReceivableAllocation {
    type Id = AllocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreateReceiptVoucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReceiptVoucher {
    pub tenant_id: TenantId,
    pub voucher_number: String,
    pub customer_id: PartyId,
    pub customer_name: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub receipt_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: ReceiptVoucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptVoucher {
    id: ReceiptVoucherId,
    tenant_id: TenantId,
    voucher_number: String,
    customer_id: PartyId,
    customer_name: String,
    currency: Currency,
    amount: Decimal,
    allocated_amount: Decimal,
    unallocated_amount: Decimal,
    payment_method: PaymentMethod,
    #[serde(default)]
    payment_reference: String,
    status: VoucherStatus,
    receipt_date: DateTime<Utc>,
    #[serde(default)]
    allocations: Vec<ReceivableAllocation>,
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

impl ReceiptVoucher {
    pub fn create(cmd: CreateReceiptVoucher) -> DomainResult<(Self, ReceiptVoucherEvent)> {
        validation::document_number(ErrorCode::InvalidVoucherNumber, "Voucher", &cmd.voucher_number)?;
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
        if !cmd.amount.is_positive() {
            return Err(DomainError::validation(
                ErrorCode::InvalidAmount,
                "Amount must be positive",
            ));
        }

        let voucher = Self {
            id: ReceiptVoucherId::generate(),
            tenant_id: cmd.tenant_id,
            voucher_number: cmd.voucher_number,
            customer_id: cmd.customer_id,
            customer_name: cmd.customer_name,
            currency: cmd.amount.currency(),
            amount: cmd.amount.amount(),
            allocated_amount: Decimal::ZERO,
            unallocated_amount: cmd.amount.amount(),
            payment_method: cmd.payment_method,
            payment_reference: String::new(),
            status: VoucherStatus::Draft,
            receipt_date: cmd.receipt_date,
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

        let event = ReceiptVoucherEvent::Created(ReceiptVoucherCreated {
            tenant_id: voucher.tenant_id,
            voucher_id: voucher.id,
            voucher_number: voucher.voucher_number.clone(),
            customer_id: voucher.customer_id,
            customer_name: voucher.customer_name.clone(),
            amount: cmd.amount,
            payment_method: voucher.payment_method,
            receipt_date: voucher.receipt_date,
            occurred_at: cmd.occurred_at,
        });

        Ok((voucher, event))
    }

    pub fn confirm(
        &mut self,
        confirmed_by: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<ReceiptVoucherEvent> {
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

        tracing::info!(voucher_id = %self.id, "receipt voucher confirmed");

        Ok(ReceiptVoucherEvent::Confirmed(ReceiptVoucherConfirmed {
            tenant_id: self.tenant_id,
            voucher_id: self.id,
            voucher_number: self.voucher_number.clone(),
            customer_id: self.customer_id,
            amount: self.amount(),
            confirmed_by,
            occurred_at,
        }))
    }

    /// Assign part of the receipt to a receivable. One allocation per receivable.
    pub fn allocate_to_receivable(
        &mut self,
        receivable_id: ReceivableId,
        receivable_number: &str,
        amount: Money,
        remark: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<(ReceivableAllocation, ReceiptVoucherEvent)> {
        if !self.status.can_allocate() {
            return Err(DomainError::invalid_state(format!(
                "Cannot allocate voucher in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidReceivable,
            "Receivable ID cannot be empty",
            receivable_id.is_nil(),
        )?;
        validation::non_empty(
            ErrorCode::InvalidReceivableNumber,
            "Receivable number is required",
            receivable_number,
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
        if self.allocation_for_receivable(receivable_id).is_some() {
            return Err(DomainError::invariant(
                ErrorCode::AlreadyAllocated,
                format!("Already allocated to receivable {receivable_number}"),
            ));
        }

        let allocation = ReceivableAllocation {
            id: AllocationId::generate(),
            receipt_voucher_id: self.id,
            receivable_id,
            receivable_number: receivable_number.to_string(),
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
            receivable_id = %receivable_id,
            amount = %value,
            unallocated = %self.unallocated_amount,
            "receipt allocated to receivable"
        );

        let event = ReceiptVoucherEvent::Allocated(ReceiptVoucherAllocated {
            tenant_id: self.tenant_id,
            voucher_id: self.id,
            voucher_number: self.voucher_number.clone(),
            customer_id: self.customer_id,
            allocation_id: allocation.id,
            receivable_id,
            receivable_number: allocation.receivable_number.clone(),
            allocation_amount: amount,
            allocated_amount: self.allocated_amount(),
            unallocated_amount: self.unallocated_amount(),
            fully_allocated,
            occurred_at,
        });
        Ok((allocation, event))
    }

    pub fn cancel(
        &mut self,
        cancelled_by: UserId,
        reason: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<ReceiptVoucherEvent> {
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

        tracing::info!(voucher_id = %self.id, %previous_status, "receipt voucher cancelled");

        Ok(ReceiptVoucherEvent::Cancelled(ReceiptVoucherCancelled {
            tenant_id: self.tenant_id,
            voucher_id: self.id,
            voucher_number: self.voucher_number.clone(),
            customer_id: self.customer_id,
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

impl ReceiptVoucher {
    pub fn id_typed(&self) -> ReceiptVoucherId {
        self.id
    }

    pub fn voucher_number(&self) -> &str {
        &self.voucher_number
    }

    pub fn customer_id(&self) -> PartyId {
        self.customer_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
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

    pub fn receipt_date(&self) -> DateTime<Utc> {
        self.receipt_date
    }

    pub fn allocations(&self) -> &[ReceivableAllocation] {
        &self.allocations
    }

    pub fn remark(&self) -> &str {
        &self.remark
    }

    pub fn confirmed_by(&self) -> Option<UserId> {
        self.confirmed_by
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

    pub fn allocation_for_receivable(
        &self,
        receivable_id: ReceivableId,
    ) -> Option<&ReceivableAllocation> {
        self.allocations.iter().find(|a| a.receivable_id == receivable_id)
    }
}

impl AggregateRoot for ReceiptVoucher {
    type Id = ReceiptVoucherId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantScoped for ReceiptVoucher {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl TenantAggregate for ReceiptVoucher {
    const AGGREGATE_TYPE: &'static str = "finance.receipt_voucher";

    fn aggregate_id(&self) -> AggregateId {
        self.id.as_aggregate_id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptVoucherCreated {
    pub tenant_id: TenantId,
    pub voucher_id: ReceiptVoucherId,
    pub voucher_number: String,
    pub customer_id: PartyId,
    pub customer_name: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub receipt_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptVoucherConfirmed {
    pub tenant_id: TenantId,
    pub voucher_id: ReceiptVoucherId,
    pub voucher_number: String,
    pub customer_id: PartyId,
    pub amount: Money,
    pub confirmed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptVoucherAllocated {
    pub tenant_id: TenantId,
    pub voucher_id: ReceiptVoucherId,
    pub voucher_number: String,
    pub customer_id: PartyId,
    pub allocation_id: AllocationId,
    pub receivable_id: ReceivableId,
    pub receivable_number: String,
    pub allocation_amount: Money,
    pub allocated_amount: Money,
    pub unallocated_amount: Money,
    pub fully_allocated: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptVoucherCancelled {
    pub tenant_id: TenantId,
    pub voucher_id: ReceiptVoucherId,
    pub voucher_number: String,
    pub customer_id: PartyId,
    pub amount: Money,
    pub previous_status: VoucherStatus,
    pub cancelled_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptVoucherEvent {
    Created(ReceiptVoucherCreated),
    Confirmed(ReceiptVoucherConfirmed),
    Allocated(ReceiptVoucherAllocated),
    Cancelled(ReceiptVoucherCancelled),
}

impl Event for ReceiptVoucherEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReceiptVoucherEvent::Created(_) => "finance.receipt_voucher.created",
            ReceiptVoucherEvent::Confirmed(_) => "finance.receipt_voucher.confirmed",
            ReceiptVoucherEvent::Allocated(_) => "finance.receipt_voucher.allocated",
            ReceiptVoucherEvent::Cancelled(_) => "finance.receipt_voucher.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReceiptVoucherEvent::Created(e) => e.occurred_at,
            ReceiptVoucherEvent::Confirmed(e) => e.occurred_at,
            ReceiptVoucherEvent::Allocated(e) => e.occurred_at,
            ReceiptVoucherEvent::Cancelled(e) => e.occurred_at,
        }
    }
}
