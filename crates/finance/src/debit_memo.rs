//! Debit memos raised when a purchase return completes.
//!
//! The supplier owes the debit back: it is either offset against payables to
//! that supplier or received as a refund.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finledger_core::money::percentage;
use finledger_core::{
    AggregateId, AggregateRoot, Currency, DomainError, DomainResult, Entity, ErrorCode, Money,
    TenantId,
};
use finledger_events::{Event, TenantAggregate, TenantScoped};

use crate::credit_memo::CreditMemoStatus;
use crate::ids::{
    DebitApplicationId, DebitMemoId, DebitMemoItemId, PartyId, PayableId, ProductId, ReturnItemId,
    SourceDocumentId,
};
use crate::validation;

/// Debit memos move through the same states as credit memos.
pub type DebitMemoStatus = CreditMemoStatus;

/// Returned product line being debited back to the supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitMemoItem {
    pub id: DebitMemoItemId,
    pub debit_memo_id: DebitMemoId,
    pub purchase_return_id: SourceDocumentId,
    pub return_item_id: ReturnItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_code: String,
    pub unit: String,
    pub return_quantity: Decimal,
    pub unit_cost: Decimal,
    /// `return_quantity * unit_cost`.
    pub debit_amount: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for DebitMemoItem {
    type Id = DebitMemoItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for [`DebitMemo::add_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDebitMemoItem {
    pub purchase_return_id: SourceDocumentId,
    pub return_item_id: ReturnItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_code: String,
    pub unit: String,
    pub return_quantity: Decimal,
    pub unit_cost: Money,
    pub reason: String,
}

/// Part of the debit offset against one payable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitMemoApplication {
    pub id: DebitApplicationId,
    pub debit_memo_id: DebitMemoId,
    pub payable_id: PayableId,
    pub amount: Decimal,
    pub applied_at: DateTime<Utc>,
    #[serde(default)]
    pub remark: String,
}

impl Entity for DebitMemoApplication {
    type Id = DebitApplicationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreateDebitMemo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDebitMemo {
    pub tenant_id: TenantId,
    pub memo_number: String,
    pub purchase_return_id: SourceDocumentId,
    pub purchase_return_number: String,
    pub purchase_order_id: SourceDocumentId,
    pub purchase_order_number: String,
    pub supplier_id: PartyId,
    pub supplier_name: String,
    pub total_debit: Money,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: DebitMemo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitMemo {
    id: DebitMemoId,
    tenant_id: TenantId,
    memo_number: String,
    purchase_return_id: SourceDocumentId,
    purchase_return_number: String,
    purchase_order_id: SourceDocumentId,
    purchase_order_number: String,
    supplier_id: PartyId,
    supplier_name: String,
    original_payable_id: Option<PayableId>,
    #[serde(default)]
    items: Vec<DebitMemoItem>,
    currency: Currency,
    total_debit: Decimal,
    applied_amount: Decimal,
    remaining_amount: Decimal,
    status: DebitMemoStatus,
    #[serde(default)]
    applications: Vec<DebitMemoApplication>,
    reason: String,
    #[serde(default)]
    remark: String,
    applied_at: Option<DateTime<Utc>>,
    voided_at: Option<DateTime<Utc>>,
    void_reason: Option<String>,
    refund_received_at: Option<DateTime<Utc>>,
    refund_method: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DebitMemo {
    pub fn create(cmd: CreateDebitMemo) -> DomainResult<(Self, DebitMemoEvent)> {
        validation::document_number(ErrorCode::InvalidMemoNumber, "Memo", &cmd.memo_number)?;
        validation::present(
            ErrorCode::InvalidPurchaseReturn,
            "Purchase return ID cannot be empty",
            cmd.purchase_return_id.is_nil(),
        )?;
        validation::present(
            ErrorCode::InvalidPurchaseOrder,
            "Purchase order ID cannot be empty",
            cmd.purchase_order_id.is_nil(),
        )?;
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
        if !cmd.total_debit.is_positive() {
            return Err(DomainError::validation(
                ErrorCode::InvalidAmount,
                "Total debit must be positive",
            ));
        }

        let memo = Self {
            id: DebitMemoId::generate(),
            tenant_id: cmd.tenant_id,
            memo_number: cmd.memo_number,
            purchase_return_id: cmd.purchase_return_id,
            purchase_return_number: cmd.purchase_return_number,
            purchase_order_id: cmd.purchase_order_id,
            purchase_order_number: cmd.purchase_order_number,
            supplier_id: cmd.supplier_id,
            supplier_name: cmd.supplier_name,
            original_payable_id: None,
            items: Vec::new(),
            currency: cmd.total_debit.currency(),
            total_debit: cmd.total_debit.amount(),
            applied_amount: Decimal::ZERO,
            remaining_amount: cmd.total_debit.amount(),
            status: DebitMemoStatus::Pending,
            applications: Vec::new(),
            reason: cmd.reason,
            remark: String::new(),
            applied_at: None,
            voided_at: None,
            void_reason: None,
            refund_received_at: None,
            refund_method: None,
            version: 1,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        };

        let event = DebitMemoEvent::Created(DebitMemoCreated {
            tenant_id: memo.tenant_id,
            debit_memo_id: memo.id,
            memo_number: memo.memo_number.clone(),
            purchase_return_id: memo.purchase_return_id,
            purchase_order_id: memo.purchase_order_id,
            supplier_id: memo.supplier_id,
            supplier_name: memo.supplier_name.clone(),
            total_debit: cmd.total_debit,
            reason: memo.reason.clone(),
            occurred_at: cmd.occurred_at,
        });
        Ok((memo, event))
    }

    pub fn add_item(
        &mut self,
        item: NewDebitMemoItem,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<DebitMemoItem> {
        if self.status != DebitMemoStatus::Pending {
            return Err(DomainError::invalid_state(
                "Cannot add items to a non-pending debit memo",
            ));
        }
        if item.return_quantity <= Decimal::ZERO {
            return Err(DomainError::validation(
                ErrorCode::InvalidQuantity,
                "Return quantity must be positive",
            ));
        }
        if item.unit_cost.currency() != self.currency {
            return Err(DomainError::validation(
                ErrorCode::CurrencyMismatch,
                format!("Unit cost must be in {}", self.currency),
            ));
        }
        if item.unit_cost.is_negative() {
            return Err(DomainError::validation(
                ErrorCode::InvalidAmount,
                "Unit cost cannot be negative",
            ));
        }
        let debit_amount = item
            .return_quantity
            .checked_mul(item.unit_cost.amount())
            .ok_or_else(|| DomainError::validation(ErrorCode::InvalidAmount, "debit amount overflow"))?;
        self.items_total()?
            .amount()
            .checked_add(debit_amount)
            .ok_or_else(|| DomainError::validation(ErrorCode::InvalidAmount, "items total overflow"))?;

        let line = DebitMemoItem {
            id: DebitMemoItemId::generate(),
            debit_memo_id: self.id,
            purchase_return_id: item.purchase_return_id,
            return_item_id: item.return_item_id,
            product_id: item.product_id,
            product_name: item.product_name,
            product_code: item.product_code,
            unit: item.unit,
            return_quantity: item.return_quantity,
            unit_cost: item.unit_cost.amount(),
            debit_amount,
            reason: item.reason,
            created_at: occurred_at,
        };
        self.items.push(line.clone());
        self.touch(occurred_at);
        Ok(line)
    }

    /// Link the payable this memo offsets.
    pub fn set_original_payable(
        &mut self,
        payable_id: PayableId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        validation::present(
            ErrorCode::InvalidPayable,
            "Payable ID cannot be empty",
            payable_id.is_nil(),
        )?;
        self.original_payable_id = Some(payable_id);
        self.touch(occurred_at);
        Ok(())
    }

    pub fn apply_to_payable(
        &mut self,
        payable_id: PayableId,
        amount: Money,
        remark: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<DebitMemoEvent> {
        if !self.status.can_apply() {
            return Err(DomainError::invalid_state(format!(
                "Cannot apply debit memo in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidPayable,
            "Payable ID cannot be empty",
            payable_id.is_nil(),
        )?;
        let value = validation::positive_amount(&amount, self.currency, "Application amount")?;
        if value > self.remaining_amount {
            return Err(DomainError::invariant(
                ErrorCode::ExceedsRemaining,
                format!(
                    "Application amount {value} exceeds remaining debit {}",
                    self.remaining_amount
                ),
            ));
        }

        let application = DebitMemoApplication {
            id: DebitApplicationId::generate(),
            debit_memo_id: self.id,
            payable_id,
            amount: value,
            applied_at: occurred_at,
            remark: remark.to_string(),
        };
        self.applications.push(application.clone());
        self.applied_amount += value;
        self.remaining_amount = self.total_debit - self.applied_amount;
        self.touch(occurred_at);

        let event = if self.remaining_amount.is_zero() {
            self.status = DebitMemoStatus::Applied;
            self.applied_at = Some(occurred_at);
            tracing::info!(debit_memo_id = %self.id, "debit memo fully applied");
            DebitMemoEvent::Applied(DebitMemoApplied {
                tenant_id: self.tenant_id,
                debit_memo_id: self.id,
                memo_number: self.memo_number.clone(),
                supplier_id: self.supplier_id,
                application_id: application.id,
                payable_id,
                total_debit: self.total_debit(),
                occurred_at,
            })
        } else {
            self.status = DebitMemoStatus::Partial;
            DebitMemoEvent::PartiallyApplied(DebitMemoPartiallyApplied {
                tenant_id: self.tenant_id,
                debit_memo_id: self.id,
                memo_number: self.memo_number.clone(),
                supplier_id: self.supplier_id,
                application_id: application.id,
                payable_id,
                application_amount: amount,
                applied_amount: self.applied_amount(),
                remaining_amount: self.remaining_amount(),
                occurred_at,
            })
        };
        Ok(event)
    }

    pub fn void(&mut self, reason: &str, occurred_at: DateTime<Utc>) -> DomainResult<DebitMemoEvent> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "Cannot void debit memo in {} status",
                self.status
            )));
        }
        if self.applied_amount > Decimal::ZERO {
            return Err(DomainError::invariant(
                ErrorCode::HasApplications,
                "Cannot void debit memo with existing applications",
            ));
        }
        validation::non_empty(ErrorCode::InvalidReason, "Void reason is required", reason)?;

        self.status = DebitMemoStatus::Voided;
        self.voided_at = Some(occurred_at);
        self.void_reason = Some(reason.to_string());
        self.remaining_amount = Decimal::ZERO;
        self.touch(occurred_at);

        tracing::info!(debit_memo_id = %self.id, "debit memo voided");

        Ok(DebitMemoEvent::Voided(DebitMemoVoided {
            tenant_id: self.tenant_id,
            debit_memo_id: self.id,
            memo_number: self.memo_number.clone(),
            supplier_id: self.supplier_id,
            total_debit: self.total_debit(),
            reason: reason.to_string(),
            occurred_at,
        }))
    }

    /// Record the supplier paying the remaining debit back in cash.
    pub fn receive_refund(
        &mut self,
        method: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<DebitMemoEvent> {
        if !self.status.can_apply() {
            return Err(DomainError::invalid_state(format!(
                "Cannot receive refund for debit memo in {} status",
                self.status
            )));
        }
        if self.remaining_amount <= Decimal::ZERO {
            return Err(DomainError::invariant(
                ErrorCode::NoRemaining,
                "No remaining debit to refund",
            ));
        }
        validation::non_empty(ErrorCode::InvalidMethod, "Refund method is required", method)?;

        let refund_amount = self.remaining_amount();
        self.status = DebitMemoStatus::Refunded;
        self.refund_received_at = Some(occurred_at);
        self.refund_method = Some(method.to_string());
        self.applied_amount = self.total_debit;
        self.remaining_amount = Decimal::ZERO;
        self.touch(occurred_at);

        tracing::info!(debit_memo_id = %self.id, refund = %refund_amount, method, "debit memo refund received");

        Ok(DebitMemoEvent::RefundReceived(DebitMemoRefundReceived {
            tenant_id: self.tenant_id,
            debit_memo_id: self.id,
            memo_number: self.memo_number.clone(),
            supplier_id: self.supplier_id,
            refund_amount,
            refund_method: method.to_string(),
            occurred_at,
        }))
    }

    pub fn set_remark(&mut self, remark: impl Into<String>, occurred_at: DateTime<Utc>) {
        self.remark = remark.into();
        self.touch(occurred_at);
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }
}

impl DebitMemo {
    pub fn id_typed(&self) -> DebitMemoId {
        self.id
    }

    pub fn memo_number(&self) -> &str {
        &self.memo_number
    }

    pub fn purchase_return_id(&self) -> SourceDocumentId {
        self.purchase_return_id
    }

    pub fn purchase_return_number(&self) -> &str {
        &self.purchase_return_number
    }

    pub fn purchase_order_id(&self) -> SourceDocumentId {
        self.purchase_order_id
    }

    pub fn purchase_order_number(&self) -> &str {
        &self.purchase_order_number
    }

    pub fn supplier_id(&self) -> PartyId {
        self.supplier_id
    }

    pub fn supplier_name(&self) -> &str {
        &self.supplier_name
    }

    pub fn original_payable_id(&self) -> Option<PayableId> {
        self.original_payable_id
    }

    pub fn items(&self) -> &[DebitMemoItem] {
        &self.items
    }

    pub fn applications(&self) -> &[DebitMemoApplication] {
        &self.applications
    }

    pub fn total_debit(&self) -> Money {
        Money::new(self.total_debit, self.currency)
    }

    pub fn applied_amount(&self) -> Money {
        Money::new(self.applied_amount, self.currency)
    }

    pub fn remaining_amount(&self) -> Money {
        Money::new(self.remaining_amount, self.currency)
    }

    pub fn status(&self) -> DebitMemoStatus {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn remark(&self) -> &str {
        &self.remark
    }

    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        self.applied_at
    }

    pub fn voided_at(&self) -> Option<DateTime<Utc>> {
        self.voided_at
    }

    pub fn void_reason(&self) -> Option<&str> {
        self.void_reason.as_deref()
    }

    pub fn refund_received_at(&self) -> Option<DateTime<Utc>> {
        self.refund_received_at
    }

    pub fn refund_method(&self) -> Option<&str> {
        self.refund_method.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.status == DebitMemoStatus::Pending
    }

    pub fn is_partial(&self) -> bool {
        self.status == DebitMemoStatus::Partial
    }

    pub fn is_applied(&self) -> bool {
        self.status == DebitMemoStatus::Applied
    }

    pub fn is_voided(&self) -> bool {
        self.status == DebitMemoStatus::Voided
    }

    pub fn is_refunded(&self) -> bool {
        self.status == DebitMemoStatus::Refunded
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn application_count(&self) -> usize {
        self.applications.len()
    }

    /// `INVALID_AMOUNT` if the sum of line debits leaves the decimal range.
    pub fn items_total(&self) -> DomainResult<Money> {
        let total = self
            .items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.debit_amount))
            .ok_or_else(|| DomainError::validation(ErrorCode::InvalidAmount, "items total overflow"))?;
        Ok(Money::new(total, self.currency))
    }

    pub fn applied_percentage(&self) -> DomainResult<Decimal> {
        percentage(self.applied_amount, self.total_debit)
    }
}

impl AggregateRoot for DebitMemo {
    type Id = DebitMemoId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantScoped for DebitMemo {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl TenantAggregate for DebitMemo {
    const AGGREGATE_TYPE: &'static str = "finance.debit_memo";

    fn aggregate_id(&self) -> AggregateId {
        self.id.as_aggregate_id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitMemoCreated {
    pub tenant_id: TenantId,
    pub debit_memo_id: DebitMemoId,
    pub memo_number: String,
    pub purchase_return_id: SourceDocumentId,
    pub purchase_order_id: SourceDocumentId,
    pub supplier_id: PartyId,
    pub supplier_name: String,
    pub total_debit: Money,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitMemoPartiallyApplied {
    pub tenant_id: TenantId,
    pub debit_memo_id: DebitMemoId,
    pub memo_number: String,
    pub supplier_id: PartyId,
    pub application_id: DebitApplicationId,
    pub payable_id: PayableId,
    pub application_amount: Money,
    pub applied_amount: Money,
    pub remaining_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitMemoApplied {
    pub tenant_id: TenantId,
    pub debit_memo_id: DebitMemoId,
    pub memo_number: String,
    pub supplier_id: PartyId,
    pub application_id: DebitApplicationId,
    pub payable_id: PayableId,
    pub total_debit: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitMemoVoided {
    pub tenant_id: TenantId,
    pub debit_memo_id: DebitMemoId,
    pub memo_number: String,
    pub supplier_id: PartyId,
    pub total_debit: Money,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitMemoRefundReceived {
    pub tenant_id: TenantId,
    pub debit_memo_id: DebitMemoId,
    pub memo_number: String,
    pub supplier_id: PartyId,
    pub refund_amount: Money,
    pub refund_method: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebitMemoEvent {
    Created(DebitMemoCreated),
    PartiallyApplied(DebitMemoPartiallyApplied),
    Applied(DebitMemoApplied),
    Voided(DebitMemoVoided),
    RefundReceived(DebitMemoRefundReceived),
}

impl Event for DebitMemoEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DebitMemoEvent::Created(_) => "finance.debit_memo.created",
            DebitMemoEvent::PartiallyApplied(_) => "finance.debit_memo.partially_applied",
            DebitMemoEvent::Applied(_) => "finance.debit_memo.applied",
            DebitMemoEvent::Voided(_) => "finance.debit_memo.voided",
            DebitMemoEvent::RefundReceived(_) => "finance.debit_memo.refund_received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DebitMemoEvent::Created(e) => e.occurred_at,
            DebitMemoEvent::PartiallyApplied(e) => e.occurred_at,
            DebitMemoEvent::Applied(e) => e.occurred_at,
            DebitMemoEvent::Voided(e) => e.occurred_at,
            DebitMemoEvent::RefundReceived(e) => e.occurred_at,
        }
    }
}
