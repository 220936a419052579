//! Credit memos raised when a sales return completes.
//!
//! The credit is either applied against the customer's receivables or
//! refunded in one go.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finledger_core::money::percentage;
use finledger_core::{
    AggregateId, AggregateRoot, Currency, DomainError, DomainResult, Entity, ErrorCode, Money,
    TenantId,
};
use finledger_events::{Event, TenantAggregate, TenantScoped};

use crate::ids::{
    CreditApplicationId, CreditMemoId, CreditMemoItemId, PartyId, ProductId, ReceivableId,
    ReturnItemId, SourceDocumentId,
};
use crate::validation;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CreditMemoStatus {
    Pending,
    Partial,
    Applied,
    Voided,
    Refunded,
}

impl CreditMemoStatus {
    pub const ALL: [CreditMemoStatus; 5] = [
        CreditMemoStatus::Pending,
        CreditMemoStatus::Partial,
        CreditMemoStatus::Applied,
        CreditMemoStatus::Voided,
        CreditMemoStatus::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CreditMemoStatus::Pending => "PENDING",
            CreditMemoStatus::Partial => "PARTIAL",
            CreditMemoStatus::Applied => "APPLIED",
            CreditMemoStatus::Voided => "VOIDED",
            CreditMemoStatus::Refunded => "REFUNDED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CreditMemoStatus::Applied | CreditMemoStatus::Voided | CreditMemoStatus::Refunded
        )
    }

    pub fn can_apply(self) -> bool {
        matches!(self, CreditMemoStatus::Pending | CreditMemoStatus::Partial)
    }
}

impl core::fmt::Display for CreditMemoStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditMemoStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CreditMemoStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(
                    ErrorCode::InvalidStatus,
                    format!("unknown memo status: {s}"),
                )
            })
    }
}

/// Returned product line being credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMemoItem {
    pub id: CreditMemoItemId,
    pub credit_memo_id: CreditMemoId,
    pub sales_return_id: SourceDocumentId,
    pub return_item_id: ReturnItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_code: String,
    pub unit: String,
    pub return_quantity: Decimal,
    pub unit_price: Decimal,
    /// `return_quantity * unit_price`.
    pub credit_amount: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for CreditMemoItem {
    type Id = CreditMemoItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for [`CreditMemo::add_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCreditMemoItem {
    pub sales_return_id: SourceDocumentId,
    pub return_item_id: ReturnItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_code: String,
    pub unit: String,
    pub return_quantity: Decimal,
    pub unit_price: Money,
    pub reason: String,
}

/// Part of the credit offset against one receivable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMemoApplication {
    pub id: CreditApplicationId,
    pub credit_memo_id: CreditMemoId,
    pub receivable_id: ReceivableId,
    pub amount: Decimal,
    pub applied_at: DateTime<Utc>,
    #[serde(default)]
    pub remark: String,
}

impl Entity for CreditMemoApplication {
    type Id = CreditApplicationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreateCreditMemo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCreditMemo {
    pub tenant_id: TenantId,
    pub memo_number: String,
    pub sales_return_id: SourceDocumentId,
    pub sales_return_number: String,
    pub sales_order_id: SourceDocumentId,
    pub sales_order_number: String,
    pub customer_id: PartyId,
    pub customer_name: String,
    pub total_credit: Money,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: CreditMemo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMemo {
    id: CreditMemoId,
    tenant_id: TenantId,
    memo_number: String,
    sales_return_id: SourceDocumentId,
    sales_return_number: String,
    sales_order_id: SourceDocumentId,
    sales_order_number: String,
    customer_id: PartyId,
    customer_name: String,
    original_receivable_id: Option<ReceivableId>,
    #[serde(default)]
    items: Vec<CreditMemoItem>,
    currency: Currency,
    total_credit: Decimal,
    applied_amount: Decimal,
    remaining_amount: Decimal,
    status: CreditMemoStatus,
    #[serde(default)]
    applications: Vec<CreditMemoApplication>,
    reason: String,
    #[serde(default)]
    remark: String,
    applied_at: Option<DateTime<Utc>>,
    voided_at: Option<DateTime<Utc>>,
    void_reason: Option<String>,
    refunded_at: Option<DateTime<Utc>>,
    refund_method: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CreditMemo {
    pub fn create(cmd: CreateCreditMemo) -> DomainResult<(Self, CreditMemoEvent)> {
        validation::document_number(ErrorCode::InvalidMemoNumber, "Memo", &cmd.memo_number)?;
        validation::present(
            ErrorCode::InvalidSalesReturn,
            "Sales return ID cannot be empty",
            cmd.sales_return_id.is_nil(),
        )?;
        validation::present(
            ErrorCode::InvalidSalesOrder,
            "Sales order ID cannot be empty",
            cmd.sales_order_id.is_nil(),
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
        if !cmd.total_credit.is_positive() {
            return Err(DomainError::validation(
                ErrorCode::InvalidAmount,
                "Total credit must be positive",
            ));
        }

        let memo = Self {
            id: CreditMemoId::generate(),
            tenant_id: cmd.tenant_id,
            memo_number: cmd.memo_number,
            sales_return_id: cmd.sales_return_id,
            sales_return_number: cmd.sales_return_number,
            sales_order_id: cmd.sales_order_id,
            sales_order_number: cmd.sales_order_number,
            customer_id: cmd.customer_id,
            customer_name: cmd.customer_name,
            original_receivable_id: None,
            items: Vec::new(),
            currency: cmd.total_credit.currency(),
            total_credit: cmd.total_credit.amount(),
            applied_amount: Decimal::ZERO,
            remaining_amount: cmd.total_credit.amount(),
            status: CreditMemoStatus::Pending,
            applications: Vec::new(),
            reason: cmd.reason,
            remark: String::new(),
            applied_at: None,
            voided_at: None,
            void_reason: None,
            refunded_at: None,
            refund_method: None,
            version: 1,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        };

        let event = CreditMemoEvent::Created(CreditMemoCreated {
            tenant_id: memo.tenant_id,
            credit_memo_id: memo.id,
            memo_number: memo.memo_number.clone(),
            sales_return_id: memo.sales_return_id,
            sales_order_id: memo.sales_order_id,
            customer_id: memo.customer_id,
            customer_name: memo.customer_name.clone(),
            total_credit: cmd.total_credit,
            reason: memo.reason.clone(),
            occurred_at: cmd.occurred_at,
        });
        Ok((memo, event))
    }

    pub fn add_item(
        &mut self,
        item: NewCreditMemoItem,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<CreditMemoItem> {
        if self.status != CreditMemoStatus::Pending {
            return Err(DomainError::invalid_state(
                "Cannot add items to a non-pending credit memo",
            ));
        }
        if item.return_quantity <= Decimal::ZERO {
            return Err(DomainError::validation(
                ErrorCode::InvalidQuantity,
                "Return quantity must be positive",
            ));
        }
        if item.unit_price.currency() != self.currency {
            return Err(DomainError::validation(
                ErrorCode::CurrencyMismatch,
                format!("Unit price must be in {}", self.currency),
            ));
        }
        if item.unit_price.is_negative() {
            return Err(DomainError::validation(
                ErrorCode::InvalidAmount,
                "Unit price cannot be negative",
            ));
        }
        let credit_amount = item
            .return_quantity
            .checked_mul(item.unit_price.amount())
            .ok_or_else(|| DomainError::validation(ErrorCode::InvalidAmount, "credit amount overflow"))?;
        self.items_total()?
            .amount()
            .checked_add(credit_amount)
            .ok_or_else(|| DomainError::validation(ErrorCode::InvalidAmount, "items total overflow"))?;

        let line = CreditMemoItem {
            id: CreditMemoItemId::generate(),
            credit_memo_id: self.id,
            sales_return_id: item.sales_return_id,
            return_item_id: item.return_item_id,
            product_id: item.product_id,
            product_name: item.product_name,
            product_code: item.product_code,
            unit: item.unit,
            return_quantity: item.return_quantity,
            unit_price: item.unit_price.amount(),
            credit_amount,
            reason: item.reason,
            created_at: occurred_at,
        };
        self.items.push(line.clone());
        self.touch(occurred_at);
        Ok(line)
    }

    /// Link the receivable this memo offsets.
    pub fn set_original_receivable(
        &mut self,
        receivable_id: ReceivableId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        validation::present(
            ErrorCode::InvalidReceivable,
            "Receivable ID cannot be empty",
            receivable_id.is_nil(),
        )?;
        self.original_receivable_id = Some(receivable_id);
        self.touch(occurred_at);
        Ok(())
    }

    pub fn apply_to_receivable(
        &mut self,
        receivable_id: ReceivableId,
        amount: Money,
        remark: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<CreditMemoEvent> {
        if !self.status.can_apply() {
            return Err(DomainError::invalid_state(format!(
                "Cannot apply credit memo in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidReceivable,
            "Receivable ID cannot be empty",
            receivable_id.is_nil(),
        )?;
        let value = validation::positive_amount(&amount, self.currency, "Application amount")?;
        if value > self.remaining_amount {
            return Err(DomainError::invariant(
                ErrorCode::ExceedsRemaining,
                format!(
                    "Application amount {value} exceeds remaining credit {}",
                    self.remaining_amount
                ),
            ));
        }

        let application = CreditMemoApplication {
            id: CreditApplicationId::generate(),
            credit_memo_id: self.id,
            receivable_id,
            amount: value,
            applied_at: occurred_at,
            remark: remark.to_string(),
        };
        self.applications.push(application.clone());
        self.applied_amount += value;
        self.remaining_amount = self.total_credit - self.applied_amount;
        self.touch(occurred_at);

        let event = if self.remaining_amount.is_zero() {
            self.status = CreditMemoStatus::Applied;
            self.applied_at = Some(occurred_at);
            tracing::info!(credit_memo_id = %self.id, "credit memo fully applied");
            CreditMemoEvent::Applied(CreditMemoApplied {
                tenant_id: self.tenant_id,
                credit_memo_id: self.id,
                memo_number: self.memo_number.clone(),
                customer_id: self.customer_id,
                application_id: application.id,
                receivable_id,
                total_credit: self.total_credit(),
                occurred_at,
            })
        } else {
            self.status = CreditMemoStatus::Partial;
            CreditMemoEvent::PartiallyApplied(CreditMemoPartiallyApplied {
                tenant_id: self.tenant_id,
                credit_memo_id: self.id,
                memo_number: self.memo_number.clone(),
                customer_id: self.customer_id,
                application_id: application.id,
                receivable_id,
                application_amount: amount,
                applied_amount: self.applied_amount(),
                remaining_amount: self.remaining_amount(),
                occurred_at,
            })
        };
        Ok(event)
    }

    pub fn void(&mut self, reason: &str, occurred_at: DateTime<Utc>) -> DomainResult<CreditMemoEvent> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "Cannot void credit memo in {} status",
                self.status
            )));
        }
        if self.applied_amount > Decimal::ZERO {
            return Err(DomainError::invariant(
                ErrorCode::HasApplications,
                "Cannot void credit memo with existing applications",
            ));
        }
        validation::non_empty(ErrorCode::InvalidReason, "Void reason is required", reason)?;

        self.status = CreditMemoStatus::Voided;
        self.voided_at = Some(occurred_at);
        self.void_reason = Some(reason.to_string());
        self.remaining_amount = Decimal::ZERO;
        self.touch(occurred_at);

        tracing::info!(credit_memo_id = %self.id, "credit memo voided");

        Ok(CreditMemoEvent::Voided(CreditMemoVoided {
            tenant_id: self.tenant_id,
            credit_memo_id: self.id,
            memo_number: self.memo_number.clone(),
            customer_id: self.customer_id,
            total_credit: self.total_credit(),
            reason: reason.to_string(),
            occurred_at,
        }))
    }

    /// Pay the remaining credit back to the customer instead of applying it.
    pub fn refund(&mut self, method: &str, occurred_at: DateTime<Utc>) -> DomainResult<CreditMemoEvent> {
        if !self.status.can_apply() {
            return Err(DomainError::invalid_state(format!(
                "Cannot refund credit memo in {} status",
                self.status
            )));
        }
        if self.remaining_amount <= Decimal::ZERO {
            return Err(DomainError::invariant(
                ErrorCode::NoRemaining,
                "No remaining credit to refund",
            ));
        }
        validation::non_empty(ErrorCode::InvalidMethod, "Refund method is required", method)?;

        let refund_amount = self.remaining_amount();
        self.status = CreditMemoStatus::Refunded;
        self.refunded_at = Some(occurred_at);
        self.refund_method = Some(method.to_string());
        // The whole credit counts as handled once refunded.
        self.applied_amount = self.total_credit;
        self.remaining_amount = Decimal::ZERO;
        self.touch(occurred_at);

        tracing::info!(credit_memo_id = %self.id, refund = %refund_amount, method, "credit memo refunded");

        Ok(CreditMemoEvent::Refunded(CreditMemoRefunded {
            tenant_id: self.tenant_id,
            credit_memo_id: self.id,
            memo_number: self.memo_number.clone(),
            customer_id: self.customer_id,
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

impl CreditMemo {
    pub fn id_typed(&self) -> CreditMemoId {
        self.id
    }

    pub fn memo_number(&self) -> &str {
        &self.memo_number
    }

    pub fn sales_return_id(&self) -> SourceDocumentId {
        self.sales_return_id
    }

    pub fn sales_return_number(&self) -> &str {
        &self.sales_return_number
    }

    pub fn sales_order_id(&self) -> SourceDocumentId {
        self.sales_order_id
    }

    pub fn sales_order_number(&self) -> &str {
        &self.sales_order_number
    }

    pub fn customer_id(&self) -> PartyId {
        self.customer_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn original_receivable_id(&self) -> Option<ReceivableId> {
        self.original_receivable_id
    }

    pub fn items(&self) -> &[CreditMemoItem] {
        &self.items
    }

    pub fn applications(&self) -> &[CreditMemoApplication] {
        &self.applications
    }

    pub fn total_credit(&self) -> Money {
        Money::new(self.total_credit, self.currency)
    }

    pub fn applied_amount(&self) -> Money {
        Money::new(self.applied_amount, self.currency)
    }

    pub fn remaining_amount(&self) -> Money {
        Money::new(self.remaining_amount, self.currency)
    }

    pub fn status(&self) -> CreditMemoStatus {
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

    pub fn refunded_at(&self) -> Option<DateTime<Utc>> {
        self.refunded_at
    }

    pub fn refund_method(&self) -> Option<&str> {
        self.refund_method.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.status == CreditMemoStatus::Pending
    }

    pub fn is_partial(&self) -> bool {
        self.status == CreditMemoStatus::Partial
    }

    pub fn is_applied(&self) -> bool {
        self.status == CreditMemoStatus::Applied
    }

    pub fn is_voided(&self) -> bool {
        self.status == CreditMemoStatus::Voided
    }

    pub fn is_refunded(&self) -> bool {
        self.status == CreditMemoStatus::Refunded
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn application_count(&self) -> usize {
        self.applications.len()
    }

    /// Sum of item credit amounts, which may differ from `total_credit`.
    /// `INVALID_AMOUNT` if it leaves the decimal range.
    pub fn items_total(&self) -> DomainResult<Money> {
        let total = self
            .items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.credit_amount))
            .ok_or_else(|| DomainError::validation(ErrorCode::InvalidAmount, "items total overflow"))?;
        Ok(Money::new(total, self.currency))
    }

    pub fn applied_percentage(&self) -> DomainResult<Decimal> {
        percentage(self.applied_amount, self.total_credit)
    }
}

impl AggregateRoot for CreditMemo {
    type Id = CreditMemoId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantScoped for CreditMemo {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl TenantAggregate for CreditMemo {
    const AGGREGATE_TYPE: &'static str = "finance.credit_memo";

    fn aggregate_id(&self) -> AggregateId {
        self.id.as_aggregate_id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMemoCreated {
    pub tenant_id: TenantId,
    pub credit_memo_id: CreditMemoId,
    pub memo_number: String,
    pub sales_return_id: SourceDocumentId,
    pub sales_order_id: SourceDocumentId,
    pub customer_id: PartyId,
    pub customer_name: String,
    pub total_credit: Money,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMemoPartiallyApplied {
    pub tenant_id: TenantId,
    pub credit_memo_id: CreditMemoId,
    pub memo_number: String,
    pub customer_id: PartyId,
    pub application_id: CreditApplicationId,
    pub receivable_id: ReceivableId,
    pub application_amount: Money,
    pub applied_amount: Money,
    pub remaining_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMemoApplied {
    pub tenant_id: TenantId,
    pub credit_memo_id: CreditMemoId,
    pub memo_number: String,
    pub customer_id: PartyId,
    pub application_id: CreditApplicationId,
    pub receivable_id: ReceivableId,
    pub total_credit: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMemoVoided {
    pub tenant_id: TenantId,
    pub credit_memo_id: CreditMemoId,
    pub memo_number: String,
    pub customer_id: PartyId,
    pub total_credit: Money,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMemoRefunded {
    pub tenant_id: TenantId,
    pub credit_memo_id: CreditMemoId,
    pub memo_number: String,
    pub customer_id: PartyId,
    pub refund_amount: Money,
    pub refund_method: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditMemoEvent {
    Created(CreditMemoCreated),
    PartiallyApplied(CreditMemoPartiallyApplied),
    Applied(CreditMemoApplied),
    Voided(CreditMemoVoided),
    Refunded(CreditMemoRefunded),
}

impl Event for CreditMemoEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CreditMemoEvent::Created(_) => "finance.credit_memo.created",
            CreditMemoEvent::PartiallyApplied(_) => "finance.credit_memo.partially_applied",
            CreditMemoEvent::Applied(_) => "finance.credit_memo.applied",
            CreditMemoEvent::Voided(_) => "finance.credit_memo.voided",
            CreditMemoEvent::Refunded(_) => "finance.credit_memo.refunded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CreditMemoEvent::Created(e) => e.occurred_at,
            CreditMemoEvent::PartiallyApplied(e) => e.occurred_at,
            CreditMemoEvent::Applied(e) => e.occurred_at,
            CreditMemoEvent::Voided(e) => e.occurred_at,
            CreditMemoEvent::Refunded(e) => e.occurred_at,
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

    fn create_cmd(total: Decimal) -> CreateCreditMemo {
        CreateCreditMemo {
            tenant_id: TenantId::new(),
            memo_number: "CM-2024-0001".to_string(),
            sales_return_id: SourceDocumentId::generate(),
            sales_return_number: "SR-2024-0001".to_string(),
            sales_order_id: SourceDocumentId::generate(),
            sales_order_number: "SO-2024-0001".to_string(),
            customer_id: PartyId::generate(),
            customer_name: "Acme Trading".to_string(),
            total_credit: Money::cny(total),
            reason: "damaged in transit".to_string(),
            occurred_at: test_time(),
        }
    }

    fn memo(total: Decimal) -> CreditMemo {
        CreditMemo::create(create_cmd(total)).unwrap().0
    }

    fn item(quantity: Decimal, unit_price: Decimal) -> NewCreditMemoItem {
        NewCreditMemoItem {
            sales_return_id: SourceDocumentId::generate(),
            return_item_id: ReturnItemId::generate(),
            product_id: ProductId::generate(),
            product_name: "Widget".to_string(),
            product_code: "W-01".to_string(),
            unit: "pcs".to_string(),
            return_quantity: quantity,
            unit_price: Money::cny(unit_price),
            reason: String::new(),
        }
    }

    #[test]
    fn create_validates_references() {
        let err = CreditMemo::create(CreateCreditMemo {
            sales_return_id: SourceDocumentId::new(AggregateId::nil()),
            ..create_cmd(dec!(10))
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSalesReturn);

        let err = CreditMemo::create(CreateCreditMemo {
            sales_order_id: SourceDocumentId::new(AggregateId::nil()),
            ..create_cmd(dec!(10))
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSalesOrder);

        let err = CreditMemo::create(create_cmd(dec!(0))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);
    }

    #[test]
    fn items_compute_credit_amount() {
        let mut cm = memo(dec!(150));
        let line = cm.add_item(item(dec!(3), dec!(25.5)), test_time()).unwrap();
        assert_eq!(line.credit_amount, dec!(76.5));
        cm.add_item(item(dec!(1), dec!(0)), test_time()).unwrap();
        assert_eq!(cm.items_total().unwrap().amount(), dec!(76.5));
        assert_eq!(cm.item_count(), 2);

        let err = cm.add_item(item(dec!(0), dec!(1)), test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidQuantity);
    }

    #[test]
    fn items_total_never_overflows() {
        let mut cm = memo(dec!(150));
        let line = cm.add_item(item(dec!(1), Decimal::MAX), test_time()).unwrap();
        let version = cm.version();

        let err = cm.add_item(item(dec!(1), Decimal::MAX), test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);
        assert_eq!(cm.item_count(), 1);
        assert_eq!(cm.version(), version);
        assert_eq!(cm.items_total().unwrap().amount(), Decimal::MAX);

        // Rows loaded from storage bypass add_item.
        cm.items.push(line);
        let err = cm.items_total().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);
    }

    #[test]
    fn applications_consume_credit() {
        let mut cm = memo(dec!(500));
        let ar = ReceivableId::generate();

        let event = cm.apply_to_receivable(ar, Money::cny(dec!(200)), "", test_time()).unwrap();
        assert!(matches!(event, CreditMemoEvent::PartiallyApplied(_)));
        assert!(cm.is_partial());
        assert_eq!(cm.remaining_amount().amount(), dec!(300));
        assert_eq!(cm.applied_percentage().unwrap(), dec!(40));

        let err = cm
            .add_item(item(dec!(1), dec!(1)), test_time())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);

        let err = cm
            .apply_to_receivable(ar, Money::cny(dec!(300.01)), "", test_time())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExceedsRemaining);

        let event = cm.apply_to_receivable(ar, Money::cny(dec!(300)), "", test_time()).unwrap();
        assert!(matches!(event, CreditMemoEvent::Applied(_)));
        assert!(cm.is_applied());
        assert!(cm.applied_at().is_some());
        assert_eq!(cm.application_count(), 2);
    }

    #[test]
    fn void_requires_untouched_memo() {
        let mut cm = memo(dec!(100));
        cm.apply_to_receivable(ReceivableId::generate(), Money::cny(dec!(1)), "", test_time())
            .unwrap();
        assert_eq!(cm.void("oops", test_time()).unwrap_err().code(), ErrorCode::HasApplications);

        let mut cm = memo(dec!(100));
        assert_eq!(cm.void("", test_time()).unwrap_err().code(), ErrorCode::InvalidReason);
        cm.void("return cancelled", test_time()).unwrap();
        assert!(cm.is_voided());
        assert_eq!(cm.remaining_amount().amount(), Decimal::ZERO);
    }

    #[test]
    fn refund_settles_remaining_credit() {
        let mut cm = memo(dec!(100));
        cm.apply_to_receivable(ReceivableId::generate(), Money::cny(dec!(30)), "", test_time())
            .unwrap();

        assert_eq!(cm.refund("", test_time()).unwrap_err().code(), ErrorCode::InvalidMethod);

        let event = cm.refund("BANK_TRANSFER", test_time()).unwrap();
        match event {
            CreditMemoEvent::Refunded(e) => assert_eq!(e.refund_amount.amount(), dec!(70)),
            other => panic!("Expected Refunded event, got {other:?}"),
        }
        assert!(cm.is_refunded());
        assert_eq!(cm.applied_amount().amount(), dec!(100));
        assert_eq!(cm.remaining_amount().amount(), Decimal::ZERO);
        assert_eq!(cm.refund_method(), Some("BANK_TRANSFER"));

        let err = cm.refund("CASH", test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[test]
    fn original_receivable_must_be_set() {
        let mut cm = memo(dec!(100));
        let err = cm
            .set_original_receivable(ReceivableId::new(AggregateId::nil()), test_time())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidReceivable);

        let ar = ReceivableId::generate();
        cm.set_original_receivable(ar, test_time()).unwrap();
        assert_eq!(cm.original_receivable_id(), Some(ar));
        assert_eq!(cm.version(), 2);
    }
}
