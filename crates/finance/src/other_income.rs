//! Income that does not come from sales: subsidies, interest, rent, asset disposals.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finledger_core::{
    AggregateId, AggregateRoot, DomainError, DomainResult, ErrorCode, Money, TenantId, UserId,
};
use finledger_events::{Event, TenantAggregate, TenantScoped};

use crate::ids::OtherIncomeId;
use crate::payment_voucher::PaymentMethod;
use crate::validation;

pub const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomeCategory {
    Investment,
    Subsidy,
    Interest,
    Rental,
    Refund,
    Compensation,
    AssetDisposal,
    Other,
}

impl IncomeCategory {
    pub const ALL: [IncomeCategory; 8] = [
        IncomeCategory::Investment,
        IncomeCategory::Subsidy,
        IncomeCategory::Interest,
        IncomeCategory::Rental,
        IncomeCategory::Refund,
        IncomeCategory::Compensation,
        IncomeCategory::AssetDisposal,
        IncomeCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IncomeCategory::Investment => "INVESTMENT",
            IncomeCategory::Subsidy => "SUBSIDY",
            IncomeCategory::Interest => "INTEREST",
            IncomeCategory::Rental => "RENTAL",
            IncomeCategory::Refund => "REFUND",
            IncomeCategory::Compensation => "COMPENSATION",
            IncomeCategory::AssetDisposal => "ASSET_DISPOSAL",
            IncomeCategory::Other => "OTHER",
        }
    }
}

impl core::fmt::Display for IncomeCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncomeCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncomeCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(ErrorCode::InvalidCategory, "Income category is not valid")
            })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncomeStatus {
    Draft,
    Confirmed,
    Cancelled,
}

impl IncomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IncomeStatus::Draft => "DRAFT",
            IncomeStatus::Confirmed => "CONFIRMED",
            IncomeStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == IncomeStatus::Cancelled
    }

    pub fn can_confirm(self) -> bool {
        self == IncomeStatus::Draft
    }

    pub fn can_cancel(self) -> bool {
        self == IncomeStatus::Draft
    }
}

impl core::fmt::Display for IncomeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptStatus {
    #[default]
    Pending,
    Received,
}

/// Command: CreateOtherIncome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOtherIncome {
    pub tenant_id: TenantId,
    pub income_number: String,
    pub category: IncomeCategory,
    pub amount: Money,
    pub description: String,
    pub received_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: OtherIncomeRecord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherIncomeRecord {
    id: OtherIncomeId,
    tenant_id: TenantId,
    income_number: String,
    category: IncomeCategory,
    amount: Money,
    description: String,
    received_at: DateTime<Utc>,
    status: IncomeStatus,
    #[serde(default)]
    receipt_status: ReceiptStatus,
    payment_method: Option<PaymentMethod>,
    actual_received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    remark: String,
    #[serde(default)]
    attachment_urls: Vec<String>,
    confirmed_at: Option<DateTime<Utc>>,
    confirmed_by: Option<UserId>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<UserId>,
    cancel_reason: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub(crate) fn check_details(amount: &Money, description: &str) -> DomainResult<()> {
    if !amount.is_positive() {
        return Err(DomainError::validation(
            ErrorCode::InvalidAmount,
            "Amount must be positive",
        ));
    }
    validation::non_empty(
        ErrorCode::InvalidDescription,
        "Description cannot be empty",
        description,
    )?;
    validation::max_len(
        ErrorCode::InvalidDescription,
        "Description",
        description,
        MAX_DESCRIPTION_LEN,
    )
}

impl OtherIncomeRecord {
    pub fn create(cmd: CreateOtherIncome) -> DomainResult<(Self, OtherIncomeEvent)> {
        validation::document_number(ErrorCode::InvalidIncomeNumber, "Income", &cmd.income_number)?;
        check_details(&cmd.amount, &cmd.description)?;

        let record = Self {
            id: OtherIncomeId::generate(),
            tenant_id: cmd.tenant_id,
            income_number: cmd.income_number,
            category: cmd.category,
            amount: cmd.amount,
            description: cmd.description,
            received_at: cmd.received_at,
            status: IncomeStatus::Draft,
            receipt_status: ReceiptStatus::Pending,
            payment_method: None,
            actual_received_at: None,
            remark: String::new(),
            attachment_urls: Vec::new(),
            confirmed_at: None,
            confirmed_by: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
            version: 1,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        };

        let event = OtherIncomeEvent::Created(OtherIncomeCreated {
            tenant_id: record.tenant_id,
            income_id: record.id,
            income_number: record.income_number.clone(),
            category: record.category,
            amount: record.amount,
            occurred_at: cmd.occurred_at,
        });
        Ok((record, event))
    }

    /// Edit category, amount, description and date while still a draft.
    pub fn update(
        &mut self,
        category: IncomeCategory,
        amount: Money,
        description: &str,
        received_at: DateTime<Utc>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != IncomeStatus::Draft {
            return Err(DomainError::invalid_state(
                "Can only update income in draft status",
            ));
        }
        check_details(&amount, description)?;

        self.category = category;
        self.amount = amount;
        self.description = description.to_string();
        self.received_at = received_at;
        self.touch(occurred_at);
        Ok(())
    }

    pub fn confirm(&mut self, confirmed_by: UserId, occurred_at: DateTime<Utc>) -> DomainResult<OtherIncomeEvent> {
        if !self.status.can_confirm() {
            return Err(DomainError::invalid_state(format!(
                "Cannot confirm income in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidUser,
            "Confirming user ID cannot be empty",
            confirmed_by.is_nil(),
        )?;

        self.status = IncomeStatus::Confirmed;
        self.confirmed_at = Some(occurred_at);
        self.confirmed_by = Some(confirmed_by);
        self.touch(occurred_at);

        Ok(OtherIncomeEvent::Confirmed(OtherIncomeConfirmed {
            tenant_id: self.tenant_id,
            income_id: self.id,
            income_number: self.income_number.clone(),
            amount: self.amount,
            confirmed_by,
            occurred_at,
        }))
    }

    pub fn cancel(
        &mut self,
        cancelled_by: UserId,
        reason: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<OtherIncomeEvent> {
        if !self.status.can_cancel() {
            return Err(DomainError::invalid_state(format!(
                "Cannot cancel income in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidUser,
            "Cancelling user ID cannot be empty",
            cancelled_by.is_nil(),
        )?;
        validation::non_empty(ErrorCode::InvalidReason, "Cancel reason is required", reason)?;

        self.status = IncomeStatus::Cancelled;
        self.cancelled_at = Some(occurred_at);
        self.cancelled_by = Some(cancelled_by);
        self.cancel_reason = Some(reason.to_string());
        self.touch(occurred_at);

        Ok(OtherIncomeEvent::Cancelled(OtherIncomeCancelled {
            tenant_id: self.tenant_id,
            income_id: self.id,
            income_number: self.income_number.clone(),
            cancelled_by,
            reason: reason.to_string(),
            occurred_at,
        }))
    }

    /// Record that the money actually arrived.
    pub fn mark_as_received(
        &mut self,
        method: PaymentMethod,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<OtherIncomeEvent> {
        if self.status != IncomeStatus::Confirmed {
            return Err(DomainError::invalid_state(
                "Only confirmed income can be marked as received",
            ));
        }
        if self.receipt_status == ReceiptStatus::Received {
            return Err(DomainError::invariant(
                ErrorCode::AlreadyReceived,
                "Income is already received",
            ));
        }

        self.receipt_status = ReceiptStatus::Received;
        self.payment_method = Some(method);
        self.actual_received_at = Some(occurred_at);
        self.touch(occurred_at);

        tracing::info!(income_id = %self.id, amount = %self.amount, %method, "other income received");

        Ok(OtherIncomeEvent::Received(OtherIncomeReceived {
            tenant_id: self.tenant_id,
            income_id: self.id,
            income_number: self.income_number.clone(),
            amount: self.amount,
            payment_method: method,
            occurred_at,
        }))
    }

    pub fn set_remark(&mut self, remark: impl Into<String>, occurred_at: DateTime<Utc>) {
        self.remark = remark.into();
        self.touch(occurred_at);
    }

    pub fn set_attachment_urls(&mut self, urls: Vec<String>, occurred_at: DateTime<Utc>) {
        self.attachment_urls = urls;
        self.touch(occurred_at);
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }

    pub fn id_typed(&self) -> OtherIncomeId {
        self.id
    }

    pub fn income_number(&self) -> &str {
        &self.income_number
    }

    pub fn category(&self) -> IncomeCategory {
        self.category
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn status(&self) -> IncomeStatus {
        self.status
    }

    pub fn receipt_status(&self) -> ReceiptStatus {
        self.receipt_status
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn actual_received_at(&self) -> Option<DateTime<Utc>> {
        self.actual_received_at
    }

    pub fn remark(&self) -> &str {
        &self.remark
    }

    pub fn attachment_urls(&self) -> &[String] {
        &self.attachment_urls
    }

    pub fn confirmed_by(&self) -> Option<UserId> {
        self.confirmed_by
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn is_draft(&self) -> bool {
        self.status == IncomeStatus::Draft
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == IncomeStatus::Confirmed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == IncomeStatus::Cancelled
    }

    pub fn is_received(&self) -> bool {
        self.receipt_status == ReceiptStatus::Received
    }
}

impl AggregateRoot for OtherIncomeRecord {
    type Id = OtherIncomeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantScoped for OtherIncomeRecord {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl TenantAggregate for OtherIncomeRecord {
    const AGGREGATE_TYPE: &'static str = "finance.other_income";

    fn aggregate_id(&self) -> AggregateId {
        self.id.as_aggregate_id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherIncomeCreated {
    pub tenant_id: TenantId,
    pub income_id: OtherIncomeId,
    pub income_number: String,
    pub category: IncomeCategory,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherIncomeConfirmed {
    pub tenant_id: TenantId,
    pub income_id: OtherIncomeId,
    pub income_number: String,
    pub amount: Money,
    pub confirmed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherIncomeCancelled {
    pub tenant_id: TenantId,
    pub income_id: OtherIncomeId,
    pub income_number: String,
    pub cancelled_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherIncomeReceived {
    pub tenant_id: TenantId,
    pub income_id: OtherIncomeId,
    pub income_number: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtherIncomeEvent {
    Created(OtherIncomeCreated),
    Confirmed(OtherIncomeConfirmed),
    Cancelled(OtherIncomeCancelled),
    Received(OtherIncomeReceived),
}

impl Event for OtherIncomeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OtherIncomeEvent::Created(_) => "finance.other_income.created",
            OtherIncomeEvent::Confirmed(_) => "finance.other_income.confirmed",
            OtherIncomeEvent::Cancelled(_) => "finance.other_income.cancelled",
            OtherIncomeEvent::Received(_) => "finance.other_income.received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OtherIncomeEvent::Created(e) => e.occurred_at,
            OtherIncomeEvent::Confirmed(e) => e.occurred_at,
            OtherIncomeEvent::Cancelled(e) => e.occurred_at,
            OtherIncomeEvent::Received(e) => e.occurred_at,
        }
    }
}
