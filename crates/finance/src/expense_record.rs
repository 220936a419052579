//! Non-trade expenses (rent, utilities, salaries) with a submit/approve workflow.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finledger_core::{
    AggregateId, AggregateRoot, DomainError, DomainResult, ErrorCode, Money, TenantId, UserId,
};
use finledger_events::{Event, TenantAggregate, TenantScoped};

use crate::ids::ExpenseId;
use crate::other_income::check_details;
use crate::payment_voucher::PaymentMethod;
use crate::validation;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpenseCategory {
    Rent,
    Utilities,
    Salary,
    Office,
    Travel,
    Marketing,
    Equipment,
    Maintenance,
    Insurance,
    Tax,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 11] = [
        ExpenseCategory::Rent,
        ExpenseCategory::Utilities,
        ExpenseCategory::Salary,
        ExpenseCategory::Office,
        ExpenseCategory::Travel,
        ExpenseCategory::Marketing,
        ExpenseCategory::Equipment,
        ExpenseCategory::Maintenance,
        ExpenseCategory::Insurance,
        ExpenseCategory::Tax,
        ExpenseCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "RENT",
            ExpenseCategory::Utilities => "UTILITIES",
            ExpenseCategory::Salary => "SALARY",
            ExpenseCategory::Office => "OFFICE",
            ExpenseCategory::Travel => "TRAVEL",
            ExpenseCategory::Marketing => "MARKETING",
            ExpenseCategory::Equipment => "EQUIPMENT",
            ExpenseCategory::Maintenance => "MAINTENANCE",
            ExpenseCategory::Insurance => "INSURANCE",
            ExpenseCategory::Tax => "TAX",
            ExpenseCategory::Other => "OTHER",
        }
    }
}

impl core::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(ErrorCode::InvalidCategory, "Expense category is not valid")
            })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpenseStatus {
    Draft,
    /// Submitted, waiting for approval.
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl ExpenseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseStatus::Draft => "DRAFT",
            ExpenseStatus::Pending => "PENDING",
            ExpenseStatus::Approved => "APPROVED",
            ExpenseStatus::Rejected => "REJECTED",
            ExpenseStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExpenseStatus::Approved | ExpenseStatus::Rejected | ExpenseStatus::Cancelled
        )
    }

    pub fn can_submit(self) -> bool {
        self == ExpenseStatus::Draft
    }

    pub fn can_approve(self) -> bool {
        self == ExpenseStatus::Pending
    }

    pub fn can_cancel(self) -> bool {
        matches!(self, ExpenseStatus::Draft | ExpenseStatus::Pending)
    }
}

impl core::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpensePaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

/// Command: CreateExpense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateExpense {
    pub tenant_id: TenantId,
    pub expense_number: String,
    pub category: ExpenseCategory,
    pub amount: Money,
    pub description: String,
    pub incurred_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: ExpenseRecord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    id: ExpenseId,
    tenant_id: TenantId,
    expense_number: String,
    category: ExpenseCategory,
    amount: Money,
    description: String,
    incurred_at: DateTime<Utc>,
    status: ExpenseStatus,
    #[serde(default)]
    payment_status: ExpensePaymentStatus,
    payment_method: Option<PaymentMethod>,
    paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    remark: String,
    #[serde(default)]
    attachment_urls: Vec<String>,
    submitted_at: Option<DateTime<Utc>>,
    submitted_by: Option<UserId>,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<UserId>,
    #[serde(default)]
    approval_remark: String,
    rejected_at: Option<DateTime<Utc>>,
    rejected_by: Option<UserId>,
    rejection_reason: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<UserId>,
    cancel_reason: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ExpenseRecord {
    pub fn create(cmd: CreateExpense) -> DomainResult<(Self, ExpenseEvent)> {
        validation::document_number(ErrorCode::InvalidExpenseNumber, "Expense", &cmd.expense_number)?;
        check_details(&cmd.amount, &cmd.description)?;

        let record = Self {
            id: ExpenseId::generate(),
            tenant_id: cmd.tenant_id,
            expense_number: cmd.expense_number,
            category: cmd.category,
            amount: cmd.amount,
            description: cmd.description,
            incurred_at: cmd.incurred_at,
            status: ExpenseStatus::Draft,
            payment_status: ExpensePaymentStatus::Unpaid,
            payment_method: None,
            paid_at: None,
            remark: String::new(),
            attachment_urls: Vec::new(),
            submitted_at: None,
            submitted_by: None,
            approved_at: None,
            approved_by: None,
            approval_remark: String::new(),
            rejected_at: None,
            rejected_by: None,
            rejection_reason: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
            version: 1,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        };

        let event = ExpenseEvent::Created(ExpenseCreated {
            tenant_id: record.tenant_id,
            expense_id: record.id,
            expense_number: record.expense_number.clone(),
            category: record.category,
            amount: record.amount,
            occurred_at: cmd.occurred_at,
        });
        Ok((record, event))
    }

    pub fn update(
        &mut self,
        category: ExpenseCategory,
        amount: Money,
        description: &str,
        incurred_at: DateTime<Utc>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != ExpenseStatus::Draft {
            return Err(DomainError::invalid_state(
                "Can only update expense in draft status",
            ));
        }
        check_details(&amount, description)?;

        self.category = category;
        self.amount = amount;
        self.description = description.to_string();
        self.incurred_at = incurred_at;
        self.touch(occurred_at);
        Ok(())
    }

    pub fn submit(&mut self, submitted_by: UserId, occurred_at: DateTime<Utc>) -> DomainResult<ExpenseEvent> {
        if !self.status.can_submit() {
            return Err(DomainError::invalid_state(format!(
                "Cannot submit expense in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidUser,
            "Submitter user ID cannot be empty",
            submitted_by.is_nil(),
        )?;

        self.status = ExpenseStatus::Pending;
        self.submitted_at = Some(occurred_at);
        self.submitted_by = Some(submitted_by);
        self.touch(occurred_at);

        Ok(ExpenseEvent::Submitted(ExpenseSubmitted {
            tenant_id: self.tenant_id,
            expense_id: self.id,
            expense_number: self.expense_number.clone(),
            amount: self.amount,
            submitted_by,
            occurred_at,
        }))
    }

    pub fn approve(
        &mut self,
        approved_by: UserId,
        remark: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<ExpenseEvent> {
        if !self.status.can_approve() {
            return Err(DomainError::invalid_state(format!(
                "Cannot approve expense in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidUser,
            "Approver user ID cannot be empty",
            approved_by.is_nil(),
        )?;

        self.status = ExpenseStatus::Approved;
        self.approved_at = Some(occurred_at);
        self.approved_by = Some(approved_by);
        self.approval_remark = remark.to_string();
        self.touch(occurred_at);

        tracing::info!(expense_id = %self.id, amount = %self.amount, "expense approved");

        Ok(ExpenseEvent::Approved(ExpenseApproved {
            tenant_id: self.tenant_id,
            expense_id: self.id,
            expense_number: self.expense_number.clone(),
            category: self.category,
            amount: self.amount,
            approved_by,
            occurred_at,
        }))
    }

    pub fn reject(
        &mut self,
        rejected_by: UserId,
        reason: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<ExpenseEvent> {
        if !self.status.can_approve() {
            return Err(DomainError::invalid_state(format!(
                "Cannot reject expense in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidUser,
            "Rejector user ID cannot be empty",
            rejected_by.is_nil(),
        )?;
        validation::non_empty(ErrorCode::InvalidReason, "Rejection reason is required", reason)?;

        self.status = ExpenseStatus::Rejected;
        self.rejected_at = Some(occurred_at);
        self.rejected_by = Some(rejected_by);
        self.rejection_reason = Some(reason.to_string());
        self.touch(occurred_at);

        Ok(ExpenseEvent::Rejected(ExpenseRejected {
            tenant_id: self.tenant_id,
            expense_id: self.id,
            expense_number: self.expense_number.clone(),
            rejected_by,
            reason: reason.to_string(),
            occurred_at,
        }))
    }

    pub fn cancel(
        &mut self,
        cancelled_by: UserId,
        reason: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<ExpenseEvent> {
        if !self.status.can_cancel() {
            return Err(DomainError::invalid_state(format!(
                "Cannot cancel expense in {} status",
                self.status
            )));
        }
        validation::present(
            ErrorCode::InvalidUser,
            "Canceller user ID cannot be empty",
            cancelled_by.is_nil(),
        )?;
        validation::non_empty(ErrorCode::InvalidReason, "Cancel reason is required", reason)?;

        self.status = ExpenseStatus::Cancelled;
        self.cancelled_at = Some(occurred_at);
        self.cancelled_by = Some(cancelled_by);
        self.cancel_reason = Some(reason.to_string());
        self.touch(occurred_at);

        Ok(ExpenseEvent::Cancelled(ExpenseCancelled {
            tenant_id: self.tenant_id,
            expense_id: self.id,
            expense_number: self.expense_number.clone(),
            cancelled_by,
            reason: reason.to_string(),
            occurred_at,
        }))
    }

    /// Record that an approved expense has been paid out.
    pub fn mark_as_paid(
        &mut self,
        method: PaymentMethod,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<ExpenseEvent> {
        if self.status != ExpenseStatus::Approved {
            return Err(DomainError::invalid_state(
                "Only approved expenses can be marked as paid",
            ));
        }
        if self.payment_status == ExpensePaymentStatus::Paid {
            return Err(DomainError::invariant(
                ErrorCode::AlreadyPaid,
                "Expense is already paid",
            ));
        }

        self.payment_status = ExpensePaymentStatus::Paid;
        self.payment_method = Some(method);
        self.paid_at = Some(occurred_at);
        self.touch(occurred_at);

        tracing::info!(expense_id = %self.id, amount = %self.amount, %method, "expense paid");

        Ok(ExpenseEvent::Paid(ExpensePaid {
            tenant_id: self.tenant_id,
            expense_id: self.id,
            expense_number: self.expense_number.clone(),
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

    pub fn id_typed(&self) -> ExpenseId {
        self.id
    }

    pub fn expense_number(&self) -> &str {
        &self.expense_number
    }

    pub fn category(&self) -> ExpenseCategory {
        self.category
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn incurred_at(&self) -> DateTime<Utc> {
        self.incurred_at
    }

    pub fn status(&self) -> ExpenseStatus {
        self.status
    }

    pub fn payment_status(&self) -> ExpensePaymentStatus {
        self.payment_status
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn remark(&self) -> &str {
        &self.remark
    }

    pub fn attachment_urls(&self) -> &[String] {
        &self.attachment_urls
    }

    pub fn submitted_by(&self) -> Option<UserId> {
        self.submitted_by
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    pub fn approval_remark(&self) -> &str {
        &self.approval_remark
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn is_draft(&self) -> bool {
        self.status == ExpenseStatus::Draft
    }

    pub fn is_pending(&self) -> bool {
        self.status == ExpenseStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == ExpenseStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.status == ExpenseStatus::Rejected
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == ExpenseStatus::Cancelled
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == ExpensePaymentStatus::Paid
    }
}

impl AggregateRoot for ExpenseRecord {
    type Id = ExpenseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantScoped for ExpenseRecord {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl TenantAggregate for ExpenseRecord {
    const AGGREGATE_TYPE: &'static str = "finance.expense";

    fn aggregate_id(&self) -> AggregateId {
        self.id.as_aggregate_id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseCreated {
    pub tenant_id: TenantId,
    pub expense_id: ExpenseId,
    pub expense_number: String,
    pub category: ExpenseCategory,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSubmitted {
    pub tenant_id: TenantId,
    pub expense_id: ExpenseId,
    pub expense_number: String,
    pub amount: Money,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseApproved {
    pub tenant_id: TenantId,
    pub expense_id: ExpenseId,
    pub expense_number: String,
    pub category: ExpenseCategory,
    pub amount: Money,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRejected {
    pub tenant_id: TenantId,
    pub expense_id: ExpenseId,
    pub expense_number: String,
    pub rejected_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseCancelled {
    pub tenant_id: TenantId,
    pub expense_id: ExpenseId,
    pub expense_number: String,
    pub cancelled_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpensePaid {
    pub tenant_id: TenantId,
    pub expense_id: ExpenseId,
    pub expense_number: String,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseEvent {
    Created(ExpenseCreated),
    Submitted(ExpenseSubmitted),
    Approved(ExpenseApproved),
    Rejected(ExpenseRejected),
    Cancelled(ExpenseCancelled),
    Paid(ExpensePaid),
}

impl Event for ExpenseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ExpenseEvent::Created(_) => "finance.expense.created",
            ExpenseEvent::Submitted(_) => "finance.expense.submitted",
            ExpenseEvent::Approved(_) => "finance.expense.approved",
            ExpenseEvent::Rejected(_) => "finance.expense.rejected",
            ExpenseEvent::Cancelled(_) => "finance.expense.cancelled",
            ExpenseEvent::Paid(_) => "finance.expense.paid",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ExpenseEvent::Created(e) => e.occurred_at,
            ExpenseEvent::Submitted(e) => e.occurred_at,
            ExpenseEvent::Approved(e) => e.occurred_at,
            ExpenseEvent::Rejected(e) => e.occurred_at,
            ExpenseEvent::Cancelled(e) => e.occurred_at,
            ExpenseEvent::Paid(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::other_income::MAX_DESCRIPTION_LEN;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd() -> CreateExpense {
        CreateExpense {
            tenant_id: TenantId::new(),
            expense_number: "EX-2024-0001".to_string(),
            category: ExpenseCategory::Rent,
            amount: Money::cny(dec!(12000)),
            description: "Warehouse rent, March".to_string(),
            incurred_at: test_time(),
            occurred_at: test_time(),
        }
    }

    fn draft() -> ExpenseRecord {
        ExpenseRecord::create(create_cmd()).unwrap().0
    }

    fn approved() -> ExpenseRecord {
        let mut record = draft();
        record.submit(UserId::new(), test_time()).unwrap();
        record.approve(UserId::new(), "ok", test_time()).unwrap();
        record
    }

    #[test]
    fn create_validates_input() {
        let (record, event) = ExpenseRecord::create(create_cmd()).unwrap();
        assert!(record.is_draft());
        assert!(!record.is_paid());
        assert_eq!(event.event_type(), "finance.expense.created");

        let err = ExpenseRecord::create(CreateExpense {
            expense_number: String::new(),
            ..create_cmd()
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidExpenseNumber);

        let err = ExpenseRecord::create(CreateExpense {
            description: "d".repeat(MAX_DESCRIPTION_LEN + 1),
            ..create_cmd()
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDescription);

        let err = ExpenseRecord::create(CreateExpense {
            amount: Money::cny(dec!(0)),
            ..create_cmd()
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);

        assert_eq!("TAX".parse::<ExpenseCategory>().unwrap(), ExpenseCategory::Tax);
        let err = "BRIBES".parse::<ExpenseCategory>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCategory);
    }

    #[test]
    fn submit_then_approve_then_pay() {
        let mut record = draft();
        let err = record.approve(UserId::new(), "", test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);

        let err = record.submit(UserId::nil(), test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidUser);

        record.submit(UserId::new(), test_time()).unwrap();
        assert!(record.is_pending());
        let err = record
            .update(ExpenseCategory::Other, Money::cny(dec!(1)), "edit", test_time(), test_time())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);

        let err = record.mark_as_paid(PaymentMethod::Cash, test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);

        match record.approve(UserId::new(), "within budget", test_time()).unwrap() {
            ExpenseEvent::Approved(e) => assert_eq!(e.amount.amount(), dec!(12000)),
            other => panic!("Expected Approved event, got {other:?}"),
        }
        assert_eq!(record.approval_remark(), "within budget");

        record.mark_as_paid(PaymentMethod::BankTransfer, test_time()).unwrap();
        assert!(record.is_paid());
        assert_eq!(record.payment_method(), Some(PaymentMethod::BankTransfer));
        assert_eq!(record.version(), 4);
    }

    #[test]
    fn paying_twice_is_rejected() {
        let mut record = approved();
        record.mark_as_paid(PaymentMethod::Cash, test_time()).unwrap();
        let version = record.version();

        let err = record.mark_as_paid(PaymentMethod::Cash, test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyPaid);
        assert_eq!(record.version(), version);
    }

    #[test]
    fn reject_needs_pending_and_reason() {
        let mut record = draft();
        let err = record.reject(UserId::new(), "no receipt", test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);

        record.submit(UserId::new(), test_time()).unwrap();
        let err = record.reject(UserId::new(), "", test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidReason);

        record.reject(UserId::new(), "no receipt", test_time()).unwrap();
        assert!(record.is_rejected());
        assert!(record.status().is_terminal());
        assert_eq!(record.rejection_reason(), Some("no receipt"));
    }

    #[test]
    fn cancel_from_draft_or_pending() {
        let mut record = draft();
        record.submit(UserId::new(), test_time()).unwrap();
        record.cancel(UserId::new(), "duplicate", test_time()).unwrap();
        assert!(record.is_cancelled());

        let mut record = approved();
        let err = record.cancel(UserId::new(), "too late", test_time()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[test]
    fn draft_edits() {
        let mut record = draft();
        record
            .update(ExpenseCategory::Utilities, Money::cny(dec!(830.4)), "Electricity", test_time(), test_time())
            .unwrap();
        record.set_remark("meter 3", test_time());
        record.set_attachment_urls(vec!["s3://bills/march.pdf".to_string()], test_time());
        assert_eq!(record.category(), ExpenseCategory::Utilities);
        assert_eq!(record.amount().amount(), dec!(830.4));
        assert_eq!(record.attachment_urls().len(), 1);
        assert_eq!(record.version(), 4);
    }
}
