//! Payment records: one per payment applied to a receivable or payable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finledger_core::{DomainError, DomainResult, Entity, ErrorCode};

use crate::config::RepeatReversal;
use crate::ids::{PayableId, PaymentRecordId, PaymentVoucherId, ReceiptVoucherId, ReceivableId};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentRecordStatus {
    /// Counts towards the paid amount. Rows stored without a status are active.
    #[default]
    Active,
    /// Undone by a reversal of the owning ledger entry.
    Reversed,
}

impl PaymentRecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentRecordStatus::Active => "ACTIVE",
            PaymentRecordStatus::Reversed => "REVERSED",
        }
    }
}

/// A single payment applied to a ledger entry owned by `O`, produced by the
/// counter-voucher `V`.
///
/// Records are never deleted; a reversal flips them to `REVERSED` and stamps
/// when and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord<O, V> {
    id: PaymentRecordId,
    owner_id: O,
    voucher_id: V,
    amount: Decimal,
    applied_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    remark: String,
    #[serde(default)]
    status: PaymentRecordStatus,
    #[serde(default)]
    reversed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reversal_reason: Option<String>,
}

/// Receipt applied to an account receivable.
pub type ReceivablePaymentRecord = PaymentRecord<ReceivableId, ReceiptVoucherId>;

/// Payment applied to an account payable.
pub type PayablePaymentRecord = PaymentRecord<PayableId, PaymentVoucherId>;

impl<O, V> PaymentRecord<O, V> {
    pub(crate) fn new(
        owner_id: O,
        voucher_id: V,
        amount: Decimal,
        remark: impl Into<String>,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentRecordId::generate(),
            owner_id,
            voucher_id,
            amount,
            applied_at,
            remark: remark.into(),
            status: PaymentRecordStatus::Active,
            reversed_at: None,
            reversal_reason: None,
        }
    }

    pub fn record_id(&self) -> PaymentRecordId {
        self.id
    }

    pub fn owner_id(&self) -> &O {
        &self.owner_id
    }

    pub fn voucher_id(&self) -> &V {
        &self.voucher_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn applied_at(&self) -> DateTime<Utc> {
        self.applied_at
    }

    pub fn remark(&self) -> &str {
        &self.remark
    }

    pub fn status(&self) -> PaymentRecordStatus {
        self.status
    }

    pub fn reversed_at(&self) -> Option<DateTime<Utc>> {
        self.reversed_at
    }

    pub fn reversal_reason(&self) -> Option<&str> {
        self.reversal_reason.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.status == PaymentRecordStatus::Active
    }

    pub fn is_reversed(&self) -> bool {
        self.status == PaymentRecordStatus::Reversed
    }

    /// Flip the record to `REVERSED`.
    ///
    /// A record that is already reversed is handled per `policy`: rejected
    /// untouched, or restamped with the new reason and time.
    pub fn mark_reversed(
        &mut self,
        reason: &str,
        at: DateTime<Utc>,
        policy: RepeatReversal,
    ) -> DomainResult<()> {
        if self.is_reversed() && policy == RepeatReversal::Reject {
            tracing::warn!(payment_record_id = %self.id, "repeat reversal rejected");
            return Err(DomainError::invariant(
                ErrorCode::AlreadyReversed,
                format!("Payment record {} is already reversed", self.id),
            ));
        }

        self.stamp_reversed(reason, at);
        Ok(())
    }

    pub(crate) fn stamp_reversed(&mut self, reason: &str, at: DateTime<Utc>) {
        self.status = PaymentRecordStatus::Reversed;
        self.reversed_at = Some(at);
        self.reversal_reason = Some(reason.to_string());
    }
}

impl<O, V> Entity for PaymentRecord<O, V> {
    type Id = PaymentRecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn record() -> ReceivablePaymentRecord {
        PaymentRecord::new(
            ReceivableId::generate(),
            ReceiptVoucherId::generate(),
            dec!(300),
            "first instalment",
            Utc::now(),
        )
    }

    #[test]
    fn new_record_is_active() {
        let r = record();
        assert!(r.is_active());
        assert!(!r.is_reversed());
        assert_eq!(r.reversed_at(), None);
        assert_eq!(r.reversal_reason(), None);
        assert_eq!(r.remark(), "first instalment");
    }

    #[test]
    fn mark_reversed_stamps_reason_and_time() {
        let mut r = record();
        let at = Utc::now();
        r.mark_reversed("dispute", at, RepeatReversal::Reject).unwrap();

        assert!(r.is_reversed());
        assert_eq!(r.reversed_at(), Some(at));
        assert_eq!(r.reversal_reason(), Some("dispute"));
    }

    #[test]
    fn repeat_reversal_is_rejected_under_reject_policy() {
        let mut r = record();
        let first = Utc::now();
        r.mark_reversed("dispute", first, RepeatReversal::Reject).unwrap();

        let err = r
            .mark_reversed("typo fix", first + Duration::hours(1), RepeatReversal::Reject)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyReversed);
        assert_eq!(r.reversal_reason(), Some("dispute"));
        assert_eq!(r.reversed_at(), Some(first));
    }

    #[test]
    fn repeat_reversal_overwrites_under_overwrite_policy() {
        let mut r = record();
        let first = Utc::now();
        let second = first + Duration::hours(1);
        r.mark_reversed("dispute", first, RepeatReversal::Overwrite).unwrap();
        r.mark_reversed("corrected reason", second, RepeatReversal::Overwrite)
            .unwrap();

        assert_eq!(r.reversal_reason(), Some("corrected reason"));
        assert_eq!(r.reversed_at(), Some(second));
    }

    #[test]
    fn legacy_json_without_status_is_active() {
        let json = serde_json::json!({
            "id": PaymentRecordId::generate(),
            "owner_id": ReceivableId::generate(),
            "voucher_id": ReceiptVoucherId::generate(),
            "amount": "12.50",
            "applied_at": Utc::now(),
        });
        let r: ReceivablePaymentRecord = serde_json::from_value(json).unwrap();
        assert!(r.is_active());
        assert_eq!(r.amount(), dec!(12.50));
        assert_eq!(r.remark(), "");
    }
}
