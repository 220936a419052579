//! Typed identifiers for finance aggregates and the records they own.

use serde::{Deserialize, Serialize};

use finledger_core::AggregateId;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub AggregateId);

        impl $name {
            pub fn new(id: AggregateId) -> Self {
                Self(id)
            }

            /// Fresh time-ordered identifier.
            pub fn generate() -> Self {
                Self(AggregateId::new())
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            pub fn as_aggregate_id(&self) -> AggregateId {
                self.0
            }
        }

        impl From<AggregateId> for $name {
            fn from(value: AggregateId) -> Self {
                Self(value)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

typed_id!(
    /// Account receivable (aggregate id).
    ReceivableId
);
typed_id!(
    /// Account payable (aggregate id).
    PayableId
);
typed_id!(
    /// Payment voucher: money paid out to a supplier.
    PaymentVoucherId
);
typed_id!(
    /// Receipt voucher: money collected from a customer.
    ReceiptVoucherId
);
typed_id!(
    /// Credit memo (aggregate id).
    CreditMemoId
);
typed_id!(
    /// Debit memo (aggregate id).
    DebitMemoId
);
typed_id!(
    /// Other-income record (aggregate id).
    OtherIncomeId
);
typed_id!(
    /// Expense record (aggregate id).
    ExpenseId
);
typed_id!(
    /// Customer or supplier.
    PartyId
);
typed_id!(
    /// Document a ledger entry originates from (order, return, manual entry).
    SourceDocumentId
);
typed_id!(PaymentRecordId);
typed_id!(
    /// Idempotency key for the refund owed on one reversed payment.
    CompensationRecordId
);
typed_id!(AllocationId);
typed_id!(CreditApplicationId);
typed_id!(CreditMemoItemId);
typed_id!(DebitApplicationId);
typed_id!(DebitMemoItemId);
typed_id!(
    /// Product referenced by a credit or debit memo line.
    ProductId
);
typed_id!(
    /// Line of the sales or purchase return a memo item refers to.
    ReturnItemId
);
