//! UUID identifiers for tenants, users and ledger documents.
//!
//! Finance aggregates wrap [`AggregateId`] in their own typed ids. A nil
//! UUID stands for "not provided" and factories reject it.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Tenant owning a ledger document. Every event envelope carries one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

/// User who confirms, cancels or approves a document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

/// Receivable, payable, voucher, memo or child record such as an allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

macro_rules! uuid_id {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Fresh UUIDv7, so ids sort by creation time in storage.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Stand-in for a reference the caller left out.
            pub fn nil() -> Self {
                Self(Uuid::nil())
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        /// Parses the hyphenated form; failures are `INVALID_ID` tagged with the id kind.
        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_id!(TenantId, "TenantId");
uuid_id!(UserId, "UserId");
uuid_id!(AggregateId, "AggregateId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_garbage_with_invalid_id() {
        let err = "not-a-uuid".parse::<TenantId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(msg) if msg.starts_with("TenantId")));
    }

    #[test]
    fn nil_is_detected() {
        assert!(UserId::nil().is_nil());
        assert!(!AggregateId::new().is_nil());
        assert!(!TenantId::default().is_nil());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let id = AggregateId::new();
        let parsed: AggregateId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
