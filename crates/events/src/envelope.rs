use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use finledger_core::{AggregateId, TenantId};

use crate::Event;

/// Envelope for an event, containing multi-tenant + stream metadata.
///
/// This is the unit a dispatcher publishes.
///
/// Notes:
/// - **Multi-tenancy** is carried here via `tenant_id`.
/// - `sequence_number` is the aggregate version right after the mutation that
///   produced the event, so consumers can discard duplicates and detect gaps.
/// - `event_type`, `schema_version` and `occurred_at` are copied from the
///   payload at sealing time so routing never needs to inspect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    tenant_id: TenantId,

    aggregate_id: AggregateId,
    aggregate_type: String,

    sequence_number: u64,

    event_type: String,
    schema_version: u32,
    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap `payload` with a fresh event id and metadata read from the event.
    pub fn seal(
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            event_type: payload.event_type().to_string(),
            schema_version: payload.version(),
            occurred_at: payload.occurred_at(),
            payload,
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Pinged {
        at: DateTime<Utc>,
    }

    impl Event for Pinged {
        fn event_type(&self) -> &'static str {
            "test.pinged"
        }

        fn version(&self) -> u32 {
            2
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    #[test]
    fn seal_copies_metadata_from_payload() {
        let at = Utc::now();
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();

        let env = EventEnvelope::seal(tenant_id, aggregate_id, "test", 7, Pinged { at });

        assert_eq!(env.tenant_id(), tenant_id);
        assert_eq!(env.aggregate_id(), aggregate_id);
        assert_eq!(env.aggregate_type(), "test");
        assert_eq!(env.sequence_number(), 7);
        assert_eq!(env.event_type(), "test.pinged");
        assert_eq!(env.schema_version(), 2);
        assert_eq!(env.occurred_at(), at);
        assert_eq!(env.into_payload(), Pinged { at });
    }

    #[test]
    fn envelope_survives_json() {
        let env = EventEnvelope::seal(
            TenantId::new(),
            AggregateId::new(),
            "test",
            1,
            Pinged { at: Utc::now() },
        );
        let json = serde_json::to_string(&env).unwrap();
        let back: EventEnvelope<Pinged> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, env);
    }
}
