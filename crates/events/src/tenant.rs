use finledger_core::{AggregateId, AggregateRoot, TenantId};

use crate::{Event, EventEnvelope};

/// Helper trait for tenant-scoped messages and aggregates.
///
/// Dispatchers use it to reject messages that do not belong to the tenant they
/// serve; `EventEnvelope` implements it, as does every tenant-owned aggregate.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}

impl<E> TenantScoped for EventEnvelope<E> {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id()
    }
}

/// A tenant-owned aggregate whose events can be sealed for publication.
pub trait TenantAggregate: AggregateRoot + TenantScoped {
    /// Stream name used as the envelope's `aggregate_type`.
    const AGGREGATE_TYPE: &'static str;

    /// Untyped identifier of the stream the events belong to.
    fn aggregate_id(&self) -> AggregateId;

    /// Seal an event this aggregate just produced.
    ///
    /// Call right after the mutation: the envelope's sequence number is the
    /// aggregate's current version.
    fn envelope<E: Event>(&self, event: E) -> EventEnvelope<E> {
        EventEnvelope::seal(
            self.tenant_id(),
            self.aggregate_id(),
            Self::AGGREGATE_TYPE,
            self.version(),
            event,
        )
    }
}
