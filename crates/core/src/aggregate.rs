//! Aggregate root trait and optimistic concurrency expectation.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// Ledger aggregates here are state-based rather than event-sourced: they
/// mutate through explicit methods and hand back the events each mutation
/// produced. The version still moves by one per successful mutation so the
/// persistence layer can reject stale writes.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Starts at 1 when the aggregate is created.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for idempotent commands, migrations, etc.).
    Any,
    /// Require the aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }

    /// Expectation matching the aggregate's current version.
    pub fn of<A: AggregateRoot>(aggregate: &A) -> Self {
        ExpectedVersion::Exact(aggregate.version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    struct Counter {
        id: u32,
        version: u64,
    }

    impl AggregateRoot for Counter {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }

        fn version(&self) -> u64 {
            self.version
        }
    }

    #[test]
    fn any_matches_every_version() {
        assert!(ExpectedVersion::Any.matches(0));
        assert!(ExpectedVersion::Any.check(42).is_ok());
    }

    #[test]
    fn exact_rejects_stale_version_with_conflict() {
        let loaded = Counter { id: 1, version: 3 };
        let expected = ExpectedVersion::of(&loaded);
        assert!(expected.check(3).is_ok());

        let err = expected.check(4).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(*loaded.id(), 1);
    }
}
