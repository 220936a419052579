//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Entities inside a ledger aggregate (payment records, allocations, credit
/// applications) are owned by their root and never referenced on their own,
/// but keep a stable identity so audit trails can point at them.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
