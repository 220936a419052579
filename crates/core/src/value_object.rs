//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two `Money`
/// values with the same amount and currency are the same money. To "modify"
/// one, build a new one (`Money::checked_add` returns a fresh value).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
