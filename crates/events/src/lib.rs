//! Domain event contracts.
//!
//! Aggregates return the events each mutation produced; callers seal them into
//! [`EventEnvelope`]s and hand them to whatever dispatcher they run. Nothing in
//! this crate buffers or publishes.

pub mod envelope;
pub mod event;
pub mod tenant;

pub use envelope::EventEnvelope;
pub use event::Event;
pub use tenant::{TenantAggregate, TenantScoped};
