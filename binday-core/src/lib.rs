//! Core types and refresh wiring for the binday bin collection tracker.

/// Configuration supplied when a property is set up.
pub mod config;
/// Periodic refresh and the cache readers pull from.
pub mod coordinator;
/// Read-only entities registered with the host.
pub mod entity;
/// Domain models and identifiers.
pub mod model;
/// Normalization of upstream responses.
pub mod normalize;
/// Traits describing the upstream interface, and error types.
pub mod ports;
/// Display projections of collection windows.
pub mod view;

pub use config::*;
pub use coordinator::*;
pub use entity::*;
pub use model::*;
pub use normalize::*;
pub use ports::*;
pub use view::*;
