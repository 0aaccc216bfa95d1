//! Core workflow engine for the order-packer system.
//!
//! This crate turns a flat list of boxes and products belonging to one order
//! into a sequence of physically verifiable packing steps. The item store
//! applies status commands; every other component is a pure derivation
//! recomputed from the resulting item list: display ordering, active-item
//! selection, box progression, weight aggregation, and the timed auto-print
//! trigger.

/// Auto-print trigger state machine and countdown task.
pub mod autoprint;
/// Builder wiring configured storage and device implementations.
pub mod builder;
/// The packing engine and its event loop.
pub mod engine;
/// Deterministic display/selection ordering of items.
pub mod ordering;
/// Per-box completion, confirmation, and next-box queries.
pub mod progression;
/// Active-item selection.
pub mod selection;
/// The item store and its command reducer.
pub mod store;
/// Weight and portion aggregates.
pub mod weights;

pub use autoprint::{AutoPrintTrigger, TriggerMessage, TriggerState};
pub use builder::PackerBuilder;
pub use engine::{event_bus::EventBus, EngineError, PackingEngine};
pub use store::{ItemStore, SessionRecord, StoreError};
