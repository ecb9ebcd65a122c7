//! Domain event contract shared by the purchasing and quarantine aggregates.

pub mod event;

pub use event::Event;
