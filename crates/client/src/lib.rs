//! MedStock admin client.
//!
//! Talks to the pharmacy backend over REST and holds the state of the
//! purchase order and quarantine screens. All business state lives in the
//! backend; this crate enforces the transition gates locally so invalid
//! requests are never sent, then defers to whatever the backend answers.

pub mod api;
pub mod cli;
pub mod config;
pub mod dto;
pub mod error;
pub mod poller;
pub mod screens;
pub mod session;

#[cfg(test)]
mod fake;

pub use api::{Backend, HttpBackend};
pub use config::{ClientConfig, ConfigError, NotificationPreferences};
pub use error::{Alert, ClientError, ErrorCategory};
pub use poller::{Poll, PollHandle, SummaryPoller, spawn_poller, summary_poller};
pub use session::{Session, SessionError};
