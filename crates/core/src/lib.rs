//! Domain primitives shared by the purchasing and quarantine crates: ids,
//! errors, the aggregate traits and static transition tables. No IO.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod transition;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, ProductId, UserId};
pub use transition::TransitionTable;
