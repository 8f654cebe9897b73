//! `stockbook-store` — persistence boundary and core operations.
//!
//! The domain crates are pure; everything that touches storage lives here.
//! [`LedgerStore`] is the seam a real database would plug into; the shipped
//! [`InMemoryStore`] provides the same atomic-commit and optimistic
//! concurrency semantics for tests and development.

pub mod activity;
pub mod in_memory;
pub mod service;
pub mod store;

pub use activity::{ActivityFilter, ActivityLogEntry};
pub use in_memory::InMemoryStore;
pub use service::{EditBaseline, ItemSalesSummary, LedgerService};
pub use store::{CommitRequest, LedgerStore};
