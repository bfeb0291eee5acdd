//! SQLite storage layer for Trellis.
//!
//! Provides the persistence collaborator handed to extensions and the page
//! registry built on top of it.
//!
//! # Architecture
//!
//! - `SqliteStore` owns one connection behind a mutex and implements the
//!   generic `RowStore` interface (`get` / `all` / `run`)
//! - `PageRegistry` owns the `pages` table and enforces upsert-by-key
//!   semantics on `path` or `name`
//! - The `pages` schema is created and migrated automatically on open

mod error;
mod page_registry;
mod row_store;

pub use error::{RegistryError, StorageError, StorageResult};
pub use page_registry::{PageRegistry, UpsertOutcome};
pub use row_store::{Row, RowStore, RunResult, SqliteStore};
