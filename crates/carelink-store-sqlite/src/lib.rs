//! SQLite backends for CareLink.
//!
//! Two independent stores live here, each on its own connection and file:
//!
//! - [`SqliteRegistry`]: the authoritative relational store for accounts,
//!   links and notes.
//! - [`SqlitePeerIndex`]: the document-style mirror of link existence.
//!
//! Both wrap [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime.

mod encode;
mod peer_index;
mod registry;
mod schema;

pub mod error;

pub use error::{Error, Result};
pub use peer_index::SqlitePeerIndex;
pub use registry::SqliteRegistry;
