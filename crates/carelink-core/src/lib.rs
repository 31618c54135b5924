//! Core types and trait definitions for the CareLink link registry.
//!
//! This crate has no HTTP or database dependencies. It owns
//! the caregiver/patient link protocol, the single access decision point for
//! note reads, and the traits every storage backend implements.

// Store impls use native `async fn` against `impl Future + Send` signatures.
#![allow(async_fn_in_trait)]

pub mod directory;
pub mod error;
pub mod gate;
pub mod model;
pub mod notes;
pub mod registry;
pub mod store;

pub use error::{Entity, Error, Result};

#[cfg(test)]
mod tests;
