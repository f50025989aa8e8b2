//! Shared test utilities for the prefkit workspace.
//!
//! Dev-dependency only. Use it from integration tests (`tests/`), never
//! from `#[cfg(test)]` modules inside `pref-core`: those compile a second
//! copy of the crate whose types do not match.
//!
//! # Modules
//!
//! - [`stores`]: backing-store fakes that count calls or fail on flush
//! - [`dir`]: [`TestStoreDir`](dir::TestStoreDir) for file-backed stores in a
//!   temporary directory

pub mod dir;
pub mod stores;
