//! Fashion Shop client library.
//!
//! Client-side cart state and its synchronization with the shop's REST API:
//!
//! - [`store`] - Persisted local cart store with merge semantics
//! - [`api`] - Typed wrappers over the remote cart endpoints
//! - [`sync`] - Cart session that reconciles the two
//! - [`state`] - Per-session bundle of configuration, API client and cart

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod sync;
