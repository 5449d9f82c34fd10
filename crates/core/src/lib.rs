//! Fashion Shop Core - Shared types library.
//!
//! This crate provides the types shared by the Fashion Shop components:
//! - `client` - Cart store, persistence and the cart API client
//! - `cli` - Command-line tool for inspecting and syncing carts
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, quantities, prices and cart line items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
