//! Clementine Core - Shared types library.
//!
//! This crate provides common types used across all Clementine components:
//! - `storefront` - Client-state core for the shop (sessions, cart, favorites)
//! - `integration-tests` - Cross-store behavior tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no durable
//! storage. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails,
//!   account statuses, and password material

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
