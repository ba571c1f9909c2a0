//! Clementine Storefront - client-state core for the shop.
//!
//! This crate holds the state the storefront UI reads and mutates:
//!
//! - [`stores::session`] - Customer and admin session stores, persisted to
//!   durable key/value storage with cross-tab change notification
//! - [`stores::cart`] - In-memory cart (lost on reload, by design)
//! - [`stores::favorites`] - Durable set of liked product ids
//! - [`gateway`] - Thin pass-through client for the hosted table store
//! - [`catalog`] - Page-level product and payment-method fetchers
//!
//! # Architecture
//!
//! Stores are explicit, independently constructed state holders with
//! constructor-injected collaborators: a [`gateway::Gateway`], a
//! [`storage::KeyValueStore`], and a [`notify::Notifier`]. Nothing is
//! looked up ambiently; [`state::AppContext`] wires the production set.
//!
//! Remote failures never block the UI: page-fetch boundaries convert
//! gateway errors into default values through [`policy::FailSoft`] and a
//! diagnostic log line. The one surfaced failure is a login rejection.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod gateway;
pub mod models;
pub mod notify;
pub mod policy;
pub mod state;
pub mod storage;
pub mod stores;
pub mod telemetry;
