//! Identity types - who is logged in.
//!
//! Profiles are validated domain objects cached locally; record types are
//! the raw rows the table store returns, credential column included.
//! Identity equality and uniqueness are delegated to the remote store
//! (case-insensitive email lookup); nothing here normalizes case.

use serde::{Deserialize, Serialize};

use clementine_core::{AccountStatus, AdminId, CustomerId, Email, Password};

/// A shop customer (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Customer's row id in the remote table.
    pub id: CustomerId,
    /// Customer's email address, as stored remotely.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Contact phone number, if given.
    #[serde(default)]
    pub phone: Option<String>,
    /// Shipping address, if given.
    #[serde(default)]
    pub address: Option<String>,
    /// Whether the account may log in.
    #[serde(default)]
    pub status: AccountStatus,
}

/// A shop administrator (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    /// Admin's row id in the remote table.
    pub id: AdminId,
    /// Admin's email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Whether the account may log in.
    #[serde(default)]
    pub status: AccountStatus,
}

/// The authenticated identity, customer or admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    Customer(CustomerProfile),
    Admin(AdminProfile),
}

impl Identity {
    /// The identity's email address.
    #[must_use]
    pub const fn email(&self) -> &Email {
        match self {
            Self::Customer(profile) => &profile.email,
            Self::Admin(profile) => &profile.email,
        }
    }

    /// The identity's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Customer(profile) => &profile.name,
            Self::Admin(profile) => &profile.name,
        }
    }
}

/// Raw `customers` row, as returned by the table store.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRecord {
    /// Profile columns.
    #[serde(flatten)]
    pub profile: CustomerProfile,
    /// Stored credential. Plain equality semantics; see DESIGN.md.
    pub password: Password,
}

/// Raw `admins` row, as returned by the table store.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminRecord {
    /// Profile columns.
    #[serde(flatten)]
    pub profile: AdminProfile,
    /// Stored credential. Plain equality semantics; see DESIGN.md.
    pub password: Password,
}
