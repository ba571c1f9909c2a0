//! Session-related types and the fixed durable-storage keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::AdminProfile;

/// Persisted admin session: identity, opaque token, expiry horizon.
///
/// The invariant on the durable copy is that `expires_at` lies in the
/// future; a read that finds an expired record treats it as absent and
/// purges it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    /// The authenticated admin's cached profile.
    pub admin: AdminProfile,
    /// Opaque bearer token minted at login.
    pub token: String,
    /// When this session stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    /// Whether the session has passed its expiry horizon at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Durable-storage keys for client state.
///
/// String keys over JSON-encoded values. One key per concern; the
/// customer session is a flag plus a separately cached profile, the admin
/// session is a single object.
pub mod keys {
    /// Key for the customer logged-in flag.
    pub const CUSTOMER_SESSION: &str = "clementine_customer_session";

    /// Key for the cached customer profile.
    pub const CUSTOMER_PROFILE: &str = "clementine_customer_profile";

    /// Key for the admin session object (profile/token/expiry).
    pub const ADMIN_SESSION: &str = "clementine_admin_session";

    /// Key for the favorites product-id set.
    pub const FAVORITES: &str = "clementine_favorites";
}
