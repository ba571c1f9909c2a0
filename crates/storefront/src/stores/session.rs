//! Customer and admin session stores.
//!
//! Both variants authenticate through the Remote Data Gateway, persist
//! the session to durable storage under fixed keys, and publish on the
//! injected [`Notifier`] so every other live store instance re-reads the
//! durable mirror. The customer variant persists a logged-in flag plus a
//! cached profile; the admin variant persists one object carrying an
//! opaque token and an expiry horizon.

use std::sync::{Arc, PoisonError, RwLock};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngCore;
use thiserror::Error;
use tracing::{info, instrument, warn};

use clementine_core::{AccountStatus, Email, EmailError, Password};

use crate::gateway::{Filter, Gateway, GatewayError};
use crate::models::identity::{AdminProfile, AdminRecord, CustomerProfile, CustomerRecord};
use crate::models::session::{AdminSession, keys};
use crate::notify::{Notifier, SubscriptionId};
use crate::storage::{self, KeyValueStore};

const CUSTOMERS_TABLE: &str = "customers";
const ADMINS_TABLE: &str = "admins";

/// Errors that can occur during login.
///
/// `InvalidCredentials` is the one failure the UI branches on; a gateway
/// outage is kept distinct so the login form can say "try again later"
/// instead of blaming the password.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The supplied email is not structurally valid.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No active record matched the email, or the password differed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The table store could not be queried.
    #[error("gateway error: {0}")]
    Gateway(#[source] GatewayError),
}

/// Mint an opaque session token: 32 random bytes, base64url.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Check a fetched account record against the supplied credential.
///
/// An inactive record fails identically to a password mismatch so the
/// caller cannot distinguish the two. Comparison is plain equality,
/// matching the remote table contents; see DESIGN.md for the flag on
/// this.
fn verify_record(
    status: AccountStatus,
    stored: &Password,
    supplied: &Password,
) -> Result<(), AuthError> {
    if !status.is_active() || !stored.matches(supplied) {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(())
}

/// Map a lookup failure: an absent row is a credential problem, anything
/// else is the gateway's.
fn lookup_error(err: GatewayError) -> AuthError {
    match err {
        GatewayError::NotFound(_) => AuthError::InvalidCredentials,
        other => AuthError::Gateway(other),
    }
}

// =============================================================================
// CustomerSessionStore
// =============================================================================

/// Session store for shop customers.
///
/// Cheap `Clone`; all clones share state. Constructed with its
/// collaborators injected and subscribes itself to the notifier, so a
/// login in any other store instance is picked up from the durable
/// mirror.
#[derive(Clone)]
pub struct CustomerSessionStore {
    inner: Arc<CustomerInner>,
    _subscription: SubscriptionId,
}

struct CustomerInner {
    gateway: Arc<dyn Gateway>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Notifier,
    current: RwLock<Option<CustomerProfile>>,
}

impl CustomerSessionStore {
    /// Build a store over the injected collaborators, seeding in-memory
    /// identity from the durable mirror.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn Gateway>,
        storage: Arc<dyn KeyValueStore>,
        notifier: Notifier,
    ) -> Self {
        let inner = Arc::new(CustomerInner {
            gateway,
            storage,
            notifier,
            current: RwLock::new(None),
        });
        Self::sync_from_storage(&inner);

        // Weak: the notifier must not keep the store alive.
        let weak = Arc::downgrade(&inner);
        let subscription = inner.notifier.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                CustomerSessionStore::sync_from_storage(&inner);
            }
        });

        Self {
            inner,
            _subscription: subscription,
        }
    }

    /// Authenticate against the `customers` table.
    ///
    /// The lookup filters by email case-insensitively; activity and
    /// password checks run on the fetched record. On success the session
    /// flag and cached profile are persisted and a change notification is
    /// published.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when no active matching
    /// record exists, [`AuthError::Gateway`] when the table store is
    /// unreachable.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CustomerProfile, AuthError> {
        let email = Email::parse(email)?;
        let supplied = Password::new(password);

        let filter = Filter::new().ilike("email", email.as_str());
        let row = self
            .inner
            .gateway
            .query_one(CUSTOMERS_TABLE, &filter)
            .await
            .map_err(lookup_error)?;
        let record: CustomerRecord =
            serde_json::from_value(row).map_err(|e| AuthError::Gateway(GatewayError::Decode(e)))?;

        verify_record(record.profile.status, &record.password, &supplied)?;

        let storage = self.inner.storage.as_ref();
        storage::write_json(storage, keys::CUSTOMER_SESSION, &true);
        storage::write_json(storage, keys::CUSTOMER_PROFILE, &record.profile);
        {
            let mut current = self.write();
            *current = Some(record.profile.clone());
        }
        self.inner.notifier.publish();

        info!(customer = %record.profile.id, "customer logged in");
        Ok(record.profile)
    }

    /// The in-memory identity, if any.
    #[must_use]
    pub fn current(&self) -> Option<CustomerProfile> {
        self.read().clone()
    }

    /// Read the session from durable storage, sync the in-memory
    /// identity, and return it. A malformed or inconsistent persisted
    /// session is purged and reported absent.
    #[must_use]
    pub fn load(&self) -> Option<CustomerProfile> {
        Self::sync_from_storage(&self.inner)
    }

    /// Re-read the durable mirror into memory.
    pub fn refresh(&self) {
        let _ = self.load();
    }

    /// Same as [`refresh`](Self::refresh); wire this to the platform's
    /// storage-change event to pick up writes from other tabs.
    pub fn reload(&self) {
        self.refresh();
    }

    /// Drop the session, purge the durable copy, and notify.
    pub fn logout(&self) {
        let storage = self.inner.storage.as_ref();
        storage::remove(storage, keys::CUSTOMER_SESSION);
        storage::remove(storage, keys::CUSTOMER_PROFILE);
        {
            let mut current = self.write();
            *current = None;
        }
        self.inner.notifier.publish();
        info!("customer logged out");
    }

    /// Load flag + profile from storage into memory. Anything short of a
    /// `true` flag with a parseable profile counts as absent and purges
    /// both keys.
    fn sync_from_storage(inner: &CustomerInner) -> Option<CustomerProfile> {
        let storage = inner.storage.as_ref();
        let flagged = storage::read_json::<bool>(storage, keys::CUSTOMER_SESSION) == Some(true);
        let profile = flagged
            .then(|| storage::read_json::<CustomerProfile>(storage, keys::CUSTOMER_PROFILE))
            .flatten();

        if profile.is_none() {
            storage::remove(storage, keys::CUSTOMER_SESSION);
            storage::remove(storage, keys::CUSTOMER_PROFILE);
        }

        let mut current = inner.current.write().unwrap_or_else(PoisonError::into_inner);
        current.clone_from(&profile);
        drop(current);
        profile
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<CustomerProfile>> {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<CustomerProfile>> {
        self.inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// AdminSessionStore
// =============================================================================

/// Session store for shop administrators.
///
/// Same collaborators as the customer store, but the persisted session is
/// one object carrying a freshly minted opaque token and an expiry
/// horizon (24 hours by default, injected by the caller).
#[derive(Clone)]
pub struct AdminSessionStore {
    inner: Arc<AdminInner>,
    _subscription: SubscriptionId,
}

struct AdminInner {
    gateway: Arc<dyn Gateway>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Notifier,
    ttl: Duration,
    current: RwLock<Option<AdminSession>>,
}

impl AdminSessionStore {
    /// Build a store over the injected collaborators; `ttl` is the expiry
    /// horizon stamped on new sessions.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn Gateway>,
        storage: Arc<dyn KeyValueStore>,
        notifier: Notifier,
        ttl: Duration,
    ) -> Self {
        let inner = Arc::new(AdminInner {
            gateway,
            storage,
            notifier,
            ttl,
            current: RwLock::new(None),
        });
        Self::sync_from_storage(&inner);

        // Weak: the notifier must not keep the store alive.
        let weak = Arc::downgrade(&inner);
        let subscription = inner.notifier.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                AdminSessionStore::sync_from_storage(&inner);
            }
        });

        Self {
            inner,
            _subscription: subscription,
        }
    }

    /// Authenticate against the `admins` table and mint a session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when no active matching
    /// record exists, [`AuthError::Gateway`] when the table store is
    /// unreachable.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminProfile, AuthError> {
        let email = Email::parse(email)?;
        let supplied = Password::new(password);

        let filter = Filter::new().ilike("email", email.as_str());
        let row = self
            .inner
            .gateway
            .query_one(ADMINS_TABLE, &filter)
            .await
            .map_err(lookup_error)?;
        let record: AdminRecord =
            serde_json::from_value(row).map_err(|e| AuthError::Gateway(GatewayError::Decode(e)))?;

        verify_record(record.profile.status, &record.password, &supplied)?;

        let session = AdminSession {
            admin: record.profile.clone(),
            token: generate_token(),
            expires_at: Utc::now() + self.inner.ttl,
        };
        storage::write_json(self.inner.storage.as_ref(), keys::ADMIN_SESSION, &session);
        {
            let mut current = self.write();
            *current = Some(session);
        }
        self.inner.notifier.publish();

        info!(admin = %record.profile.id, "admin logged in");
        Ok(record.profile)
    }

    /// Read the session from durable storage, purging it when malformed
    /// or expired, and sync the in-memory copy. A purged session stays
    /// purged: the next read finds nothing to re-parse.
    #[must_use]
    pub fn session(&self) -> Option<AdminSession> {
        Self::sync_from_storage(&self.inner)
    }

    /// The in-memory admin identity, if any.
    #[must_use]
    pub fn current(&self) -> Option<AdminProfile> {
        self.read().as_ref().map(|session| session.admin.clone())
    }

    /// The current bearer token, if a live session exists.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|session| session.token.clone())
    }

    /// Re-read the durable mirror; wire this to the platform's
    /// storage-change event to pick up writes from other tabs.
    pub fn reload(&self) {
        let _ = self.session();
    }

    /// Re-fetch the admin profile from the gateway to pick up
    /// out-of-band edits. On failure the previous identity stays
    /// untouched; the failure is logged only.
    #[instrument(skip_all)]
    pub async fn refresh(&self) {
        let Some(mut session) = self.session() else {
            return;
        };

        let filter = Filter::new().eq("id", session.admin.id.as_i32());
        let fetched = self
            .inner
            .gateway
            .query_one(ADMINS_TABLE, &filter)
            .await
            .and_then(|row| serde_json::from_value::<AdminRecord>(row).map_err(Into::into));

        match fetched {
            Ok(record) => {
                session.admin = record.profile;
                storage::write_json(self.inner.storage.as_ref(), keys::ADMIN_SESSION, &session);
                let mut current = self.write();
                *current = Some(session);
            }
            Err(err) => {
                warn!(error = %err, "admin profile refresh failed, keeping cached identity");
            }
        }
    }

    /// Drop the session, purge the durable copy, and notify.
    pub fn logout(&self) {
        storage::remove(self.inner.storage.as_ref(), keys::ADMIN_SESSION);
        {
            let mut current = self.write();
            *current = None;
        }
        self.inner.notifier.publish();
        info!("admin logged out");
    }

    fn sync_from_storage(inner: &AdminInner) -> Option<AdminSession> {
        let storage = inner.storage.as_ref();
        let session = match storage::read_json::<AdminSession>(storage, keys::ADMIN_SESSION) {
            Some(session) if session.is_expired(Utc::now()) => {
                tracing::debug!("purging expired admin session");
                storage::remove(storage, keys::ADMIN_SESSION);
                None
            }
            other => other,
        };

        let mut current = inner.current.write().unwrap_or_else(PoisonError::into_inner);
        current.clone_from(&session);
        drop(current);
        session
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<AdminSession>> {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<AdminSession>> {
        self.inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::gateway::Record;
    use crate::storage::MemoryStore;

    /// Gateway fake: fixed rows per table, optional hard failure.
    struct TestGateway {
        tables: Mutex<HashMap<String, Vec<Record>>>,
        fail: AtomicBool,
    }

    impl TestGateway {
        fn with_rows(table: &str, rows: Vec<Record>) -> Arc<Self> {
            let mut tables = HashMap::new();
            tables.insert(table.to_owned(), rows);
            Arc::new(Self {
                tables: Mutex::new(tables),
                fail: AtomicBool::new(false),
            })
        }

        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }

        fn outage() -> GatewayError {
            GatewayError::Status {
                status: 503,
                body: "unavailable".to_owned(),
            }
        }
    }

    #[async_trait]
    impl Gateway for TestGateway {
        async fn query_one(&self, table: &str, filter: &Filter) -> Result<Record, GatewayError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Self::outage());
            }
            self.tables
                .lock()
                .unwrap()
                .get(table)
                .and_then(|rows| rows.iter().find(|row| filter.matches(row)).cloned())
                .ok_or_else(|| GatewayError::NotFound(table.to_owned()))
        }

        async fn query_many(
            &self,
            table: &str,
            filter: &Filter,
        ) -> Result<Vec<Record>, GatewayError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Self::outage());
            }
            Ok(self
                .tables
                .lock()
                .unwrap()
                .get(table)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| filter.matches(row))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }

        async fn update(
            &self,
            _table: &str,
            _id: i32,
            _patch: Record,
        ) -> Result<(), GatewayError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Self::outage());
            }
            Ok(())
        }
    }

    fn customer_row() -> Record {
        json!({
            "id": 7,
            "email": "user@x.com",
            "name": "Sam",
            "status": "active",
            "password": "hunter2"
        })
    }

    fn admin_row() -> Record {
        json!({
            "id": 1,
            "email": "admin@x.com",
            "name": "Riley",
            "status": "active",
            "password": "letmein"
        })
    }

    fn customer_store(
        gateway: Arc<TestGateway>,
        storage: Arc<MemoryStore>,
        notifier: Notifier,
    ) -> CustomerSessionStore {
        CustomerSessionStore::new(gateway, storage, notifier)
    }

    fn admin_store(
        gateway: Arc<TestGateway>,
        storage: Arc<MemoryStore>,
        notifier: Notifier,
    ) -> AdminSessionStore {
        AdminSessionStore::new(gateway, storage, notifier, Duration::hours(24))
    }

    #[tokio::test]
    async fn test_customer_login_persists_flag_and_profile() {
        let gateway = TestGateway::with_rows(CUSTOMERS_TABLE, vec![customer_row()]);
        let storage = MemoryStore::shared();
        let store = customer_store(gateway, storage.clone(), Notifier::new());

        let profile = store.login("user@x.com", "hunter2").await.unwrap();
        assert_eq!(profile.name, "Sam");
        assert_eq!(store.current().unwrap().id, profile.id);

        // the durable mirror holds both keys
        assert_eq!(
            storage.get(keys::CUSTOMER_SESSION).unwrap(),
            Some("true".to_owned())
        );
        assert!(storage.get(keys::CUSTOMER_PROFILE).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_customer_login_is_case_insensitive_on_email() {
        let gateway = TestGateway::with_rows(CUSTOMERS_TABLE, vec![customer_row()]);
        let store = customer_store(gateway, MemoryStore::shared(), Notifier::new());

        let profile = store.login("User@X.com", "hunter2").await.unwrap();
        assert_eq!(profile.email.as_str(), "user@x.com");
    }

    #[tokio::test]
    async fn test_customer_login_wrong_password() {
        let gateway = TestGateway::with_rows(CUSTOMERS_TABLE, vec![customer_row()]);
        let store = customer_store(gateway, MemoryStore::shared(), Notifier::new());

        let err = store.login("user@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_inactive_record_fails_even_with_correct_password() {
        let mut row = customer_row();
        row["status"] = json!("inactive");
        let gateway = TestGateway::with_rows(CUSTOMERS_TABLE, vec![row]);
        let store = customer_store(gateway, MemoryStore::shared(), Notifier::new());

        let err = store.login("user@x.com", "hunter2").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_email_fails_as_invalid_credentials() {
        let gateway = TestGateway::with_rows(CUSTOMERS_TABLE, vec![customer_row()]);
        let store = customer_store(gateway, MemoryStore::shared(), Notifier::new());

        let err = store.login("nobody@x.com", "hunter2").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_gateway_outage_surfaces_as_gateway_error() {
        let gateway = TestGateway::with_rows(CUSTOMERS_TABLE, vec![customer_row()]);
        gateway.set_failing(true);
        let store = customer_store(gateway, MemoryStore::shared(), Notifier::new());

        let err = store.login("user@x.com", "hunter2").await.unwrap_err();
        assert!(matches!(err, AuthError::Gateway(_)));
    }

    #[tokio::test]
    async fn test_logout_notifies_other_store_instance() {
        let gateway = TestGateway::with_rows(CUSTOMERS_TABLE, vec![customer_row()]);
        let storage = MemoryStore::shared();
        let notifier = Notifier::new();

        let tab_a = customer_store(gateway.clone(), storage.clone(), notifier.clone());
        let tab_b = customer_store(gateway, storage, notifier);

        tab_a.login("user@x.com", "hunter2").await.unwrap();
        assert!(tab_b.current().is_some());

        tab_a.logout();
        assert!(tab_b.current().is_none());
    }

    #[test]
    fn test_malformed_customer_profile_is_purged() {
        let storage = MemoryStore::shared();
        storage.set(keys::CUSTOMER_SESSION, "true").unwrap();
        storage.set(keys::CUSTOMER_PROFILE, "{broken").unwrap();

        let gateway = TestGateway::with_rows(CUSTOMERS_TABLE, vec![]);
        let store = customer_store(gateway, storage.clone(), Notifier::new());

        assert!(store.load().is_none());
        assert_eq!(storage.get(keys::CUSTOMER_SESSION).unwrap(), None);
        assert_eq!(storage.get(keys::CUSTOMER_PROFILE).unwrap(), None);
    }

    #[tokio::test]
    async fn test_admin_login_mints_token_and_expiry() {
        let gateway = TestGateway::with_rows(ADMINS_TABLE, vec![admin_row()]);
        let storage = MemoryStore::shared();
        let store = admin_store(gateway, storage, Notifier::new());

        let before = Utc::now();
        store.login("admin@x.com", "letmein").await.unwrap();

        let session = store.session().unwrap();
        assert!(!session.token.is_empty());
        assert!(session.expires_at > before + Duration::hours(23));
        assert!(session.expires_at <= Utc::now() + Duration::hours(24));
        assert_eq!(store.token().unwrap(), session.token);
    }

    #[tokio::test]
    async fn test_admin_tokens_are_unique_per_login() {
        let gateway = TestGateway::with_rows(ADMINS_TABLE, vec![admin_row()]);
        let store = admin_store(gateway, MemoryStore::shared(), Notifier::new());

        store.login("admin@x.com", "letmein").await.unwrap();
        let first = store.token().unwrap();
        store.login("admin@x.com", "letmein").await.unwrap();
        let second = store.token().unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_expired_admin_session_is_purged_on_read() {
        let storage = MemoryStore::shared();
        let expired = AdminSession {
            admin: serde_json::from_value(json!({
                "id": 1, "email": "admin@x.com", "name": "Riley"
            }))
            .unwrap(),
            token: "stale".to_owned(),
            expires_at: Utc::now() - Duration::hours(1),
        };
        storage
            .set(keys::ADMIN_SESSION, &serde_json::to_string(&expired).unwrap())
            .unwrap();

        let gateway = TestGateway::with_rows(ADMINS_TABLE, vec![]);
        let store = admin_store(gateway, storage.clone(), Notifier::new());

        assert!(store.session().is_none());
        // the key is gone: a second read has nothing left to parse
        assert_eq!(storage.get(keys::ADMIN_SESSION).unwrap(), None);
        assert!(store.session().is_none());
    }

    #[test]
    fn test_malformed_admin_session_is_purged() {
        let storage = MemoryStore::shared();
        storage.set(keys::ADMIN_SESSION, "not json at all").unwrap();

        let gateway = TestGateway::with_rows(ADMINS_TABLE, vec![]);
        let store = admin_store(gateway, storage.clone(), Notifier::new());

        assert!(store.session().is_none());
        assert_eq!(storage.get(keys::ADMIN_SESSION).unwrap(), None);
    }

    #[tokio::test]
    async fn test_admin_refresh_picks_up_profile_edits() {
        let gateway = TestGateway::with_rows(ADMINS_TABLE, vec![admin_row()]);
        let storage = MemoryStore::shared();
        let store = admin_store(gateway.clone(), storage, Notifier::new());

        store.login("admin@x.com", "letmein").await.unwrap();

        // an out-of-band edit renames the admin
        {
            let mut tables = gateway.tables.lock().unwrap();
            let rows = tables.get_mut(ADMINS_TABLE).unwrap();
            rows[0]["name"] = json!("Riley Q. Admin");
        }

        store.refresh().await;
        assert_eq!(store.current().unwrap().name, "Riley Q. Admin");
    }

    #[tokio::test]
    async fn test_admin_refresh_failure_keeps_cached_identity() {
        let gateway = TestGateway::with_rows(ADMINS_TABLE, vec![admin_row()]);
        let storage = MemoryStore::shared();
        let store = admin_store(gateway.clone(), storage, Notifier::new());

        store.login("admin@x.com", "letmein").await.unwrap();
        gateway.set_failing(true);

        store.refresh().await;
        assert_eq!(store.current().unwrap().name, "Riley");
    }

    #[test]
    fn test_generated_tokens_look_opaque() {
        let token = generate_token();
        // 32 bytes base64url without padding
        assert_eq!(token.len(), 43);
        assert!(!token.contains('='));
    }
}
