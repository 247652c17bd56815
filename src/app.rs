//! Application coordinator.
//!
//! `App` wires the session store, the expiry flag, the API client, and the
//! query cache together. Reads go through the cache with per-resource TTLs;
//! writes call the API directly and invalidate the affected resources.
//! Login and logout keep the session store, the cache, and the expiry flag
//! consistent as a unit.

use anyhow::{bail, Result};
use chrono::Duration;
use futures::future::{self, BoxFuture};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::auth::{AuthState, ExpiryFlag, Partition, SessionStore};
use crate::cache::{CacheKey, QueryCache};
use crate::models::{
    Location, Material, MaterialUsage, NewMaterial, NewTransfer, NewUser, SafetyForm,
    ServiceOrder, StockLevel, Transfer, User, UserUpdate,
};

// Per-resource freshness windows. Stock and transfers move during the day;
// the catalog and the user list change rarely.
const USERS_TTL_MINUTES: i64 = 60;
const MATERIALS_TTL_MINUTES: i64 = 60;
const LOCATIONS_TTL_MINUTES: i64 = 240;
const STOCK_TTL_MINUTES: i64 = 5;
const TRANSFERS_TTL_MINUTES: i64 = 5;
const ORDERS_TTL_MINUTES: i64 = 10;
const SAFETY_TTL_MINUTES: i64 = 60;

pub struct App {
    partition: Partition,
    session: SessionStore,
    expiry: ExpiryFlag,
    api: ApiClient,
    cache: QueryCache,
}

impl App {
    /// Open the app over a storage partition, restoring any persisted session.
    pub fn open(api_url: &str, partition: Partition) -> Result<Self> {
        let expiry = ExpiryFlag::new();
        let mut api = ApiClient::new(api_url, expiry.clone())?;

        let mut session = SessionStore::new(partition.dir().to_path_buf());
        let restored = session.load()?;
        debug!(partition = partition.id(), restored, "Session loaded");
        if let Some(token) = session.token() {
            api.set_token(token.to_string());
        }

        let cache = QueryCache::new(partition.dir().join("cache"))?;

        Ok(Self {
            partition,
            session,
            expiry,
            api,
            cache,
        })
    }

    pub fn partition_id(&self) -> &str {
        self.partition.id()
    }

    pub fn session(&self) -> &crate::auth::Session {
        self.session.session()
    }

    /// Current lifecycle state: Authenticated, Unauthenticated, or Expired.
    pub fn auth_state(&self) -> AuthState {
        self.expiry.state(self.session.is_authenticated())
    }

    /// Gate for commands that need a live session. Produces the single
    /// "session expired" message when the flag is set.
    fn ensure_active(&self) -> Result<()> {
        match self.auth_state() {
            AuthState::Authenticated => Ok(()),
            AuthState::Expired => bail!("Session expired. Please log in again."),
            AuthState::Unauthenticated => bail!("Not logged in. Run `fieldstock login` first."),
        }
    }

    /// Authenticate and replace the whole session. Clears the expiry flag
    /// and drops cached data from any previous login.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let response = self.api.login(username, password).await?;

        self.cache.clear().await;
        self.session
            .set_auth(response.access_token.clone(), true, response.company)?;
        self.api.set_token(response.access_token);
        self.expiry.clear();

        info!(username, company = ?response.company, "Logged in");
        Ok(())
    }

    /// Clear session, cache, and the partition itself.
    pub async fn logout(&mut self) -> Result<()> {
        self.cache.clear().await;
        self.session.logout()?;
        self.expiry.clear();
        self.partition.destroy()?;
        info!("Logged out");
        Ok(())
    }

    /// Acknowledge an expired session: back to Unauthenticated so the user
    /// can log in again.
    pub fn acknowledge_expired(&mut self) -> Result<()> {
        self.session.logout()?;
        self.expiry.clear();
        Ok(())
    }

    /// Drop all cached data so the next reads hit the network.
    pub async fn refresh(&self) {
        self.cache.clear().await;
    }

    /// Warm the cache for the list views, fetching resources concurrently.
    /// Individual failures are logged, not fatal; a 401 still trips the
    /// expiry flag through the client.
    pub async fn prefetch(&self) -> Result<()> {
        self.ensure_active()?;
        let jobs: Vec<BoxFuture<'_, Result<()>>> = vec![
            Box::pin(async { self.users().await.map(|_| ()) }),
            Box::pin(async { self.materials().await.map(|_| ()) }),
            Box::pin(async { self.locations().await.map(|_| ()) }),
            Box::pin(async { self.transfers().await.map(|_| ()) }),
            Box::pin(async { self.service_orders().await.map(|_| ()) }),
            Box::pin(async { self.safety_forms().await.map(|_| ()) }),
        ];
        for result in future::join_all(jobs).await {
            if let Err(e) = result {
                warn!(error = %e, "Prefetch failed for a resource");
            }
        }
        Ok(())
    }

    pub async fn invalidate(&self, resource: &str) {
        self.cache.invalidate_resource(resource).await;
    }

    /// Age of a cached resource for status display, if anything is cached.
    pub async fn cache_age(&self, resource: &str) -> Option<String> {
        self.cache
            .peek::<serde_json::Value>(&CacheKey::new(resource))
            .await
            .map(|cached| cached.age_display())
    }

    // ===== Cached reads =====

    pub async fn users(&self) -> Result<Vec<User>> {
        self.ensure_active()?;
        let api = self.api.clone();
        self.cache
            .fetch(
                CacheKey::new("users"),
                Duration::minutes(USERS_TTL_MINUTES),
                || async move { Ok(api.fetch_users().await?) },
            )
            .await
    }

    pub async fn materials(&self) -> Result<Vec<Material>> {
        self.ensure_active()?;
        let api = self.api.clone();
        self.cache
            .fetch(
                CacheKey::new("materials"),
                Duration::minutes(MATERIALS_TTL_MINUTES),
                || async move { Ok(api.fetch_materials().await?) },
            )
            .await
    }

    pub async fn locations(&self) -> Result<Vec<Location>> {
        self.ensure_active()?;
        let api = self.api.clone();
        self.cache
            .fetch(
                CacheKey::new("locations"),
                Duration::minutes(LOCATIONS_TTL_MINUTES),
                || async move { Ok(api.fetch_locations().await?) },
            )
            .await
    }

    pub async fn stock(&self, location_id: i64) -> Result<Vec<StockLevel>> {
        self.ensure_active()?;
        let api = self.api.clone();
        self.cache
            .fetch(
                CacheKey::with_params("stock", location_id),
                Duration::minutes(STOCK_TTL_MINUTES),
                || async move { Ok(api.fetch_stock(location_id).await?) },
            )
            .await
    }

    pub async fn transfers(&self) -> Result<Vec<Transfer>> {
        self.ensure_active()?;
        let api = self.api.clone();
        self.cache
            .fetch(
                CacheKey::new("transfers"),
                Duration::minutes(TRANSFERS_TTL_MINUTES),
                || async move { Ok(api.fetch_transfers().await?) },
            )
            .await
    }

    pub async fn service_orders(&self) -> Result<Vec<ServiceOrder>> {
        self.ensure_active()?;
        let api = self.api.clone();
        self.cache
            .fetch(
                CacheKey::new("orders"),
                Duration::minutes(ORDERS_TTL_MINUTES),
                || async move { Ok(api.fetch_service_orders().await?) },
            )
            .await
    }

    pub async fn order_materials(&self, order_id: i64) -> Result<Vec<MaterialUsage>> {
        self.ensure_active()?;
        let api = self.api.clone();
        self.cache
            .fetch(
                CacheKey::with_params("order-materials", order_id),
                Duration::minutes(ORDERS_TTL_MINUTES),
                || async move { Ok(api.fetch_order_materials(order_id).await?) },
            )
            .await
    }

    pub async fn safety_forms(&self) -> Result<Vec<SafetyForm>> {
        self.ensure_active()?;
        let api = self.api.clone();
        self.cache
            .fetch(
                CacheKey::new("safety-forms"),
                Duration::minutes(SAFETY_TTL_MINUTES),
                || async move { Ok(api.fetch_safety_forms().await?) },
            )
            .await
    }

    pub async fn safety_form(&self, id: i64) -> Result<SafetyForm> {
        self.ensure_active()?;
        let api = self.api.clone();
        self.cache
            .fetch(
                CacheKey::with_params("safety-form", id),
                Duration::minutes(SAFETY_TTL_MINUTES),
                || async move { Ok(api.fetch_safety_form(id).await?) },
            )
            .await
    }

    // ===== Writes (never cached, never retried) =====

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        self.ensure_active()?;
        let created = self.api.create_user(user).await?;
        self.cache.invalidate_resource("users").await;
        Ok(created)
    }

    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<User> {
        self.ensure_active()?;
        let updated = self.api.update_user(id, update).await?;
        self.cache.invalidate_resource("users").await;
        Ok(updated)
    }

    pub async fn deactivate_user(&self, id: i64) -> Result<()> {
        self.ensure_active()?;
        self.api.deactivate_user(id).await?;
        self.cache.invalidate_resource("users").await;
        Ok(())
    }

    pub async fn create_material(&self, material: &NewMaterial) -> Result<Material> {
        self.ensure_active()?;
        let created = self.api.create_material(material).await?;
        self.cache.invalidate_resource("materials").await;
        Ok(created)
    }

    /// Create a transfer. Stock at both ends changes server-side, so both
    /// the transfer list and all stock views go stale.
    pub async fn create_transfer(&self, transfer: &NewTransfer) -> Result<Transfer> {
        self.ensure_active()?;
        let created = self.api.create_transfer(transfer).await?;
        self.cache.invalidate_resource("transfers").await;
        self.cache.invalidate_resource("stock").await;
        Ok(created)
    }

    pub async fn add_order_material(
        &self,
        order_id: i64,
        usage: &MaterialUsage,
    ) -> Result<MaterialUsage> {
        self.ensure_active()?;
        let added = self.api.add_order_material(order_id, usage).await?;
        self.cache.invalidate_resource("order-materials").await;
        self.cache.invalidate_resource("stock").await;
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Partition;
    use mockito::Server;

    async fn app_for(server: &Server, tmp: &std::path::Path) -> App {
        let partition = Partition::create(tmp).expect("Failed to create partition");
        App::open(&server.url(), partition).expect("Failed to open app")
    }

    async fn mock_login(server: &mut Server) -> mockito::Mock {
        server
            .mock("POST", "/auth/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"accessToken": "tok-abc", "company": "B"}"#)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_login_updates_session() {
        let mut server = Server::new_async().await;
        let _m = mock_login(&mut server).await;
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let mut app = app_for(&server, tmp.path()).await;

        assert_eq!(app.auth_state(), AuthState::Unauthenticated);
        app.login("marta@example.com", "hunter2")
            .await
            .expect("Login should succeed");

        assert_eq!(app.auth_state(), AuthState::Authenticated);
        assert!(app.session().is_authenticated());
        assert!(!app.session().access_token.as_deref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_partition() {
        let mut server = Server::new_async().await;
        let _m = mock_login(&mut server).await;
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let mut app = app_for(&server, tmp.path()).await;

        app.login("marta@example.com", "hunter2")
            .await
            .expect("Login should succeed");
        app.logout().await.expect("Logout should succeed");

        assert_eq!(app.auth_state(), AuthState::Unauthenticated);
        assert_eq!(app.session().access_token, None);
        assert_eq!(app.session().company, None);
    }

    #[tokio::test]
    async fn test_401_moves_state_to_expired() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).await;
        let users = server
            .mock("GET", "/users")
            .with_status(401)
            .with_body("token expired")
            .expect(1)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let mut app = app_for(&server, tmp.path()).await;
        app.login("marta@example.com", "hunter2")
            .await
            .expect("Login should succeed");

        app.users().await.expect_err("Fetch should fail");
        users.assert_async().await;
        assert_eq!(app.auth_state(), AuthState::Expired);

        // Further commands are blocked with the expiry message, no new requests
        let err = app.users().await.expect_err("Guard should block");
        assert!(err.to_string().contains("Session expired"));

        // Acknowledging drops back to Unauthenticated
        app.acknowledge_expired().expect("Ack should succeed");
        assert_eq!(app.auth_state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_relogin_from_expired_clears_flag_and_cache() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).await;
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let mut app = app_for(&server, tmp.path()).await;
        app.login("marta@example.com", "hunter2")
            .await
            .expect("Login should succeed");

        let users_401 = server
            .mock("GET", "/users")
            .with_status(401)
            .with_body("token expired")
            .create_async()
            .await;
        app.users().await.expect_err("Fetch should fail");
        users_401.assert_async().await;
        assert_eq!(app.auth_state(), AuthState::Expired);

        app.login("marta@example.com", "hunter2")
            .await
            .expect("Re-login should succeed");
        assert_eq!(app.auth_state(), AuthState::Authenticated);
    }

    #[tokio::test]
    async fn test_users_served_from_cache_within_ttl() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).await;
        let users = server
            .mock("GET", "/users")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": 1, "firstName": "Jo", "lastName": "Prado", "email": null, "phone": null, "role": "technician", "company": "A"}]"#)
            .expect(1)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let mut app = app_for(&server, tmp.path()).await;
        app.login("marta@example.com", "hunter2")
            .await
            .expect("Login should succeed");

        let first = app.users().await.expect("Fetch should succeed");
        let second = app.users().await.expect("Fetch should succeed");
        // One network call for two reads
        users.assert_async().await;
        assert_eq!(first.len(), 1);
        assert_eq!(second[0].full_name(), "Jo Prado");
    }
}
