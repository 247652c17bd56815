//! API client for the field-service backend.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests against the REST backend: login, users, materials, stock,
//! transfers, service-order materials, and safety forms.
//!
//! Retry policy: read requests (GET) that fail with anything other than a
//! 401 are retried exactly once; writes are never retried. A 401 is never
//! retried either - it flips the shared expiry flag and surfaces as
//! `ApiError::Unauthorized`.

use std::time::Duration;

use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::ExpiryFlag;
use crate::models::{
    Location, Material, MaterialUsage, NewMaterial, NewTransfer, NewUser, SafetyForm,
    ServiceOrder, StockLevel, Transfer, User, UserUpdate,
};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Successful login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub company: Option<crate::models::CompanyCode>,
}

/// API client for the backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    expiry: ExpiryFlag,
}

impl ApiClient {
    /// Create a new client against the given base URL.
    pub fn new(base_url: impl Into<String>, expiry: ExpiryFlag) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            expiry,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
            expiry: self.expiry.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check a response, mapping failures to `ApiError`.
    ///
    /// A 401 on an authenticated request marks the shared expiry flag; a 401
    /// on login (no token yet) is just a bad-credentials error.
    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &body);
        if err.is_unauthorized() && self.token.is_some() && self.expiry.mark_expired() {
            warn!("Session token rejected by server, marking session expired");
        }
        Err(err)
    }

    async fn send_get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let mut request = self.client.get(url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let response = self.check_response(response).await?;
        let parsed = response.json().await?;
        Ok(parsed)
    }

    /// GET with the read retry policy: one immediate retry unless the
    /// failure was a 401.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        match self.send_get(&url).await {
            Err(err) if !err.is_unauthorized() => {
                warn!(url = %url, error = %err, "Read request failed, retrying once");
                self.send_get(&url).await
            }
            other => other,
        }
    }

    /// Send a write request. Writes are never retried: a duplicated POST
    /// could duplicate a transfer or a material usage line.
    async fn write<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut request = self.client.request(method, &url).json(body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let response = self.check_response(response).await?;
        let parsed = response.json().await?;
        Ok(parsed)
    }

    /// Write variant for endpoints whose response body we don't consume.
    async fn write_no_body<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let url = self.url(path);
        let mut request = self.client.request(method, &url).json(body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        self.check_response(response).await?;
        Ok(())
    }

    // ===== Authentication =====

    /// Authenticate and return the token plus company affiliation.
    /// Login is a write: a failure is surfaced immediately, never retried.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        debug!(username, "Sending login request");
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });
        self.write(Method::POST, "/auth/login", &body).await
    }

    // ===== Users =====

    pub async fn fetch_users(&self) -> Result<Vec<User>, ApiError> {
        self.get("/users").await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.write(Method::POST, "/users", user).await
    }

    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<User, ApiError> {
        self.write(Method::PUT, &format!("/users/{}", id), update)
            .await
    }

    pub async fn deactivate_user(&self, id: i64) -> Result<(), ApiError> {
        self.write_no_body(
            Method::POST,
            &format!("/users/{}/deactivate", id),
            &serde_json::json!({}),
        )
        .await
    }

    // ===== Materials and stock =====

    pub async fn fetch_materials(&self) -> Result<Vec<Material>, ApiError> {
        self.get("/materials").await
    }

    pub async fn create_material(&self, material: &NewMaterial) -> Result<Material, ApiError> {
        self.write(Method::POST, "/materials", material).await
    }

    pub async fn fetch_locations(&self) -> Result<Vec<Location>, ApiError> {
        self.get("/locations").await
    }

    pub async fn fetch_stock(&self, location_id: i64) -> Result<Vec<StockLevel>, ApiError> {
        self.get(&format!("/locations/{}/stock", location_id)).await
    }

    // ===== Transfers =====

    pub async fn fetch_transfers(&self) -> Result<Vec<Transfer>, ApiError> {
        self.get("/transfers").await
    }

    pub async fn create_transfer(&self, transfer: &NewTransfer) -> Result<Transfer, ApiError> {
        self.write(Method::POST, "/transfers", transfer).await
    }

    // ===== Service orders =====

    pub async fn fetch_service_orders(&self) -> Result<Vec<ServiceOrder>, ApiError> {
        self.get("/service-orders").await
    }

    pub async fn fetch_order_materials(
        &self,
        order_id: i64,
    ) -> Result<Vec<MaterialUsage>, ApiError> {
        self.get(&format!("/service-orders/{}/materials", order_id))
            .await
    }

    pub async fn add_order_material(
        &self,
        order_id: i64,
        usage: &MaterialUsage,
    ) -> Result<MaterialUsage, ApiError> {
        self.write(
            Method::POST,
            &format!("/service-orders/{}/materials", order_id),
            usage,
        )
        .await
    }

    // ===== Safety forms =====

    pub async fn fetch_safety_forms(&self) -> Result<Vec<SafetyForm>, ApiError> {
        self.get("/safety-forms").await
    }

    pub async fn fetch_safety_form(&self, id: i64) -> Result<SafetyForm, ApiError> {
        self.get(&format!("/safety-forms/{}", id)).await
    }
}
