//! REST API client module for the field-service backend.
//!
//! This module provides the `ApiClient` for communicating with the backend
//! REST service: login, users, materials, stock, transfers, service-order
//! materials, and safety forms.
//!
//! The API uses bearer token authentication obtained through the login
//! endpoint; all wire formats are dictated by the backend.

pub mod client;
pub mod error;

pub use client::{ApiClient, LoginResponse};
pub use error::ApiError;
