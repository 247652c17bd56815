//! Local caching module for server state.
//!
//! This module provides the `QueryCache`, a keyed TTL cache of remote query
//! results. Values are held in memory and mirrored to JSON files inside the
//! active storage partition, so data is available offline and before login.
//!
//! Cached resources include users, materials, locations, per-location stock,
//! transfers, service orders, and safety forms.

pub mod store;

pub use store::{CacheKey, CachedData, QueryCache};
