//! Authentication module: session state, storage partitions, and expiry
//! coordination.
//!
//! This module provides:
//! - `Session` / `SessionStore`: token-based session state with
//!   partition-scoped persistence
//! - `Partition`: randomly-identified storage partitions so concurrent
//!   sessions never share state
//! - `ExpiryFlag` / `AuthState`: the process-wide "token was rejected" signal
//! - `CredentialStore`: secure OS-level credential storage via keyring

pub mod credentials;
pub mod expiry;
pub mod partition;
pub mod session;

pub use credentials::CredentialStore;
pub use expiry::{AuthState, ExpiryFlag};
pub use partition::Partition;
pub use session::{Session, SessionStore};
