//! Data models for backend entities.
//!
//! This module contains the structures used to represent data from the
//! field-service backend:
//!
//! - `User`: employee accounts with role and company affiliation
//! - `Material`, `Location`, `StockLevel`: inventory catalog and stock
//! - `Transfer`: movements of materials between locations
//! - `ServiceOrder`, `MaterialUsage`: work orders and material tracking
//! - `SafetyForm`: field safety checklists (read-only)

pub mod inventory;
pub mod safety;
pub mod service_order;
pub mod transfer;
pub mod user;

pub use inventory::{Location, Material, NewMaterial, StockLevel};
pub use safety::{SafetyAnswer, SafetyForm};
pub use service_order::{MaterialUsage, OrderStatus, ServiceOrder, UsageKind};
pub use transfer::{NewTransfer, NewTransferItem, Transfer, TransferItem, TransferStatus};
pub use user::{CompanyCode, NewUser, Role, User, UserUpdate};
