//! Stock transfer models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a transfer between locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn display(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
        }
    }
}

/// One material line on a transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferItem {
    #[serde(rename = "materialId")]
    pub material_id: i64,
    #[serde(rename = "materialCode")]
    pub material_code: Option<String>,
    pub quantity: f64,
}

/// A movement of materials between two locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    #[serde(rename = "sourceLocationId")]
    pub source_location_id: i64,
    #[serde(rename = "sourceLocationName")]
    pub source_location_name: Option<String>,
    #[serde(rename = "destinationLocationId")]
    pub destination_location_id: i64,
    #[serde(rename = "destinationLocationName")]
    pub destination_location_name: Option<String>,
    #[serde(default)]
    pub items: Vec<TransferItem>,
    pub status: TransferStatus,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdBy")]
    pub created_by: Option<String>,
}

impl Transfer {
    pub fn route_display(&self) -> String {
        let src = self.source_location_name.as_deref().unwrap_or("?");
        let dst = self.destination_location_name.as_deref().unwrap_or("?");
        format!("{} -> {}", src, dst)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// Payload for creating a transfer.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransfer {
    #[serde(rename = "sourceLocationId")]
    pub source_location_id: i64,
    #[serde(rename = "destinationLocationId")]
    pub destination_location_id: i64,
    pub items: Vec<NewTransferItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTransferItem {
    #[serde(rename = "materialId")]
    pub material_id: i64,
    pub quantity: f64,
}
