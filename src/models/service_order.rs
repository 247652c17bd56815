//! Service order and material usage models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    InProgress,
    Closed,
}

impl OrderStatus {
    pub fn display(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::InProgress => "in progress",
            OrderStatus::Closed => "closed",
        }
    }
}

/// A field-service work order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: i64,
    pub number: String,
    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,
    pub status: OrderStatus,
    #[serde(rename = "assignedTo")]
    pub assigned_to: Option<String>,
    #[serde(rename = "openedAt")]
    pub opened_at: Option<DateTime<Utc>>,
}

impl ServiceOrder {
    pub fn customer_display(&self) -> &str {
        self.customer_name.as_deref().unwrap_or("-")
    }
}

/// Material applied to (or returned from) a service order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialUsage {
    #[serde(rename = "materialId")]
    pub material_id: i64,
    #[serde(rename = "materialCode")]
    pub material_code: Option<String>,
    pub quantity: f64,
    /// "applied" when consumed on site, "returned" when sent back to stock.
    #[serde(default = "default_usage_kind")]
    pub kind: UsageKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Applied,
    Returned,
}

fn default_usage_kind() -> UsageKind {
    UsageKind::Applied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_order() {
        let json = r#"{
            "id": 501,
            "number": "OS-2024-0117",
            "customerName": "Riverside Condominium",
            "status": "inprogress",
            "assignedTo": "jo@example.com",
            "openedAt": "2024-10-28T09:00:00Z"
        }"#;
        let order: ServiceOrder = serde_json::from_str(json).expect("Failed to parse order");
        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(order.customer_display(), "Riverside Condominium");
    }

    #[test]
    fn test_usage_kind_defaults_to_applied() {
        let json = r#"{"materialId": 3, "materialCode": "CB-10", "quantity": 12.5}"#;
        let usage: MaterialUsage = serde_json::from_str(json).expect("Failed to parse usage");
        assert_eq!(usage.kind, UsageKind::Applied);
    }
}
