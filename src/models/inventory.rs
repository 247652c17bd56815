//! Material catalog and per-location stock models.

use serde::{Deserialize, Serialize};

/// A material in the catalog (pipe, cable, meter, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub code: String,
    pub description: String,
    /// Unit of measure, e.g. "m", "un", "kg".
    pub unit: Option<String>,
}

impl Material {
    pub fn unit_display(&self) -> &str {
        self.unit.as_deref().unwrap_or("un")
    }
}

/// Payload for adding a material to the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct NewMaterial {
    pub code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A stock location: warehouse, service truck, or field depot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(rename = "locationType")]
    pub location_type: Option<String>,
}

impl Location {
    pub fn type_display(&self) -> &str {
        self.location_type.as_deref().unwrap_or("warehouse")
    }
}

/// Quantity of one material held at one location.
///
/// Quantities are computed server-side; the client only displays them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevel {
    #[serde(rename = "materialId")]
    pub material_id: i64,
    #[serde(rename = "materialCode")]
    pub material_code: String,
    #[serde(rename = "materialDescription")]
    pub material_description: String,
    #[serde(rename = "locationId")]
    pub location_id: i64,
    pub quantity: f64,
    pub unit: Option<String>,
}

impl StockLevel {
    pub fn quantity_display(&self) -> String {
        let unit = self.unit.as_deref().unwrap_or("un");
        // Drop the fraction for whole quantities
        if self.quantity.fract() == 0.0 {
            format!("{} {}", self.quantity as i64, unit)
        } else {
            format!("{:.2} {}", self.quantity, unit)
        }
    }
}
