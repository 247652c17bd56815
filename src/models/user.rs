//! Employee account models.

use serde::{Deserialize, Serialize};

/// Company affiliation reported by the backend.
///
/// The business operates two sister companies; accounts belong to one of
/// them. Serialized as the single-letter codes the API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyCode {
    A,
    B,
}

impl CompanyCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyCode::A => "A",
            CompanyCode::B => "B",
        }
    }
}

impl std::fmt::Display for CompanyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompanyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(CompanyCode::A),
            "B" => Ok(CompanyCode::B),
            other => Err(format!("Unknown company code: {}", other)),
        }
    }
}

/// Access role for an employee account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Technician,
}

impl Role {
    pub fn display(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Technician => "Technician",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "technician" => Ok(Role::Technician),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// An employee account as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub company: Option<CompanyCode>,
    #[serde(rename = "isActive", default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn status_display(&self) -> &'static str {
        if self.active {
            "active"
        } else {
            "inactive"
        }
    }
}

/// Payload for creating a new employee account.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub company: CompanyCode,
}

/// Partial update for an existing account. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}
