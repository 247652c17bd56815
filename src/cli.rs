use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "fieldstock")]
#[command(author, version, about = "CLI client for the field-service inventory backend", long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides config and FIELDSTOCK_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in and start a session
    Login {
        /// Username (email); prompts if omitted
        username: Option<String>,

        /// Save the password in the OS keychain
        #[arg(long)]
        remember: bool,

        /// Prompt for the password even if one is stored in the keychain
        #[arg(long)]
        password_prompt: bool,
    },

    /// End the session and delete the storage partition
    Logout,

    /// Show session state and cache freshness
    Status,

    /// List employee accounts
    Users,

    /// Create an employee account (prompts for the initial password)
    CreateUser {
        /// First name
        first_name: String,

        /// Last name
        last_name: String,

        /// Email address (also the login username)
        #[arg(long)]
        email: String,

        /// Role: admin, manager, or technician
        #[arg(long, default_value = "technician")]
        role: String,

        /// Company code: A or B
        #[arg(long)]
        company: String,
    },

    /// Update fields on an employee account
    UpdateUser {
        /// Account id
        id: i64,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Role: admin, manager, or technician
        #[arg(long)]
        role: Option<String>,
    },

    /// Deactivate an employee account
    DeactivateUser {
        /// Account id
        id: i64,
    },

    /// List the material catalog
    Materials,

    /// Add a material to the catalog
    CreateMaterial {
        /// Material code, e.g. CB-10
        code: String,

        /// Description
        description: String,

        /// Unit of measure, e.g. m, un, kg
        #[arg(long)]
        unit: Option<String>,
    },

    /// List stock locations
    Locations,

    /// Show stock levels at a location
    Stock {
        /// Location id
        location: i64,
    },

    /// List transfers between locations
    Transfers,

    /// Create a transfer of one material between two locations
    Transfer {
        /// Source location id
        #[arg(long)]
        from: i64,

        /// Destination location id
        #[arg(long)]
        to: i64,

        /// Material id
        #[arg(long)]
        material: i64,

        /// Quantity to move
        #[arg(long)]
        quantity: f64,
    },

    /// List service orders
    Orders,

    /// Show materials applied to a service order
    OrderMaterials {
        /// Service order id
        id: i64,
    },

    /// Record a material applied to a service order
    ApplyMaterial {
        /// Service order id
        id: i64,

        /// Material id
        #[arg(long)]
        material: i64,

        /// Quantity applied
        #[arg(long)]
        quantity: f64,
    },

    /// List submitted safety forms
    SafetyForms,

    /// Show one safety form with its answers
    SafetyForm {
        /// Form id
        id: i64,
    },

    /// Drop all cached data so the next reads hit the network
    Refresh,

    /// Invalidate one cached resource (users, materials, stock, ...)
    Invalidate {
        /// Resource name
        resource: String,
    },
}
