//! Fieldstock - a CLI client for a field-service inventory backend.
//!
//! All business logic lives server-side; this client handles session state,
//! caching of query results, and plain-text views of users, materials,
//! stock, transfers, service orders, and safety forms.

mod api;
mod app;
mod auth;
mod cache;
mod cli;
mod config;
mod models;
mod utils;

use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use auth::{AuthState, CredentialStore, Partition};
use cli::{Cli, Commands};
use config::Config;
use models::{MaterialUsage, NewMaterial, NewTransfer, NewTransferItem, NewUser, UsageKind, UserUpdate};
use utils::{format_date, format_optional, truncate_string};

/// Unparameterized cached resources shown in the `status` freshness listing.
const STATUS_RESOURCES: &[&str] = &[
    "users",
    "materials",
    "locations",
    "transfers",
    "orders",
    "safety-forms",
];

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(ref url) = cli.api_url {
        config.api_url = Some(url.clone());
    }
    let api_url = config.resolve_api_url()?;
    let cache_dir = config.cache_dir()?;
    let partition = Partition::resolve(&cache_dir, config.last_partition.as_deref())?;
    let mut app = App::open(&api_url, partition)?;
    info!(api_url = %api_url, partition = app.partition_id(), "Fieldstock starting");

    match cli.command {
        Commands::Login { username, remember, password_prompt } => {
            // Coming back from an expired session: acknowledge before re-login
            if matches!(app.auth_state(), AuthState::Expired) {
                app.acknowledge_expired()?;
            }
            let username = match username.or_else(|| config.last_username.clone()) {
                Some(u) => u,
                None => prompt_line("Username: ")?,
            };
            // --password-prompt bypasses the keychain, e.g. after a
            // server-side password change left a stale stored credential
            let password = if password_prompt {
                rpassword::prompt_password("Password: ")?
            } else {
                match CredentialStore::get_password(&username) {
                    Ok(p) => p,
                    Err(_) => rpassword::prompt_password("Password: ")?,
                }
            };

            app.login(&username, &password).await?;

            if remember {
                if let Err(e) = CredentialStore::store(&username, &password) {
                    eprintln!("Warning: could not store password in keychain: {}", e);
                }
            }
            config.last_username = Some(username);
            config.last_partition = Some(app.partition_id().to_string());
            config.save()?;

            let company = app
                .session()
                .company
                .map(|c| format!(" (company {})", c))
                .unwrap_or_default();
            println!("Logged in{}.", company);
        }

        Commands::Logout => {
            app.logout().await?;
            config.last_partition = None;
            config.save()?;
            println!("Logged out.");
        }

        Commands::Status => {
            let state = match app.auth_state() {
                AuthState::Authenticated => "authenticated",
                AuthState::Unauthenticated => "not logged in",
                AuthState::Expired => "session expired",
            };
            println!("Backend:    {}", api_url);
            println!("Partition:  {}", app.partition_id());
            println!("State:      {}", state);
            if let Some(company) = app.session().company {
                println!("Company:    {}", company);
            }
            for resource in STATUS_RESOURCES {
                let age = app.cache_age(resource).await.unwrap_or_else(|| "never".to_string());
                println!("Cache {:<14} {}", format!("{}:", resource), age);
            }
        }

        Commands::Users => {
            let users = app.users().await?;
            println!("{:<5} {:<28} {:<12} {:<8} {}", "ID", "NAME", "ROLE", "COMPANY", "STATUS");
            for user in &users {
                println!(
                    "{:<5} {:<28} {:<12} {:<8} {}",
                    user.id,
                    truncate_string(&user.full_name(), 28),
                    user.role.display(),
                    user.company.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
                    user.status_display(),
                );
            }
        }

        Commands::CreateUser { first_name, last_name, email, role, company } => {
            let role = role.parse().map_err(anyhow::Error::msg)?;
            let company = company.parse().map_err(anyhow::Error::msg)?;
            let password = rpassword::prompt_password("Initial password: ")?;
            let user = NewUser {
                first_name,
                last_name,
                email,
                password,
                role,
                company,
            };
            let created = app.create_user(&user).await?;
            println!("User {} created (id {}).", created.full_name(), created.id);
        }

        Commands::UpdateUser { id, first_name, last_name, email, phone, role } => {
            let role = match role {
                Some(r) => Some(r.parse().map_err(anyhow::Error::msg)?),
                None => None,
            };
            let update = UserUpdate {
                first_name,
                last_name,
                email,
                phone,
                role,
            };
            let updated = app.update_user(id, &update).await?;
            println!("User {} updated.", updated.full_name());
        }

        Commands::DeactivateUser { id } => {
            app.deactivate_user(id).await?;
            println!("User {} deactivated.", id);
        }

        Commands::Materials => {
            let materials = app.materials().await?;
            println!("{:<5} {:<10} {:<40} {}", "ID", "CODE", "DESCRIPTION", "UNIT");
            for material in &materials {
                println!(
                    "{:<5} {:<10} {:<40} {}",
                    material.id,
                    material.code,
                    truncate_string(&material.description, 40),
                    material.unit_display(),
                );
            }
        }

        Commands::CreateMaterial { code, description, unit } => {
            let material = NewMaterial {
                code,
                description,
                unit,
            };
            let created = app.create_material(&material).await?;
            println!("Material {} created (id {}).", created.code, created.id);
        }

        Commands::Locations => {
            let locations = app.locations().await?;
            println!("{:<5} {:<30} {}", "ID", "NAME", "TYPE");
            for location in &locations {
                println!(
                    "{:<5} {:<30} {}",
                    location.id,
                    truncate_string(&location.name, 30),
                    location.type_display(),
                );
            }
        }

        Commands::Stock { location } => {
            let stock = app.stock(location).await?;
            println!("{:<10} {:<40} {}", "CODE", "DESCRIPTION", "QUANTITY");
            for level in &stock {
                println!(
                    "{:<10} {:<40} {}",
                    level.material_code,
                    truncate_string(&level.material_description, 40),
                    level.quantity_display(),
                );
            }
        }

        Commands::Transfers => {
            let transfers = app.transfers().await?;
            println!("{:<5} {:<40} {:<10} {:<6} {}", "ID", "ROUTE", "STATUS", "ITEMS", "CREATED");
            for transfer in &transfers {
                let created = transfer
                    .created_at
                    .map(|d| format_date(&d.to_rfc3339()))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<5} {:<40} {:<10} {:<6} {}",
                    transfer.id,
                    truncate_string(&transfer.route_display(), 40),
                    transfer.status.display(),
                    transfer.item_count(),
                    created,
                );
            }
        }

        Commands::Transfer { from, to, material, quantity } => {
            let transfer = NewTransfer {
                source_location_id: from,
                destination_location_id: to,
                items: vec![NewTransferItem {
                    material_id: material,
                    quantity,
                }],
            };
            let created = app.create_transfer(&transfer).await?;
            println!("Transfer {} created ({}).", created.id, created.status.display());
        }

        Commands::Orders => {
            let orders = app.service_orders().await?;
            println!("{:<5} {:<16} {:<30} {:<12} {}", "ID", "NUMBER", "CUSTOMER", "STATUS", "ASSIGNED");
            for order in &orders {
                println!(
                    "{:<5} {:<16} {:<30} {:<12} {}",
                    order.id,
                    order.number,
                    truncate_string(order.customer_display(), 30),
                    order.status.display(),
                    format_optional(&order.assigned_to, "-"),
                );
            }
        }

        Commands::OrderMaterials { id } => {
            let usages = app.order_materials(id).await?;
            println!("{:<10} {:<10} {}", "MATERIAL", "QUANTITY", "KIND");
            for usage in &usages {
                let kind = match usage.kind {
                    UsageKind::Applied => "applied",
                    UsageKind::Returned => "returned",
                };
                println!(
                    "{:<10} {:<10} {}",
                    format_optional(&usage.material_code, "-"),
                    usage.quantity,
                    kind,
                );
            }
        }

        Commands::ApplyMaterial { id, material, quantity } => {
            let usage = MaterialUsage {
                material_id: material,
                material_code: None,
                quantity,
                kind: UsageKind::Applied,
            };
            app.add_order_material(id, &usage).await?;
            println!("Recorded {} of material {} on order {}.", quantity, material, id);
        }

        Commands::SafetyForms => {
            let forms = app.safety_forms().await?;
            println!("{:<5} {:<40} {:<16} {}", "ID", "TITLE", "ORDER", "SUBMITTED");
            for form in &forms {
                println!(
                    "{:<5} {:<40} {:<16} {}",
                    form.id,
                    truncate_string(&form.title, 40),
                    format_optional(&form.service_order_number, "-"),
                    form.submitted_display(),
                );
            }
        }

        Commands::SafetyForm { id } => {
            let form = app.safety_form(id).await?;
            println!("{}", form.title);
            println!("Submitted by {}", form.submitted_display());
            if let Some(ref order) = form.service_order_number {
                println!("Service order: {}", order);
            }
            println!();
            for answer in &form.answers {
                println!("  {}", answer.question);
                println!("    -> {}", format_optional(&answer.answer, "(no answer)"));
            }
        }

        Commands::Refresh => {
            app.refresh().await;
            if matches!(app.auth_state(), AuthState::Authenticated) {
                app.prefetch().await?;
                println!("Cache refreshed.");
            } else {
                println!("Cache cleared; next reads will hit the backend.");
            }
        }

        Commands::Invalidate { resource } => {
            app.invalidate(&resource).await;
            println!("Invalidated '{}'.", resource);
        }
    }

    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lists_every_unparameterized_resource() {
        for resource in ["users", "materials", "locations", "transfers", "orders", "safety-forms"] {
            assert!(
                STATUS_RESOURCES.contains(&resource),
                "status listing is missing {}",
                resource
            );
        }
    }
}
