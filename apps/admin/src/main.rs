use std::sync::{Arc, Weak};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{Controller, HttpRequestExecutor, RefreshNotifier};
use shared::domain::{Location, User};
use tracing::info;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Manage locations and the users allowed to access them")]
struct Args {
    /// Admin root, e.g. https://site.example.org/admin/
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List locations with their allowed users.
    Locations,
    /// List users.
    Users,
    AddLocation { path: String },
    RemoveLocation { path: String },
    AddUser { email: String },
    /// Delete a user together with all of its access grants.
    RemoveUser { email: String },
    /// Allow a user to access a location, creating the user if needed.
    Grant { email: String, path: String },
    Revoke { email: String, path: String },
    /// Allow access to a location without authentication.
    Open { path: String },
    Close { path: String },
    /// Tell whether a user may access a path.
    Check { email: String, path: String },
}

struct LogRefresh {
    controller: Weak<Controller>,
}

impl RefreshNotifier for LogRefresh {
    fn refresh(&self) {
        let Some(snapshot) = self
            .controller
            .upgrade()
            .and_then(|controller| controller.try_snapshot())
        else {
            return;
        };
        info!(
            locations = snapshot.locations.len(),
            users = snapshot.users.len(),
            "admin: view refreshed"
        );
    }
}

async fn location_with_path(controller: &Controller, path: &str) -> Result<Location> {
    controller
        .find_location_with_path(path.trim())
        .await
        .ok_or_else(|| anyhow!("no location with path {path}"))
}

async fn user_with_email(controller: &Controller, email: &str) -> Result<User> {
    controller
        .find_user_with_email(&email.trim().to_lowercase())
        .await
        .ok_or_else(|| anyhow!("no user with email {email}"))
}

fn print_location(location: &Location) {
    let emails: Vec<&str> = location
        .allowed_users
        .iter()
        .map(|user| user.email.as_str())
        .collect();
    let access = if location.open_access {
        "open".to_string()
    } else {
        emails.join(", ")
    };
    println!("{}\t{access}", location.path);
}

async fn run(controller: &Controller, command: Command) -> Result<()> {
    match command {
        Command::Locations => {
            for location in controller.locations().await {
                print_location(&location);
            }
        }
        Command::Users => {
            for user in controller.users().await {
                println!("{}\t{}", user.email, user.id.uuid());
            }
        }
        Command::AddLocation { path } => {
            controller.add_location(&path).await?;
        }
        Command::RemoveLocation { path } => {
            let location = location_with_path(controller, &path).await?;
            controller.remove_location(&location).await?;
        }
        Command::AddUser { email } => {
            let user = controller.add_user(&email).await?;
            println!("{}\t{}", user.email, user.id.uuid());
        }
        Command::RemoveUser { email } => {
            let user = user_with_email(controller, &email).await?;
            controller.remove_user(&user).await?;
        }
        Command::Grant { email, path } => {
            let location = location_with_path(controller, &path).await?;
            controller.allow_access_by_user(&email, &location).await?;
        }
        Command::Revoke { email, path } => {
            let location = location_with_path(controller, &path).await?;
            let user = user_with_email(controller, &email).await?;
            controller.revoke_access_by_user(&user, &location).await?;
        }
        Command::Open { path } => {
            let location = location_with_path(controller, &path).await?;
            controller.grant_open_access(&location).await?;
        }
        Command::Close { path } => {
            let location = location_with_path(controller, &path).await?;
            controller.revoke_open_access(&location).await?;
        }
        Command::Check { email, path } => {
            let user = user_with_email(controller, &email).await?;
            let allowed = controller.can_access_path(&user, &path).await;
            println!("{}", if allowed { "allowed" } else { "denied" });
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let executor = HttpRequestExecutor::new(&settings.server_url)?;
    let controller = Controller::new_with_ui(Arc::new(executor), |controller| {
        let refresh: Arc<dyn RefreshNotifier> = Arc::new(LogRefresh { controller });
        refresh
    });

    controller.activate().await?;
    run(&controller, args.command).await
}
