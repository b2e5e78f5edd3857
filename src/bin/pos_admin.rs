use std::{str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use pos_backoffice::{
    auth::{AuthService, NewUser, UserProfile},
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::{store, user::Role},
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pos-admin", about = "Operator tasks for the POS back-office", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Register a new store
    CreateStore(CreateStoreArgs),
    /// Create a user that can log in to the back-office
    CreateUser(CreateUserArgs),
}

#[derive(Args)]
struct CreateStoreArgs {
    #[arg(help = "Display name of the store")]
    name: String,
    #[arg(long, default_value = "USD", help = "ISO currency code")]
    currency: String,
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    password: String,
    #[arg(long, default_value = "cashier", help = "admin, manager or cashier")]
    role: String,
    #[arg(long, value_parser = clap::value_parser!(Uuid), help = "Store the user works in")]
    store_id: Option<Uuid>,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        debug!("connected to database");

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }

    fn auth_service(&self) -> AuthService {
        AuthService::new(self.db.clone(), self.config.session_ttl_secs)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::CreateStore(args) => handle_create_store(&context, args, cli.json).await?,
        Commands::CreateUser(args) => handle_create_user(&context, args, cli.json).await?,
    }

    Ok(())
}

async fn handle_create_store(context: &CliContext, args: CreateStoreArgs, json: bool) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(anyhow!("store name must not be empty"));
    }
    let currency = args.currency.trim().to_ascii_uppercase();
    if currency.len() != 3 {
        return Err(anyhow!("currency must be a three-letter code, got {}", currency));
    }

    let created = store::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        currency: Set(currency),
        created_at: Set(Utc::now()),
    }
    .insert(&*context.db)
    .await
    .context("failed to create store")?;

    if json {
        print_json(&created)?;
    } else {
        println!("Created store {} ({})", created.name, created.id);
    }
    Ok(())
}

async fn handle_create_user(context: &CliContext, args: CreateUserArgs, json: bool) -> Result<()> {
    let role = Role::from_str(&args.role).map_err(|e| anyhow!(e))?;

    if let Some(store_id) = args.store_id {
        store::Entity::find_by_id(store_id)
            .one(&*context.db)
            .await
            .context("failed to look up store")?
            .ok_or_else(|| anyhow!("store {} does not exist", store_id))?;
    } else if role != Role::Admin {
        return Err(anyhow!("--store-id is required for {} users", role.as_str()));
    }

    let created = context
        .auth_service()
        .create_user(NewUser {
            store_id: args.store_id,
            email: args.email,
            name: args.name,
            password: args.password,
            role,
        })
        .await
        .context("failed to create user")?;
    let profile = UserProfile::from(&created);

    if json {
        print_json(&profile)?;
    } else {
        println!(
            "Created {} {} ({})",
            profile.role.as_str(),
            profile.email,
            profile.id
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
