// Seed or reset a login account

use anyhow::{Context, Result};
use clap::Parser;
use sheet_intake::api::session::hash_password;
use sheet_intake::logging::init_tracing;
use sheet_intake::util::db::Db;
use sheet_intake::util::env as env_util;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "setup_users", version, about = "Create the users table and a login account")]
struct Cli {
    /// Account name
    #[arg(long, default_value = "admin")]
    username: String,
    /// Plain-text password; stored hashed
    #[arg(long, default_value = "password")]
    password: String,
    /// Overwrite the password when the account already exists
    #[arg(long, default_value_t = false)]
    reset: bool,
    /// Optional override for the database URL
    #[arg(long)]
    db_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info,sqlx=warn")?;
    let cli = Cli::parse();

    let database_url = cli.db_url.unwrap_or_else(env_util::db_url);
    let db = Db::connect(&database_url, 1).await?;
    db.ensure_users_table()
        .await
        .context("failed to create users table")?;

    let hash = hash_password(&cli.password).context("failed to hash password")?;
    let written = db
        .upsert_user(&cli.username, &hash, cli.reset)
        .await
        .with_context(|| format!("failed to write user {}", cli.username))?;

    if written {
        info!(user = %cli.username, reset = cli.reset, "account saved");
    } else {
        info!(user = %cli.username, "account already exists; pass --reset to change its password");
    }
    Ok(())
}
