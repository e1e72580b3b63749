// HTTP server binary

use anyhow::{Context, Result};
use sheet_intake::api::ApiServer;
use sheet_intake::logging::init_tracing;
use sheet_intake::util::db::Db;
use sheet_intake::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    init_tracing("info,sqlx=warn")?;
    env_util::init_env();

    let server = ApiServer::from_env()?;

    let database_url = env_util::db_url();
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&database_url, max_connections).await?;
    db.ensure_users_table()
        .await
        .context("failed to create users table")?;

    tracing::info!("Database connected successfully");

    server.run(db).await?;

    Ok(())
}
