// HTTP server wiring

use crate::api::{auth, middleware, routes, session::SessionKeys};
use crate::ingest::upload::DEFAULT_MAX_UPLOAD_BYTES;
use crate::util::db::Db;
use crate::util::env::{env_opt, env_parse, init_env, log_config};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::path::PathBuf;

const DEFAULT_SESSION_SECRET: &str = "secret_key_localhost";
const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Upload limits shared with the upload handlers.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub max_bytes: usize,
    pub dir: PathBuf,
}

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub session_secret: String,
    pub session_ttl_secs: i64,
    pub uploads: UploadSettings,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        init_env();

        let host = env_opt("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match env_opt("PORT") {
            Some(raw) => raw.trim().parse().context("Invalid PORT")?,
            None => 3000,
        };

        let session_secret = env_opt("SESSION_SECRET").unwrap_or_else(|| {
            tracing::warn!("SESSION_SECRET not set; using the built-in development secret");
            DEFAULT_SESSION_SECRET.to_string()
        });
        let session_ttl_secs = env_parse("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS);

        let uploads = UploadSettings {
            max_bytes: env_parse("UPLOAD_MAX_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            dir: PathBuf::from(env_opt("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string())),
        };

        log_config(
            "server",
            &[
                "HOST",
                "PORT",
                "DATABASE_URL",
                "DB_MAX_CONNS",
                "SESSION_SECRET",
                "SESSION_TTL_SECS",
                "UPLOAD_DIR",
                "UPLOAD_MAX_BYTES",
            ],
        );

        Ok(Self {
            host,
            port,
            session_secret,
            session_ttl_secs,
            uploads,
        })
    }

    /// Start the HTTP server
    pub async fn run(self, db: Db) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        std::fs::create_dir_all(&self.uploads.dir).with_context(|| {
            format!("Failed to create upload dir {}", self.uploads.dir.display())
        })?;

        tracing::info!(
            host = %self.host,
            port = %self.port,
            upload_dir = %self.uploads.dir.display(),
            max_upload_bytes = self.uploads.max_bytes,
            "Starting sheet-intake server"
        );

        let db_data = web::Data::new(db);
        let keys = SessionKeys::new(&self.session_secret, self.session_ttl_secs);
        let keys_data = web::Data::new(keys.clone());
        let uploads = web::Data::new(self.uploads.clone());

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();

            App::new()
                .app_data(db_data.clone())
                .app_data(keys_data.clone())
                .app_data(uploads.clone())
                .app_data(middleware::multipart_config(uploads.max_bytes))
                .app_data(middleware::temp_file_config(&uploads.dir))
                .wrap(auth::Auth::new(keys.clone()))
                .wrap(compress)
                .wrap(logger)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
