//! Process configuration from the environment, with `.env` support.
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::info;

static DOTENV: OnceLock<Option<std::path::PathBuf>> = OnceLock::new();

/// SQLite file stem used when DATABASE_URL is unset.
pub const DEFAULT_DB_NAME: &str = "belajarlogin";

/// Read `.env` into the process environment on first use. Variables that are
/// already set win over the file.
pub fn init_env() {
    DOTENV.get_or_init(|| dotenv::dotenv().ok());
}

/// Non-blank value of `key`.
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// `key` parsed as `T`; unset or unparsable values give `default`.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

/// DATABASE_URL, or a local SQLite file named after DB_NAME.
pub fn db_url() -> String {
    env_opt("DATABASE_URL").unwrap_or_else(|| {
        let name = env_opt("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
        sqlite_file_url(&name)
    })
}

/// `sqlite://<name>.db`, created on first connect.
pub fn sqlite_file_url(name: &str) -> String {
    format!("sqlite://{}.db?mode=rwc", name.trim())
}

pub(crate) fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD")
        || k.contains("SECRET")
        || k.contains("KEY")
        || k.contains("TOKEN")
        || k.contains("COOKIE")
    {
        return "***".to_string();
    }

    let val_trim = val.trim();

    // credentials embedded in a URL (e.g. a remote DSN) are masked
    if let Ok(mut u) = url::Url::parse(val_trim) {
        if !u.username().is_empty() || u.password().is_some() {
            let _ = u.set_username("***");
            let _ = u.set_password(Some("***"));
            return u.to_string();
        }
    }

    val_trim.to_string()
}

/// Log the effective value of each key once at startup, secrets masked.
pub fn log_config(component: &str, keys: &[&str]) {
    let snapshot: Vec<(&str, String)> = keys
        .iter()
        .map(|&k| (k, env_opt(k).map(|v| redact_value(k, &v)).unwrap_or_default()))
        .collect();
    info!(component, ?snapshot, "configuration");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        assert_eq!(redact_value("SESSION_SECRET", "abc"), "***");
        assert_eq!(redact_value("DB_PASSWORD", "abc"), "***");
    }

    #[test]
    fn url_credentials_are_masked() {
        let out = redact_value("DATABASE_URL", "postgres://bob:hunter2@db:5432/app");
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("bob"));
        assert!(out.contains("db:5432"));
    }

    #[test]
    fn database_file_url_from_name() {
        assert_eq!(sqlite_file_url(DEFAULT_DB_NAME), "sqlite://belajarlogin.db?mode=rwc");
        assert_eq!(sqlite_file_url(" sales "), "sqlite://sales.db?mode=rwc");
    }

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(
            redact_value("DATABASE_URL", " sqlite://belajarlogin.db?mode=rwc "),
            "sqlite://belajarlogin.db?mode=rwc"
        );
        assert_eq!(redact_value("PORT", "3000"), "3000");
    }
}
