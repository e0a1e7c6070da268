use std::env;
use anyhow::{Context, Result};

/// The default commits endpoint for the deployed-version lookup.
pub const DEFAULT_VERSION_REPO_URL: &str =
    "https://api.github.com/repos/Lorza-masonska/Zdjecia/commits";

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The address the server listens on.
    pub listen_addr: String,
    /// The domain appended to every disposable address.
    pub mail_domain: String,
    /// The lifetime of a disposable mailbox in seconds.
    pub mailbox_ttl_secs: u32,
    /// How often the expired-mailbox sweeper runs, in seconds.
    pub sweep_interval_secs: u64,
    /// The commits endpoint the version cache fetches from.
    pub version_repo_url: String,
    /// How long a fetched version hash stays fresh, in seconds.
    pub version_cache_ttl_secs: u64,
    /// The timeout for a single version fetch, in seconds.
    pub version_fetch_timeout_secs: u64,
    /// Optional shared secret required on the ingestion webhook.
    pub webhook_token: Option<String>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            listen_addr: env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            mail_domain: env::var("MAIL_DOMAIN")
                .unwrap_or_else(|_| "lorza.pl".to_string()),
            mailbox_ttl_secs: env::var("MAILBOX_TTL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .context("Invalid MAILBOX_TTL_SECS")?,
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid SWEEP_INTERVAL_SECS")?,
            version_repo_url: env::var("VERSION_REPO_URL")
                .unwrap_or_else(|_| DEFAULT_VERSION_REPO_URL.to_string()),
            version_cache_ttl_secs: env::var("VERSION_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid VERSION_CACHE_TTL_SECS")?,
            version_fetch_timeout_secs: env::var("VERSION_FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid VERSION_FETCH_TIMEOUT_SECS")?,
            webhook_token: env::var("WEBHOOK_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }
}
