use std::sync::Arc;
use std::time::Duration;
use crate::config::Config;
use crate::error::Result;
use crate::services::version::{GitHubFetcher, VersionCache};
use crate::storage::postgres::PgStore;
use crate::storage::MailboxStore;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The mailbox storage collaborator.
    pub store: Arc<dyn MailboxStore>,
    /// The deployed-version cache.
    pub version: Arc<VersionCache>,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState` backed by PostgreSQL and the live commits
    /// endpoint.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized");

        let store = Arc::new(PgStore::new(
            db,
            config.mail_domain.clone(),
            config.mailbox_ttl_secs,
        ));

        let fetcher = GitHubFetcher::new(
            config.version_repo_url.clone(),
            Duration::from_secs(config.version_fetch_timeout_secs),
        )?;
        let version = Arc::new(VersionCache::new(
            Arc::new(fetcher),
            Duration::from_secs(config.version_cache_ttl_secs),
        ));
        tracing::info!("✅ Version cache initialized");

        Ok(AppState {
            store,
            version,
            config: config.clone(),
        })
    }

    /// Builds an `AppState` over explicit collaborators. Used by the
    /// integration tests to run the full router without PostgreSQL.
    pub fn with_parts(
        store: Arc<dyn MailboxStore>,
        version: Arc<VersionCache>,
        config: Config,
    ) -> Self {
        Self {
            store,
            version,
            config,
        }
    }
}
