use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::Result;

/// The sentinel returned when no version could ever be fetched.
pub const FALLBACK_VERSION: &str = "unknown";

/// Hashes are shortened to the usual abbreviated length.
pub const VERSION_HASH_LEN: usize = 7;

/// Why a version fetch did not produce a hash.
///
/// Every network condition maps onto one of these; the cache absorbs them
/// all and only surfaces the reason through its diagnostics slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("rate-limited")]
    RateLimited,
    #[error("timeout")]
    Timeout,
    #[error("network-error: {0}")]
    Network(String),
    #[error("http-{0}")]
    Http(u16),
    #[error("no-commits")]
    NoCommits,
    #[error("malformed-response: {0}")]
    Malformed(String),
}

/// Fetches the identifier of the latest deployed revision.
#[async_trait]
pub trait CommitFetcher: Send + Sync {
    async fn latest_sha(&self) -> std::result::Result<String, FetchFailure>;
}

#[derive(Deserialize)]
struct CommitRecord {
    sha: String,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// A [`CommitFetcher`] against a GitHub-style commits endpoint.
pub struct GitHubFetcher {
    http: reqwest::Client,
    url: String,
}

impl GitHubFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("lorza-mail")
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CommitFetcher for GitHubFetcher {
    async fn latest_sha(&self) -> std::result::Result<String, FetchFailure> {
        let url = format!("{}?per_page=1", self.url);
        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchFailure::Timeout
            } else {
                FetchFailure::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchFailure::Network(e.to_string()))?;

        if status == StatusCode::FORBIDDEN {
            let rate_limited = sonic_rs::from_str::<ApiError>(&body)
                .map(|err| err.message.contains("rate limit"))
                .unwrap_or(false);
            return Err(if rate_limited {
                FetchFailure::RateLimited
            } else {
                FetchFailure::Http(status.as_u16())
            });
        }

        if !status.is_success() {
            return Err(FetchFailure::Http(status.as_u16()));
        }

        let commits: Vec<CommitRecord> =
            sonic_rs::from_str(&body).map_err(|e| FetchFailure::Malformed(e.to_string()))?;

        match commits.first() {
            Some(commit) => Ok(commit.sha.clone()),
            None => Err(FetchFailure::NoCommits),
        }
    }
}

struct Slot {
    hash: Option<String>,
    fetched_at: Instant,
}

/// A time-boxed cache over the latest deployed revision's short hash.
///
/// Owned by the composition root and injected where needed; there is no
/// module-level instance. `latest` never fails: every fetch outcome maps to
/// a returned string, and the failure reason is kept in a diagnostics slot
/// instead of being discarded.
pub struct VersionCache {
    fetcher: Arc<dyn CommitFetcher>,
    ttl: Duration,
    slot: Mutex<Slot>,
    last_failure: Mutex<Option<FetchFailure>>,
}

impl VersionCache {
    pub fn new(fetcher: Arc<dyn CommitFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            slot: Mutex::new(Slot {
                hash: None,
                fetched_at: Instant::now(),
            }),
            last_failure: Mutex::new(None),
        }
    }

    /// Returns the current short version hash.
    ///
    /// A cached value younger than the freshness window is served without
    /// network access unless `force` is set. On fetch failure the last known
    /// hash is re-stamped and served; with nothing usable cached, the
    /// `unknown` sentinel is cached and returned.
    pub async fn latest(&self, force: bool) -> String {
        if !force {
            let slot = self.slot.lock().await;
            if let Some(hash) = &slot.hash {
                if slot.fetched_at.elapsed() < self.ttl {
                    return hash.clone();
                }
            }
        }

        // No single-flight: a second caller arriving while a refresh is in
        // flight issues its own fetch. The lock is never held across the
        // await.
        match self.fetcher.latest_sha().await {
            Ok(sha) => {
                let short: String = sha.chars().take(VERSION_HASH_LEN).collect();
                let mut slot = self.slot.lock().await;
                slot.hash = Some(short.clone());
                slot.fetched_at = Instant::now();
                *self.last_failure.lock().await = None;
                tracing::debug!("Version hash refreshed: {}", short);
                short
            }
            Err(failure) => {
                tracing::warn!("Version fetch failed ({}), serving fallback", failure);
                *self.last_failure.lock().await = Some(failure);

                let mut slot = self.slot.lock().await;
                slot.fetched_at = Instant::now();
                match &slot.hash {
                    Some(hash) if hash != FALLBACK_VERSION => hash.clone(),
                    _ => {
                        slot.hash = Some(FALLBACK_VERSION.to_string());
                        FALLBACK_VERSION.to_string()
                    }
                }
            }
        }
    }

    /// Clears the cache, then fetches unconditionally.
    pub async fn force_refresh(&self) -> String {
        {
            let mut slot = self.slot.lock().await;
            slot.hash = None;
        }
        self.latest(true).await
    }

    /// The reason the most recent fetch fell back, if it did.
    pub async fn last_failure(&self) -> Option<FetchFailure> {
        self.last_failure.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedFetcher {
        script: Mutex<VecDeque<std::result::Result<String, FetchFailure>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(
            script: impl IntoIterator<Item = std::result::Result<String, FetchFailure>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommitFetcher for ScriptedFetcher {
        async fn latest_sha(&self) -> std::result::Result<String, FetchFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(FetchFailure::Network("script exhausted".to_string())))
        }
    }

    const WINDOW: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn fresh_cache_serves_without_refetching() {
        let fetcher = ScriptedFetcher::new([Ok("abcdef0123456789".to_string())]);
        let cache = VersionCache::new(fetcher.clone(), WINDOW);

        let first = cache.latest(false).await;
        let second = cache.latest(false).await;

        assert_eq!(first, "abcdef0");
        assert_eq!(second, "abcdef0");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn sha_is_truncated_to_seven_chars() {
        let fetcher = ScriptedFetcher::new([Ok("1234567890abcdef".to_string())]);
        let cache = VersionCache::new(fetcher, WINDOW);
        assert_eq!(cache.latest(false).await, "1234567");
    }

    #[tokio::test]
    async fn every_failure_mode_returns_a_string() {
        let failures = [
            FetchFailure::RateLimited,
            FetchFailure::Timeout,
            FetchFailure::Network("connection refused".to_string()),
            FetchFailure::Http(500),
            FetchFailure::NoCommits,
            FetchFailure::Malformed("not json".to_string()),
        ];

        for failure in failures {
            let fetcher = ScriptedFetcher::new([Err(failure.clone())]);
            let cache = VersionCache::new(fetcher, WINDOW);
            assert_eq!(cache.latest(false).await, FALLBACK_VERSION);
            assert_eq!(cache.last_failure().await, Some(failure));
        }
    }

    #[tokio::test]
    async fn force_refresh_always_fetches() {
        let fetcher = ScriptedFetcher::new([
            Ok("aaaaaaa1111".to_string()),
            Ok("bbbbbbb2222".to_string()),
        ]);
        let cache = VersionCache::new(fetcher.clone(), WINDOW);

        assert_eq!(cache.latest(false).await, "aaaaaaa");
        assert_eq!(cache.force_refresh().await, "bbbbbbb");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_serves_and_extends_last_known_hash() {
        let fetcher = ScriptedFetcher::new([
            Ok("abcdef0123".to_string()),
            Err(FetchFailure::Timeout),
        ]);
        let cache = VersionCache::new(fetcher.clone(), WINDOW);

        assert_eq!(cache.latest(false).await, "abcdef0");

        tokio::time::advance(WINDOW + Duration::from_secs(1)).await;

        // The refetch fails; the stale hash is served and re-stamped.
        assert_eq!(cache.latest(false).await, "abcdef0");
        assert_eq!(cache.last_failure().await, Some(FetchFailure::Timeout));
        assert_eq!(fetcher.calls(), 2);

        // Re-stamping extended the window, so no further fetch happens.
        assert_eq!(cache.latest(false).await, "abcdef0");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_sentinel_is_never_extended_as_real() {
        let fetcher = ScriptedFetcher::new([
            Err(FetchFailure::Http(502)),
            Err(FetchFailure::RateLimited),
        ]);
        let cache = VersionCache::new(fetcher.clone(), WINDOW);

        assert_eq!(cache.latest(false).await, FALLBACK_VERSION);

        tokio::time::advance(WINDOW + Duration::from_secs(1)).await;

        assert_eq!(cache.latest(false).await, FALLBACK_VERSION);
        assert_eq!(cache.last_failure().await, Some(FetchFailure::RateLimited));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn success_clears_the_failure_slot() {
        let fetcher = ScriptedFetcher::new([
            Err(FetchFailure::Timeout),
            Ok("cafebabe99".to_string()),
        ]);
        let cache = VersionCache::new(fetcher, WINDOW);

        cache.latest(false).await;
        assert!(cache.last_failure().await.is_some());

        assert_eq!(cache.force_refresh().await, "cafebab");
        assert!(cache.last_failure().await.is_none());
    }
}
