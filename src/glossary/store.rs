//! TTL-cached glossary store
//!
//! Reads are lock-cheap clones of the current `Arc` snapshot. When the TTL
//! lapses, the first caller refreshes while concurrent callers wait on the
//! same refresh instead of stampeding the upstream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::GlossaryConfig;
use crate::error::OrchestratorError;
use crate::metrics::METRICS;

use super::snapshot::{GlossarySnapshot, GLOSSARY_FILES};

pub struct GlossaryStore {
    http: reqwest::Client,
    config: GlossaryConfig,
    current: RwLock<Arc<GlossarySnapshot>>,
    refresh_lock: Mutex<()>,
    refreshes: AtomicU64,
}

impl GlossaryStore {
    pub fn new(config: GlossaryConfig) -> Result<Self, OrchestratorError> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| {
                OrchestratorError::Config(format!("Failed to build glossary client: {}", e))
            })?;
        Ok(Self {
            http,
            config,
            current: RwLock::new(Arc::new(GlossarySnapshot::default())),
            refresh_lock: Mutex::new(()),
            refreshes: AtomicU64::new(0),
        })
    }

    /// Current snapshot, refreshing first if the TTL has lapsed.
    pub async fn snapshot(&self) -> Arc<GlossarySnapshot> {
        if let Some(fresh) = self.fresh_snapshot() {
            return fresh;
        }

        let _guard = self.refresh_lock.lock().await;
        // A concurrent caller may have refreshed while we waited.
        if let Some(fresh) = self.fresh_snapshot() {
            return fresh;
        }

        let snapshot = Arc::new(self.fetch_all().await);
        // The guard only wraps an Arc swap, so a poisoned lock still holds a
        // usable value; recover it instead of cascading the panic.
        *self
            .current
            .write()
            .unwrap_or_else(|e| e.into_inner()) = snapshot.clone();
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        snapshot
    }

    fn fresh_snapshot(&self) -> Option<Arc<GlossarySnapshot>> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        if current.is_fresh(self.config.ttl()) {
            Some(current.clone())
        } else {
            None
        }
    }

    /// Number of refreshes performed since startup.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    async fn fetch_all(&self) -> GlossarySnapshot {
        let fetches = GLOSSARY_FILES.iter().map(|name| self.fetch_file(name));
        let results = futures::future::join_all(fetches).await;

        let mut files: HashMap<&str, Value> = HashMap::new();
        let mut loaded = 0;
        for (name, result) in GLOSSARY_FILES.iter().zip(results) {
            match result {
                Ok(value) => {
                    loaded += 1;
                    files.insert(name, value);
                }
                Err(e) => {
                    warn!(file = *name, error = %e, "Failed to load glossary file");
                }
            }
        }

        METRICS.record_glossary_refresh(loaded > 0);
        info!(loaded, total = GLOSSARY_FILES.len(), "Glossary snapshot refreshed");
        GlossarySnapshot::from_files(files)
    }

    async fn fetch_file(&self, name: &str) -> Result<Value, reqwest::Error> {
        let url = format!("{}/{}.json", self.config.base_url.trim_end_matches('/'), name);
        let value = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: String) -> GlossaryConfig {
        GlossaryConfig {
            base_url,
            ttl_secs: 3600,
            fetch_timeout_ms: 2_000,
        }
    }

    #[tokio::test]
    async fn test_second_read_within_ttl_reuses_snapshot() {
        let server = mockito::Server::new_async().await;
        let store = GlossaryStore::new(config(server.url())).unwrap();

        let first = store.snapshot().await;
        let second = store.snapshot().await;

        assert_eq!(store.refresh_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_concurrent_first_reads_refresh_once() {
        let server = mockito::Server::new_async().await;
        let store = Arc::new(GlossaryStore::new(config(server.url())).unwrap());

        let (left, right) = tokio::join!(store.snapshot(), store.snapshot());

        assert_eq!(store.refresh_count(), 1);
        assert!(Arc::ptr_eq(&left, &right));
    }

    #[tokio::test]
    async fn test_poisoned_lock_still_serves_snapshots() {
        let server = mockito::Server::new_async().await;
        let store = Arc::new(GlossaryStore::new(config(server.url())).unwrap());

        let poisoner = Arc::clone(&store);
        std::thread::spawn(move || {
            let _guard = poisoner.current.write().unwrap();
            panic!("poison the snapshot lock");
        })
        .join()
        .unwrap_err();

        let first = store.snapshot().await;
        let second = store.snapshot().await;
        assert_eq!(store.refresh_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_refresh_parses_loaded_files() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/acronyms.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"platform": {"HDM": "Health Data Mart"}}"#)
            .create_async()
            .await;

        let store = GlossaryStore::new(config(server.url())).unwrap();
        let snapshot = store.snapshot().await;

        mock.assert_async().await;
        assert_eq!(snapshot.acronym_definition("HDM"), Some("Health Data Mart"));
        // The five files the server never provided are simply absent.
        assert_eq!(snapshot.product_count(), 0);
    }
}
