use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::site::{CallSite, CallSiteId, CallSiteStats};

/// Tunables for the specialization cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries allowed per call site before it is flagged `Exploding`.
    pub max_entries_per_site: usize,
    /// Soft bound on live call sites; exceeding it is reported, not
    /// enforced.
    pub max_call_sites: usize,
    /// Guard-miss records retained per site for the generalizer.
    pub failure_history: usize,
    /// Whether single-axis divergences may be promoted to dynamic axes.
    /// When off, every miss compiles concrete.
    pub allow_dynamic_dims: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries_per_site: 64,
            max_call_sites: 4096,
            failure_history: 8,
            allow_dynamic_dims: true,
        }
    }
}

/// Process-wide registry of call sites. Sites are created lazily on first
/// encounter and live until an explicit `clear`, which exists for test
/// isolation.
pub struct CacheRegistry {
    sites: RwLock<AHashMap<CallSiteId, Arc<CallSite>>>,
    config: CacheConfig,
    site_overflow: AtomicU64,
}

impl CacheRegistry {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            sites: RwLock::new(AHashMap::new()),
            config,
            site_overflow: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fetch the site for `id`, creating it on first encounter.
    pub fn site(&self, id: &CallSiteId) -> Arc<CallSite> {
        if let Some(site) = self.sites.read().get(id) {
            return Arc::clone(site);
        }
        let mut sites = self.sites.write();
        if let Some(site) = sites.get(id) {
            return Arc::clone(site);
        }
        if sites.len() >= self.config.max_call_sites {
            self.site_overflow.fetch_add(1, Ordering::Relaxed);
            warn!(
                site = %id,
                live = sites.len(),
                bound = self.config.max_call_sites,
                "call site bound exceeded"
            );
        }
        debug!(site = %id, "registering call site");
        let site = Arc::new(CallSite::new(
            id.clone(),
            self.config.max_entries_per_site,
            self.config.failure_history,
        ));
        sites.insert(id.clone(), Arc::clone(&site));
        site
    }

    pub fn get(&self, id: &CallSiteId) -> Option<Arc<CallSite>> {
        self.sites.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sites.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.read().is_empty()
    }

    /// Sites created past the configured bound.
    pub fn site_overflow(&self) -> u64 {
        self.site_overflow.load(Ordering::Relaxed)
    }

    /// Drop every call site. Exposed for test isolation.
    pub fn clear(&self) {
        self.sites.write().clear();
        self.site_overflow.store(0, Ordering::Relaxed);
    }

    pub fn site_stats(&self, id: &CallSiteId) -> Option<CallSiteStats> {
        self.get(id).map(|site| site.stats())
    }

    /// All per-site stats, serialized for observability dumps.
    pub fn report_json(&self) -> serde_json::Result<String> {
        let mut stats: Vec<CallSiteStats> = self
            .sites
            .read()
            .values()
            .map(|site| site.stats())
            .collect();
        stats.sort_by(|a, b| a.site.cmp(&b.site));
        serde_json::to_string_pretty(&stats)
    }
}

static GLOBAL: Lazy<CacheRegistry> = Lazy::new(CacheRegistry::with_defaults);

/// The process-wide registry used when no explicit one is supplied.
pub fn global() -> &'static CacheRegistry {
    &GLOBAL
}
