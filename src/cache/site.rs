use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::{AHashMap, AHashSet};
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::warn;

use crate::cache::entry::CacheEntry;
use crate::generalize::FailureHistory;
use crate::guard::Guard;
use crate::symbol::{SymbolBindings, SymbolId};
use crate::value::{Position, Value};

/// Interned identity of a traceable region of the host program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSiteId(Arc<str>);

impl CallSiteId {
    pub fn new(location: impl AsRef<str>) -> Self {
        Self(Arc::from(location.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallSiteId {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

impl fmt::Display for CallSiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a call site as its cache fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SiteState {
    /// No entries yet.
    Cold,
    /// At least one concrete entry, none generalized.
    Specialized,
    /// One or more widened entries absorbing a dynamic axis.
    Generalized,
    /// Entry count exceeded the configured bound. The site keeps
    /// operating; the state is a surfaced diagnostic.
    Exploding,
}

/// Per-site observable counters, the surface conformance tests exercise.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CallSiteStats {
    pub site: String,
    pub state: SiteState,
    pub entries: usize,
    pub translate_count: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub explosion_count: u64,
    pub generalized: Vec<String>,
    pub breakgraph: Vec<String>,
}

/// One traceable region's cache: an append-only entry list plus the state
/// the generalizer needs across misses. Entries are only ever appended,
/// under the compile lock; lookups take a read lock and see every
/// published entry.
pub struct CallSite {
    id: CallSiteId,
    entries: RwLock<Vec<Arc<CacheEntry>>>,
    state: RwLock<SiteState>,
    history: Mutex<FailureHistory>,
    markers: Mutex<AHashSet<Position>>,
    generalized: Mutex<AHashMap<Position, SymbolId>>,
    compile_lock: Mutex<()>,
    max_entries: usize,
    translate_count: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    explosion_count: AtomicU64,
}

impl CallSite {
    pub(crate) fn new(id: CallSiteId, max_entries: usize, history_capacity: usize) -> Self {
        Self {
            id,
            entries: RwLock::new(Vec::new()),
            state: RwLock::new(SiteState::Cold),
            history: Mutex::new(FailureHistory::new(history_capacity)),
            markers: Mutex::new(AHashSet::new()),
            generalized: Mutex::new(AHashMap::new()),
            compile_lock: Mutex::new(()),
            max_entries,
            translate_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            explosion_count: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &CallSiteId {
        &self.id
    }

    /// Probe the entry list in insertion order; first satisfied guard
    /// wins. Earlier, typically more specific, entries are tried first.
    pub fn lookup(&self, args: &[Value]) -> Option<(Arc<CacheEntry>, SymbolBindings)> {
        let entries = self.entries.read();
        for entry in entries.iter() {
            if let Some(bindings) = entry.guard().evaluate(args) {
                return Some((Arc::clone(entry), bindings));
            }
        }
        None
    }

    /// Serializes compilation for this site: at most one in-flight
    /// compile at a time. A thread that misses while another compiles
    /// blocks here, then re-probes the entries before compiling itself.
    pub(crate) fn lock_for_compile(&self) -> MutexGuard<'_, ()> {
        self.compile_lock.lock()
    }

    /// Append a freshly compiled entry and advance the state machine.
    /// Must be called with the compile lock held.
    pub(crate) fn publish(&self, entry: CacheEntry, widened: bool) -> SiteState {
        let entry_count = {
            let mut entries = self.entries.write();
            entries.push(Arc::new(entry));
            entries.len()
        };
        self.translate_count.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.write();
        *state = if entry_count > self.max_entries || *state == SiteState::Exploding {
            if entry_count > self.max_entries {
                self.explosion_count.fetch_add(1, Ordering::Relaxed);
                warn!(
                    site = %self.id,
                    entries = entry_count,
                    bound = self.max_entries,
                    "specialization explosion: per-site entry bound exceeded"
                );
            }
            SiteState::Exploding
        } else if widened {
            SiteState::Generalized
        } else if *state == SiteState::Cold {
            SiteState::Specialized
        } else {
            *state
        };
        *state
    }

    pub(crate) fn record_hit(&self) {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.miss_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn history(&self) -> MutexGuard<'_, FailureHistory> {
        self.history.lock()
    }

    /// Pin a position to permanent concrete specialization. Monotone:
    /// markers are never removed. Returns whether the marker is new.
    pub(crate) fn mark_breakgraph(&self, position: Position) -> bool {
        self.markers.lock().insert(position)
    }

    pub fn is_breakgraph_marked(&self, position: Position) -> bool {
        self.markers.lock().contains(&position)
    }

    pub(crate) fn markers_snapshot(&self) -> AHashSet<Position> {
        self.markers.lock().clone()
    }

    pub fn is_generalized(&self, position: Position) -> bool {
        self.generalized.lock().contains_key(&position)
    }

    pub(crate) fn record_generalized(&self, position: Position, symbol: SymbolId) {
        self.generalized.lock().insert(position, symbol);
    }

    /// Snapshot of the generalized positions, consulted whenever a guard
    /// is built so no later entry re-specializes a promoted position.
    pub(crate) fn generalized_snapshot(&self) -> AHashMap<Position, SymbolId> {
        self.generalized.lock().clone()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Guards of the published entries, in insertion order.
    pub fn guards(&self) -> Vec<Guard> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.guard().clone())
            .collect()
    }

    pub fn state(&self) -> SiteState {
        *self.state.read()
    }

    pub fn translate_count(&self) -> u64 {
        self.translate_count.load(Ordering::Relaxed)
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.miss_count.load(Ordering::Relaxed)
    }

    pub fn explosion_count(&self) -> u64 {
        self.explosion_count.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CallSiteStats {
        let mut generalized: Vec<String> = self
            .generalized
            .lock()
            .keys()
            .map(ToString::to_string)
            .collect();
        generalized.sort();
        let mut breakgraph: Vec<String> = self
            .markers
            .lock()
            .iter()
            .map(ToString::to_string)
            .collect();
        breakgraph.sort();
        CallSiteStats {
            site: self.id.as_str().to_string(),
            state: self.state(),
            entries: self.entry_count(),
            translate_count: self.translate_count(),
            hit_count: self.hit_count(),
            miss_count: self.miss_count(),
            explosion_count: self.explosion_count(),
            generalized,
            breakgraph,
        }
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("entries", &self.entry_count())
            .finish_non_exhaustive()
    }
}
