use std::sync::Arc;

use crate::backend::CompiledGraph;
use crate::guard::Guard;

/// One guard → compiled-graph pairing. Entries are immutable once
/// published; generalization appends a widened entry instead of editing
/// an existing one in place.
#[derive(Debug)]
pub struct CacheEntry {
    guard: Guard,
    graph: Arc<CompiledGraph>,
}

impl CacheEntry {
    pub fn new(guard: Guard, graph: Arc<CompiledGraph>) -> Self {
        Self { guard, graph }
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn graph(&self) -> &Arc<CompiledGraph> {
        &self.graph
    }
}
