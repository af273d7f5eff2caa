use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::CompileError;
use crate::guard::Guard;
use crate::trace::TracedRegion;

static NEXT_GRAPH: AtomicU64 = AtomicU64::new(0);

/// Opaque artifact produced by the backend for one guard. The cache never
/// looks inside; it only stores and hands back the handle.
#[derive(Debug)]
pub struct CompiledGraph {
    id: u64,
    label: String,
}

impl CompiledGraph {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: NEXT_GRAPH.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Compilation backend; lowers a traced region under a guard into an
/// executable graph. Symbolic atoms in the guard become runtime-checked
/// symbolic parameters of the graph.
pub trait Backend: Send + Sync {
    fn compile(&self, region: &TracedRegion, guard: &Guard) -> Result<CompiledGraph, CompileError>;
}
