use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use tracing::debug;

use crate::breakgraph::{Symbolizability, classify};
use crate::key::SpecializationKey;
use crate::symbol::SymbolId;
use crate::trace::TracedRegion;
use crate::value::Position;

/// What to do about a cache miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralizeDecision {
    /// First miss at the site, or the divergence pattern is not the
    /// single-position kind generalization handles.
    CompileConcrete,
    /// Exactly one integer position diverged across two consecutive
    /// misses with an identical trace structure. Widen it.
    CompileGeneralized {
        position: Position,
        symbol: SymbolId,
    },
    /// The diverging position is pinned concrete by a breakgraph marker
    /// (pre-existing, or discovered on this miss).
    Blocked { position: Position },
}

/// One recorded guard miss: the key it produced and the structural
/// signature of the trace it came from.
#[derive(Debug, Clone)]
pub struct MissRecord {
    pub key: SpecializationKey,
    pub trace_signature: u64,
}

/// Bounded record of the most recent guard-miss keys for one call site.
/// The generalizer only consults the latest record; the rest is kept for
/// diagnostics without unbounded growth.
#[derive(Debug)]
pub struct FailureHistory {
    records: VecDeque<MissRecord>,
    capacity: usize,
}

impl FailureHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn latest(&self) -> Option<&MissRecord> {
        self.records.back()
    }

    pub fn record(&mut self, key: SpecializationKey, trace_signature: u64) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(MissRecord {
            key,
            trace_signature,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Decides, per miss, between concrete compilation and promoting one
/// position to a dynamic axis symbol.
#[derive(Debug, Clone, Copy)]
pub struct Generalizer {
    allow_dynamic_dims: bool,
}

impl Generalizer {
    pub fn new(allow_dynamic_dims: bool) -> Self {
        Self { allow_dynamic_dims }
    }

    /// Inspect a new miss against the most recent one. Promotes only when
    /// exactly one position differs, both traces share a structural
    /// signature, the differing facet is integer-valued, and the position
    /// is neither breakgraph-marked nor already generalized.
    ///
    /// A structural signature mismatch paired with a single differing
    /// position means the varying value selected a different instruction
    /// sequence; no single symbolic graph can represent both, so the
    /// position is reported as blocked and the caller pins it.
    pub fn on_miss(
        &self,
        previous: Option<&MissRecord>,
        key: &SpecializationKey,
        region: &TracedRegion,
        markers: &AHashSet<Position>,
        generalized: &AHashMap<Position, SymbolId>,
    ) -> GeneralizeDecision {
        if !self.allow_dynamic_dims {
            return GeneralizeDecision::CompileConcrete;
        }
        let Some(previous) = previous else {
            return GeneralizeDecision::CompileConcrete;
        };
        let diff = previous.key.diff(key);
        let &[position] = diff.as_slice() else {
            debug!(differing = diff.len(), "divergence spans multiple positions");
            return GeneralizeDecision::CompileConcrete;
        };
        if markers.contains(&position) {
            return GeneralizeDecision::Blocked { position };
        }
        if previous.trace_signature != region.structural_signature() {
            debug!(%position, "trace structure diverged; pinning position");
            return GeneralizeDecision::Blocked { position };
        }
        if classify(region, position) == Symbolizability::NonSymbolizable {
            debug!(%position, "position is non-symbolizable; pinning");
            return GeneralizeDecision::Blocked { position };
        }
        if generalized.contains_key(&position) {
            // A symbolic atom matches every integer, so a miss cannot
            // diverge at an already generalized position unless its type
            // changed; never promote twice.
            return GeneralizeDecision::CompileConcrete;
        }
        if !previous.key.int_divergence(key, position) {
            return GeneralizeDecision::CompileConcrete;
        }
        let symbol = SymbolId::fresh();
        debug!(%position, %symbol, "promoting position to dynamic axis");
        GeneralizeDecision::CompileGeneralized { position, symbol }
    }
}
