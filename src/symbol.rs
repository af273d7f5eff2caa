use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(0);

/// Process-unique identifier for a generalized dimension or scalar.
/// Compiled graphs reference symbols instead of literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u64);

impl SymbolId {
    /// Allocate the next symbol. Never reused within a process.
    pub fn fresh() -> Self {
        Self(NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Concrete integers observed for each symbolic guard atom during one
/// evaluation. Handed to the compiled graph at execution time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolBindings {
    map: AHashMap<SymbolId, i64>,
}

impl SymbolBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, symbol: SymbolId, value: i64) {
        self.map.insert(symbol, value);
    }

    pub fn get(&self, symbol: SymbolId) -> Option<i64> {
        self.map.get(&symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, i64)> + '_ {
        self.map.iter().map(|(&symbol, &value)| (symbol, value))
    }
}
