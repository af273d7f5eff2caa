//! Specialization cache for a tracing JIT compiler.
//!
//! Each invocation of a traced region either reuses an already-compiled
//! graph whose guard still holds, compiles a new concrete graph, or
//! promotes a diverging dimension/scalar to a dynamic axis symbol so one
//! widened graph serves every future value on that axis.

pub mod backend;
pub mod breakgraph;
pub mod cache;
pub mod driver;
pub mod errors;
pub mod generalize;
pub mod guard;
pub mod key;
pub mod symbol;
pub mod trace;
pub mod value;

pub use backend::{Backend, CompiledGraph};
pub use cache::{
    CacheConfig, CacheEntry, CacheRegistry, CallSite, CallSiteId, CallSiteStats, SiteState, global,
};
pub use driver::{TranslateOutcome, Translation, TranslatorDriver};
pub use errors::{CompileError, TranslateError};
pub use generalize::{FailureHistory, GeneralizeDecision, Generalizer, MissRecord};
pub use guard::{Guard, GuardAtom};
pub use key::{KeyAtom, SpecializationKey};
pub use symbol::{SymbolBindings, SymbolId};
pub use trace::{ArgRead, Operand, TraceInst, TracedRegion, Tracer};
pub use value::{INFERRED_DIM, Literal, Position, TensorMeta, Value, ValueKind};
