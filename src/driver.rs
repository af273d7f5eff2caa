use std::sync::Arc;

use tracing::debug;

use crate::backend::{Backend, CompiledGraph};
use crate::cache::entry::CacheEntry;
use crate::cache::registry::CacheRegistry;
use crate::cache::site::{CallSite, CallSiteId, CallSiteStats};
use crate::errors::TranslateError;
use crate::generalize::{GeneralizeDecision, Generalizer};
use crate::key::SpecializationKey;
use crate::symbol::SymbolBindings;
use crate::trace::Tracer;
use crate::value::Value;

/// How the driver satisfied one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateOutcome {
    /// An existing entry's guard held.
    Hit,
    /// A new fully concrete graph was compiled.
    Concrete,
    /// A widened graph was compiled, absorbing one dynamic axis.
    Generalized,
    /// Generalization was vetoed by a breakgraph marker; compiled
    /// concrete.
    Blocked,
}

/// Result of translating one call: the graph to execute plus the integers
/// bound to its symbolic guard atoms.
#[derive(Debug)]
pub struct Translation {
    pub graph: Arc<CompiledGraph>,
    pub bindings: SymbolBindings,
    pub outcome: TranslateOutcome,
}

/// Orchestrates lookup → guard check → generalize-or-compile for every
/// invocation of a traced region.
pub struct TranslatorDriver {
    registry: Arc<CacheRegistry>,
    tracer: Arc<dyn Tracer>,
    backend: Arc<dyn Backend>,
    generalizer: Generalizer,
}

impl TranslatorDriver {
    pub fn new(
        registry: Arc<CacheRegistry>,
        tracer: Arc<dyn Tracer>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        let generalizer = Generalizer::new(registry.config().allow_dynamic_dims);
        Self {
            registry,
            tracer,
            backend,
            generalizer,
        }
    }

    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    pub fn site_stats(&self, id: &CallSiteId) -> Option<CallSiteStats> {
        self.registry.site_stats(id)
    }

    /// Translate one invocation. Returns the compiled graph to execute;
    /// the only user-visible failure mode is a backend compile error.
    pub fn translate(
        &self,
        id: &CallSiteId,
        args: &[Value],
    ) -> Result<Translation, TranslateError> {
        let site = self.registry.site(id);

        if let Some(hit) = Self::probe(&site, args) {
            return Ok(hit);
        }

        // Serialize compilation per site. Whoever held the lock may have
        // published an entry that covers us; re-probe before compiling.
        let compile_guard = site.lock_for_compile();
        if let Some(hit) = Self::probe(&site, args) {
            drop(compile_guard);
            return Ok(hit);
        }
        site.record_miss();

        let region = self.tracer.trace(args);
        let key = SpecializationKey::derive(args, &region);
        let trace_signature = region.structural_signature();

        let decision = {
            let history = site.history();
            self.generalizer.on_miss(
                history.latest(),
                &key,
                &region,
                &site.markers_snapshot(),
                &site.generalized_snapshot(),
            )
        };

        let mut generalized = site.generalized_snapshot();
        let outcome = match decision {
            GeneralizeDecision::CompileConcrete => TranslateOutcome::Concrete,
            GeneralizeDecision::Blocked { .. } => TranslateOutcome::Blocked,
            GeneralizeDecision::CompileGeneralized { position, symbol } => {
                if site.is_breakgraph_marked(position) || generalized.contains_key(&position) {
                    return Err(TranslateError::InvalidGeneralization {
                        site: id.as_str().to_string(),
                        position,
                    });
                }
                generalized.insert(position, symbol);
                TranslateOutcome::Generalized
            }
        };

        let guard = key.to_guard(&generalized);
        debug!(site = %id, %key, ?outcome, "compiling traced region");
        let graph = self
            .backend
            .compile(&region, &guard)
            .map_err(|source| TranslateError::Compile {
                site: id.as_str().to_string(),
                source,
            })?;

        // Publish only after a successful compile; a backend failure
        // leaves the site exactly as it was.
        match decision {
            GeneralizeDecision::CompileGeneralized { position, symbol } => {
                site.record_generalized(position, symbol);
            }
            GeneralizeDecision::Blocked { position } => {
                site.mark_breakgraph(position);
            }
            GeneralizeDecision::CompileConcrete => {}
        }
        site.history().record(key, trace_signature);

        // The guard was built from these arguments, so it holds.
        let bindings = guard.evaluate(args).unwrap_or_default();
        let graph = Arc::new(graph);
        site.publish(
            CacheEntry::new(guard, Arc::clone(&graph)),
            outcome == TranslateOutcome::Generalized,
        );
        drop(compile_guard);

        Ok(Translation {
            graph,
            bindings,
            outcome,
        })
    }

    fn probe(site: &CallSite, args: &[Value]) -> Option<Translation> {
        let (entry, bindings) = site.lookup(args)?;
        site.record_hit();
        Some(Translation {
            graph: Arc::clone(entry.graph()),
            bindings,
            outcome: TranslateOutcome::Hit,
        })
    }
}
