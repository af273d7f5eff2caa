#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tracejit::{
    ArgRead, Backend, CacheConfig, CacheRegistry, CompileError, CompiledGraph, Guard, Operand,
    Position, TraceInst, TracedRegion, Tracer, TranslatorDriver, Value,
};

static TRACING_INIT: Once = Once::new();

/// Route the crate's `debug!`/`warn!` instrumentation to stderr when
/// `RUST_LOG` asks for it.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Backend stub: counts compiles, optionally sleeps (to widen race
/// windows) or fails on demand.
pub struct CountingBackend {
    compiles: AtomicU64,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self {
            compiles: AtomicU64::new(0),
            fail: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn compile_count(&self) -> u64 {
        self.compiles.load(Ordering::Relaxed)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Relaxed);
    }
}

impl Backend for CountingBackend {
    fn compile(&self, _region: &TracedRegion, guard: &Guard) -> Result<CompiledGraph, CompileError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(CompileError::new("lowering rejected by stub backend"));
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.compiles.fetch_add(1, Ordering::Relaxed);
        Ok(CompiledGraph::new(format!("graph[{guard}]")))
    }
}

/// Tracer built from a closure.
pub struct FnTracer<F>(pub F);

impl<F> Tracer for FnTracer<F>
where
    F: Fn(&[Value]) -> TracedRegion + Send + Sync,
{
    fn trace(&self, args: &[Value]) -> TracedRegion {
        (self.0)(args)
    }
}

/// `reshape(x, [n, -1])` followed by elementwise math; the integer `n`
/// never steers control flow and feeds a symbolizable operand.
pub fn reshape_tracer() -> FnTracer<impl Fn(&[Value]) -> TracedRegion + Send + Sync> {
    FnTracer(|_args: &[Value]| {
        TracedRegion::new(
            vec![
                TraceInst::new(
                    "reshape",
                    vec![
                        Operand::Input(Position::arg(0)),
                        Operand::Input(Position::arg(1)),
                        Operand::Const(-1),
                    ],
                ),
                TraceInst::new(
                    "add",
                    vec![Operand::Input(Position::arg(0)), Operand::Input(Position::arg(1))],
                ),
                TraceInst::new("mul", vec![Operand::Const(2)]),
            ],
            vec![ArgRead::new(0), ArgRead::new(1)],
        )
    })
}

/// Reads `x.shape[0]` and uses it arithmetically; only the tensor is read.
pub fn shape_read_tracer() -> FnTracer<impl Fn(&[Value]) -> TracedRegion + Send + Sync> {
    FnTracer(|_args: &[Value]| {
        TracedRegion::new(
            vec![
                TraceInst::new("shape_of", vec![Operand::Input(Position::arg(0))]),
                TraceInst::new("add", vec![Operand::Input(Position::arg(0))]),
            ],
            vec![ArgRead::new(0)],
        )
    })
}

/// Early-returns when `n < 4`; the scalar both varies and selects the
/// branch, so the recorded instruction sequence depends on it.
pub fn branch_tracer() -> FnTracer<impl Fn(&[Value]) -> TracedRegion + Send + Sync> {
    FnTracer(|args: &[Value]| {
        let n = match args.get(1) {
            Some(Value::Int(n)) => *n,
            _ => 0,
        };
        let instructions = if n < 4 {
            vec![TraceInst::new("const_return", vec![Operand::Const(1)])]
        } else {
            vec![
                TraceInst::new(
                    "reshape",
                    vec![
                        Operand::Input(Position::arg(0)),
                        Operand::Input(Position::arg(1)),
                        Operand::Const(-1),
                    ],
                ),
                TraceInst::new("add", vec![Operand::Input(Position::arg(0))]),
            ]
        };
        TracedRegion::new(instructions, vec![ArgRead::new(0), ArgRead::control_flow(1)])
    })
}

/// Pads with width `n`; padding only accepts a concrete literal, so the
/// tracer records the read through a concrete-only operand.
pub fn pad_tracer() -> FnTracer<impl Fn(&[Value]) -> TracedRegion + Send + Sync> {
    FnTracer(|_args: &[Value]| {
        TracedRegion::new(
            vec![TraceInst::new(
                "pad",
                vec![
                    Operand::Input(Position::arg(0)),
                    Operand::ConcreteInput(Position::arg(1)),
                ],
            )],
            vec![ArgRead::new(0), ArgRead::new(1)],
        )
    })
}

pub fn driver_with<T>(tracer: T) -> (TranslatorDriver, Arc<CountingBackend>, Arc<CacheRegistry>)
where
    T: Tracer + 'static,
{
    driver_with_config(tracer, CacheConfig::default())
}

pub fn driver_with_config<T>(
    tracer: T,
    config: CacheConfig,
) -> (TranslatorDriver, Arc<CountingBackend>, Arc<CacheRegistry>)
where
    T: Tracer + 'static,
{
    driver_with_backend(tracer, CountingBackend::new(), config)
}

pub fn driver_with_backend<T>(
    tracer: T,
    backend: CountingBackend,
    config: CacheConfig,
) -> (TranslatorDriver, Arc<CountingBackend>, Arc<CacheRegistry>)
where
    T: Tracer + 'static,
{
    init_tracing();
    let registry = Arc::new(CacheRegistry::new(config));
    let backend = Arc::new(backend);
    let driver = TranslatorDriver::new(
        Arc::clone(&registry),
        Arc::new(tracer),
        Arc::clone(&backend) as Arc<dyn Backend>,
    );
    (driver, backend, registry)
}
