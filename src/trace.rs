use std::hash::{Hash, Hasher};

use ahash::AHasher;

use crate::value::{Position, Value};

/// One instruction recorded by the external tracer while walking the
/// host program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceInst {
    pub op: String,
    pub operands: Vec<Operand>,
}

impl TraceInst {
    pub fn new(op: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            op: op.into(),
            operands,
        }
    }
}

/// Operand of a traced instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Reads an argument position.
    Input(Position),
    /// Constant baked into the trace at record time.
    Const(i64),
    /// Reads a position through an operation that only accepts concrete
    /// literals. Such a position can never be symbolized.
    ConcreteInput(Position),
}

/// What the tracer observed about one argument position it read.
#[derive(Debug, Clone, Copy)]
pub struct ArgRead {
    pub arg: usize,
    /// The value at this argument influenced which instructions were
    /// recorded (branch taken, loop bound, host-side shape construction).
    pub control_flow: bool,
}

impl ArgRead {
    pub fn new(arg: usize) -> Self {
        Self {
            arg,
            control_flow: false,
        }
    }

    pub fn control_flow(arg: usize) -> Self {
        Self {
            arg,
            control_flow: true,
        }
    }
}

/// Instruction sequence plus per-position read annotations, as handed
/// over by the tracer for one invocation.
#[derive(Debug, Clone)]
pub struct TracedRegion {
    pub instructions: Vec<TraceInst>,
    pub reads: Vec<ArgRead>,
}

impl TracedRegion {
    pub fn new(instructions: Vec<TraceInst>, reads: Vec<ArgRead>) -> Self {
        Self {
            instructions,
            reads,
        }
    }

    /// Hash of the instruction structure: op names and operand shapes,
    /// ignoring baked constant values. Two traces that differ only in a
    /// literal operand share a signature; two traces that took different
    /// branches do not.
    pub fn structural_signature(&self) -> u64 {
        let mut hasher = AHasher::default();
        self.instructions.len().hash(&mut hasher);
        for inst in &self.instructions {
            inst.op.hash(&mut hasher);
            inst.operands.len().hash(&mut hasher);
            for operand in &inst.operands {
                match operand {
                    Operand::Input(position) => {
                        0u8.hash(&mut hasher);
                        position.hash(&mut hasher);
                    }
                    Operand::Const(_) => 1u8.hash(&mut hasher),
                    Operand::ConcreteInput(position) => {
                        2u8.hash(&mut hasher);
                        position.hash(&mut hasher);
                    }
                }
            }
        }
        hasher.finish()
    }

    pub fn read(&self, arg: usize) -> Option<&ArgRead> {
        self.reads.iter().find(|read| read.arg == arg)
    }
}

/// Instruction-level tracer; external collaborator that walks a traceable
/// region of the host program under concrete arguments.
pub trait Tracer: Send + Sync {
    fn trace(&self, args: &[Value]) -> TracedRegion;
}
