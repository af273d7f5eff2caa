use crate::trace::{Operand, TracedRegion};
use crate::value::Position;

/// Whether an argument position can be replaced by a symbolic parameter
/// in a compiled graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbolizability {
    Symbolizable,
    NonSymbolizable,
}

/// Classify one position of a traced region. Non-symbolizable when the
/// tracer flagged the argument as control-flow influencing, or when the
/// position feeds an operand that only accepts concrete literals.
///
/// Classification is per trace; permanence is the call site's job: once a
/// site records a breakgraph marker for a position, the marker is never
/// removed.
pub fn classify(region: &TracedRegion, position: Position) -> Symbolizability {
    if region
        .read(position.arg)
        .is_some_and(|read| read.control_flow)
    {
        return Symbolizability::NonSymbolizable;
    }
    let pinned = region.instructions.iter().any(|inst| {
        inst.operands.iter().any(|operand| match operand {
            Operand::ConcreteInput(p) => p.covers(position),
            Operand::Input(_) | Operand::Const(_) => false,
        })
    });
    if pinned {
        Symbolizability::NonSymbolizable
    } else {
        Symbolizability::Symbolizable
    }
}
