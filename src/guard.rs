use std::fmt;

use crate::symbol::{SymbolBindings, SymbolId};
use crate::value::{Literal, Position, Value, ValueKind, kind_at, literal_at};

/// One atomic condition over an argument position. The variant set is
/// closed; the evaluator matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardAtom {
    /// Argument has the given runtime kind.
    TypeIs { position: Position, kind: ValueKind },
    /// Scalar or list-element equality, exact (floats by bit pattern).
    ValueEq { position: Position, literal: Literal },
    /// One tensor axis has the given extent.
    DimEq { position: Position, extent: i64 },
    /// Always satisfied; binds the observed integer to `symbol`.
    SymbolicDim { position: Position, symbol: SymbolId },
}

impl GuardAtom {
    pub fn position(&self) -> Position {
        match self {
            GuardAtom::TypeIs { position, .. }
            | GuardAtom::ValueEq { position, .. }
            | GuardAtom::DimEq { position, .. }
            | GuardAtom::SymbolicDim { position, .. } => *position,
        }
    }

    /// Evaluation order: cheap checks first so a mismatch fails fast.
    fn cost(&self) -> u8 {
        match self {
            GuardAtom::TypeIs { .. } => 0,
            GuardAtom::DimEq { .. } => 1,
            GuardAtom::ValueEq { .. } => 2,
            GuardAtom::SymbolicDim { .. } => 3,
        }
    }

    /// Check this atom against a concrete argument tuple. Pure apart from
    /// the symbol binding a `SymbolicDim` records.
    pub fn evaluate(&self, args: &[Value], bindings: &mut SymbolBindings) -> bool {
        match self {
            GuardAtom::TypeIs { position, kind } => kind_at(args, position.arg) == Some(*kind),
            GuardAtom::ValueEq { position, literal } => {
                literal_at(args, *position) == Some(*literal)
            }
            GuardAtom::DimEq { position, extent } => {
                literal_at(args, *position) == Some(Literal::Int(*extent))
            }
            GuardAtom::SymbolicDim { position, symbol } => {
                match literal_at(args, *position).and_then(Literal::as_int) {
                    Some(observed) => {
                        bindings.bind(*symbol, observed);
                        true
                    }
                    // Malformed argument tuple; the type atom for this
                    // argument will have rejected it already.
                    None => false,
                }
            }
        }
    }
}

impl fmt::Display for GuardAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardAtom::TypeIs { position, kind } => write!(f, "{position} is {kind:?}"),
            GuardAtom::ValueEq { position, literal } => write!(f, "{position} == {literal}"),
            GuardAtom::DimEq { position, extent } => write!(f, "{position} == {extent}"),
            GuardAtom::SymbolicDim { position, symbol } => write!(f, "{position} ~ {symbol}"),
        }
    }
}

/// Conjunction of atoms gating reuse of one compiled graph. Evaluation is
/// a pure function of the argument tuple; it short-circuits on the first
/// failing atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    atoms: Vec<GuardAtom>,
}

impl Guard {
    pub fn new(mut atoms: Vec<GuardAtom>) -> Self {
        atoms.sort_by_key(|atom| (atom.cost(), atom.position()));
        Self { atoms }
    }

    pub fn atoms(&self) -> &[GuardAtom] {
        &self.atoms
    }

    /// Evaluate against a concrete argument tuple. `Some` carries the
    /// integers bound by symbolic atoms; `None` is a guard mismatch.
    pub fn evaluate(&self, args: &[Value]) -> Option<SymbolBindings> {
        let mut bindings = SymbolBindings::new();
        for atom in &self.atoms {
            if !atom.evaluate(args, &mut bindings) {
                return None;
            }
        }
        Some(bindings)
    }

    pub fn is_symbolic(&self) -> bool {
        self.atoms
            .iter()
            .any(|atom| matches!(atom, GuardAtom::SymbolicDim { .. }))
    }

    /// Positions bound to a symbol by this guard.
    pub fn symbolic_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.atoms.iter().filter_map(|atom| match atom {
            GuardAtom::SymbolicDim { position, .. } => Some(*position),
            _ => None,
        })
    }

    /// Literal-valued positions of this guard (everything except symbols
    /// and type checks).
    pub fn literal_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.atoms.iter().filter_map(|atom| match atom {
            GuardAtom::ValueEq { position, .. } | GuardAtom::DimEq { position, .. } => {
                Some(*position)
            }
            _ => None,
        })
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for atom in &self.atoms {
            if !first {
                write!(f, " && ")?;
            }
            write!(f, "{atom}")?;
            first = false;
        }
        Ok(())
    }
}
