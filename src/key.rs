use std::fmt;
use std::hash::{Hash, Hasher};

use ahash::{AHashMap, AHasher};

use crate::guard::{Guard, GuardAtom};
use crate::symbol::SymbolId;
use crate::trace::TracedRegion;
use crate::value::{INFERRED_DIM, Literal, Position, Value, ValueKind};

/// One facet recorded for a key position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAtom {
    Kind(ValueKind),
    Dim(i64),
    Value(Literal),
}

/// Canonical per-call summary of the argument values, shapes, and types
/// the traced region actually read. Positions never read by the trace are
/// omitted, so unread inputs cannot force a recompile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecializationKey {
    atoms: Vec<(Position, KeyAtom)>,
}

impl SpecializationKey {
    /// Derive the key for one invocation: one kind atom per read
    /// argument, plus dim atoms for tensor axes, value atoms for scalars,
    /// and per-element value atoms for integer lists. The `-1` inferred
    /// dimension marker is never recorded as a literal.
    pub fn derive(args: &[Value], region: &TracedRegion) -> Self {
        let mut atoms = Vec::new();
        for read in &region.reads {
            let Some(value) = args.get(read.arg) else {
                continue;
            };
            let whole = Position::arg(read.arg);
            atoms.push((whole, KeyAtom::Kind(value.kind())));
            match value {
                Value::Int(v) => atoms.push((whole, KeyAtom::Value(Literal::Int(*v)))),
                Value::Float(v) => {
                    atoms.push((whole, KeyAtom::Value(Literal::FloatBits(v.to_bits()))));
                }
                Value::Bool(v) => atoms.push((whole, KeyAtom::Value(Literal::Bool(*v)))),
                Value::Tensor(meta) => {
                    for (axis, &extent) in meta.shape.iter().enumerate() {
                        if extent != INFERRED_DIM {
                            atoms.push((Position::axis(read.arg, axis), KeyAtom::Dim(extent)));
                        }
                    }
                }
                Value::IntList(items) => {
                    for (index, &item) in items.iter().enumerate() {
                        if item != INFERRED_DIM {
                            atoms.push((
                                Position::axis(read.arg, index),
                                KeyAtom::Value(Literal::Int(item)),
                            ));
                        }
                    }
                }
            }
        }
        atoms.sort_by_key(|&(position, _)| position);
        Self { atoms }
    }

    pub fn atoms(&self) -> &[(Position, KeyAtom)] {
        &self.atoms
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    fn atoms_at(&self, position: Position) -> impl Iterator<Item = KeyAtom> + '_ {
        self.atoms
            .iter()
            .filter(move |&&(p, _)| p == position)
            .map(|&(_, atom)| atom)
    }

    fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.atoms.iter().map(|&(position, _)| position)
    }

    /// Positions whose recorded facets differ between the two keys.
    /// A position present on only one side also counts as differing.
    pub fn diff(&self, other: &Self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.positions().chain(other.positions()).collect();
        positions.sort_unstable();
        positions.dedup();
        positions
            .into_iter()
            .filter(|&position| {
                let mine: Vec<KeyAtom> = self.atoms_at(position).collect();
                let theirs: Vec<KeyAtom> = other.atoms_at(position).collect();
                mine != theirs
            })
            .collect()
    }

    /// Whether the two keys diverge at `position` by exactly one
    /// integer-valued facet (a dim extent, or an integer scalar/element).
    /// Only such divergences are candidates for generalization.
    pub fn int_divergence(&self, other: &Self, position: Position) -> bool {
        let mine: Vec<KeyAtom> = self.atoms_at(position).collect();
        let theirs: Vec<KeyAtom> = other.atoms_at(position).collect();
        if mine.len() != theirs.len() {
            return false;
        }
        let mut differing = mine
            .iter()
            .zip(theirs.iter())
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (*a, *b));
        match (differing.next(), differing.next()) {
            (Some(pair), None) => matches!(
                pair,
                (KeyAtom::Dim(_), KeyAtom::Dim(_))
                    | (
                        KeyAtom::Value(Literal::Int(_)),
                        KeyAtom::Value(Literal::Int(_))
                    )
            ),
            _ => false,
        }
    }

    /// Lower the key into a guard. Positions in `generalized` keep their
    /// symbolic atom instead of a literal one; generalization is monotone
    /// per position, so a concrete compile after a promotion still emits
    /// the symbol there.
    pub fn to_guard(&self, generalized: &AHashMap<Position, SymbolId>) -> Guard {
        let atoms = self
            .atoms
            .iter()
            .map(|&(position, atom)| match atom {
                KeyAtom::Kind(kind) => GuardAtom::TypeIs { position, kind },
                KeyAtom::Dim(extent) => match generalized.get(&position) {
                    Some(&symbol) => GuardAtom::SymbolicDim { position, symbol },
                    None => GuardAtom::DimEq { position, extent },
                },
                KeyAtom::Value(literal) => {
                    match (generalized.get(&position), literal) {
                        (Some(&symbol), Literal::Int(_)) => {
                            GuardAtom::SymbolicDim { position, symbol }
                        }
                        _ => GuardAtom::ValueEq { position, literal },
                    }
                }
            })
            .collect();
        Guard::new(atoms)
    }

    /// Stable hash of the key, for logs and diagnostics.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = AHasher::default();
        self.atoms.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Display for SpecializationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key#{:016x}", self.fingerprint())
    }
}
