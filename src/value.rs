use std::fmt;

/// Reshape wildcard: an inferred dimension. Never stored as a guard literal.
pub const INFERRED_DIM: i64 = -1;

/// Runtime kind of an argument value, checked by `TypeIs` guard atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ValueKind {
    Int,
    Float,
    Bool,
    Tensor,
    IntList,
}

/// A concrete argument value observed at call time. The cache only ever
/// inspects scalars, shapes, and integer lists; tensor storage stays with
/// the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Tensor(TensorMeta),
    IntList(Vec<i64>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Tensor(_) => ValueKind::Tensor,
            Value::IntList(_) => ValueKind::IntList,
        }
    }

    pub fn tensor(shape: Vec<i64>) -> Self {
        Value::Tensor(TensorMeta::new(shape))
    }
}

/// Shape metadata for a tensor argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorMeta {
    pub shape: Vec<i64>,
}

impl TensorMeta {
    pub fn new(shape: Vec<i64>) -> Self {
        Self { shape }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// A guardable location inside the argument tuple: a whole argument, one
/// axis of a tensor argument, or one element of a list argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub arg: usize,
    pub axis: Option<usize>,
}

impl Position {
    pub const fn arg(arg: usize) -> Self {
        Self { arg, axis: None }
    }

    pub const fn axis(arg: usize, axis: usize) -> Self {
        Self {
            arg,
            axis: Some(axis),
        }
    }

    /// Whether this position is the given one or the whole argument
    /// containing it.
    pub fn covers(&self, other: Position) -> bool {
        self.arg == other.arg && (self.axis.is_none() || self.axis == other.axis)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.axis {
            Some(axis) => write!(f, "arg{}[{}]", self.arg, axis),
            None => write!(f, "arg{}", self.arg),
        }
    }
}

/// Literal stored in a guard atom. Floats are kept as bit patterns so
/// equality is exact, never tolerance-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    FloatBits(u64),
    Bool(bool),
}

impl Literal {
    pub fn as_int(self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::FloatBits(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Literal::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Extract the literal at a position, if the argument tuple has one there.
pub fn literal_at(args: &[Value], position: Position) -> Option<Literal> {
    let value = args.get(position.arg)?;
    match (value, position.axis) {
        (Value::Tensor(meta), Some(axis)) => meta.shape.get(axis).copied().map(Literal::Int),
        (Value::IntList(items), Some(index)) => items.get(index).copied().map(Literal::Int),
        (Value::Int(v), None) => Some(Literal::Int(*v)),
        (Value::Float(v), None) => Some(Literal::FloatBits(v.to_bits())),
        (Value::Bool(v), None) => Some(Literal::Bool(*v)),
        _ => None,
    }
}

/// Runtime kind of the argument at `arg`, if present.
pub fn kind_at(args: &[Value], arg: usize) -> Option<ValueKind> {
    args.get(arg).map(Value::kind)
}
