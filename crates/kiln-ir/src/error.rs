//! Error types for graph construction.

use std::fmt;

use crate::shape::Shape;

/// Errors raised by the graph builder.
///
/// Detected eagerly at the builder call that would produce the invalid
/// shape or attribute; nothing is inserted into the graph on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Operand has the wrong rank for the operator.
    RankMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },
    /// MatMul inner dimensions disagree.
    InnerDimMismatch { lhs: Shape, rhs: Shape },
    /// Elementwise operands must have identical shapes.
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },
    /// Computed spatial output dimension is not positive.
    EmptySpatial { op: &'static str, dim: i64 },
    /// Missing or non-positive required attribute.
    InvalidAttribute { name: &'static str, value: i64 },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RankMismatch { op, expected, got } => {
                write!(f, "{op}: expected rank-{expected} operand, got rank {got}")
            }
            Self::InnerDimMismatch { lhs, rhs } => {
                write!(f, "MatMul: inner dimensions of {lhs} and {rhs} do not agree")
            }
            Self::ShapeMismatch { op, lhs, rhs } => {
                write!(f, "{op}: operand shapes {lhs} and {rhs} differ")
            }
            Self::EmptySpatial { op, dim } => {
                write!(f, "{op}: computed output spatial size {dim} is not positive")
            }
            Self::InvalidAttribute { name, value } => {
                write!(f, "attribute {name} must be positive, got {value}")
            }
        }
    }
}

impl std::error::Error for GraphError {}
