//! Tensor shape descriptor.

use std::fmt;

/// N-dimensional tensor shape.
///
/// Immutable once created; a value's shape is fixed at the builder call
/// that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    pub fn from_slice(dims: &[usize]) -> Self {
        Self { dims: dims.to_vec() }
    }

    /// Rank-0 scalar shape.
    pub fn scalar() -> Self {
        Self { dims: Vec::new() }
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of elements. The empty (scalar) shape has one.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }
}

impl std::ops::Index<usize> for Shape {
    type Output = usize;
    fn index(&self, i: usize) -> &usize {
        &self.dims[i]
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_basics() {
        let s = Shape::from_slice(&[1, 3, 224, 224]);
        assert_eq!(s.ndim(), 4);
        assert_eq!(s.numel(), 150_528);
        assert_eq!(s[1], 3);
    }

    #[test]
    fn scalar_numel_is_one() {
        assert_eq!(Shape::scalar().numel(), 1);
    }

    #[test]
    fn zero_dim_numel_is_zero() {
        assert_eq!(Shape::from_slice(&[4, 0, 2]).numel(), 0);
    }

    #[test]
    fn display() {
        assert_eq!(Shape::from_slice(&[2, 3]).to_string(), "[2, 3]");
        assert_eq!(Shape::scalar().to_string(), "[]");
    }
}
