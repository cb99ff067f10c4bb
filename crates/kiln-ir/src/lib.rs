//! kiln-ir — dataflow graph IR for the kiln tensor compiler.
//!
//! A graph is an arena of [`Value`]s (tensor-shaped results) and
//! [`Node`]s (operator applications) addressed by stable integer ids.
//! The builder API infers and validates output shapes eagerly, so a
//! successfully built graph is always a DAG in which creation order is
//! a valid topological order.
//!
//! # Example
//!
//! ```
//! use kiln_ir::{Graph, Shape};
//!
//! let mut g = Graph::new();
//! let x = g.add_input(Shape::from_slice(&[1, 3, 224, 224]));
//! let conv = g.add_conv2d(x, 64, 3, 1, 1)?;
//! let relu = g.add_relu(conv);
//! g.add_output(relu);
//! assert_eq!(g.value(conv).unwrap().shape().dims(), &[1, 64, 224, 224]);
//! # Ok::<(), kiln_ir::GraphError>(())
//! ```

mod error;
mod graph;
mod node;
mod shape;

pub use error::GraphError;
pub use graph::{Graph, Value};
pub use node::{Node, NodeId, OpKind, ValueId};
pub use shape::Shape;
