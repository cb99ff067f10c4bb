//! Graph optimization passes for the kiln tensor compiler.
//!
//! Builds on [`kiln_ir`] to rewrite computation graphs before lowering:
//!
//! - **Operator fusion** — collapse Conv2D→ReLU and MatMul→Add chains
//!   into fused kinds, halving their memory traffic after codegen
//! - **Dead code elimination** — drop nodes unreachable from any output
//! - **Memory layout annotation** — attach buffer locality hints
//!
//! Passes run through an [`Optimizer`], each exactly once, in order:
//!
//! ```
//! use kiln_compile::{DeadCodeEliminationPass, FusionPass, MemoryLayoutPass, Optimizer};
//! use kiln_ir::{Graph, Shape};
//!
//! let mut g = Graph::new();
//! let x = g.add_input(Shape::from_slice(&[1, 3, 224, 224]));
//! let c = g.add_conv2d(x, 64, 3, 1, 1).unwrap();
//! let r = g.add_relu(c);
//! g.add_output(r);
//!
//! let mut opt = Optimizer::new();
//! opt.add_pass(FusionPass);
//! opt.add_pass(DeadCodeEliminationPass);
//! opt.add_pass(MemoryLayoutPass);
//! let reports = opt.run(&mut g);
//! assert!(reports[0].modified);
//! ```

mod fusion;
mod passes;

pub use fusion::FusionPass;
pub use passes::{
    DeadCodeEliminationPass, LayoutHint, MemoryLayoutPass, Optimizer, Pass, PassReport,
    LAYOUT_ATTR,
};
