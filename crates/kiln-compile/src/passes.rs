//! Pass infrastructure, dead code elimination, and layout annotation.

use std::collections::HashSet;

use kiln_ir::{Graph, NodeId, OpKind};
use tracing::debug;

/// A single rewrite pass over a computation graph.
pub trait Pass {
    /// Name of this pass (for diagnostics).
    fn name(&self) -> &str;

    /// Run the pass against the graph. Returns whether it modified
    /// anything.
    fn run(&mut self, graph: &mut Graph) -> bool;
}

/// Outcome of one pass execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    pub name: String,
    pub modified: bool,
}

/// Runs an ordered list of passes, each exactly once.
///
/// There is no fixed-point iteration; a caller wanting to re-run a pass
/// registers it again.
pub struct Optimizer {
    passes: Vec<Box<dyn Pass>>,
}

impl Optimizer {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Register a pass at the end of the pipeline.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes in registration order against the same graph.
    pub fn run(&mut self, graph: &mut Graph) -> Vec<PassReport> {
        let mut reports = Vec::with_capacity(self.passes.len());
        for pass in &mut self.passes {
            let modified = pass.run(graph);
            debug!(pass = pass.name(), modified, "pass finished");
            reports.push(PassReport {
                name: pass.name().to_string(),
                modified,
            });
        }
        reports
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes non-terminal nodes not reachable backward from any Output.
///
/// Input and Output nodes are never removed. Removal drops the dead
/// nodes' produced values with them; live edges are untouched because
/// anything consumed by a live node is itself live.
pub struct DeadCodeEliminationPass;

impl Pass for DeadCodeEliminationPass {
    fn name(&self) -> &str {
        "DeadCodeEliminationPass"
    }

    fn run(&mut self, graph: &mut Graph) -> bool {
        let mut live: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<NodeId> = graph
            .nodes()
            .filter(|n| n.kind() == OpKind::Output)
            .map(|n| n.id())
            .collect();

        while let Some(id) = stack.pop() {
            if !live.insert(id) {
                continue;
            }
            let inputs: Vec<_> = graph
                .node(id)
                .map(|n| n.inputs().to_vec())
                .unwrap_or_default();
            for input in inputs {
                if let Some(producer) = graph.producer(input) {
                    stack.push(producer);
                }
            }
        }

        let dead: Vec<NodeId> = graph
            .nodes()
            .filter(|n| !n.kind().is_terminal() && !live.contains(&n.id()))
            .map(|n| n.id())
            .collect();
        for &id in &dead {
            debug!(node = %id, "removing dead node");
            graph.remove_node(id);
        }
        !dead.is_empty()
    }
}

/// Buffer locality strategy hint attached by [`MemoryLayoutPass`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutHint {
    /// Row-major streaming access, for elementwise ops.
    Streaming,
    /// Spatial tiling, for convolution-shaped ops.
    Tiled,
    /// Cache-blocked panels, for matrix multiplies.
    Blocked,
}

impl LayoutHint {
    /// Integer encoding stored in the node attribute map.
    pub fn code(self) -> i64 {
        match self {
            Self::Streaming => 0,
            Self::Tiled => 1,
            Self::Blocked => 2,
        }
    }

    fn for_kind(kind: OpKind) -> Self {
        match kind {
            OpKind::Conv2d | OpKind::FusedConvRelu | OpKind::MaxPool => Self::Tiled,
            OpKind::MatMul | OpKind::FusedMatMulAdd => Self::Blocked,
            _ => Self::Streaming,
        }
    }
}

/// Attribute key under which the layout hint is stored.
pub const LAYOUT_ATTR: &str = "layout";

/// Annotates every non-terminal node with a buffer locality hint.
///
/// Pure annotation: topology and operator kinds are untouched. The
/// heuristic picks the strategy from the operator kind alone. Reports
/// modified iff any node gained or changed its hint, so a second run
/// over an unchanged graph reports no modification.
pub struct MemoryLayoutPass;

impl Pass for MemoryLayoutPass {
    fn name(&self) -> &str {
        "MemoryLayoutPass"
    }

    fn run(&mut self, graph: &mut Graph) -> bool {
        let targets: Vec<(NodeId, i64)> = graph
            .nodes()
            .filter(|n| !n.kind().is_terminal())
            .map(|n| (n.id(), LayoutHint::for_kind(n.kind()).code()))
            .collect();

        let mut modified = false;
        for (id, hint) in targets {
            if let Some(node) = graph.node_mut(id) {
                if node.attr(LAYOUT_ATTR, -1) != hint {
                    node.set_attr(LAYOUT_ATTR, hint);
                    modified = true;
                }
            }
        }
        modified
    }
}
