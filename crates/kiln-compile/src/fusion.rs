//! Operator fusion.
//!
//! Rewrites adjacent operator pairs into fused kinds so codegen emits a
//! single LOAD/COMPUTE/STORE triple where two used to be. Only the
//! producing node's kind changes; no value or edge is touched, so every
//! downstream id stays valid.

use kiln_ir::{Graph, OpKind};
use tracing::debug;

use crate::passes::Pass;

/// Fuses Conv2D→ReLU and MatMul→Add chains.
///
/// A producer fuses only when its output has exactly one consumer in
/// the whole graph. Fusing past a second consumer would be unsound: the
/// unfused consumer's compute step disappears from the trace while its
/// operand is still expected unactivated.
pub struct FusionPass;

impl Pass for FusionPass {
    fn name(&self) -> &str {
        "FusionPass"
    }

    fn run(&mut self, graph: &mut Graph) -> bool {
        let mut changed = fuse_conv_relu(graph);
        changed |= fuse_matmul_add(graph);
        changed
    }
}

fn fuse_conv_relu(graph: &mut Graph) -> bool {
    let mut changed = false;
    for id in graph.topo_order() {
        let Some(node) = graph.node(id) else { continue };
        if node.kind() != OpKind::Conv2d || node.outputs().len() != 1 {
            continue;
        }
        let out = node.outputs()[0];

        let consumers = graph.consumers(out);
        if consumers.len() != 1 {
            continue;
        }
        let Some(consumer) = graph.node(consumers[0]) else { continue };
        if consumer.kind() == OpKind::Relu
            && consumer.inputs().len() == 1
            && consumer.inputs()[0] == out
        {
            if let Some(node) = graph.node_mut(id) {
                node.set_kind(OpKind::FusedConvRelu);
                debug!(node = %id, "fused Conv2D + ReLU into FusedConvReLU");
                changed = true;
            }
        }
    }
    changed
}

fn fuse_matmul_add(graph: &mut Graph) -> bool {
    let mut changed = false;
    for id in graph.topo_order() {
        let Some(node) = graph.node(id) else { continue };
        if node.kind() != OpKind::MatMul || node.outputs().len() != 1 {
            continue;
        }
        let out = node.outputs()[0];

        // One consumer, through one input slot. An Add reading the
        // product twice shows up as two consumer entries and is skipped.
        let consumers = graph.consumers(out);
        if consumers.len() != 1 {
            continue;
        }
        let Some(consumer) = graph.node(consumers[0]) else { continue };
        if consumer.kind() == OpKind::Add
            && consumer.inputs().len() == 2
            && consumer.inputs().contains(&out)
        {
            if let Some(node) = graph.node_mut(id) {
                node.set_kind(OpKind::FusedMatMulAdd);
                debug!(node = %id, "fused MatMul + Add into FusedMatMulAdd");
                changed = true;
            }
        }
    }
    changed
}
