//! Lowering from graph IR to the instruction trace.

use kiln_ir::{Graph, Node, OpKind, ValueId};
use tracing::debug;

use crate::instruction::{InstrKind, Instruction};

/// All tensors are f32.
pub const DTYPE_BYTES: u64 = 4;

/// Lowers an optimized graph into a flat, cost-annotated trace.
///
/// Walks the graph in topological order and emits a LOAD/COMPUTE/STORE
/// triple per compute node. Input and Output nodes carry no compute and
/// emit nothing. A consumer absorbed by a fused producer (the ReLU
/// behind a FusedConvReLU, the Add behind a FusedMatMulAdd) emits
/// nothing either: its work happens inside the fused node's triple.
/// This is exactly how fusion pays off, one LOAD/STORE pair instead of
/// two.
pub struct CodeGenerator;

impl CodeGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, graph: &Graph) -> Vec<Instruction> {
        let mut instructions = Vec::new();
        for id in graph.topo_order() {
            let Some(node) = graph.node(id) else { continue };
            if node.kind().is_terminal() || absorbed_into_fused(graph, node) {
                continue;
            }

            let input_bytes: u64 = node
                .inputs()
                .iter()
                .map(|&v| value_bytes(graph, v))
                .sum();
            let output_bytes: u64 = node
                .outputs()
                .iter()
                .map(|&v| value_bytes(graph, v))
                .sum();
            let op_name = node.kind().name();

            instructions.push(Instruction {
                kind: InstrKind::Load,
                op_name,
                input_bytes,
                output_bytes: 0,
                flops: 0,
            });
            instructions.push(Instruction {
                kind: InstrKind::Compute,
                op_name,
                input_bytes,
                output_bytes,
                flops: node_flops(graph, node),
            });
            instructions.push(Instruction {
                kind: InstrKind::Store,
                op_name,
                input_bytes: 0,
                output_bytes,
                flops: 0,
            });
        }
        debug!(count = instructions.len(), "generated instruction trace");
        instructions
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn value_bytes(graph: &Graph, v: ValueId) -> u64 {
    let value = graph.value(v).expect("live node references live value");
    value.shape().numel() as u64 * DTYPE_BYTES
}

/// Whether this node's computation already happens inside a fused
/// producer. Sound because fusion requires the producer's output to
/// have exactly one consumer: this node.
fn absorbed_into_fused(graph: &Graph, node: &Node) -> bool {
    let producer_kind = |v: ValueId| {
        graph
            .producer(v)
            .and_then(|id| graph.node(id))
            .map(|n| n.kind())
    };
    match node.kind() {
        OpKind::Relu if node.inputs().len() == 1 => {
            producer_kind(node.inputs()[0]) == Some(OpKind::FusedConvRelu)
        }
        OpKind::Add if node.inputs().len() == 2 => node
            .inputs()
            .iter()
            .any(|&v| producer_kind(v) == Some(OpKind::FusedMatMulAdd)),
        _ => false,
    }
}

/// FLOP cost model per operator kind. Fused kinds reuse their base
/// formula. Kinds with no model (BatchNorm and any future op) cost 0 so
/// an unmodeled op degrades gracefully instead of aborting the
/// pipeline.
fn node_flops(graph: &Graph, node: &Node) -> u64 {
    let shape_of = |v: ValueId| {
        graph
            .value(v)
            .expect("live node references live value")
            .shape()
    };
    match node.kind() {
        OpKind::Conv2d | OpKind::FusedConvRelu => {
            let out = shape_of(node.outputs()[0]);
            let input = shape_of(node.inputs()[0]);
            let k = node.attr("kernel_size", 3) as u64;
            let c_in = input[1] as u64;
            let (n, c_out, h_out, w_out) =
                (out[0] as u64, out[1] as u64, out[2] as u64, out[3] as u64);
            2 * c_in * k * k * c_out * h_out * w_out * n
        }
        OpKind::MatMul | OpKind::FusedMatMulAdd => {
            let a = shape_of(node.inputs()[0]);
            let b = shape_of(node.inputs()[1]);
            let (m, k, n) = (a[0] as u64, a[1] as u64, b[1] as u64);
            2 * m * n * k
        }
        OpKind::Relu | OpKind::Add => shape_of(node.outputs()[0]).numel() as u64,
        OpKind::MaxPool => {
            let k = node.attr("kernel_size", 2) as u64;
            shape_of(node.outputs()[0]).numel() as u64 * k * k
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_compile::{FusionPass, Pass};
    use kiln_ir::Shape;

    fn conv_relu_graph() -> Graph {
        let mut g = Graph::new();
        let x = g.add_input(Shape::from_slice(&[1, 3, 224, 224]));
        let c = g.add_conv2d(x, 64, 3, 1, 1).unwrap();
        let r = g.add_relu(c);
        g.add_output(r);
        g
    }

    #[test]
    fn triple_per_compute_node() {
        let g = conv_relu_graph();
        let trace = CodeGenerator::new().generate(&g);
        // Conv2D and ReLU each lower to LOAD/COMPUTE/STORE.
        assert_eq!(trace.len(), 6);
        assert_eq!(trace[0].kind, InstrKind::Load);
        assert_eq!(trace[1].kind, InstrKind::Compute);
        assert_eq!(trace[2].kind, InstrKind::Store);
        assert_eq!(trace[3].op_name, "ReLU");
    }

    #[test]
    fn fusion_halves_the_trace() {
        let mut g = conv_relu_graph();
        assert!(FusionPass.run(&mut g));
        let trace = CodeGenerator::new().generate(&g);
        assert_eq!(trace.len(), 3);
        assert_eq!(trace[0].op_name, "FusedConvReLU");
        assert_eq!(trace[1].kind, InstrKind::Compute);
    }

    #[test]
    fn load_store_sizes() {
        let g = conv_relu_graph();
        let trace = CodeGenerator::new().generate(&g);
        // Conv input [1,3,224,224] = 150528 floats.
        assert_eq!(trace[0].input_bytes, 150_528 * 4);
        assert_eq!(trace[0].output_bytes, 0);
        // Conv output [1,64,224,224].
        assert_eq!(trace[2].output_bytes, 64 * 224 * 224 * 4);
        assert_eq!(trace[2].input_bytes, 0);
    }

    #[test]
    fn conv_flop_model() {
        let g = conv_relu_graph();
        let trace = CodeGenerator::new().generate(&g);
        // 2 * C_in * K^2 * C_out * H_out * W_out * N
        let expected = 2 * 3 * 9 * 64 * 224 * 224 * 1;
        assert_eq!(trace[1].flops, expected);
        // ReLU: one op per output element.
        assert_eq!(trace[4].flops, 64 * 224 * 224);
    }

    #[test]
    fn matmul_flop_model() {
        let mut g = Graph::new();
        let a = g.add_input(Shape::from_slice(&[32, 64]));
        let b = g.add_input(Shape::from_slice(&[64, 16]));
        let c = g.add_matmul(a, b).unwrap();
        g.add_output(c);

        let trace = CodeGenerator::new().generate(&g);
        assert_eq!(trace.len(), 3);
        assert_eq!(trace[1].flops, 2 * 32 * 16 * 64);
    }

    #[test]
    fn maxpool_flop_model() {
        let mut g = Graph::new();
        let x = g.add_input(Shape::from_slice(&[1, 8, 16, 16]));
        let p = g.add_maxpool(x, 2, 2).unwrap();
        g.add_output(p);

        let trace = CodeGenerator::new().generate(&g);
        assert_eq!(trace[1].flops, (8 * 8 * 8) * 4);
    }

    #[test]
    fn fused_matmul_add_absorbs_the_add() {
        let mut g = Graph::new();
        let a = g.add_input(Shape::from_slice(&[4, 8]));
        let b = g.add_input(Shape::from_slice(&[8, 16]));
        let bias = g.add_input(Shape::from_slice(&[4, 16]));
        let mm = g.add_matmul(a, b).unwrap();
        let sum = g.add_add(mm, bias).unwrap();
        g.add_output(sum);

        assert!(FusionPass.run(&mut g));
        let trace = CodeGenerator::new().generate(&g);
        assert_eq!(trace.len(), 3);
        assert_eq!(trace[0].op_name, "FusedMatMulAdd");
        assert_eq!(trace[1].flops, 2 * 4 * 16 * 8);
    }

    #[test]
    fn terminals_emit_nothing() {
        let mut g = Graph::new();
        let x = g.add_input(Shape::from_slice(&[8, 8]));
        g.add_output(x);
        assert!(CodeGenerator::new().generate(&g).is_empty());
    }
}
