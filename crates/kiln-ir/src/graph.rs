//! Arena-based dataflow graph with a shape-checked builder API.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use crate::error::GraphError;
use crate::node::{Node, NodeId, OpKind, ValueId};
use crate::shape::Shape;

/// A tensor-shaped value produced by exactly one node.
#[derive(Clone, Debug)]
pub struct Value {
    id: ValueId,
    shape: Shape,
}

impl Value {
    pub fn id(&self) -> ValueId {
        self.id
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// Tensor computation graph.
///
/// Owns all nodes and values in slot arenas addressed by stable ids.
/// Ids are never reused, so handles stay valid across pass rewrites;
/// dead-code elimination clears slots instead of compacting. Builder
/// calls may only reference previously created values, which makes
/// creation order a valid topological order by construction.
pub struct Graph {
    nodes: Vec<Option<Node>>,
    values: Vec<Option<Value>>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            values: Vec::new(),
        }
    }

    fn create_node(&mut self, kind: OpKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node::new(id, kind)));
        id
    }

    fn create_value(&mut self, shape: Shape) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(Some(Value { id, shape }));
        id
    }

    fn live_node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0 as usize].as_mut().expect("stale node id")
    }

    fn shape_of(&self, v: ValueId) -> &Shape {
        self.value(v).expect("stale value id").shape()
    }

    // ---- builder API ----

    /// Add a graph input with the given shape.
    pub fn add_input(&mut self, shape: Shape) -> ValueId {
        let n = self.create_node(OpKind::Input);
        let out = self.create_value(shape);
        self.live_node_mut(n).push_output(out);
        out
    }

    /// Mark a value as a graph output. Identity shape.
    pub fn add_output(&mut self, input: ValueId) -> ValueId {
        let shape = self.shape_of(input).clone();
        let n = self.create_node(OpKind::Output);
        let out = self.create_value(shape);
        let node = self.live_node_mut(n);
        node.push_input(input);
        node.push_output(out);
        out
    }

    /// Add a 2D convolution over a `[N, C, H, W]` input.
    ///
    /// Output spatial size is `(d + 2*padding - kernel_size)/stride + 1`
    /// (floor); the call fails if that is not positive.
    pub fn add_conv2d(
        &mut self,
        input: ValueId,
        out_channels: i64,
        kernel_size: i64,
        stride: i64,
        padding: i64,
    ) -> Result<ValueId, GraphError> {
        check_positive("out_channels", out_channels)?;
        check_positive("kernel_size", kernel_size)?;
        check_positive("stride", stride)?;
        if padding < 0 {
            return Err(GraphError::InvalidAttribute {
                name: "padding",
                value: padding,
            });
        }

        let in_shape = self.shape_of(input);
        if in_shape.ndim() != 4 {
            return Err(GraphError::RankMismatch {
                op: "Conv2D",
                expected: 4,
                got: in_shape.ndim(),
            });
        }

        let h_out = conv_out_dim(in_shape[2] as i64, kernel_size, stride, padding);
        let w_out = conv_out_dim(in_shape[3] as i64, kernel_size, stride, padding);
        if h_out <= 0 || w_out <= 0 {
            return Err(GraphError::EmptySpatial {
                op: "Conv2D",
                dim: h_out.min(w_out),
            });
        }
        let out_shape = Shape::new(vec![
            in_shape[0],
            out_channels as usize,
            h_out as usize,
            w_out as usize,
        ]);

        let n = self.create_node(OpKind::Conv2d);
        let out = self.create_value(out_shape);
        let node = self.live_node_mut(n);
        node.push_input(input);
        node.push_output(out);
        node.set_attr("out_channels", out_channels);
        node.set_attr("kernel_size", kernel_size);
        node.set_attr("stride", stride);
        node.set_attr("padding", padding);
        Ok(out)
    }

    /// Add a matrix multiply `[M,K] x [K,N] -> [M,N]`.
    pub fn add_matmul(&mut self, a: ValueId, b: ValueId) -> Result<ValueId, GraphError> {
        let a_shape = self.shape_of(a);
        let b_shape = self.shape_of(b);
        if a_shape.ndim() != 2 {
            return Err(GraphError::RankMismatch {
                op: "MatMul",
                expected: 2,
                got: a_shape.ndim(),
            });
        }
        if b_shape.ndim() != 2 {
            return Err(GraphError::RankMismatch {
                op: "MatMul",
                expected: 2,
                got: b_shape.ndim(),
            });
        }
        if a_shape[1] != b_shape[0] {
            return Err(GraphError::InnerDimMismatch {
                lhs: a_shape.clone(),
                rhs: b_shape.clone(),
            });
        }
        let out_shape = Shape::new(vec![a_shape[0], b_shape[1]]);

        let n = self.create_node(OpKind::MatMul);
        let out = self.create_value(out_shape);
        let node = self.live_node_mut(n);
        node.push_input(a);
        node.push_input(b);
        node.push_output(out);
        Ok(out)
    }

    /// Add an elementwise ReLU. Identity shape.
    pub fn add_relu(&mut self, input: ValueId) -> ValueId {
        let shape = self.shape_of(input).clone();
        let n = self.create_node(OpKind::Relu);
        let out = self.create_value(shape);
        let node = self.live_node_mut(n);
        node.push_input(input);
        node.push_output(out);
        out
    }

    /// Add an elementwise addition of two same-shaped values.
    pub fn add_add(&mut self, a: ValueId, b: ValueId) -> Result<ValueId, GraphError> {
        let a_shape = self.shape_of(a);
        let b_shape = self.shape_of(b);
        if a_shape != b_shape {
            return Err(GraphError::ShapeMismatch {
                op: "Add",
                lhs: a_shape.clone(),
                rhs: b_shape.clone(),
            });
        }
        let shape = a_shape.clone();
        let n = self.create_node(OpKind::Add);
        let out = self.create_value(shape);
        let node = self.live_node_mut(n);
        node.push_input(a);
        node.push_input(b);
        node.push_output(out);
        Ok(out)
    }

    /// Add a 2D max-pool (no padding) over a `[N, C, H, W]` input.
    pub fn add_maxpool(
        &mut self,
        input: ValueId,
        kernel_size: i64,
        stride: i64,
    ) -> Result<ValueId, GraphError> {
        check_positive("kernel_size", kernel_size)?;
        check_positive("stride", stride)?;

        let in_shape = self.shape_of(input);
        if in_shape.ndim() != 4 {
            return Err(GraphError::RankMismatch {
                op: "MaxPool",
                expected: 4,
                got: in_shape.ndim(),
            });
        }
        let h_out = conv_out_dim(in_shape[2] as i64, kernel_size, stride, 0);
        let w_out = conv_out_dim(in_shape[3] as i64, kernel_size, stride, 0);
        if h_out <= 0 || w_out <= 0 {
            return Err(GraphError::EmptySpatial {
                op: "MaxPool",
                dim: h_out.min(w_out),
            });
        }
        let out_shape = Shape::new(vec![
            in_shape[0],
            in_shape[1],
            h_out as usize,
            w_out as usize,
        ]);

        let n = self.create_node(OpKind::MaxPool);
        let out = self.create_value(out_shape);
        let node = self.live_node_mut(n);
        node.push_input(input);
        node.push_output(out);
        node.set_attr("kernel_size", kernel_size);
        node.set_attr("stride", stride);
        Ok(out)
    }

    // ---- queries ----

    /// Live nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(|n| n.as_ref())
    }

    /// Node lookup by id. `None` if the id was removed by a pass.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(|n| n.as_ref())
    }

    /// Value lookup by id.
    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id.0 as usize).and_then(|v| v.as_ref())
    }

    /// Number of live nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes().count()
    }

    /// Number of live values.
    pub fn num_values(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// The node that produced a value.
    pub fn producer(&self, v: ValueId) -> Option<NodeId> {
        self.nodes()
            .find(|n| n.outputs().contains(&v))
            .map(|n| n.id())
    }

    /// Ids of all nodes consuming a value, in creation order. A node
    /// reading the value through two inputs appears twice.
    pub fn consumers(&self, v: ValueId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for node in self.nodes() {
            for &input in node.inputs() {
                if input == v {
                    out.push(node.id());
                }
            }
        }
        out
    }

    /// Nodes in dependency order. When several nodes are ready at once,
    /// the lowest creation id goes first, so the order is deterministic.
    pub fn topo_order(&self) -> Vec<NodeId> {
        let mut indegree = vec![0usize; self.nodes.len()];
        for node in self.nodes() {
            indegree[node.id().0 as usize] = node.inputs().len();
        }

        let mut ready: BinaryHeap<Reverse<NodeId>> = self
            .nodes()
            .filter(|n| n.inputs().is_empty())
            .map(|n| Reverse(n.id()))
            .collect();

        let mut order = Vec::with_capacity(self.num_nodes());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            let outputs: Vec<ValueId> = self
                .node(id)
                .map(|n| n.outputs().to_vec())
                .unwrap_or_default();
            for out in outputs {
                for consumer in self.consumers(out) {
                    let slot = &mut indegree[consumer.0 as usize];
                    *slot -= 1;
                    if *slot == 0 {
                        ready.push(Reverse(consumer));
                    }
                }
            }
        }
        order
    }

    // ---- pass support ----

    /// Remove a node and the values it produced. Ids are never reused.
    ///
    /// The caller must ensure no live node still consumes the removed
    /// outputs; dead-code elimination guarantees this by removing whole
    /// unreachable regions at once.
    pub fn remove_node(&mut self, id: NodeId) {
        if let Some(node) = self.nodes[id.0 as usize].take() {
            for out in node.outputs() {
                self.values[out.0 as usize] = None;
            }
        }
    }

    /// Mutable node access for passes.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(|n| n.as_mut())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Graph with {} nodes, {} values",
            self.num_nodes(),
            self.num_values()
        )?;
        for node in self.nodes() {
            writeln!(f, "  {node}")?;
        }
        Ok(())
    }
}

fn check_positive(name: &'static str, value: i64) -> Result<(), GraphError> {
    if value <= 0 {
        return Err(GraphError::InvalidAttribute { name, value });
    }
    Ok(())
}

/// Standard convolution output-size formula, floor division.
fn conv_out_dim(d: i64, kernel: i64, stride: i64, padding: i64) -> i64 {
    (d + 2 * padding - kernel).div_euclid(stride) + 1
}
