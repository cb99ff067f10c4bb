//! Operator nodes and the id handles that tie the graph together.

use std::collections::HashMap;
use std::fmt;

/// Handle to a value in the graph's arena. Lightweight (4 bytes), Copy.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub(crate) u32);

impl ValueId {
    #[inline]
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Handle to a node in the graph's arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Operator kind tag.
///
/// The fused variants are reachable only through the fusion pass; the
/// graph builder never creates them directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    Input,
    Output,
    Conv2d,
    MatMul,
    Relu,
    Add,
    MaxPool,
    BatchNorm,
    FusedConvRelu,
    FusedMatMulAdd,
}

impl OpKind {
    /// Human-readable operator name, used in diagnostics and traces.
    pub fn name(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Output => "Output",
            Self::Conv2d => "Conv2D",
            Self::MatMul => "MatMul",
            Self::Relu => "ReLU",
            Self::Add => "Add",
            Self::MaxPool => "MaxPool",
            Self::BatchNorm => "BatchNorm",
            Self::FusedConvRelu => "FusedConvReLU",
            Self::FusedMatMulAdd => "FusedMatMulAdd",
        }
    }

    /// Input and Output nodes carry no compute and emit no instructions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Input | Self::Output)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single operator application.
///
/// Inputs and outputs are non-owning handles into the graph's value
/// arena. The kind is mutable so fusion can rewrite it in place without
/// touching any edges.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    kind: OpKind,
    inputs: Vec<ValueId>,
    outputs: Vec<ValueId>,
    attrs: HashMap<String, i64>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: OpKind) -> Self {
        Self {
            id,
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            attrs: HashMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// Rewrite the operator kind in place. Used by fusion.
    pub fn set_kind(&mut self, kind: OpKind) {
        self.kind = kind;
    }

    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    pub(crate) fn push_input(&mut self, v: ValueId) {
        self.inputs.push(v);
    }

    pub(crate) fn push_output(&mut self, v: ValueId) {
        self.outputs.push(v);
    }

    /// Set a named integer attribute, replacing any previous value.
    pub fn set_attr(&mut self, key: impl Into<String>, value: i64) {
        self.attrs.insert(key.into(), value);
    }

    /// Look up an attribute, falling back to `default` if absent.
    pub fn attr(&self, key: &str, default: i64) -> i64 {
        self.attrs.get(key).copied().unwrap_or(default)
    }

    pub fn attrs(&self) -> &HashMap<String, i64> {
        &self.attrs
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node{} [{}] inputs=[", self.id.0, self.kind)?;
        for (i, v) in self.inputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "] outputs=[")?;
        for (i, v) in self.outputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_default() {
        let mut n = Node::new(NodeId(0), OpKind::Conv2d);
        assert_eq!(n.attr("kernel_size", 3), 3);
        n.set_attr("kernel_size", 5);
        assert_eq!(n.attr("kernel_size", 3), 5);
    }

    #[test]
    fn node_display() {
        let mut n = Node::new(NodeId(3), OpKind::Relu);
        n.push_input(ValueId(2));
        n.push_output(ValueId(3));
        assert_eq!(n.to_string(), "Node3 [ReLU] inputs=[v2] outputs=[v3]");
    }

    #[test]
    fn op_names_round() {
        assert_eq!(OpKind::FusedConvRelu.name(), "FusedConvReLU");
        assert_eq!(OpKind::MatMul.name(), "MatMul");
        assert!(OpKind::Input.is_terminal());
        assert!(!OpKind::Conv2d.is_terminal());
    }
}
