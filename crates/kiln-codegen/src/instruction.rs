//! The linear instruction trace.

use std::fmt;

/// Instruction kind in the lowered trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstrKind {
    /// Read operand bytes from memory.
    Load,
    /// Write result bytes to memory.
    Store,
    /// Perform the operator's arithmetic.
    Compute,
    /// Synchronization barrier.
    Sync,
}

impl fmt::Display for InstrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Load => "LOAD",
            Self::Store => "STORE",
            Self::Compute => "COMPUTE",
            Self::Sync => "SYNC",
        };
        f.write_str(s)
    }
}

/// One step of the lowered trace.
///
/// Carries byte and FLOP counts only; instructions have no identity
/// beyond their position, and the trace is immutable once generated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub kind: InstrKind,
    /// Originating operator name, for diagnostics.
    pub op_name: &'static str,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub flops: u64,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Instruction{{{}, op={}, in={}B, out={}B, flops={}}}",
            self.kind, self.op_name, self.input_bytes, self.output_bytes, self.flops
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let inst = Instruction {
            kind: InstrKind::Load,
            op_name: "Conv2D",
            input_bytes: 602_112,
            output_bytes: 0,
            flops: 0,
        };
        assert_eq!(
            inst.to_string(),
            "Instruction{LOAD, op=Conv2D, in=602112B, out=0B, flops=0}"
        );
    }
}
