//! kiln-codegen — lowers an optimized graph into a linear, cost-annotated
//! instruction trace.
//!
//! Every compute node becomes a LOAD/COMPUTE/STORE triple carrying byte
//! and FLOP counts; the simulator in `kiln-sim` replays the trace
//! against a hardware model. Fusion upstream shows up here as fewer
//! memory-traffic instructions, which is the whole point.

mod generate;
mod instruction;

pub use generate::{CodeGenerator, DTYPE_BYTES};
pub use instruction::{InstrKind, Instruction};
