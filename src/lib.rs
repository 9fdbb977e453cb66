//! Symbolic quantum circuit construction with an in-crate statevector
//! backend.
//!
//! Circuits are built from primitive gates and closed sub-circuits, which
//! can be lifted under controls, raised to powers and inverted before being
//! spliced into larger circuits. Numeric angles may be left as tokens and
//! bound later. The algorithm modules (QFT, phase estimation, HHL, QAOA,
//! error correction, Schumacher compression) are all assembled this way.

pub mod circuit;
pub mod compression;
pub mod counts;
pub mod error;
pub mod gates;
pub mod hhl;
pub mod noise;
pub mod operation;
pub mod parameter;
pub mod phase_estimation;
pub mod qaoa;
pub mod qec;
pub mod qft;
pub mod qstate;
pub mod register;
pub mod rotation;
pub mod simulator;

#[cfg(test)]
mod test_util;

use num_complex::Complex;

pub type Qbit = Complex<f64>;

pub use circuit::{Circuit, Step};
pub use counts::Counts;
pub use error::{CircuitError, CircuitResult};
pub use gates::GateKind;
pub use noise::NoiseModel;
pub use operation::{ControlState, Operation};
pub use parameter::{Bindings, Param, ParameterVector};
pub use qstate::QState;
pub use register::Register;
pub use simulator::Simulator;
