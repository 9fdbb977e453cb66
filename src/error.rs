//! Error types for circuit construction and execution.

use thiserror::Error;

/// Errors raised while building, transforming or executing circuits.
///
/// Every variant is detected at the call that introduced the problem; a
/// failed call leaves the circuit under construction untouched.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CircuitError {
    /// Wire-index list length does not match the operation's arity.
    #[error("Operation '{name}' acts on {expected} wires, got {got}")]
    ArityMismatch {
        /// Name of the operation.
        name: String,
        /// Arity of the operation.
        expected: usize,
        /// Number of wire indices supplied.
        got: usize,
    },

    /// A wire index is outside the circuit.
    #[error("Wire index {index} out of range for a circuit of {num_wires} wires")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Total wires of the circuit.
        num_wires: usize,
    },

    /// The same wire was passed twice to one operation.
    #[error("Wire {index} used more than once by '{name}'")]
    DuplicateWire {
        /// The repeated index.
        index: usize,
        /// Name of the operation.
        name: String,
    },

    /// Control-state length does not match the number of controls.
    #[error("Control state has {got} bits but {expected} controls were requested")]
    InvalidControlState {
        /// Requested number of controls.
        expected: usize,
        /// Length of the supplied control state.
        got: usize,
    },

    /// A control-state string with characters other than `0` and `1`.
    #[error("Invalid control state string '{0}'")]
    InvalidControlString(String),

    /// A power-lifted operation needs a positive exponent.
    #[error("Power exponent must be at least 1, got {0}")]
    InvalidExponent(u32),

    /// A power of two past the largest representable exponent.
    #[error("Power exponent 2^{0} does not fit in 32 bits")]
    ExponentOverflow(usize),

    /// Inversion requested for a primitive without an adjoint.
    #[error("Gate '{0}' has no known adjoint")]
    NoKnownAdjoint(String),

    /// A symbolic parameter has no bound value.
    #[error("Parameter '{0}' is unbound")]
    UnboundParameter(String),

    /// A register must hold at least one wire.
    #[error("Register '{0}' has no wires")]
    EmptyRegister(String),

    /// Aligned concatenation of circuits with different wire layouts.
    #[error("Circuit '{left}' has {left_wires} wires but '{right}' has {right_wires}")]
    RegisterMismatch {
        /// Name of the receiving circuit.
        left: String,
        /// Wires of the receiving circuit.
        left_wires: usize,
        /// Name of the appended circuit.
        right: String,
        /// Wires of the appended circuit.
        right_wires: usize,
    },

    /// A system matrix that cannot drive a time evolution.
    #[error("Invalid matrix: {0}")]
    InvalidMatrix(String),

    /// A non-unitary gate where only unitaries are allowed.
    #[error("Gate '{0}' is not unitary in this context")]
    NonUnitary(String),

    /// A state vector the backend cannot work with.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The classical optimiser failed.
    #[error("Optimization failed: {0}")]
    Optimization(String),
}

/// Result type for circuit operations.
pub type CircuitResult<T> = Result<T, CircuitError>;
