//! Single-wire Pauli channels applied at noise markers.

use std::fmt;

use rand::Rng;

use crate::error::{CircuitError, CircuitResult};
use crate::gates::GateKind;

/// A single-wire error channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum NoiseModel {
    /// Applies X with probability `p`.
    BitFlip { p: f64 },
    /// Applies Z with probability `p`.
    PhaseFlip { p: f64 },
    /// Applies each of X, Y, Z with probability `p / 4`, so the wire is
    /// left alone with probability `1 - 3p/4`.
    Depolarizing { p: f64 },
}

impl NoiseModel {
    pub fn bit_flip(p: f64) -> CircuitResult<Self> {
        check_probability(p).map(|p| NoiseModel::BitFlip { p })
    }

    pub fn phase_flip(p: f64) -> CircuitResult<Self> {
        check_probability(p).map(|p| NoiseModel::PhaseFlip { p })
    }

    pub fn depolarizing(p: f64) -> CircuitResult<Self> {
        check_probability(p).map(|p| NoiseModel::Depolarizing { p })
    }

    pub fn name(&self) -> &str {
        match self {
            NoiseModel::BitFlip { .. } => "bit_flip",
            NoiseModel::PhaseFlip { .. } => "phase_flip",
            NoiseModel::Depolarizing { .. } => "depolarizing",
        }
    }

    pub fn error_param(&self) -> f64 {
        match self {
            NoiseModel::BitFlip { p }
            | NoiseModel::PhaseFlip { p }
            | NoiseModel::Depolarizing { p } => *p,
        }
    }

    /// Draw the Pauli error for one marker, `None` when nothing happens.
    pub fn sample_error<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<GateKind> {
        let r: f64 = rng.random();
        match *self {
            NoiseModel::BitFlip { p } => (r < p).then_some(GateKind::X),
            NoiseModel::PhaseFlip { p } => (r < p).then_some(GateKind::Z),
            NoiseModel::Depolarizing { p } => {
                let quarter = p / 4.0;
                if r < quarter {
                    Some(GateKind::X)
                } else if r < 2.0 * quarter {
                    Some(GateKind::Y)
                } else if r < 3.0 * quarter {
                    Some(GateKind::Z)
                } else {
                    None
                }
            }
        }
    }
}

fn check_probability(p: f64) -> CircuitResult<f64> {
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(CircuitError::InvalidState(format!(
            "error probability {p} outside [0, 1]"
        )))
    }
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(p={:.4})", self.name(), self.error_param())
    }
}
