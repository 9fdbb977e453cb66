use std::fmt::Display;

use nalgebra::DVector;
use num_complex::Complex;

use crate::error::{CircuitError, CircuitResult};
use crate::Qbit;

/// Amplitude vector over `2^n` basis states; wire `i` is bit `i` of the index.
#[derive(Debug, Clone, PartialEq)]
pub struct QState {
    pub(crate) state: DVector<Qbit>,
}

impl QState {
    pub fn new(state: &[Qbit]) -> CircuitResult<Self> {
        let len = state.len();
        if len == 0 || (len & (len - 1)) != 0 {
            return Err(CircuitError::InvalidState(
                "State vector length must be a non-zero power of 2".into(),
            ));
        }

        let state = DVector::from_row_slice(state);
        Ok(Self { state })
    }

    /// Normalised state from real amplitudes.
    pub fn from_amplitudes(amplitudes: &[f64]) -> CircuitResult<Self> {
        let norm = amplitudes.iter().map(|a| a * a).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Err(CircuitError::InvalidState("zero vector".into()));
        }
        let state: Vec<Qbit> = amplitudes
            .iter()
            .map(|a| Complex::new(a / norm, 0.0))
            .collect();
        Self::new(&state)
    }

    pub fn zero_state(num_of_qbits: usize) -> Self {
        let size = 2_usize.pow(num_of_qbits as u32);
        let mut state = DVector::zeros(size);
        state[0] = Complex::new(1.0, 0.0); // |0...0> state
        Self { state }
    }

    /// Basis state from a bitstring written highest wire first.
    pub fn from_str(qbits: &str) -> CircuitResult<Self> {
        let index = usize::from_str_radix(qbits, 2)
            .map_err(|e| CircuitError::InvalidState(format!("'{qbits}': {e}")))?;
        let mut state = DVector::zeros(2_usize.pow(qbits.len() as u32));
        state[index] = Complex::new(1.0, 0.0);

        Ok(Self { state })
    }

    /// Place `self` on the lowest wires of a `num_of_qbits` register whose
    /// other wires are |0>.
    pub fn embed(&self, num_of_qbits: usize) -> CircuitResult<Self> {
        if num_of_qbits < self.num_of_qbits() {
            return Err(CircuitError::InvalidState(format!(
                "cannot embed {} qubits into {}",
                self.num_of_qbits(),
                num_of_qbits
            )));
        }
        let mut state = DVector::zeros(2_usize.pow(num_of_qbits as u32));
        state.rows_mut(0, self.state.len()).copy_from(&self.state);
        Ok(Self { state })
    }

    pub fn num_of_qbits(&self) -> usize {
        self.state.len().ilog2() as usize
    }

    pub fn amplitude(&self, index: usize) -> Option<Qbit> {
        self.state.get(index).copied()
    }

    pub fn amplitudes(&self) -> &DVector<Qbit> {
        &self.state
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.state.iter().map(|a| a.norm_sqr()).collect()
    }

    pub fn norm(&self) -> f64 {
        self.state.norm()
    }

    /// `|<self|other>|^2`
    pub fn fidelity(&self, other: &QState) -> CircuitResult<f64> {
        if self.state.len() != other.state.len() {
            return Err(CircuitError::InvalidState(format!(
                "cannot compare {} and {} qubit states",
                self.num_of_qbits(),
                other.num_of_qbits()
            )));
        }
        Ok(self.state.dotc(&other.state).norm_sqr())
    }

    /// Amplitudes of `wires` (lowest first) with every other wire fixed by
    /// `rest`, a basis index over the remaining wires in ascending order.
    pub fn slice(&self, wires: &[usize], rest: usize) -> Vec<Qbit> {
        let n = self.num_of_qbits();
        let others: Vec<usize> = (0..n).filter(|w| !wires.contains(w)).collect();
        let base = others
            .iter()
            .enumerate()
            .filter(|(j, _)| (rest >> j) & 1 == 1)
            .fold(0, |acc, (_, w)| acc | (1_usize << w));

        (0..1_usize << wires.len())
            .map(|local| {
                let index = wires
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| (local >> j) & 1 == 1)
                    .fold(base, |acc, (_, w)| acc | (1_usize << w));
                self.state[index]
            })
            .collect()
    }
}

impl Display for QState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bin_width = self.num_of_qbits();

        for (i, value) in self.state.iter().enumerate() {
            writeln!(f, "|{:0width$b}>: {}", i, value, width = bin_width)?;
        }

        Ok(())
    }
}

impl From<QState> for DVector<Qbit> {
    fn from(qstate: QState) -> Self {
        qstate.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_approx_complex_eq, assert_approx_eq};

    #[test]
    fn test_qstate_from_2bit_str() {
        let qstate = QState::from_str("00").unwrap();

        assert_eq!(qstate.num_of_qbits(), 2);
        assert_eq!(qstate.state.len(), 4);

        assert_approx_complex_eq!(1.0, 0.0, qstate.state[0]);
        assert_approx_complex_eq!(0.0, 0.0, qstate.state[1]);

        let qstate = QState::from_str("01").unwrap();
        assert_approx_complex_eq!(1.0, 0.0, qstate.state[1]);

        let qstate = QState::from_str("11").unwrap();
        assert_approx_complex_eq!(1.0, 0.0, qstate.state[3]);
        assert!(QState::from_str("12").is_err());
    }

    #[test]
    fn test_invalid_length() {
        let err = QState::new(&[Complex::new(1.0, 0.0); 3]).unwrap_err();
        assert!(matches!(err, CircuitError::InvalidState(_)));
    }

    #[test]
    fn test_embed_and_slice() {
        let b = QState::from_amplitudes(&[0.5, 0.5, 0.5, 0.5]).unwrap();
        let big = b.embed(4).unwrap();
        assert_eq!(big.num_of_qbits(), 4);
        assert_approx_eq!(1.0, big.norm());

        let amplitudes = big.slice(&[0, 1], 0);
        assert_eq!(amplitudes.len(), 4);
        for a in amplitudes {
            assert_approx_complex_eq!(0.5, 0.0, a);
        }
        assert!(big.slice(&[0, 1], 1).iter().all(|a| a.norm() == 0.0));
    }

    #[test]
    fn test_fidelity() {
        let zero = QState::zero_state(1);
        let plus = QState::from_amplitudes(&[1.0, 1.0]).unwrap();
        assert_approx_eq!(0.5, zero.fidelity(&plus).unwrap());
        assert_approx_eq!(1.0, plus.fidelity(&plus).unwrap());
        assert!(zero.fidelity(&QState::zero_state(2)).is_err());
    }
}
