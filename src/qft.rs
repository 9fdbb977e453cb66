//! Quantum Fourier transform.

use std::f64::consts::PI;

use tracing::debug;

use crate::circuit::Circuit;
use crate::error::CircuitResult;
use crate::operation::Operation;

/// QFT over `num_qubits` wires, with wire 0 as the least significant bit.
///
/// Maps `|x>` to `Σ_y e^{2πi·x·y/2^t} |y> / 2^{t/2}`. The bit reversal is
/// done up front with swaps, followed by a Hadamard and a ladder of
/// controlled phases per wire.
pub fn qft(num_qubits: usize) -> CircuitResult<Operation> {
    let mut circuit = Circuit::new("qft");
    let c = circuit.add_register("c", num_qubits)?;

    for i in 0..num_qubits / 2 {
        circuit.swap(c.wire(i), c.wire(num_qubits - 1 - i))?;
    }
    for i in 0..num_qubits {
        circuit.h(c.wire(i))?;
        for j in i + 1..num_qubits {
            let angle = PI / 2.0_f64.powi((j - i) as i32);
            circuit.cp(angle, c.wire(i), c.wire(j))?;
        }
    }

    debug!(num_qubits, gates = circuit.len(), "built QFT");
    Ok(circuit.into_operation())
}

pub fn inverse_qft(num_qubits: usize) -> CircuitResult<Operation> {
    qft(num_qubits)?.inverse()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use num_complex::Complex;
    use proptest::prelude::*;

    use crate::qstate::QState;
    use crate::{assert_approx_complex_eq, Simulator};

    use super::*;

    fn circuit_of(op: Operation, num_qubits: usize) -> Result<Circuit> {
        let mut circuit = Circuit::new("test");
        let q = circuit.add_register("q", num_qubits)?;
        circuit.append(op, q.wires())?;
        Ok(circuit)
    }

    #[test]
    fn test_qft_of_basis_states() -> Result<()> {
        let t = 3;
        let dim = 1 << t;
        let circuit = circuit_of(qft(t)?, t)?;
        for x in 0..dim {
            let input = QState::from_str(&format!("{:03b}", x))?;
            let result = Simulator::new().statevector(&circuit, &input)?;
            for y in 0..dim {
                let expected = Complex::from_polar(
                    1.0 / (dim as f64).sqrt(),
                    2.0 * PI * (x * y) as f64 / dim as f64,
                );
                assert_approx_complex_eq!(expected.re, expected.im, result.state[y]);
            }
        }
        Ok(())
    }

    #[test]
    fn test_qft_structure() -> Result<()> {
        let Operation::Composite(body) = qft(4)? else {
            panic!("qft must be a composite");
        };
        assert_eq!(body.num_wires(), 4);
        // 2 swaps, 4 Hadamards, 6 controlled phases
        assert_eq!(body.len(), 12);
        assert_eq!(body.steps()[0].wires(), &[0, 3]);
        assert_eq!(body.steps()[3].wires(), &[0, 1]);
        Ok(())
    }

    #[test]
    fn test_single_wire_qft_is_hadamard() -> Result<()> {
        let circuit = circuit_of(qft(1)?, 1)?;
        let result = Simulator::new().statevector(&circuit, &QState::from_str("1")?)?;
        assert_approx_complex_eq!(1.0 / 2f64.sqrt(), 0.0, result.state[0]);
        assert_approx_complex_eq!(-1.0 / 2f64.sqrt(), 0.0, result.state[1]);
        Ok(())
    }

    fn amplitudes() -> impl Strategy<Value = (usize, Vec<(f64, f64)>)> {
        (1usize..=4).prop_flat_map(|t| {
            (
                Just(t),
                prop::collection::vec((-1.0f64..1.0, -1.0f64..1.0), 1 << t),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_inverse_qft_round_trip((t, raw) in amplitudes()) {
            let norm = raw.iter().map(|(re, im)| re * re + im * im).sum::<f64>().sqrt();
            prop_assume!(norm > 1e-3);
            let amplitudes: Vec<_> = raw
                .iter()
                .map(|&(re, im)| Complex::new(re / norm, im / norm))
                .collect();
            let input = QState::new(&amplitudes).unwrap();

            let mut circuit = Circuit::new("round_trip");
            let q = circuit.add_register("q", t).unwrap();
            circuit.append(qft(t).unwrap(), q.wires()).unwrap();
            circuit.append(inverse_qft(t).unwrap(), q.wires()).unwrap();

            let output = Simulator::new().statevector(&circuit, &input).unwrap();
            for (a, b) in input.state.iter().zip(output.state.iter()) {
                prop_assert!((a - b).norm() < 1e-9);
            }
        }
    }
}
