//! Phase estimation of a caller-supplied unitary.

use tracing::debug;

use crate::circuit::Circuit;
use crate::error::{CircuitError, CircuitResult};
use crate::operation::{ControlState, Operation};
use crate::qft::inverse_qft;

/// Phase estimation over an `n`-wire eigenstate register `b` followed by a
/// `t`-wire counting register `c`.
///
/// Counting wire `i` controls `unitary^(2^i)`. For an eigenvector with
/// eigenvalue `e^{2πi·θ}` the counting register ends near `θ·2^t`.
pub fn phase_estimation(n: usize, t: usize, unitary: &Operation) -> CircuitResult<Operation> {
    if unitary.arity() != n {
        return Err(CircuitError::ArityMismatch {
            name: unitary.name(),
            expected: n,
            got: unitary.arity(),
        });
    }

    let mut circuit = Circuit::new("qpe");
    let b = circuit.add_register("b", n)?;
    let c = circuit.add_register("c", t)?;

    for wire in c.wires() {
        circuit.h(wire)?;
    }
    for i in 0..t {
        let controlled = unitary
            .power_of_two(i)?
            .control(1, ControlState::all_set(1))?;
        circuit.append(controlled, std::iter::once(c.wire(i)).chain(b.wires()))?;
    }
    circuit.append(inverse_qft(t)?, c.wires())?;

    debug!(n, t, unitary = %unitary.name(), "built phase estimation");
    Ok(circuit.into_operation())
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use anyhow::Result;

    use crate::gates::GateKind;
    use crate::parameter::Param;
    use crate::qstate::QState;
    use crate::{assert_approx_eq, Simulator};

    use super::*;

    #[test]
    fn test_exact_phase_is_read_out() -> Result<()> {
        let t = 4;
        for k in [0, 1, 5, 11, 15] {
            let theta = 2.0 * PI * k as f64 / (1 << t) as f64;
            let u = Operation::from(GateKind::Phase(Param::Value(theta)));

            let mut circuit = Circuit::new("main");
            let q = circuit.add_register("q", 1 + t)?;
            circuit.append(phase_estimation(1, t, &u)?, q.wires())?;

            // eigenvector |1> on the b wire
            let result = Simulator::new().statevector(&circuit, &QState::from_str("00001")?)?;
            let index = (k << 1) | 1;
            assert_approx_eq!(1.0, result.probabilities()[index], 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_two_wire_diagonal_unitary() -> Result<()> {
        // diag(0, 1, 2, 3)·2π/8 has eigenphases j/8 on |j>
        let t = 3;
        let mut h = nalgebra::DMatrix::zeros(4, 4);
        for j in 0..4 {
            h[(j, j)] = num_complex::Complex::new(-2.0 * PI * j as f64 / 8.0, 0.0);
        }
        let u = Operation::from(GateKind::evolution(h, 1.0)?);

        let mut circuit = Circuit::new("main");
        let q = circuit.add_register("q", 2 + t)?;
        circuit.append(phase_estimation(2, t, &u)?, q.wires())?;

        let result = Simulator::new().statevector(&circuit, &QState::from_str("00010")?)?;
        // b = 2, counting register = 2
        assert_approx_eq!(1.0, result.probabilities()[(2 << 2) | 2], 1e-9);
        Ok(())
    }

    #[test]
    fn test_unitary_arity_is_checked() {
        let u = Operation::from(GateKind::H);
        assert!(matches!(
            phase_estimation(2, 3, &u),
            Err(CircuitError::ArityMismatch { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn test_wide_counting_register_is_rejected() {
        let u = Operation::from(GateKind::Z);
        assert_eq!(
            phase_estimation(1, 33, &u).unwrap_err(),
            CircuitError::ExponentOverflow(32)
        );
    }

    #[test]
    fn test_controlled_powers_in_order() -> Result<()> {
        let u = Operation::from(GateKind::Z);
        let Operation::Composite(body) = phase_estimation(1, 3, &u)? else {
            panic!("phase estimation must be a composite");
        };
        assert_eq!(body.num_wires(), 4);
        for i in 0..3 {
            let step = &body.steps()[3 + i];
            assert_eq!(step.wires(), &[1 + i, 0]);
            let Operation::Controlled { inner, .. } = step.operation() else {
                panic!("expected a controlled power");
            };
            assert!(matches!(
                inner.as_ref(),
                Operation::Powered { exponent, .. } if *exponent == 1 << i
            ));
        }
        Ok(())
    }
}
