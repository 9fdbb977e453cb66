//! Linear-system solver circuits.
//!
//! The full construction runs a forward block (phase estimation, workspace
//! preparation and the reciprocal rotation), rotates an ancilla conditioned
//! on the output register and uncomputes the forward block. The compact
//! variant reads the eigenvalue register directly with a `CRy` ladder.

use std::f64::consts::PI;

use nalgebra::DMatrix;
use num_complex::Complex;
use tracing::debug;

use crate::circuit::Circuit;
use crate::error::{CircuitError, CircuitResult};
use crate::gates::GateKind;
use crate::operation::Operation;
use crate::phase_estimation::phase_estimation;
use crate::qstate::QState;
use crate::rotation::reciprocal_rotation;
use crate::Qbit;

/// Register sizes of the full solver circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HhlSize {
    /// Solution register `b`.
    pub n: usize,
    /// Eigenvalue (counting) register `c`.
    pub t: usize,
    /// Workspace register `m`.
    pub m: usize,
    /// Output register `l`.
    pub l: usize,
}

impl HhlSize {
    pub fn new(n: usize, t: usize, m: usize, l: usize) -> Self {
        Self { n, t, m, l }
    }

    /// Wires of the forward block.
    pub fn forward_wires(&self) -> usize {
        self.n + self.t + self.m + self.l
    }
}

/// `exp(-i·A·time)` for a real symmetric system matrix `A`.
pub fn time_evolution(matrix: &DMatrix<f64>, time: f64) -> CircuitResult<Operation> {
    if matrix.nrows() != matrix.ncols() {
        return Err(CircuitError::InvalidMatrix(format!(
            "system matrix is {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    let hamiltonian = matrix.map(|v| Complex::new(v, 0.0));
    Ok(GateKind::evolution(hamiltonian, time)?.into())
}

/// Phase estimation under `U = exp(+i·A·t0/2^t)`.
///
/// The counting register of an eigenvector with eigenvalue `λ` reads
/// `λ·t0/2π` (mod `2^t`).
fn eigenvalue_estimation(
    matrix: &DMatrix<f64>,
    t0: f64,
    n: usize,
    t: usize,
) -> CircuitResult<Operation> {
    let step = t0 / 2.0_f64.powi(t as i32);
    let unitary = time_evolution(matrix, -step)?;
    phase_estimation(n, t, &unitary)
}

/// The forward block over registers `b`, `c`, `m`, `l`.
pub fn forward(size: HhlSize, matrix: &DMatrix<f64>, t0: f64) -> CircuitResult<Operation> {
    let HhlSize { n, t, m, l } = size;

    let mut circuit = Circuit::new("forward");
    let b = circuit.add_register("b", n)?;
    let c = circuit.add_register("c", t)?;
    let ws = circuit.add_register("m", m)?;
    let out = circuit.add_register("l", l)?;

    circuit.append(
        eigenvalue_estimation(matrix, t0, n, t)?,
        b.wires().chain(c.wires()),
    )?;
    for wire in ws.wires().chain(out.wires()) {
        circuit.h(wire)?;
    }
    for i in 0..m {
        circuit.rz(t0 / 2.0_f64.powi((m - i) as i32), ws.wire(i))?;
    }
    circuit.append(
        reciprocal_rotation(t, m, l, t0)?,
        c.wires().chain(ws.wires()).chain(out.wires()),
    )?;

    debug!(n, t, m, l, t0, "built forward block");
    Ok(circuit.into_operation())
}

/// Forward block, ancilla rotation `CRy(theta)^(2^k)` controlled by `l[k]`,
/// then the inverse forward block.
///
/// Registers are `b`, `c`, `m`, `l` and a single-wire `anc`.
pub fn hhl_circuit(
    matrix: &DMatrix<f64>,
    t0: f64,
    theta: f64,
    size: HhlSize,
) -> CircuitResult<Circuit> {
    let fwd = forward(size, matrix, t0)?;

    let mut circuit = Circuit::new("hhl");
    let b = circuit.add_register("b", size.n)?;
    let c = circuit.add_register("c", size.t)?;
    let ws = circuit.add_register("m", size.m)?;
    let out = circuit.add_register("l", size.l)?;
    let anc = circuit.add_register("anc", 1)?;
    let all = b
        .wires()
        .chain(c.wires())
        .chain(ws.wires())
        .chain(out.wires())
        .collect::<Vec<_>>();

    circuit.append(fwd.clone(), all.iter().copied())?;
    for k in 0..size.l {
        let rotation = Operation::from(GateKind::CRy(theta.into())).power_of_two(k)?;
        circuit.append(rotation, [out.wire(k), anc.wire(0)])?;
    }
    circuit.append(fwd.inverse()?, all.iter().copied())?;

    debug!(?size, theta, steps = circuit.len(), "built HHL circuit");
    Ok(circuit)
}

/// Eigenvalue inversion by a `CRy(π·2^(t-i-r))` ladder from each counting
/// bit `c[i]` onto the ancilla, between phase estimation and its inverse.
///
/// Registers are `b(n)`, `c(t)` and `anc(1)`. The ladder realises a
/// rotation proportional to `1/λ` when the eigenvalues are powers of two.
pub fn compact_hhl_circuit(
    matrix: &DMatrix<f64>,
    t0: f64,
    r: i32,
    n: usize,
    t: usize,
) -> CircuitResult<Circuit> {
    let qpe = eigenvalue_estimation(matrix, t0, n, t)?;

    let mut circuit = Circuit::new("compact_hhl");
    let b = circuit.add_register("b", n)?;
    let c = circuit.add_register("c", t)?;
    let anc = circuit.add_register("anc", 1)?;

    circuit.append(qpe.clone(), b.wires().chain(c.wires()))?;
    for i in 0..t {
        let angle = PI * 2.0_f64.powi(t as i32 - i as i32 - r);
        circuit.cry(angle, c.wire(i), anc.wire(0))?;
    }
    circuit.append(qpe.inverse()?, b.wires().chain(c.wires()))?;

    debug!(n, t, r, t0, "built compact HHL circuit");
    Ok(circuit)
}

/// Amplitudes of register `b` with the ancilla at |1> and every other wire
/// at |0>, unnormalised.
pub fn solution_amplitudes(circuit: &Circuit, state: &QState) -> CircuitResult<Vec<Qbit>> {
    let missing = |name: &str| CircuitError::InvalidState(format!("no register '{name}'"));
    let b = circuit.register("b").ok_or_else(|| missing("b"))?;
    let anc = circuit.register("anc").ok_or_else(|| missing("anc"))?;

    let b_wires: Vec<usize> = b.wires().collect();
    let position = (0..circuit.num_wires())
        .filter(|w| !b_wires.contains(w))
        .position(|w| w == anc.wire(0))
        .ok_or_else(|| missing("anc"))?;

    Ok(state.slice(&b_wires, 1 << position))
}
