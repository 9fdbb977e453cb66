//! Controlled rotation ladders approximating a reciprocal eigenvalue.
//!
//! Three builders nest into one another. [`rotation_ladder`] is a binary
//! weighted sequence of `Rz` kicks over the workspace register.
//! [`controlled_ladders`] places one ladder per counting bit under the
//! control of that bit and one output bit. [`reciprocal_rotation`] stacks
//! the controlled ladders of every output bit.

use tracing::{debug, trace};

use crate::circuit::Circuit;
use crate::error::CircuitResult;
use crate::operation::{ControlState, Operation};

/// Scale of the ladder built for counting weight `u` and output weight `v`.
pub fn ladder_coefficient(m: usize, u: usize, v: usize, t0: f64) -> f64 {
    -t0 / 2.0_f64.powi(u as i32 + v as i32 - m as i32)
}

/// `Rz(coefficient / 2^(i+1))` on workspace wire `i`, for every `i < m`.
pub fn rotation_ladder(m: usize, u: usize, v: usize, t0: f64) -> CircuitResult<Operation> {
    let coefficient = ladder_coefficient(m, u, v, t0);

    let mut circuit = Circuit::new("ladder");
    let ws = circuit.add_register("m", m)?;
    for i in 0..m {
        circuit.rz(coefficient / 2.0_f64.powi(i as i32 + 1), ws.wire(i))?;
    }

    trace!(m, u, v, coefficient, "built rotation ladder");
    Ok(circuit.into_operation())
}

/// Ladders for output bit `k` over registers `c(t)`, `m(m)`, `l(l)`.
///
/// For counting bit `i` the ladder with `u = t - i`, `v = l - k` is applied
/// to the whole workspace when both `l[k]` and `c[i]` are set.
pub fn controlled_ladders(
    t: usize,
    m: usize,
    l: usize,
    k: usize,
    t0: f64,
) -> CircuitResult<Operation> {
    let mut circuit = Circuit::new("controlled_ladders");
    let c = circuit.add_register("c", t)?;
    let ws = circuit.add_register("m", m)?;
    let out = circuit.add_register("l", l)?;

    for i in 0..t {
        let ladder = rotation_ladder(m, t - i, l - k, t0)?.control(2, ControlState::all_set(2))?;
        let wires = [out.wire(k), c.wire(i)].into_iter().chain(ws.wires());
        circuit.append(ladder, wires)?;
    }

    trace!(t, m, l, k, "built controlled ladders");
    Ok(circuit.into_operation())
}

/// Every output bit's controlled ladders, in increasing bit order, over
/// registers `c(t)`, `m(m)`, `l(l)`.
pub fn reciprocal_rotation(t: usize, m: usize, l: usize, t0: f64) -> CircuitResult<Operation> {
    let mut circuit = Circuit::new("reciprocal_rotation");
    let c = circuit.add_register("c", t)?;
    let ws = circuit.add_register("m", m)?;
    let out = circuit.add_register("l", l)?;
    let all = c.wires().chain(ws.wires()).chain(out.wires()).collect::<Vec<_>>();

    for k in 0..l {
        circuit.append(controlled_ladders(t, m, l, k, t0)?, all.iter().copied())?;
    }

    debug!(t, m, l, t0, "built reciprocal rotation");
    Ok(circuit.into_operation())
}
