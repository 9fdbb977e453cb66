//! Statevector execution of bound circuits.
//!
//! A circuit is first lowered into a flat list of placed gates: every
//! composite is expanded, controls are accumulated, inversions are pushed
//! down to the primitives and powers of a single gate become one matrix
//! power. Each placed gate is then expanded to a sparse matrix over the
//! whole register and multiplied into the state.

use nalgebra::DMatrix;
use nalgebra_sparse::{coo::CooMatrix, csr::CsrMatrix};
use num_complex::Complex;
use rand::distr::{weighted::WeightedIndex, Distribution};
use rand::Rng;
use tracing::{debug, trace};

use crate::circuit::Circuit;
use crate::counts::Counts;
use crate::error::{CircuitError, CircuitResult};
use crate::gates::{matrix_power, x_matrix, GateKind};
use crate::noise::NoiseModel;
use crate::operation::Operation;
use crate::qstate::QState;
use crate::Qbit;

/// A dense matrix placed on `targets`, active when every control matches.
#[derive(Debug, Clone)]
struct PlacedGate {
    controls: Vec<(usize, bool)>,
    targets: Vec<usize>,
    matrix: DMatrix<Qbit>,
}

#[derive(Debug, Clone)]
enum Instruction {
    Gate(PlacedGate),
    Noise(usize),
    Reset(usize),
}

fn lower(circuit: &Circuit) -> CircuitResult<Vec<Instruction>> {
    let mut instructions = Vec::new();
    for step in circuit.steps() {
        lower_operation(step.operation(), step.wires(), &[], false, &mut instructions)?;
    }
    Ok(instructions)
}

fn lower_operation(
    operation: &Operation,
    wires: &[usize],
    controls: &[(usize, bool)],
    adjoint: bool,
    out: &mut Vec<Instruction>,
) -> CircuitResult<()> {
    match operation {
        Operation::Primitive(GateKind::Noise) | Operation::Primitive(GateKind::Reset)
            if !controls.is_empty() =>
        {
            Err(CircuitError::NonUnitary(operation.name()))
        }
        Operation::Primitive(GateKind::Noise) => {
            out.push(Instruction::Noise(wires[0]));
            Ok(())
        }
        Operation::Primitive(GateKind::Reset) if adjoint => {
            Err(CircuitError::NoKnownAdjoint(operation.name()))
        }
        Operation::Primitive(GateKind::Reset) => {
            out.push(Instruction::Reset(wires[0]));
            Ok(())
        }
        Operation::Primitive(kind) => {
            let kind = if adjoint {
                kind.adjoint()
                    .ok_or_else(|| CircuitError::NoKnownAdjoint(kind.name().to_string()))?
            } else {
                kind.clone()
            };
            let num_controls = kind.num_controls();
            let mut all_controls = controls.to_vec();
            all_controls.extend(wires[..num_controls].iter().map(|&w| (w, true)));
            out.push(Instruction::Gate(PlacedGate {
                controls: all_controls,
                targets: wires[num_controls..].to_vec(),
                matrix: kind.target_matrix()?,
            }));
            Ok(())
        }
        Operation::Composite(body) => {
            let mapped = |local: &[usize]| local.iter().map(|&w| wires[w]).collect::<Vec<_>>();
            if adjoint {
                for step in body.steps().iter().rev() {
                    lower_operation(step.operation(), &mapped(step.wires()), controls, true, out)?;
                }
            } else {
                for step in body.steps() {
                    lower_operation(step.operation(), &mapped(step.wires()), controls, false, out)?;
                }
            }
            Ok(())
        }
        Operation::Controlled {
            inner,
            control_state,
        } => {
            let k = control_state.len();
            let mut all_controls = controls.to_vec();
            let bits = control_state.bits().iter().copied();
            all_controls.extend(wires[..k].iter().copied().zip(bits));
            lower_operation(inner, &wires[k..], &all_controls, adjoint, out)
        }
        Operation::Powered { inner, exponent } => {
            let mut body = Vec::new();
            lower_operation(inner, wires, controls, adjoint, &mut body)?;
            if let [Instruction::Gate(gate)] = body.as_mut_slice() {
                gate.matrix = matrix_power(&gate.matrix, *exponent);
                out.append(&mut body);
            } else {
                for _ in 0..*exponent {
                    out.extend(body.iter().cloned());
                }
            }
            Ok(())
        }
        Operation::Inverted { inner } => lower_operation(inner, wires, controls, !adjoint, out),
    }
}

/// Full-register sparse matrix of a placed gate.
fn expand(gate: &PlacedGate, num_wires: usize) -> CsrMatrix<Qbit> {
    let dim = 1_usize << num_wires;
    let local_dim = gate.matrix.nrows();
    let target_mask = gate
        .targets
        .iter()
        .fold(0_usize, |acc, &w| acc | (1_usize << w));

    let mut coo = CooMatrix::new(dim, dim);
    for col in 0..dim {
        let active = gate
            .controls
            .iter()
            .all(|&(w, bit)| ((col >> w) & 1 == 1) == bit);
        if !active {
            coo.push(col, col, Complex::new(1.0, 0.0));
            continue;
        }

        let local_col = gather(col, &gate.targets);
        for local_row in 0..local_dim {
            let value = gate.matrix[(local_row, local_col)];
            if value.norm_sqr() > 0.0 {
                let row = (col & !target_mask) | scatter(local_row, &gate.targets);
                coo.push(row, col, value);
            }
        }
    }

    CsrMatrix::from(&coo)
}

fn gather(index: usize, wires: &[usize]) -> usize {
    wires
        .iter()
        .enumerate()
        .fold(0, |acc, (j, &w)| acc | (((index >> w) & 1) << j))
}

fn scatter(local: usize, wires: &[usize]) -> usize {
    wires
        .iter()
        .enumerate()
        .fold(0, |acc, (j, &w)| acc | (((local >> j) & 1) << w))
}

/// Statevector backend with an optional noise channel.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    noise: Option<NoiseModel>,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `noise` at every noise marker in trajectory runs.
    pub fn with_noise(mut self, noise: NoiseModel) -> Self {
        self.noise = Some(noise);
        self
    }

    pub fn noise(&self) -> Option<&NoiseModel> {
        self.noise.as_ref()
    }

    fn prepare(&self, circuit: &Circuit, state: &QState) -> CircuitResult<Vec<Instruction>> {
        if state.num_of_qbits() != circuit.num_wires() {
            return Err(CircuitError::InvalidState(format!(
                "{} qubit state for a circuit of {} wires",
                state.num_of_qbits(),
                circuit.num_wires()
            )));
        }
        if let Some(token) = circuit.parameters().into_iter().next() {
            return Err(CircuitError::UnboundParameter(token));
        }

        let instructions = lower(circuit)?;
        debug!(
            circuit = circuit.name(),
            wires = circuit.num_wires(),
            instructions = instructions.len(),
            "lowered circuit"
        );
        Ok(instructions)
    }

    /// Exact noiseless evolution of `state`.
    ///
    /// Noise markers act as identity. Resets are rejected.
    pub fn statevector(&self, circuit: &Circuit, state: &QState) -> CircuitResult<QState> {
        let instructions = self.prepare(circuit, state)?;
        let num_wires = circuit.num_wires();

        let mut result = state.state.clone();
        for instruction in &instructions {
            match instruction {
                Instruction::Gate(gate) => {
                    let matrix = expand(gate, num_wires);
                    result = &matrix * result;
                }
                Instruction::Noise(_) => {}
                Instruction::Reset(_) => return Err(CircuitError::NonUnitary("reset".into())),
            }
        }
        Ok(QState { state: result })
    }

    /// One stochastic trajectory: noise markers draw an error from the
    /// configured model and resets measure the wire and flip it back to |0>.
    pub fn run<R: Rng + ?Sized>(
        &self,
        circuit: &Circuit,
        state: &QState,
        rng: &mut R,
    ) -> CircuitResult<QState> {
        let instructions = self.prepare(circuit, state)?;
        self.run_instructions(&instructions, state, circuit.num_wires(), rng)
    }

    fn run_instructions<R: Rng + ?Sized>(
        &self,
        instructions: &[Instruction],
        state: &QState,
        num_wires: usize,
        rng: &mut R,
    ) -> CircuitResult<QState> {
        let mut result = state.state.clone();
        for instruction in instructions {
            match instruction {
                Instruction::Gate(gate) => {
                    let matrix = expand(gate, num_wires);
                    result = &matrix * result;
                }
                Instruction::Noise(wire) => {
                    let error = self.noise.as_ref().and_then(|n| n.sample_error(rng));
                    if let Some(error) = error {
                        trace!(wire, error = error.name(), "noise");
                        let gate = PlacedGate {
                            controls: vec![],
                            targets: vec![*wire],
                            matrix: error.target_matrix()?,
                        };
                        result = &expand(&gate, num_wires) * result;
                    }
                }
                Instruction::Reset(wire) => {
                    let mask = 1_usize << wire;
                    let p1: f64 = result
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| i & mask != 0)
                        .map(|(_, a)| a.norm_sqr())
                        .sum();
                    let outcome = rng.random::<f64>() < p1;
                    trace!(wire, outcome, "reset");

                    let norm = if outcome { p1 } else { 1.0 - p1 }.sqrt();
                    if norm == 0.0 {
                        return Err(CircuitError::InvalidState("zero norm after reset".into()));
                    }
                    for (i, a) in result.iter_mut().enumerate() {
                        if (i & mask != 0) != outcome {
                            *a = Complex::ZERO;
                        } else {
                            *a /= norm;
                        }
                    }
                    if outcome {
                        let flip = PlacedGate {
                            controls: vec![],
                            targets: vec![*wire],
                            matrix: x_matrix(),
                        };
                        result = &expand(&flip, num_wires) * result;
                    }
                }
            }
        }
        Ok(QState { state: result })
    }

    /// Measure every wire `shots` times.
    ///
    /// Deterministic circuits are evolved once and sampled from the final
    /// distribution; otherwise each shot runs its own trajectory.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        circuit: &Circuit,
        state: &QState,
        shots: usize,
        rng: &mut R,
    ) -> CircuitResult<Counts> {
        let instructions = self.prepare(circuit, state)?;
        let num_wires = circuit.num_wires();
        let stochastic = instructions.iter().any(|i| match i {
            Instruction::Reset(_) => true,
            Instruction::Noise(_) => self.noise.is_some(),
            Instruction::Gate(_) => false,
        });

        let mut counts = Counts::new(num_wires);
        if stochastic {
            for shot in 0..shots {
                let final_state = self.run_instructions(&instructions, state, num_wires, rng)?;
                counts.record(measure(&final_state, rng)?);
                if shot > 0 && shot % 1000 == 0 {
                    debug!("Completed {} shots", shot);
                }
            }
        } else {
            let final_state = self.run_instructions(&instructions, state, num_wires, rng)?;
            let dist = WeightedIndex::new(final_state.probabilities())
                .map_err(|e| CircuitError::InvalidState(e.to_string()))?;
            for _ in 0..shots {
                counts.record(dist.sample(rng));
            }
        }

        debug!(shots, outcomes = counts.iter().count(), "sampling done");
        Ok(counts)
    }
}

fn measure<R: Rng + ?Sized>(state: &QState, rng: &mut R) -> CircuitResult<usize> {
    let dist = WeightedIndex::new(state.probabilities())
        .map_err(|e| CircuitError::InvalidState(e.to_string()))?;
    Ok(dist.sample(rng))
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use anyhow::Result;
    use proptest::strategy::{Just, Strategy};
    use proptest::{prop_assert, prop_assert_eq, proptest};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::operation::ControlState;
    use crate::parameter::Param;
    use crate::{assert_approx_complex_eq, assert_approx_eq};

    use super::*;

    #[test]
    /// Hadamard test for Hadamard gate
    fn test_hadamard_test() -> Result<()> {
        let mut circuit = Circuit::new("hadamard_test");
        let q = circuit.add_register("q", 2)?;
        let ch = Operation::from(GateKind::H).control(1, ControlState::all_set(1))?;
        circuit
            .h(q.wire(0))?
            .append(ch, [q.wire(0), q.wire(1)])?
            .h(q.wire(0))?;
        let result = Simulator::new().statevector(&circuit, &QState::zero_state(2))?;

        assert_approx_complex_eq!((2f64.sqrt() + 2.0) / 4.0, 0.0, result.state[0]);
        assert_approx_complex_eq!((-2f64.sqrt() + 2.0) / 4.0, 0.0, result.state[1]);
        assert_approx_complex_eq!(2f64.sqrt() / 4.0, 0.0, result.state[2]);
        assert_approx_complex_eq!(-2f64.sqrt() / 4.0, 0.0, result.state[3]);

        Ok(())
    }

    #[test]
    fn test_unitary_wire_order() -> Result<()> {
        // |x0 x1> -> |x0, x1 xor x0> with wires[0] as the low bit
        let mut cnot = DMatrix::zeros(4, 4);
        for (row, col) in [(0, 0), (3, 1), (2, 2), (1, 3)] {
            cnot[(row, col)] = Complex::new(1.0, 0.0);
        }
        let mut circuit = Circuit::new("u");
        circuit.add_register("q", 3)?;
        circuit.unitary("cnot", cnot, [2, 0])?;

        let result = Simulator::new().statevector(&circuit, &QState::from_str("100")?)?;
        assert_approx_complex_eq!(1.0, 0.0, result.state[0b101]);
        Ok(())
    }

    #[test]
    fn test_power_one_matches_operation() -> Result<()> {
        let rz = Operation::from(GateKind::Rz(Param::Value(0.4)));
        let mut direct = Circuit::new("direct");
        direct.add_register("q", 1)?;
        direct.h(0)?.append(rz.clone(), [0])?;
        let mut powered = Circuit::new("powered");
        powered.add_register("q", 1)?;
        powered.h(0)?.append(rz.power(1)?, [0])?;

        let sim = Simulator::new();
        let a = sim.statevector(&direct, &QState::zero_state(1))?;
        let b = sim.statevector(&powered, &QState::zero_state(1))?;
        assert_approx_eq!(1.0, a.fidelity(&b)?);
        Ok(())
    }

    #[test]
    fn test_powered_composite_repeats_body() -> Result<()> {
        let mut body = Circuit::new("body");
        body.add_register("q", 1)?;
        body.h(0)?.t(0)?;
        let op = body.into_operation().power(3)?;

        let mut powered = Circuit::new("powered");
        powered.add_register("q", 1)?;
        powered.append(op, [0])?;
        let mut unrolled = Circuit::new("unrolled");
        unrolled.add_register("q", 1)?;
        for _ in 0..3 {
            unrolled.h(0)?.t(0)?;
        }

        let sim = Simulator::new();
        let a = sim.statevector(&powered, &QState::zero_state(1))?;
        let b = sim.statevector(&unrolled, &QState::zero_state(1))?;
        assert_approx_eq!(1.0, a.fidelity(&b)?);
        Ok(())
    }

    #[test]
    fn test_inverted_controlled_power() -> Result<()> {
        let op = Operation::from(GateKind::Phase(Param::Value(PI / 8.0)))
            .power(4)?
            .control(1, ControlState::all_set(1))?;
        let mut circuit = Circuit::new("c");
        circuit.add_register("q", 2)?;
        circuit
            .x(0)?
            .x(1)?
            .append(op.clone(), [0, 1])?
            .append(op.inverse()?, [0, 1])?
            .append(op, [0, 1])?;

        let result = Simulator::new().statevector(&circuit, &QState::zero_state(2))?;
        // net phase e^{iπ/2} on |11>
        assert_approx_complex_eq!(0.0, 1.0, result.state[3]);
        Ok(())
    }

    #[test]
    fn test_statevector_rejects_reset_and_tokens() -> Result<()> {
        let mut circuit = Circuit::new("c");
        circuit.add_register("q", 1)?;
        circuit.reset(0)?;
        assert!(matches!(
            Simulator::new().statevector(&circuit, &QState::zero_state(1)),
            Err(CircuitError::NonUnitary(_))
        ));

        let mut template = Circuit::new("t");
        template.add_register("q", 1)?;
        template.ry(Param::token("a"), 0)?;
        assert_eq!(
            Simulator::new()
                .statevector(&template, &QState::zero_state(1))
                .unwrap_err(),
            CircuitError::UnboundParameter("a".into())
        );
        assert!(matches!(
            Simulator::new().statevector(&template, &QState::zero_state(2)),
            Err(CircuitError::InvalidState(_))
        ));
        Ok(())
    }

    #[test]
    fn test_reset_trajectory() -> Result<()> {
        let mut circuit = Circuit::new("c");
        circuit.add_register("q", 2)?;
        circuit.h(0)?.cx(0, 1)?.reset(0)?.reset(1)?;

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            let result = Simulator::new().run(&circuit, &QState::zero_state(2), &mut rng)?;
            assert_approx_eq!(1.0, result.state[0].norm());
        }
        Ok(())
    }

    #[test]
    fn test_sampling_bell_state() -> Result<()> {
        let mut circuit = Circuit::new("bell");
        circuit.add_register("q", 2)?;
        circuit.h(0)?.cx(0, 1)?;

        let mut rng = StdRng::seed_from_u64(42);
        let counts = Simulator::new().sample(&circuit, &QState::zero_state(2), 1000, &mut rng)?;
        assert_eq!(counts.total(), 1000);
        assert_eq!(counts.get(0b01) + counts.get(0b10), 0);
        let p = counts.frequency(0b11);
        assert!((p - 0.5).abs() < 0.1, "p = {p}");
        Ok(())
    }

    #[test]
    fn test_certain_bit_flip_noise() -> Result<()> {
        let mut circuit = Circuit::new("noisy");
        circuit.add_register("q", 1)?;
        circuit.noise(0)?;

        let mut rng = StdRng::seed_from_u64(1);
        let sim = Simulator::new().with_noise(NoiseModel::bit_flip(1.0)?);
        let counts = sim.sample(&circuit, &QState::zero_state(1), 20, &mut rng)?;
        assert_eq!(counts.get(1), 20);

        // exact mode ignores markers
        let result = sim.statevector(&circuit, &QState::zero_state(1))?;
        assert_approx_complex_eq!(1.0, 0.0, result.state[0]);
        Ok(())
    }

    fn controlled_case() -> impl Strategy<Value = (usize, u64, usize)> {
        (1usize..=3).prop_flat_map(|k| (Just(k), 0u64..1 << k, 0usize..1 << (k + 1)))
    }

    proptest! {
        #[test]
        fn prop_control_acts_only_on_matching_state((k, bits, input) in controlled_case()) {
            let op = Operation::from(GateKind::X)
                .control(k, ControlState::from_bits(bits, k))
                .unwrap();
            prop_assert_eq!(op.arity(), k + 1);

            let mut circuit = Circuit::new("c");
            let q = circuit.add_register("q", k + 1).unwrap();
            circuit.append(op, q.wires()).unwrap();
            let mut amplitudes = vec![Complex::ZERO; 1 << (k + 1)];
            amplitudes[input] = Complex::new(1.0, 0.0);
            let result = Simulator::new()
                .statevector(&circuit, &QState::new(&amplitudes).unwrap())
                .unwrap();

            let controls = (input & ((1 << k) - 1)) as u64;
            let expected = if controls == bits { input ^ (1 << k) } else { input };
            prop_assert!((result.state[expected].norm() - 1.0).abs() < 1e-12);
        }

        #[test]
        fn prop_power_one_matches_composite(theta in -PI..PI, phi in -PI..PI) {
            let mut body = Circuit::new("body");
            body.add_register("q", 2).unwrap();
            body.rx(theta, 0).unwrap().cry(phi, 0, 1).unwrap();
            let op = body.into_operation();

            let mut direct = Circuit::new("direct");
            direct.add_register("q", 2).unwrap();
            direct.h(0).unwrap().append(op.clone(), [0, 1]).unwrap();
            let mut powered = Circuit::new("powered");
            powered.add_register("q", 2).unwrap();
            powered.h(0).unwrap().append(op.power(1).unwrap(), [0, 1]).unwrap();

            let sim = Simulator::new();
            let a = sim.statevector(&direct, &QState::zero_state(2)).unwrap();
            let b = sim.statevector(&powered, &QState::zero_state(2)).unwrap();
            prop_assert!((a.fidelity(&b).unwrap() - 1.0).abs() < 1e-12);
        }

        #[test]
        fn prop_bind_is_idempotent(a in -PI..PI) {
            let mut template = Circuit::new("t");
            template.add_register("q", 1).unwrap();
            template.ry(Param::token("a"), 0).unwrap().rz(-Param::token("a"), 0).unwrap();

            let bindings = crate::parameter::Bindings::from_iter([("a".to_string(), a)]);
            let once = template.bind(&bindings).unwrap();
            let twice = once.bind(&bindings).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert!(!once.is_parameterized());
            prop_assert!(template.is_parameterized());
        }
    }
}
