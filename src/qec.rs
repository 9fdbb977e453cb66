//! Three- and five-qubit error-correcting codes built from fixed gate tables.
//!
//! Both codes share one layout: a `code` register followed by a `syndrome`
//! register. The pieces (encoder, noise layer, syndrome extraction,
//! correction, decoder) are separate circuits over that layout so they can
//! be chained with any channel in between.

use tracing::debug;

use crate::circuit::Circuit;
use crate::error::{CircuitError, CircuitResult};
use crate::gates::GateKind;
use crate::operation::{ControlState, Operation};
use crate::qstate::QState;
use crate::register::Register;

#[derive(Debug, Clone, Copy)]
enum Pauli {
    X,
    Y,
    Z,
}

impl Pauli {
    fn gate(self) -> GateKind {
        match self {
            Pauli::X => GateKind::X,
            Pauli::Y => GateKind::Y,
            Pauli::Z => GateKind::Z,
        }
    }
}

/// Syndrome wire, check, code wire.
const FIVE_QUBIT_CHECKS: [(usize, Pauli, usize); 16] = [
    (0, Pauli::Z, 4),
    (0, Pauli::X, 3),
    (0, Pauli::X, 2),
    (0, Pauli::Z, 1),
    (1, Pauli::X, 4),
    (1, Pauli::X, 3),
    (1, Pauli::Z, 2),
    (1, Pauli::Z, 0),
    (2, Pauli::X, 4),
    (2, Pauli::Z, 3),
    (2, Pauli::Z, 1),
    (2, Pauli::X, 0),
    (3, Pauli::Z, 4),
    (3, Pauli::Z, 2),
    (3, Pauli::X, 1),
    (3, Pauli::X, 0),
];

/// Correction, syndrome written highest syndrome wire first, code wire.
const FIVE_QUBIT_CORRECTIONS: [(Pauli, &str, usize); 15] = [
    (Pauli::X, "0010", 0),
    (Pauli::Y, "1110", 0),
    (Pauli::Z, "1100", 0),
    (Pauli::X, "0101", 1),
    (Pauli::Y, "1101", 1),
    (Pauli::Z, "1000", 1),
    (Pauli::X, "1010", 2),
    (Pauli::Y, "1011", 2),
    (Pauli::Z, "0001", 2),
    (Pauli::X, "0100", 3),
    (Pauli::Y, "0111", 3),
    (Pauli::Z, "0011", 3),
    (Pauli::X, "1001", 4),
    (Pauli::Y, "1111", 4),
    (Pauli::Z, "0110", 4),
];

/// Syndrome value (bit `j` from syndrome wire `j`) and the code wire flipped.
const THREE_QUBIT_CORRECTIONS: [(u64, usize); 3] = [(0b10, 2), (0b11, 1), (0b01, 0)];

/// The circuits of one code over a shared `code`/`syndrome` layout.
#[derive(Debug, Clone)]
pub struct CodeCircuits {
    code: Register,
    syndrome: Register,
    logical_wire: usize,
    encoder: Circuit,
    noise: Circuit,
    syndrome_extraction: Circuit,
    correction: Circuit,
    decoder: Circuit,
    circuit: Circuit,
}

impl CodeCircuits {
    fn assemble(
        code: Register,
        syndrome: Register,
        logical_wire: usize,
        encoder: Circuit,
        syndrome_extraction: Circuit,
        correction: Circuit,
    ) -> CircuitResult<Self> {
        let (mut noise, _, _) = layout("noise", code.size(), syndrome.size())?;
        for wire in code.wires() {
            noise.noise(wire)?;
        }
        let decoder = encoder.inverse()?;

        let mut parts = Self {
            code,
            syndrome,
            logical_wire,
            encoder,
            noise,
            syndrome_extraction,
            correction,
            decoder,
            circuit: Circuit::default(),
        };
        parts.circuit = parts.with_channel(&parts.noise)?;
        Ok(parts)
    }

    pub fn code(&self) -> &Register {
        &self.code
    }

    pub fn syndrome(&self) -> &Register {
        &self.syndrome
    }

    /// Wire holding the logical state before encoding and after decoding.
    pub fn logical_wire(&self) -> usize {
        self.logical_wire
    }

    pub fn num_wires(&self) -> usize {
        self.code.size() + self.syndrome.size()
    }

    pub fn encoder(&self) -> &Circuit {
        &self.encoder
    }

    /// One noise marker per code wire.
    pub fn noise_layer(&self) -> &Circuit {
        &self.noise
    }

    pub fn syndrome_extraction(&self) -> &Circuit {
        &self.syndrome_extraction
    }

    pub fn correction(&self) -> &Circuit {
        &self.correction
    }

    pub fn decoder(&self) -> &Circuit {
        &self.decoder
    }

    /// Encoder, noise layer, syndrome extraction, correction and decoder.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// The full correcting chain with `channel` in place of the noise layer.
    ///
    /// `channel` must use the same layout as the code.
    pub fn with_channel(&self, channel: &Circuit) -> CircuitResult<Circuit> {
        let (mut circuit, _, _) = layout("qec", self.code.size(), self.syndrome.size())?;
        circuit
            .extend_from(&self.encoder)?
            .extend_from(channel)?
            .extend_from(&self.syndrome_extraction)?
            .extend_from(&self.correction)?
            .extend_from(&self.decoder)?;
        Ok(circuit)
    }

    /// Encoder, `channel` and decoder with no correction in between.
    pub fn uncorrected(&self, channel: &Circuit) -> CircuitResult<Circuit> {
        let (mut circuit, _, _) = layout("uncorrected", self.code.size(), self.syndrome.size())?;
        circuit
            .extend_from(&self.encoder)?
            .extend_from(channel)?
            .extend_from(&self.decoder)?;
        Ok(circuit)
    }

    /// An empty circuit over the code layout, for preparing inputs and
    /// building channels.
    pub fn blank(&self, name: &str) -> CircuitResult<Circuit> {
        layout(name, self.code.size(), self.syndrome.size()).map(|(circuit, _, _)| circuit)
    }

    /// Fidelity of the code register of `output` against that of
    /// `reference`, traced over the syndrome register.
    ///
    /// `reference` is read with the syndrome register at zero.
    pub fn logical_fidelity(&self, reference: &QState, output: &QState) -> CircuitResult<f64> {
        for state in [reference, output] {
            if state.num_of_qbits() != self.num_wires() {
                return Err(CircuitError::InvalidState(format!(
                    "{} qubit state for a {} wire code",
                    state.num_of_qbits(),
                    self.num_wires()
                )));
            }
        }

        let wires: Vec<usize> = self.code.wires().collect();
        let expected = reference.slice(&wires, 0);
        let fidelity = (0..1_usize << self.syndrome.size())
            .map(|rest| {
                expected
                    .iter()
                    .zip(output.slice(&wires, rest))
                    .map(|(a, b)| a.conj() * b)
                    .sum::<crate::Qbit>()
                    .norm_sqr()
            })
            .sum();
        Ok(fidelity)
    }
}

fn layout(
    name: &str,
    code_size: usize,
    syndrome_size: usize,
) -> CircuitResult<(Circuit, Register, Register)> {
    let mut circuit = Circuit::new(name);
    let code = circuit.add_register("code", code_size)?;
    let syndrome = circuit.add_register("syndrome", syndrome_size)?;
    Ok((circuit, code, syndrome))
}

/// Bit-flip repetition code over `code(3)` and `syndrome(2)`.
///
/// The logical state enters on `code[0]`. Any single `X` error on the code
/// register is corrected; phase errors pass through.
#[derive(Debug, Clone)]
pub struct ThreeQubitCode {
    circuits: CodeCircuits,
}

impl ThreeQubitCode {
    pub fn new() -> CircuitResult<Self> {
        let (mut encoder, code, syndrome) = layout("encoder", 3, 2)?;
        encoder.cx(code.wire(0), code.wire(1))?;
        encoder.cx(code.wire(0), code.wire(2))?;

        let (mut extraction, _, _) = layout("syndrome", 3, 2)?;
        for wire in syndrome.wires() {
            extraction.h(wire)?;
        }
        extraction
            .cz(syndrome.wire(1), code.wire(2))?
            .cz(syndrome.wire(1), code.wire(1))?
            .cz(syndrome.wire(0), code.wire(1))?
            .cz(syndrome.wire(0), code.wire(0))?;
        for wire in syndrome.wires() {
            extraction.h(wire)?;
        }

        let (mut correction, _, _) = layout("correction", 3, 2)?;
        for (value, target) in THREE_QUBIT_CORRECTIONS {
            let flip =
                Operation::from(GateKind::X).control(2, ControlState::from_bits(value, 2))?;
            correction.append(flip, syndrome.wires().chain([code.wire(target)]))?;
        }

        let circuits = CodeCircuits::assemble(
            code.clone(),
            syndrome,
            code.wire(0),
            encoder,
            extraction,
            correction,
        )?;
        debug!(steps = circuits.circuit().len(), "built three qubit code");
        Ok(Self { circuits })
    }

    pub fn circuits(&self) -> &CodeCircuits {
        &self.circuits
    }
}

/// Five-qubit perfect code over `code(5)` and `syndrome(4)`.
///
/// The logical state enters on `code[4]`. Any single-qubit Pauli error on
/// the code register is corrected.
#[derive(Debug, Clone)]
pub struct FiveQubitCode {
    circuits: CodeCircuits,
}

impl FiveQubitCode {
    pub fn new() -> CircuitResult<Self> {
        let (mut encoder, code, syndrome) = layout("encoder", 5, 4)?;
        let c = |i: usize| code.wire(i);
        encoder
            .z(c(4))?
            .h(c(4))?
            .z(c(4))?
            .cx(c(4), c(3))?
            .h(c(4))?
            .h(c(3))?
            .cx(c(4), c(2))?
            .cx(c(3), c(2))?
            .h(c(2))?
            .cx(c(4), c(1))?
            .cx(c(2), c(1))?
            .h(c(1))?
            .h(c(4))?
            .cx(c(4), c(0))?
            .cx(c(3), c(0))?
            .cx(c(2), c(0))?
            .h(c(3))?
            .h(c(4))?;

        let (mut extraction, _, _) = layout("syndrome", 5, 4)?;
        for wire in syndrome.wires() {
            extraction.h(wire)?;
        }
        for (s, check, target) in FIVE_QUBIT_CHECKS {
            match check {
                Pauli::Z => extraction.cz(syndrome.wire(s), c(target))?,
                _ => extraction.cx(syndrome.wire(s), c(target))?,
            };
        }
        for wire in syndrome.wires() {
            extraction.h(wire)?;
        }

        let (mut correction, _, _) = layout("correction", 5, 4)?;
        for (pauli, state, target) in FIVE_QUBIT_CORRECTIONS {
            let fix = Operation::from(pauli.gate()).control(4, state.parse()?)?;
            correction.append(fix, syndrome.wires().chain([c(target)]))?;
        }

        let circuits =
            CodeCircuits::assemble(code.clone(), syndrome, c(4), encoder, extraction, correction)?;
        debug!(steps = circuits.circuit().len(), "built five qubit code");
        Ok(Self { circuits })
    }

    pub fn circuits(&self) -> &CodeCircuits {
        &self.circuits
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use anyhow::Result;

    use crate::{assert_approx_eq, Simulator};

    use super::*;

    fn prepared(code: &CodeCircuits) -> Result<QState> {
        let mut prep = code.blank("prep")?;
        prep.ry(PI / 3.0, code.logical_wire())?
            .rz(PI / 4.0, code.logical_wire())?;
        Ok(Simulator::new().statevector(&prep, &QState::zero_state(code.num_wires()))?)
    }

    fn corrected(code: &CodeCircuits, error: GateKind, wire: usize) -> Result<f64> {
        let input = prepared(code)?;
        let mut channel = code.blank("channel")?;
        channel.append(error, [wire])?;
        let output = Simulator::new().statevector(&code.with_channel(&channel)?, &input)?;
        Ok(code.logical_fidelity(&input, &output)?)
    }

    #[test]
    fn test_three_qubit_corrects_every_bit_flip() -> Result<()> {
        let code = ThreeQubitCode::new()?;
        let code = code.circuits();
        for wire in code.code().wires() {
            assert_approx_eq!(1.0, corrected(code, GateKind::X, wire)?, 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_three_qubit_misses_phase_flip() -> Result<()> {
        let code = ThreeQubitCode::new()?;
        // logical Z on ry(π/3) leaves |<ψ|Z|ψ>|² = cos²(π/3)
        assert_approx_eq!(0.25, corrected(code.circuits(), GateKind::Z, 0)?, 1e-9);
        Ok(())
    }

    #[test]
    fn test_five_qubit_corrects_every_single_error() -> Result<()> {
        let code = FiveQubitCode::new()?;
        let code = code.circuits();
        for wire in code.code().wires() {
            for error in [GateKind::X, GateKind::Y, GateKind::Z] {
                let fidelity = corrected(code, error.clone(), wire)?;
                assert!((fidelity - 1.0).abs() < 1e-9, "{error} on {wire}: {fidelity}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_uncorrected_bit_flip_degrades() -> Result<()> {
        let code = FiveQubitCode::new()?;
        let code = code.circuits();
        let input = prepared(code)?;
        let mut channel = code.blank("channel")?;
        channel.x(code.code().wire(2))?;
        let output = Simulator::new().statevector(&code.uncorrected(&channel)?, &input)?;
        assert!(code.logical_fidelity(&input, &output)? < 0.99);
        Ok(())
    }

    #[test]
    fn test_layout() -> Result<()> {
        let three = ThreeQubitCode::new()?;
        let five = FiveQubitCode::new()?;
        assert_eq!(three.circuits().circuit().num_wires(), 5);
        assert_eq!(five.circuits().circuit().num_wires(), 9);
        assert_eq!(five.circuits().noise_layer().len(), 5);
        assert_eq!(five.circuits().correction().len(), 15);
        assert_eq!(&five.circuits().encoder().inverse()?, five.circuits().decoder());
        assert_eq!(
            three.circuits().syndrome().wires().collect::<Vec<_>>(),
            vec![3, 4]
        );
        Ok(())
    }

    #[test]
    fn test_noise_markers_are_identity_without_model() -> Result<()> {
        let code = FiveQubitCode::new()?;
        let code = code.circuits();
        let input = prepared(code)?;
        let output = Simulator::new().statevector(code.circuit(), &input)?;
        assert_approx_eq!(1.0, code.logical_fidelity(&input, &output)?, 1e-9);
        Ok(())
    }
}
