//! Schumacher compression of blocks of single-qubit pure states.
//!
//! A source emits `n` states drawn from an ensemble. The transmitter rotates
//! every wire into the eigenbasis of the ensemble's density matrix and sorts
//! basis states by Hamming weight, so the typical subspace lands on the low
//! `m` wires. Only those wires cross the channel; the receiver resets the
//! rest and undoes the transmitter.

use nalgebra::DMatrix;
use num_complex::Complex;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use tracing::{debug, trace};

use crate::circuit::Circuit;
use crate::error::{CircuitError, CircuitResult};
use crate::parameter::{Bindings, ParameterVector};
use crate::qstate::QState;
use crate::simulator::Simulator;
use crate::Qbit;

const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Polar and azimuthal angle of a pure state on the Bloch sphere.
pub type BlochAngles = (f64, f64);

fn bloch_state((theta, phi): BlochAngles) -> [Qbit; 2] {
    [
        Complex::new((theta / 2.0).cos(), 0.0),
        Complex::from_polar((theta / 2.0).sin(), phi),
    ]
}

#[derive(Debug, Clone)]
pub struct Compressor {
    ensemble: Vec<(BlochAngles, f64)>,
    block_size: usize,
    compressed_size: usize,
    entropy: f64,
    density_matrix: DMatrix<Qbit>,
    theta: ParameterVector,
    phi: ParameterVector,
    noise: ParameterVector,
    source: Circuit,
    transmitter: Circuit,
    channel: Circuit,
    receiver: Circuit,
}

impl Compressor {
    /// Build the compression circuits for blocks of `block_size` states.
    ///
    /// Probabilities must be non-negative and sum to one.
    pub fn new(ensemble: Vec<(BlochAngles, f64)>, block_size: usize) -> CircuitResult<Self> {
        if ensemble.is_empty() || block_size == 0 {
            return Err(CircuitError::InvalidState(
                "compression needs a non-empty ensemble and block".into(),
            ));
        }
        let total: f64 = ensemble.iter().map(|(_, p)| p).sum();
        if ensemble.iter().any(|(_, p)| *p < 0.0) || (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(CircuitError::InvalidState(format!(
                "ensemble probabilities sum to {total}"
            )));
        }

        let mut density_matrix = DMatrix::<Qbit>::zeros(2, 2);
        for &(angles, p) in &ensemble {
            let state = bloch_state(angles);
            for (i, j) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                density_matrix[(i, j)] += state[i] * state[j].conj() * p;
            }
        }

        let eigen = density_matrix.clone().symmetric_eigen();
        let (major, minor) = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] {
            (0, 1)
        } else {
            (1, 0)
        };
        let entropy = -eigen
            .eigenvalues
            .iter()
            .filter(|&&p| p > PROBABILITY_TOLERANCE)
            .map(|p| p * p.log2())
            .sum::<f64>();
        let compressed_size = (entropy * block_size as f64 - PROBABILITY_TOLERANCE)
            .ceil()
            .max(0.0) as usize;
        let compressed_size = compressed_size.min(block_size);

        let mut typical = DMatrix::<Qbit>::zeros(2, 2);
        typical.set_column(0, &eigen.eigenvectors.column(major));
        typical.set_column(1, &eigen.eigenvectors.column(minor));
        let basis_change = typical.adjoint();

        let theta = ParameterVector::new("theta", block_size);
        let phi = ParameterVector::new("phi", block_size);
        let noise = ParameterVector::new("noise", compressed_size);

        let mut source = Circuit::new("source");
        let q = source.add_register("q", block_size)?;
        for i in q.wires() {
            source.ry(theta.get(i), i)?.rz(phi.get(i), i)?;
        }

        let mut transmitter = Circuit::new("tx");
        transmitter.add_register("q", block_size)?;
        for i in q.wires() {
            transmitter.unitary("basis", basis_change.clone(), [i])?;
        }
        transmitter.unitary("perm", weight_sorting_permutation(block_size), q.wires())?;

        let mut channel = Circuit::new("channel");
        channel.add_register("q", block_size)?;
        for i in 0..compressed_size {
            channel.rx(noise.get(i), i)?;
        }

        let mut receiver = Circuit::new("rx");
        receiver.add_register("q", block_size)?;
        for i in compressed_size..block_size {
            receiver.reset(i)?;
        }
        receiver.append(transmitter.clone().into_operation().inverse()?, q.wires())?;

        debug!(block_size, compressed_size, entropy, "built compressor");
        Ok(Self {
            ensemble,
            block_size,
            compressed_size,
            entropy,
            density_matrix,
            theta,
            phi,
            noise,
            source,
            transmitter,
            channel,
            receiver,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Wires sent through the channel, `ceil(S·n)`.
    pub fn compressed_size(&self) -> usize {
        self.compressed_size
    }

    /// Von Neumann entropy of the ensemble in bits.
    pub fn entropy(&self) -> f64 {
        self.entropy
    }

    pub fn density_matrix(&self) -> &DMatrix<Qbit> {
        &self.density_matrix
    }

    /// Prepares wire `i` with tokens `theta[i]` and `phi[i]`.
    pub fn source(&self) -> &Circuit {
        &self.source
    }

    pub fn transmitter(&self) -> &Circuit {
        &self.transmitter
    }

    /// `Rx(noise[i])` on each compressed wire; `π` flips the bit.
    pub fn channel(&self) -> &Circuit {
        &self.channel
    }

    pub fn receiver(&self) -> &Circuit {
        &self.receiver
    }

    /// Source, transmitter, channel and receiver in sequence.
    pub fn circuit(&self) -> CircuitResult<Circuit> {
        let mut circuit = Circuit::new("compression");
        circuit.add_register("q", self.block_size)?;
        circuit
            .extend_from(&self.source)?
            .extend_from(&self.transmitter)?
            .extend_from(&self.channel)?
            .extend_from(&self.receiver)?;
        Ok(circuit)
    }

    /// Run `trials` random blocks through the full circuit and return the
    /// fidelity of each received block with the one sent.
    ///
    /// Each compressed wire is flipped independently with `bit_flip_prob`.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        trials: usize,
        bit_flip_prob: f64,
        rng: &mut R,
    ) -> CircuitResult<Vec<f64>> {
        if !(0.0..=1.0).contains(&bit_flip_prob) {
            return Err(CircuitError::InvalidState(format!(
                "bit flip probability {bit_flip_prob} outside [0, 1]"
            )));
        }
        let choice = WeightedIndex::new(self.ensemble.iter().map(|(_, p)| *p))
            .map_err(|e| CircuitError::InvalidState(e.to_string()))?;
        let circuit = self.circuit()?;
        let simulator = Simulator::new();
        let zero = QState::zero_state(self.block_size);

        let mut fidelities = Vec::with_capacity(trials);
        for trial in 0..trials {
            let (thetas, phis): (Vec<f64>, Vec<f64>) = (0..self.block_size)
                .map(|_| self.ensemble[choice.sample(rng)].0)
                .unzip();
            let flips: Vec<f64> = (0..self.compressed_size)
                .map(|_| {
                    if rng.random::<f64>() < bit_flip_prob {
                        std::f64::consts::PI
                    } else {
                        0.0
                    }
                })
                .collect();

            let mut bindings = Bindings::new();
            bindings
                .insert_vector(&self.theta, &thetas)?
                .insert_vector(&self.phi, &phis)?
                .insert_vector(&self.noise, &flips)?;

            let sent = simulator.statevector(&self.source.bind(&bindings)?, &zero)?;
            let received = simulator.run(&circuit.bind(&bindings)?, &zero, rng)?;
            let fidelity = sent.fidelity(&received)?;
            trace!(trial, fidelity, "compression trial");
            fidelities.push(fidelity);
        }
        Ok(fidelities)
    }
}

/// Permutation sending the `k`-th basis state in Hamming-weight order to
/// basis state `k`. Ties keep ascending index order.
fn weight_sorting_permutation(num_wires: usize) -> DMatrix<Qbit> {
    let dim = 1_usize << num_wires;
    let mut order: Vec<usize> = (0..dim).collect();
    order.sort_by_key(|x| x.count_ones());

    let mut permutation = DMatrix::zeros(dim, dim);
    for (k, &source) in order.iter().enumerate() {
        permutation[(k, source)] = Complex::new(1.0, 0.0);
    }
    permutation
}
