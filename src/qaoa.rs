//! Quantum approximate optimisation over weighted clauses.

use std::fmt;
use std::str::FromStr;

use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;
use nalgebra::DMatrix;
use num_complex::Complex;
use rand::Rng;
use tracing::{debug, info};

use crate::circuit::Circuit;
use crate::counts::Counts;
use crate::error::{CircuitError, CircuitResult};
use crate::gates::GateKind;
use crate::parameter::{Bindings, ParameterVector};
use crate::qstate::QState;
use crate::simulator::Simulator;

/// A weighted pattern over the variables, one of `0`, `1` or `X` (either)
/// per variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pattern: Vec<Option<bool>>,
    weight: f64,
}

impl Clause {
    pub fn new(pattern: &str, weight: f64) -> CircuitResult<Self> {
        let mut clause: Clause = pattern.parse()?;
        clause.weight = weight;
        Ok(clause)
    }

    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Check whether variable `j` of `bits` matches position `j`.
    pub fn is_satisfied(&self, bits: &[bool]) -> bool {
        self.pattern
            .iter()
            .zip(bits)
            .all(|(p, b)| p.map_or(true, |p| p == *b))
    }
}

impl FromStr for Clause {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pattern = s
            .chars()
            .map(|c| match c {
                '0' => Ok(Some(false)),
                '1' => Ok(Some(true)),
                'X' | 'x' => Ok(None),
                _ => Err(CircuitError::InvalidState(format!("invalid clause '{s}'"))),
            })
            .collect::<CircuitResult<Vec<_>>>()?;
        Ok(Self {
            pattern,
            weight: 1.0,
        })
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.pattern {
            let c = match p {
                Some(false) => '0',
                Some(true) => '1',
                None => 'X',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Two clauses per edge, one for each way of cutting it.
pub fn maxcut_clauses(num_vertices: usize, edges: &[(usize, usize)]) -> Vec<Clause> {
    let mut clauses = Vec::with_capacity(2 * edges.len());
    for &(a, b) in edges {
        for (va, vb) in [(false, true), (true, false)] {
            let mut pattern = vec![None; num_vertices];
            pattern[a] = Some(va);
            pattern[b] = Some(vb);
            clauses.push(Clause {
                pattern,
                weight: 1.0,
            });
        }
    }
    clauses
}

/// Variational angles, one pair per layer.
#[derive(Debug, Clone, PartialEq)]
pub struct QaoaParams {
    pub gamma: Vec<f64>,
    pub beta: Vec<f64>,
}

impl QaoaParams {
    /// Flatten as `[beta..., gamma...]`.
    fn to_vec(&self) -> Vec<f64> {
        self.beta.iter().chain(&self.gamma).copied().collect()
    }

    fn from_slice(values: &[f64], layers: usize) -> Self {
        Self {
            beta: values[..layers].to_vec(),
            gamma: values[layers..2 * layers].to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QaoaSolution {
    pub params: QaoaParams,
    pub expectation: f64,
    pub iterations: u64,
}

/// QAOA instance over a clause list.
///
/// Variable `j` of a clause is character `j` of a basis bitstring printed
/// highest wire first, so it lives on wire `n - 1 - j`.
#[derive(Debug, Clone)]
pub struct Qaoa {
    clauses: Vec<Clause>,
    num_vars: usize,
    layers: usize,
    shots: usize,
    max_iters: u64,
    gamma: ParameterVector,
    beta: ParameterVector,
    template: Circuit,
}

impl Qaoa {
    pub fn new(clauses: Vec<Clause>, layers: usize) -> CircuitResult<Self> {
        let num_vars = clauses.first().map(Clause::len).unwrap_or(0);
        if num_vars == 0 || clauses.iter().any(|c| c.len() != num_vars) {
            return Err(CircuitError::InvalidState(
                "clauses must be non-empty and of equal length".into(),
            ));
        }

        let mut qaoa = Self {
            clauses,
            num_vars,
            layers,
            shots: 1024,
            max_iters: 1000,
            gamma: ParameterVector::new("gamma", layers),
            beta: ParameterVector::new("beta", layers),
            template: Circuit::new("qaoa"),
        };
        qaoa.template = qaoa.build_template()?;
        Ok(qaoa)
    }

    pub fn with_shots(mut self, shots: usize) -> Self {
        self.shots = shots;
        self
    }

    pub fn with_max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    /// The unbound variational circuit.
    pub fn template(&self) -> &Circuit {
        &self.template
    }

    pub fn bitstring(&self, z: usize) -> String {
        format!("{:0width$b}", z, width = self.num_vars)
    }

    /// Total weight of the clauses satisfied by basis state `z`.
    pub fn cost(&self, z: usize) -> f64 {
        let bits: Vec<bool> = (0..self.num_vars)
            .map(|j| (z >> (self.num_vars - 1 - j)) & 1 == 1)
            .collect();
        self.clauses
            .iter()
            .filter(|c| c.is_satisfied(&bits))
            .map(Clause::weight)
            .sum()
    }

    fn cost_hamiltonian(&self) -> DMatrix<Complex<f64>> {
        let diagonal = (0..1_usize << self.num_vars)
            .map(|z| Complex::new(self.cost(z), 0.0))
            .collect::<Vec<_>>();
        DMatrix::from_diagonal(&nalgebra::DVector::from_vec(diagonal))
    }

    /// Hadamards, then per layer `exp(-i·gamma·C)` and `Rx(2·beta)` on
    /// every wire.
    fn build_template(&self) -> CircuitResult<Circuit> {
        let mut circuit = Circuit::new("qaoa");
        let q = circuit.add_register("q", self.num_vars)?;
        for wire in q.wires() {
            circuit.h(wire)?;
        }

        let hamiltonian = self.cost_hamiltonian();
        for i in 0..self.layers {
            let cost_layer = GateKind::evolution(hamiltonian.clone(), self.gamma.get(i))?;
            circuit.append(cost_layer, q.wires())?;
            for wire in q.wires() {
                circuit.rx(self.beta.get(i).scale(2.0), wire)?;
            }
        }
        Ok(circuit)
    }

    fn bind(&self, params: &QaoaParams) -> CircuitResult<Circuit> {
        let mut bindings = Bindings::new();
        bindings
            .insert_vector(&self.gamma, &params.gamma)?
            .insert_vector(&self.beta, &params.beta)?;
        self.template.bind(&bindings)
    }

    /// `<C>` from the exact final state.
    pub fn exact_expectation(&self, params: &QaoaParams) -> CircuitResult<f64> {
        let circuit = self.bind(params)?;
        let state = Simulator::new().statevector(&circuit, &QState::zero_state(self.num_vars))?;
        Ok(state
            .probabilities()
            .iter()
            .enumerate()
            .map(|(z, p)| p * self.cost(z))
            .sum())
    }

    /// `<C>` estimated from `shots` samples.
    pub fn sampled_expectation<R: Rng + ?Sized>(
        &self,
        params: &QaoaParams,
        rng: &mut R,
    ) -> CircuitResult<f64> {
        let counts = self.counts(params, self.shots, rng)?;
        Ok(counts
            .iter()
            .map(|(z, n)| self.cost(z) * n as f64 / self.shots as f64)
            .sum())
    }

    pub fn counts<R: Rng + ?Sized>(
        &self,
        params: &QaoaParams,
        shots: usize,
        rng: &mut R,
    ) -> CircuitResult<Counts> {
        let circuit = self.bind(params)?;
        Simulator::new().sample(&circuit, &QState::zero_state(self.num_vars), shots, rng)
    }

    /// Uniform random angles in `[0, 1)`.
    pub fn initial_params<R: Rng + ?Sized>(&self, rng: &mut R) -> QaoaParams {
        QaoaParams {
            gamma: (0..self.layers).map(|_| rng.random::<f64>()).collect(),
            beta: (0..self.layers).map(|_| rng.random::<f64>()).collect(),
        }
    }

    /// Maximise the exact expectation with Nelder-Mead.
    ///
    /// The simplex starts at [`Qaoa::initial_params`] plus one vertex per
    /// coordinate, shifted by a random step.
    pub fn optimize<R: Rng + ?Sized>(&self, rng: &mut R) -> CircuitResult<QaoaSolution> {
        let initial = self.initial_params(rng).to_vec();
        let mut simplex = vec![initial.clone()];
        for i in 0..initial.len() {
            let mut vertex = initial.clone();
            vertex[i] += 0.25 + 0.5 * rng.random::<f64>();
            simplex.push(vertex);
        }

        let problem = Objective { qaoa: self.clone() };
        let solver: NelderMead<Vec<f64>, f64> = NelderMead::new(simplex);
        let res = Executor::new(problem, solver)
            .configure(|state| state.max_iters(self.max_iters))
            .run()
            .map_err(|e| CircuitError::Optimization(e.to_string()))?;

        let best = res
            .state
            .get_best_param()
            .ok_or_else(|| CircuitError::Optimization("no best parameter found".into()))?;
        let params = QaoaParams::from_slice(best, self.layers);
        let expectation = -res.state.get_best_cost();
        let iterations = res.state.get_iter();

        info!(expectation, iterations, "QAOA optimisation finished");
        Ok(QaoaSolution {
            params,
            expectation,
            iterations,
        })
    }

    /// Most frequent basis state over the configured number of shots.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        params: &QaoaParams,
        rng: &mut R,
    ) -> CircuitResult<usize> {
        let counts = self.counts(params, self.shots, rng)?;
        let z = counts
            .most_frequent()
            .ok_or_else(|| CircuitError::InvalidState("no samples drawn".into()))?;
        debug!(bitstring = %self.bitstring(z), cost = self.cost(z), "sampled output");
        Ok(z)
    }
}

struct Objective {
    qaoa: Qaoa,
}

impl CostFunction for Objective {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> anyhow::Result<Self::Output> {
        let params = QaoaParams::from_slice(param, self.qaoa.layers);
        Ok(-self.qaoa.exact_expectation(&params)?)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::assert_approx_eq;

    use super::*;

    fn triangle() -> Result<Qaoa> {
        Ok(Qaoa::new(maxcut_clauses(3, &[(0, 1), (1, 2), (0, 2)]), 1)?)
    }

    #[test]
    fn test_clause_cost() -> Result<()> {
        let qaoa = Qaoa::new(vec!["10XX0".parse()?, Clause::new("11XXX", 2.0)?], 1)?;
        assert_approx_eq!(1.0, qaoa.cost(0b10000));
        assert_approx_eq!(2.0, qaoa.cost(0b11010));
        assert_approx_eq!(0.0, qaoa.cost(0b10001));
        assert_eq!(qaoa.bitstring(0b00110), "00110");
        assert!("10Y".parse::<Clause>().is_err());
        Ok(())
    }

    #[test]
    fn test_mismatched_clauses() -> Result<()> {
        assert!(Qaoa::new(vec!["10".parse()?, "1".parse()?], 1).is_err());
        assert!(Qaoa::new(vec![], 1).is_err());
        Ok(())
    }

    #[test]
    fn test_maxcut_clauses() {
        let clauses = maxcut_clauses(4, &[(0, 2)]);
        let patterns: Vec<_> = clauses.iter().map(|c| c.to_string()).collect();
        assert_eq!(patterns, vec!["0X1X", "1X0X"]);
    }

    #[test]
    fn test_template_tokens() -> Result<()> {
        let qaoa = Qaoa::new(maxcut_clauses(3, &[(0, 1)]), 2)?;
        let tokens: Vec<_> = qaoa.template().parameters().into_iter().collect();
        assert_eq!(tokens, vec!["beta[0]", "beta[1]", "gamma[0]", "gamma[1]"]);
        Ok(())
    }

    #[test]
    fn test_zero_angles_give_mean_cost() -> Result<()> {
        let qaoa = triangle()?;
        let zero = QaoaParams {
            gamma: vec![0.0],
            beta: vec![0.0],
        };
        assert_approx_eq!(1.5, qaoa.exact_expectation(&zero)?, 1e-9);
        Ok(())
    }

    #[test]
    fn test_known_optimum_on_triangle() -> Result<()> {
        let qaoa = triangle()?.with_shots(200);
        let params = QaoaParams {
            gamma: vec![3.7542032210398024],
            beta: vec![1.8771016105199012],
        };
        assert_approx_eq!(2.0, qaoa.exact_expectation(&params)?, 1e-3);

        let mut rng = StdRng::seed_from_u64(5);
        let z = qaoa.sample(&params, &mut rng)?;
        assert_approx_eq!(2.0, qaoa.cost(z));
        let estimate = qaoa.sampled_expectation(&params, &mut rng)?;
        assert!((estimate - 2.0).abs() < 0.05, "estimate = {estimate}");
        Ok(())
    }

    #[test]
    fn test_optimize_improves_on_start() -> Result<()> {
        let qaoa = triangle()?.with_max_iters(200);
        let rng = StdRng::seed_from_u64(17);
        let start = qaoa.initial_params(&mut rng.clone());
        let start_value = qaoa.exact_expectation(&start)?;

        let solution = qaoa.optimize(&mut rng.clone())?;
        assert!(solution.expectation >= start_value - 1e-9);
        assert!(solution.expectation <= 2.0 + 1e-9);
        assert_approx_eq!(
            solution.expectation,
            qaoa.exact_expectation(&solution.params)?,
            1e-9
        );
        Ok(())
    }
}
