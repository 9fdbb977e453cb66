//! Primitive gate vocabulary and the dense matrices behind it.

use std::f64::consts::FRAC_PI_4;
use std::fmt;
use std::sync::Arc;

use nalgebra::DMatrix;
use num_complex::Complex;

use crate::error::{CircuitError, CircuitResult};
use crate::parameter::{Bindings, Param};
use crate::Qbit;

const MATRIX_TOLERANCE: f64 = 1e-9;

pub fn h_matrix() -> DMatrix<Qbit> {
    let v = Complex::new(1.0 / 2.0_f64.sqrt(), 0.0);
    DMatrix::from_row_slice(2, 2, &[v, v, v, -v])
}

pub fn x_matrix() -> DMatrix<Qbit> {
    DMatrix::from_row_slice(
        2,
        2,
        &[Complex::ZERO, Complex::new(1.0, 0.0), Complex::new(1.0, 0.0), Complex::ZERO],
    )
}

pub fn y_matrix() -> DMatrix<Qbit> {
    DMatrix::from_row_slice(
        2,
        2,
        &[Complex::ZERO, Complex::new(0.0, -1.0), Complex::new(0.0, 1.0), Complex::ZERO],
    )
}

pub fn z_matrix() -> DMatrix<Qbit> {
    phase_matrix(std::f64::consts::PI)
}

pub fn s_matrix() -> DMatrix<Qbit> {
    phase_matrix(2.0 * FRAC_PI_4)
}

pub fn t_matrix() -> DMatrix<Qbit> {
    phase_matrix(FRAC_PI_4)
}

/// diag(1, e^{iθ})
pub fn phase_matrix(theta: f64) -> DMatrix<Qbit> {
    DMatrix::from_row_slice(
        2,
        2,
        &[
            Complex::new(1.0, 0.0),
            Complex::ZERO,
            Complex::ZERO,
            Complex::from_polar(1.0, theta),
        ],
    )
}

pub fn rx_matrix(theta: f64) -> DMatrix<Qbit> {
    let c = Complex::new((theta / 2.0).cos(), 0.0);
    let s = Complex::new(0.0, -(theta / 2.0).sin());
    DMatrix::from_row_slice(2, 2, &[c, s, s, c])
}

pub fn ry_matrix(theta: f64) -> DMatrix<Qbit> {
    let c = Complex::new((theta / 2.0).cos(), 0.0);
    let s = Complex::new((theta / 2.0).sin(), 0.0);
    DMatrix::from_row_slice(2, 2, &[c, -s, s, c])
}

pub fn rz_matrix(theta: f64) -> DMatrix<Qbit> {
    DMatrix::from_row_slice(
        2,
        2,
        &[
            Complex::from_polar(1.0, -theta / 2.0),
            Complex::ZERO,
            Complex::ZERO,
            Complex::from_polar(1.0, theta / 2.0),
        ],
    )
}

pub fn swap_matrix() -> DMatrix<Qbit> {
    let mut m = DMatrix::zeros(4, 4);
    m[(0, 0)] = Complex::new(1.0, 0.0);
    m[(1, 2)] = Complex::new(1.0, 0.0);
    m[(2, 1)] = Complex::new(1.0, 0.0);
    m[(3, 3)] = Complex::new(1.0, 0.0);
    m
}

/// `exp(-i·H·time)` for a Hermitian `H`.
pub fn evolution_matrix(hamiltonian: &DMatrix<Qbit>, time: f64) -> DMatrix<Qbit> {
    if is_diagonal(hamiltonian) {
        let phases = hamiltonian
            .diagonal()
            .map(|h| Complex::from_polar(1.0, -h.re * time));
        return DMatrix::from_diagonal(&phases);
    }

    let eigen = hamiltonian.clone().symmetric_eigen();
    let phases = eigen
        .eigenvalues
        .map(|lambda| Complex::from_polar(1.0, -lambda * time));
    &eigen.eigenvectors * DMatrix::from_diagonal(&phases) * eigen.eigenvectors.adjoint()
}

/// `matrix^exponent` by repeated squaring.
pub fn matrix_power(matrix: &DMatrix<Qbit>, exponent: u32) -> DMatrix<Qbit> {
    let mut result = DMatrix::identity(matrix.nrows(), matrix.ncols());
    let mut base = matrix.clone();
    let mut e = exponent;
    while e > 0 {
        if e & 1 == 1 {
            result = &result * &base;
        }
        e >>= 1;
        if e > 0 {
            base = &base * &base;
        }
    }
    result
}

fn is_diagonal(matrix: &DMatrix<Qbit>) -> bool {
    matrix.iter().enumerate().all(|(k, v)| {
        let (row, col) = (k % matrix.nrows(), k / matrix.nrows());
        row == col || v.norm() < MATRIX_TOLERANCE
    })
}

fn num_wires_for(matrix: &DMatrix<Qbit>) -> CircuitResult<usize> {
    let dim = matrix.nrows();
    if dim != matrix.ncols() {
        return Err(CircuitError::InvalidMatrix(format!(
            "expected a square matrix, got {}x{}",
            dim,
            matrix.ncols()
        )));
    }
    if dim < 2 || !dim.is_power_of_two() {
        return Err(CircuitError::InvalidMatrix(format!(
            "dimension {dim} is not a positive power of two"
        )));
    }
    Ok(dim.ilog2() as usize)
}

/// Primitive gate kinds.
///
/// Two-wire controlled kinds take `[control, target]`. For dense kinds the
/// first wire is the least significant bit of the matrix index.
#[derive(Debug, Clone, PartialEq)]
pub enum GateKind {
    H,
    X,
    Y,
    Z,
    S,
    Sdg,
    T,
    Tdg,
    Rx(Param),
    Ry(Param),
    Rz(Param),
    Phase(Param),

    CNot,
    Cz,
    CPhase(Param),
    CRy(Param),
    Swap,

    /// A fixed dense unitary.
    Unitary {
        label: String,
        matrix: Arc<DMatrix<Qbit>>,
    },
    /// Time evolution `exp(-i·H·time)` under a Hermitian `H`.
    Evolution {
        hamiltonian: Arc<DMatrix<Qbit>>,
        time: Param,
    },

    /// Identity marker where the backend injects channel noise.
    Noise,
    /// Non-unitary reset to |0>.
    Reset,
}

impl GateKind {
    /// A dense unitary gate; fails unless `matrix` is unitary.
    pub fn unitary(label: impl Into<String>, matrix: DMatrix<Qbit>) -> CircuitResult<Self> {
        num_wires_for(&matrix)?;
        let product = matrix.adjoint() * &matrix;
        let identity = DMatrix::<Qbit>::identity(matrix.nrows(), matrix.ncols());
        if (product - identity).iter().any(|v| v.norm() > MATRIX_TOLERANCE) {
            return Err(CircuitError::InvalidMatrix("matrix is not unitary".into()));
        }
        Ok(GateKind::Unitary {
            label: label.into(),
            matrix: Arc::new(matrix),
        })
    }

    /// Time evolution under `hamiltonian`; fails unless it is Hermitian.
    pub fn evolution(hamiltonian: DMatrix<Qbit>, time: impl Into<Param>) -> CircuitResult<Self> {
        num_wires_for(&hamiltonian)?;
        let adjoint = hamiltonian.adjoint();
        if (&hamiltonian - adjoint)
            .iter()
            .any(|v| v.norm() > MATRIX_TOLERANCE)
        {
            return Err(CircuitError::InvalidMatrix(
                "Hamiltonian is not Hermitian".into(),
            ));
        }
        Ok(GateKind::Evolution {
            hamiltonian: Arc::new(hamiltonian),
            time: time.into(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            GateKind::H => "h",
            GateKind::X => "x",
            GateKind::Y => "y",
            GateKind::Z => "z",
            GateKind::S => "s",
            GateKind::Sdg => "sdg",
            GateKind::T => "t",
            GateKind::Tdg => "tdg",
            GateKind::Rx(_) => "rx",
            GateKind::Ry(_) => "ry",
            GateKind::Rz(_) => "rz",
            GateKind::Phase(_) => "p",
            GateKind::CNot => "cx",
            GateKind::Cz => "cz",
            GateKind::CPhase(_) => "cp",
            GateKind::CRy(_) => "cry",
            GateKind::Swap => "swap",
            GateKind::Unitary { label, .. } => label,
            GateKind::Evolution { .. } => "evolution",
            GateKind::Noise => "noise",
            GateKind::Reset => "reset",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            GateKind::CNot
            | GateKind::Cz
            | GateKind::CPhase(_)
            | GateKind::CRy(_)
            | GateKind::Swap => 2,
            GateKind::Unitary { matrix, .. } => matrix.nrows().ilog2() as usize,
            GateKind::Evolution { hamiltonian, .. } => hamiltonian.nrows().ilog2() as usize,
            _ => 1,
        }
    }

    /// Number of leading wires that act as controls (required state |1>).
    pub fn num_controls(&self) -> usize {
        match self {
            GateKind::CNot | GateKind::Cz | GateKind::CPhase(_) | GateKind::CRy(_) => 1,
            _ => 0,
        }
    }

    pub fn is_unitary(&self) -> bool {
        !matches!(self, GateKind::Reset)
    }

    /// The adjoint kind, `None` for non-unitary kinds.
    pub fn adjoint(&self) -> Option<GateKind> {
        let adjoint = match self {
            GateKind::H
            | GateKind::X
            | GateKind::Y
            | GateKind::Z
            | GateKind::CNot
            | GateKind::Cz
            | GateKind::Swap
            | GateKind::Noise => self.clone(),
            GateKind::S => GateKind::Sdg,
            GateKind::Sdg => GateKind::S,
            GateKind::T => GateKind::Tdg,
            GateKind::Tdg => GateKind::T,
            GateKind::Rx(p) => GateKind::Rx(-p.clone()),
            GateKind::Ry(p) => GateKind::Ry(-p.clone()),
            GateKind::Rz(p) => GateKind::Rz(-p.clone()),
            GateKind::Phase(p) => GateKind::Phase(-p.clone()),
            GateKind::CPhase(p) => GateKind::CPhase(-p.clone()),
            GateKind::CRy(p) => GateKind::CRy(-p.clone()),
            GateKind::Unitary { label, matrix } => GateKind::Unitary {
                label: format!("{label}_dg"),
                matrix: Arc::new(matrix.adjoint()),
            },
            GateKind::Evolution { hamiltonian, time } => GateKind::Evolution {
                hamiltonian: Arc::clone(hamiltonian),
                time: -time.clone(),
            },
            GateKind::Reset => return None,
        };
        Some(adjoint)
    }

    pub fn params(&self) -> Vec<&Param> {
        match self {
            GateKind::Rx(p)
            | GateKind::Ry(p)
            | GateKind::Rz(p)
            | GateKind::Phase(p)
            | GateKind::CPhase(p)
            | GateKind::CRy(p) => vec![p],
            GateKind::Evolution { time, .. } => vec![time],
            _ => vec![],
        }
    }

    pub fn is_parameterized(&self) -> bool {
        self.params().iter().any(|p| p.is_symbolic())
    }

    pub fn bind(&self, bindings: &Bindings) -> CircuitResult<GateKind> {
        let bound = match self {
            GateKind::Rx(p) => GateKind::Rx(p.bind(bindings)?),
            GateKind::Ry(p) => GateKind::Ry(p.bind(bindings)?),
            GateKind::Rz(p) => GateKind::Rz(p.bind(bindings)?),
            GateKind::Phase(p) => GateKind::Phase(p.bind(bindings)?),
            GateKind::CPhase(p) => GateKind::CPhase(p.bind(bindings)?),
            GateKind::CRy(p) => GateKind::CRy(p.bind(bindings)?),
            GateKind::Evolution { hamiltonian, time } => GateKind::Evolution {
                hamiltonian: Arc::clone(hamiltonian),
                time: time.bind(bindings)?,
            },
            other => other.clone(),
        };
        Ok(bound)
    }

    /// Dense matrix acting on the non-control wires.
    pub fn target_matrix(&self) -> CircuitResult<DMatrix<Qbit>> {
        let matrix = match self {
            GateKind::H => h_matrix(),
            GateKind::X | GateKind::CNot => x_matrix(),
            GateKind::Y => y_matrix(),
            GateKind::Z | GateKind::Cz => z_matrix(),
            GateKind::S => s_matrix(),
            GateKind::Sdg => s_matrix().adjoint(),
            GateKind::T => t_matrix(),
            GateKind::Tdg => t_matrix().adjoint(),
            GateKind::Rx(p) => rx_matrix(p.value()?),
            GateKind::Ry(p) | GateKind::CRy(p) => ry_matrix(p.value()?),
            GateKind::Rz(p) => rz_matrix(p.value()?),
            GateKind::Phase(p) | GateKind::CPhase(p) => phase_matrix(p.value()?),
            GateKind::Swap => swap_matrix(),
            GateKind::Unitary { matrix, .. } => matrix.as_ref().clone(),
            GateKind::Evolution { hamiltonian, time } => {
                evolution_matrix(hamiltonian, time.value()?)
            }
            GateKind::Noise => DMatrix::identity(2, 2),
            GateKind::Reset => return Err(CircuitError::NonUnitary(self.name().to_string())),
        };
        Ok(matrix)
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.params();
        if params.is_empty() {
            write!(f, "{}", self.name())
        } else {
            let params = params
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "{}({})", self.name(), params)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use crate::assert_approx_complex_eq;

    use super::*;

    #[test]
    fn test_arity_and_controls() {
        assert_eq!(GateKind::H.arity(), 1);
        assert_eq!(GateKind::CPhase(Param::Value(PI)).arity(), 2);
        assert_eq!(GateKind::CRy(Param::Value(PI)).num_controls(), 1);
        assert_eq!(GateKind::Swap.num_controls(), 0);
    }

    #[test]
    fn test_adjoint_table() {
        assert_eq!(GateKind::H.adjoint(), Some(GateKind::H));
        assert_eq!(GateKind::S.adjoint(), Some(GateKind::Sdg));
        assert_eq!(
            GateKind::CPhase(Param::Value(0.5)).adjoint(),
            Some(GateKind::CPhase(Param::Value(-0.5)))
        );
        assert_eq!(GateKind::Reset.adjoint(), None);
    }

    #[test]
    fn test_symbolic_matrix_is_unbound() {
        let gate = GateKind::Rz(Param::token("theta"));
        assert!(gate.is_parameterized());
        assert_eq!(
            gate.target_matrix().unwrap_err(),
            CircuitError::UnboundParameter("theta".into())
        );
    }

    #[test]
    fn test_evolution_of_pauli_x() -> anyhow::Result<()> {
        // exp(-i X π/2) = -i X
        let gate = GateKind::evolution(x_matrix(), PI / 2.0)?;
        let m = gate.target_matrix()?;
        assert_approx_complex_eq!(0.0, 0.0, m[(0, 0)]);
        assert_approx_complex_eq!(0.0, -1.0, m[(0, 1)]);
        assert_approx_complex_eq!(0.0, -1.0, m[(1, 0)]);
        assert_approx_complex_eq!(0.0, 0.0, m[(1, 1)]);
        Ok(())
    }

    #[test]
    fn test_evolution_of_diagonal() -> anyhow::Result<()> {
        let mut h = DMatrix::zeros(2, 2);
        h[(1, 1)] = Complex::new(2.0, 0.0);
        let m = GateKind::evolution(h, PI / 4.0)?.target_matrix()?;
        assert_approx_complex_eq!(1.0, 0.0, m[(0, 0)]);
        assert_approx_complex_eq!(0.0, -1.0, m[(1, 1)]);
        Ok(())
    }

    #[test]
    fn test_invalid_matrices() {
        let non_hermitian = DMatrix::from_row_slice(
            2,
            2,
            &[Complex::ZERO, Complex::new(1.0, 0.0), Complex::ZERO, Complex::ZERO],
        );
        assert!(matches!(
            GateKind::evolution(non_hermitian.clone(), 1.0),
            Err(CircuitError::InvalidMatrix(_))
        ));
        assert!(matches!(
            GateKind::unitary("u", non_hermitian),
            Err(CircuitError::InvalidMatrix(_))
        ));
        assert!(matches!(
            GateKind::unitary("u", DMatrix::identity(3, 3)),
            Err(CircuitError::InvalidMatrix(_))
        ));
    }

    #[test]
    fn test_matrix_power() {
        let t = t_matrix();
        let z = matrix_power(&t, 4);
        assert_approx_complex_eq!(1.0, 0.0, z[(0, 0)]);
        assert_approx_complex_eq!(-1.0, 0.0, z[(1, 1)]);
        let id = matrix_power(&t, 8);
        assert_approx_complex_eq!(1.0, 0.0, id[(1, 1)]);
    }
}
