//! Polymorphic circuit content: primitives, closed sub-circuits and the
//! control, power and inversion wrappers around them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::trace;

use crate::circuit::Circuit;
use crate::error::{CircuitError, CircuitResult};
use crate::gates::GateKind;
use crate::parameter::Bindings;

/// Required values of the control wires, one flag per control.
///
/// Flag `j` belongs to the `j`-th control wire passed at application time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlState(Vec<bool>);

impl ControlState {
    /// Every control must be |1>.
    pub fn all_set(num_controls: usize) -> Self {
        Self(vec![true; num_controls])
    }

    /// Bit `j` of `bits` is the required value of control `j`.
    pub fn from_bits(bits: u64, num_controls: usize) -> Self {
        Self(
            (0..num_controls)
                .map(|j| {
                    u32::try_from(j)
                        .ok()
                        .and_then(|j| bits.checked_shr(j))
                        .is_some_and(|b| b & 1 == 1)
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bits(&self) -> &[bool] {
        &self.0
    }
}

/// Parses a bitstring written most significant control first, so the last
/// character is the state of control 0.
impl FromStr for ControlState {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .rev()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(CircuitError::InvalidControlString(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.0.iter().rev() {
            write!(f, "{}", if *bit { '1' } else { '0' })?;
        }
        Ok(())
    }
}

/// A unit of circuit content with a fixed wire arity.
///
/// Operations are immutable once built. Wrappers hold their inner operation
/// behind an [`Arc`], so one closed sub-circuit can be reused in many places
/// without copying.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Primitive(GateKind),
    /// A closed circuit used as a single gate.
    Composite(Arc<Circuit>),
    /// The first `control_state.len()` wires are controls, the rest are
    /// forwarded to `inner`.
    Controlled {
        inner: Arc<Operation>,
        control_state: ControlState,
    },
    /// `inner` applied `exponent` times in a row.
    Powered { inner: Arc<Operation>, exponent: u32 },
    /// The adjoint of `inner`.
    Inverted { inner: Arc<Operation> },
}

impl Operation {
    pub fn arity(&self) -> usize {
        match self {
            Operation::Primitive(kind) => kind.arity(),
            Operation::Composite(body) => body.num_wires(),
            Operation::Controlled {
                inner,
                control_state,
            } => inner.arity() + control_state.len(),
            Operation::Powered { inner, .. } | Operation::Inverted { inner } => inner.arity(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Operation::Primitive(kind) => kind.name().to_string(),
            Operation::Composite(body) => body.name().to_string(),
            Operation::Controlled {
                inner,
                control_state,
            } if control_state.len() == 1 => format!("c-{}", inner.name()),
            Operation::Controlled {
                inner,
                control_state,
            } => format!("c{}-{}", control_state.len(), inner.name()),
            Operation::Powered { inner, exponent } => format!("{}^{}", inner.name(), exponent),
            Operation::Inverted { inner } => format!("{}_dg", inner.name()),
        }
    }

    /// Lift under `num_controls` extra control wires.
    ///
    /// Fails when the state length differs from `num_controls`, when no
    /// control is requested, or when the operation contains a reset.
    pub fn control(
        &self,
        num_controls: usize,
        control_state: ControlState,
    ) -> CircuitResult<Operation> {
        if num_controls == 0 || control_state.len() != num_controls {
            return Err(CircuitError::InvalidControlState {
                expected: num_controls,
                got: control_state.len(),
            });
        }
        if !self.is_unitary() {
            return Err(CircuitError::NonUnitary(self.name()));
        }

        trace!(op = %self.name(), %control_state, "control");
        Ok(Operation::Controlled {
            inner: Arc::new(self.clone()),
            control_state,
        })
    }

    /// Repeat `exponent` times.
    pub fn power(&self, exponent: u32) -> CircuitResult<Operation> {
        if exponent == 0 {
            return Err(CircuitError::InvalidExponent(exponent));
        }
        Ok(Operation::Powered {
            inner: Arc::new(self.clone()),
            exponent,
        })
    }

    /// Repeat `2^k` times.
    pub fn power_of_two(&self, k: usize) -> CircuitResult<Operation> {
        let exponent = u32::try_from(k)
            .ok()
            .and_then(|k| 1u32.checked_shl(k))
            .ok_or(CircuitError::ExponentOverflow(k))?;
        self.power(exponent)
    }

    /// The inverse, sharing the wrapped structure.
    ///
    /// Primitives are replaced by their adjoint kind and a double inversion
    /// unwraps. Everything else is checked for invertibility and wrapped.
    pub fn inverse(&self) -> CircuitResult<Operation> {
        match self {
            Operation::Primitive(kind) => kind
                .adjoint()
                .map(Operation::Primitive)
                .ok_or_else(|| CircuitError::NoKnownAdjoint(kind.name().to_string())),
            Operation::Inverted { inner } => Ok(inner.as_ref().clone()),
            _ => {
                self.check_invertible()?;
                Ok(Operation::Inverted {
                    inner: Arc::new(self.clone()),
                })
            }
        }
    }

    /// The inverse with every wrapper pushed down to the primitives.
    ///
    /// Composite bodies are reversed and each step replaced by its adjoint.
    /// Controlled and powered operations keep their controls and exponent.
    pub fn adjoint(&self) -> CircuitResult<Operation> {
        let adjoint = match self {
            Operation::Primitive(_) => self.inverse()?,
            Operation::Composite(body) => Operation::Composite(Arc::new(body.inverse()?)),
            Operation::Controlled {
                inner,
                control_state,
            } => Operation::Controlled {
                inner: Arc::new(inner.adjoint()?),
                control_state: control_state.clone(),
            },
            Operation::Powered { inner, exponent } => Operation::Powered {
                inner: Arc::new(inner.adjoint()?),
                exponent: *exponent,
            },
            Operation::Inverted { inner } => inner.as_ref().clone(),
        };
        Ok(adjoint)
    }

    /// Replace every token by its bound value.
    ///
    /// Operations without tokens are returned as-is, keeping shared
    /// sub-structure shared.
    pub fn bind(&self, bindings: &Bindings) -> CircuitResult<Operation> {
        if !self.is_parameterized() {
            return Ok(self.clone());
        }

        let bound = match self {
            Operation::Primitive(kind) => Operation::Primitive(kind.bind(bindings)?),
            Operation::Composite(body) => Operation::Composite(Arc::new(body.bind(bindings)?)),
            Operation::Controlled {
                inner,
                control_state,
            } => Operation::Controlled {
                inner: Arc::new(inner.bind(bindings)?),
                control_state: control_state.clone(),
            },
            Operation::Powered { inner, exponent } => Operation::Powered {
                inner: Arc::new(inner.bind(bindings)?),
                exponent: *exponent,
            },
            Operation::Inverted { inner } => Operation::Inverted {
                inner: Arc::new(inner.bind(bindings)?),
            },
        };
        Ok(bound)
    }

    pub fn is_parameterized(&self) -> bool {
        match self {
            Operation::Primitive(kind) => kind.is_parameterized(),
            Operation::Composite(body) => body.is_parameterized(),
            Operation::Controlled { inner, .. }
            | Operation::Powered { inner, .. }
            | Operation::Inverted { inner } => inner.is_parameterized(),
        }
    }

    /// Names of every token still referenced.
    pub fn parameters(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_tokens(&mut set);
        set
    }

    pub(crate) fn collect_tokens(&self, set: &mut BTreeSet<String>) {
        match self {
            Operation::Primitive(kind) => {
                for param in kind.params() {
                    param.collect_tokens(set);
                }
            }
            Operation::Composite(body) => body.collect_tokens(set),
            Operation::Controlled { inner, .. }
            | Operation::Powered { inner, .. }
            | Operation::Inverted { inner } => inner.collect_tokens(set),
        }
    }

    /// False when a reset appears anywhere inside.
    pub fn is_unitary(&self) -> bool {
        match self {
            Operation::Primitive(kind) => kind.is_unitary(),
            Operation::Composite(body) => body.steps().iter().all(|s| s.operation().is_unitary()),
            Operation::Controlled { inner, .. }
            | Operation::Powered { inner, .. }
            | Operation::Inverted { inner } => inner.is_unitary(),
        }
    }

    fn check_invertible(&self) -> CircuitResult<()> {
        match self {
            Operation::Primitive(kind) => kind
                .adjoint()
                .map(|_| ())
                .ok_or_else(|| CircuitError::NoKnownAdjoint(kind.name().to_string())),
            Operation::Composite(body) => body
                .steps()
                .iter()
                .try_for_each(|s| s.operation().check_invertible()),
            Operation::Controlled { inner, .. }
            | Operation::Powered { inner, .. }
            | Operation::Inverted { inner } => inner.check_invertible(),
        }
    }
}

impl From<GateKind> for Operation {
    fn from(kind: GateKind) -> Self {
        Operation::Primitive(kind)
    }
}

impl From<Circuit> for Operation {
    fn from(circuit: Circuit) -> Self {
        circuit.into_operation()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Primitive(kind) => write!(f, "{kind}"),
            _ => write!(f, "{}", self.name()),
        }
    }
}
