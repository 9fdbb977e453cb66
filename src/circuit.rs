use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use nalgebra::DMatrix;
use tracing::trace;

use crate::error::{CircuitError, CircuitResult};
use crate::gates::GateKind;
use crate::operation::Operation;
use crate::parameter::{Bindings, Param};
use crate::register::Register;
use crate::Qbit;

/// One operation applied to concrete wires.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    operation: Operation,
    wires: Vec<usize>,
}

impl Step {
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn wires(&self) -> &[usize] {
        &self.wires
    }
}

/// An ordered sequence of operations over named registers.
///
/// Wire `i` of the circuit is bit `i` of a basis-state index. A circuit is
/// built by exclusive mutable access and then closed with
/// [`Circuit::into_operation`] before being shared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Circuit {
    name: String,
    registers: Vec<Register>,
    num_wires: usize,
    steps: Vec<Step>,
}

impl Circuit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Allocate `size` new wires after the existing ones.
    ///
    /// Fails with [`CircuitError::EmptyRegister`] when `size` is zero.
    pub fn add_register(
        &mut self,
        name: impl Into<String>,
        size: usize,
    ) -> CircuitResult<Register> {
        let name = name.into();
        if size == 0 {
            return Err(CircuitError::EmptyRegister(name));
        }
        let register = Register::new(name, size, self.num_wires);
        self.num_wires += size;
        self.registers.push(register.clone());
        Ok(register)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    /// First register called `name`.
    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find(|r| r.name() == name)
    }

    pub fn num_wires(&self) -> usize {
        self.num_wires
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply `operation` to `wires`.
    ///
    /// The wire list is checked against the operation's arity, the circuit
    /// size and for repeated wires. On error the circuit is left unchanged.
    pub fn append(
        &mut self,
        operation: impl Into<Operation>,
        wires: impl IntoIterator<Item = usize>,
    ) -> CircuitResult<&mut Self> {
        let operation = operation.into();
        let wires: Vec<usize> = wires.into_iter().collect();

        if wires.len() != operation.arity() {
            return Err(CircuitError::ArityMismatch {
                name: operation.name(),
                expected: operation.arity(),
                got: wires.len(),
            });
        }
        for (i, &wire) in wires.iter().enumerate() {
            if wire >= self.num_wires {
                return Err(CircuitError::IndexOutOfRange {
                    index: wire,
                    num_wires: self.num_wires,
                });
            }
            if wires[..i].contains(&wire) {
                return Err(CircuitError::DuplicateWire {
                    index: wire,
                    name: operation.name(),
                });
            }
        }

        trace!(circuit = %self.name, op = %operation, ?wires, "append");
        self.steps.push(Step { operation, wires });
        Ok(self)
    }

    pub fn h(&mut self, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::H, [wire])
    }

    pub fn x(&mut self, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::X, [wire])
    }

    pub fn y(&mut self, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::Y, [wire])
    }

    pub fn z(&mut self, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::Z, [wire])
    }

    pub fn s(&mut self, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::S, [wire])
    }

    pub fn t(&mut self, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::T, [wire])
    }

    pub fn rx(&mut self, theta: impl Into<Param>, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::Rx(theta.into()), [wire])
    }

    pub fn ry(&mut self, theta: impl Into<Param>, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::Ry(theta.into()), [wire])
    }

    pub fn rz(&mut self, theta: impl Into<Param>, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::Rz(theta.into()), [wire])
    }

    pub fn p(&mut self, theta: impl Into<Param>, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::Phase(theta.into()), [wire])
    }

    pub fn cx(&mut self, control: usize, target: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::CNot, [control, target])
    }

    pub fn cz(&mut self, control: usize, target: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::Cz, [control, target])
    }

    pub fn cp(
        &mut self,
        theta: impl Into<Param>,
        control: usize,
        target: usize,
    ) -> CircuitResult<&mut Self> {
        self.append(GateKind::CPhase(theta.into()), [control, target])
    }

    pub fn cry(
        &mut self,
        theta: impl Into<Param>,
        control: usize,
        target: usize,
    ) -> CircuitResult<&mut Self> {
        self.append(GateKind::CRy(theta.into()), [control, target])
    }

    pub fn swap(&mut self, a: usize, b: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::Swap, [a, b])
    }

    /// Dense unitary on `wires`; `wires[0]` is the lowest bit of `matrix`.
    pub fn unitary(
        &mut self,
        label: impl Into<String>,
        matrix: DMatrix<Qbit>,
        wires: impl IntoIterator<Item = usize>,
    ) -> CircuitResult<&mut Self> {
        self.append(GateKind::unitary(label, matrix)?, wires)
    }

    pub fn noise(&mut self, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::Noise, [wire])
    }

    pub fn reset(&mut self, wire: usize) -> CircuitResult<&mut Self> {
        self.append(GateKind::Reset, [wire])
    }

    /// Place `other` after this circuit on fresh wires.
    ///
    /// The registers of `other` are appended with their offsets moved past
    /// this circuit's wires, and its steps follow this circuit's steps.
    pub fn compose(&self, other: &Circuit) -> Circuit {
        let shift = self.num_wires;
        let mut composed = self.clone();
        composed.name = format!("{}+{}", self.name, other.name);
        composed
            .registers
            .extend(other.registers.iter().map(|r| r.shifted(shift)));
        composed.num_wires += other.num_wires;
        composed.steps.extend(other.steps.iter().map(|s| Step {
            operation: s.operation.clone(),
            wires: s.wires.iter().map(|w| w + shift).collect(),
        }));
        composed
    }

    /// Append the steps of `other` on the same wires.
    ///
    /// Both circuits must have identical register sizes in the same order.
    pub fn extend_from(&mut self, other: &Circuit) -> CircuitResult<&mut Self> {
        let same_layout = self.registers.len() == other.registers.len()
            && self
                .registers
                .iter()
                .zip(&other.registers)
                .all(|(a, b)| a.size() == b.size());
        if !same_layout || self.num_wires != other.num_wires {
            return Err(CircuitError::RegisterMismatch {
                left: self.name.clone(),
                left_wires: self.num_wires,
                right: other.name.clone(),
                right_wires: other.num_wires,
            });
        }

        self.steps.extend(other.steps.iter().cloned());
        Ok(self)
    }

    /// Close into a reusable composite operation.
    pub fn into_operation(self) -> Operation {
        Operation::Composite(Arc::new(self))
    }

    /// Reverse the steps and take the adjoint of each one.
    pub fn inverse(&self) -> CircuitResult<Circuit> {
        let steps = self
            .steps
            .iter()
            .rev()
            .map(|s| {
                Ok(Step {
                    operation: s.operation.adjoint()?,
                    wires: s.wires.clone(),
                })
            })
            .collect::<CircuitResult<Vec<_>>>()?;

        Ok(Circuit {
            name: format!("{}_dg", self.name),
            registers: self.registers.clone(),
            num_wires: self.num_wires,
            steps,
        })
    }

    /// Copy with every token replaced by its bound value.
    ///
    /// The circuit itself is left untouched so it can be bound again with
    /// other values.
    pub fn bind(&self, bindings: &Bindings) -> CircuitResult<Circuit> {
        let steps = self
            .steps
            .iter()
            .map(|s| {
                Ok(Step {
                    operation: s.operation.bind(bindings)?,
                    wires: s.wires.clone(),
                })
            })
            .collect::<CircuitResult<Vec<_>>>()?;

        Ok(Circuit {
            name: self.name.clone(),
            registers: self.registers.clone(),
            num_wires: self.num_wires,
            steps,
        })
    }

    pub fn is_parameterized(&self) -> bool {
        self.steps.iter().any(|s| s.operation.is_parameterized())
    }

    /// Names of every token still referenced, sorted.
    pub fn parameters(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_tokens(&mut set);
        set
    }

    pub(crate) fn collect_tokens(&self, set: &mut BTreeSet<String>) {
        for step in &self.steps {
            step.operation.collect_tokens(set);
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registers = self
            .registers
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "{} ({})", self.name, registers)?;
        for step in &self.steps {
            writeln!(f, "  {} {:?}", step.operation, step.wires)?;
        }
        Ok(())
    }
}
