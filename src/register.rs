//! Named wire ranges.

use std::fmt;
use std::ops::Range;

/// A named, contiguous block of wires inside a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Register {
    name: String,
    size: usize,
    offset: usize,
}

impl Register {
    pub(crate) fn new(name: impl Into<String>, size: usize, offset: usize) -> Self {
        Self {
            name: name.into(),
            size,
            offset,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Index of the first wire of this register in its circuit.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Circuit-level index of wire `index` of this register.
    ///
    /// `index` must be below [`Register::size`]. Past the end the result
    /// names a wire of the next register, or one the circuit rejects as out
    /// of range when this register is the last.
    pub fn wire(&self, index: usize) -> usize {
        debug_assert!(
            index < self.size,
            "wire {index} outside register {}[{}]",
            self.name,
            self.size
        );
        self.offset + index
    }

    /// All circuit-level indices of this register, in order.
    pub fn wires(&self) -> Range<usize> {
        self.offset..self.offset + self.size
    }

    pub(crate) fn shifted(&self, by: usize) -> Self {
        Self::new(self.name.clone(), self.size, self.offset + by)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.size)
    }
}
