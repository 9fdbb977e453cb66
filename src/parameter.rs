//! Gate parameters that may stay symbolic until bind time.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Neg;

use crate::error::{CircuitError, CircuitResult};

/// A numeric value or a scaled reference to a named token.
///
/// Scaling is the only arithmetic supported on tokens; it is what inversion
/// (negation) and rotation power-lifting need.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A concrete value.
    Value(f64),
    /// `coefficient * <name>`, resolved by [`Bindings`].
    Token {
        /// Token name.
        name: String,
        /// Multiplier applied to the bound value.
        coefficient: f64,
    },
}

impl Param {
    /// Create a symbolic parameter.
    pub fn token(name: impl Into<String>) -> Self {
        Param::Token {
            name: name.into(),
            coefficient: 1.0,
        }
    }

    /// Check if this parameter still references a token.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Param::Token { .. })
    }

    /// The numeric value, if already bound.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Param::Value(v) => Some(*v),
            Param::Token { .. } => None,
        }
    }

    /// The numeric value, failing with the token name otherwise.
    pub fn value(&self) -> CircuitResult<f64> {
        match self {
            Param::Value(v) => Ok(*v),
            Param::Token { name, .. } => Err(CircuitError::UnboundParameter(name.clone())),
        }
    }

    /// Multiply by a constant.
    pub fn scale(&self, factor: f64) -> Self {
        match self {
            Param::Value(v) => Param::Value(v * factor),
            Param::Token { name, coefficient } => Param::Token {
                name: name.clone(),
                coefficient: coefficient * factor,
            },
        }
    }

    /// Replace the token by its bound value.
    pub fn bind(&self, bindings: &Bindings) -> CircuitResult<Self> {
        match self {
            Param::Value(_) => Ok(self.clone()),
            Param::Token { name, coefficient } => bindings
                .get(name)
                .map(|v| Param::Value(coefficient * v))
                .ok_or_else(|| CircuitError::UnboundParameter(name.clone())),
        }
    }

    pub(crate) fn collect_tokens(&self, set: &mut BTreeSet<String>) {
        if let Param::Token { name, .. } = self {
            set.insert(name.clone());
        }
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Value(value)
    }
}

impl Neg for Param {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.scale(-1.0)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Value(v) => write!(f, "{v}"),
            Param::Token { name, coefficient } if *coefficient == 1.0 => write!(f, "{name}"),
            Param::Token { name, coefficient } => write!(f, "{coefficient}*{name}"),
        }
    }
}

/// An indexed family of tokens named `name[0]`, `name[1]`, ...
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterVector {
    name: String,
    len: usize,
}

impl ParameterVector {
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn token_name(&self, index: usize) -> String {
        format!("{}[{}]", self.name, index)
    }

    /// The token for element `index`.
    pub fn get(&self, index: usize) -> Param {
        Param::token(self.token_name(index))
    }
}

/// Token name to value assignments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, f64>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Bind every element of `vector`, in order.
    pub fn insert_vector(
        &mut self,
        vector: &ParameterVector,
        values: &[f64],
    ) -> CircuitResult<&mut Self> {
        if values.len() != vector.len() {
            return Err(CircuitError::InvalidState(format!(
                "{} values supplied for parameter vector '{}' of length {}",
                values.len(),
                vector.name,
                vector.len()
            )));
        }
        for (i, &value) in values.iter().enumerate() {
            self.values.insert(vector.token_name(i), value);
        }
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
