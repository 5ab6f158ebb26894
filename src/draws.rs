//! Containers for draws returned by an inference backend.
//!
//! A [`DrawSet`] holds `chains × draws` draws for each named variable.
//! Scalar parameters have one element per draw; predictive draws of the
//! observed variable carry one element per observation. Values are stored
//! chain-major: all of chain 0, then chain 1, and so on; within a draw the
//! elements are contiguous.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Draws of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDraws {
    /// Elements per draw (1 for scalars)
    pub width: usize,
    pub values: Vec<f64>,
}

impl VariableDraws {
    pub fn is_scalar(&self) -> bool {
        self.width == 1
    }
}

/// Draws for several variables sharing one chain/draw layout.
///
/// # Examples
/// ```
/// use u_bayesflow::draws::DrawSet;
/// let mut set = DrawSet::new(2, 3);
/// set.insert_scalar("mu", vec![0.1, 0.2, 0.3, 1.1, 1.2, 1.3]).unwrap();
/// assert_eq!(set.chain("mu", 1).unwrap(), &[1.1, 1.2, 1.3]);
/// assert_eq!(set.draw("mu", 0, 2).unwrap(), &[0.3]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDrawSet")]
pub struct DrawSet {
    chains: usize,
    draws: usize,
    variables: BTreeMap<String, VariableDraws>,
}

/// Unchecked wire form of a [`DrawSet`]; every variable goes back
/// through [`DrawSet::insert`].
#[derive(Deserialize)]
struct RawDrawSet {
    chains: usize,
    draws: usize,
    #[serde(default)]
    variables: BTreeMap<String, VariableDraws>,
}

impl TryFrom<RawDrawSet> for DrawSet {
    type Error = Error;

    fn try_from(raw: RawDrawSet) -> Result<Self> {
        if raw.chains.checked_mul(raw.draws).is_none() {
            return Err(Error::invalid(
                "draws",
                raw.draws,
                format!("chains × draws <= usize::MAX with {} chains", raw.chains),
            ));
        }
        let mut set = DrawSet::new(raw.chains, raw.draws);
        for (name, var) in raw.variables {
            set.insert(name, var.width, var.values)?;
        }
        Ok(set)
    }
}

impl DrawSet {
    /// Creates an empty set with the given layout.
    pub fn new(chains: usize, draws: usize) -> Self {
        Self {
            chains,
            draws,
            variables: BTreeMap::new(),
        }
    }

    pub fn chains(&self) -> usize {
        self.chains
    }

    /// Draws per chain.
    pub fn draws(&self) -> usize {
        self.draws
    }

    /// Total draws across chains.
    pub fn total_draws(&self) -> usize {
        self.chains * self.draws
    }

    /// Adds or replaces a variable with `width` elements per draw.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] if `width == 0`.
    /// - [`Error::ShapeMismatch`] if `values.len() != chains × draws × width`.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        width: usize,
        values: Vec<f64>,
    ) -> Result<()> {
        let name = name.into();
        if width == 0 {
            return Err(Error::invalid("width", 0, "width > 0"));
        }
        let expected = self
            .chains
            .checked_mul(self.draws)
            .and_then(|n| n.checked_mul(width))
            .ok_or_else(|| {
                Error::invalid("width", width, "chains × draws × width <= usize::MAX")
            })?;
        if values.len() != expected {
            return Err(Error::ShapeMismatch {
                variable: name,
                expected,
                actual: values.len(),
            });
        }
        self.variables.insert(name, VariableDraws { width, values });
        Ok(())
    }

    /// Adds or replaces a scalar variable.
    pub fn insert_scalar(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        self.insert(name, 1, values)
    }

    pub fn get(&self, name: &str) -> Option<&VariableDraws> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableDraws)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All values of `name`, chains concatenated.
    ///
    /// # Errors
    /// [`Error::MissingVariable`] if `name` is absent.
    pub fn pooled(&self, name: &str) -> Result<&[f64]> {
        Ok(&self.require(name)?.values)
    }

    /// All values of one chain of `name`.
    ///
    /// # Errors
    /// - [`Error::MissingVariable`] if `name` is absent.
    /// - [`Error::InvalidParameter`] if `chain` is out of range.
    pub fn chain(&self, name: &str, chain: usize) -> Result<&[f64]> {
        let var = self.require(name)?;
        if chain >= self.chains {
            return Err(Error::invalid("chain", chain, format!("chain < {}", self.chains)));
        }
        let len = self.draws * var.width;
        Ok(&var.values[chain * len..(chain + 1) * len])
    }

    /// Elements of one draw of `name`.
    ///
    /// # Errors
    /// As [`chain`](Self::chain), plus [`Error::InvalidParameter`] if
    /// `draw` is out of range.
    pub fn draw(&self, name: &str, chain: usize, draw: usize) -> Result<&[f64]> {
        let width = self.require(name)?.width;
        let values = self.chain(name, chain)?;
        if draw >= self.draws {
            return Err(Error::invalid("draw", draw, format!("draw < {}", self.draws)));
        }
        Ok(&values[draw * width..(draw + 1) * width])
    }

    fn require(&self, name: &str) -> Result<&VariableDraws> {
        self.variables
            .get(name)
            .ok_or_else(|| Error::MissingVariable(name.to_string()))
    }
}
