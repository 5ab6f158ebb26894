//! Observed samples and their empirical summaries.
//!
//! A [`Sample`] is fixed-length and immutable once created. [`summarize`]
//! derives a [`Summary`] from it; the standard deviation formula is always
//! chosen explicitly through [`StdDevKind`].

use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stats::{self, WelfordAccumulator};

/// An ordered, immutable sequence of real-valued observations.
///
/// Cloning is cheap: the values are shared.
///
/// # Examples
/// ```
/// use u_bayesflow::sample::Sample;
/// let s = Sample::new(vec![1.0, 2.0, 3.0]);
/// assert_eq!(s.len(), 3);
/// assert_eq!(s[1], 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample {
    values: Arc<[f64]>,
}

impl Sample {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values: values.into(),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Summarizes this sample, see [`summarize`].
    pub fn summarize(&self, kind: StdDevKind) -> Result<Summary> {
        summarize(&self.values, kind)
    }
}

impl Deref for Sample {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.values
    }
}

impl From<Vec<f64>> for Sample {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<f64> for Sample {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Which standard deviation formula a summary uses.
///
/// The two differ by a factor of `sqrt(n / (n − 1))`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdDevKind {
    /// Denominator `n`.
    #[default]
    Population,
    /// Bessel-corrected, denominator `n − 1`.
    Sample,
}

impl StdDevKind {
    /// Fewest observations the formula is defined for.
    pub fn min_len(&self) -> usize {
        match self {
            StdDevKind::Population => 1,
            StdDevKind::Sample => 2,
        }
    }
}

/// Empirical summary of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub kind: StdDevKind,
    pub min: f64,
    pub max: f64,
}

/// Computes mean and standard deviation of `data`.
///
/// # Errors
/// - [`Error::EmptyInput`] if `data` is empty.
/// - [`Error::NonFiniteInput`] if any value is NaN or infinite.
/// - [`Error::InsufficientData`] for [`StdDevKind::Sample`] with one value.
///
/// # Examples
/// ```
/// use u_bayesflow::sample::{summarize, StdDevKind};
/// let s = summarize(&[1.0, 2.0, 3.0], StdDevKind::Population).unwrap();
/// assert_eq!(s.mean, 2.0);
/// assert!((s.std_dev - 0.8165).abs() < 1e-4);
///
/// let s = summarize(&[1.0, 2.0, 3.0], StdDevKind::Sample).unwrap();
/// assert!((s.std_dev - 1.0).abs() < 1e-12);
/// ```
pub fn summarize(data: &[f64], kind: StdDevKind) -> Result<Summary> {
    if data.is_empty() {
        return Err(Error::EmptyInput);
    }
    if let Some((index, &value)) = data.iter().enumerate().find(|(_, x)| !x.is_finite()) {
        return Err(Error::NonFiniteInput { index, value });
    }
    if data.len() < kind.min_len() {
        return Err(Error::InsufficientData {
            required: kind.min_len(),
            actual: data.len(),
        });
    }

    let mut acc = WelfordAccumulator::new();
    data.iter().for_each(|&x| acc.update(x));
    let std_dev = match kind {
        StdDevKind::Population => acc.population_std_dev(),
        StdDevKind::Sample => acc.sample_std_dev(),
    };

    // Inputs are non-empty and finite past this point.
    let (Some(mean), Some(std_dev), Some(min), Some(max)) = (
        stats::mean(data),
        std_dev,
        stats::min(data),
        stats::max(data),
    ) else {
        return Err(Error::EmptyInput);
    };

    Ok(Summary {
        n: data.len(),
        mean,
        std_dev,
        kind,
        min,
        max,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn mean_matches_arithmetic_average(
            data in proptest::collection::vec(-1e6_f64..1e6, 1..200),
        ) {
            let s = summarize(&data, StdDevKind::Population).unwrap();
            let naive = data.iter().sum::<f64>() / data.len() as f64;
            prop_assert!((s.mean - naive).abs() < 1e-6);
            prop_assert!(s.min - 1e-9 <= s.mean && s.mean <= s.max + 1e-9);
        }

        #[test]
        fn sample_and_population_differ_by_bessel(
            data in proptest::collection::vec(-1e3_f64..1e3, 2..200),
        ) {
            let pop = summarize(&data, StdDevKind::Population).unwrap().std_dev;
            let samp = summarize(&data, StdDevKind::Sample).unwrap().std_dev;
            let n = data.len() as f64;
            prop_assert!((samp - pop * (n / (n - 1.0)).sqrt()).abs() < 1e-9 * samp.max(1.0));
        }
    }
}
