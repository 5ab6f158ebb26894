//! Forward (ancestral) predictive sampling and predictive checks.
//!
//! [`AncestralSampler`] walks a [`Model`] in dependency order, drawing each
//! variable from its distribution with parameters taken from the values
//! already drawn. That is all prior and posterior predictive sampling
//! need; posterior inference itself belongs to an
//! [`InferenceBackend`](crate::backend::InferenceBackend).
//!
//! [`predictive_check`] compares a statistic of the observed data with the
//! same statistic over predictive draws.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::draws::DrawSet;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::stats;

/// Forward sampler over a model, owning its random source.
///
/// # Examples
/// ```
/// use u_bayesflow::model::{Family, ModelSpec};
/// use u_bayesflow::predictive::AncestralSampler;
/// use u_bayesflow::random::create_rng;
/// use u_bayesflow::sample::Sample;
///
/// let model = ModelSpec::new()
///     .variable("mu", Family::normal(0.0, 1.0))
///     .variable("y", Family::normal("mu", 1.0))
///     .observe("y", Sample::new(vec![0.5, 1.5, -0.2]))
///     .build()
///     .unwrap();
/// let mut sampler = AncestralSampler::new(create_rng(42));
/// let prior = sampler.prior_predictive(&model, 100).unwrap();
/// assert_eq!(prior.pooled("mu").unwrap().len(), 100);
/// assert_eq!(prior.pooled("y").unwrap().len(), 300);
/// ```
#[derive(Debug, Clone)]
pub struct AncestralSampler<R> {
    rng: R,
}

impl<R: Rng> AncestralSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Releases the random source.
    pub fn into_inner(self) -> R {
        self.rng
    }

    /// Draws every variable from the prior, one chain of `draws` draws.
    ///
    /// The observed variable gets as many elements per draw as there are
    /// observations (one if no data is bound).
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] if `draws == 0`, or a drawn value puts
    ///   a dependent variable's parameter out of domain.
    pub fn prior_predictive(&mut self, model: &Model, draws: usize) -> Result<DrawSet> {
        if draws == 0 {
            return Err(Error::invalid("draws", 0, "draws > 0"));
        }

        let widths: Vec<usize> = model
            .variables()
            .iter()
            .map(|v| match model.observed() {
                Some(obs) if obs.variable == v.name => obs.data.len(),
                _ => 1,
            })
            .collect();
        let mut columns: Vec<Vec<f64>> = widths
            .iter()
            .map(|w| Vec::with_capacity(w * draws))
            .collect();
        let mut current: HashMap<&str, f64> = HashMap::with_capacity(widths.len());

        for _ in 0..draws {
            current.clear();
            let slots = model.variables().iter().zip(&widths).zip(&mut columns);
            for ((var, &width), column) in slots {
                let dist = var.family.resolve(|name| current.get(name).copied())?;
                if width == 1 {
                    let value = dist.sample(&mut self.rng);
                    current.insert(var.name.as_str(), value);
                    column.push(value);
                } else {
                    column.extend((0..width).map(|_| dist.sample(&mut self.rng)));
                }
            }
        }

        let mut set = DrawSet::new(1, draws);
        for ((var, width), column) in model.variables().iter().zip(widths).zip(columns) {
            set.insert(var.name.clone(), width, column)?;
        }
        debug!(draws, variables = set.names().count(), "sampled prior predictive");
        Ok(set)
    }

    /// Draws the observed variable once per posterior draw.
    ///
    /// The result keeps the posterior's chain/draw layout and holds only the
    /// observed variable.
    ///
    /// # Errors
    /// - [`Error::MissingObservation`] if the model has no observed variable.
    /// - [`Error::MissingVariable`] if `posterior` lacks a free variable.
    /// - [`Error::InvalidParameter`] if a posterior draw is outside the
    ///   domain of the observed variable's parameters.
    pub fn posterior_predictive(&mut self, model: &Model, posterior: &DrawSet) -> Result<DrawSet> {
        let observed = model.observed().ok_or(Error::MissingObservation)?;
        let target = model
            .variable(&observed.variable)
            .ok_or_else(|| Error::MissingVariable(observed.variable.clone()))?;

        let total = posterior.total_draws();
        let mut free: Vec<(&str, &[f64])> = Vec::new();
        for var in model.free_variables() {
            let column = posterior.pooled(&var.name)?;
            if column.len() != total {
                return Err(Error::ShapeMismatch {
                    variable: var.name.clone(),
                    expected: total,
                    actual: column.len(),
                });
            }
            free.push((var.name.as_str(), column));
        }

        let width = observed.data.len();
        let mut values = Vec::with_capacity(total * width);
        for i in 0..total {
            let dist = target.family.resolve(|name| {
                free.iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, column)| column[i])
            })?;
            values.extend((0..width).map(|_| dist.sample(&mut self.rng)));
        }

        let mut set = DrawSet::new(posterior.chains(), posterior.draws());
        set.insert(observed.variable.clone(), width, values)?;
        debug!(
            chains = posterior.chains(),
            draws = posterior.draws(),
            width,
            "sampled posterior predictive"
        );
        Ok(set)
    }
}

/// Test statistic for a predictive check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Mean,
    /// Population standard deviation
    StdDev,
}

impl Statistic {
    /// Evaluates the statistic; `None` for empty input.
    pub fn compute(&self, data: &[f64]) -> Option<f64> {
        match self {
            Statistic::Mean => stats::mean(data),
            Statistic::StdDev => stats::population_std_dev(data),
        }
    }
}

/// Observed statistic against its predictive distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictiveCheck {
    pub variable: String,
    pub statistic: Statistic,
    pub observed: f64,
    /// One value per predictive draw
    pub simulated: Vec<f64>,
    /// Fraction of simulated values `>=` the observed one
    pub p_value: f64,
}

/// Computes `statistic` for the observed data and for every draw of
/// `variable`.
///
/// A `p_value` near 0 or 1 means the model rarely reproduces the observed
/// statistic.
///
/// # Errors
/// - [`Error::EmptyInput`] if `observed` or `draws` is empty.
/// - [`Error::NonFiniteInput`] if an observation or a drawn value is NaN or
///   infinite; for draws, `index` points into the pooled values.
/// - [`Error::MissingVariable`] if `variable` is not in `draws`.
/// - [`Error::ShapeMismatch`] if the draw width differs from the number of
///   observations.
///
/// # Examples
/// ```
/// use u_bayesflow::draws::DrawSet;
/// use u_bayesflow::predictive::{predictive_check, Statistic};
/// let mut set = DrawSet::new(1, 4);
/// set.insert("y", 2, vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0]).unwrap();
/// let check = predictive_check(&set, "y", &[1.0, 2.0], Statistic::Mean).unwrap();
/// assert_eq!(check.simulated, [0.0, 1.0, 2.0, 3.0]);
/// assert_eq!(check.p_value, 0.5);
/// ```
pub fn predictive_check(
    draws: &DrawSet,
    variable: &str,
    observed: &[f64],
    statistic: Statistic,
) -> Result<PredictiveCheck> {
    let non_finite = observed.iter().enumerate().find(|(_, x)| !x.is_finite());
    if let Some((index, &value)) = non_finite {
        return Err(Error::NonFiniteInput { index, value });
    }
    let observed_stat = statistic.compute(observed).ok_or(Error::EmptyInput)?;
    let var = draws
        .get(variable)
        .ok_or_else(|| Error::MissingVariable(variable.to_string()))?;
    if var.width != observed.len() {
        return Err(Error::ShapeMismatch {
            variable: variable.to_string(),
            expected: observed.len(),
            actual: var.width,
        });
    }
    if var.values.is_empty() {
        return Err(Error::EmptyInput);
    }

    let non_finite = var.values.iter().enumerate().find(|(_, x)| !x.is_finite());
    if let Some((index, &value)) = non_finite {
        return Err(Error::NonFiniteInput { index, value });
    }

    let simulated = var
        .values
        .chunks_exact(var.width)
        .map(|draw| statistic.compute(draw).ok_or(Error::EmptyInput))
        .collect::<Result<Vec<f64>>>()?;
    let exceed = simulated.iter().filter(|&&t| t >= observed_stat).count();
    let p_value = exceed as f64 / simulated.len() as f64;
    debug!(variable, ?statistic, observed = observed_stat, p_value, "predictive check");

    Ok(PredictiveCheck {
        variable: variable.to_string(),
        statistic,
        observed: observed_stat,
        simulated,
        p_value,
    })
}
