//! The seam to an external inference engine.
//!
//! Model compilation, MCMC and the computation of convergence diagnostics
//! are delegated to an [`InferenceBackend`]. This crate supplies the model
//! description ([`Model`]), the draw containers it expects back, and the
//! downstream summaries; any engine that can fill a [`DrawSet`] from a
//! [`Model`] plugs in here.

use serde::{Deserialize, Serialize};

use crate::diagnostics::DiagnosticsSet;
use crate::draws::DrawSet;
use crate::error::{Error, Result};
use crate::model::{Model, Observed};
use crate::random::SeedPolicy;

/// Posterior sampling settings handed to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Independent chains
    pub chains: usize,
    /// Post-warmup draws per chain
    pub draws: usize,
    /// Warmup iterations per chain, discarded
    pub tune: usize,
    /// Target acceptance probability for step-size adaptation
    pub target_accept: f64,
    pub seed: SeedPolicy,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            chains: 4,
            draws: 1000,
            tune: 1000,
            target_accept: 0.8,
            seed: SeedPolicy::default(),
        }
    }
}

impl SamplingConfig {
    /// # Errors
    /// [`Error::InvalidParameter`] if `chains` or `draws` is zero, or
    /// `target_accept` is outside `(0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if self.chains == 0 {
            return Err(Error::invalid("chains", self.chains, "chains > 0"));
        }
        if self.draws == 0 {
            return Err(Error::invalid("draws", self.draws, "draws > 0"));
        }
        if !(self.target_accept > 0.0 && self.target_accept < 1.0) {
            return Err(Error::invalid(
                "target_accept",
                self.target_accept,
                "0 < target_accept < 1",
            ));
        }
        Ok(())
    }
}

/// Posterior draws together with the backend's diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOutput {
    pub posterior: DrawSet,
    pub diagnostics: DiagnosticsSet,
}

impl InferenceOutput {
    /// Checks that the posterior matches `model` and `config`: the
    /// requested chain/draw layout and one scalar column per free variable.
    ///
    /// # Errors
    /// - [`Error::ShapeMismatch`] if the layout or a variable's width is off.
    /// - [`Error::MissingVariable`] if a free variable has no draws.
    pub fn check(&self, model: &Model, config: &SamplingConfig) -> Result<()> {
        let posterior = &self.posterior;
        let expected = config.chains * config.draws;
        if posterior.chains() != config.chains || posterior.draws() != config.draws {
            return Err(Error::ShapeMismatch {
                variable: "posterior".to_string(),
                expected,
                actual: posterior.total_draws(),
            });
        }
        for var in model.free_variables() {
            let draws = posterior
                .get(&var.name)
                .ok_or_else(|| Error::MissingVariable(var.name.clone()))?;
            if !draws.is_scalar() {
                return Err(Error::ShapeMismatch {
                    variable: var.name.clone(),
                    expected,
                    actual: draws.values.len(),
                });
            }
        }
        Ok(())
    }
}

/// An external engine that compiles models and samples from them.
///
/// Calls are blocking and return completed results. A backend may run
/// chains in parallel internally; callers see one synchronous call.
/// Sampler pathologies (divergences, poor mixing) are reported through
/// [`InferenceOutput::diagnostics`], not as errors.
pub trait InferenceBackend {
    /// Backend-specific reference to a compiled model.
    type Handle;

    /// Compiles `model` for sampling.
    fn define_model(&mut self, model: &Model) -> Result<Self::Handle>;

    /// Draws `draws` joint samples of every variable from the prior,
    /// with the observed variable sized like its observations.
    fn sample_prior_predictive(&mut self, handle: &Self::Handle, draws: usize) -> Result<DrawSet>;

    /// Runs posterior inference conditioned on `observed`.
    ///
    /// Implementations should reject observations that do not match the
    /// variable the model binds with [`Error::MissingObservation`] or
    /// [`Error::Backend`].
    fn sample_posterior(
        &mut self,
        handle: &Self::Handle,
        observed: &Observed,
        config: &SamplingConfig,
    ) -> Result<InferenceOutput>;

    /// Draws the observed variable once per posterior draw, keeping the
    /// posterior's chain/draw layout.
    fn sample_posterior_predictive(
        &mut self,
        handle: &Self::Handle,
        posterior: &DrawSet,
    ) -> Result<DrawSet>;
}

/// An in-process backend for tests of the downstream pipeline.
///
/// Predictive sampling is ancestral. The "posterior" of a
/// `mu`/`sigma` Normal model is a Gaussian approximation around the
/// sample mean and standard deviation, with canned diagnostics.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;

    use rand::rngs::SmallRng;
    use rand_distr::{Distribution, Normal as NormalDist};

    use super::*;
    use crate::diagnostics::VariableDiagnostics;
    use crate::predictive::AncestralSampler;
    use crate::random::create_rng;
    use crate::stats;

    pub(crate) struct StubBackend {
        pub models: Vec<Model>,
        pub diagnostics: VariableDiagnostics,
        pub divergences: usize,
        /// Variables left out of the reported diagnostics
        pub unreported: Vec<&'static str>,
        sampler: AncestralSampler<SmallRng>,
    }

    impl StubBackend {
        pub(crate) fn new(seed: u64) -> Self {
            Self {
                models: Vec::new(),
                diagnostics: VariableDiagnostics {
                    ess_bulk: 3200.0,
                    ess_tail: 2900.0,
                    r_hat: 1.0,
                    mcse_mean: 0.001,
                    mcse_sd: 0.001,
                },
                divergences: 0,
                unreported: Vec::new(),
                sampler: AncestralSampler::new(create_rng(seed)),
            }
        }

        fn model(&self, handle: &usize) -> Result<&Model> {
            self.models
                .get(*handle)
                .ok_or_else(|| Error::Backend(format!("unknown model handle {handle}")))
        }
    }

    impl InferenceBackend for StubBackend {
        type Handle = usize;

        fn define_model(&mut self, model: &Model) -> Result<usize> {
            self.models.push(model.clone());
            Ok(self.models.len() - 1)
        }

        fn sample_prior_predictive(&mut self, handle: &usize, draws: usize) -> Result<DrawSet> {
            let model = self.model(handle)?.clone();
            self.sampler.prior_predictive(&model, draws)
        }

        fn sample_posterior(
            &mut self,
            handle: &usize,
            observed: &Observed,
            config: &SamplingConfig,
        ) -> Result<InferenceOutput> {
            let model = self.model(handle)?;
            if model.observed() != Some(observed) {
                return Err(Error::MissingObservation);
            }
            if model.variable("mu").is_none() || model.variable("sigma").is_none() {
                return Err(Error::Backend("stub expects mu and sigma".into()));
            }

            let data = observed.data.as_slice();
            let n = data.len() as f64;
            let mean = stats::mean(data).ok_or(Error::EmptyInput)?;
            let sd = stats::std_dev(data).ok_or(Error::InsufficientData {
                required: 2,
                actual: data.len(),
            })?;
            let mu_dist = NormalDist::new(mean, sd / n.sqrt())
                .map_err(|e| Error::Backend(e.to_string()))?;
            let sigma_dist = NormalDist::new(sd, sd / (2.0 * n).sqrt())
                .map_err(|e| Error::Backend(e.to_string()))?;

            let mut rng = config.seed.rng();
            let total = config.chains * config.draws;
            let mut posterior = DrawSet::new(config.chains, config.draws);
            posterior.insert_scalar(
                "mu",
                (0..total).map(|_| mu_dist.sample(&mut rng)).collect(),
            )?;
            posterior.insert_scalar(
                "sigma",
                (0..total).map(|_| sigma_dist.sample(&mut rng).abs()).collect(),
            )?;

            let variables: BTreeMap<String, VariableDiagnostics> = ["mu", "sigma"]
                .into_iter()
                .filter(|name| !self.unreported.contains(name))
                .map(|name| (name.to_string(), self.diagnostics))
                .collect();
            Ok(InferenceOutput {
                posterior,
                diagnostics: DiagnosticsSet {
                    variables,
                    divergences: self.divergences,
                    total_draws: total,
                },
            })
        }

        fn sample_posterior_predictive(
            &mut self,
            handle: &usize,
            posterior: &DrawSet,
        ) -> Result<DrawSet> {
            let model = self.model(handle)?.clone();
            self.sampler.posterior_predictive(&model, posterior)
        }
    }
}
