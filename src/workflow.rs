//! End-to-end Bayesian workflow on synthetic Normal data.
//!
//! [`Workflow::run`] goes through the whole loop in order:
//!
//! 1. generate data from known parameters
//! 2. summarize it
//! 3. build `mu ~ Normal`, `sigma ~ HalfNormal`, `y ~ Normal(mu, sigma)`
//!    with `y` observed
//! 4. hand the model to the backend
//! 5. prior predictive draws and a check of the mean
//! 6. posterior sampling
//! 7. diagnostic signals
//! 8. posterior summary table with diagnostics
//! 9. posterior predictive draws and checks of mean and standard deviation
//!
//! Each stage is logged at `info`. The first error stops the run; a
//! diagnostic signal does not.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::{InferenceBackend, InferenceOutput, SamplingConfig};
use crate::diagnostics::{Signal, Thresholds};
use crate::draws::DrawSet;
use crate::error::{Error, Result};
use crate::generate::GeneratorConfig;
use crate::model::{Family, Model, ModelSpec};
use crate::predictive::{predictive_check, PredictiveCheck, Statistic};
use crate::sample::{Sample, StdDevKind, Summary};
use crate::summary::{summarize_draws, SummaryTable};

/// Hyperparameters of the Normal model's priors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorConfig {
    /// Prior mean of `mu`
    pub mu_loc: f64,
    /// Prior standard deviation of `mu`
    pub mu_scale: f64,
    /// Scale of the half-normal prior on `sigma`
    pub sigma_scale: f64,
}

impl Default for PriorConfig {
    fn default() -> Self {
        Self {
            mu_loc: 0.0,
            mu_scale: 10.0,
            sigma_scale: 10.0,
        }
    }
}

impl PriorConfig {
    /// # Errors
    /// [`Error::InvalidParameter`] if `mu_loc` is not finite or a scale is
    /// not a finite positive number.
    pub fn validate(&self) -> Result<()> {
        if !self.mu_loc.is_finite() {
            return Err(Error::invalid("mu_loc", self.mu_loc, "a finite value"));
        }
        let scales = [("mu_scale", self.mu_scale), ("sigma_scale", self.sigma_scale)];
        for (name, scale) in scales {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(Error::invalid(name, scale, "a finite value > 0"));
            }
        }
        Ok(())
    }
}

/// Everything a workflow run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub data: GeneratorConfig,
    pub priors: PriorConfig,
    pub sampling: SamplingConfig,
    pub thresholds: Thresholds,
    /// Formula for the data summary
    pub std_dev_kind: StdDevKind,
    /// Mass of the posterior intervals
    pub hdi_prob: f64,
    pub prior_predictive_draws: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            data: GeneratorConfig::default(),
            priors: PriorConfig::default(),
            sampling: SamplingConfig::default(),
            thresholds: Thresholds::default(),
            std_dev_kind: StdDevKind::default(),
            hdi_prob: 0.94,
            prior_predictive_draws: 500,
        }
    }
}

impl WorkflowConfig {
    /// Validates every section.
    ///
    /// # Errors
    /// The first [`Error::InvalidParameter`] found, or
    /// [`Error::InsufficientData`] if `data.n` is too small for
    /// `std_dev_kind`.
    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        self.priors.validate()?;
        self.sampling.validate()?;
        self.thresholds.validate()?;
        if !(self.hdi_prob > 0.0 && self.hdi_prob <= 1.0) {
            return Err(Error::invalid("hdi_prob", self.hdi_prob, "0 < hdi_prob <= 1"));
        }
        if self.prior_predictive_draws == 0 {
            return Err(Error::invalid(
                "prior_predictive_draws",
                0,
                "prior_predictive_draws > 0",
            ));
        }
        let required = self.std_dev_kind.min_len();
        if self.data.n < required as i64 {
            return Err(Error::InsufficientData {
                required,
                actual: self.data.n as usize,
            });
        }
        Ok(())
    }
}

/// Builds `mu ~ Normal(mu_loc, mu_scale)`, `sigma ~ HalfNormal(sigma_scale)`,
/// `y ~ Normal(mu, sigma)` with `y` bound to `data`.
///
/// # Examples
/// ```
/// use u_bayesflow::sample::Sample;
/// use u_bayesflow::workflow::{normal_model, PriorConfig};
/// let model = normal_model(&PriorConfig::default(), Sample::new(vec![0.1, 0.4])).unwrap();
/// assert!(model.is_observed("y"));
/// assert_eq!(model.free_variables().count(), 2);
/// ```
pub fn normal_model(priors: &PriorConfig, data: Sample) -> Result<Model> {
    ModelSpec::new()
        .variable("mu", Family::normal(priors.mu_loc, priors.mu_scale))
        .variable("sigma", Family::half_normal(priors.sigma_scale))
        .variable("y", Family::normal("mu", "sigma"))
        .observe("y", data)
        .build()
}

/// Everything a run produced, ready for a reporting front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowReport {
    pub data: Sample,
    pub data_summary: Summary,
    pub model: Model,
    pub prior_predictive: DrawSet,
    pub prior_check: PredictiveCheck,
    pub inference: InferenceOutput,
    pub signals: Vec<Signal>,
    pub posterior_summary: SummaryTable,
    pub posterior_predictive: DrawSet,
    pub posterior_checks: Vec<PredictiveCheck>,
}

impl WorkflowReport {
    /// Whether the run finished without diagnostic signals.
    pub fn is_clean(&self) -> bool {
        self.signals.is_empty()
    }
}

/// Drives one run of the workflow against a backend.
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    config: WorkflowConfig,
}

impl Workflow {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Runs every stage in order.
    ///
    /// # Errors
    /// Configuration errors are reported before the backend is called.
    /// Afterwards, the first error from data generation, model
    /// validation, the backend, or a summary stops the run.
    pub fn run<B: InferenceBackend>(&self, backend: &mut B) -> Result<WorkflowReport> {
        let config = &self.config;
        config.validate()?;

        let data = config.data.generate()?;
        let data_summary = data.summarize(config.std_dev_kind)?;
        info!(
            n = data_summary.n,
            mean = data_summary.mean,
            std_dev = data_summary.std_dev,
            "generated data"
        );

        let model = normal_model(&config.priors, data.clone())?;
        let handle = backend.define_model(&model)?;
        info!(variables = model.variables().len(), "model defined");

        let prior_predictive =
            backend.sample_prior_predictive(&handle, config.prior_predictive_draws)?;
        let prior_check = predictive_check(&prior_predictive, "y", &data, Statistic::Mean)?;
        info!(
            draws = config.prior_predictive_draws,
            p_value = prior_check.p_value,
            "prior predictive check"
        );

        let observed = model.observed().ok_or(Error::MissingObservation)?;
        let inference = backend.sample_posterior(&handle, observed, &config.sampling)?;
        inference.check(&model, &config.sampling)?;
        info!(
            chains = config.sampling.chains,
            draws = config.sampling.draws,
            divergences = inference.diagnostics.divergences,
            "posterior sampled"
        );

        let free = model.free_variables().map(|v| v.name.as_str());
        let signals = inference.diagnostics.signals_for(free, &config.thresholds);
        let posterior_summary = summarize_draws(&inference.posterior, config.hdi_prob)?
            .with_diagnostics(&inference.diagnostics);
        info!(signals = signals.len(), "posterior summarized");

        let posterior_predictive =
            backend.sample_posterior_predictive(&handle, &inference.posterior)?;
        let posterior_checks = [Statistic::Mean, Statistic::StdDev]
            .into_iter()
            .map(|stat| predictive_check(&posterior_predictive, "y", &data, stat))
            .collect::<Result<Vec<_>>>()?;
        info!(
            p_mean = posterior_checks[0].p_value,
            p_std_dev = posterior_checks[1].p_value,
            "posterior predictive checks"
        );

        Ok(WorkflowReport {
            data,
            data_summary,
            model,
            prior_predictive,
            prior_check,
            inference,
            signals,
            posterior_summary,
            posterior_predictive,
            posterior_checks,
        })
    }
}
