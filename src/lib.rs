//! # u-bayesflow
//!
//! A Bayesian workflow on synthetic data, from generation to posterior
//! predictive checks.
//!
//! The crate generates Normal data from known parameters, describes a
//! probabilistic model of it, and hands the model to an external inference
//! engine through the [`backend::InferenceBackend`] trait. Everything
//! downstream of sampling (summaries, intervals, diagnostic signals,
//! predictive checks) is computed here. MCMC itself is not.
//!
//! ## Modules
//!
//! - [`random`] — Seeded random sources and the seed policy
//! - [`stats`] — Descriptive statistics with numerical stability guarantees
//! - [`special`] — Normal log density
//! - [`distributions`] — Continuous distributions used as priors and likelihoods
//! - [`sample`] — Observed samples and their empirical summaries
//! - [`generate`] — Synthetic Normal data
//! - [`model`] — Declarative model graph with dependency ordering
//! - [`draws`] — Chain/draw containers for backend output
//! - [`diagnostics`] — Convergence diagnostics and threshold signals
//! - [`summary`] — Posterior summary tables with HDI
//! - [`predictive`] — Ancestral predictive sampling and predictive checks
//! - [`backend`] — The inference engine seam
//! - [`workflow`] — The end-to-end driver
//!
//! ## Design Philosophy
//!
//! - **Explicit randomness**: every sampler takes its generator as an
//!   argument; nothing reads a global one
//! - **Numerical stability first**: Welford's algorithm for variance,
//!   Neumaier summation for accumulation
//! - **Signals, not failures**: sampler pathologies are reported as data
//! - **Property-based testing**: invariants verified via proptest
//!
//! ## Logging
//!
//! Stages and signals are emitted through `tracing`. The library never
//! installs a subscriber.

pub mod backend;
pub mod diagnostics;
pub mod distributions;
pub mod draws;
pub mod error;
pub mod generate;
pub mod model;
pub mod predictive;
pub mod random;
pub mod sample;
pub mod special;
pub mod stats;
pub mod summary;
pub mod workflow;

pub use error::{Error, ModelError, Result};
