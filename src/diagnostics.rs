//! Convergence diagnostics as reported by an inference backend.
//!
//! The numbers themselves (ESS, R-hat, MCSE, divergence counts) are
//! computed by the backend. This module only carries them and compares them
//! against [`Thresholds`]. A problem found this way is a [`Signal`] for a
//! human to act on (reparameterize, sample longer, raise `target_accept`);
//! it is never turned into an error or corrected automatically.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Per-variable diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariableDiagnostics {
    /// Bulk effective sample size
    pub ess_bulk: f64,
    /// Tail effective sample size
    pub ess_tail: f64,
    /// Rank-normalized split potential scale reduction
    pub r_hat: f64,
    /// Monte Carlo standard error of the mean
    pub mcse_mean: f64,
    /// Monte Carlo standard error of the standard deviation
    pub mcse_sd: f64,
}

/// Diagnostics for a whole posterior run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsSet {
    pub variables: BTreeMap<String, VariableDiagnostics>,
    /// Divergent transitions across all chains
    pub divergences: usize,
    /// Post-warmup draws across all chains
    pub total_draws: usize,
}

/// Limits beyond which diagnostics raise a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub max_r_hat: f64,
    pub min_ess: f64,
    pub max_divergences: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_r_hat: 1.01,
            min_ess: 400.0,
            max_divergences: 0,
        }
    }
}

impl Thresholds {
    /// # Errors
    /// [`Error::InvalidParameter`] if `max_r_hat` is not a finite value
    /// `>= 1` or `min_ess` is not a finite value `>= 0`. A NaN limit would
    /// make every comparison false and hide every signal.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_r_hat.is_finite() && self.max_r_hat >= 1.0) {
            return Err(Error::invalid(
                "max_r_hat",
                self.max_r_hat,
                "a finite value >= 1",
            ));
        }
        if !(self.min_ess.is_finite() && self.min_ess >= 0.0) {
            return Err(Error::invalid("min_ess", self.min_ess, "a finite value >= 0"));
        }
        Ok(())
    }
}

/// Which effective-sample-size estimate fell short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EssKind {
    Bulk,
    Tail,
}

/// A diagnostic outside its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    HighRHat {
        variable: String,
        r_hat: f64,
        limit: f64,
    },
    LowEss {
        variable: String,
        kind: EssKind,
        ess: f64,
        limit: f64,
    },
    Divergences {
        count: usize,
        fraction: f64,
        limit: usize,
    },
    /// The backend reported nothing for a sampled variable.
    MissingDiagnostics { variable: String },
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::HighRHat {
                variable,
                r_hat,
                limit,
            } => write!(f, "{variable}: r_hat {r_hat:.3} > {limit}"),
            Signal::LowEss {
                variable,
                kind,
                ess,
                limit,
            } => {
                let kind = match kind {
                    EssKind::Bulk => "bulk",
                    EssKind::Tail => "tail",
                };
                write!(f, "{variable}: ess_{kind} {ess:.0} < {limit}")
            }
            Signal::Divergences {
                count,
                fraction,
                limit,
            } => write!(
                f,
                "{count} divergent transitions ({:.1}% of draws) > {limit}",
                fraction * 100.0
            ),
            Signal::MissingDiagnostics { variable } => {
                write!(f, "{variable}: no diagnostics reported")
            }
        }
    }
}

impl DiagnosticsSet {
    /// Compares every diagnostic to `thresholds`.
    ///
    /// Each signal is also logged at `warn`. A non-finite R-hat (e.g. from a
    /// chain stuck at one value) counts as exceeding the limit.
    ///
    /// # Examples
    /// ```
    /// use u_bayesflow::diagnostics::{DiagnosticsSet, Signal, Thresholds};
    /// let diag = DiagnosticsSet { divergences: 3, total_draws: 4000, ..Default::default() };
    /// let signals = diag.signals(&Thresholds::default());
    /// assert!(matches!(signals[0], Signal::Divergences { count: 3, .. }));
    /// ```
    pub fn signals(&self, thresholds: &Thresholds) -> Vec<Signal> {
        let mut signals = Vec::new();

        for (name, diag) in &self.variables {
            if diag.r_hat.is_nan() || diag.r_hat > thresholds.max_r_hat {
                signals.push(Signal::HighRHat {
                    variable: name.clone(),
                    r_hat: diag.r_hat,
                    limit: thresholds.max_r_hat,
                });
            }
            for (kind, ess) in [(EssKind::Bulk, diag.ess_bulk), (EssKind::Tail, diag.ess_tail)] {
                if ess.is_nan() || ess < thresholds.min_ess {
                    signals.push(Signal::LowEss {
                        variable: name.clone(),
                        kind,
                        ess,
                        limit: thresholds.min_ess,
                    });
                }
            }
        }

        if self.divergences > thresholds.max_divergences {
            let fraction = if self.total_draws == 0 {
                0.0
            } else {
                self.divergences as f64 / self.total_draws as f64
            };
            signals.push(Signal::Divergences {
                count: self.divergences,
                fraction,
                limit: thresholds.max_divergences,
            });
        }

        for signal in &signals {
            warn!(%signal, "diagnostic outside threshold");
        }
        signals
    }

    /// Like [`signals`](Self::signals), and also flags every name in
    /// `variables` the backend left without diagnostics.
    ///
    /// # Examples
    /// ```
    /// use u_bayesflow::diagnostics::{DiagnosticsSet, Signal, Thresholds};
    /// let diag = DiagnosticsSet::default();
    /// let signals = diag.signals_for(["mu"], &Thresholds::default());
    /// assert!(matches!(&signals[0], Signal::MissingDiagnostics { variable } if variable == "mu"));
    /// ```
    pub fn signals_for<'a>(
        &self,
        variables: impl IntoIterator<Item = &'a str>,
        thresholds: &Thresholds,
    ) -> Vec<Signal> {
        let mut signals: Vec<Signal> = variables
            .into_iter()
            .filter(|name| !self.variables.contains_key(*name))
            .map(|name| Signal::MissingDiagnostics {
                variable: name.to_string(),
            })
            .collect();
        for signal in &signals {
            warn!(%signal, "diagnostic outside threshold");
        }
        signals.extend(self.signals(thresholds));
        signals
    }

    pub fn get(&self, name: &str) -> Option<&VariableDiagnostics> {
        self.variables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> VariableDiagnostics {
        VariableDiagnostics {
            ess_bulk: 3500.0,
            ess_tail: 2800.0,
            r_hat: 1.0,
            mcse_mean: 0.001,
            mcse_sd: 0.001,
        }
    }

    fn set_with(name: &str, diag: VariableDiagnostics) -> DiagnosticsSet {
        DiagnosticsSet {
            variables: BTreeMap::from([(name.to_string(), diag)]),
            divergences: 0,
            total_draws: 4000,
        }
    }

    #[test]
    fn test_healthy_run_has_no_signals() {
        let set = set_with("mu", healthy());
        assert!(set.signals(&Thresholds::default()).is_empty());
    }

    #[test]
    fn test_high_r_hat() {
        let set = set_with(
            "sigma",
            VariableDiagnostics {
                r_hat: 1.05,
                ..healthy()
            },
        );
        let signals = set.signals(&Thresholds::default());
        assert_eq!(
            signals,
            vec![Signal::HighRHat {
                variable: "sigma".into(),
                r_hat: 1.05,
                limit: 1.01
            }]
        );
    }

    #[test]
    fn test_nan_r_hat_is_flagged() {
        let set = set_with(
            "mu",
            VariableDiagnostics {
                r_hat: f64::NAN,
                ..healthy()
            },
        );
        let signals = set.signals(&Thresholds::default());
        assert!(matches!(signals.as_slice(), [Signal::HighRHat { .. }]));
    }

    #[test]
    fn test_low_ess_bulk_and_tail() {
        let set = set_with(
            "mu",
            VariableDiagnostics {
                ess_bulk: 120.0,
                ess_tail: 90.0,
                ..healthy()
            },
        );
        let kinds: Vec<EssKind> = set
            .signals(&Thresholds::default())
            .into_iter()
            .filter_map(|s| match s {
                Signal::LowEss { kind, .. } => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, [EssKind::Bulk, EssKind::Tail]);
    }

    #[test]
    fn test_divergences() {
        let mut set = set_with("mu", healthy());
        set.divergences = 40;
        let signals = set.signals(&Thresholds::default());
        match signals.as_slice() {
            [Signal::Divergences { count, fraction, .. }] => {
                assert_eq!(*count, 40);
                assert!((fraction - 0.01).abs() < 1e-12);
            }
            other => panic!("unexpected signals {other:?}"),
        }

        let lenient = Thresholds {
            max_divergences: 50,
            ..Thresholds::default()
        };
        assert!(set.signals(&lenient).is_empty());
    }

    #[test]
    fn test_signal_display() {
        let s = Signal::HighRHat {
            variable: "mu".into(),
            r_hat: 1.0512,
            limit: 1.01,
        };
        assert_eq!(s.to_string(), "mu: r_hat 1.051 > 1.01");
        let s = Signal::Divergences {
            count: 12,
            fraction: 0.003,
            limit: 0,
        };
        assert_eq!(s.to_string(), "12 divergent transitions (0.3% of draws) > 0");
    }

    #[test]
    fn test_thresholds_validate() {
        assert!(Thresholds::default().validate().is_ok());
        let nan = Thresholds {
            max_r_hat: f64::NAN,
            min_ess: f64::NAN,
            max_divergences: 0,
        };
        assert!(matches!(
            nan.validate(),
            Err(Error::InvalidParameter { ref param, .. }) if param == "max_r_hat"
        ));
        let below_one = Thresholds {
            max_r_hat: 0.99,
            ..Thresholds::default()
        };
        assert!(below_one.validate().is_err());
        let negative_ess = Thresholds {
            min_ess: -1.0,
            ..Thresholds::default()
        };
        assert!(matches!(
            negative_ess.validate(),
            Err(Error::InvalidParameter { ref param, .. }) if param == "min_ess"
        ));
    }

    #[test]
    fn test_missing_variable_is_flagged() {
        let set = set_with("mu", healthy());
        let signals = set.signals_for(["mu", "sigma"], &Thresholds::default());
        assert_eq!(
            signals,
            vec![Signal::MissingDiagnostics {
                variable: "sigma".into()
            }]
        );
        assert_eq!(signals[0].to_string(), "sigma: no diagnostics reported");
        assert!(set.signals_for(["mu"], &Thresholds::default()).is_empty());
    }

    #[test]
    fn test_signals_for_keeps_threshold_signals() {
        let mut set = set_with(
            "mu",
            VariableDiagnostics {
                r_hat: 1.2,
                ..healthy()
            },
        );
        set.divergences = 1;
        let signals = set.signals_for(["mu"], &Thresholds::default());
        assert_eq!(signals.len(), 2);
    }

    #[test]
    fn test_thresholds_serde_defaults() {
        let t: Thresholds = serde_json::from_str(r#"{"min_ess": 100}"#).unwrap();
        assert_eq!(t.min_ess, 100.0);
        assert_eq!(t.max_r_hat, 1.01);
        assert_eq!(t.max_divergences, 0);
    }
}
