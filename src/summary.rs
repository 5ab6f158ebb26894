//! Posterior summary tables.
//!
//! [`summarize_draws`] reduces a [`DrawSet`] to one row per scalar variable:
//! mean, standard deviation and highest density interval, pooled over
//! chains. Backend diagnostics can be joined in afterwards with
//! [`SummaryTable::with_diagnostics`]. The `Display` impl renders the table
//! as fixed-width text.

use std::fmt;

use serde::Serialize;

use crate::diagnostics::{DiagnosticsSet, VariableDiagnostics};
use crate::draws::DrawSet;
use crate::error::{Error, Result};
use crate::stats::{self, WelfordAccumulator};

/// Summary statistics of one scalar variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub variable: String,
    pub mean: f64,
    /// Sample standard deviation (n − 1) over all draws
    pub sd: f64,
    pub hdi_low: f64,
    pub hdi_high: f64,
    pub diagnostics: Option<VariableDiagnostics>,
}

/// One row per scalar variable, sorted by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub hdi_prob: f64,
    pub rows: Vec<SummaryRow>,
}

/// Summarizes every scalar variable of `draws`.
///
/// Variables with more than one element per draw (predictive draws of the
/// observed variable) are skipped; compare them with
/// [`crate::predictive::predictive_check`] instead.
///
/// # Errors
/// - [`Error::InvalidParameter`] if `hdi_prob` is outside `(0, 1]`.
/// - [`Error::EmptyInput`] if the set holds no draws.
/// - [`Error::NonFiniteInput`] if a draw is NaN or infinite.
///
/// # Examples
/// ```
/// use u_bayesflow::draws::DrawSet;
/// use u_bayesflow::summary::summarize_draws;
/// let mut set = DrawSet::new(2, 5);
/// set.insert_scalar("mu", vec![1.0, 2.0, 3.0, 4.0, 5.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// let table = summarize_draws(&set, 0.94).unwrap();
/// let row = table.row("mu").unwrap();
/// assert_eq!(row.mean, 3.0);
/// assert_eq!((row.hdi_low, row.hdi_high), (1.0, 5.0));
/// ```
pub fn summarize_draws(draws: &DrawSet, hdi_prob: f64) -> Result<SummaryTable> {
    if !(hdi_prob > 0.0 && hdi_prob <= 1.0) {
        return Err(Error::invalid("hdi_prob", hdi_prob, "0 < hdi_prob <= 1"));
    }
    if draws.total_draws() == 0 {
        return Err(Error::EmptyInput);
    }

    let mut rows = Vec::new();
    for (name, var) in draws.iter().filter(|(_, v)| v.is_scalar()) {
        let non_finite = var.values.iter().enumerate().find(|(_, x)| !x.is_finite());
        if let Some((index, &value)) = non_finite {
            return Err(Error::NonFiniteInput { index, value });
        }

        let mut pooled = WelfordAccumulator::new();
        for chain in 0..draws.chains() {
            let mut acc = WelfordAccumulator::new();
            draws.chain(name, chain)?.iter().for_each(|&x| acc.update(x));
            pooled.merge(&acc);
        }

        let (Some(mean), Some((hdi_low, hdi_high))) =
            (pooled.mean(), stats::hdi(&var.values, hdi_prob))
        else {
            return Err(Error::EmptyInput);
        };

        rows.push(SummaryRow {
            variable: name.to_string(),
            mean,
            sd: pooled.sample_std_dev().unwrap_or(0.0),
            hdi_low,
            hdi_high,
            diagnostics: None,
        });
    }

    Ok(SummaryTable { hdi_prob, rows })
}

impl SummaryTable {
    /// Attaches backend diagnostics to the matching rows.
    pub fn with_diagnostics(mut self, diagnostics: &DiagnosticsSet) -> Self {
        for row in &mut self.rows {
            row.diagnostics = diagnostics.get(&row.variable).copied();
        }
        self
    }

    pub fn row(&self, variable: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.variable == variable)
    }

    /// Column labels for the interval bounds, e.g. `("hdi_3%", "hdi_97%")`.
    pub fn hdi_labels(&self) -> (String, String) {
        let tail = (1.0 - self.hdi_prob) / 2.0 * 100.0;
        let fmt_pct = |p: f64| {
            let rounded = (p * 10.0).round() / 10.0;
            format!("hdi_{rounded}%")
        };
        (fmt_pct(tail), fmt_pct(100.0 - tail))
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .rows
            .iter()
            .map(|r| r.variable.len())
            .max()
            .unwrap_or(0)
            .max(8);
        let with_diag = self.rows.iter().any(|r| r.diagnostics.is_some());
        let (lo, hi) = self.hdi_labels();

        write!(f, "{:<name_width$} {:>9} {:>9} {:>9} {:>9}", "", "mean", "sd", lo, hi)?;
        if with_diag {
            write!(
                f,
                " {:>9} {:>9} {:>9} {:>9} {:>6}",
                "mcse_mean", "mcse_sd", "ess_bulk", "ess_tail", "r_hat"
            )?;
        }
        writeln!(f)?;

        for row in &self.rows {
            write!(
                f,
                "{:<name_width$} {:>9.3} {:>9.3} {:>9.3} {:>9.3}",
                row.variable, row.mean, row.sd, row.hdi_low, row.hdi_high
            )?;
            if with_diag {
                match &row.diagnostics {
                    Some(d) => write!(
                        f,
                        " {:>9.3} {:>9.3} {:>9.0} {:>9.0} {:>6.2}",
                        d.mcse_mean, d.mcse_sd, d.ess_bulk, d.ess_tail, d.r_hat
                    )?,
                    None => write!(f, " {:>9} {:>9} {:>9} {:>9} {:>6}", "-", "-", "-", "-", "-")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
