//! Probability distributions available as model families.
//!
//! Each type carries validated parameters, a log density and a sampler
//! built on `rand_distr`'s standard variates.
//!
//! # Supported Distributions
//!
//! | Distribution | Parameters | Support |
//! |---|---|---|
//! | [`Normal`] | μ, σ | ℝ |
//! | [`HalfNormal`] | σ | [0, ∞) |
//! | [`Uniform`] | lower, upper | [lower, upper] |
//! | [`Exponential`] | λ | [0, ∞) |
//! | [`LogNormal`] | μ, σ | (0, ∞) |
//!
//! [`Continuous`] wraps any of them so model code can evaluate and sample a
//! variable without knowing its family.

use std::f64::consts::LN_2;

use rand::Rng;
use rand_distr::{Exp1, StandardNormal};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::special;

fn require_finite(param: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid(param, value, "a finite value"))
    }
}

fn require_positive(param: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(param, value, "a finite value > 0"))
    }
}

// ============================================================================
// Normal Distribution
// ============================================================================

/// Normal (Gaussian) distribution N(μ, σ²).
///
/// # Mathematical Definition
/// - ln PDF: −(x−μ)²/(2σ²) − ln σ − ln √(2π)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Normal {
    mu: f64,
    sigma: f64,
}

impl Normal {
    /// Creates a new normal distribution N(μ, σ).
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `sigma ≤ 0` or either
    /// parameter is not finite.
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        require_finite("mu", mu)?;
        require_positive("sigma", sigma)?;
        Ok(Self { mu, sigma })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn ln_pdf(&self, x: f64) -> f64 {
        let z = (x - self.mu) / self.sigma;
        special::standard_normal_ln_pdf(z) - self.sigma.ln()
    }

    /// Draws μ + σ·Z with Z ~ N(0, 1).
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.mu + self.sigma * z
    }
}

// ============================================================================
// Half-Normal Distribution
// ============================================================================

/// Half-normal distribution: |X| for X ~ N(0, σ²).
///
/// The usual weakly-informative prior for a scale parameter.
///
/// # Mathematical Definition
/// - PDF: 2φ(x/σ)/σ for x ≥ 0, where φ is the standard normal density
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HalfNormal {
    sigma: f64,
}

impl HalfNormal {
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `sigma ≤ 0` or not finite.
    pub fn new(sigma: f64) -> Result<Self> {
        require_positive("sigma", sigma)?;
        Ok(Self { sigma })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn ln_pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return f64::NEG_INFINITY;
        }
        LN_2 + special::standard_normal_ln_pdf(x / self.sigma) - self.sigma.ln()
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.sigma * z.abs()
    }
}

// ============================================================================
// Uniform Distribution
// ============================================================================

/// Continuous uniform distribution on `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Uniform {
    lower: f64,
    upper: f64,
}

impl Uniform {
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `lower >= upper` or either
    /// bound is not finite.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        require_finite("lower", lower)?;
        require_finite("upper", upper)?;
        if lower >= upper {
            return Err(Error::invalid("upper", upper, format!("upper > lower ({lower})")));
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn ln_pdf(&self, x: f64) -> f64 {
        if x >= self.lower && x <= self.upper {
            -(self.upper - self.lower).ln()
        } else {
            f64::NEG_INFINITY
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.random();
        self.lower + u * (self.upper - self.lower)
    }
}

// ============================================================================
// Exponential Distribution
// ============================================================================

/// Exponential distribution with rate λ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Exponential {
    rate: f64,
}

impl Exponential {
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `rate ≤ 0` or not finite.
    pub fn new(rate: f64) -> Result<Self> {
        require_positive("rate", rate)?;
        Ok(Self { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn ln_pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            f64::NEG_INFINITY
        } else {
            self.rate.ln() - self.rate * x
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let e: f64 = rng.sample(Exp1);
        e / self.rate
    }
}

// ============================================================================
// LogNormal Distribution
// ============================================================================

/// Log-normal distribution: if X ~ LogNormal(μ, σ), then ln(X) ~ N(μ, σ²).
///
/// Reference: Johnson, Kotz & Balakrishnan (1994), *Continuous Univariate
/// Distributions*, Vol. 1, Chapter 14.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogNormal {
    mu: f64,
    sigma: f64,
}

impl LogNormal {
    /// Parameters `mu` and `sigma` are the mean and std dev of ln(X).
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `sigma ≤ 0` or either
    /// parameter is not finite.
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        require_finite("mu", mu)?;
        require_positive("sigma", sigma)?;
        Ok(Self { mu, sigma })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn ln_pdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let ln_x = x.ln();
        let z = (ln_x - self.mu) / self.sigma;
        special::standard_normal_ln_pdf(z) - self.sigma.ln() - ln_x
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        (self.mu + self.sigma * z).exp()
    }
}

// ============================================================================
// Family-erased wrapper
// ============================================================================

/// Any supported continuous distribution with concrete parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Continuous {
    Normal(Normal),
    HalfNormal(HalfNormal),
    Uniform(Uniform),
    Exponential(Exponential),
    LogNormal(LogNormal),
}

impl Continuous {
    /// Log density; `-inf` outside the support.
    pub fn ln_pdf(&self, x: f64) -> f64 {
        match self {
            Continuous::Normal(d) => d.ln_pdf(x),
            Continuous::HalfNormal(d) => d.ln_pdf(x),
            Continuous::Uniform(d) => d.ln_pdf(x),
            Continuous::Exponential(d) => d.ln_pdf(x),
            Continuous::LogNormal(d) => d.ln_pdf(x),
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match self {
            Continuous::Normal(d) => d.sample(rng),
            Continuous::HalfNormal(d) => d.sample(rng),
            Continuous::Uniform(d) => d.sample(rng),
            Continuous::Exponential(d) => d.sample(rng),
            Continuous::LogNormal(d) => d.sample(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_2_PI, PI};

    fn empirical_moments(dist: &Continuous, n: usize, seed: u64) -> (f64, f64) {
        let mut rng = create_rng(seed);
        let xs: Vec<f64> = (0..n).map(|_| dist.sample(&mut rng)).collect();
        let m = crate::stats::mean(&xs).unwrap();
        let v = crate::stats::variance(&xs).unwrap();
        (m, v)
    }

    fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
        let z = (x - mu) / sigma;
        (-0.5 * z * z).exp() / (sigma * (2.0 * PI).sqrt())
    }

    // --- Normal ---

    #[test]
    fn test_normal_ln_pdf() {
        let n = Normal::new(-1.0, 0.5).unwrap();
        for &x in &[-2.0, -1.0, 0.0, 0.3] {
            assert_relative_eq!(n.ln_pdf(x), normal_pdf(x, -1.0, 0.5).ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_normal_moments() {
        let dist = Continuous::Normal(Normal::new(2.0, 3.0).unwrap());
        let (m, v) = empirical_moments(&dist, 20_000, 7);
        assert!((m - 2.0).abs() < 0.1, "mean {m}");
        assert!((v - 9.0).abs() < 0.4, "variance {v}");
    }

    #[test]
    fn test_normal_invalid() {
        assert!(Normal::new(0.0, 0.0).is_err());
        assert!(Normal::new(0.0, -1.0).is_err());
        assert!(Normal::new(f64::NAN, 1.0).is_err());
        assert!(Normal::new(0.0, f64::INFINITY).is_err());
    }

    // --- HalfNormal ---

    #[test]
    fn test_half_normal_support() {
        let h = HalfNormal::new(2.0).unwrap();
        assert_eq!(h.ln_pdf(-0.1), f64::NEG_INFINITY);
        let mut rng = create_rng(5);
        assert!((0..1000).all(|_| h.sample(&mut rng) >= 0.0));
    }

    #[test]
    fn test_half_normal_density_is_twice_normal() {
        let h = HalfNormal::new(1.5).unwrap();
        let n = Normal::new(0.0, 1.5).unwrap();
        assert_relative_eq!(h.ln_pdf(0.8), LN_2 + n.ln_pdf(0.8), epsilon = 1e-14);
    }

    #[test]
    fn test_half_normal_moments() {
        let dist = Continuous::HalfNormal(HalfNormal::new(1.0).unwrap());
        let (m, v) = empirical_moments(&dist, 20_000, 11);
        assert!((m - FRAC_2_PI.sqrt()).abs() < 0.03, "mean {m}");
        assert!((v - (1.0 - FRAC_2_PI)).abs() < 0.03, "variance {v}");
    }

    // --- Uniform ---

    #[test]
    fn test_uniform_ln_pdf() {
        let u = Uniform::new(0.0, 10.0).unwrap();
        assert_relative_eq!(u.ln_pdf(5.0), -(10.0_f64.ln()), epsilon = 1e-15);
        assert_eq!(u.ln_pdf(-1.0), f64::NEG_INFINITY);
        assert_eq!(u.ln_pdf(11.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_uniform_invalid() {
        assert!(Uniform::new(5.0, 5.0).is_err());
        assert!(Uniform::new(5.0, 3.0).is_err());
        assert!(Uniform::new(f64::NAN, 5.0).is_err());
    }

    #[test]
    fn test_uniform_samples_in_range() {
        let u = Uniform::new(-2.0, 3.0).unwrap();
        let mut rng = create_rng(1);
        for _ in 0..1000 {
            let x = u.sample(&mut rng);
            assert!((-2.0..3.0).contains(&x));
        }
    }

    // --- Exponential ---

    #[test]
    fn test_exponential_ln_pdf() {
        let e = Exponential::new(2.0).unwrap();
        assert_relative_eq!(e.ln_pdf(1.0), 2.0_f64.ln() - 2.0, epsilon = 1e-15);
        assert_eq!(e.ln_pdf(-0.5), f64::NEG_INFINITY);
        assert!(Exponential::new(0.0).is_err());
    }

    #[test]
    fn test_exponential_moments() {
        let dist = Continuous::Exponential(Exponential::new(4.0).unwrap());
        let (m, _) = empirical_moments(&dist, 20_000, 3);
        assert!((m - 0.25).abs() < 0.01, "mean {m}");
    }

    // --- LogNormal ---

    #[test]
    fn test_lognormal_ln_pdf() {
        let ln = LogNormal::new(0.0, 1.0).unwrap();
        assert_eq!(ln.ln_pdf(0.0), f64::NEG_INFINITY);
        assert_eq!(ln.ln_pdf(-1.0), f64::NEG_INFINITY);
        // change of variables from N(0, 1) on ln x
        let x = 2.0_f64;
        let expected = normal_pdf(x.ln(), 0.0, 1.0).ln() - x.ln();
        assert_relative_eq!(ln.ln_pdf(x), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_lognormal_samples_positive() {
        let dist = Continuous::LogNormal(LogNormal::new(0.0, 0.5).unwrap());
        let mut rng = create_rng(9);
        assert!((0..1000).all(|_| dist.sample(&mut rng) > 0.0));
    }

    // --- Continuous ---

    #[test]
    fn test_continuous_dispatch() {
        let inner = Normal::new(1.0, 2.0).unwrap();
        let d = Continuous::Normal(inner);
        assert_eq!(d.ln_pdf(0.4), inner.ln_pdf(0.4));
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains(r#""family":"normal""#));
    }
}
