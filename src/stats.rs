//! Descriptive statistics with numerical stability guarantees.
//!
//! Low-level building blocks used by [`crate::sample`] and
//! [`crate::summary`]. Functions here return `Option` and leave error
//! reporting to the callers that know which input was at fault.
//!
//! # Algorithms
//!
//! - **Mean**: Neumaier compensated summation for O(ε) error independent of n.
//! - **Variance/StdDev**: Welford's online algorithm.
//!   Reference: Welford (1962), "Note on a Method for Calculating
//!   Corrected Sums of Squares and Products", *Technometrics* 4(3).
//! - **HDI**: narrowest window over the sorted draws.
//!   Reference: Chen & Shao (1999), "Monte Carlo Estimation of Bayesian
//!   Credible and HPD Intervals", *JCGS* 8(1).

/// Computes the arithmetic mean using compensated summation.
///
/// # Complexity
/// Time: O(n), Space: O(1)
///
/// # Returns
/// - `None` if `data` is empty or contains any NaN/Inf.
///
/// # Examples
/// ```
/// use u_bayesflow::stats::mean;
/// let v = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert!((mean(&v).unwrap() - 3.0).abs() < 1e-15);
/// ```
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    if !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    let sum = kahan_sum(data);
    if sum.is_finite() {
        return Some(sum / data.len() as f64);
    }
    // The sum overflowed; the running mean stays in range.
    accumulate(data).and_then(|acc| acc.mean())
}

/// Computes the sample variance (Bessel's correction, denominator `n − 1`).
///
/// # Returns
/// - `None` if `data.len() < 2` or contains NaN/Inf.
///
/// # Examples
/// ```
/// use u_bayesflow::stats::variance;
/// let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((variance(&v).unwrap() - 4.571428571428571).abs() < 1e-10);
/// ```
pub fn variance(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    accumulate(data)?.sample_variance()
}

/// Computes the population variance (denominator `n`).
///
/// # Returns
/// - `None` if `data` is empty or contains NaN/Inf.
///
/// # Examples
/// ```
/// use u_bayesflow::stats::population_variance;
/// let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((population_variance(&v).unwrap() - 4.0).abs() < 1e-10);
/// ```
pub fn population_variance(data: &[f64]) -> Option<f64> {
    accumulate(data)?.population_variance()
}

/// Computes the sample standard deviation, `sqrt(variance(data))`.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// Computes the population standard deviation,
/// `sqrt(population_variance(data))`.
///
/// # Examples
/// ```
/// use u_bayesflow::stats::population_std_dev;
/// let sd = population_std_dev(&[1.0, 2.0, 3.0]).unwrap();
/// assert!((sd - 0.816496580927726).abs() < 1e-12);
/// ```
pub fn population_std_dev(data: &[f64]) -> Option<f64> {
    population_variance(data).map(f64::sqrt)
}

/// Returns the minimum value in the slice, or `None` if empty or NaN.
pub fn min(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    data.iter().copied().try_fold(f64::INFINITY, |acc, x| {
        if x.is_nan() {
            None
        } else {
            Some(acc.min(x))
        }
    })
}

/// Returns the maximum value in the slice, or `None` if empty or NaN.
pub fn max(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    data.iter().copied().try_fold(f64::NEG_INFINITY, |acc, x| {
        if x.is_nan() {
            None
        } else {
            Some(acc.max(x))
        }
    })
}

/// Highest density interval of a set of draws.
///
/// Clones and sorts the data, then delegates to [`hdi_sorted`].
///
/// # Returns
/// - `None` if `data` is empty, contains NaN, or `prob` is outside `(0, 1]`.
///
/// # Examples
/// ```
/// use u_bayesflow::stats::hdi;
/// let data: Vec<f64> = (0..=100).map(f64::from).collect();
/// let (lo, hi) = hdi(&data, 0.5).unwrap();
/// assert!((hi - lo - 50.0).abs() < 1e-12);
/// ```
pub fn hdi(data: &[f64], prob: f64) -> Option<(f64, f64)> {
    if data.iter().any(|x| x.is_nan()) {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    hdi_sorted(&sorted, prob)
}

/// Highest density interval on **pre-sorted** draws.
///
/// # Algorithm
/// With `k = ⌊prob × n⌋` (capped at `n − 1`), every window
/// `[x[i], x[i+k]]` holds at least a `prob` share of the draws; the
/// narrowest one is returned. Ties resolve to the lowest `i`.
///
/// # Complexity
/// Time: O(n), Space: O(1)
///
/// # Returns
/// - `None` if `sorted_data` is empty or `prob` is outside `(0, 1]`.
pub fn hdi_sorted(sorted_data: &[f64], prob: f64) -> Option<(f64, f64)> {
    let n = sorted_data.len();
    if n == 0 || !(prob > 0.0 && prob <= 1.0) {
        return None;
    }
    let k = ((prob * n as f64).floor() as usize).min(n - 1);
    let mut best = 0;
    let mut best_width = f64::INFINITY;
    for i in 0..n - k {
        let width = sorted_data[i + k] - sorted_data[i];
        if width < best_width {
            best_width = width;
            best = i;
        }
    }
    Some((sorted_data[best], sorted_data[best + k]))
}

fn accumulate(data: &[f64]) -> Option<WelfordAccumulator> {
    if data.is_empty() || !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    let mut acc = WelfordAccumulator::new();
    for &x in data {
        acc.update(x);
    }
    Some(acc)
}

// ---------------------------------------------------------------------------
// Compensated summation
// ---------------------------------------------------------------------------

/// Neumaier compensated summation for O(ε) error independent of `n`.
///
/// An improved variant of Kahan summation that also handles the case
/// where the addend is larger in magnitude than the running sum.
///
/// Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
/// zur Summation endlicher Summen", *ZAMM* 54(1), pp. 39–51.
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for &x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    if !sum.is_finite() {
        return sum;
    }
    sum + c
}

// ---------------------------------------------------------------------------
// Welford online accumulator
// ---------------------------------------------------------------------------

/// Streaming accumulator for mean and variance.
///
/// Used to pool statistics across MCMC chains: each chain is accumulated
/// separately and the results are combined with [`merge`](Self::merge).
///
/// # Examples
/// ```
/// use u_bayesflow::stats::WelfordAccumulator;
/// let mut acc = WelfordAccumulator::new();
/// for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     acc.update(x);
/// }
/// assert!((acc.mean().unwrap() - 5.0).abs() < 1e-15);
/// assert!((acc.population_variance().unwrap() - 4.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WelfordAccumulator {
    count: u64,
    mean_acc: f64,
    m2: f64,
}

impl WelfordAccumulator {
    /// Creates a new empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a new value into the accumulator.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.mean_acc = value;
            return;
        }
        let delta = value - self.mean_acc;
        self.mean_acc += delta / self.count as f64;
        self.m2 += delta * (value - self.mean_acc);
    }

    /// Returns the number of values seen so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the running mean, or `None` if nothing has been added.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean_acc)
    }

    /// Sample variance (n − 1), or `None` with fewer than 2 values.
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count >= 2).then(|| self.m2 / (self.count - 1) as f64)
    }

    /// Population variance (n), or `None` if nothing has been added.
    pub fn population_variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    pub fn sample_std_dev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    pub fn population_std_dev(&self) -> Option<f64> {
        self.population_variance().map(f64::sqrt)
    }

    /// Merges another accumulator into this one.
    ///
    /// Reference: Chan, Golub & LeVeque (1979), "Updating Formulae and a
    /// Pairwise Algorithm for Computing Sample Variances".
    pub fn merge(&mut self, other: &WelfordAccumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let total = self.count + other.count;
        let n = total as f64;
        let delta = other.mean_acc - self.mean_acc;

        self.mean_acc += delta * (nb / n);
        self.m2 += other.m2 + delta * delta * na * nb / n;
        self.count = total;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
