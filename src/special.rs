//! Special mathematical functions.
//!
//! Numerical pieces shared by the log densities in
//! [`crate::distributions`].

/// ln √(2π) ≈ 0.9189385332046727
pub const LN_SQRT_2PI: f64 = 0.9189385332046727417803297364056176398613974736377;

/// Log of the standard normal PDF, `−x²/2 − ln √(2π)`.
///
/// Evaluated in log space, so it stays finite far into the tails where the
/// density itself underflows to zero.
///
/// # Examples
/// ```
/// use u_bayesflow::special::{standard_normal_ln_pdf, LN_SQRT_2PI};
/// assert_eq!(standard_normal_ln_pdf(0.0), -LN_SQRT_2PI);
/// ```
pub fn standard_normal_ln_pdf(x: f64) -> f64 {
    -0.5 * x * x - LN_SQRT_2PI
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn ln_pdf_symmetric(x in -50.0_f64..50.0) {
            prop_assert_eq!(standard_normal_ln_pdf(x), standard_normal_ln_pdf(-x));
        }

        #[test]
        fn ln_pdf_peaks_at_zero(x in -50.0_f64..50.0) {
            prop_assert!(standard_normal_ln_pdf(x) <= standard_normal_ln_pdf(0.0));
        }
    }
}
