//! Differentially-private noise sampling.
//!
//! Scale is `sensitivity / epsilon` for Laplace and
//! `sensitivity * sqrt(2 * ln(1.25/delta)) / epsilon` for Gaussian. Both
//! draw uniform variates from [`OsRng`], never from a seeded PRNG,
//! because the noise itself is the thing protecting the secret, so its
//! source must be unpredictable to every party including the one
//! running this code. This replaces the xorshift/LCG-over-a-fixed-seed
//! sampler other federated-aggregation code in this space uses for
//! reproducibility; reproducibility is not a goal here.

use rand::RngCore;
use rand_core::OsRng;

use super::statistics::NoiseMechanism;

fn uniform_open01() -> f64 {
    let mut rng = OsRng;
    // 53 bits of entropy, rescaled into the open interval (0, 1) so
    // neither Box-Muller's ln(u1) nor Laplace's ln(1 - 2|u|) sees a zero.
    loop {
        let bits = rng.next_u64() >> 11;
        let u = (bits as f64) / (1u64 << 53) as f64;
        if u > 0.0 && u < 1.0 {
            return u;
        }
    }
}

pub fn laplace_scale(sensitivity: f64, epsilon: f64) -> f64 {
    sensitivity / epsilon
}

pub fn gaussian_sigma(sensitivity: f64, epsilon: f64, delta: f64) -> f64 {
    sensitivity * (2.0 * (1.25 / delta).ln()).sqrt() / epsilon
}

/// Laplace(0, scale) via inverse CDF.
pub fn sample_laplace(scale: f64) -> f64 {
    let u = uniform_open01() - 0.5;
    -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
}

/// N(0, sigma^2) via the Box-Muller transform.
pub fn sample_gaussian(sigma: f64) -> f64 {
    let u1 = uniform_open01();
    let u2 = uniform_open01();
    sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

pub fn sample(mechanism: NoiseMechanism, sensitivity: f64, epsilon: f64, delta: f64) -> f64 {
    match mechanism {
        NoiseMechanism::Laplace => sample_laplace(laplace_scale(sensitivity, epsilon)),
        NoiseMechanism::Gaussian => sample_gaussian(gaussian_sigma(sensitivity, epsilon, delta)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn laplace_scale_matches_formula() {
        assert!((laplace_scale(1.0, 0.5) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn gaussian_sigma_matches_formula() {
        let sigma = gaussian_sigma(1.0, 1.0, 1e-5);
        let expected = (2.0 * (1.25f64 / 1e-5).ln()).sqrt();
        assert!((sigma - expected).abs() < 1e-9);
    }

    #[test]
    fn samples_are_finite_and_vary() {
        let a = sample_laplace(1.0);
        let b = sample_laplace(1.0);
        assert!(a.is_finite() && b.is_finite());
        assert_ne!(a, b);

        let g1 = sample_gaussian(1.0);
        let g2 = sample_gaussian(1.0);
        assert!(g1.is_finite() && g2.is_finite());
        assert_ne!(g1, g2);
    }
}
