//! Special functions for the diffusion and transmission-line blocks.
//!
//! Hyperbolic and Bessel functions of large complex argument overflow double
//! precision long before the quantities the circuit blocks need (ratios that
//! tend to 1) stop being meaningful, so the helpers here work with those
//! ratios directly.

use num_complex::Complex64;

/// Real-part threshold above which `tanh` is replaced by its limit.
pub const TANH_SATURATION: f64 = 100.0;

/// Real-part threshold above which the Bessel ratio uses its asymptotic series.
pub const BESSEL_ASYMPTOTIC: f64 = 100.0;

const LENTZ_TINY: f64 = 1e-300;
const LENTZ_EPS: f64 = 1e-16;
const LENTZ_MAX_TERMS: usize = 10_000;

/// Complex hyperbolic tangent that saturates to `1 + 0j` once `Re(z) >= 100`.
///
/// # Examples
///
/// ```
/// use eisfit_rs::utils::special::saturating_tanh;
/// use num_complex::Complex64;
///
/// let t = saturating_tanh(Complex64::new(250.0, 250.0));
/// assert_eq!(t, Complex64::new(1.0, 0.0));
/// ```
pub fn saturating_tanh(z: Complex64) -> Complex64 {
    if z.re >= TANH_SATURATION {
        Complex64::new(1.0, 0.0)
    } else {
        z.tanh()
    }
}

/// `coth(z)` built on [`saturating_tanh`].
pub fn saturating_coth(z: Complex64) -> Complex64 {
    saturating_tanh(z).inv()
}

/// Ratio `I1(x) / I0(x)` of modified Bessel functions of the first kind.
///
/// Evaluated with the modified Lentz method on the continued fraction
/// `I1/I0 = 1 / (2/x + 1 / (4/x + 1 / (6/x + ...)))`. For `Re(x) >= 100` the
/// large-argument expansion
/// `1 - 1/(2x) - 1/(8x^2) - 1/(8x^3) - 25/(128x^4)` is used instead.
pub fn bessel_i1_i0_ratio(x: Complex64) -> Complex64 {
    if x == Complex64::new(0.0, 0.0) {
        return x;
    }
    if x.re >= BESSEL_ASYMPTOTIC {
        let inv = x.inv();
        let inv2 = inv * inv;
        return 1.0 - 0.5 * inv - 0.125 * inv2 - 0.125 * inv2 * inv - 25.0 / 128.0 * inv2 * inv2;
    }

    let tiny = Complex64::new(LENTZ_TINY, 0.0);
    let mut f = tiny;
    let mut c = f;
    let mut d = Complex64::new(0.0, 0.0);

    for k in 1..=LENTZ_MAX_TERMS {
        let b = Complex64::new(2.0 * k as f64, 0.0) / x;
        d = b + d;
        if d.norm() < LENTZ_TINY {
            d = tiny;
        }
        c = b + c.inv();
        if c.norm() < LENTZ_TINY {
            c = tiny;
        }
        d = d.inv();
        let delta = c * d;
        f *= delta;
        if (delta - 1.0).norm() < LENTZ_EPS {
            break;
        }
    }

    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Power series of `I_nu(x)` for integer order.
    fn bessel_series(nu: u32, x: Complex64) -> Complex64 {
        let half = x / 2.0;
        let mut term = half.powu(nu);
        for k in 1..=nu {
            term /= k as f64;
        }
        let mut sum = Complex64::new(0.0, 0.0);
        for k in 0..200u32 {
            sum += term;
            term *= half * half / (((k + 1) * (k + 1 + nu)) as f64);
        }
        sum
    }

    #[test]
    fn test_tanh_saturates() {
        for re in [100.0, 150.0, 1e6] {
            let t = saturating_tanh(Complex64::new(re, re));
            assert_eq!(t, Complex64::new(1.0, 0.0));
            assert!(t.re.is_finite() && t.im.is_finite());
        }
    }

    #[test]
    fn test_tanh_below_threshold_is_analytic() {
        let z = Complex64::new(99.9, 3.0);
        let t = saturating_tanh(z);
        let exact = z.tanh();
        assert_relative_eq!(t.re, exact.re, epsilon = 1e-6);
        assert_relative_eq!(t.im, exact.im, epsilon = 1e-6);

        // The jump at the threshold is negligible
        assert!((t - Complex64::new(1.0, 0.0)).norm() < 1e-6);

        let z = Complex64::new(0.3, -0.7);
        let t = saturating_tanh(z);
        assert_relative_eq!(t.re, z.tanh().re, epsilon = 1e-15);
        assert_relative_eq!(t.im, z.tanh().im, epsilon = 1e-15);
    }

    #[test]
    fn test_bessel_ratio_matches_power_series() {
        let points = [
            Complex64::new(0.01, 0.01),
            Complex64::new(0.5, 0.5),
            Complex64::new(1.0, 0.0),
            Complex64::new(3.0, 3.0),
            Complex64::new(2.0, -1.5),
        ];
        for x in points {
            let expected = bessel_series(1, x) / bessel_series(0, x);
            let ratio = bessel_i1_i0_ratio(x);
            assert_relative_eq!(ratio.re, expected.re, epsilon = 1e-10, max_relative = 1e-10);
            assert_relative_eq!(ratio.im, expected.im, epsilon = 1e-10, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_bessel_ratio_at_diffusion_phase() {
        // I1(x)/I0(x) at 50 significant digits, rounded to 17
        let reference = [
            (20.0, 0.987_504_227_107_032_04, 0.012_660_138_180_666_92),
            (50.0, 0.995_000_257_974_723_41, 0.005_025_249_828_860_502_1),
            (99.9, 0.997_497_529_336_776_07, 0.002_508_796_359_977_960_4),
            (150.0, 0.998_333_342_689_711_81, 0.001_669_453_703_023_362_7),
            (300.0, 0.999_166_667_830_123_13, 0.000_834_028_935_164_106_96),
        ];
        for (a, re, im) in reference {
            let expected = Complex64::new(re, im);
            let ratio = bessel_i1_i0_ratio(Complex64::new(a, a));
            let rel = (ratio - expected).norm() / expected.norm();
            assert!(rel < 1e-10, "x = {a}+{a}i: relative error {rel:e}");
        }
    }

    #[test]
    fn test_bessel_ratio_is_continuous_at_asymptotic_switch() {
        let below = bessel_i1_i0_ratio(Complex64::new(99.999, 99.999));
        let above = bessel_i1_i0_ratio(Complex64::new(100.0, 100.0));
        assert!((below - above).norm() < 1e-8);

        let huge = bessel_i1_i0_ratio(Complex64::new(1e8, 1e8));
        assert!(huge.re.is_finite() && huge.im.is_finite());
        assert_relative_eq!(huge.re, 1.0, epsilon = 1e-7);
    }
}
