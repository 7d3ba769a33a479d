//! Analytic modes of the metallic cylinder.
//!
//! A z-uniform TM mode has `Ez = J_m(k r)` with `J_m(kR) = 0`, a TE mode
//! `Hz = J_m(k r)` with `J_m'(kR) = 0`. They are convenient initial states
//! for resonance and band tests.

use super::Fields;
use crate::arrays::{Component, FieldType};
use crate::constants::PI;
use num_complex::Complex64;

/// Trapezoid points for Bessel's integral.
const BESSEL_POINTS: usize = 256;
/// Scan step when bracketing zeros.
const SCAN_STEP: f64 = 0.05;

/// Bessel function of the first kind, `J_m(x) = (1/π)∫₀^π cos(mτ − x sin τ) dτ`.
///
/// The integrand is smooth and periodic once mirrored to `[−π, π]`, so the
/// trapezoid rule converges geometrically.
pub fn bessel_j(m: i32, x: f64) -> f64 {
    let h = PI / BESSEL_POINTS as f64;
    let m = m as f64;
    let f = |tau: f64| (m * tau - x * tau.sin()).cos();
    let mut sum = 0.5 * (f(0.0) + f(PI));
    for i in 1..BESSEL_POINTS {
        sum += f(i as f64 * h);
    }
    sum * h / PI
}

/// Derivative `J_m'(x) = (J_{m−1}(x) − J_{m+1}(x))/2`.
pub fn bessel_j_prime(m: i32, x: f64) -> f64 {
    0.5 * (bessel_j(m - 1, x) - bessel_j(m + 1, x))
}

/// n-th positive zero (n ≥ 1) of `g`, scanning upward from `start`.
fn nth_zero(g: impl Fn(f64) -> f64, start: f64, n: usize) -> f64 {
    let mut found = 0;
    let mut lo = start;
    let mut g_lo = g(lo);
    loop {
        let hi = lo + SCAN_STEP;
        let g_hi = g(hi);
        if g_lo == 0.0 || g_lo.signum() != g_hi.signum() {
            found += 1;
            if found == n {
                return bisect(&g, lo, hi);
            }
        }
        lo = hi;
        g_lo = g_hi;
    }
}

fn bisect(g: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let g_lo = g(lo);
    if g_lo == 0.0 {
        return lo;
    }
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        if g(mid).signum() == g_lo.signum() {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Start of the zero scan. Below `m/2` both `J_m` and `J_m'` are too small
/// to carry a reliable sign, and no zero lies there.
fn scan_start(m: i32) -> f64 {
    (0.5 * m.unsigned_abs() as f64).max(0.01)
}

/// n-th positive zero of `J_m`.
pub fn bessel_zero(m: i32, n: usize) -> f64 {
    let m = m.abs();
    nth_zero(|x| bessel_j(m, x), scan_start(m), n)
}

/// n-th positive zero of `J_m'` (x = 0 excluded).
pub fn bessel_prime_zero(m: i32, n: usize) -> f64 {
    let m = m.abs();
    nth_zero(|x| bessel_j_prime(m, x), scan_start(m), n)
}

impl Fields {
    /// Add `f(position)` to component `c` at every active point.
    fn add_to_field(&mut self, c: Component, f: impl Fn(f64) -> f64) {
        let v = self.volume;
        let active: Vec<(usize, usize)> = (0..v.nr())
            .flat_map(|ir| (0..=v.nz()).map(move |iz| (ir, iz)))
            .filter(|&(ir, iz)| self.is_active(c, ir, iz))
            .collect();
        let field = match c.field_type() {
            FieldType::E => self.e.current.component_mut(c.direction()),
            FieldType::H => self.h.current.component_mut(c.direction()),
        };
        for (ir, iz) in active {
            field.add(ir, iz, Complex64::new(f(v.location(c, ir, iz).r), 0.0));
        }
        if c.field_type() == FieldType::E {
            self.sync_previous_e(c.direction());
        }
    }

    /// Add the n-th (n ≥ 1) TE mode, `Hz = J_m(k r)` with `J_m'(kR) = 0`.
    ///
    /// # Panics
    /// If `n == 0`.
    pub fn initialize_with_nth_te(&mut self, n: usize) {
        assert!(n >= 1, "mode numbers start at 1");
        let m = self.m.abs();
        let k = bessel_prime_zero(m, n) / self.volume.rmax();
        self.add_to_field(Component::Hz, |r| bessel_j(m, k * r));
    }

    /// Add the n-th (n ≥ 1) TM mode, `Ez = J_m(k r)` with `J_m(kR) = 0`.
    ///
    /// # Panics
    /// If `n == 0`.
    pub fn initialize_with_nth_tm(&mut self, n: usize) {
        assert!(n >= 1, "mode numbers start at 1");
        let m = self.m.abs();
        let k = bessel_zero(m, n) / self.volume.rmax();
        self.add_to_field(Component::Ez, |r| bessel_j(m, k * r));
    }

    /// Superpose the first `n` TE modes.
    pub fn initialize_with_n_te(&mut self, n: usize) {
        for i in 1..=n {
            self.initialize_with_nth_te(i);
        }
    }

    /// Superpose the first `n` TM modes.
    pub fn initialize_with_n_tm(&mut self, n: usize) {
        for i in 1..=n {
            self.initialize_with_nth_tm(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Volume;
    use crate::material::Material;
    use approx::assert_relative_eq;

    #[test]
    fn test_bessel_values() {
        assert_relative_eq!(bessel_j(0, 0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(bessel_j(1, 0.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(bessel_j(0, 1.0), 0.765_197_686_557_966_6, epsilon = 1e-12);
        assert_relative_eq!(bessel_j(1, 2.0), 0.576_724_807_756_873_4, epsilon = 1e-12);
        assert_relative_eq!(bessel_j(-1, 2.0), -0.576_724_807_756_873_4, epsilon = 1e-12);
    }

    #[test]
    fn test_bessel_zeros() {
        assert_relative_eq!(bessel_zero(0, 1), 2.404_825_557_695_773, epsilon = 1e-9);
        assert_relative_eq!(bessel_zero(0, 2), 5.520_078_110_286_311, epsilon = 1e-9);
        assert_relative_eq!(bessel_zero(1, 1), 3.831_705_970_207_512, epsilon = 1e-9);
        assert_relative_eq!(bessel_prime_zero(0, 1), 3.831_705_970_207_512, epsilon = 1e-9);
        assert_relative_eq!(bessel_prime_zero(1, 1), 1.841_183_781_340_659, epsilon = 1e-9);
        assert_relative_eq!(bessel_prime_zero(2, 1), 3.054_236_928_227_140, epsilon = 1e-9);
    }

    #[test]
    fn test_tm_mode_profile() {
        let v = Volume::new(1.0, 1.0, 10.0).unwrap();
        let mut f = Fields::from_material(&Material::new(v, |_| 1.0), 0);
        f.initialize_with_nth_tm(1);
        let ez = &f.e_field().z;
        assert_relative_eq!(ez.get(0, 3).re, 1.0, epsilon = 1e-12);
        let expected = bessel_j(0, 2.404_825_557_695_773 * 0.5);
        assert_relative_eq!(ez.get(5, 3).re, expected, epsilon = 1e-9);
        // Adding twice doubles the amplitude.
        f.initialize_with_nth_tm(1);
        assert_relative_eq!(f.e_field().z.get(0, 3).re, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_te_mode_on_hz() {
        let v = Volume::new(1.0, 1.0, 10.0).unwrap();
        let mut f = Fields::from_material(&Material::new(v, |_| 1.0), 1);
        f.initialize_with_n_te(2);
        assert!(f.h_field().z.norm_sqr() > 0.0);
        assert_eq!(f.e_field().z.norm_sqr(), 0.0);
    }
}
