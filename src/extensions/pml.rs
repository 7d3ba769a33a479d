//! Split-field perfectly matched layers.
//!
//! Every field component is the sum of two curl terms (see
//! [`Component::split_directions`]). Inside an absorbing layer each term is
//! advanced separately with the conductivity of its own direction:
//!
//!   other' = d(σo)·other + k(σo)·B
//!   main'  = d(σm)·(f − other) + k(σm)·A
//!   f'     = main' + other'
//!
//! with `x = σ·dt/2`, `d = (1 − x)/(1 + x)` and `k = 1/(1 + x)`. Outside
//! the layers both conductivities vanish and the update reduces to the
//! plain leapfrog `f' = f + A + B`.
//!
//! Reference: Berenger, "A perfectly matched layer for the absorption of
//! electromagnetic waves", J. Comput. Phys. 114, 1994.

use crate::arrays::{Component, Direction};
use crate::geometry::Position;
use crate::{Error, Result};
use num_complex::Complex64;

/// Grading of the layer conductivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PmlConfig {
    /// Polynomial grading order (typically 2-4)
    pub grading_order: f64,
    /// Target normal-incidence reflection coefficient (e.g., 1e-6)
    pub reflection: f64,
}

impl Default for PmlConfig {
    fn default() -> Self {
        Self {
            grading_order: 3.0,
            reflection: 1e-6,
        }
    }
}

impl PmlConfig {
    /// Peak conductivity for a layer of the given thickness.
    pub fn sigma_max(&self, thickness: f64) -> f64 {
        // sigma_max = -(m+1) * ln(R) / (2 * d)
        -(self.grading_order + 1.0) * self.reflection.ln() / (2.0 * thickness)
    }

    /// Conductivity at `depth` into a layer of `thickness`.
    ///
    /// Zero at the interior edge, `sigma_max` at the outer boundary.
    pub fn conductivity(&self, depth: f64, thickness: f64) -> f64 {
        if depth <= 0.0 || thickness <= 0.0 {
            return 0.0;
        }
        let rho = (depth / thickness).clamp(0.0, 1.0);
        self.sigma_max(thickness) * rho.powf(self.grading_order)
    }
}

/// Thicknesses of the installed absorbing layers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PmlLayers {
    /// Layer at z = 0
    pub left: f64,
    /// Layer at z = L
    pub right: f64,
    /// Layer at r = R
    pub radial: f64,
}

impl PmlLayers {
    /// Whether any layer is installed.
    pub fn any(&self) -> bool {
        self.left > 0.0 || self.right > 0.0 || self.radial > 0.0
    }

    /// Conductivity in `direction` at position `p` of a cylinder of radius
    /// `rmax` and length `zmax`.
    pub fn sigma(
        &self,
        config: &PmlConfig,
        direction: Direction,
        p: Position,
        rmax: f64,
        zmax: f64,
    ) -> f64 {
        match direction {
            Direction::R => config.conductivity(p.r - (rmax - self.radial), self.radial),
            Direction::Z => {
                config.conductivity(self.left - p.z, self.left)
                    + config.conductivity(p.z - (zmax - self.right), self.right)
            }
            Direction::P => 0.0,
        }
    }
}

/// Check a requested layer thickness against the domain extent.
pub fn validate_thickness(thickness: f64, extent: f64, name: &str) -> Result<()> {
    if !thickness.is_finite() || thickness <= 0.0 {
        return Err(Error::Config(format!(
            "{name} PML thickness must be positive, got {thickness}"
        )));
    }
    if thickness >= 0.5 * extent {
        return Err(Error::Config(format!(
            "{name} PML thickness {thickness} must be less than half the extent {extent}"
        )));
    }
    Ok(())
}

/// Decay and drive factors `(d, k)` of one split term.
#[inline]
pub fn split_factors(sigma: f64, dt: f64) -> (f64, f64) {
    let x = 0.5 * sigma * dt;
    ((1.0 - x) / (1.0 + x), 1.0 / (1.0 + x))
}

/// Advance one split-field point.
///
/// `f` and `other` are the previous total value and its "other" part,
/// `a` and `b` the main and other curl terms. Returns the new total and the
/// new "other" part.
#[inline]
pub fn split_update(
    f: Complex64,
    other: Complex64,
    a: Complex64,
    b: Complex64,
    sigma_main: f64,
    sigma_other: f64,
    dt: f64,
) -> (Complex64, Complex64) {
    if sigma_main == 0.0 && sigma_other == 0.0 {
        return (f + a + b, other + b);
    }
    let (dm, km) = split_factors(sigma_main, dt);
    let (d_o, k_o) = split_factors(sigma_other, dt);
    let other_new = other * d_o + b * k_o;
    let main_new = (f - other) * dm + a * km;
    (main_new + other_new, other_new)
}

/// Conductivity of a component's main and other terms at its location.
pub fn component_sigmas(
    layers: &PmlLayers,
    config: &PmlConfig,
    c: Component,
    p: Position,
    rmax: f64,
    zmax: f64,
) -> (f64, f64) {
    let (main, other) = c.split_directions();
    (
        layers.sigma(config, main, p, rmax, zmax),
        layers.sigma(config, other, p, rmax, zmax),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config() {
        let config = PmlConfig::default();
        assert_eq!(config.grading_order, 3.0);
        assert_eq!(config.reflection, 1e-6);
    }

    #[test]
    fn test_sigma_max() {
        let config = PmlConfig::default();
        let sigma = config.sigma_max(1.0);
        assert_relative_eq!(sigma, -4.0 * 1e-6f64.ln() / 2.0);
        assert!(sigma > 0.0);
    }

    #[test]
    fn test_profile_grading() {
        let config = PmlConfig::default();
        assert_eq!(config.conductivity(0.0, 1.0), 0.0);
        assert_eq!(config.conductivity(-0.5, 1.0), 0.0);
        assert_relative_eq!(config.conductivity(1.0, 1.0), config.sigma_max(1.0));
        let half = config.conductivity(0.5, 1.0);
        assert_relative_eq!(half, config.sigma_max(1.0) * 0.125);
    }

    #[test]
    fn test_decay_factor_bounded() {
        // The decay factor must stay within [-1, 1] for any conductivity so
        // the layer never amplifies.
        for &sigma in &[0.0, 0.1, 1.0, 10.0, 100.0, 1e6] {
            let (d, k) = split_factors(sigma, 0.05);
            assert!(d.abs() <= 1.0, "sigma={sigma} d={d}");
            assert!(k > 0.0 && k <= 1.0, "sigma={sigma} k={k}");
        }
    }

    #[test]
    fn test_split_update_lossless_limit() {
        let f = Complex64::new(1.0, 0.5);
        let other = Complex64::new(0.25, 0.0);
        let a = Complex64::new(0.1, 0.0);
        let b = Complex64::new(0.0, -0.2);
        let (f_new, other_new) = split_update(f, other, a, b, 0.0, 0.0, 0.05);
        assert_eq!(f_new, f + a + b);
        assert_eq!(other_new, other + b);
    }

    #[test]
    fn test_split_update_damps() {
        let f = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        let (f_new, _) = split_update(f, zero, zero, zero, 10.0, 10.0, 0.05);
        assert!(f_new.norm() < 1.0);
    }

    #[test]
    fn test_layer_sigma_regions() {
        let config = PmlConfig::default();
        let layers = PmlLayers {
            left: 1.0,
            right: 1.0,
            radial: 0.5,
        };
        let centre = Position::new(0.5, 2.5);
        assert_eq!(layers.sigma(&config, Direction::Z, centre, 2.0, 5.0), 0.0);
        assert_eq!(layers.sigma(&config, Direction::R, centre, 2.0, 5.0), 0.0);
        let edge = Position::new(2.0, 0.0);
        assert!(layers.sigma(&config, Direction::Z, edge, 2.0, 5.0) > 0.0);
        assert!(layers.sigma(&config, Direction::R, edge, 2.0, 5.0) > 0.0);
        assert_eq!(layers.sigma(&config, Direction::P, edge, 2.0, 5.0), 0.0);
    }

    #[test]
    fn test_validate_thickness() {
        assert!(validate_thickness(1.0, 5.0, "left").is_ok());
        assert!(validate_thickness(2.5, 5.0, "left").is_err());
        assert!(validate_thickness(0.0, 5.0, "left").is_err());
    }
}
