//! Numerical constants of the scheme.
//!
//! Lengths are measured in units of the lattice constant and the speed of
//! light is 1, so no physical constants appear in the update equations.

/// Courant number: one time step is `C` grid cells of light travel.
pub const C: f64 = 0.5;

/// Pi
pub const PI: f64 = std::f64::consts::PI;

/// 2π
pub const TWO_PI: f64 = 2.0 * PI;
