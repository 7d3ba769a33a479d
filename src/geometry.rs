//! Computational volume and positions.
//!
//! A [`Volume`] is an `R x L` cylinder discretised with `a` cells per unit
//! length. It is immutable once built and shared by value between the
//! material, the fields and the diagnostics that refer to the same grid.

use crate::arrays::Component;
use crate::constants::{C, TWO_PI};
use crate::{Error, Result};

/// A point in the (r, z) half-plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Radial coordinate
    pub r: f64,
    /// Axial coordinate
    pub z: f64,
}

impl Position {
    /// Create a position.
    pub const fn new(r: f64, z: f64) -> Self {
        Self { r, z }
    }
}

/// Axis-aligned sub-volume of the computational cylinder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Inner radius
    pub rmin: f64,
    /// Outer radius
    pub rmax: f64,
    /// Lower z bound
    pub zmin: f64,
    /// Upper z bound
    pub zmax: f64,
}

impl Region {
    /// Create a region from its bounds.
    pub fn new(rmin: f64, rmax: f64, zmin: f64, zmax: f64) -> Self {
        Self {
            rmin,
            rmax,
            zmin,
            zmax,
        }
    }

    /// Whether a position lies inside (boundaries included).
    pub fn contains(&self, p: Position) -> bool {
        const TOL: f64 = 1e-9;
        p.r >= self.rmin - TOL
            && p.r <= self.rmax + TOL
            && p.z >= self.zmin - TOL
            && p.z <= self.zmax + TOL
    }
}

/// The discretised computational cylinder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    nr: usize,
    nz: usize,
    a: f64,
    inva: f64,
}

impl Volume {
    /// Create a volume of radius `rmax` and length `zmax` with `a` cells per
    /// unit length.
    ///
    /// # Errors
    /// Fails if the resolution is not positive or either extent rounds to
    /// zero cells.
    pub fn new(rmax: f64, zmax: f64, a: f64) -> Result<Self> {
        if !a.is_finite() || a <= 0.0 {
            return Err(Error::Config(format!("invalid resolution {a}")));
        }
        let nr = (rmax * a).round();
        let nz = (zmax * a).round();
        if nr.is_nan() || nz.is_nan() || nr < 1.0 || nz < 1.0 {
            return Err(Error::Config(format!(
                "volume {rmax} x {zmax} at resolution {a} has no cells"
            )));
        }
        Ok(Self {
            nr: nr as usize,
            nz: nz as usize,
            a,
            inva: 1.0 / a,
        })
    }

    /// Number of radial cells.
    #[inline]
    pub fn nr(&self) -> usize {
        self.nr
    }

    /// Number of axial cells.
    #[inline]
    pub fn nz(&self) -> usize {
        self.nz
    }

    /// Cells per unit length.
    #[inline]
    pub fn a(&self) -> f64 {
        self.a
    }

    /// Cell size.
    #[inline]
    pub fn inva(&self) -> f64 {
        self.inva
    }

    /// Outer radius.
    pub fn rmax(&self) -> f64 {
        self.nr as f64 * self.inva
    }

    /// Length along z.
    pub fn zmax(&self) -> f64 {
        self.nz as f64 * self.inva
    }

    /// Time step.
    #[inline]
    pub fn dt(&self) -> f64 {
        C * self.inva
    }

    /// Points per radial row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.nz + 1
    }

    /// Points per component array.
    #[inline]
    pub fn len(&self) -> usize {
        (self.nr + 1) * (self.nz + 1)
    }

    /// Always false; a volume has at least one cell.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Flat index of (ir, iz).
    #[inline]
    pub fn index(&self, ir: usize, iz: usize) -> usize {
        ir * (self.nz + 1) + iz
    }

    /// Physical location of a component's grid point.
    pub fn location(&self, c: Component, ir: usize, iz: usize) -> Position {
        let (dr, dz) = c.offset();
        Position::new(
            (ir as f64 + dr) * self.inva,
            (iz as f64 + dz) * self.inva,
        )
    }

    /// Location of the centre of cell (ir, iz), clamped to the volume.
    pub fn cell_center(&self, ir: usize, iz: usize) -> Position {
        Position::new(
            ((ir as f64 + 0.5) * self.inva).min(self.rmax()),
            ((iz as f64 + 0.5) * self.inva).min(self.zmax()),
        )
    }

    /// Quadrature weight of a component's grid point at row `ir`.
    ///
    /// The ring at radius ρ cells carries `2π ρ inva³`; the axis point
    /// carries the disk of radius half a cell.
    pub fn weight(&self, c: Component, ir: usize) -> f64 {
        let rho = ir as f64 + c.offset().0;
        let rho = if rho == 0.0 { 0.125 } else { rho };
        TWO_PI * rho * self.inva * self.inva * self.inva
    }

    /// Bilinear interpolation stencil of component `c` at `p`.
    ///
    /// Returns four `(ir, iz, weight)` entries whose weights sum to 1.
    /// Positions outside the component's lattice are clamped to its edge.
    pub fn stencil(&self, c: Component, p: Position) -> [(usize, usize, f64); 4] {
        let (dr, dz) = c.offset();
        let axis = |x: f64, n: usize| -> (usize, f64) {
            let x = x.clamp(0.0, n as f64);
            let i = (x.floor() as usize).min(n - 1);
            (i, x - i as f64)
        };
        let (ir, fr) = axis(p.r * self.a - dr, self.nr);
        let (iz, fz) = axis(p.z * self.a - dz, self.nz);
        [
            (ir, iz, (1.0 - fr) * (1.0 - fz)),
            (ir + 1, iz, fr * (1.0 - fz)),
            (ir, iz + 1, (1.0 - fr) * fz),
            (ir + 1, iz + 1, fr * fz),
        ]
    }

    /// The whole volume as a region.
    pub fn region(&self) -> Region {
        Region::new(0.0, self.rmax(), 0.0, self.zmax())
    }
}
