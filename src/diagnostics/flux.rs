//! Power flux through lines of the (r, z) half-plane.
//!
//! A line of constant z is a disk (or annulus) in 3D and measures the flux
//! along z; a line of constant r is the side of a cylinder and measures the
//! flux along r. The line is represented by up to two sub-planes on the
//! grid lines bracketing its constant coordinate, weighted linearly, each
//! sampled at cell spacing with the ring area `2π r h` per sample.

use crate::arrays::{Component, FieldType};
use crate::constants::TWO_PI;
use crate::fdtd::Fields;
use crate::geometry::{Position, Volume};
use crate::{Error, Result};
use num_complex::Complex64;

/// Tolerance, in cells, for deciding that two corners share a coordinate.
const ALIGN_TOL: f64 = 1e-6;

/// Samples on one grid line.
#[derive(Debug, Clone, PartialEq)]
struct WeightedPlane {
    /// Linear weight of this grid line
    weight: f64,
    /// `(position, area)` of every sample
    samples: Vec<(Position, f64)>,
}

/// A flux line bound to one volume.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxPlane {
    /// Lower bound of the varying coordinate
    pub ymin: f64,
    /// Upper bound of the varying coordinate
    pub ymax: f64,
    /// Value of the constant coordinate
    pub xconst: f64,
    /// Constant r (flux along r) rather than constant z (flux along z)
    pub is_rflux: bool,
    volume: Volume,
    planes: Vec<WeightedPlane>,
}

impl FluxPlane {
    /// Build a flux line on `volume`.
    ///
    /// For an r-flux line `xconst` is the radius and `[ymin, ymax]` the z
    /// range; for a z-flux line `xconst` is z and `[ymin, ymax]` the radial
    /// range.
    ///
    /// # Errors
    /// Fails on an empty range or a line outside the volume.
    pub fn new(ymin: f64, ymax: f64, xconst: f64, is_rflux: bool, volume: &Volume) -> Result<Self> {
        let (xmax, ylimit) = if is_rflux {
            (volume.rmax(), volume.zmax())
        } else {
            (volume.zmax(), volume.rmax())
        };
        let tol = ALIGN_TOL * volume.inva();
        if ymin.is_nan() || ymax.is_nan() || ymax <= ymin {
            return Err(Error::Config(format!("flux line range [{ymin}, {ymax}] is empty")));
        }
        if xconst < -tol || xconst > xmax + tol || ymin < -tol || ymax > ylimit + tol {
            return Err(Error::Config(format!(
                "flux line {xconst} x [{ymin}, {ymax}] lies outside the volume"
            )));
        }

        let a = volume.a();
        let x = (xconst * a).clamp(0.0, xmax * a);
        let lo = x.floor().min((xmax * a).round() - 1.0).max(0.0);
        let frac = x - lo;
        let n = ((ymax - ymin) * a).ceil().max(1.0) as usize;
        let h = (ymax - ymin) / n as f64;

        let mut planes = Vec::with_capacity(2);
        for (line, weight) in [(lo, 1.0 - frac), (lo + 1.0, frac)] {
            if weight <= 0.0 {
                continue;
            }
            let xline = line * volume.inva();
            let samples = (0..n)
                .map(|j| {
                    let y = ymin + (j as f64 + 0.5) * h;
                    if is_rflux {
                        (Position::new(xline, y), TWO_PI * xline * h)
                    } else {
                        (Position::new(y, xline), TWO_PI * y * h)
                    }
                })
                .collect();
            planes.push(WeightedPlane { weight, samples });
        }

        Ok(Self {
            ymin,
            ymax,
            xconst,
            is_rflux,
            volume: *volume,
            planes,
        })
    }

    /// Number of weighted sub-planes (1 or 2).
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// The volume the line was built for.
    pub fn volume(&self) -> &Volume {
        &self.volume
    }
}

impl Fields {
    /// Flux line between two corners, one coordinate of which must agree.
    ///
    /// # Errors
    /// Fails if the corners are not aligned with an axis or the line leaves
    /// the volume.
    pub fn create_flux_plane(&self, c1: Position, c2: Position) -> Result<FluxPlane> {
        let tol = ALIGN_TOL * self.volume.inva();
        let same_z = (c1.z - c2.z).abs() < tol;
        let same_r = (c1.r - c2.r).abs() < tol;
        match (same_r, same_z) {
            (false, true) => FluxPlane::new(c1.r.min(c2.r), c1.r.max(c2.r), c1.z, false, &self.volume),
            (true, false) => FluxPlane::new(c1.z.min(c2.z), c1.z.max(c2.z), c1.r, true, &self.volume),
            _ => Err(Error::Config(format!(
                "flux plane corners ({}, {}) and ({}, {}) do not span a line",
                c1.r, c1.z, c2.r, c2.z
            ))),
        }
    }

    /// Interpolated value of `c` at `p`, E averaged over its two time
    /// levels so that it is centred with H.
    fn centred_value(&self, c: Component, p: Position) -> Complex64 {
        let d = c.direction();
        let (cur, prev) = match c.field_type() {
            FieldType::E => (self.e.current.component(d), Some(self.e.previous.component(d))),
            FieldType::H => (self.h.current.component(d), None),
        };
        let mut value = Complex64::new(0.0, 0.0);
        for (ir, iz, w) in self.volume.stencil(c, p) {
            if w == 0.0 {
                continue;
            }
            let v = match prev {
                Some(prev) => (cur.get(ir, iz) + prev.get(ir, iz)) * 0.5,
                None => cur.get(ir, iz),
            };
            value += v * w;
        }
        value
    }

    /// Flux `Σ area·(E × conj(H))·n` through `plane`; its real part is the
    /// power flowing towards increasing r or z.
    ///
    /// # Panics
    /// If the plane was built for a different volume.
    pub fn get_flux(&self, plane: &FluxPlane) -> Complex64 {
        assert!(
            plane.volume == self.volume,
            "flux plane was created for a different volume"
        );
        let mut total = Complex64::new(0.0, 0.0);
        for sub in &plane.planes {
            let mut sum = Complex64::new(0.0, 0.0);
            for &(p, area) in &sub.samples {
                let s = if plane.is_rflux {
                    self.centred_value(Component::Ep, p) * self.centred_value(Component::Hz, p).conj()
                        - self.centred_value(Component::Ez, p)
                            * self.centred_value(Component::Hp, p).conj()
                } else {
                    self.centred_value(Component::Er, p) * self.centred_value(Component::Hp, p).conj()
                        - self.centred_value(Component::Ep, p)
                            * self.centred_value(Component::Hr, p).conj()
                };
                sum += s * area;
            }
            total += sum * sub.weight;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use approx::assert_relative_eq;

    fn fields() -> Fields {
        let v = Volume::new(1.0, 2.0, 10.0).unwrap();
        Fields::from_material(&Material::new(v, |_| 1.0), 0)
    }

    #[test]
    fn test_orientation() {
        let f = fields();
        let z = f
            .create_flux_plane(Position::new(0.0, 1.0), Position::new(0.8, 1.0))
            .unwrap();
        assert!(!z.is_rflux);
        assert_relative_eq!(z.xconst, 1.0);
        let r = f
            .create_flux_plane(Position::new(0.5, 1.5), Position::new(0.5, 0.5))
            .unwrap();
        assert!(r.is_rflux);
        assert_relative_eq!(r.ymin, 0.5);
        assert_relative_eq!(r.ymax, 1.5);
    }

    #[test]
    fn test_rejects_diagonal_and_points() {
        let f = fields();
        assert!(f
            .create_flux_plane(Position::new(0.0, 0.0), Position::new(0.5, 0.5))
            .is_err());
        assert!(f
            .create_flux_plane(Position::new(0.3, 0.3), Position::new(0.3, 0.3))
            .is_err());
        assert!(f
            .create_flux_plane(Position::new(0.0, 5.0), Position::new(0.5, 5.0))
            .is_err());
    }

    #[test]
    fn test_sub_planes() {
        let v = Volume::new(1.0, 2.0, 10.0).unwrap();
        let on_line = FluxPlane::new(0.0, 1.0, 1.0, false, &v).unwrap();
        assert_eq!(on_line.num_planes(), 1);
        let between = FluxPlane::new(0.0, 1.0, 1.04, false, &v).unwrap();
        assert_eq!(between.num_planes(), 2);
        assert_relative_eq!(between.planes[0].weight, 0.6, epsilon = 1e-9);
        assert_relative_eq!(between.planes[1].weight, 0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_disk_area() {
        let v = Volume::new(1.0, 2.0, 10.0).unwrap();
        let plane = FluxPlane::new(0.0, 1.0, 1.0, false, &v).unwrap();
        let area: f64 = plane.planes[0].samples.iter().map(|s| s.1).sum();
        assert_relative_eq!(area, std::f64::consts::PI, max_relative = 1e-12);
    }

    #[test]
    fn test_uniform_fields_flux() {
        let mut f = fields();
        // Er = Hp = 1 inside: S_z = 1 through a disk of radius 0.5.
        f.initialize_field(Component::Er, |_| Complex64::new(1.0, 0.0));
        f.e.previous = f.e.current.clone();
        f.initialize_field(Component::Hp, |_| Complex64::new(1.0, 0.0));
        let plane = f
            .create_flux_plane(Position::new(0.0, 1.0), Position::new(0.5, 1.0))
            .unwrap();
        let flux = f.get_flux(&plane);
        assert_relative_eq!(flux.re, std::f64::consts::PI * 0.25, max_relative = 1e-9);
        assert_relative_eq!(flux.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "different volume")]
    fn test_foreign_plane_panics() {
        let f = fields();
        let other = Volume::new(2.0, 2.0, 10.0).unwrap();
        let plane = FluxPlane::new(0.0, 1.0, 1.0, false, &other).unwrap();
        f.get_flux(&plane);
    }
}
