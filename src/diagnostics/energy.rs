//! Energy integrals.
//!
//! All integrals use the same ring quadrature as the update: a point at
//! radius ρ cells stands for the ring volume `2πρ inva³`. The electric term
//! pairs the two E time levels around the H level, which makes the sum an
//! exact invariant of the lossless leapfrog scheme.

use crate::arrays::{Component, Direction, FieldType};
use crate::fdtd::Fields;
use crate::geometry::Region;

impl Fields {
    /// Sum `term(idx)·weight` over the stored points of `c` inside `region`,
    /// counting each periodic image once.
    fn integrate(&self, c: Component, region: &Region, term: impl Fn(usize) -> f64) -> f64 {
        let v = &self.volume;
        let mut sum = 0.0;
        for ir in 0..v.nr() {
            let w = v.weight(c, ir);
            for iz in 0..v.nz() {
                if !self.is_active(c, ir, iz) || !region.contains(v.location(c, ir, iz)) {
                    continue;
                }
                sum += w * term(v.index(ir, iz));
            }
        }
        sum
    }

    /// `½ Σ Re(Eⁿ⁺¹·conj(Eⁿ))·ε` over `region`.
    pub fn electric_energy_in_box(&self, region: &Region) -> f64 {
        let mut sum = 0.0;
        for d in Direction::ALL {
            let c = Component::from_parts(FieldType::E, d);
            let cur = self.e.current.component(d).as_slice();
            let prev = self.e.previous.component(d).as_slice();
            let inveps = self.ma.inveps(d);
            sum += self.integrate(c, region, |i| (cur[i] * prev[i].conj()).re / inveps[i]);
        }
        0.5 * sum
    }

    /// `½ Σ |Hⁿ⁺½|²` over `region`.
    pub fn magnetic_energy_in_box(&self, region: &Region) -> f64 {
        let mut sum = 0.0;
        for d in Direction::ALL {
            let c = Component::from_parts(FieldType::H, d);
            let h = self.h.current.component(d).as_slice();
            sum += self.integrate(c, region, |i| h[i].norm_sqr());
        }
        0.5 * sum
    }

    /// Energy absorbed by the polarizations inside `region`.
    pub fn thermo_energy_in_box(&self, region: &Region) -> f64 {
        let mut sum = 0.0;
        for pol in &self.pol {
            for d in Direction::ALL {
                let c = Component::from_parts(FieldType::E, d);
                let w = &pol.energy[d.index()];
                sum += self.integrate(c, region, |i| w[i]);
            }
        }
        sum
    }

    /// Electric plus magnetic energy inside `region`.
    pub fn field_energy_in_box(&self, region: &Region) -> f64 {
        self.electric_energy_in_box(region) + self.magnetic_energy_in_box(region)
    }

    /// Field plus absorbed energy inside `region`.
    pub fn energy_in_box(&self, region: &Region) -> f64 {
        self.field_energy_in_box(region) + self.thermo_energy_in_box(region)
    }

    /// Electromagnetic energy of the whole volume.
    pub fn field_energy(&self) -> f64 {
        self.field_energy_in_box(&self.volume.region())
    }

    /// Electromagnetic plus absorbed energy of the whole volume.
    pub fn total_energy(&self) -> f64 {
        self.energy_in_box(&self.volume.region())
    }
}
