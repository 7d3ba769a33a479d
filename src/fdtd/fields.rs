//! Electromagnetic field state.

use super::boundaries::{Bloch, ConnectionTables};
use super::sources::Source;
use crate::arrays::{Component, Direction, DoubleBuffer, FieldType, VectorField};
use crate::extensions::dispersive::Polarization;
use crate::geometry::{Position, Region, Volume};
use crate::harminv::bands::Bands;
use crate::material::Material;
use crate::{Error, Result};
use log::info;
use num_complex::Complex64;
use std::sync::Arc;

/// How the bulk update is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineType {
    /// Single-threaded row loop
    #[default]
    Basic,
    /// Rows of each component updated in parallel with rayon
    Parallel,
}

/// Field values over a sub-volume.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSlice {
    /// Component the values belong to
    pub component: Component,
    /// Grid point locations
    pub positions: Vec<Position>,
    /// Complex field value at each location
    pub values: Vec<Complex64>,
}

/// Time-dependent state of one simulation.
///
/// Holds E and H on the staggered grid (current and previous time level,
/// each with the "other" part of the split-field update), the dispersive
/// polarizations, sources, and the optional band accumulator. The material
/// is shared; it is only copied if a phase-in modifies it.
pub struct Fields {
    pub(crate) volume: Volume,
    pub(crate) ma: Arc<Material>,
    pub(crate) new_ma: Option<Arc<Material>>,
    pub(crate) phasein_time: usize,
    pub(crate) m: i32,
    pub(crate) t: u64,
    pub(crate) is_real: bool,
    pub(crate) bloch: Option<Bloch>,
    pub(crate) connections: ConnectionTables,
    pub(crate) e: DoubleBuffer<VectorField>,
    pub(crate) h: DoubleBuffer<VectorField>,
    pub(crate) e_pml: DoubleBuffer<VectorField>,
    pub(crate) h_pml: DoubleBuffer<VectorField>,
    pub(crate) pol: Vec<Polarization>,
    pub(crate) e_sources: Vec<Source>,
    pub(crate) h_sources: Vec<Source>,
    pub(crate) bands: Option<Bands>,
    pub(crate) engine: EngineType,
    pub(crate) preferred_fmax: f64,
}

impl Fields {
    /// Create zero fields of angular order `m` on a shared material.
    pub fn new(ma: Arc<Material>, m: i32) -> Self {
        let volume = *ma.volume();
        let zero = DoubleBuffer::new(VectorField::new(&volume));
        let pol = Polarization::chain(&volume, ma.polarizabilities());
        info!(
            "Fields: {}x{} grid, a = {}, m = {}, dt = {:.4e}, {} polarization(s)",
            volume.nr(),
            volume.nz(),
            volume.a(),
            m,
            volume.dt(),
            pol.len()
        );
        Self {
            volume,
            ma,
            new_ma: None,
            phasein_time: 0,
            m,
            t: 0,
            is_real: false,
            bloch: None,
            connections: ConnectionTables::default(),
            e: zero.clone(),
            h: zero.clone(),
            e_pml: zero.clone(),
            h_pml: zero,
            pol,
            e_sources: Vec::new(),
            h_sources: Vec::new(),
            bands: None,
            engine: EngineType::default(),
            // Nyquist frequency until a source says otherwise.
            preferred_fmax: 0.0,
        }
    }

    /// Create fields on a private copy of `ma`.
    pub fn from_material(ma: &Material, m: i32) -> Self {
        Self::new(Arc::new(ma.clone()), m)
    }

    /// The grid.
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// The active material.
    pub fn material(&self) -> &Material {
        &self.ma
    }

    /// Angular order.
    pub fn m(&self) -> i32 {
        self.m
    }

    /// Number of steps taken.
    pub fn t(&self) -> u64 {
        self.t
    }

    /// Simulated time, `t · inva · C`.
    #[inline]
    pub fn time(&self) -> f64 {
        self.t as f64 * self.volume.dt()
    }

    /// Whether only the real part of the fields is kept.
    pub fn is_real(&self) -> bool {
        self.is_real
    }

    /// Bloch condition, if periodic.
    pub fn bloch(&self) -> Option<&Bloch> {
        self.bloch.as_ref()
    }

    /// Select how the bulk update is executed.
    pub fn set_engine(&mut self, engine: EngineType) -> &mut Self {
        self.engine = engine;
        self
    }

    /// Current E field (time level n+1 after a step).
    pub fn e_field(&self) -> &VectorField {
        &self.e.current
    }

    /// Current H field (time level n+½ after a step).
    pub fn h_field(&self) -> &VectorField {
        &self.h.current
    }

    /// Highest frequency of interest implied by the registered sources.
    pub fn preferred_fmax(&self) -> f64 {
        if self.preferred_fmax > 0.0 {
            self.preferred_fmax
        } else {
            0.5 / self.volume.dt()
        }
    }

    /// Make the fields periodic along z with Bloch wave number `kz` (cycles
    /// per unit length).
    ///
    /// # Panics
    /// Real fields cannot carry a Bloch phase.
    pub fn use_bloch(&mut self, kz: f64) {
        assert!(!self.is_real, "Bloch periodicity requires complex fields");
        let bloch = Bloch::new(kz, self.volume.zmax());
        self.connections = ConnectionTables::bloch(&self.volume, &bloch);
        self.bloch = Some(bloch);
        self.step_h_boundaries();
        self.step_e_boundaries();
    }

    /// Keep only the real part of the fields from now on.
    ///
    /// # Panics
    /// Only valid for m = 0 without a Bloch phase, where the update
    /// coefficients are real.
    pub fn use_real_fields(&mut self) {
        assert!(self.m == 0, "real fields require m = 0, got m = {}", self.m);
        assert!(self.bloch.is_none(), "real fields are incompatible with Bloch periodicity");
        self.is_real = true;
        self.make_real();
    }

    pub(crate) fn make_real(&mut self) {
        for buf in [&mut self.e, &mut self.h, &mut self.e_pml, &mut self.h_pml] {
            buf.current.make_real();
        }
        for pol in &mut self.pol {
            pol.p.current.make_real();
        }
    }

    /// Set component `c` to `f(position)` at every active point.
    ///
    /// Inactive points (conductor walls, irregular axis components) are left
    /// at zero and the split parts are cleared.
    pub fn initialize_field(&mut self, c: Component, f: impl Fn(Position) -> Complex64) {
        let v = self.volume;
        let mut values = crate::arrays::Field::new(&v);
        for ir in 0..v.nr() {
            for iz in 0..=v.nz() {
                if self.is_active(c, ir, iz) {
                    values.set(ir, iz, f(v.location(c, ir, iz)));
                }
            }
        }
        let (buf, pml) = match c.field_type() {
            FieldType::E => (&mut self.e, &mut self.e_pml),
            FieldType::H => (&mut self.h, &mut self.h_pml),
        };
        *buf.current.component_mut(c.direction()) = values;
        pml.current.component_mut(c.direction()).clear();
        if self.is_real {
            self.make_real();
        }
        if c.field_type() == FieldType::E {
            self.sync_previous_e(c.direction());
        }
    }

    /// Copy `E.current` into `E.previous` for one direction.
    ///
    /// The electric energy pairs both levels, so after a direct write the
    /// old level must follow or the energy reads zero until the next step.
    pub(crate) fn sync_previous_e(&mut self, d: Direction) {
        let e = &mut self.e;
        *e.previous.component_mut(d) = e.current.component(d).clone();
    }

    /// Reset every polarization to zero.
    pub fn initialize_polarizations(&mut self) {
        for (pol, pb) in self.pol.iter_mut().zip(self.ma.polarizabilities()) {
            pol.reset(pb);
        }
    }

    /// Gradually replace the material by `new` over `time` (simulated time).
    ///
    /// Every step mixes a fraction `1/remaining` of the target into the
    /// active material, so the target is reached exactly at the end.
    ///
    /// # Errors
    /// Fails if the materials live on different volumes or carry a different
    /// number of polarizabilities.
    pub fn phase_in_material(&mut self, new: Arc<Material>, time: f64) -> Result<()> {
        if !self.ma.is_compatible(&new) {
            return Err(Error::Config(
                "phase-in material must share the volume and polarizability count".into(),
            ));
        }
        let steps = (time / self.volume.dt()).round().max(1.0) as usize;
        info!("Phasing in new material over {steps} steps");
        self.new_ma = Some(new);
        self.phasein_time = steps;
        Ok(())
    }

    /// Whether a phase-in is in progress.
    pub fn is_phasing(&self) -> bool {
        self.new_ma.is_some() && self.phasein_time > 0
    }

    pub(crate) fn phase_material(&mut self) {
        if !self.is_phasing() {
            return;
        }
        if let Some(new) = &self.new_ma {
            let fraction = 1.0 / self.phasein_time as f64;
            Arc::make_mut(&mut self.ma).mix_unchecked(new, fraction);
        }
        self.phasein_time -= 1;
        if self.phasein_time == 0 {
            self.new_ma = None;
            info!("Phase-in complete at t = {:.4}", self.time());
        }
    }

    /// Component `c` over the active points inside `region`.
    pub fn slice(&self, c: Component, region: &Region) -> FieldSlice {
        let v = &self.volume;
        let field = match c.field_type() {
            FieldType::E => self.e.current.component(c.direction()),
            FieldType::H => self.h.current.component(c.direction()),
        };
        let mut slice = FieldSlice {
            component: c,
            positions: Vec::new(),
            values: Vec::new(),
        };
        for ir in 0..v.nr() {
            for iz in 0..v.nz() {
                let p = v.location(c, ir, iz);
                if self.is_active(c, ir, iz) && region.contains(p) {
                    slice.positions.push(p);
                    slice.values.push(field.get(ir, iz));
                }
            }
        }
        slice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fields(m: i32) -> Fields {
        let v = Volume::new(1.0, 1.0, 10.0).unwrap();
        Fields::from_material(&Material::new(v, |_| 1.0), m)
    }

    #[test]
    fn test_initial_state() {
        let f = fields(0);
        assert_eq!(f.t(), 0);
        assert_eq!(f.time(), 0.0);
        assert!(!f.is_real());
        assert!(!f.is_phasing());
        assert_eq!(f.find_last_source(), 0.0);
        assert_relative_eq!(f.preferred_fmax(), 10.0);
    }

    #[test]
    fn test_initialize_field_respects_walls() {
        let mut f = fields(0);
        f.initialize_field(Component::Er, |_| Complex64::new(1.0, 0.0));
        let er = &f.e_field().r;
        assert_eq!(er.get(3, 0), Complex64::new(0.0, 0.0));
        assert_eq!(er.get(3, 10), Complex64::new(0.0, 0.0));
        assert_eq!(er.get(3, 5), Complex64::new(1.0, 0.0));

        // Ep on the axis is not regular for m = 0.
        f.initialize_field(Component::Ep, |_| Complex64::new(1.0, 0.0));
        assert_eq!(f.e_field().p.get(0, 5), Complex64::new(0.0, 0.0));
        assert_eq!(f.e_field().p.get(1, 5), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_real_projection() {
        let mut f = fields(0);
        f.use_real_fields();
        f.initialize_field(Component::Ez, |_| Complex64::new(1.0, 1.0));
        assert_eq!(f.e_field().z.get(2, 2), Complex64::new(1.0, 0.0));
    }

    #[test]
    #[should_panic(expected = "real fields require m = 0")]
    fn test_real_fields_need_m_zero() {
        let mut f = fields(1);
        f.use_real_fields();
    }

    #[test]
    #[should_panic(expected = "Bloch periodicity requires complex fields")]
    fn test_bloch_on_real_fields_panics() {
        let mut f = fields(0);
        f.use_real_fields();
        f.use_bloch(0.1);
    }

    #[test]
    fn test_phase_in_reaches_target() {
        let v = Volume::new(1.0, 1.0, 10.0).unwrap();
        let mut f = Fields::from_material(&Material::new(v, |_| 1.0), 0);
        let target = Arc::new(Material::new(v, |_| 4.0));
        f.phase_in_material(target.clone(), 10.0 * v.dt()).unwrap();
        assert!(f.is_phasing());
        for _ in 0..10 {
            f.step();
        }
        assert!(!f.is_phasing());
        assert_relative_eq!(f.material().eps(2, 2), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_phase_in_rejects_mismatch() {
        let mut f = fields(0);
        let other = Volume::new(2.0, 1.0, 10.0).unwrap();
        let target = Arc::new(Material::new(other, |_| 4.0));
        assert!(f.phase_in_material(target, 1.0).is_err());
    }

    #[test]
    fn test_slice() {
        let mut f = fields(0);
        f.initialize_field(Component::Ez, |p| Complex64::new(p.r, 0.0));
        let s = f.slice(Component::Ez, &Region::new(0.0, 0.35, 0.0, 0.2));
        assert!(!s.positions.is_empty());
        for (p, v) in s.positions.iter().zip(&s.values) {
            assert_relative_eq!(v.re, p.r, epsilon = 1e-12);
        }
    }
}
