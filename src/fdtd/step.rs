//! The leapfrog time step.
//!
//! One call to [`Fields::step`] advances H from n−½ to n+½ and E from n to
//! n+1. Each half-step swaps the double buffers of the field and its split
//! part, so the previous level stays readable while the new one is written
//! row by row. Rows are independent within a half-step, which is what the
//! parallel engine exploits.

use super::boundaries::{axis_active, update_z_range, ConnectionTables};
use super::{EngineType, Fields};
use crate::arrays::{Component, Direction, Field, FieldType, VectorField};
use crate::constants::C;
use crate::extensions::pml::split_update;
use crate::geometry::Volume;
use num_complex::Complex64;
use rayon::prelude::*;

/// Curl terms `(main, other)` of one component at (ir, iz), computed from
/// the opposite field for angular order `m`.
type TermFn = fn(&VectorField, f64, usize, usize) -> (Complex64, Complex64);

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

fn hr_terms(e: &VectorField, m: f64, ir: usize, iz: usize) -> (Complex64, Complex64) {
    let im = Complex64::new(0.0, m);
    let other = (e.p.get(ir, iz + 1) - e.p.get(ir, iz)) * C;
    if ir == 0 {
        // (im/r)·Ez → im·∂r Ez on the axis, where Ez vanishes for |m| = 1.
        (-im * C * e.z.get(1, iz), other)
    } else {
        (-im * (C / ir as f64) * e.z.get(ir, iz), other)
    }
}

fn hp_terms(e: &VectorField, _m: f64, ir: usize, iz: usize) -> (Complex64, Complex64) {
    (
        -(e.r.get(ir, iz + 1) - e.r.get(ir, iz)) * C,
        (e.z.get(ir + 1, iz) - e.z.get(ir, iz)) * C,
    )
}

fn hz_terms(e: &VectorField, m: f64, ir: usize, iz: usize) -> (Complex64, Complex64) {
    let im = Complex64::new(0.0, m);
    let rho = ir as f64 + 0.5;
    (
        -(e.p.get(ir + 1, iz) * (ir as f64 + 1.0) - e.p.get(ir, iz) * ir as f64) * (C / rho),
        im * (C / rho) * e.r.get(ir, iz),
    )
}

fn er_terms(h: &VectorField, m: f64, ir: usize, iz: usize) -> (Complex64, Complex64) {
    let im = Complex64::new(0.0, m);
    let rho = ir as f64 + 0.5;
    (
        im * (C / rho) * h.z.get(ir, iz),
        -(h.p.get(ir, iz) - h.p.get(ir, iz - 1)) * C,
    )
}

fn ep_terms(h: &VectorField, _m: f64, ir: usize, iz: usize) -> (Complex64, Complex64) {
    let main = (h.r.get(ir, iz) - h.r.get(ir, iz - 1)) * C;
    if ir == 0 {
        // Hz is odd through the axis for odd m: ∂r Hz ≈ 2·Hz(½).
        (main, -h.z.get(0, iz) * (2.0 * C))
    } else {
        (main, -(h.z.get(ir, iz) - h.z.get(ir - 1, iz)) * C)
    }
}

fn ez_terms(h: &VectorField, m: f64, ir: usize, iz: usize) -> (Complex64, Complex64) {
    if ir == 0 {
        // Flux of Hp around the half-cell disk: (1/r)∂r(r Hp) → 4·Hp(½).
        return (h.p.get(0, iz) * (4.0 * C), ZERO);
    }
    let im = Complex64::new(0.0, m);
    let r = ir as f64;
    (
        (h.p.get(ir, iz) * (r + 0.5) - h.p.get(ir - 1, iz) * (r - 0.5)) * (C / r),
        -im * (C / r) * h.r.get(ir, iz),
    )
}

fn terms_of(c: Component) -> TermFn {
    match c {
        Component::Er => er_terms,
        Component::Ep => ep_terms,
        Component::Ez => ez_terms,
        Component::Hr => hr_terms,
        Component::Hp => hp_terms,
        Component::Hz => hz_terms,
    }
}

/// Everything a component update needs besides the arrays.
#[derive(Clone, Copy)]
struct UpdateContext {
    volume: Volume,
    m: i32,
    dt: f64,
    periodic: bool,
    parallel: bool,
}

/// Arrays one component update reads and writes.
struct ComponentArrays<'a> {
    out: &'a mut Field,
    prev: &'a Field,
    pml_out: &'a mut Field,
    pml_prev: &'a Field,
    sigma_main: &'a [f64],
    sigma_other: &'a [f64],
    inveps: Option<&'a [f64]>,
}

/// Advance one component over the whole grid. Points outside the update
/// range are set to zero; periodic images are restored afterwards by the
/// connection tables.
fn update_component(ctx: UpdateContext, c: Component, arrays: ComponentArrays, source: &VectorField) {
    let ComponentArrays {
        out,
        prev,
        pml_out,
        pml_prev,
        sigma_main,
        sigma_other,
        inveps,
    } = arrays;
    let stride = ctx.volume.stride();
    let nr = ctx.volume.nr();
    let z_range = update_z_range(c, ctx.volume.nz(), ctx.periodic);
    let terms = terms_of(c);
    let m = ctx.m as f64;
    let prev = prev.as_slice();
    let pml_prev = pml_prev.as_slice();

    let row = |ir: usize, f_row: &mut [Complex64], o_row: &mut [Complex64]| {
        let active = ir < nr && axis_active(c, ir, ctx.m);
        let base = ir * stride;
        for iz in 0..stride {
            if !active || !z_range.contains(&iz) {
                f_row[iz] = ZERO;
                o_row[iz] = ZERO;
                continue;
            }
            let idx = base + iz;
            let (mut a, mut b) = terms(source, m, ir, iz);
            if let Some(inveps) = inveps {
                a *= inveps[idx];
                b *= inveps[idx];
            }
            let (f, o) = split_update(
                prev[idx],
                pml_prev[idx],
                a,
                b,
                sigma_main[idx],
                sigma_other[idx],
                ctx.dt,
            );
            f_row[iz] = f;
            o_row[iz] = o;
        }
    };

    let out = out.as_mut_slice();
    let pml_out = pml_out.as_mut_slice();
    if ctx.parallel {
        out.par_chunks_mut(stride)
            .zip(pml_out.par_chunks_mut(stride))
            .enumerate()
            .for_each(|(ir, (f_row, o_row))| row(ir, f_row, o_row));
    } else {
        out.chunks_mut(stride)
            .zip(pml_out.chunks_mut(stride))
            .enumerate()
            .for_each(|(ir, (f_row, o_row))| row(ir, f_row, o_row));
    }
}

impl Fields {
    /// Advance the fields by one time step.
    pub fn step(&mut self) {
        self.advance(self.m);
    }

    /// Advance by one time step with the opposite azimuthal handedness
    /// (`e^{−imφ}`).
    ///
    /// # Panics
    /// Only defined for complex fields.
    pub fn step_right(&mut self) {
        assert!(!self.is_real, "step_right requires complex fields");
        self.advance(-self.m);
    }

    fn advance(&mut self, m: i32) {
        self.phase_material();

        self.step_h(m);
        self.step_h_boundaries();
        self.step_h_source();

        self.step_e(m);
        self.step_polarization_itself();
        self.prepare_step_polarization_energy();
        self.step_e_polarization();
        self.half_step_polarization_energy();
        self.update_polarization_saturation();
        self.step_e_boundaries();
        self.step_e_source();

        if self.is_real {
            self.make_real();
        }
        self.t += 1;
        self.record_bands();
    }

    fn context(&self, m: i32) -> UpdateContext {
        UpdateContext {
            volume: self.volume,
            m,
            dt: self.volume.dt(),
            periodic: self.bloch.is_some(),
            parallel: self.engine == EngineType::Parallel,
        }
    }

    fn step_h(&mut self, m: i32) {
        let ctx = self.context(m);
        self.h.swap();
        self.h_pml.swap();
        let (h_cur, h_prev) = self.h.split_mut();
        let (p_cur, p_prev) = self.h_pml.split_mut();
        for d in Direction::ALL {
            let c = Component::from_parts(FieldType::H, d);
            let arrays = ComponentArrays {
                out: h_cur.component_mut(d),
                prev: h_prev.component(d),
                pml_out: p_cur.component_mut(d),
                pml_prev: p_prev.component(d),
                sigma_main: self.ma.c_main(c),
                sigma_other: self.ma.c_other(c),
                inveps: None,
            };
            update_component(ctx, c, arrays, &self.e.current);
        }
    }

    fn step_e(&mut self, m: i32) {
        let ctx = self.context(m);
        self.e.swap();
        self.e_pml.swap();
        let (e_cur, e_prev) = self.e.split_mut();
        let (p_cur, p_prev) = self.e_pml.split_mut();
        for d in Direction::ALL {
            let c = Component::from_parts(FieldType::E, d);
            let arrays = ComponentArrays {
                out: e_cur.component_mut(d),
                prev: e_prev.component(d),
                pml_out: p_cur.component_mut(d),
                pml_prev: p_prev.component(d),
                sigma_main: self.ma.c_main(c),
                sigma_other: self.ma.c_other(c),
                inveps: Some(self.ma.inveps(d)),
            };
            update_component(ctx, c, arrays, &self.h.current);
        }
    }

    pub(crate) fn step_h_boundaries(&mut self) {
        ConnectionTables::apply(&self.connections.h, &mut self.h.current);
        ConnectionTables::apply(&self.connections.h, &mut self.h_pml.current);
    }

    pub(crate) fn step_e_boundaries(&mut self) {
        ConnectionTables::apply(&self.connections.e, &mut self.e.current);
        ConnectionTables::apply(&self.connections.e, &mut self.e_pml.current);
    }

    /// Advance every polarization with the field of the old time level.
    fn step_polarization_itself(&mut self) {
        let dt = self.volume.dt();
        for (pol, pb) in self.pol.iter_mut().zip(self.ma.polarizabilities()) {
            pol.step(pb, &pb.coefficients(dt), &self.e.previous);
        }
    }

    /// Remove the polarization change from the freshly updated field.
    fn step_e_polarization(&mut self) {
        for pol in &self.pol {
            for d in Direction::ALL {
                let inveps = self.ma.inveps(d);
                let cur = pol.p.current.component(d).as_slice();
                let prev = pol.p.previous.component(d).as_slice();
                let e = self.e.current.component_mut(d).as_mut_slice();
                for (idx, e) in e.iter_mut().enumerate() {
                    *e -= (cur[idx] - prev[idx]) * inveps[idx];
                }
            }
        }
    }

    /// First half of the absorbed-energy update, with the old field.
    fn prepare_step_polarization_energy(&mut self) {
        for pol in &mut self.pol {
            pol.accumulate_energy(&self.e.previous);
        }
    }

    /// Second half of the absorbed-energy update, with the new field.
    fn half_step_polarization_energy(&mut self) {
        for pol in &mut self.pol {
            pol.accumulate_energy(&self.e.current);
        }
    }

    fn update_polarization_saturation(&mut self) {
        for (pol, pb) in self.pol.iter_mut().zip(self.ma.polarizabilities()) {
            pol.update_saturation(pb);
        }
    }
}
