//! Source injection.
//!
//! A source adds `waveform(t) · amplitude` to a set of grid points of one
//! component every half-step. H sources are evaluated at `t + dt/2`, E
//! sources at `t + dt`, matching the time level the fields are advanced to.

use super::boundaries::{axis_active, stored_z_range, update_z_range};
use super::Fields;
use crate::arrays::{Component, FieldType};
use crate::constants::TWO_PI;
use crate::geometry::Position;
use log::debug;
use num_complex::Complex64;

/// Temporal shape of a source.
///
/// The envelope is a Gaussian of temporal width `τ = 1/(2π·width)`, so
/// `width` is the spectral standard deviation. It is truncated to
/// `|t − peak_time| < cutoff·τ`; a continuous pulse instead holds at 1 after
/// its peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    /// Carrier frequency
    pub freq: f64,
    /// Spectral width
    pub width: f64,
    /// Time of the envelope maximum
    pub peak_time: f64,
    /// Truncation in units of τ
    pub cutoff: f64,
    /// Hold the envelope at 1 after the peak
    pub is_continuous: bool,
}

impl Pulse {
    /// Gaussian pulse with the default cutoff of 5τ.
    pub fn new(freq: f64, width: f64, peak_time: f64) -> Self {
        Self {
            freq,
            width,
            peak_time,
            cutoff: 5.0,
            is_continuous: false,
        }
    }

    /// Set the truncation in units of τ.
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Turn into a continuous source that ramps up and then stays on.
    pub fn continuous(mut self) -> Self {
        self.is_continuous = true;
        self
    }

    /// Temporal width τ.
    #[inline]
    pub fn tau(&self) -> f64 {
        1.0 / (TWO_PI * self.width)
    }

    /// Envelope at time `t`.
    pub fn envelope(&self, t: f64) -> f64 {
        let tau = self.tau();
        let dt = t - self.peak_time;
        if self.is_continuous && dt >= 0.0 {
            return 1.0;
        }
        if dt.abs() >= self.cutoff * tau {
            return 0.0;
        }
        (-dt * dt / (2.0 * tau * tau)).exp()
    }

    /// Complex waveform `env(t)·e^{−i2πf(t − t0)}`.
    pub fn waveform(&self, t: f64) -> Complex64 {
        let env = self.envelope(t);
        if env == 0.0 {
            return Complex64::new(0.0, 0.0);
        }
        Complex64::from_polar(env, -TWO_PI * self.freq * (t - self.peak_time))
    }

    /// Last time with a non-zero envelope (`+∞` if continuous).
    pub fn last_time(&self) -> f64 {
        if self.is_continuous {
            f64::INFINITY
        } else {
            self.peak_time + self.cutoff * self.tau()
        }
    }

    /// Highest frequency with appreciable spectral content.
    pub fn max_frequency(&self) -> f64 {
        self.freq.abs() + 3.0 * self.width
    }
}

/// A pulse driving a fixed set of grid points of one component.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Driven component
    pub component: Component,
    /// Temporal shape
    pub pulse: Pulse,
    /// `(flat index, amplitude)` of every driven point
    pub targets: Vec<(usize, Complex64)>,
}

impl Source {
    /// Add the source contribution at time `t` to a field array.
    pub fn inject(&self, t: f64, field: &mut [Complex64]) {
        let w = self.pulse.waveform(t);
        if w == Complex64::new(0.0, 0.0) {
            return;
        }
        for &(idx, amp) in &self.targets {
            field[idx] += w * amp;
        }
    }
}

impl Fields {
    /// Whether `(ir, iz)` of `c` holds a meaningful value (updated point or
    /// periodic image).
    pub fn is_active(&self, c: Component, ir: usize, iz: usize) -> bool {
        ir < self.volume.nr()
            && axis_active(c, ir, self.m)
            && stored_z_range(c, self.volume.nz(), self.bloch.is_some()).contains(&iz)
    }

    /// Whether `(ir, iz)` of `c` is advanced by the update itself. Periodic
    /// images are active but not driven: the connection pass overwrites them.
    pub(crate) fn is_driven(&self, c: Component, ir: usize, iz: usize) -> bool {
        ir < self.volume.nr()
            && axis_active(c, ir, self.m)
            && update_z_range(c, self.volume.nz(), self.bloch.is_some()).contains(&iz)
    }

    /// Drive every updated point of `c` with amplitude `amp(position)`.
    ///
    /// Points where the amplitude is zero are skipped, as are periodic
    /// image rows.
    pub fn add_source(
        &mut self,
        c: Component,
        pulse: Pulse,
        amp: impl Fn(Position) -> Complex64,
    ) {
        let v = self.volume;
        let mut targets = Vec::new();
        for ir in 0..v.nr() {
            for iz in 0..=v.nz() {
                if !self.is_driven(c, ir, iz) {
                    continue;
                }
                let a = amp(v.location(c, ir, iz));
                if a != Complex64::new(0.0, 0.0) {
                    targets.push((v.index(ir, iz), a));
                }
            }
        }
        self.push_source(Source {
            component: c,
            pulse,
            targets,
        });
    }

    /// Drive `c` at a single position, spread bilinearly over the
    /// neighbouring grid points. Stencil points on periodic image rows are
    /// dropped.
    pub fn add_point_source(&mut self, c: Component, pulse: Pulse, p: Position, amp: Complex64) {
        let v = self.volume;
        let targets = v
            .stencil(c, p)
            .into_iter()
            .filter(|&(ir, iz, w)| w != 0.0 && self.is_driven(c, ir, iz))
            .map(|(ir, iz, w)| (v.index(ir, iz), amp * w))
            .collect();
        self.push_source(Source {
            component: c,
            pulse,
            targets,
        });
    }

    /// Sheet source on the plane `z = p.z`, launching a wave towards
    /// `sign(norm.z)`.
    ///
    /// Er is driven on the plane and Hp half a cell behind it with the sign
    /// that cancels the backward wave, so the emission is approximately
    /// one-directional.
    pub fn add_plane_source(
        &mut self,
        pulse: Pulse,
        envelope: impl Fn(Position) -> f64,
        p: Position,
        norm: Position,
    ) {
        let v = self.volume;
        let iz_e = (p.z * v.a()).round().max(0.0) as usize;
        let forward = norm.z >= 0.0;
        let sign = if forward { 1.0 } else { -1.0 };
        let iz_h = if forward {
            iz_e.checked_sub(1)
        } else {
            Some(iz_e)
        };

        let mut e_targets = Vec::new();
        let mut h_targets = Vec::new();
        for ir in 0..v.nr() {
            if self.is_driven(Component::Er, ir, iz_e) {
                let amp = envelope(v.location(Component::Er, ir, iz_e));
                if amp != 0.0 {
                    e_targets.push((v.index(ir, iz_e), Complex64::new(amp, 0.0)));
                }
            }
            if let Some(iz_h) = iz_h {
                if self.is_driven(Component::Hp, ir, iz_h) {
                    let amp = envelope(v.location(Component::Hp, ir, iz_h));
                    if amp != 0.0 {
                        h_targets.push((v.index(ir, iz_h), Complex64::new(sign * amp, 0.0)));
                    }
                }
            }
        }
        self.push_source(Source {
            component: Component::Er,
            pulse,
            targets: e_targets,
        });
        self.push_source(Source {
            component: Component::Hp,
            pulse,
            targets: h_targets,
        });
    }

    fn push_source(&mut self, source: Source) {
        if source.targets.is_empty() {
            debug!("{} source drives no active grid point", source.component.name());
        }
        self.preferred_fmax = self.preferred_fmax.max(source.pulse.max_frequency());
        match source.component.field_type() {
            FieldType::E => self.e_sources.push(source),
            FieldType::H => self.h_sources.push(source),
        }
    }

    /// Time after which no pulsed source is on any more.
    ///
    /// Returns `+∞` if any source is continuous and 0 without sources.
    pub fn find_last_source(&self) -> f64 {
        self.e_sources
            .iter()
            .chain(&self.h_sources)
            .map(|s| s.pulse.last_time())
            .fold(0.0, f64::max)
    }

    /// Inject the H sources for the half-step being taken.
    pub(crate) fn step_h_source(&mut self) {
        let t = (self.t as f64 + 0.5) * self.volume.dt();
        for src in &self.h_sources {
            let field = self.h.current.component_mut(src.component.direction());
            src.inject(t, field.as_mut_slice());
        }
    }

    /// Inject the E sources for the half-step being taken.
    pub(crate) fn step_e_source(&mut self) {
        let t = (self.t as f64 + 1.0) * self.volume.dt();
        for src in &self.e_sources {
            let field = self.e.current.component_mut(src.component.direction());
            src.inject(t, field.as_mut_slice());
        }
    }
}
