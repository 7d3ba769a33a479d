//! Lorentzian dispersive media.
//!
//! Each [`Polarizability`] adds a damped oscillator polarization P that
//! obeys
//!
//!   d²P/dt² + γ dP/dt + ω² P = Δε ω² s E
//!
//! where `s` is the spatial coupling profile (σ) reduced by saturation. The
//! oscillator is advanced with central differences:
//!
//!   P^{n+1} = a P^n + b P^{n-1} + c s E^n
//!
//! and its change is removed from the electric field, `E -= ΔP / ε`.
//! The work done on the polarization is accumulated per point so that
//! absorbed ("thermo") energy can be reported and used for gain saturation.

use crate::arrays::{
    direction_arrays, Component, Direction, DirectionArrays, DoubleBuffer, FieldType,
    VectorField,
};
use crate::geometry::{Position, Volume};
use crate::{Error, Result};

/// Descriptor of one Lorentz oscillator term of a material.
#[derive(Debug, Clone, PartialEq)]
pub struct Polarizability {
    /// Resonance angular frequency
    pub omega: f64,
    /// Damping rate
    pub gamma: f64,
    /// Oscillator strength
    pub delta_epsilon: f64,
    /// Absorbed energy density at which the coupling saturates (0 = linear)
    pub energy_saturation: f64,
    /// Coupling profile at the E component locations
    sigma: DirectionArrays,
}

/// Leapfrog coefficients: `P^{n+1} = a P^n + b P^{n-1} + c s E^n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LorentzCoefficients {
    /// Weight of P^n
    pub a: f64,
    /// Weight of P^{n-1}
    pub b: f64,
    /// Weight of the driving field (times the coupling)
    pub c: f64,
}

impl Polarizability {
    /// Create a polarizability by sampling `sigma` at every E location.
    ///
    /// # Arguments
    /// * `volume` - Grid the profile is sampled on
    /// * `sigma` - Spatial coupling profile
    /// * `omega` - Resonance angular frequency
    /// * `gamma` - Damping rate
    /// * `delta_epsilon` - Oscillator strength
    /// * `energy_saturation` - Saturation energy density, 0 for a linear medium
    pub fn new(
        volume: &Volume,
        sigma: impl Fn(Position) -> f64,
        omega: f64,
        gamma: f64,
        delta_epsilon: f64,
        energy_saturation: f64,
    ) -> Self {
        let mut profile = direction_arrays(volume);
        for d in Direction::ALL {
            let c = Component::from_parts(FieldType::E, d);
            for ir in 0..=volume.nr() {
                for iz in 0..=volume.nz() {
                    profile[d.index()][volume.index(ir, iz)] =
                        sigma(volume.location(c, ir, iz));
                }
            }
        }
        Self {
            omega,
            gamma,
            delta_epsilon,
            energy_saturation,
            sigma: profile,
        }
    }

    /// Coupling profile for one E direction.
    pub fn sigma(&self, d: Direction) -> &[f64] {
        &self.sigma[d.index()]
    }

    /// Leapfrog coefficients for time step `dt`.
    pub fn coefficients(&self, dt: f64) -> LorentzCoefficients {
        // Discretized using central differences:
        //   a = (2 - ω²dt²) / (1 + γdt/2)
        //   b = (γdt/2 - 1) / (1 + γdt/2)
        //   c = Δε ω² dt² / (1 + γdt/2)
        let w2dt2 = self.omega * self.omega * dt * dt;
        let denom = 1.0 + 0.5 * self.gamma * dt;
        LorentzCoefficients {
            a: (2.0 - w2dt2) / denom,
            b: (0.5 * self.gamma * dt - 1.0) / denom,
            c: self.delta_epsilon * w2dt2 / denom,
        }
    }

    /// Replace every quantity by `(1 - f)·self + f·other`.
    ///
    /// # Errors
    /// Fails if the profiles were sampled on different volumes.
    pub fn mix_with(&mut self, other: &Polarizability, f: f64) -> Result<()> {
        if self.sigma[0].len() != other.sigma[0].len() {
            return Err(Error::Config(
                "cannot mix polarizabilities of different volumes".into(),
            ));
        }
        self.mix_unchecked(other, f);
        Ok(())
    }

    pub(crate) fn mix_unchecked(&mut self, other: &Polarizability, f: f64) {
        let mix = |x: f64, y: f64| (1.0 - f) * x + f * y;
        self.omega = mix(self.omega, other.omega);
        self.gamma = mix(self.gamma, other.gamma);
        self.delta_epsilon = mix(self.delta_epsilon, other.delta_epsilon);
        self.energy_saturation = mix(self.energy_saturation, other.energy_saturation);
        for (mine, theirs) in self.sigma.iter_mut().zip(other.sigma.iter()) {
            for (x, &y) in mine.iter_mut().zip(theirs.iter()) {
                *x = mix(*x, y);
            }
        }
    }
}

/// Dynamic state of one polarizability.
#[derive(Debug, Clone)]
pub struct Polarization {
    /// P at the current and previous time level
    pub p: DoubleBuffer<VectorField>,
    /// Work done on the polarization per unit volume, per E point
    pub energy: DirectionArrays,
    /// Coupling after saturation, per E point
    pub saturated_sigma: DirectionArrays,
}

impl Polarization {
    /// Zeroed state for a polarizability.
    pub fn new(volume: &Volume, pb: &Polarizability) -> Self {
        Self {
            p: DoubleBuffer::new(VectorField::new(volume)),
            energy: direction_arrays(volume),
            saturated_sigma: pb.sigma.clone(),
        }
    }

    /// Build the chain of states for a list of polarizabilities.
    pub fn chain(volume: &Volume, pbs: &[Polarizability]) -> Vec<Polarization> {
        pbs.iter().map(|pb| Polarization::new(volume, pb)).collect()
    }

    /// Zero P and the absorbed energy, and reset the coupling.
    pub fn reset(&mut self, pb: &Polarizability) {
        self.p.current.clear();
        self.p.previous.clear();
        for e in &mut self.energy {
            e.fill(0.0);
        }
        self.saturated_sigma = pb.sigma.clone();
    }

    /// Advance P one step driven by `e` (the field at the old time level).
    ///
    /// After the call `p.current` holds P^{n+1} and `p.previous` P^n.
    pub fn step(&mut self, pb: &Polarizability, coeffs: &LorentzCoefficients, e: &VectorField) {
        self.p.swap();
        for d in Direction::ALL {
            let i = d.index();
            let sigma = if pb.energy_saturation == 0.0 {
                pb.sigma(d)
            } else {
                &self.saturated_sigma[i]
            };
            let last = self.p.previous.component(d).as_slice();
            let e = e.component(d).as_slice();
            // `current` still holds P^{n-1} after the swap; overwrite it in place.
            let cur = self.p.current.component_mut(d).as_mut_slice();
            for idx in 0..cur.len() {
                let s = sigma[idx];
                cur[idx] = last[idx] * coeffs.a + cur[idx] * coeffs.b + e[idx] * (coeffs.c * s);
            }
        }
    }

    /// Accumulate `½ Re(conj(E)·ΔP)` into the absorbed energy.
    pub fn accumulate_energy(&mut self, e: &VectorField) {
        for d in Direction::ALL {
            let i = d.index();
            let cur = self.p.current.component(d).as_slice();
            let prev = self.p.previous.component(d).as_slice();
            let e = e.component(d).as_slice();
            for (idx, w) in self.energy[i].iter_mut().enumerate() {
                *w += 0.5 * (e[idx].conj() * (cur[idx] - prev[idx])).re;
            }
        }
    }

    /// Reduce the coupling where the absorbed energy exceeds the saturation
    /// energy: `s = σ·min(1, W_sat/|W|)`.
    pub fn update_saturation(&mut self, pb: &Polarizability) {
        if pb.energy_saturation == 0.0 {
            return;
        }
        for d in Direction::ALL {
            let i = d.index();
            let sigma = pb.sigma(d);
            for idx in 0..sigma.len() {
                let w = self.energy[i][idx].abs();
                let factor = if w > pb.energy_saturation {
                    pb.energy_saturation / w
                } else {
                    1.0
                };
                self.saturated_sigma[i][idx] = sigma[idx] * factor;
            }
        }
    }
}
