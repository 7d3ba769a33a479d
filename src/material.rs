//! Material description: permittivity, absorbing layers and dispersion.
//!
//! A [`Material`] is built once on a [`Volume`] and then shared read-only by
//! any number of [`Fields`](crate::fdtd::Fields). All per-point arrays are
//! stored on the full `(nr+1) x (nz+1)` lattice of the component they apply
//! to.

use crate::arrays::{direction_arrays, Component, ComponentMap, Direction, DirectionArrays};
use crate::extensions::dispersive::Polarizability;
use crate::extensions::pml::{component_sigmas, validate_thickness, PmlConfig, PmlLayers};
use crate::geometry::{Position, Region, Volume};
use crate::{Error, Result};
use log::info;

/// Electromagnetic properties of every grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    volume: Volume,
    /// Permittivity at cell centres
    eps: Vec<f64>,
    /// Inverse permittivity at the E component locations
    inveps: DirectionArrays,
    /// PML conductivity of each component's main curl term
    c_main: ComponentMap<Vec<f64>>,
    /// PML conductivity of each component's other curl term
    c_other: ComponentMap<Vec<f64>>,
    polarizabilities: Vec<Polarizability>,
    pml: PmlLayers,
    pml_config: PmlConfig,
}

/// Permittivity values over a sub-volume, one per cell centre.
#[derive(Debug, Clone, PartialEq)]
pub struct EpsSlice {
    /// Cell centre locations
    pub positions: Vec<Position>,
    /// Permittivity at each location
    pub values: Vec<f64>,
}

impl Material {
    /// Sample the permittivity `eps` over a volume.
    ///
    /// ε is stored at cell centres; the inverse permittivity at every E
    /// location is taken directly from `eps` at that location. Zero or
    /// negative permittivities are not checked.
    pub fn new(volume: Volume, eps: impl Fn(Position) -> f64) -> Self {
        let mut eps_centres = vec![0.0; volume.len()];
        for ir in 0..=volume.nr() {
            for iz in 0..=volume.nz() {
                eps_centres[volume.index(ir, iz)] = eps(volume.cell_center(ir, iz));
            }
        }

        let mut inveps = direction_arrays(&volume);
        for c in [Component::Er, Component::Ep, Component::Ez] {
            let arr = &mut inveps[c.direction().index()];
            for ir in 0..=volume.nr() {
                for iz in 0..=volume.nz() {
                    arr[volume.index(ir, iz)] = 1.0 / eps(volume.location(c, ir, iz));
                }
            }
        }

        Self {
            volume,
            eps: eps_centres,
            inveps,
            c_main: ComponentMap::from_fn(|_| vec![0.0; volume.len()]),
            c_other: ComponentMap::from_fn(|_| vec![0.0; volume.len()]),
            polarizabilities: Vec::new(),
            pml: PmlLayers::default(),
            pml_config: PmlConfig::default(),
        }
    }

    /// The grid this material lives on.
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Permittivity of cell (ir, iz).
    pub fn eps(&self, ir: usize, iz: usize) -> f64 {
        self.eps[self.volume.index(ir, iz)]
    }

    /// Inverse permittivity for the E component in direction `d`.
    pub fn inveps(&self, d: Direction) -> &[f64] {
        &self.inveps[d.index()]
    }

    /// PML conductivity of the main curl term of `c`.
    pub fn c_main(&self, c: Component) -> &[f64] {
        &self.c_main[c]
    }

    /// PML conductivity of the other curl term of `c`.
    pub fn c_other(&self, c: Component) -> &[f64] {
        &self.c_other[c]
    }

    /// Installed dispersive terms.
    pub fn polarizabilities(&self) -> &[Polarizability] {
        &self.polarizabilities
    }

    /// Installed absorbing layers.
    pub fn pml_layers(&self) -> &PmlLayers {
        &self.pml
    }

    /// Replace the PML grading and recompute the conductivities.
    pub fn set_pml_config(&mut self, config: PmlConfig) {
        self.pml_config = config;
        self.update_pml();
    }

    /// Recompute `inveps` at every E location as the inverse of the mean
    /// permittivity of the cells sharing that location.
    pub fn make_average_eps(&mut self) {
        let v = self.volume;
        let nr = v.nr() as isize;
        let nz = v.nz() as isize;
        let eps = &self.eps;
        let cell = |ir: isize, iz: isize| -> Option<f64> {
            if ir >= 0 && ir < nr && iz >= 0 && iz < nz {
                Some(eps[v.index(ir as usize, iz as usize)])
            } else {
                None
            }
        };
        // Cells adjacent to each E location, as (dr, dz) offsets.
        let neighbours: [(Direction, &[(isize, isize)]); 3] = [
            (Direction::R, &[(0, -1), (0, 0)][..]),
            (Direction::P, &[(-1, -1), (-1, 0), (0, -1), (0, 0)][..]),
            (Direction::Z, &[(-1, 0), (0, 0)][..]),
        ];
        for (d, offsets) in neighbours {
            let arr = &mut self.inveps[d.index()];
            for ir in 0..=nr {
                for iz in 0..=nz {
                    let (sum, n) = offsets
                        .iter()
                        .filter_map(|&(dr, dz)| cell(ir + dr, iz + dz))
                        .fold((0.0, 0usize), |(s, n), e| (s + e, n + 1));
                    if n > 0 {
                        arr[v.index(ir as usize, iz as usize)] = n as f64 / sum;
                    }
                }
            }
        }
    }

    /// Install an absorbing layer of thickness `dx` at z = 0.
    pub fn use_pml_left(&mut self, dx: f64) -> Result<()> {
        validate_thickness(dx, self.volume.zmax(), "left")?;
        self.pml.left = dx;
        self.update_pml();
        info!("PML left: {dx} ({} cells)", (dx * self.volume.a()).round());
        Ok(())
    }

    /// Install an absorbing layer of thickness `dx` at z = L.
    pub fn use_pml_right(&mut self, dx: f64) -> Result<()> {
        validate_thickness(dx, self.volume.zmax(), "right")?;
        self.pml.right = dx;
        self.update_pml();
        info!("PML right: {dx} ({} cells)", (dx * self.volume.a()).round());
        Ok(())
    }

    /// Install an absorbing layer of thickness `dx` at r = R.
    pub fn use_pml_radial(&mut self, dx: f64) -> Result<()> {
        validate_thickness(dx, self.volume.rmax(), "radial")?;
        self.pml.radial = dx;
        self.update_pml();
        info!("PML radial: {dx} ({} cells)", (dx * self.volume.a()).round());
        Ok(())
    }

    fn update_pml(&mut self) {
        let v = self.volume;
        let (rmax, zmax) = (v.rmax(), v.zmax());
        for c in Component::ALL {
            for ir in 0..=v.nr() {
                for iz in 0..=v.nz() {
                    let idx = v.index(ir, iz);
                    let (main, other) = component_sigmas(
                        &self.pml,
                        &self.pml_config,
                        c,
                        v.location(c, ir, iz),
                        rmax,
                        zmax,
                    );
                    self.c_main[c][idx] = main;
                    self.c_other[c][idx] = other;
                }
            }
        }
    }

    /// Append a Lorentz oscillator term.
    ///
    /// # Arguments
    /// * `sigma` - Spatial coupling profile
    /// * `omega` - Resonance angular frequency, positive
    /// * `gamma` - Damping rate, zero or positive
    /// * `delta_epsilon` - Oscillator strength
    /// * `energy_saturation` - Saturation energy density, 0 for a linear medium
    ///
    /// # Errors
    /// Fails if `omega` is not positive, `gamma` or `energy_saturation` is
    /// negative, or any of them is not finite.
    pub fn add_polarizability(
        &mut self,
        sigma: impl Fn(Position) -> f64,
        omega: f64,
        gamma: f64,
        delta_epsilon: f64,
        energy_saturation: f64,
    ) -> Result<()> {
        if !(omega.is_finite() && omega > 0.0) {
            return Err(Error::Config(format!(
                "resonance frequency must be positive, got {omega}"
            )));
        }
        if !(gamma.is_finite() && gamma >= 0.0) {
            return Err(Error::Config(format!(
                "damping rate must be non-negative, got {gamma}"
            )));
        }
        if !delta_epsilon.is_finite() {
            return Err(Error::Config(format!(
                "oscillator strength must be finite, got {delta_epsilon}"
            )));
        }
        if !(energy_saturation.is_finite() && energy_saturation >= 0.0) {
            return Err(Error::Config(format!(
                "saturation energy must be non-negative, got {energy_saturation}"
            )));
        }
        self.polarizabilities.push(Polarizability::new(
            &self.volume,
            sigma,
            omega,
            gamma,
            delta_epsilon,
            energy_saturation,
        ));
        Ok(())
    }

    /// Blend toward `other`: every array becomes `(1 - f)·self + f·other`.
    ///
    /// # Errors
    /// Fails if the volumes or the number of polarizabilities differ.
    pub fn mix_with(&mut self, other: &Material, f: f64) -> Result<()> {
        if self.volume != other.volume {
            return Err(Error::Config("cannot mix materials on different volumes".into()));
        }
        if self.polarizabilities.len() != other.polarizabilities.len() {
            return Err(Error::Config(format!(
                "cannot mix materials with {} and {} polarizabilities",
                self.polarizabilities.len(),
                other.polarizabilities.len()
            )));
        }
        self.mix_unchecked(other, f);
        Ok(())
    }

    /// Blend toward a material already known to be compatible.
    pub(crate) fn mix_unchecked(&mut self, other: &Material, f: f64) {
        let mix = |mine: &mut [f64], theirs: &[f64]| {
            for (x, &y) in mine.iter_mut().zip(theirs) {
                *x = (1.0 - f) * *x + f * y;
            }
        };
        mix(&mut self.eps, &other.eps);
        for (mine, theirs) in self.inveps.iter_mut().zip(&other.inveps) {
            mix(mine, theirs);
        }
        for c in Component::ALL {
            mix(&mut self.c_main[c], &other.c_main[c]);
            mix(&mut self.c_other[c], &other.c_other[c]);
        }
        for (mine, theirs) in self.polarizabilities.iter_mut().zip(&other.polarizabilities) {
            mine.mix_unchecked(theirs, f);
        }
    }

    /// Whether `other` can be blended into this material.
    pub(crate) fn is_compatible(&self, other: &Material) -> bool {
        self.volume == other.volume
            && self.polarizabilities.len() == other.polarizabilities.len()
    }

    /// Permittivity of the cells whose centres lie in `region`.
    pub fn eps_slice(&self, region: &Region) -> EpsSlice {
        let v = &self.volume;
        let mut slice = EpsSlice {
            positions: Vec::new(),
            values: Vec::new(),
        };
        for ir in 0..v.nr() {
            for iz in 0..v.nz() {
                let p = v.cell_center(ir, iz);
                if region.contains(p) {
                    slice.positions.push(p);
                    slice.values.push(self.eps(ir, iz));
                }
            }
        }
        slice
    }
}
