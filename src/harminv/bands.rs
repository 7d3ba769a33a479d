//! Band accumulation during a run.
//!
//! [`Fields::prepare_for_bands`] starts recording every component at one
//! point; [`Fields::record_bands`] runs after every step and samples at a
//! rate of about four points per period of the highest frequency of
//! interest. [`Fields::bands`] inverts every recorded component and merges
//! the results.

use super::{cluster_some_bands_cleverly, harminv, Band, ClusterConfig, HarminvConfig};
use crate::arrays::{Component, ComponentMap};
use crate::constants::TWO_PI;
use crate::fdtd::Fields;
use crate::geometry::Position;
use log::{debug, info};
use num_complex::Complex64;

/// What to record for a band computation.
#[derive(Debug, Clone, PartialEq)]
pub struct BandsConfig {
    /// Sampling position
    pub point: Position,
    /// Stop recording after this simulated time
    pub end_time: f64,
    /// Highest frequency of interest; the fields' preferred maximum if unset
    pub fmax: Option<f64>,
    /// Drop bands with a lower quality factor
    pub qmin: Option<f64>,
    /// Minimum share of the signal power per fitted mode
    pub frac_pow_min: f64,
    /// Merging tolerances
    pub cluster: ClusterConfig,
}

impl BandsConfig {
    /// Record at `point` until `end_time` with default options.
    pub fn new(point: Position, end_time: f64) -> Self {
        Self {
            point,
            end_time,
            fmax: None,
            qmin: None,
            frac_pow_min: 0.0,
            cluster: ClusterConfig::default(),
        }
    }
}

/// Recorded series for a band computation.
#[derive(Debug, Clone)]
pub struct Bands {
    config: BandsConfig,
    fmax: f64,
    sample_every: u64,
    start_t: u64,
    dt: f64,
    series: ComponentMap<Vec<Complex64>>,
}

impl Bands {
    /// Steps between samples.
    pub fn sample_every(&self) -> u64 {
        self.sample_every
    }

    /// Time between samples.
    pub fn sample_dt(&self) -> f64 {
        self.dt
    }

    /// Number of samples recorded so far.
    pub fn len(&self) -> usize {
        self.series[Component::Er].len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recorded series of one component.
    pub fn series(&self, c: Component) -> &[Complex64] {
        &self.series[c]
    }

    /// Upper edge of the analysed window.
    pub fn fmax(&self) -> f64 {
        self.fmax
    }
}

/// `|(1/N) Σ x_k e^{+i2πf k dt}|²` for the real part of `freq`.
fn fourier_power(series: &[Complex64], freq: f64, dt: f64) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let sum: Complex64 = series
        .iter()
        .enumerate()
        .map(|(k, &x)| x * Complex64::from_polar(1.0, TWO_PI * freq * k as f64 * dt))
        .sum();
    (sum / series.len() as f64).norm_sqr()
}

impl Fields {
    /// Start recording a band computation, replacing any previous one.
    pub fn prepare_for_bands(&mut self, config: BandsConfig) {
        let dt = self.volume.dt();
        let fmax = config.fmax.unwrap_or_else(|| self.preferred_fmax());
        let sample_every = (1.0 / (4.0 * fmax * dt)).floor().max(1.0) as u64;
        info!(
            "Recording bands at ({}, {}) every {} step(s) until t = {}, fmax = {:.4}",
            config.point.r, config.point.z, sample_every, config.end_time, fmax
        );
        self.bands = Some(Bands {
            config,
            fmax,
            sample_every,
            start_t: self.t,
            dt: sample_every as f64 * dt,
            series: ComponentMap::default(),
        });
    }

    /// Sample the band point if a recording is due.
    pub fn record_bands(&mut self) {
        let Some(bands) = &self.bands else {
            return;
        };
        if self.time() > bands.config.end_time
            || (self.t - bands.start_t) % bands.sample_every != 0
        {
            return;
        }
        let point = self.get_point(bands.config.point);
        if let Some(bands) = &mut self.bands {
            for (c, series) in bands.series.iter_mut() {
                series.push(point.get_component(c));
            }
        }
    }

    /// The active band recording.
    pub fn band_data(&self) -> Option<&Bands> {
        self.bands.as_ref()
    }

    /// Resonances seen at the band point, at most `maxbands`, ordered by
    /// frequency. Empty without a recording.
    pub fn bands(&self, maxbands: usize) -> Vec<Band> {
        let Some(bands) = &self.bands else {
            return Vec::new();
        };
        let harminv_config = HarminvConfig {
            fmin: 0.0,
            fmax: bands.fmax,
            maxbands,
            frac_pow_min: bands.config.frac_pow_min,
            ..Default::default()
        };

        let mut candidates = Vec::new();
        let mut approx_power = Vec::new();
        let mut fields_considered = 0;
        for (c, series) in bands.series.iter() {
            if series.iter().all(|x| x.norm_sqr() == 0.0) {
                continue;
            }
            fields_considered += 1;
            let modes = harminv(series, bands.dt, &harminv_config);
            debug!("{}: {} mode(s)", c.name(), modes.len());
            for mode in modes {
                approx_power.push(fourier_power(series, mode.freq_re, bands.dt));
                candidates.push(mode);
            }
        }

        let duration = bands.len() as f64 * bands.dt;
        let mut result = cluster_some_bands_cleverly(
            &candidates,
            fields_considered,
            maxbands,
            Some(&approx_power),
            duration,
            &bands.config.cluster,
        );
        if let Some(qmin) = bands.config.qmin {
            result.retain(|b| {
                let q = b.quality_factor();
                q < 0.0 || q >= qmin
            });
        }
        result
    }

    /// Complex frequency of the n-th band (counting from 1) in increasing
    /// frequency.
    pub fn get_band(&self, n: usize, maxbands: usize) -> Option<Complex64> {
        let index = n.checked_sub(1)?;
        self.bands(maxbands).get(index).map(Band::frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Volume;
    use crate::material::Material;
    use approx::assert_relative_eq;

    fn cavity() -> Fields {
        let v = Volume::new(1.0, 0.5, 10.0).unwrap();
        Fields::from_material(&Material::new(v, |_| 1.0), 0)
    }

    #[test]
    fn test_sampling_rate() {
        let mut f = cavity();
        let mut cfg = BandsConfig::new(Position::new(0.3, 0.25), 10.0);
        cfg.fmax = Some(0.9);
        f.prepare_for_bands(cfg);
        // floor(1/(4 · 0.9 · 0.05)) = 5 steps.
        assert_eq!(f.band_data().unwrap().sample_every(), 5);
        for _ in 0..20 {
            f.step();
        }
        assert_eq!(f.band_data().unwrap().len(), 4);
    }

    #[test]
    fn test_recording_stops_at_end_time() {
        let mut f = cavity();
        let mut cfg = BandsConfig::new(Position::new(0.3, 0.25), 0.52);
        cfg.fmax = Some(100.0);
        f.prepare_for_bands(cfg);
        for _ in 0..40 {
            f.step();
        }
        // One sample per step, t = 0.05 … 0.5.
        assert_eq!(f.band_data().unwrap().len(), 10);
    }

    #[test]
    fn test_no_recording_no_bands() {
        let f = cavity();
        assert!(f.bands(10).is_empty());
        assert_eq!(f.get_band(1, 10), None);
    }

    #[test]
    fn test_fourier_power_on_bin() {
        let series: Vec<Complex64> = (0..20)
            .map(|k| Complex64::from_polar(2.0, -TWO_PI * 0.1 * k as f64))
            .collect();
        assert_relative_eq!(fourier_power(&series, 0.1, 1.0), 4.0, epsilon = 1e-12);
        assert!(fourier_power(&series, 0.25, 1.0) < 0.1);
    }

    #[test]
    fn test_tm01_band() {
        let mut f = cavity();
        f.use_real_fields();
        f.initialize_with_nth_tm(1);
        let mut cfg = BandsConfig::new(Position::new(0.2, 0.25), 100.0);
        cfg.fmax = Some(0.9);
        f.prepare_for_bands(cfg);
        while f.time() < 100.0 {
            f.step();
        }
        let band = f.get_band(1, 5).unwrap();
        // j₀₁/(2π R) in the continuum; the grid shifts it slightly.
        assert_relative_eq!(band.re, 2.404_825_557_695_773 / TWO_PI, max_relative = 1e-2);
        assert!(band.im.abs() < 1e-4);
        assert_eq!(f.bands(5)[0].frequency(), band);
        assert_eq!(f.get_band(0, 5), None);
    }

    #[test]
    fn test_noisy_recording_keeps_tm01_only() {
        let mut f = cavity();
        f.use_real_fields();
        f.initialize_with_nth_tm(1);
        let mut cfg = BandsConfig::new(Position::new(0.2, 0.25), 100.0);
        cfg.fmax = Some(0.9);
        f.prepare_for_bands(cfg);
        while f.time() < 100.0 {
            f.step();
        }
        let mut noise = crate::harminv::tests::Noise::new(3, 1e-2);
        if let Some(bands) = &mut f.bands {
            for (_, series) in bands.series.iter_mut() {
                for x in series.iter_mut() {
                    *x += noise.sample();
                }
            }
        }
        let bands = f.bands(10);
        assert!(!bands.is_empty() && bands.len() <= 2, "{bands:?}");
        let strongest = bands.iter().max_by(|a, b| a.power.total_cmp(&b.power)).unwrap();
        assert_relative_eq!(strongest.freq_re, 2.404_825_557_695_773 / TWO_PI, max_relative = 1e-2);
        for band in &bands {
            assert!(band.freq_im < 1e-4, "growing band {band:?}");
        }
    }
}
