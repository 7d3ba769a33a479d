//! Harmonic inversion: decompose a uniformly sampled series into decaying
//! sinusoids.
//!
//! A series is modelled as `x(t) = Σ a_p e^{−i2π f_p t}` with complex
//! frequencies `f_p = f_re + i f_im` (`f_im < 0` for decaying modes). The
//! poles are found with a matrix pencil ([`pencil`]); spurious poles are
//! discarded by window, growth and power. Results from several components
//! are merged by [`cluster_some_bands_cleverly`], and [`bands`] accumulates
//! the series during a run.

pub mod bands;
pub mod cluster;
mod pencil;

pub use bands::{Bands, BandsConfig};
pub use cluster::{cluster_some_bands_cleverly, Band, ClusterConfig};

use crate::arrays::Component;
use crate::constants::{C, TWO_PI};
use crate::diagnostics::MonitorPoint;
use log::debug;
use num_complex::Complex64;

/// Options of a harmonic inversion.
#[derive(Debug, Clone, PartialEq)]
pub struct HarminvConfig {
    /// Lower edge of the frequency window
    pub fmin: f64,
    /// Upper edge; `fmax <= fmin` disables the window
    pub fmax: f64,
    /// Maximum number of modes returned
    pub maxbands: usize,
    /// Minimum share of the signal power a mode must carry
    pub frac_pow_min: f64,
    /// Singular values below this fraction of the largest are noise
    pub sv_tolerance: f64,
    /// Singular values below this multiple of the median are noise
    pub noise_factor: f64,
    /// Largest amplitude growth over the whole series accepted from a pole
    pub max_growth: f64,
    /// Largest fit residual relative to a mode's amplitude
    pub max_error: f64,
    /// Upper bound on the pencil parameter
    pub max_pencil: usize,
}

impl Default for HarminvConfig {
    fn default() -> Self {
        Self {
            fmin: 0.0,
            fmax: 0.0,
            maxbands: 100,
            frac_pow_min: 1e-6,
            sv_tolerance: 1e-8,
            noise_factor: 10.0,
            max_growth: 1.05,
            max_error: 0.5,
            max_pencil: 400,
        }
    }
}

impl HarminvConfig {
    /// Window `[fmin, fmax]` with at most `maxbands` modes and default
    /// tolerances.
    pub fn window(fmin: f64, fmax: f64, maxbands: usize) -> Self {
        Self {
            fmin,
            fmax,
            maxbands,
            ..Default::default()
        }
    }

    fn in_window(&self, f: f64) -> bool {
        self.fmax <= self.fmin || (f >= self.fmin && f <= self.fmax)
    }
}

/// One decaying sinusoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mode {
    /// Complex amplitude at the first sample
    pub amplitude: Complex64,
    /// Oscillation frequency
    pub freq_re: f64,
    /// Imaginary frequency, negative for decay
    pub freq_im: f64,
    /// RMS residual of the fit relative to this mode's amplitude
    pub error: f64,
}

impl Mode {
    /// Complex frequency `freq_re + i freq_im`.
    pub fn frequency(&self) -> Complex64 {
        Complex64::new(self.freq_re, self.freq_im)
    }

    /// Amplitude decay rate γ, with `|x| ∝ e^{−γt}`.
    pub fn decay_rate(&self) -> f64 {
        -TWO_PI * self.freq_im
    }

    /// Quality factor `f_re / (−2 f_im)`; infinite for undamped modes.
    pub fn quality_factor(&self) -> f64 {
        if self.freq_im == 0.0 {
            f64::INFINITY
        } else {
            self.freq_re / (-2.0 * self.freq_im)
        }
    }
}

/// Power a mode contributes to an `n`-sample series: `|a|² Σ|z|^{2k}`.
fn series_power(amplitude: Complex64, pole: Complex64, n: usize) -> f64 {
    let r2 = pole.norm_sqr();
    let sum = if (r2 - 1.0).abs() < 1e-12 {
        n as f64
    } else {
        (1.0 - r2.powi(n as i32)) / (1.0 - r2)
    };
    amplitude.norm_sqr() * sum
}

/// Decompose `data`, sampled every `dt`, into at most `config.maxbands`
/// modes ordered by frequency.
///
/// Never fails: short, silent or unresolvable input yields fewer modes,
/// possibly none.
pub fn harminv(data: &[Complex64], dt: f64, config: &HarminvConfig) -> Vec<Mode> {
    let n = data.len();
    if config.maxbands == 0 || !(dt.is_finite() && dt > 0.0) {
        return Vec::new();
    }
    let Some(fit) = pencil::fit(data, config.sv_tolerance, config.noise_factor, config.max_pencil)
    else {
        debug!("harminv: no poles in {n} samples");
        return Vec::new();
    };
    let signal_power: f64 = data.iter().map(|x| x.norm_sqr()).sum();

    let mut modes: Vec<(Mode, f64)> = Vec::new();
    for (&z, &a) in fit.poles.iter().zip(&fit.amplitudes) {
        if z.norm() == 0.0 {
            continue;
        }
        let freq_re = -z.arg() / (TWO_PI * dt);
        let gamma = -z.norm().ln() / dt;
        if !config.in_window(freq_re) {
            continue;
        }
        // Passive systems do not amplify; allow only round-off growth.
        if -gamma * dt * n as f64 > config.max_growth.ln() {
            continue;
        }
        let power = series_power(a, z, n);
        if !power.is_finite() || power < config.frac_pow_min * signal_power {
            continue;
        }
        let error = if a.norm() > 0.0 {
            fit.rms_residual / a.norm()
        } else {
            f64::INFINITY
        };
        if error > config.max_error {
            continue;
        }
        let mode = Mode {
            amplitude: a,
            freq_re,
            freq_im: -gamma / TWO_PI,
            error,
        };
        modes.push((mode, power));
    }

    modes.sort_by(|a, b| b.1.total_cmp(&a.1));
    modes.truncate(config.maxbands);
    let mut modes: Vec<Mode> = modes.into_iter().map(|(m, _)| m).collect();
    modes.sort_by(|a, b| a.freq_re.total_cmp(&b.freq_re));
    debug!("harminv: {} mode(s) from {} pole(s)", modes.len(), fit.poles.len());
    modes
}

/// Harmonic inversion of a series recorded every `sampling_rate` steps of
/// a grid with resolution `a`, i.e. with `dt = sampling_rate · C / a`.
pub fn do_harminv(
    data: &[Complex64],
    sampling_rate: usize,
    a: f64,
    fmin: f64,
    fmax: f64,
    maxbands: usize,
) -> Vec<Mode> {
    let dt = sampling_rate as f64 * C / a;
    harminv(data, dt, &HarminvConfig::window(fmin, fmax, maxbands))
}

/// Harmonic inversion of component `c` of a monitor series.
///
/// # Panics
/// If the sample times are not strictly increasing and equally spaced.
pub fn harminv_points(points: &[MonitorPoint], c: Component, config: &HarminvConfig) -> Vec<Mode> {
    if points.len() < 2 {
        return Vec::new();
    }
    let dt = points[1].t - points[0].t;
    assert!(
        dt > 0.0 && dt.is_finite(),
        "monitor point times must be strictly increasing (dt = {dt})"
    );
    for pair in points.windows(2) {
        let step = pair[1].t - pair[0].t;
        assert!(
            (step - dt).abs() <= 1e-6 * dt.abs(),
            "monitor points are not equally spaced in time ({step} vs {dt})"
        );
    }
    let data: Vec<Complex64> = points.iter().map(|p| p.get_component(c)).collect();
    let mut modes = harminv(&data, dt, config);
    // Refer amplitudes to t = 0 rather than to the first sample.
    let t0 = points[0].t;
    for mode in &mut modes {
        mode.amplitude *= (Complex64::new(0.0, TWO_PI) * mode.frequency() * t0).exp();
    }
    modes
}
