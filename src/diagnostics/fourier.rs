//! Fourier transform of monitor time series.

use super::MonitorPoint;
use crate::arrays::Component;
use crate::constants::TWO_PI;
use num_complex::Complex64;
use rustfft::FftPlanner;

/// Relative tolerance on the sample spacing.
const SPACING_TOL: f64 = 1e-6;

/// Frequency window of a transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourierConfig {
    /// Lower edge of the window
    pub fmin: f64,
    /// Upper edge; `fmax <= fmin` means no window (FFT line spectrum)
    pub fmax: f64,
    /// Maximum number of lines returned
    pub maxbands: usize,
}

impl Default for FourierConfig {
    fn default() -> Self {
        Self {
            fmin: 0.0,
            fmax: 0.0,
            maxbands: 100,
        }
    }
}

impl FourierConfig {
    /// Evaluate `maxbands` frequencies evenly spread over `[fmin, fmax]`.
    pub fn window(fmin: f64, fmax: f64, maxbands: usize) -> Self {
        Self { fmin, fmax, maxbands }
    }

    fn has_window(&self) -> bool {
        self.fmax > self.fmin
    }
}

/// One frequency and its complex amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralLine {
    /// Frequency
    pub freq: f64,
    /// `(1/N) Σ x_n e^{+i2πf t_n}`
    pub amplitude: Complex64,
}

/// Sample spacing of a series.
///
/// # Panics
/// If the times are not strictly increasing or not equally spaced.
fn uniform_spacing(points: &[MonitorPoint]) -> f64 {
    if points.len() < 2 {
        return 1.0;
    }
    let dt = points[1].t - points[0].t;
    assert!(
        dt > 0.0 && dt.is_finite(),
        "monitor point times must be strictly increasing (dt = {dt})"
    );
    for pair in points.windows(2) {
        let step = pair[1].t - pair[0].t;
        assert!(
            (step - dt).abs() <= SPACING_TOL * dt.abs(),
            "monitor points are not equally spaced in time ({step} vs {dt})"
        );
    }
    dt
}

/// Fourier transform of component `c` of a time series.
///
/// Without a window the full FFT line spectrum is computed and the
/// `maxbands` strongest lines are kept; with a window the transform is
/// evaluated directly at `maxbands` evenly spaced frequencies. Lines are
/// returned in increasing frequency.
///
/// # Panics
/// If the sample times are not strictly increasing and equally spaced.
pub fn fourier_transform(points: &[MonitorPoint], c: Component, config: &FourierConfig) -> Vec<SpectralLine> {
    let n = points.len();
    if n == 0 || config.maxbands == 0 {
        return Vec::new();
    }
    let dt = uniform_spacing(points);
    let t0 = points[0].t;
    let norm = 1.0 / n as f64;

    if config.has_window() {
        let count = config.maxbands;
        let df = if count > 1 {
            (config.fmax - config.fmin) / (count - 1) as f64
        } else {
            0.0
        };
        return (0..count)
            .map(|j| {
                let freq = config.fmin + j as f64 * df;
                let amplitude: Complex64 = points
                    .iter()
                    .map(|p| p.get_component(c) * Complex64::from_polar(1.0, TWO_PI * freq * p.t))
                    .sum();
                SpectralLine {
                    freq,
                    amplitude: amplitude * norm,
                }
            })
            .collect();
    }

    // The inverse transform carries the e^{+i2πkn/N} kernel.
    let mut buffer: Vec<Complex64> = points.iter().map(|p| p.get_component(c)).collect();
    let mut planner = FftPlanner::new();
    planner.plan_fft_inverse(n).process(&mut buffer);

    let mut lines: Vec<SpectralLine> = buffer
        .into_iter()
        .enumerate()
        .map(|(k, x)| {
            let k = if 2 * k < n { k as f64 } else { k as f64 - n as f64 };
            let freq = k / (n as f64 * dt);
            SpectralLine {
                freq,
                amplitude: x * norm * Complex64::from_polar(1.0, TWO_PI * freq * t0),
            }
        })
        .collect();
    if lines.len() > config.maxbands {
        lines.sort_by(|a, b| b.amplitude.norm().total_cmp(&a.amplitude.norm()));
        lines.truncate(config.maxbands);
    }
    lines.sort_by(|a, b| a.freq.total_cmp(&b.freq));
    lines
}
