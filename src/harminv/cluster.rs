//! Merging of modes found in several field components.
//!
//! The same resonance shows up in every component that couples to it, with
//! slightly different fitted frequencies. Candidates are grouped in
//! frequency order; a candidate joins the current group when it lies within
//! `rel_tolerance·|f| + 0.1/T` of the group's mean frequency, `T` being the
//! duration of the series. Each group becomes one [`Band`].

use super::Mode;
use log::debug;
use num_complex::Complex64;

/// Tolerances of the band clustering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig {
    /// Relative frequency tolerance
    pub rel_tolerance: f64,
    /// Groups weaker than this fraction of the strongest are dropped
    pub power_floor: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            rel_tolerance: 1e-3,
            power_floor: 1e-4,
        }
    }
}

/// A resonance merged from one or more modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Power-weighted mean frequency
    pub freq_re: f64,
    /// Power-weighted mean imaginary frequency
    pub freq_im: f64,
    /// Amplitude of the strongest member
    pub amplitude: Complex64,
    /// Summed member power per considered component
    pub power: f64,
    /// Number of merged modes
    pub members: usize,
}

impl Band {
    /// Complex frequency `freq_re + i freq_im`.
    pub fn frequency(&self) -> Complex64 {
        Complex64::new(self.freq_re, self.freq_im)
    }

    /// Quality factor `f_re / (−2 f_im)`; infinite for undamped bands.
    pub fn quality_factor(&self) -> f64 {
        if self.freq_im == 0.0 {
            f64::INFINITY
        } else {
            self.freq_re / (-2.0 * self.freq_im)
        }
    }
}

/// Running sums of one group.
#[derive(Default)]
struct Group {
    weight: f64,
    freq_re: f64,
    freq_im: f64,
    fourier: f64,
    strongest: Option<(f64, Complex64)>,
    members: usize,
}

impl Group {
    fn mean_freq(&self) -> f64 {
        if self.weight > 0.0 {
            self.freq_re / self.weight
        } else {
            0.0
        }
    }

    fn add(&mut self, mode: &Mode, fourier: f64) {
        let power = mode.amplitude.norm_sqr();
        // Zero-power members still count towards the frequency.
        let w = power.max(f64::MIN_POSITIVE);
        self.weight += w;
        self.freq_re += w * mode.freq_re;
        self.freq_im += w * mode.freq_im;
        self.fourier += fourier;
        if self.strongest.map_or(true, |(p, _)| power > p) {
            self.strongest = Some((power, mode.amplitude));
        }
        self.members += 1;
    }
}

/// Merge `candidates` from `fields_considered` components into at most
/// `maxbands` bands, ordered by frequency.
///
/// `approx_power` optionally holds a Fourier power estimate per candidate;
/// when present, groups whose summed estimate falls below the floor are
/// dropped as well. `duration` is the length in time of the analysed
/// series.
pub fn cluster_some_bands_cleverly(
    candidates: &[Mode],
    fields_considered: usize,
    maxbands: usize,
    approx_power: Option<&[f64]>,
    duration: f64,
    config: &ClusterConfig,
) -> Vec<Band> {
    if candidates.is_empty() || maxbands == 0 {
        return Vec::new();
    }
    let resolution = if duration > 0.0 { 0.1 / duration } else { 0.0 };
    let fourier = |i: usize| approx_power.and_then(|p| p.get(i).copied()).unwrap_or(0.0);

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| candidates[a].freq_re.total_cmp(&candidates[b].freq_re));

    let mut groups: Vec<Group> = Vec::new();
    for i in order {
        let mode = &candidates[i];
        let joins = groups.last().is_some_and(|g| {
            let f = g.mean_freq();
            (mode.freq_re - f).abs() <= config.rel_tolerance * f.abs() + resolution
        });
        if !joins {
            groups.push(Group::default());
        }
        if let Some(group) = groups.last_mut() {
            group.add(mode, fourier(i));
        }
    }

    let per_field = 1.0 / fields_considered.max(1) as f64;
    let mut bands: Vec<(Band, f64)> = groups
        .iter()
        .map(|g| {
            let band = Band {
                freq_re: g.mean_freq(),
                freq_im: g.freq_im / g.weight,
                amplitude: g.strongest.map_or(Complex64::new(0.0, 0.0), |(_, a)| a),
                power: g.weight * per_field,
                members: g.members,
            };
            (band, g.fourier)
        })
        .collect();

    let max_power = bands.iter().map(|b| b.0.power).fold(0.0, f64::max);
    let max_fourier = bands.iter().map(|b| b.1).fold(0.0, f64::max);
    let before = bands.len();
    bands.retain(|(band, fourier)| {
        band.power >= config.power_floor * max_power
            && (approx_power.is_none() || *fourier >= config.power_floor * max_fourier)
    });
    debug!(
        "clustered {} mode(s) into {} group(s), {} above the power floor",
        candidates.len(),
        before,
        bands.len()
    );

    bands.sort_by(|a, b| b.0.power.total_cmp(&a.0.power));
    bands.truncate(maxbands);
    let mut bands: Vec<Band> = bands.into_iter().map(|(b, _)| b).collect();
    bands.sort_by(|a, b| a.freq_re.total_cmp(&b.freq_re));
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mode(f: f64, fi: f64, a: f64) -> Mode {
        Mode {
            amplitude: Complex64::new(a, 0.0),
            freq_re: f,
            freq_im: fi,
            error: 0.0,
        }
    }

    #[test]
    fn test_merges_close_frequencies() {
        let candidates = [
            mode(0.5000, -1e-3, 1.0),
            mode(0.5002, -1e-3, 1.0),
            mode(0.8, -2e-3, 2.0),
        ];
        let bands =
            cluster_some_bands_cleverly(&candidates, 2, 10, None, 1e4, &ClusterConfig::default());
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].members, 2);
        assert_relative_eq!(bands[0].freq_re, 0.5001, epsilon = 1e-12);
        assert_relative_eq!(bands[1].freq_re, 0.8);
        assert_relative_eq!(bands[1].power, 2.0);
        assert_relative_eq!(bands[1].quality_factor(), 200.0);
    }

    #[test]
    fn test_short_series_merges_more() {
        let candidates = [mode(0.50, 0.0, 1.0), mode(0.52, 0.0, 1.0)];
        let cfg = ClusterConfig::default();
        assert_eq!(cluster_some_bands_cleverly(&candidates, 1, 10, None, 1e4, &cfg).len(), 2);
        // 0.1/T = 0.025 exceeds the spacing.
        assert_eq!(cluster_some_bands_cleverly(&candidates, 1, 10, None, 4.0, &cfg).len(), 1);
    }

    #[test]
    fn test_power_floor_and_maxbands() {
        let candidates = [
            mode(0.1, 0.0, 1.0),
            mode(0.2, 0.0, 1e-3),
            mode(0.3, 0.0, 0.5),
            mode(0.4, 0.0, 0.7),
        ];
        let cfg = ClusterConfig::default();
        let all = cluster_some_bands_cleverly(&candidates, 1, 10, None, 1e4, &cfg);
        // 1e-6 relative power is below the floor.
        assert_eq!(all.len(), 3);
        let two = cluster_some_bands_cleverly(&candidates, 1, 2, None, 1e4, &cfg);
        assert_eq!(two.len(), 2);
        assert_relative_eq!(two[0].freq_re, 0.1);
        assert_relative_eq!(two[1].freq_re, 0.4);
    }

    #[test]
    fn test_fourier_floor() {
        let candidates = [mode(0.1, 0.0, 1.0), mode(0.3, 0.0, 1.0)];
        let approx = [1.0, 1e-9];
        let bands = cluster_some_bands_cleverly(
            &candidates,
            1,
            10,
            Some(&approx),
            1e4,
            &ClusterConfig::default(),
        );
        assert_eq!(bands.len(), 1);
        assert_relative_eq!(bands[0].freq_re, 0.1);
    }
}
