//! Matrix-pencil estimation of signal poles.
//!
//! For `x_k = Σ_p a_p z_p^k` the rows of the Hankel matrix
//! `Y[i, j] = x_{i+j}` span the same space as the Vandermonde rows
//! `[1, z_p, z_p², …]`. The dominant right singular vectors `W` of `Y`
//! therefore satisfy `W₂ = T·diag(z)·T⁻¹·W₁`, where `W₁`/`W₂` drop the last
//! and first column, and the poles are the eigenvalues of `W₂·W₁⁺`.

use log::debug;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

const PINV_EPS: f64 = 1e-12;
const SCHUR_EPS: f64 = 1e-14;
const SCHUR_MAX_ITER: usize = 10_000;

/// Poles and least-squares amplitudes of a series.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PencilFit {
    /// Signal poles `z_p`
    pub poles: Vec<Complex64>,
    /// Amplitudes `a_p` referred to the first sample
    pub amplitudes: Vec<Complex64>,
    /// RMS residual of the fit
    pub rms_residual: f64,
}

/// Fit `data` with the poles whose singular values exceed both
/// `sv_tolerance·σ₀` and `noise_factor` times the noise floor, using a
/// pencil of at most `max_pencil`.
///
/// The noise floor is the median singular value: with more candidate
/// poles than signal poles, the lower half of the spectrum is noise.
///
/// Returns `None` if the series is too short, holds no significant
/// singular value, or a decomposition fails.
pub(crate) fn fit(
    data: &[Complex64],
    sv_tolerance: f64,
    noise_factor: f64,
    max_pencil: usize,
) -> Option<PencilFit> {
    let n = data.len();
    let pencil = (n / 3).min(max_pencil);
    if pencil < 1 {
        return None;
    }
    let rows = n - pencil;
    let hankel = DMatrix::from_fn(rows, pencil + 1, |i, j| data[i + j]);
    let svd = hankel.svd(false, true);
    let v_t = svd.v_t.as_ref()?;

    // Singular values come unordered; rank them largest first.
    let mut order: Vec<(usize, f64)> = svd.singular_values.iter().copied().enumerate().collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1));
    let sigma0 = order.first().map(|&(_, s)| s)?;
    if sigma0 <= 0.0 {
        return None;
    }
    let noise_floor = order[order.len() / 2].1;
    let threshold = (sv_tolerance * sigma0).max(noise_factor * noise_floor);
    let rank = order
        .iter()
        .take_while(|&&(_, s)| s > threshold)
        .count()
        .min(pencil);
    debug!(
        "pencil {pencil}, {rank} singular value(s) of {} above {threshold:.3e}",
        order.len()
    );
    if rank == 0 {
        return None;
    }

    let w = DMatrix::from_fn(rank, pencil + 1, |p, j| v_t[(order[p].0, j)]);
    let w1 = w.columns(0, pencil).into_owned();
    let w2 = w.columns(1, pencil).into_owned();
    let w1_pinv = w1.svd(true, true).pseudo_inverse(PINV_EPS).ok()?;
    let pencil_matrix = w2 * w1_pinv;
    let (_, t) = pencil_matrix.try_schur(SCHUR_EPS, SCHUR_MAX_ITER)?.unpack();
    let poles: Vec<Complex64> = t.diagonal().iter().copied().collect();

    let amplitudes = solve_amplitudes(data, &poles)?;
    let rms_residual = residual(data, &poles, &amplitudes);
    Some(PencilFit {
        poles,
        amplitudes,
        rms_residual,
    })
}

/// Least-squares amplitudes of the Vandermonde system `Σ_p a_p z_p^k = x_k`.
pub(crate) fn solve_amplitudes(data: &[Complex64], poles: &[Complex64]) -> Option<Vec<Complex64>> {
    let vandermonde = DMatrix::from_fn(data.len(), poles.len(), |k, p| poles[p].powu(k as u32));
    let rhs = DVector::from_column_slice(data);
    let solution = vandermonde.svd(true, true).solve(&rhs, PINV_EPS).ok()?;
    Some(solution.iter().copied().collect())
}

/// RMS of `x_k − Σ_p a_p z_p^k`.
fn residual(data: &[Complex64], poles: &[Complex64], amplitudes: &[Complex64]) -> f64 {
    let mut powers: Vec<Complex64> = vec![Complex64::new(1.0, 0.0); poles.len()];
    let mut sum = 0.0;
    for &x in data {
        let mut model = Complex64::new(0.0, 0.0);
        for ((power, &z), &a) in powers.iter_mut().zip(poles).zip(amplitudes) {
            model += a * *power;
            *power *= z;
        }
        sum += (x - model).norm_sqr();
    }
    (sum / data.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_pole() {
        let z = Complex64::from_polar(0.99, 0.7);
        let a = Complex64::new(2.0, -1.0);
        let data: Vec<Complex64> = (0..60).map(|k| a * z.powu(k)).collect();
        let fit = fit(&data, 1e-8, 10.0, 400).unwrap();
        assert_eq!(fit.poles.len(), 1);
        assert_relative_eq!(fit.poles[0].re, z.re, epsilon = 1e-9);
        assert_relative_eq!(fit.poles[0].im, z.im, epsilon = 1e-9);
        assert_relative_eq!(fit.amplitudes[0].re, a.re, epsilon = 1e-8);
        assert_relative_eq!(fit.amplitudes[0].im, a.im, epsilon = 1e-8);
        assert!(fit.rms_residual < 1e-10);
    }

    #[test]
    fn test_too_short_or_silent() {
        assert!(fit(&[Complex64::new(1.0, 0.0); 2], 1e-8, 10.0, 400).is_none());
        assert!(fit(&[Complex64::new(0.0, 0.0); 30], 1e-8, 10.0, 400).is_none());
    }
}
