//! Mel-scale utilities, filterbank generation and the DCT used for cepstra.
//!
//! The mel scale is the Slaney (Auditory Toolbox) variant: linear below
//! 1 kHz and logarithmic above, with area-normalized triangular filters.

use std::f64::consts::PI;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Generates a periodic Hann window of the given length.
pub fn hann_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Converts frequency in Hz to Slaney mels.
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Converts Slaney mels back to Hz.
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Creates the mel filterbank matrix.
///
/// Returns `[num_mels][fft_size / 2 + 1]`. Each triangle is scaled by
/// `2 / (f_right - f_left)` so every filter has unit area.
pub fn mel_filter_bank(
    num_mels: usize,
    fft_size: usize,
    sample_rate: u32,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let half_fft = fft_size / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;

    let fft_freqs: Vec<f64> = (0..half_fft)
        .map(|k| k as f64 * nyquist / (half_fft - 1).max(1) as f64)
        .collect();

    // num_mels + 2 equally spaced mel points, expressed in Hz
    let low_mel = hz_to_mel(low_freq);
    let high_mel = hz_to_mel(high_freq);
    let step = (high_mel - low_mel) / (num_mels + 1) as f64;
    let mel_hz: Vec<f64> = (0..num_mels + 2)
        .map(|i| mel_to_hz(low_mel + i as f64 * step))
        .collect();

    let mut bank = Vec::with_capacity(num_mels);
    for m in 0..num_mels {
        let (left, center, right) = (mel_hz[m], mel_hz[m + 1], mel_hz[m + 2]);
        let enorm = 2.0 / (right - left);
        let filter = fft_freqs
            .iter()
            .map(|&f| {
                let lower = (f - left) / (center - left);
                let upper = (right - f) / (right - center);
                lower.min(upper).max(0.0) * enorm
            })
            .collect();
        bank.push(filter);
    }
    bank
}

/// Orthonormal DCT-II basis, `[num_coeffs][input_len]`.
pub fn dct_ortho_basis(num_coeffs: usize, input_len: usize) -> Vec<Vec<f64>> {
    let n = input_len as f64;
    (0..num_coeffs)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..input_len)
                .map(|i| scale * (PI * k as f64 * (2 * i + 1) as f64 / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_window_is_periodic() {
        let w = hann_window(8);
        assert_eq!(w.len(), 8);
        assert!(w[0].abs() < 1e-12);
        assert!((w[4] - 1.0).abs() < 1e-12);
        // periodic, so symmetric around n/2 rather than (n-1)/2
        for i in 1..4 {
            assert!((w[i] - w[8 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn slaney_scale_is_linear_below_1khz() {
        assert!((hz_to_mel(200.0) - 3.0).abs() < 1e-12);
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-12);
        assert!(hz_to_mel(2000.0) > 15.0);
    }

    #[test]
    fn hz_mel_roundtrip() {
        for &hz in &[0.0, 100.0, 440.0, 1000.0, 4000.0, 11025.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-6, "roundtrip failed for {hz} Hz");
        }
    }

    #[test]
    fn filter_bank_shape_and_sign() {
        let bank = mel_filter_bank(128, 2048, 22050, 0.0, 11025.0);
        assert_eq!(bank.len(), 128);
        assert_eq!(bank[0].len(), 1025);
        for filter in &bank {
            assert!(filter.iter().all(|&v| v >= 0.0));
        }
        // high filters are wide enough to cover at least one bin
        assert!(bank[127].iter().any(|&v| v > 0.0));
    }

    #[test]
    fn wide_filters_have_unit_area() {
        let (sr, n_fft) = (22050, 2048);
        let bank = mel_filter_bank(128, n_fft, sr, 0.0, 11025.0);
        let bin_hz = sr as f64 / n_fft as f64;
        // Filters from 100 up span 25+ bins, so the sampled sum tracks the
        // continuous triangle area.
        for (m, filter) in bank.iter().enumerate().skip(100) {
            let area: f64 = filter.iter().sum::<f64>() * bin_hz;
            assert!((area - 1.0).abs() < 0.05, "filter {m} area {area}");
        }
    }

    #[test]
    fn filter_peak_is_two_over_width() {
        let bank = mel_filter_bank(128, 2048, 22050, 0.0, 11025.0);
        let high = hz_to_mel(11025.0);
        let step = high / 129.0;
        let m = 110;
        let width = mel_to_hz((m + 2) as f64 * step) - mel_to_hz(m as f64 * step);
        let peak = bank[m].iter().cloned().fold(0.0, f64::max);
        // The sampled peak is at most the apex height 2 / width.
        assert!(peak <= 2.0 / width + 1e-12);
        assert!(peak > 0.8 * 2.0 / width, "peak {peak}, width {width}");
    }

    #[test]
    fn dct_basis_is_orthonormal() {
        let basis = dct_ortho_basis(8, 8);
        for a in 0..8 {
            for b in 0..8 {
                let dot: f64 = basis[a].iter().zip(&basis[b]).map(|(x, y)| x * y).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-10, "<{a},{b}> = {dot}");
            }
        }
    }
}
