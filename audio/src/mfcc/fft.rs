//! Radix-2 FFT and power spectrum for real-valued frames.

use std::f64::consts::PI;

/// Real-input power spectrum calculator for a fixed power-of-2 size.
///
/// Twiddle factors are computed once; scratch buffers are reused across
/// frames, so a single instance should not be shared between threads.
pub struct PowerSpectrum {
    size: usize,
    cos: Vec<f64>,
    sin: Vec<f64>,
    real: Vec<f64>,
    imag: Vec<f64>,
}

impl PowerSpectrum {
    /// Creates a calculator for frames of `size` samples.
    /// `size` must be a power of 2.
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two(), "fft size must be a power of 2");
        let half = size / 2;
        let cos = (0..half).map(|k| (-2.0 * PI * k as f64 / size as f64).cos()).collect();
        let sin = (0..half).map(|k| (-2.0 * PI * k as f64 / size as f64).sin()).collect();
        Self {
            size,
            cos,
            sin,
            real: vec![0.0; size],
            imag: vec![0.0; size],
        }
    }

    /// Number of output bins, `size / 2 + 1`.
    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Computes `|X[k]|^2` for `k in 0..=size/2` into `out`.
    ///
    /// `frame` must hold exactly `size` samples and `out` exactly `bins()`.
    pub fn compute(&mut self, frame: &[f64], out: &mut [f64]) {
        debug_assert_eq!(frame.len(), self.size);
        debug_assert_eq!(out.len(), self.bins());

        self.real.copy_from_slice(frame);
        self.imag.iter_mut().for_each(|v| *v = 0.0);
        fft_in_place(&mut self.real, &mut self.imag, &self.cos, &self.sin);

        for (k, p) in out.iter_mut().enumerate() {
            *p = self.real[k] * self.real[k] + self.imag[k] * self.imag[k];
        }
    }
}

/// In-place Cooley-Tukey FFT using a precomputed twiddle table of length n/2.
fn fft_in_place(real: &mut [f64], imag: &mut [f64], cos: &[f64], sin: &[f64]) {
    let n = real.len();
    if n <= 1 {
        return;
    }

    // Bit-reversal permutation
    let mut j = 0usize;
    for i in 0..n - 1 {
        if i < j {
            real.swap(i, j);
            imag.swap(i, j);
        }
        let mut k = n >> 1;
        while k <= j {
            j -= k;
            k >>= 1;
        }
        j += k;
    }

    let mut size = 2;
    while size <= n {
        let half = size >> 1;
        let stride = n / size;
        let mut start = 0;
        while start < n {
            for k in 0..half {
                let u = start + k;
                let v = u + half;
                let (w_r, w_i) = (cos[k * stride], sin[k * stride]);

                let tmp_r = w_r * real[v] - w_i * imag[v];
                let tmp_i = w_r * imag[v] + w_i * real[v];

                real[v] = real[u] - tmp_r;
                imag[v] = imag[u] - tmp_i;
                real[u] += tmp_r;
                imag[u] += tmp_i;
            }
            start += size;
        }
        size <<= 1;
    }
}
