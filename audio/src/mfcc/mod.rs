//! MFCC feature extraction.
//!
//! Produces the fixed-size coefficient matrix consumed by the speaker
//! classifier. Output is `[n_mfcc, max_pad_len]`: coefficients on rows,
//! time frames on columns.
//!
//! Default parameters follow the conventions the classifier was trained with:
//! - NumMfcc: 13
//! - MaxPadLen: 100 frames
//! - FFTSize: 2048 (periodic Hann window of the same length)
//! - HopSize: 512, centered frames with zero padding
//! - NumMels: 128, Slaney mel scale and normalization, 0 Hz to Nyquist
//! - Power spectrogram converted to dB, clipped 80 dB below the peak
//! - Orthonormal DCT-II

mod fft;
mod mel;

use ndarray::{s, Array2};
use tracing::debug;

use crate::decode::Waveform;
use crate::error::AudioError;

pub use mel::{hz_to_mel, mel_to_hz};

/// Feature matrix, `[n_mfcc, frames]`.
pub type FeatureMatrix = Array2<f32>;

/// Configuration for MFCC extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct MfccConfig {
    /// Number of cepstral coefficients kept (default: 13).
    pub n_mfcc: usize,
    /// Fixed number of time frames after padding/truncation (default: 100).
    pub max_pad_len: usize,
    /// FFT and window size in samples; must be a power of 2 (default: 2048).
    pub n_fft: usize,
    /// Hop between frames in samples (default: 512).
    pub hop_length: usize,
    /// Number of mel bands (default: 128).
    pub n_mels: usize,
    /// Lowest mel band edge in Hz (default: 0).
    pub fmin: f64,
    /// Highest mel band edge in Hz, `None` = Nyquist.
    pub fmax: Option<f64>,
    /// Dynamic range kept below the peak, in dB (default: 80).
    pub top_db: Option<f64>,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            n_mfcc: 13,
            max_pad_len: 100,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            fmin: 0.0,
            fmax: None,
            top_db: Some(80.0),
        }
    }
}

impl MfccConfig {
    fn validate(&self) -> Result<(), AudioError> {
        if self.n_fft < 2 || !self.n_fft.is_power_of_two() {
            return Err(AudioError::InvalidConfig(format!(
                "n_fft must be a power of 2 and at least 2, got {}",
                self.n_fft
            )));
        }
        if self.hop_length == 0 {
            return Err(AudioError::InvalidConfig("hop_length must be > 0".into()));
        }
        if self.n_mels == 0 {
            return Err(AudioError::InvalidConfig("n_mels must be > 0".into()));
        }
        if self.n_mfcc == 0 || self.n_mfcc > self.n_mels {
            return Err(AudioError::InvalidConfig(format!(
                "n_mfcc must be in 1..={}, got {}",
                self.n_mels, self.n_mfcc
            )));
        }
        if self.max_pad_len == 0 {
            return Err(AudioError::InvalidConfig("max_pad_len must be > 0".into()));
        }
        if self.fmin.is_nan() || self.fmin < 0.0 {
            return Err(AudioError::InvalidConfig(format!(
                "fmin must be >= 0, got {}",
                self.fmin
            )));
        }
        if let Some(fmax) = self.fmax {
            if fmax.is_nan() || self.fmin >= fmax {
                return Err(AudioError::InvalidConfig(format!(
                    "fmin {} Hz must be below fmax {} Hz",
                    self.fmin, fmax
                )));
            }
        }
        Ok(())
    }
}

/// MFCC extractor.
///
/// The window and DCT basis are computed once; the mel filterbank depends
/// on the input sample rate and is built per call.
#[derive(Debug, Clone)]
pub struct Mfcc {
    cfg: MfccConfig,
    window: Vec<f64>,
    dct: Vec<Vec<f64>>,
}

impl Mfcc {
    /// Creates a new extractor, rejecting inconsistent configs.
    pub fn new(cfg: MfccConfig) -> Result<Self, AudioError> {
        cfg.validate()?;
        let window = mel::hann_window(cfg.n_fft);
        let dct = mel::dct_ortho_basis(cfg.n_mfcc, cfg.n_mels);
        Ok(Self { cfg, window, dct })
    }

    /// Returns the extractor configuration.
    pub fn config(&self) -> &MfccConfig {
        &self.cfg
    }

    /// Number of frames produced for `num_samples` samples.
    pub fn num_frames(&self, num_samples: usize) -> usize {
        if num_samples == 0 {
            return 0;
        }
        1 + num_samples / self.cfg.hop_length
    }

    /// Computes the raw MFCC matrix `[n_mfcc, frames]` without length
    /// normalization.
    ///
    /// Returns [`AudioError::EmptyFeatures`] when no frame can be formed.
    pub fn compute(&self, waveform: &Waveform) -> Result<FeatureMatrix, AudioError> {
        let (log_mel, peak) = self.log_mel(waveform, None)?;
        Ok(self.cepstra(log_mel, peak))
    }

    /// Computes the MFCC matrix and normalizes it to `max_pad_len` frames.
    ///
    /// Only the first `max_pad_len` frames are kept in memory; later frames
    /// still contribute to the dB peak.
    pub fn extract(&self, waveform: &Waveform) -> Result<FeatureMatrix, AudioError> {
        let (log_mel, peak) = self.log_mel(waveform, Some(self.cfg.max_pad_len))?;
        let raw = self.cepstra(log_mel, peak);
        if raw.is_empty() {
            return Err(AudioError::EmptyFeatures);
        }
        Ok(pad_or_truncate(&raw, self.cfg.max_pad_len))
    }

    /// Log-mel spectrogram `[n_mels, min(frames, keep)]` before clipping,
    /// plus the peak over every frame.
    fn log_mel(
        &self,
        waveform: &Waveform,
        keep: Option<usize>,
    ) -> Result<(Array2<f64>, f64), AudioError> {
        let cfg = &self.cfg;
        let num_frames = self.num_frames(waveform.len());
        if num_frames == 0 || waveform.sample_rate == 0 {
            return Err(AudioError::EmptyFeatures);
        }

        let nyquist = waveform.sample_rate as f64 / 2.0;
        let fmax = cfg.fmax.unwrap_or(nyquist);
        if fmax.is_nan() || cfg.fmin >= fmax {
            return Err(AudioError::InvalidConfig(format!(
                "fmin {} Hz must be below fmax {} Hz",
                cfg.fmin, fmax
            )));
        }
        let mel_bank =
            mel::mel_filter_bank(cfg.n_mels, cfg.n_fft, waveform.sample_rate, cfg.fmin, fmax);

        let stored = keep.map_or(num_frames, |k| k.min(num_frames));
        let mut spectrum = fft::PowerSpectrum::new(cfg.n_fft);
        let mut frame = vec![0.0f64; cfg.n_fft];
        let mut power = vec![0.0f64; spectrum.bins()];
        let mut band = vec![0.0f64; cfg.n_mels];
        let mut log_mel = Array2::<f64>::zeros((cfg.n_mels, stored));
        let mut peak = f64::NEG_INFINITY;

        // Centered frames: n_fft / 2 implicit zeros on each side.
        let pad = cfg.n_fft / 2;
        let samples = &waveform.samples;
        for t in 0..num_frames {
            let start = t * cfg.hop_length;
            for (i, v) in frame.iter_mut().enumerate() {
                let sample = (start + i)
                    .checked_sub(pad)
                    .and_then(|j| samples.get(j))
                    .map_or(0.0, |&x| x as f64);
                *v = sample * self.window[i];
            }
            spectrum.compute(&frame, &mut power);

            for (db, filter) in band.iter_mut().zip(&mel_bank) {
                let energy: f64 = filter.iter().zip(&power).map(|(w, p)| w * p).sum();
                *db = 10.0 * energy.max(1e-10).log10();
                peak = peak.max(*db);
            }
            if t < stored {
                for (m, &db) in band.iter().enumerate() {
                    log_mel[[m, t]] = db;
                }
            }
        }

        debug!(
            "mfcc: {} samples @ {} Hz -> {} frames ({} kept)",
            waveform.len(),
            waveform.sample_rate,
            num_frames,
            stored
        );
        Ok((log_mel, peak))
    }

    /// Clips `log_mel` to `top_db` below `peak` and applies the DCT.
    fn cepstra(&self, mut log_mel: Array2<f64>, peak: f64) -> FeatureMatrix {
        if let Some(top_db) = self.cfg.top_db {
            let floor = peak - top_db;
            log_mel.mapv_inplace(|v| v.max(floor));
        }

        let frames = log_mel.ncols();
        let mut mfcc = Array2::<f32>::zeros((self.cfg.n_mfcc, frames));
        for (k, basis) in self.dct.iter().enumerate() {
            for t in 0..frames {
                let c: f64 = basis.iter().zip(log_mel.column(t)).map(|(b, v)| b * v).sum();
                mfcc[[k, t]] = c as f32;
            }
        }
        mfcc
    }
}

/// Zero-pads the time axis on the right up to `max_len` frames, then keeps
/// exactly the first `max_len` frames.
pub fn pad_or_truncate(features: &FeatureMatrix, max_len: usize) -> FeatureMatrix {
    let rows = features.nrows();
    let keep = features.ncols().min(max_len);
    let mut out = Array2::<f32>::zeros((rows, max_len));
    out.slice_mut(s![.., ..keep])
        .assign(&features.slice(s![.., ..keep]));
    out
}

/// Decoded waveform to fixed-shape feature matrix in one call.
pub fn extract_features(waveform: &Waveform, cfg: &MfccConfig) -> Result<FeatureMatrix, AudioError> {
    Mfcc::new(cfg.clone())?.extract(waveform)
}
