//! Audio file decoding into mono f32 waveforms.
//!
//! Any container/codec pair supported by symphonia is accepted (WAV, FLAC,
//! MP3, OGG/Vorbis, AAC/MP4, ...). The first decodable audio track is used.
//! Multi-channel audio is downmixed by averaging channels and the native
//! sample rate is preserved; nothing is resampled.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::AudioError;

/// Decoded mono audio.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Samples in [-1, 1].
    pub samples: Vec<f32>,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
}

impl Waveform {
    /// Creates a waveform from mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the waveform holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decodes an audio file at `path`.
///
/// The file extension, when present, is passed to the prober as a hint.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Waveform, AudioError> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    debug!("decoding {}", path.display());
    decode_source(Box::new(file), hint)
}

/// Decodes in-memory audio bytes.
///
/// `extension` is an optional format hint such as `"wav"` or `"mp3"`.
pub fn decode_bytes(data: Vec<u8>, extension: Option<&str>) -> Result<Waveform, AudioError> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }
    decode_source(Box::new(Cursor::new(data)), hint)
}

fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<Waveform, AudioError> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt packets are skipped, the rest of the stream is still usable.
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!("skipping undecodable packet: {msg}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        if sample_rate.is_none() {
            sample_rate = Some(spec.rate);
        }
        let channels = spec.channels.count().max(1);

        let needed = decoded.capacity() * channels;
        if sample_buf.as_ref().is_none_or(|buf| buf.capacity() < needed) {
            sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            downmix_into(buf.samples(), channels, &mut samples);
        }
    }

    let sample_rate = sample_rate
        .filter(|&sr| sr > 0)
        .ok_or_else(|| AudioError::Decode("unknown sample rate".into()))?;

    debug!(
        "decoded {} samples @ {} Hz ({:.2}s)",
        samples.len(),
        sample_rate,
        samples.len() as f64 / sample_rate as f64
    );
    Ok(Waveform::new(samples, sample_rate))
}

/// Averages interleaved frames into mono samples, appending to `out`.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.reserve(interleaved.len() / channels);
    for frame in interleaved.chunks_exact(channels) {
        out.push(frame.iter().sum::<f32>() / channels as f32);
    }
}
