//! # script-tts
//!
//! Batch speech synthesis for speaker-tagged, multi-language dialogue scripts.
//!
//! ## Features
//!
//! - **Script parsing**: speaker-tagged scripts split into per-language sentence buckets
//! - **Voice routing**: one synthesizer per requested language, resolved from a registry
//! - **Voice cloning**: a reference WAV turned into a timbre embedding applied batch-wide
//! - **Melo engine**: ONNX-based VITS synthesis behind the `melo` feature
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! script-tts = { version = "0.3", features = ["melo"] }
//! ```
//!
//! ```ignore
//! use script_tts::{batch, router::SynthesizerRegistry, script};
//!
//! let registry = SynthesizerRegistry::with_melo_models("models".as_ref());
//! let outcome = registry.build(&["JA", "EN", "KR"]);
//! let mut router = outcome.router;
//!
//! let buckets = script::parse_script("script.txt".as_ref(), &router.languages(), None)?;
//! let options = batch::BatchOptionsBuilder::default().out_dir("wav_out").build()?;
//! let report = batch::run_batch(&mut router, &buckets, None, &options)?;
//! println!("{} written, {} failed", report.succeeded, report.failures.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
pub mod cloning;
pub mod compare;
pub mod engines;
pub mod enhance;
pub mod language;
pub mod router;
pub mod script;

#[cfg(test)]
pub(crate) mod test_util;

use std::path::Path;

/// A mono audio buffer with its sample rate.
///
/// Produced by synthesis, loaded from disk for enhancement or cloning,
/// and written back as 32-bit float WAV.
#[derive(Debug, Clone, Default)]
pub struct AudioSegment {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio in Hz
    pub sample_rate: u32,
}

impl AudioSegment {
    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Read a WAV file, accepting integer and float encodings.
    ///
    /// Multi-channel input is down-mixed to mono by averaging each frame.
    pub fn read_wav(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };
        let samples = if spec.channels > 1 {
            downmix(&samples, spec.channels as usize)
        } else {
            samples
        };
        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Numeric speaker id inside one engine's voice table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeakerId(pub i64);

impl std::fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inference parameters shared by every synthesis call in a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisParams {
    /// Speaker to use; `None` selects the engine's default speaker.
    pub speaker: Option<SpeakerId>,
    /// Speaking speed multiplier (1.0 = native pace).
    pub speed: f32,
    /// Sampling temperature of the acoustic model.
    pub noise_scale: f32,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            speaker: None,
            speed: 1.0,
            noise_scale: 0.6,
        }
    }
}

/// Fixed-size timbre vector derived from reference audio.
///
/// Computed once per run and shared read-only across all cloned synthesis
/// calls, so identical reference audio yields identical output batches.
#[derive(Debug, Clone, PartialEq)]
pub struct TimbreEmbedding(pub Vec<f32>);

impl TimbreEmbedding {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Returned when a voice label is absent from an engine's voice table.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Voice not found: {0}")]
pub struct VoiceNotFound(pub String);

/// Common interface for loaded text-to-speech models.
///
/// One implementor instance is bound to one language for the lifetime of a
/// run. The batch driver is single-threaded, so synthesis methods take
/// `&mut self` and are never called concurrently on one handle.
pub trait Synthesizer {
    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Resolve a voice label to its numeric speaker id.
    fn speaker_id(&self, voice: &str) -> Result<SpeakerId, VoiceNotFound>;

    /// Speaker used when the caller does not request one.
    fn default_speaker(&self) -> SpeakerId;

    /// Voice labels in table order.
    fn list_voices(&self) -> Vec<String>;

    /// Synthesize one sentence.
    fn synthesize(
        &mut self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<AudioSegment, Box<dyn std::error::Error>>;

    /// Split a sentence into the pieces this engine synthesizes best.
    fn split_into_pieces(&self, text: &str) -> Vec<String>;

    /// Derive a timbre embedding from mono reference samples at `sample_rate()`.
    ///
    /// Default implementation reports that the engine cannot embed.
    fn embed_reference(
        &mut self,
        samples: &[f32],
    ) -> Result<TimbreEmbedding, Box<dyn std::error::Error>> {
        let _ = samples;
        Err("engine does not support reference embeddings".into())
    }

    /// Synthesize one piece carrying the timbre of `embedding`.
    ///
    /// Default implementation reports that the engine cannot clone.
    fn synthesize_cloned(
        &mut self,
        piece: &str,
        params: &SynthesisParams,
        embedding: &TimbreEmbedding,
    ) -> Result<AudioSegment, Box<dyn std::error::Error>> {
        let _ = (piece, params, embedding);
        Err("engine does not support cloned synthesis".into())
    }

    /// Synthesize one sentence and write it to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `AudioSegment::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        params: &SynthesisParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.synthesize(text, params)?.write_wav(wav_path)
    }
}
