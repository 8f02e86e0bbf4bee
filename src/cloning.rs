//! Reference-voice embedding.
//!
//! The cloned-synthesis path needs one timbre embedding per run. The
//! reference WAV is down-mixed to mono, resampled to the first active
//! handle's rate, and handed to that handle's own feature extractor.
//! Everything here is deterministic: the same reference file yields the
//! same embedding.

use std::path::Path;

use log::info;
use rubato::{FftFixedIn, Resampler};

use crate::router::VoiceRouter;
use crate::{AudioSegment, TimbreEmbedding};

const RESAMPLE_CHUNK: usize = 1024;
const RESAMPLE_SUB_CHUNKS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum CloneError {
    #[error("No active synthesizer to derive a reference embedding")]
    NoActiveSynthesizer,
    #[error("Failed to read reference audio: {0}")]
    Read(String),
    #[error("Reference audio is empty")]
    EmptyReference,
    #[error("Failed to resample reference audio: {0}")]
    Resample(String),
    #[error("Engine could not embed the reference: {0}")]
    Embedding(String),
}

/// Resample a mono segment to `target_rate`.
///
/// The input is processed in fixed blocks; the final block is zero-padded,
/// so the output may carry a short silent tail.
pub fn resample(segment: &AudioSegment, target_rate: u32) -> Result<AudioSegment, CloneError> {
    if segment.sample_rate == target_rate {
        return Ok(segment.clone());
    }
    let mut resampler = FftFixedIn::<f32>::new(
        segment.sample_rate as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        RESAMPLE_SUB_CHUNKS,
        1,
    )
    .map_err(|e| CloneError::Resample(e.to_string()))?;

    let ratio = target_rate as f64 / segment.sample_rate as f64;
    let capacity = (segment.samples.len() as f64 * ratio) as usize + RESAMPLE_CHUNK;
    let mut output = Vec::with_capacity(capacity);
    let mut pos = 0;
    while pos < segment.samples.len() {
        let end = (pos + RESAMPLE_CHUNK).min(segment.samples.len());
        let mut block = segment.samples[pos..end].to_vec();
        if block.len() < RESAMPLE_CHUNK {
            block.resize(RESAMPLE_CHUNK, 0.0);
        }
        let processed = resampler
            .process(&[block], None)
            .map_err(|e| CloneError::Resample(e.to_string()))?;
        output.extend_from_slice(&processed[0]);
        pos = end;
    }

    Ok(AudioSegment {
        samples: output,
        sample_rate: target_rate,
    })
}

/// Load a reference WAV as mono audio at `target_rate`.
pub fn load_reference(path: &Path, target_rate: u32) -> Result<AudioSegment, CloneError> {
    let segment = AudioSegment::read_wav(path).map_err(|e| CloneError::Read(e.to_string()))?;
    if segment.samples.is_empty() {
        return Err(CloneError::EmptyReference);
    }
    resample(&segment, target_rate)
}

/// Derive the run's timbre embedding from a reference WAV.
///
/// The first constructed handle anchors both the target sample rate and the
/// feature extraction. Callers treat any error as "skip cloning and fall
/// back to the built-in voices".
pub fn embed_from_wav(
    router: &mut VoiceRouter,
    path: &Path,
) -> Result<TimbreEmbedding, CloneError> {
    let handle = router.first_mut().ok_or(CloneError::NoActiveSynthesizer)?;
    let reference = load_reference(path, handle.sample_rate())?;
    let embedding = handle
        .embed_reference(&reference.samples)
        .map_err(|e| CloneError::Embedding(e.to_string()))?;
    info!(
        "Derived a {}-value reference embedding from {} ({:.2}s of audio)",
        embedding.len(),
        path.display(),
        reference.duration_secs()
    );
    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::router::SynthesizerRegistry;
    use crate::test_util::{temp_dir, FakeSynthesizer};

    fn write_tone(path: &Path, rate: u32, len: usize) {
        AudioSegment {
            samples: (0..len).map(|i| (i as f32 * 0.01).sin() * 0.4).collect(),
            sample_rate: rate,
        }
        .write_wav(path)
        .unwrap();
    }

    #[test]
    fn same_rate_passes_through_unchanged() {
        let seg = AudioSegment {
            samples: vec![0.1, -0.2, 0.3],
            sample_rate: 16000,
        };
        let out = resample(&seg, 16000).unwrap();
        assert_eq!(out.samples, seg.samples);
    }

    #[test]
    fn resampling_doubles_the_sample_count_within_block_padding() {
        let seg = AudioSegment {
            samples: vec![0.25; 4096],
            sample_rate: 8000,
        };
        let out = resample(&seg, 16000).unwrap();
        assert_eq!(out.sample_rate, 16000);
        // 4 full input blocks, each yielding twice its length.
        assert_eq!(out.samples.len(), 8192);
    }

    #[test]
    fn short_input_is_padded_to_one_block() {
        let seg = AudioSegment {
            samples: vec![0.5; 100],
            sample_rate: 8000,
        };
        let out = resample(&seg, 16000).unwrap();
        assert_eq!(out.samples.len(), 2 * RESAMPLE_CHUNK);
    }

    #[test]
    fn missing_reference_reports_read_error() {
        let dir = temp_dir("clone_missing");
        let err = load_reference(&dir.join("nope.wav"), 16000).unwrap_err();
        assert!(matches!(err, CloneError::Read(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_router_cannot_embed() {
        let mut router = SynthesizerRegistry::new().build(&[]).router;
        let err = embed_from_wav(&mut router, Path::new("ref.wav")).unwrap_err();
        assert!(matches!(err, CloneError::NoActiveSynthesizer));
    }

    #[test]
    fn same_reference_yields_the_same_embedding() {
        let dir = temp_dir("clone_deterministic");
        let wav = dir.join("ref.wav");
        write_tone(&wav, 9000, 500);

        let mut registry = SynthesizerRegistry::new();
        registry.register(Language::Ja, || Ok(Box::new(FakeSynthesizer::new(9000))));
        let mut router = registry.build(&["JA"]).router;

        let first = embed_from_wav(&mut router, &wav).unwrap();
        let second = embed_from_wav(&mut router, &wav).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn engine_without_embedding_support_reports_it() {
        let dir = temp_dir("clone_unsupported");
        let wav = dir.join("ref.wav");
        write_tone(&wav, 9000, 200);

        let mut registry = SynthesizerRegistry::new();
        registry.register(Language::En, || {
            Ok(Box::new(FakeSynthesizer::new(9000).without_embedding()))
        });
        let mut router = registry.build(&["EN"]).router;

        let err = embed_from_wav(&mut router, &wav).unwrap_err();
        assert!(matches!(err, CloneError::Embedding(_)));
        std::fs::remove_dir_all(&dir).ok();
    }
}
