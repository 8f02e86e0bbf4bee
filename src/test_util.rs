//! Shared fixtures for the crate's unit tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{AudioSegment, SpeakerId, SynthesisParams, Synthesizer, TimbreEmbedding, VoiceNotFound};

static NEXT_DIR: AtomicU32 = AtomicU32::new(0);

/// Fresh empty directory under the system temp dir, unique per call.
pub fn temp_dir(tag: &str) -> PathBuf {
    let n = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("script-tts-{}-{}-{}", tag, std::process::id(), n));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Deterministic scripted synthesizer.
///
/// Output length equals the input's character count, so tests can predict
/// sample counts exactly. Pieces are delimited by `/` in the input text, and
/// failures are injected by substring match.
pub struct FakeSynthesizer {
    pub rate: u32,
    pub voices: Vec<(String, SpeakerId)>,
    pub fail_substring: Option<String>,
    pub supports_embedding: bool,
    pub synthesized: Vec<String>,
}

impl FakeSynthesizer {
    pub fn new(rate: u32) -> Self {
        Self {
            rate,
            voices: vec![("default".to_string(), SpeakerId(0))],
            fail_substring: None,
            supports_embedding: true,
            synthesized: Vec::new(),
        }
    }

    pub fn with_voices(mut self, voices: &[(&str, i64)]) -> Self {
        self.voices = voices
            .iter()
            .map(|(name, id)| (name.to_string(), SpeakerId(*id)))
            .collect();
        self
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_substring = Some(needle.to_string());
        self
    }

    pub fn without_embedding(mut self) -> Self {
        self.supports_embedding = false;
        self
    }

    fn render(&self, text: &str, value: f32) -> AudioSegment {
        AudioSegment {
            samples: vec![value; text.chars().count()],
            sample_rate: self.rate,
        }
    }

    fn check(&self, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(needle) = &self.fail_substring {
            if text.contains(needle.as_str()) {
                return Err(format!("injected failure on {text:?}").into());
            }
        }
        Ok(())
    }
}

impl Synthesizer for FakeSynthesizer {
    fn sample_rate(&self) -> u32 {
        self.rate
    }

    fn speaker_id(&self, voice: &str) -> Result<SpeakerId, VoiceNotFound> {
        self.voices
            .iter()
            .find(|(name, _)| name == voice)
            .map(|(_, id)| *id)
            .ok_or_else(|| VoiceNotFound(voice.to_string()))
    }

    fn default_speaker(&self) -> SpeakerId {
        self.voices.first().map(|(_, id)| *id).unwrap_or(SpeakerId(0))
    }

    fn list_voices(&self) -> Vec<String> {
        self.voices.iter().map(|(name, _)| name.clone()).collect()
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<AudioSegment, Box<dyn std::error::Error>> {
        self.check(text)?;
        self.synthesized.push(text.to_string());
        // Sample value encodes the resolved speaker so tests can see routing.
        let sid = params.speaker.unwrap_or_else(|| self.default_speaker());
        Ok(self.render(text, 0.25 + sid.0 as f32 * 0.1))
    }

    fn split_into_pieces(&self, text: &str) -> Vec<String> {
        text.split('/')
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn embed_reference(
        &mut self,
        samples: &[f32],
    ) -> Result<TimbreEmbedding, Box<dyn std::error::Error>> {
        if !self.supports_embedding {
            return Err("engine does not support reference embeddings".into());
        }
        let n = samples.len() as f32;
        let sum: f32 = samples.iter().sum();
        let first = samples.first().copied().unwrap_or(0.0);
        let last = samples.last().copied().unwrap_or(0.0);
        Ok(TimbreEmbedding(vec![n, sum, first, last]))
    }

    fn synthesize_cloned(
        &mut self,
        piece: &str,
        _params: &SynthesisParams,
        _embedding: &TimbreEmbedding,
    ) -> Result<AudioSegment, Box<dyn std::error::Error>> {
        self.check(piece)?;
        self.synthesized.push(format!("cloned:{piece}"));
        Ok(self.render(piece, 0.5))
    }
}
