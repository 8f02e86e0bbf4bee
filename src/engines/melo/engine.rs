use std::collections::HashMap;
use std::path::Path;

use crate::{AudioSegment, SpeakerId, SynthesisParams, Synthesizer, TimbreEmbedding, VoiceNotFound};

use super::config::MeloConfig;
use super::model::{MeloError, MeloModel};
use super::text;

/// Longest piece the splitter hands to the synthesis graph.
pub const MAX_PIECE_CHARS: usize = 120;

/// Parameters for configuring Melo model loading.
#[derive(Debug, Clone, Default)]
pub struct MeloModelParams {
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
}

/// Melo text-to-speech engine bound to one language's model directory.
///
/// Constructed fully loaded; the registry builds one per requested
/// language at startup and the handle lives for the whole run.
pub struct MeloEngine {
    model: MeloModel,
    symbol_map: HashMap<char, i64>,
    voices: Vec<(String, SpeakerId)>,
    sample_rate: u32,
}

impl MeloEngine {
    /// Load a model directory with default parameters.
    pub fn from_dir(model_dir: &Path) -> Result<Self, MeloError> {
        Self::from_dir_with_params(model_dir, MeloModelParams::default())
    }

    /// Load a model directory with custom parameters.
    pub fn from_dir_with_params(
        model_dir: &Path,
        params: MeloModelParams,
    ) -> Result<Self, MeloError> {
        let config = MeloConfig::load(&model_dir.join("config.json"))?;
        let model = MeloModel::load(model_dir, params.num_threads)?;
        let symbol_map = text::build_symbol_map(&config.symbols);
        let voices: Vec<(String, SpeakerId)> = config
            .voices_in_order()
            .into_iter()
            .map(|(name, id)| (name, SpeakerId(id)))
            .collect();
        log::info!(
            "Loaded Melo model: {} voices, {} symbols, {} Hz, cloning={}",
            voices.len(),
            config.symbols.len(),
            config.data.sampling_rate,
            model.supports_cloning()
        );
        Ok(Self {
            model,
            symbol_map,
            voices,
            sample_rate: config.data.sampling_rate,
        })
    }

    pub fn supports_cloning(&self) -> bool {
        self.model.supports_cloning()
    }

    fn render(
        &mut self,
        text: &str,
        params: &SynthesisParams,
        embedding: Option<&[f32]>,
    ) -> Result<Vec<f32>, MeloError> {
        let ids = text::encode(text, &self.symbol_map);
        if ids.is_empty() {
            return Err(MeloError::EmptyInput(text.to_string()));
        }
        let speaker = params.speaker.unwrap_or_else(|| self.default_speaker());
        let length_scale = 1.0 / params.speed.clamp(0.1, 10.0);
        self.model
            .infer(&ids, speaker.0, params.noise_scale, length_scale, embedding)
    }
}

impl Synthesizer for MeloEngine {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
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
        let samples = self.render(text, params, None)?;
        Ok(AudioSegment {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    fn split_into_pieces(&self, text: &str) -> Vec<String> {
        text::split_pieces(text, MAX_PIECE_CHARS)
    }

    fn embed_reference(
        &mut self,
        samples: &[f32],
    ) -> Result<TimbreEmbedding, Box<dyn std::error::Error>> {
        Ok(TimbreEmbedding(self.model.embed_reference(samples)?))
    }

    fn synthesize_cloned(
        &mut self,
        piece: &str,
        params: &SynthesisParams,
        embedding: &TimbreEmbedding,
    ) -> Result<AudioSegment, Box<dyn std::error::Error>> {
        let samples = self.render(piece, params, Some(embedding.as_slice()))?;
        Ok(AudioSegment {
            samples,
            sample_rate: self.sample_rate,
        })
    }
}
