//! Model configuration loaded from `config.json`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::model::MeloError;

/// The parts of a Melo `config.json` the engine needs.
#[derive(Debug, Clone, Deserialize)]
pub struct MeloConfig {
    pub data: DataSection,
    /// Symbol inventory; an input id is a position in this list.
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSection {
    pub sampling_rate: u32,
    /// Voice label to numeric speaker id.
    pub spk2id: HashMap<String, i64>,
}

impl MeloConfig {
    pub fn load(config_path: &Path) -> Result<Self, MeloError> {
        let content = std::fs::read_to_string(config_path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| MeloError::Config(format!("Failed to parse JSON: {e}")))?;

        if config.symbols.is_empty() {
            return Err(MeloError::Config("Empty 'symbols' list".to_string()));
        }
        if config.data.sampling_rate == 0 {
            return Err(MeloError::Config("'sampling_rate' must be non-zero".to_string()));
        }
        Ok(config)
    }

    /// Speaker table sorted by id, which recovers the export order.
    pub fn voices_in_order(&self) -> Vec<(String, i64)> {
        let mut voices: Vec<(String, i64)> = self
            .data
            .spk2id
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect();
        voices.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        voices
    }
}
