//! Side-by-side voice comparison.
//!
//! Synthesizes the same lines once per voice of a single language so the
//! variants can be auditioned next to each other. Each voice gets its own
//! directory of `line_{index:03}.wav` files; a label missing from the voice
//! table skips only that voice.

use std::path::PathBuf;

use log::{info, warn};

use crate::{SynthesisParams, Synthesizer};

#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub out_dir: PathBuf,
    pub params: SynthesisParams,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("accent_out"),
            params: SynthesisParams::default(),
        }
    }
}

/// What one voice produced.
#[derive(Debug)]
pub struct VoiceOutcome {
    pub voice: String,
    pub written: usize,
    pub failed: usize,
    /// Total size of the files written for this voice.
    pub bytes: u64,
}

#[derive(Debug, Default)]
pub struct CompareReport {
    pub voices: Vec<VoiceOutcome>,
    /// Labels that were not in the voice table.
    pub unknown_voices: Vec<String>,
}

/// Synthesize `lines` once per requested voice.
///
/// An empty `voices` list runs every voice in the handle's table, in table
/// order. Unknown labels and per-line failures are recorded and skipped.
pub fn run_compare(
    handle: &mut dyn Synthesizer,
    voices: &[String],
    lines: &[String],
    options: &CompareOptions,
) -> Result<CompareReport, std::io::Error> {
    let voices: Vec<String> = if voices.is_empty() {
        handle.list_voices()
    } else {
        voices.to_vec()
    };
    std::fs::create_dir_all(&options.out_dir)?;

    let mut report = CompareReport::default();
    for voice in &voices {
        let id = match handle.speaker_id(voice) {
            Ok(id) => id,
            Err(err) => {
                warn!("{err}, skipping this voice");
                report.unknown_voices.push(voice.clone());
                continue;
            }
        };
        let voice_dir = options.out_dir.join(voice);
        std::fs::create_dir_all(&voice_dir)?;

        let mut params = options.params;
        params.speaker = Some(id);
        let mut outcome = VoiceOutcome {
            voice: voice.clone(),
            written: 0,
            failed: 0,
            bytes: 0,
        };
        info!("Synthesizing {} lines with voice {voice}", lines.len());
        for (i, line) in lines.iter().enumerate() {
            let path = voice_dir.join(format!("line_{:03}.wav", i + 1));
            match handle.synthesize_to_file(line, &path, &params) {
                Ok(()) => {
                    outcome.written += 1;
                    outcome.bytes += std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                }
                Err(err) => {
                    warn!("Synthesis failed for voice {voice} line {:03}: {err}", i + 1);
                    outcome.failed += 1;
                }
            }
        }
        report.voices.push(outcome);
    }
    Ok(report)
}
