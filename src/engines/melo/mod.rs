//! Melo VITS text-to-speech engine.
//!
//! Drives a MeloTTS-style ONNX export: one synthesis graph per language,
//! with the speaker table and symbol inventory read from the model's
//! `config.json`. Models exported with a conditioning input also accept a
//! timbre embedding, produced by the optional reference-encoder graph.
//!
//! # Model Directory Layout
//!
//! ```text
//! models/EN/
//! ├── model.onnx       # VITS synthesis graph
//! ├── config.json      # sample rate, symbols, speaker table
//! └── ref_enc.onnx     # optional reference encoder for voice cloning
//! ```
//!
//! # Voices
//!
//! Voice labels come from the speaker table, e.g. `EN-US`, `EN-BR`,
//! `EN-AU` for the English model; single-speaker models expose one label.
//!
//! # Examples
//!
//! ```rust,no_run
//! use script_tts::engines::melo::MeloEngine;
//! use script_tts::{SynthesisParams, Synthesizer};
//! use std::path::Path;
//!
//! let mut engine = MeloEngine::from_dir(Path::new("models/EN"))?;
//! let segment = engine.synthesize("Hello, world!", &SynthesisParams::default())?;
//! segment.write_wav(Path::new("out.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engine;
pub mod model;
pub mod text;

pub use config::MeloConfig;
pub use engine::{MeloEngine, MeloModelParams};
pub use model::MeloError;
