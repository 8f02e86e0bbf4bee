//! Speech synthesis engines.
//!
//! This module contains implementations of text-to-speech engines.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `melo` - Melo VITS (ONNX format, one model directory per language)

#[cfg(feature = "melo")]
pub mod melo;
