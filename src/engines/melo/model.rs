use std::path::Path;

use ndarray::{Array2, Array3};
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

/// Conditioning vector dimension of the VITS export.
pub const EMBEDDING_DIM: usize = 256;

#[derive(thiserror::Error, Debug)]
pub enum MeloError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Invalid config.json: {0}")]
    Config(String),
    #[error("No symbols matched the input text: {0:?}")]
    EmptyInput(String),
    #[error("This model was exported without voice cloning support")]
    CloningUnsupported,
    #[error("Model produced no audio output")]
    NoOutput,
}

/// Internal Melo ONNX model state.
pub struct MeloModel {
    session: Session,
    ref_session: Option<Session>,
    /// Detected token input name: "input_ids" or "phones"
    tokens_input_name: String,
    /// Detected reference-encoder waveform input name
    ref_input_name: String,
    /// True if the synthesis graph takes a `g` conditioning input
    supports_conditioning: bool,
}

impl MeloModel {
    /// Load the Melo model graphs from a directory.
    ///
    /// The directory must contain an `.onnx` synthesis graph (preferably
    /// `model.onnx`). A `ref_enc.onnx` next to it enables reference
    /// embedding.
    pub fn load(model_dir: &Path, num_threads: Option<usize>) -> Result<Self, MeloError> {
        let onnx_path = find_onnx_file(model_dir)?;
        log::info!("Loading Melo model from {}", onnx_path.display());

        let session = init_session(&onnx_path, num_threads)?;
        let tokens_input_name = detect_tokens_input(&session);
        let supports_conditioning = detect_conditioning_input(&session);
        log::info!(
            "Detected: tokens_input='{}', conditioning={}",
            tokens_input_name,
            supports_conditioning
        );

        let ref_path = model_dir.join("ref_enc.onnx");
        let (ref_session, ref_input_name) = if ref_path.exists() {
            log::info!("Loading reference encoder from {}", ref_path.display());
            let ref_session = init_session(&ref_path, num_threads)?;
            let name = detect_waveform_input(&ref_session);
            (Some(ref_session), name)
        } else {
            (None, "audio".to_string())
        };

        Ok(Self {
            session,
            ref_session,
            tokens_input_name,
            ref_input_name,
            supports_conditioning,
        })
    }

    /// True when both the conditioning input and the reference encoder exist.
    pub fn supports_cloning(&self) -> bool {
        self.supports_conditioning && self.ref_session.is_some()
    }

    /// Run the synthesis graph over one id sequence.
    pub fn infer(
        &mut self,
        ids: &[i64],
        speaker: i64,
        noise_scale: f32,
        length_scale: f32,
        embedding: Option<&[f32]>,
    ) -> Result<Vec<f32>, MeloError> {
        let ids_arr = Array2::from_shape_vec((1, ids.len()), ids.to_vec())?;
        let sid_arr = ndarray::arr1(&[speaker]);
        let noise_arr = ndarray::arr1(&[noise_scale]);
        let length_arr = ndarray::arr1(&[length_scale]);

        let output = match embedding {
            Some(values) => {
                if !self.supports_conditioning {
                    return Err(MeloError::CloningUnsupported);
                }
                if values.len() != EMBEDDING_DIM {
                    log::warn!(
                        "Conditioning vector has {} values, expected {}",
                        values.len(),
                        EMBEDDING_DIM
                    );
                }
                let g_arr = Array3::from_shape_vec((1, values.len(), 1), values.to_vec())?;
                let inputs = inputs![
                    self.tokens_input_name.as_str() => TensorRef::from_array_view(ids_arr.view())?,
                    "sid" => TensorRef::from_array_view(sid_arr.view())?,
                    "noise_scale" => TensorRef::from_array_view(noise_arr.view())?,
                    "length_scale" => TensorRef::from_array_view(length_arr.view())?,
                    "g" => TensorRef::from_array_view(g_arr.view())?,
                ];
                self.session.run(inputs)?
            }
            None => {
                let inputs = inputs![
                    self.tokens_input_name.as_str() => TensorRef::from_array_view(ids_arr.view())?,
                    "sid" => TensorRef::from_array_view(sid_arr.view())?,
                    "noise_scale" => TensorRef::from_array_view(noise_arr.view())?,
                    "length_scale" => TensorRef::from_array_view(length_arr.view())?,
                ];
                self.session.run(inputs)?
            }
        };

        let first_output = output.iter().next().ok_or(MeloError::NoOutput)?;
        let waveform = first_output.1.try_extract_array::<f32>()?;
        Ok(waveform.as_slice().unwrap_or(&[]).to_vec())
    }

    /// Run the reference encoder over mono samples at the model's rate.
    pub fn embed_reference(&mut self, samples: &[f32]) -> Result<Vec<f32>, MeloError> {
        let session = self
            .ref_session
            .as_mut()
            .ok_or(MeloError::CloningUnsupported)?;

        let wave_arr = Array2::from_shape_vec((1, samples.len()), samples.to_vec())?;
        let inputs = inputs![
            self.ref_input_name.as_str() => TensorRef::from_array_view(wave_arr.view())?,
        ];
        let output = session.run(inputs)?;

        let first_output = output.iter().next().ok_or(MeloError::NoOutput)?;
        let embedding = first_output.1.try_extract_array::<f32>()?;
        Ok(embedding.as_slice().unwrap_or(&[]).to_vec())
    }
}

/// Find the synthesis graph in the given directory.
///
/// Prefers `model.onnx`, then falls back to the first `.onnx` file that is
/// not the reference encoder.
fn find_onnx_file(model_dir: &Path) -> Result<std::path::PathBuf, MeloError> {
    let preferred = model_dir.join("model.onnx");
    if preferred.exists() {
        return Ok(preferred);
    }

    for entry in std::fs::read_dir(model_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("onnx")
            && path.file_stem().and_then(|s| s.to_str()) != Some("ref_enc")
        {
            log::info!("Using ONNX file: {}", path.display());
            return Ok(path);
        }
    }

    Err(MeloError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("No .onnx file found in {}", model_dir.display()),
    )))
}

fn init_session(onnx_path: &Path, num_threads: Option<usize>) -> Result<Session, MeloError> {
    let providers = vec![CPUExecutionProvider::default().build()];

    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_execution_providers(providers)?
        .with_parallel_execution(true)?;

    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(onnx_path)?)
}

/// Detect the token input name ("input_ids" or "phones") from session inputs.
fn detect_tokens_input(session: &Session) -> String {
    for input in &session.inputs {
        if input.name == "input_ids" || input.name == "phones" {
            return input.name.to_string();
        }
    }
    "input_ids".to_string()
}

/// Detect whether the synthesis graph accepts a `g` conditioning input.
fn detect_conditioning_input(session: &Session) -> bool {
    for input in &session.inputs {
        if input.name == "g" {
            return true;
        }
    }
    false
}

/// Detect the reference encoder's waveform input name.
fn detect_waveform_input(session: &Session) -> String {
    for input in &session.inputs {
        if input.name == "audio" || input.name == "waveform" {
            return input.name.to_string();
        }
    }
    "audio".to_string()
}
