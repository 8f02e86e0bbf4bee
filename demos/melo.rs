use std::path::{Path, PathBuf};
use std::time::Instant;

use script_tts::{
    engines::melo::MeloEngine, SynthesisParams, Synthesizer,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let model_dir = PathBuf::from("models/EN");

    let load_start = Instant::now();
    let mut engine = MeloEngine::from_dir(&model_dir)?;
    println!("Model loaded in {:.2?}", load_start.elapsed());

    println!("Available voices: {:?}", engine.list_voices());

    let text = "Hello! This is a batch speech synthesis library for dialogue scripts. \
                Each language in the script is rendered by its own model, one sentence \
                at a time, and written out as numbered WAV files.";

    let params = SynthesisParams {
        speed: 1.0,
        ..Default::default()
    };

    let synth_start = Instant::now();
    let result = engine.synthesize(text, &params)?;
    let synth_dur = synth_start.elapsed();

    let audio_duration = result.samples.len() as f64 / result.sample_rate as f64;
    let speedup = audio_duration / synth_dur.as_secs_f64();
    println!(
        "Synthesized {:.2}s audio in {:.2?} ({:.1}x real-time)",
        audio_duration, synth_dur, speedup
    );

    engine.synthesize_to_file(text, Path::new("output.wav"), &params)?;
    println!("Saved to output.wav");

    Ok(())
}
