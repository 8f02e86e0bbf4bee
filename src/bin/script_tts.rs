//! Command-line frontend for batch script synthesis.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::warn;

use script_tts::batch::{self, BatchOptionsBuilder};
use script_tts::cloning;
use script_tts::compare::{self, CompareOptions};
use script_tts::enhance::{self, Tier};
use script_tts::router::SynthesizerRegistry;
use script_tts::script;
use script_tts::SynthesisParams;

const DEFAULT_COMPARE_LINES: &[&str] = &[
    "The quick brown fox jumps over the lazy dog.",
    "How are you doing today?",
    "This is a comparison of the available voices.",
];

#[derive(Parser)]
#[command(
    name = "script-tts",
    version,
    about = "Batch speech synthesis for speaker-tagged multi-language dialogue scripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize a speaker-tagged script into per-language WAV files
    Synth(SynthArgs),
    /// List the voices of each loaded language model
    Voices(VoicesArgs),
    /// Synthesize the same lines with several voices of one language
    Compare(CompareArgs),
    /// Post-process a directory of WAV files
    Enhance(EnhanceArgs),
}

#[derive(Args)]
struct SynthArgs {
    /// Script file with speaker markers and per-language dialogue lines
    #[arg(long, default_value = "script.txt")]
    script: PathBuf,
    /// Language codes to synthesize, in handle order
    #[arg(long, value_delimiter = ',', default_value = "JA,EN,KR")]
    languages: Vec<String>,
    /// Only synthesize turns spoken by this speaker
    #[arg(long)]
    speaker: Option<String>,
    /// Voice label, applied where a language's model has it
    #[arg(long)]
    voice: Option<String>,
    /// Reference WAV whose timbre is cloned across the whole batch
    #[arg(long)]
    ref_wav: Option<PathBuf>,
    /// Directory holding one model directory per language code
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,
    /// Output directory
    #[arg(long, default_value = "wav_out")]
    out_dir: PathBuf,
    /// Speaking speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f32,
    /// Also write one merged {CODE}_full.wav per language
    #[arg(long)]
    merge: bool,
    /// Route lines by character detection instead of speaker markers
    #[arg(long)]
    untagged: bool,
}

#[derive(Args)]
struct VoicesArgs {
    #[arg(long, value_delimiter = ',', default_value = "JA,EN,KR")]
    languages: Vec<String>,
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,
}

#[derive(Args)]
struct CompareArgs {
    /// Language whose voices are compared
    #[arg(long, default_value = "EN")]
    language: String,
    /// Voice labels to compare; all voices when omitted
    #[arg(long, value_delimiter = ',')]
    voices: Vec<String>,
    /// File of lines to synthesize; built-in sample lines when omitted
    #[arg(long)]
    lines: Option<PathBuf>,
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,
    #[arg(long, default_value = "accent_out")]
    out_dir: PathBuf,
}

#[derive(Args)]
struct EnhanceArgs {
    /// Directory of WAV files to clean up
    #[arg(long)]
    input: PathBuf,
    /// Directory receiving the enhanced_{name}.wav files
    #[arg(long)]
    output: PathBuf,
    /// Enhancement tier: standard, high or ultra
    #[arg(long, default_value_t = Tier::Standard)]
    tier: Tier,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Synth(args) => run_synth(args),
        Command::Voices(args) => run_voices(args),
        Command::Compare(args) => run_compare(args),
        Command::Enhance(args) => run_enhance(args),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_synth(args: SynthArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let registry = SynthesizerRegistry::with_melo_models(&args.models_dir);
    let codes: Vec<&str> = args.languages.iter().map(String::as_str).collect();
    let outcome = registry.build(&codes);
    let mut router = outcome.router;
    if router.is_empty() {
        eprintln!("No synthesizer could be loaded for {:?}.", args.languages);
        return Ok(ExitCode::FAILURE);
    }

    let text = std::fs::read_to_string(&args.script)?;
    let active = router.languages();
    let buckets = if args.untagged {
        script::parse_untagged(&text, &active)
    } else {
        script::parse_str(&text, &active, args.speaker.as_deref())
    };
    if buckets.is_empty() {
        if buckets.turns_seen == 0 {
            println!(
                "No dialogue found in {}, nothing to synthesize.",
                args.script.display()
            );
        } else {
            println!(
                "No turns left after filtering ({} seen, {} kept), nothing to synthesize.",
                buckets.turns_seen, buckets.turns_kept
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let embedding = match &args.ref_wav {
        Some(path) => match cloning::embed_from_wav(&mut router, path) {
            Ok(embedding) => {
                println!("Cloning timbre from {}", path.display());
                Some(embedding)
            }
            Err(err) => {
                warn!("{err}; falling back to the built-in voices");
                None
            }
        },
        None => None,
    };

    let params = SynthesisParams {
        speed: args.speed,
        ..SynthesisParams::default()
    };
    let options = BatchOptionsBuilder::default()
        .out_dir(args.out_dir)
        .params(params)
        .voice(args.voice)
        .merge(args.merge)
        .build()?;

    let report = batch::run_batch(&mut router, &buckets, embedding.as_ref(), &options)?;

    for file in &report.files {
        println!("[OK] {}", file.display());
    }
    for failure in &report.failures {
        println!(
            "[FAIL] {} {:03}: {}",
            failure.language, failure.index, failure.message
        );
    }
    let total_bytes: u64 = report
        .files
        .iter()
        .filter_map(|path| std::fs::metadata(path).ok())
        .map(|meta| meta.len())
        .sum();
    println!(
        "Wrote {} files ({:.1} MB): {} sentences succeeded, {} failed.",
        report.files.len(),
        total_bytes as f64 / 1_048_576.0,
        report.succeeded,
        report.failures.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn run_voices(args: VoicesArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let registry = SynthesizerRegistry::with_melo_models(&args.models_dir);
    let codes: Vec<&str> = args.languages.iter().map(String::as_str).collect();
    let router = registry.build(&codes).router;
    if router.is_empty() {
        eprintln!("No synthesizer could be loaded for {:?}.", args.languages);
        return Ok(ExitCode::FAILURE);
    }

    for (lang, handle) in router.iter() {
        println!("{} ({})", lang, lang.name());
        for voice in handle.list_voices() {
            println!("  {voice}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_compare(args: CompareArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let registry = SynthesizerRegistry::with_melo_models(&args.models_dir);
    let mut router = registry.build(&[args.language.as_str()]).router;
    let Some(lang) = router.languages().first().copied() else {
        eprintln!("Could not load a synthesizer for {}.", args.language);
        return Ok(ExitCode::FAILURE);
    };
    let Some(handle) = router.get_mut(lang) else {
        return Ok(ExitCode::FAILURE);
    };

    let lines: Vec<String> = match &args.lines {
        Some(path) => std::fs::read_to_string(path)?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        None => DEFAULT_COMPARE_LINES.iter().map(|s| s.to_string()).collect(),
    };

    let options = CompareOptions {
        out_dir: args.out_dir,
        params: SynthesisParams::default(),
    };
    let report = compare::run_compare(handle, &args.voices, &lines, &options)?;

    for outcome in &report.voices {
        println!(
            "{}: {} files, {} failed, {:.1} KB",
            outcome.voice,
            outcome.written,
            outcome.failed,
            outcome.bytes as f64 / 1024.0
        );
    }
    for voice in &report.unknown_voices {
        println!("[SKIP] unknown voice: {voice}");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_enhance(args: EnhanceArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let report = enhance::enhance_directory(&args.input, &args.output, args.tier)?;
    println!("Enhanced {} files, {} failed.", report.enhanced, report.failed);
    if report.enhanced == 0 && report.failed > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
