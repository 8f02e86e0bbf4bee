//! Per-language, per-sentence batch synthesis.
//!
//! The driver walks the router's handles in construction order and each
//! handle's sentence bucket in script order, writing one
//! `{CODE}_{index:03}.wav` per sentence with 1-based indices. A sentence
//! that fails is recorded and skipped; its index is never reused, so file
//! names stay aligned with bucket positions across partial runs. Re-running
//! with the same inputs overwrites the same names with identical bytes.

use std::path::PathBuf;

use derive_builder::Builder;
use log::{info, warn};

use crate::language::Language;
use crate::router::VoiceRouter;
use crate::script::ScriptBuckets;
use crate::{AudioSegment, SynthesisParams, Synthesizer, TimbreEmbedding};

/// Run configuration for [`run_batch`].
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct BatchOptions {
    /// Directory receiving the WAV files.
    #[builder(default = "PathBuf::from(\"wav_out\")")]
    pub out_dir: PathBuf,
    /// Parameters applied to every synthesis call.
    #[builder(default)]
    pub params: SynthesisParams,
    /// Voice label resolved against each handle's table; handles without it
    /// keep their default speaker.
    #[builder(default)]
    pub voice: Option<String>,
    /// Silence inserted between cloned pieces, in seconds.
    #[builder(default = "0.05")]
    pub gap_secs: f32,
    /// Also write one merged `{CODE}_full.wav` per language.
    #[builder(default)]
    pub merge: bool,
}

/// One skipped sentence and why.
#[derive(Debug)]
pub struct Failure {
    pub language: Language,
    /// 1-based position in the language's bucket.
    pub index: usize,
    pub message: String,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Sentences synthesized and written.
    pub succeeded: usize,
    /// Sentences skipped after a synthesis or write error.
    pub failures: Vec<Failure>,
    /// Files written, in write order.
    pub files: Vec<PathBuf>,
}

fn gap_samples(rate: u32, gap_secs: f32) -> usize {
    (rate as f32 * gap_secs).round() as usize
}

/// Synthesize one sentence through the cloned-timbre path.
///
/// The sentence is split into engine-sized pieces, each piece is synthesized
/// with the shared embedding, and the pieces are joined with a short silence
/// between consecutive pieces: `k` pieces carry exactly `k - 1` gaps.
fn synthesize_cloned_sentence(
    handle: &mut dyn Synthesizer,
    sentence: &str,
    params: &SynthesisParams,
    embedding: &TimbreEmbedding,
    gap_secs: f32,
) -> Result<AudioSegment, Box<dyn std::error::Error>> {
    let pieces = handle.split_into_pieces(sentence);
    if pieces.is_empty() {
        return Err("sentence produced no synthesizable pieces".into());
    }
    let rate = handle.sample_rate();
    let gap = gap_samples(rate, gap_secs);
    let mut samples = Vec::new();
    for (i, piece) in pieces.iter().enumerate() {
        let segment = handle.synthesize_cloned(piece, params, embedding)?;
        if i > 0 {
            samples.extend(std::iter::repeat(0.0f32).take(gap));
        }
        samples.extend_from_slice(&segment.samples);
    }
    Ok(AudioSegment {
        samples,
        sample_rate: rate,
    })
}

/// Synthesize every routed sentence and write the WAV files.
///
/// With an embedding the cloned path is used for every sentence; without
/// one, each sentence is a single plain synthesis call. Failures never stop
/// the batch: they are logged, recorded in the report, and the next
/// sentence proceeds.
pub fn run_batch(
    router: &mut VoiceRouter,
    buckets: &ScriptBuckets,
    embedding: Option<&TimbreEmbedding>,
    options: &BatchOptions,
) -> Result<BatchReport, std::io::Error> {
    std::fs::create_dir_all(&options.out_dir)?;
    let mut report = BatchReport::default();

    for (lang, handle) in router.iter_mut() {
        let sentences = buckets.sentences(lang);
        if sentences.is_empty() {
            info!("No sentences routed to {lang}, skipping");
            continue;
        }

        let mut params = options.params;
        if let Some(label) = &options.voice {
            match handle.speaker_id(label) {
                Ok(id) => params.speaker = Some(id),
                Err(err) => warn!("{err} for {lang}, keeping the default speaker"),
            }
        }

        info!(
            "Synthesizing {} sentences for {}",
            sentences.len(),
            lang.name()
        );
        let mut merged: Vec<f32> = Vec::new();
        for (i, sentence) in sentences.iter().enumerate() {
            let index = i + 1;
            let result = match embedding {
                Some(embedding) => synthesize_cloned_sentence(
                    handle,
                    sentence,
                    &params,
                    embedding,
                    options.gap_secs,
                ),
                None => handle.synthesize(sentence, &params),
            };
            let segment = match result {
                Ok(segment) => segment,
                Err(err) => {
                    warn!("Synthesis failed for {lang} {index:03}: {err}");
                    report.failures.push(Failure {
                        language: lang,
                        index,
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            let path = options.out_dir.join(format!("{lang}_{index:03}.wav"));
            if let Err(err) = segment.write_wav(&path) {
                warn!("Failed to write {}: {err}", path.display());
                report.failures.push(Failure {
                    language: lang,
                    index,
                    message: err.to_string(),
                });
                continue;
            }
            if options.merge {
                merged.extend_from_slice(&segment.samples);
            }
            report.succeeded += 1;
            report.files.push(path);
        }

        if options.merge && !merged.is_empty() {
            let full = AudioSegment {
                samples: merged,
                sample_rate: handle.sample_rate(),
            };
            let path = options.out_dir.join(format!("{lang}_full.wav"));
            match full.write_wav(&path) {
                Ok(()) => report.files.push(path),
                Err(err) => warn!("Failed to write {}: {err}", path.display()),
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::SynthesizerRegistry;
    use crate::script;
    use crate::test_util::{temp_dir, FakeSynthesizer};
    use crate::{SpeakerId, VoiceNotFound};
    use std::path::Path;

    const RATE: u32 = 1000; // 50-sample gaps at 0.05s

    fn options(dir: &Path) -> BatchOptions {
        BatchOptionsBuilder::default()
            .out_dir(dir)
            .build()
            .unwrap()
    }

    fn two_language_router() -> VoiceRouter {
        let mut registry = SynthesizerRegistry::new();
        registry.register(crate::language::Language::Ja, || {
            Ok(Box::new(FakeSynthesizer::new(RATE)))
        });
        registry.register(crate::language::Language::En, || {
            Ok(Box::new(FakeSynthesizer::new(RATE)))
        });
        registry.build(&["JA", "EN"]).router
    }

    #[test]
    fn writes_one_wav_per_sentence_with_language_prefix() {
        let dir = temp_dir("batch_naming");
        let text = "수지\nこんにちは。\nHello one.\nMinho\nまた明日。\nHello two.\n";
        let buckets = script::parse_str(
            text,
            &[crate::language::Language::Ja, crate::language::Language::En],
            None,
        );
        let mut router = two_language_router();

        let report = run_batch(&mut router, &buckets, None, &options(&dir)).unwrap();
        assert_eq!(report.succeeded, 4);
        assert!(report.failures.is_empty());
        for name in ["JA_001.wav", "JA_002.wav", "EN_001.wav", "EN_002.wav"] {
            assert!(dir.join(name).is_file(), "missing {name}");
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn cloned_path_inserts_one_gap_less_than_pieces() {
        let dir = temp_dir("batch_gaps");
        // Second turn line lands in the EN bucket; pieces split on '/'.
        let buckets = script::parse_str(
            "수지\nx.\nab/cde/f\n",
            &[crate::language::Language::En],
            None,
        );
        let mut registry = SynthesizerRegistry::new();
        registry.register(crate::language::Language::En, || {
            Ok(Box::new(FakeSynthesizer::new(RATE)))
        });
        let mut router = registry.build(&["EN"]).router;
        let embedding = TimbreEmbedding(vec![0.0; 4]);

        run_batch(&mut router, &buckets, Some(&embedding), &options(&dir)).unwrap();
        let out = AudioSegment::read_wav(&dir.join("EN_001.wav")).unwrap();
        // Pieces of 2, 3 and 1 samples joined by two 50-sample gaps.
        assert_eq!(out.samples.len(), 2 + 3 + 1 + 2 * 50);
        let zeros = out.samples.iter().filter(|s| **s == 0.0).count();
        assert_eq!(zeros, 100);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn single_piece_sentence_has_no_gap() {
        let dir = temp_dir("batch_single_piece");
        let buckets = script::parse_str(
            "수지\nx.\nhello there.\n",
            &[crate::language::Language::En],
            None,
        );
        let mut registry = SynthesizerRegistry::new();
        registry.register(crate::language::Language::En, || {
            Ok(Box::new(FakeSynthesizer::new(RATE)))
        });
        let mut router = registry.build(&["EN"]).router;
        let embedding = TimbreEmbedding(vec![0.0; 4]);

        run_batch(&mut router, &buckets, Some(&embedding), &options(&dir)).unwrap();
        let out = AudioSegment::read_wav(&dir.join("EN_001.wav")).unwrap();
        assert_eq!(out.samples.len(), "hello there.".chars().count());
        assert!(out.samples.iter().all(|s| *s != 0.0));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn failure_at_one_index_does_not_stop_the_batch() {
        let dir = temp_dir("batch_isolation");
        let text = "수지\nx.\nfirst one.\n수지\nx.\nsecond one.\n수지\nx.\nboom here.\n수지\nx.\nfourth one.\n";
        let buckets = script::parse_str(text, &[crate::language::Language::En], None);
        let mut registry = SynthesizerRegistry::new();
        registry.register(crate::language::Language::En, || {
            Ok(Box::new(FakeSynthesizer::new(RATE).failing_on("boom")))
        });
        let mut router = registry.build(&["EN"]).router;

        let report = run_batch(&mut router, &buckets, None, &options(&dir)).unwrap();
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 3);
        assert!(dir.join("EN_002.wav").is_file());
        assert!(!dir.join("EN_003.wav").exists());
        assert!(dir.join("EN_004.wav").is_file());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rerun_overwrites_with_identical_bytes() {
        let dir = temp_dir("batch_idempotent");
        let buckets = script::parse_str(
            "수지\nこんにちは。\nHello again.\n",
            &[crate::language::Language::Ja, crate::language::Language::En],
            None,
        );
        let mut router = two_language_router();
        let opts = options(&dir);

        run_batch(&mut router, &buckets, None, &opts).unwrap();
        let first = std::fs::read(dir.join("JA_001.wav")).unwrap();
        run_batch(&mut router, &buckets, None, &opts).unwrap();
        let second = std::fs::read(dir.join("JA_001.wav")).unwrap();
        assert_eq!(first, second);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn merge_concatenates_only_successful_segments() {
        let dir = temp_dir("batch_merge");
        let text = "수지\nx.\na b\n수지\nx.\nbad x\n수지\nx.\nc d e\n";
        let buckets = script::parse_str(text, &[crate::language::Language::En], None);
        let mut registry = SynthesizerRegistry::new();
        registry.register(crate::language::Language::En, || {
            Ok(Box::new(FakeSynthesizer::new(RATE).failing_on("bad")))
        });
        let mut router = registry.build(&["EN"]).router;
        let opts = BatchOptionsBuilder::default()
            .out_dir(&dir)
            .merge(true)
            .build()
            .unwrap();

        let report = run_batch(&mut router, &buckets, None, &opts).unwrap();
        assert_eq!(report.succeeded, 2);
        let full = AudioSegment::read_wav(&dir.join("EN_full.wav")).unwrap();
        assert_eq!(full.samples.len(), "a b".chars().count() + "c d e".chars().count());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn voice_label_resolves_per_language_handle() {
        let dir = temp_dir("batch_voice");
        let buckets = script::parse_str(
            "수지\nこんにちは。\nHello voice.\n",
            &[crate::language::Language::Ja, crate::language::Language::En],
            None,
        );
        let mut registry = SynthesizerRegistry::new();
        registry.register(crate::language::Language::Ja, || {
            Ok(Box::new(FakeSynthesizer::new(RATE)))
        });
        registry.register(crate::language::Language::En, || {
            Ok(Box::new(
                FakeSynthesizer::new(RATE).with_voices(&[("EN-US", 0), ("EN-BR", 1)]),
            ))
        });
        let mut router = registry.build(&["JA", "EN"]).router;
        let opts = BatchOptionsBuilder::default()
            .out_dir(&dir)
            .voice("EN-BR".to_string())
            .build()
            .unwrap();

        run_batch(&mut router, &buckets, None, &opts).unwrap();
        let en = AudioSegment::read_wav(&dir.join("EN_001.wav")).unwrap();
        let ja = AudioSegment::read_wav(&dir.join("JA_001.wav")).unwrap();
        // The fake encodes the resolved speaker id in its sample value.
        assert!((en.samples[0] - 0.35).abs() < 1e-6);
        assert!((ja.samples[0] - 0.25).abs() < 1e-6);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn engine_without_cloning_fails_every_sentence_but_finishes() {
        struct NoClone;
        impl Synthesizer for NoClone {
            fn sample_rate(&self) -> u32 {
                RATE
            }
            fn speaker_id(&self, voice: &str) -> Result<SpeakerId, VoiceNotFound> {
                Err(VoiceNotFound(voice.to_string()))
            }
            fn default_speaker(&self) -> SpeakerId {
                SpeakerId(0)
            }
            fn list_voices(&self) -> Vec<String> {
                Vec::new()
            }
            fn synthesize(
                &mut self,
                text: &str,
                _params: &SynthesisParams,
            ) -> Result<AudioSegment, Box<dyn std::error::Error>> {
                Ok(AudioSegment {
                    samples: vec![0.25; text.chars().count()],
                    sample_rate: RATE,
                })
            }
            fn split_into_pieces(&self, text: &str) -> Vec<String> {
                vec![text.to_string()]
            }
        }

        let dir = temp_dir("batch_no_clone");
        let buckets = script::parse_str(
            "수지\nx.\nfirst one.\n수지\nx.\nsecond one.\n",
            &[crate::language::Language::En],
            None,
        );
        let mut registry = SynthesizerRegistry::new();
        registry.register(crate::language::Language::En, || Ok(Box::new(NoClone)));
        let mut router = registry.build(&["EN"]).router;
        let embedding = TimbreEmbedding(vec![0.0; 4]);

        let report = run_batch(&mut router, &buckets, Some(&embedding), &options(&dir)).unwrap();
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failures.len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_buckets_yield_an_empty_report() {
        let dir = temp_dir("batch_empty");
        let buckets = script::parse_str("", &[crate::language::Language::En], None);
        let mut router = two_language_router();
        let report = run_batch(&mut router, &buckets, None, &options(&dir)).unwrap();
        assert_eq!(report.succeeded, 0);
        assert!(report.failures.is_empty());
        assert!(report.files.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn gap_length_follows_the_sample_rate() {
        assert_eq!(gap_samples(24000, 0.05), 1200);
        assert_eq!(gap_samples(44100, 0.05), 2205);
        assert_eq!(gap_samples(RATE, 0.05), 50);
    }
}
