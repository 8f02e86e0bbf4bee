//! Tiered audio post-processing.
//!
//! Cleans up synthesized WAVs with fixed, deterministic stages: a low-pass
//! noise cut and RMS normalization on every tier, echo subtraction on
//! `High`, and soft-clip limiting on `Ultra`. All stages run in the time
//! domain on the mono buffer.

use std::f32::consts::{FRAC_1_SQRT_2, PI};
use std::path::Path;

use log::{info, warn};

use crate::AudioSegment;

const NOISE_CUTOFF_HZ: f32 = 8000.0;
const TARGET_RMS: f32 = 0.1;
const ECHO_DELAY_SECS: f32 = 0.05;
const ECHO_DECAY: f32 = 0.3;
const CLIP_THRESHOLD: f32 = 0.95;

/// How much cleanup to apply. Each tier includes everything below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Standard,
    High,
    Ultra,
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "high" => Ok(Self::High),
            "ultra" => Ok(Self::Ultra),
            other => Err(format!("unknown enhancement tier: {other}")),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Standard => "standard",
            Self::High => "high",
            Self::Ultra => "ultra",
        })
    }
}

/// Second-order biquad configured as low-pass (RBJ cookbook, Q = 1/sqrt 2).
struct LowPassFilter {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl LowPassFilter {
    fn new(sample_rate: f32, cutoff: f32) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 * FRAC_1_SQRT_2;

        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos_w0) / 2.0 / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: (1.0 - cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process_sample(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

fn low_pass(samples: &mut [f32], sample_rate: u32, cutoff: f32) {
    // A cutoff at or above Nyquist has nothing to remove.
    if cutoff * 2.0 >= sample_rate as f32 {
        return;
    }
    let mut filter = LowPassFilter::new(sample_rate as f32, cutoff);
    for sample in samples.iter_mut() {
        *sample = filter.process_sample(*sample);
    }
}

fn normalize_rms(samples: &mut [f32], target: f32) {
    if samples.is_empty() {
        return;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    let rms = (sum_sq / samples.len() as f32).sqrt();
    if rms > 0.0 {
        let gain = target / rms;
        for sample in samples.iter_mut() {
            *sample *= gain;
        }
    }
}

fn echo_cancel(samples: &mut [f32], sample_rate: u32, delay_secs: f32, decay: f32) {
    let delay = (sample_rate as f32 * delay_secs).round() as usize;
    if delay == 0 || delay >= samples.len() {
        return;
    }
    let original = samples.to_vec();
    for i in delay..samples.len() {
        samples[i] -= decay * original[i - delay];
    }
}

fn soft_limit(samples: &mut [f32], threshold: f32) {
    for sample in samples.iter_mut() {
        *sample = threshold * (*sample / threshold).tanh();
    }
}

/// Apply one tier's stages to a segment in place.
pub fn enhance_segment(segment: &mut AudioSegment, tier: Tier) {
    low_pass(&mut segment.samples, segment.sample_rate, NOISE_CUTOFF_HZ);
    normalize_rms(&mut segment.samples, TARGET_RMS);
    if tier >= Tier::High {
        echo_cancel(
            &mut segment.samples,
            segment.sample_rate,
            ECHO_DELAY_SECS,
            ECHO_DECAY,
        );
    }
    if tier >= Tier::Ultra {
        soft_limit(&mut segment.samples, CLIP_THRESHOLD);
    }
}

#[derive(Debug, Default)]
pub struct EnhanceReport {
    pub enhanced: usize,
    pub failed: usize,
}

/// Enhance every WAV in `input`, writing `enhanced_{name}` files to `output`.
///
/// Files are processed in name order; one unreadable file is logged and
/// skipped without stopping the rest.
pub fn enhance_directory(
    input: &Path,
    output: &Path,
    tier: Tier,
) -> Result<EnhanceReport, std::io::Error> {
    std::fs::create_dir_all(output)?;

    let mut paths: Vec<_> = std::fs::read_dir(input)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut report = EnhanceReport::default();
    for path in paths {
        let mut segment = match AudioSegment::read_wav(&path) {
            Ok(segment) => segment,
            Err(err) => {
                warn!("Failed to read {}: {err}", path.display());
                report.failed += 1;
                continue;
            }
        };
        enhance_segment(&mut segment, tier);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output.wav".to_string());
        let out_path = output.join(format!("enhanced_{name}"));
        match segment.write_wav(&out_path) {
            Ok(()) => report.enhanced += 1,
            Err(err) => {
                warn!("Failed to write {}: {err}", out_path.display());
                report.failed += 1;
            }
        }
    }
    info!(
        "Enhanced {} files ({} failed) at tier {tier}",
        report.enhanced, report.failed
    );
    Ok(report)
}
