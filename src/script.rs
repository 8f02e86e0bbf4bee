//! Speaker-tagged script parsing.
//!
//! A script is plain text. A line made only of letters or Hangul syllables
//! names the speaker of everything that follows; other non-blank lines are
//! dialogue. Within one turn, line *i* is the sentence for the *i*-th
//! language of [`DECLARED_ORDER`], so a trilingual script repeats each cue
//! as three consecutive lines. Parsing never synthesizes; it only fills
//! per-language sentence buckets that the batch driver consumes.

use std::path::Path;

use log::{debug, warn};

use crate::language::{Language, DECLARED_ORDER};

/// Dialogue lines attributed to one speaker marker.
///
/// Lines appearing before any marker form a turn with no speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Option<String>,
    pub lines: Vec<String>,
}

/// Per-language sentence buckets in global turn order.
#[derive(Debug, Clone)]
pub struct ScriptBuckets {
    entries: Vec<(Language, Vec<String>)>,
    /// Turns present in the script.
    pub turns_seen: usize,
    /// Turns that survived the speaker filter.
    pub turns_kept: usize,
}

impl ScriptBuckets {
    fn new(active: &[Language]) -> Self {
        let mut entries: Vec<(Language, Vec<String>)> = Vec::new();
        for &lang in active {
            if !entries.iter().any(|(l, _)| *l == lang) {
                entries.push((lang, Vec::new()));
            }
        }
        Self {
            entries,
            turns_seen: 0,
            turns_kept: 0,
        }
    }

    fn push(&mut self, lang: Language, sentence: &str) -> bool {
        match self.entries.iter_mut().find(|(l, _)| *l == lang) {
            Some((_, bucket)) => {
                bucket.push(sentence.to_string());
                true
            }
            None => false,
        }
    }

    /// Sentences routed to `lang`, in script order.
    pub fn sentences(&self, lang: Language) -> &[String] {
        self.entries
            .iter()
            .find(|(l, _)| *l == lang)
            .map(|(_, bucket)| bucket.as_slice())
            .unwrap_or(&[])
    }

    /// Active languages in the order they were requested.
    pub fn languages(&self) -> Vec<Language> {
        self.entries.iter().map(|(lang, _)| *lang).collect()
    }

    pub fn total_sentences(&self) -> usize {
        self.entries.iter().map(|(_, bucket)| bucket.len()).sum()
    }

    /// True when no sentence was routed anywhere, whether the script had no
    /// turns at all or the speaker filter discarded every one.
    pub fn is_empty(&self) -> bool {
        self.total_sentences() == 0
    }
}

/// True for a line that names a speaker.
///
/// A marker is non-empty and contains only ASCII letters and Hangul
/// syllables. The test is context-free: a lone all-letter word on its own
/// line always reads as a marker, which is a property of the script format.
pub fn is_speaker_marker(line: &str) -> bool {
    !line.is_empty()
        && line
            .chars()
            .all(|c| c.is_ascii_alphabetic() || ('\u{AC00}'..='\u{D7A3}').contains(&c))
}

/// Split script text into turns.
///
/// Blank lines are skipped. A marker flushes the lines gathered so far as
/// one turn; end of input flushes the last turn. Back-to-back markers leave
/// no empty turn behind.
pub fn parse_turns(text: &str) -> Vec<Turn> {
    let mut turns = Vec::new();
    let mut speaker: Option<String> = None;
    let mut lines: Vec<String> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if is_speaker_marker(line) {
            if !lines.is_empty() {
                turns.push(Turn {
                    speaker: speaker.take(),
                    lines: std::mem::take(&mut lines),
                });
            }
            speaker = Some(line.to_string());
        } else {
            lines.push(line.to_string());
        }
    }
    if !lines.is_empty() {
        turns.push(Turn { speaker, lines });
    }
    turns
}

/// Route turns into per-language buckets.
///
/// Line *i* of each kept turn goes to the *i*-th language of
/// [`DECLARED_ORDER`]; languages outside `active` receive nothing, and a
/// turn shorter than the order simply leaves the later languages without a
/// sentence for that turn. A speaker filter drops whole turns, including
/// the speakerless one before the first marker.
pub fn route_turns(
    turns: &[Turn],
    active: &[Language],
    speaker_filter: Option<&str>,
) -> ScriptBuckets {
    let mut buckets = ScriptBuckets::new(active);
    buckets.turns_seen = turns.len();

    for turn in turns {
        if let Some(filter) = speaker_filter {
            if turn.speaker.as_deref() != Some(filter) {
                debug!(
                    "Skipping turn for {}",
                    turn.speaker.as_deref().unwrap_or("<no speaker>")
                );
                continue;
            }
        }
        buckets.turns_kept += 1;
        for (i, line) in turn.lines.iter().enumerate() {
            match DECLARED_ORDER.get(i) {
                Some(&lang) => {
                    buckets.push(lang, line);
                }
                None => {
                    warn!("Line exceeds the declared language order, dropping: {line:?}");
                }
            }
        }
    }
    buckets
}

/// Parse script text in one step.
pub fn parse_str(text: &str, active: &[Language], speaker_filter: Option<&str>) -> ScriptBuckets {
    route_turns(&parse_turns(text), active, speaker_filter)
}

/// Read and parse a script file.
pub fn parse_script(
    path: &Path,
    active: &[Language],
    speaker_filter: Option<&str>,
) -> Result<ScriptBuckets, std::io::Error> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_str(&text, active, speaker_filter))
}

/// Route a script with no speaker markers by character-class detection.
///
/// Each non-blank line is classified with [`Language::detect`] and lands in
/// that language's bucket when it is active. Here `turns_seen` counts lines
/// and `turns_kept` counts lines that found an active language.
pub fn parse_untagged(text: &str, active: &[Language]) -> ScriptBuckets {
    let mut buckets = ScriptBuckets::new(active);
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        buckets.turns_seen += 1;
        let lang = Language::detect(line);
        if buckets.push(lang, line) {
            buckets.turns_kept += 1;
        } else {
            debug!("No active synthesizer for detected language {lang}, skipping: {line:?}");
        }
    }
    buckets
}
