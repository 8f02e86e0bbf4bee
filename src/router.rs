//! Language-to-synthesizer routing.
//!
//! A [`SynthesizerRegistry`] maps each language to a constructor for its
//! synthesizer. `build` resolves the requested codes once at startup:
//! unknown codes and failed constructions are logged, recorded as warnings,
//! and skipped, so one bad language never aborts a run. The resulting
//! [`VoiceRouter`] owns the handles for the rest of the run, in
//! construction order.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::language::Language;
use crate::Synthesizer;

type Constructor = Box<dyn Fn() -> Result<Box<dyn Synthesizer>, Box<dyn std::error::Error>>>;

/// Non-fatal problems encountered while building a router.
#[derive(Debug, thiserror::Error)]
pub enum RouteWarning {
    #[error("Unsupported language code: {0}")]
    UnsupportedLanguageCode(String),
    #[error("Failed to load {language} synthesizer: {message}")]
    SynthesizerLoadFailure { language: Language, message: String },
}

/// Startup dispatch table from language to synthesizer constructor.
pub struct SynthesizerRegistry {
    constructors: HashMap<Language, Constructor>,
}

impl SynthesizerRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register the constructor for `language`, replacing any previous one.
    pub fn register<F>(&mut self, language: Language, constructor: F)
    where
        F: Fn() -> Result<Box<dyn Synthesizer>, Box<dyn std::error::Error>> + 'static,
    {
        self.constructors.insert(language, Box::new(constructor));
    }

    /// Registry backed by Melo model directories laid out as
    /// `{models_dir}/{CODE}/` for every declared language.
    #[cfg(feature = "melo")]
    pub fn with_melo_models(models_dir: &std::path::Path) -> Self {
        use crate::engines::melo::MeloEngine;

        let mut registry = Self::new();
        for lang in crate::language::DECLARED_ORDER {
            let dir = models_dir.join(lang.code());
            registry.register(lang, move || {
                let engine = MeloEngine::from_dir(&dir)?;
                Ok(Box::new(engine) as Box<dyn Synthesizer>)
            });
        }
        registry
    }

    /// Construct one handle per requested code.
    ///
    /// Codes are parsed with alias normalization; duplicates keep the first
    /// handle. Every problem becomes a [`RouteWarning`] rather than an
    /// error, and the router keeps whatever did load.
    pub fn build(&self, codes: &[&str]) -> BuildOutcome {
        let mut handles: Vec<(Language, Box<dyn Synthesizer>)> = Vec::new();
        let mut warnings = Vec::new();

        for &code in codes {
            let Some(lang) = Language::from_code(code) else {
                warn!("Unsupported language code: {code}");
                warnings.push(RouteWarning::UnsupportedLanguageCode(code.to_string()));
                continue;
            };
            if handles.iter().any(|(l, _)| *l == lang) {
                debug!("Language {lang} requested more than once, keeping the first handle");
                continue;
            }
            let Some(constructor) = self.constructors.get(&lang) else {
                warn!("No synthesizer registered for {lang}");
                warnings.push(RouteWarning::SynthesizerLoadFailure {
                    language: lang,
                    message: "no constructor registered".to_string(),
                });
                continue;
            };
            info!("Loading {} synthesizer", lang.name());
            match constructor() {
                Ok(handle) => handles.push((lang, handle)),
                Err(err) => {
                    warn!("Failed to load {} synthesizer: {err}", lang.name());
                    warnings.push(RouteWarning::SynthesizerLoadFailure {
                        language: lang,
                        message: err.to_string(),
                    });
                }
            }
        }

        BuildOutcome {
            router: VoiceRouter { handles },
            warnings,
        }
    }
}

impl Default for SynthesizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`SynthesizerRegistry::build`].
pub struct BuildOutcome {
    pub router: VoiceRouter,
    pub warnings: Vec<RouteWarning>,
}

/// The synthesizer handles of one run, in construction order.
pub struct VoiceRouter {
    handles: Vec<(Language, Box<dyn Synthesizer>)>,
}

impl VoiceRouter {
    pub fn languages(&self) -> Vec<Language> {
        self.handles.iter().map(|(lang, _)| *lang).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The first constructed handle, which anchors reference embedding.
    pub fn first_mut(&mut self) -> Option<&mut (dyn Synthesizer + 'static)> {
        self.handles.first_mut().map(|(_, handle)| handle.as_mut())
    }

    pub fn get(&self, lang: Language) -> Option<&dyn Synthesizer> {
        self.handles
            .iter()
            .find(|(l, _)| *l == lang)
            .map(|(_, handle)| handle.as_ref())
    }

    pub fn get_mut(&mut self, lang: Language) -> Option<&mut (dyn Synthesizer + 'static)> {
        self.handles
            .iter_mut()
            .find(|(l, _)| *l == lang)
            .map(|(_, handle)| handle.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &dyn Synthesizer)> {
        self.handles
            .iter()
            .map(|(lang, handle)| (*lang, handle.as_ref()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Language, &mut (dyn Synthesizer + 'static))> {
        self.handles
            .iter_mut()
            .map(|(lang, handle)| (*lang, handle.as_mut()))
    }
}
