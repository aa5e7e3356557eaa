//! Session configuration and search-mode resolution.
//!
//! A `SessionConfig` is immutable once a session starts. Exactly one of
//! `kws_path` / `lm_path` selects the decoder search mode; the keyword list
//! wins when both are given, matching the behaviour callers of keyword
//! spotters expect (a keyword list is always a deliberate narrowing).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ListenError, Result};

/// Configuration for one recognition session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct SessionConfig {
    /// Acoustic model directory used by the decoder.
    pub hmm_path: PathBuf,
    /// Keyword list file. When present the decoder runs in keyword-spotting
    /// mode and `lm_path` is ignored.
    pub kws_path: Option<PathBuf>,
    /// Full language model file. Used only when `kws_path` is absent.
    pub lm_path: Option<PathBuf>,
    /// Pronunciation dictionary file.
    pub dict_path: PathBuf,
    /// Sample rate the decoder expects (Hz). Default: 16000.
    pub sample_rate: u32,
    /// Interval between decode requests against accumulated audio (ms).
    /// Default: 100.
    pub decode_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hmm_path: PathBuf::new(),
            kws_path: None,
            lm_path: None,
            dict_path: PathBuf::new(),
            sample_rate: 16_000,
            decode_interval_ms: 100,
        }
    }
}

/// Decoder search mode resolved from the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    /// Recognize only the keywords listed in the given file.
    KeywordSpotting(PathBuf),
    /// Full-vocabulary search against the given language model.
    LanguageModel(PathBuf),
}

impl SessionConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw)
            .map_err(|e| ListenError::Config(format!("{}: {e}", path.as_ref().display())))
    }

    /// Validate the config and resolve the search mode.
    ///
    /// # Errors
    /// Returns `ListenError::Config` when a required path is empty, when
    /// neither a keyword list nor a language model is given, or when the
    /// sample rate / decode interval is zero.
    pub fn resolve_mode(&self) -> Result<SearchMode> {
        if self.hmm_path.as_os_str().is_empty() {
            return Err(ListenError::Config("acoustic model path is empty".into()));
        }
        if self.dict_path.as_os_str().is_empty() {
            return Err(ListenError::Config("dictionary path is empty".into()));
        }
        if self.sample_rate == 0 {
            return Err(ListenError::Config("sample rate must be > 0".into()));
        }
        if self.decode_interval_ms == 0 {
            return Err(ListenError::Config("decode interval must be > 0".into()));
        }

        // Keyword list takes precedence over the language model.
        match (&self.kws_path, &self.lm_path) {
            (Some(kws), _) => Ok(SearchMode::KeywordSpotting(kws.clone())),
            (None, Some(lm)) => Ok(SearchMode::LanguageModel(lm.clone())),
            (None, None) => Err(ListenError::Config(
                "neither a keyword list nor a language model was provided".into(),
            )),
        }
    }
}
