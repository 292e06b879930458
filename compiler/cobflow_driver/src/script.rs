//! Contains the [`Script`] of events the driver translates.

use std::path::{Path, PathBuf};

use cobflow_translate::Event;
use serde::{Deserialize, Serialize};

/// The script couldn't be loaded.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum ScriptError {
    #[error("failed to read `{}`: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("invalid RON script: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("invalid JSON script: {0}")]
    Json(#[from] serde_json::Error),
}

/// The events of one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptUnit {
    /// The name of the unit.
    pub name: String,

    /// The unit this one is nested in.
    #[serde(default)]
    pub nested_in: Option<String>,

    /// The events, in source order.
    pub events: Vec<Event>,
}

/// The compilation units to translate, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Script {
    /// The units.
    pub units: Vec<ScriptUnit>,
}

impl Script {
    /// Parses a RON script. Optional fields may omit `Some(...)`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Ron`] if the text isn't a valid script.
    pub fn from_ron(text: &str) -> Result<Self, ScriptError> {
        Ok(ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(text)?)
    }

    /// Parses a JSON script.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Json`] if the text isn't a valid script.
    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads a script, as JSON if the extension is `json` and as RON
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError`] if the file can't be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ScriptError::Io { path: path.to_owned(), source })?;

        let is_json = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_ron(&text)
        }
    }
}
