//! Session configuration, loadable from JSON.

use crate::error::{Error, Result};
use crate::prefix::PrefixMap;
use crate::vocab::Vocabulary;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Designated IRIs for the hierarchy, subtypes and virtual graphs.
    pub vocabulary: Vocabulary,
    /// Initial prefix table.
    pub prefixes: PrefixMap,
    /// Answer locally when the external engine errors.
    pub fallback_on_engine_error: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            prefixes: PrefixMap::default(),
            fallback_on_engine_error: true,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded session config");
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        let v = &self.vocabulary;
        if v.virtual_suffix.is_empty() {
            return Err(Error::Config(
                "vocabulary.virtual_suffix must not be empty".into(),
            ));
        }
        if v.parent_predicate.is_empty() || v.root.is_empty() || v.schema_type.is_empty() {
            return Err(Error::Config(
                "vocabulary.parent_predicate, root and schema_type are required".into(),
            ));
        }
        Ok(())
    }
}
