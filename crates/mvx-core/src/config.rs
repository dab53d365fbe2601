//! Session configuration loaded from TOML
//!
//! ```toml
//! [undo]
//! enabled = true
//! limit = 100
//!
//! [projection]
//! strategy = "property_table"
//! ```
//!
//! Every section and field is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{MvxError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default)]
    pub undo: UndoSection,
    #[serde(default)]
    pub projection: ProjectionSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UndoSection {
    #[serde(default)]
    pub enabled: bool,
    /// Maximum history length; 0 keeps everything
    #[serde(default)]
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectionSection {
    #[serde(default)]
    pub strategy: StrategyKind,
}

/// Which projection the host builds by default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Mirror,
    PropertyTable,
    Children,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Mirror => "mirror",
            StrategyKind::PropertyTable => "property_table",
            StrategyKind::Children => "children",
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = MvxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mirror" => Ok(StrategyKind::Mirror),
            "property_table" => Ok(StrategyKind::PropertyTable),
            "children" => Ok(StrategyKind::Children),
            other => Err(MvxError::Config {
                message: format!("unknown projection strategy '{}'", other),
            }),
        }
    }
}

impl SessionConfig {
    /// # Errors
    ///
    /// Returns `Config` if the text is not valid TOML for this schema.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MvxError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text).map_err(|e| MvxError::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
        })
    }
}
