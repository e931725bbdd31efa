use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Source language of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    /// Executed by the embedded JavaScript engine
    #[default]
    #[serde(rename = "javascript")]
    JavaScript,

    /// Python-like dialect, executed by the line interpreter on the run path
    #[serde(rename = "python", alias = "python-like")]
    Python,
}

impl Language {
    /// All supported languages
    pub const ALL: [Language; 2] = [Language::JavaScript, Language::Python];

    /// Identifier used in requests and configuration
    pub fn id(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::Python => "Python (subset)",
        }
    }

    /// Whether submissions in this language can be graded
    pub fn is_gradable(&self) -> bool {
        matches!(self, Language::JavaScript)
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::JavaScript),
            "python" | "python-like" | "py" => Ok(Language::Python),
            _ => Err(ConfigError::UnknownLanguage(s.to_string())),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}
