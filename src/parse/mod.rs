//! Parser backends that turn source files into `SyntaxTree`s.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MinerError;
use crate::label::ParseResult;

mod treesitter;

pub use treesitter::TreeSitterParser;

/// Source languages the miner can parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// `.java`
    Java,
    /// `.js`, `.mjs`, `.cjs`
    #[serde(rename = "js", alias = "javascript")]
    JavaScript,
    /// `.py`
    #[serde(rename = "py", alias = "python")]
    Python,
    /// `.php`
    Php,
}

impl Language {
    /// Every supported language.
    pub const ALL: [Language; 4] = [
        Language::Java,
        Language::JavaScript,
        Language::Python,
        Language::Php,
    ];

    /// Detect the language from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "java" => Some(Self::Java),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "py" => Some(Self::Python),
            "php" => Some(Self::Php),
            _ => None,
        }
    }

    /// Detect the language of `path` from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension used when materializing inputs.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::JavaScript => "js",
            Self::Python => "py",
            Self::Php => "php",
        }
    }

    /// Output directory name for this language's corpus.
    pub fn name(&self) -> &'static str {
        self.extension()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = MinerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "java" => Ok(Self::Java),
            "js" | "javascript" => Ok(Self::JavaScript),
            "py" | "python" => Ok(Self::Python),
            "php" => Ok(Self::Php),
            other => Err(MinerError::UnsupportedConfiguration(format!(
                "unknown language '{other}'"
            ))),
        }
    }
}

/// Parser implementations that can produce trees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserBackend {
    /// Incremental tree-sitter grammars.
    #[default]
    TreeSitter,
}

impl fmt::Display for ParserBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TreeSitter => f.write_str("tree-sitter"),
        }
    }
}

/// Turns source text into a `ParseResult`.
pub trait SourceParser: Send + Sync {
    /// Language this parser accepts.
    fn language(&self) -> Language;

    /// Parse in-memory source text attributed to `path`.
    fn parse_source(&self, source: &str, path: &Path) -> Result<ParseResult, MinerError>;

    /// Read and parse `path`.
    fn parse_file(&self, path: &Path) -> Result<ParseResult, MinerError> {
        let source = std::fs::read_to_string(path).map_err(|err| MinerError::ParseFailure {
            path: path.to_path_buf(),
            reason: format!("unreadable source: {err}"),
        })?;
        self.parse_source(&source, path)
    }
}

/// Build the parser for `(language, backend)`.
pub fn parser_for(
    language: Language,
    backend: ParserBackend,
    reject_syntax_errors: bool,
) -> Box<dyn SourceParser> {
    match backend {
        ParserBackend::TreeSitter => Box::new(
            TreeSitterParser::new(language).with_reject_syntax_errors(reject_syntax_errors),
        ),
    }
}
