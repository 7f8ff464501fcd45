//! Vocabulary tables, path-context encoding, and corpus/dictionary output.
//!
//! Ownership model:
//! - `RankedIncrementalIdStorage` is a plain single-owner table; it is never
//!   shared between threads directly.
//! - `PathEncoder` owns the token and path-shape tables and turns labeled
//!   path contexts into corpus lines.
//! - `CorpusWriter` owns every output stream and writes whole lines only.

use serde::{Deserialize, Serialize};

use crate::constants::paths::DEFAULT_MAX_PATH_CONTEXTS;
use crate::constants::storage::TRIPLE_SEPARATOR;
use crate::errors::MinerError;
use crate::paths::PathContext;
use crate::types::{Label, VocabId};

mod encoder;
mod ranked;
mod writer;

pub use encoder::{EncodedExample, PathEncoder};
pub use ranked::{RankedEntry, RankedIncrementalIdStorage};
pub use writer::CorpusWriter;

/// When vocabulary caps are evaluated against ranks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyFilter {
    /// Filter each example with the ranks accumulated so far.
    #[default]
    Streaming,
    /// Record the whole corpus first, then filter every example with final ranks.
    Exact,
}

/// Per-example and vocabulary caps applied while encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathBasedStorageConfig {
    /// Max path contexts kept per example.
    pub max_path_contexts: usize,
    /// Keep only contexts whose tokens rank within this many; `None` keeps all.
    pub max_tokens: Option<usize>,
    /// Keep only contexts whose path shape ranks within this many; `None` keeps all.
    pub max_paths: Option<usize>,
    /// Streaming or exact rank evaluation.
    pub vocabulary_filter: VocabularyFilter,
}

impl Default for PathBasedStorageConfig {
    fn default() -> Self {
        Self {
            max_path_contexts: DEFAULT_MAX_PATH_CONTEXTS,
            max_tokens: None,
            max_paths: None,
            vocabulary_filter: VocabularyFilter::Streaming,
        }
    }
}

impl PathBasedStorageConfig {
    /// Caps configured as `(max_path_contexts, max_tokens, max_paths)`.
    pub fn new(max_path_contexts: usize, max_tokens: Option<usize>, max_paths: Option<usize>) -> Self {
        Self {
            max_path_contexts,
            max_tokens,
            max_paths,
            ..Self::default()
        }
    }

    /// Reject zero caps.
    pub fn validate(&self) -> Result<(), MinerError> {
        if self.max_path_contexts == 0 {
            return Err(MinerError::Configuration(
                "max_path_contexts must be at least 1".into(),
            ));
        }
        if self.max_tokens == Some(0) || self.max_paths == Some(0) {
            return Err(MinerError::Configuration(
                "max_tokens and max_paths must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

/// Integer-encoded path context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PathContextId {
    /// Token table id of the start token.
    pub start_token_id: VocabId,
    /// Path table id of the oriented-path shape.
    pub path_id: VocabId,
    /// Token table id of the end token.
    pub end_token_id: VocabId,
}

impl std::fmt::Display for PathContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.start_token_id,
            self.path_id,
            self.end_token_id,
            sep = TRIPLE_SEPARATOR
        )
    }
}

/// One example's label and path contexts before id assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabeledPathContexts {
    /// Example label.
    pub label: Label,
    /// Extracted path contexts.
    pub path_contexts: Vec<PathContext>,
}

/// One example's label and path contexts after id assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabeledPathContextIds {
    /// Example label.
    pub label: Label,
    /// Encoded path contexts in extraction order.
    pub path_contexts: Vec<PathContextId>,
}

impl LabeledPathContextIds {
    /// Render `"<label> <s>,<p>,<e> ..."` without a trailing newline.
    pub fn to_corpus_line(&self) -> String {
        let mut line = self.label.clone();
        for context in &self.path_contexts {
            line.push(' ');
            line.push_str(&context.to_string());
        }
        line
    }
}

/// Parse a corpus line back into its label and id triples.
pub fn parse_corpus_line(line: &str) -> Result<LabeledPathContextIds, MinerError> {
    let mut fields = line.trim_end_matches(['\n', '\r']).split(' ');
    let label = fields
        .next()
        .filter(|label| !label.is_empty())
        .ok_or_else(|| MinerError::CorpusFormat("corpus line has no label".into()))?;
    let path_contexts = fields
        .map(parse_triple)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LabeledPathContextIds {
        label: label.to_string(),
        path_contexts,
    })
}

fn parse_triple(field: &str) -> Result<PathContextId, MinerError> {
    let parts: Vec<&str> = field.split(TRIPLE_SEPARATOR).collect();
    let parse = |raw: &str| {
        raw.parse::<VocabId>().map_err(|err| {
            MinerError::CorpusFormat(format!("bad path context '{field}': {err}"))
        })
    };
    match parts.as_slice() {
        [start, path, end] => Ok(PathContextId {
            start_token_id: parse(*start)?,
            path_id: parse(*path)?,
            end_token_id: parse(*end)?,
        }),
        _ => Err(MinerError::CorpusFormat(format!(
            "bad path context '{field}': expected three comma-separated ids"
        ))),
    }
}
