use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::VocabId;

/// Error type for parsing, configuration, capability, and storage failures.
#[derive(Debug, Error)]
pub enum MinerError {
    /// A single input file could not be parsed; the run skips it.
    #[error("failed to parse '{}': {reason}", path.display())]
    ParseFailure { path: PathBuf, reason: String },
    /// Unknown language/parser/label combination, detected before any file is read.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
    /// A function property is not implemented for this language/parser pairing.
    #[error("property '{property}' is not supported for {language}")]
    UnsupportedCapability {
        property: &'static str,
        language: String,
    },
    /// Output or dictionary storage could not be written; aborts the run.
    #[error("storage failure at '{}': {source}", path.display())]
    StorageIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Rank was requested for an id that was never issued.
    #[error("no key was ever recorded with id {id}")]
    InvalidKey { id: VocabId },
    /// Invalid numeric or structural setting.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A corpus line could not be decoded.
    #[error("malformed corpus line: {0}")]
    CorpusFormat(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl MinerError {
    /// Wrap an I/O error raised while writing corpus or dictionary output.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StorageIo {
            path: path.into(),
            source,
        }
    }

    /// True for failures that stay local to one input file.
    ///
    /// Everything else (storage, invalid keys, configuration) aborts the run.
    pub fn is_file_local(&self) -> bool {
        matches!(
            self,
            Self::ParseFailure { .. } | Self::UnsupportedCapability { .. }
        )
    }
}
