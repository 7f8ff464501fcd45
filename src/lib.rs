#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line entry point.
pub mod cli;
/// Run configuration types.
pub mod config;
/// Centralized constants used across extraction, storage, and the pipeline.
pub mod constants;
/// Function splitting with explicit per-property capabilities.
pub mod functions;
mod hash;
/// Label extractors turning parsed files into examples.
pub mod label;
/// End-of-run summary counters.
pub mod metrics;
/// Parser backends and language detection.
pub mod parse;
/// Path context extraction.
pub mod paths;
/// Run orchestration.
pub mod pipeline;
/// Snippet mining without a prepared input directory.
pub mod snippets;
/// Vocabularies, encoding, and corpus output.
pub mod storage;
/// Input discovery (filesystem today).
pub mod transport;
/// Owned syntax trees and the read-only node capability.
pub mod tree;
/// Shared type aliases.
pub mod types;
/// Token and label normalization helpers.
pub mod utils;

mod errors;

pub use config::{ParserConfig, PathRetrievalConfig, PipelineConfig};
pub use errors::MinerError;
pub use functions::{
    Capability, EnclosingElement, EnclosingElementKind, FunctionInfo, FunctionParameter,
    FunctionSplitter, SplitterRegistry,
};
pub use label::{
    FileNameExtractor, FilePathExtractor, FolderExtractor, FunctionFilter, FunctionNameExtractor,
    LabelExtractor, LabelExtractorConfig, LabeledResult, ParseResult,
};
pub use metrics::{LanguageCounts, RunSummary};
pub use parse::{Language, ParserBackend, SourceParser, TreeSitterParser};
pub use paths::{
    Direction, ExtractorConfig, OrientedPath, PairSelection, PathContext, PathExtractor,
};
pub use pipeline::{Pipeline, RunState, corpus_file, mine};
pub use snippets::mine_snippets;
pub use storage::{
    CorpusWriter, EncodedExample, LabeledPathContextIds, LabeledPathContexts,
    PathBasedStorageConfig, PathContextId, PathEncoder, RankedIncrementalIdStorage,
    VocabularyFilter, parse_corpus_line,
};
pub use tree::{Node, SyntaxTree, SyntaxTreeBuilder, TreeNode};
pub use types::{Label, NodeIndex, PathShape, PathString, Token, TypeLabel, VocabId};
