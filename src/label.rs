//! Label extractors: turn one parsed file into labeled training examples.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::tokens::{EMPTY_TOKEN, METHOD_NAME_TOKEN, SELF_TOKEN};
use crate::errors::MinerError;
use crate::functions::{FunctionInfo, FunctionSplitter, SplitterRegistry};
use crate::parse::{Language, ParserBackend};
use crate::tree::{Node, SyntaxTree};
use crate::types::{Label, NodeIndex, PathString};
use crate::utils::{normalize_token, sanitize_label, split_to_subtokens};

/// Separator between the subtokens of a function-name label.
const SUBTOKEN_SEPARATOR: &str = "|";

/// Output of a parser backend for one file.
#[derive(Clone, Debug)]
pub struct ParseResult {
    /// Parsed tree; `None` when the file produced no nodes.
    pub tree: Option<SyntaxTree>,
    /// Path of the parsed file.
    pub file_path: PathString,
    /// Language the file was parsed as.
    pub language: Language,
}

/// One training example candidate.
#[derive(Clone, Debug)]
pub struct LabeledResult {
    /// Example root; a standalone tree.
    pub root: SyntaxTree,
    /// Whitespace-free label.
    pub label: Label,
    /// Source file path.
    pub file_path: PathString,
}

/// Produces labeled examples from a parsed file.
pub trait LabelExtractor: Send + Sync {
    /// Zero or more examples for `parsed`.
    ///
    /// `UnsupportedCapability` errors fail only this file.
    fn extract(&self, parsed: ParseResult) -> Result<Vec<LabeledResult>, MinerError>;
}

/// Whole file as one example, labeled with its path.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilePathExtractor;

impl LabelExtractor for FilePathExtractor {
    fn extract(&self, parsed: ParseResult) -> Result<Vec<LabeledResult>, MinerError> {
        let Some(tree) = parsed.tree else {
            return Ok(Vec::new());
        };
        Ok(vec![LabeledResult {
            root: tree,
            label: sanitize_label(&parsed.file_path),
            file_path: parsed.file_path,
        }])
    }
}

/// Whole file as one example, labeled with its file name alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileNameExtractor;

impl LabelExtractor for FileNameExtractor {
    fn extract(&self, parsed: ParseResult) -> Result<Vec<LabeledResult>, MinerError> {
        let Some(tree) = parsed.tree else {
            return Ok(Vec::new());
        };
        let name = Path::new(&parsed.file_path)
            .file_name()
            .map(|name| sanitize_label(name.to_string_lossy()))
            .filter(|name| !name.is_empty());
        let Some(label) = name else {
            debug!(path = %parsed.file_path, "file path has no file name to label with");
            return Ok(Vec::new());
        };
        Ok(vec![LabeledResult {
            root: tree,
            label,
            file_path: parsed.file_path,
        }])
    }
}

/// Whole file as one example, labeled with its parent directory name.
#[derive(Clone, Copy, Debug, Default)]
pub struct FolderExtractor;

impl LabelExtractor for FolderExtractor {
    fn extract(&self, parsed: ParseResult) -> Result<Vec<LabeledResult>, MinerError> {
        let Some(tree) = parsed.tree else {
            return Ok(Vec::new());
        };
        let folder = Path::new(&parsed.file_path)
            .parent()
            .and_then(Path::file_name)
            .map(|name| sanitize_label(name.to_string_lossy()))
            .filter(|name| !name.is_empty());
        let Some(label) = folder else {
            debug!(path = %parsed.file_path, "file has no parent folder to label with");
            return Ok(Vec::new());
        };
        Ok(vec![LabeledResult {
            root: tree,
            label,
            file_path: parsed.file_path,
        }])
    }
}

/// Predicate deciding whether a function becomes an example.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FunctionFilter {
    /// Drop constructors.
    ExcludeConstructors,
    /// Drop functions carrying any of these modifiers.
    ExcludeModifiers {
        /// Modifier keywords, e.g. `private`.
        modifiers: Vec<String>,
    },
    /// Drop functions carrying any of these annotations or decorators.
    ExcludeAnnotations {
        /// Annotation names without `@`.
        annotations: Vec<String>,
    },
    /// Drop functions whose name splits into more subtokens than this.
    MaxNameWords {
        /// Max subtokens.
        max_words: usize,
    },
    /// Drop functions whose subtree has more nodes than this.
    MaxTreeSize {
        /// Max nodes.
        max_nodes: usize,
    },
    /// Drop functions without a body or with an empty one.
    ExcludeBlank,
}

impl FunctionFilter {
    /// True when `function` passes. Fails if the needed property is unsupported.
    pub fn accepts(&self, function: &FunctionInfo, tree: &SyntaxTree) -> Result<bool, MinerError> {
        let language = function.language();
        Ok(match self {
            Self::ExcludeConstructors => !function
                .is_constructor()
                .ok_or_unsupported("is_constructor", language)?,
            Self::ExcludeModifiers { modifiers } => !function
                .modifiers()
                .ok_or_unsupported("modifiers", language)?
                .iter()
                .any(|modifier| modifiers.contains(modifier)),
            Self::ExcludeAnnotations { annotations } => !function
                .annotations()
                .ok_or_unsupported("annotations", language)?
                .iter()
                .any(|annotation| annotations.contains(annotation)),
            Self::MaxNameWords { max_words } => function
                .name()
                .ok_or_unsupported("name", language)?
                .is_none_or(|name| split_to_subtokens(name).len() <= *max_words),
            Self::MaxTreeSize { max_nodes } => {
                tree.node(function.root()).subtree_size() <= *max_nodes
            }
            Self::ExcludeBlank => !function
                .is_blank(tree)
                .ok_or_unsupported("body", language)?,
        })
    }
}

/// One example per named function, labeled with the function name.
///
/// In the example tree the name node reads `METHOD_NAME` and every other leaf
/// spelling the name reads `SELF`. Anonymous functions are skipped.
#[derive(Clone)]
pub struct FunctionNameExtractor {
    splitters: FxHashMap<Language, Arc<dyn FunctionSplitter>>,
    filters: Vec<FunctionFilter>,
}

impl FunctionNameExtractor {
    /// Resolve a splitter for every language up front.
    pub fn new(
        registry: &SplitterRegistry,
        backend: ParserBackend,
        languages: &[Language],
        filters: Vec<FunctionFilter>,
    ) -> Result<Self, MinerError> {
        let mut splitters = FxHashMap::default();
        for language in languages {
            splitters.insert(*language, registry.resolve(*language, backend)?);
        }
        Ok(Self { splitters, filters })
    }

    /// Active filters.
    pub fn filters(&self) -> &[FunctionFilter] {
        &self.filters
    }

    fn label_for(function: &FunctionInfo, tree: &SyntaxTree, name: &str) -> LabeledResult {
        let root = function.root();
        let mut example = tree.subtree(root);
        let normalized_name = normalize_token(name, EMPTY_TOKEN);
        let order: Vec<NodeIndex> = tree
            .node(root)
            .pre_order()
            .into_iter()
            .map(|node| node.index())
            .collect();
        let renamed: Vec<NodeIndex> = example
            .root()
            .pre_order()
            .into_iter()
            .filter(|node| node.is_leaf() && node.normalized_token() == normalized_name)
            .map(|node| node.index())
            .collect();
        for idx in renamed {
            example.set_technical_token(idx, SELF_TOKEN);
        }
        // Subtree copies keep pre-order numbering, so the name node's new
        // index is its position in the original pre-order walk.
        let name_idx = function
            .name_node()
            .supported()
            .flatten()
            .and_then(|old| order.iter().position(|idx| *idx == old));
        if let Some(idx) = name_idx {
            example.set_technical_token(idx, METHOD_NAME_TOKEN);
        }
        let subtokens = split_to_subtokens(name);
        let label = if subtokens.is_empty() {
            sanitize_label(name)
        } else {
            subtokens.join(SUBTOKEN_SEPARATOR)
        };
        LabeledResult {
            root: example,
            label,
            file_path: function.file_path().to_string(),
        }
    }
}

impl LabelExtractor for FunctionNameExtractor {
    fn extract(&self, parsed: ParseResult) -> Result<Vec<LabeledResult>, MinerError> {
        let Some(tree) = parsed.tree.as_ref() else {
            return Ok(Vec::new());
        };
        let splitter = self.splitters.get(&parsed.language).ok_or_else(|| {
            MinerError::UnsupportedConfiguration(format!(
                "no function splitter resolved for {}",
                parsed.language
            ))
        })?;
        let mut results = Vec::new();
        for function in splitter.split_into_functions(tree, &parsed.file_path) {
            let Some(name) = function
                .name()
                .ok_or_unsupported("name", parsed.language)?
            else {
                continue;
            };
            let mut keep = true;
            for filter in &self.filters {
                if !filter.accepts(&function, tree)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                results.push(Self::label_for(&function, tree, name));
            }
        }
        debug!(
            path = %parsed.file_path,
            functions = results.len(),
            "function examples labeled"
        );
        Ok(results)
    }
}

/// Label strategy selected in configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LabelExtractorConfig {
    /// `FilePathExtractor`.
    #[default]
    FilePath,
    /// `FileNameExtractor`.
    FileName,
    /// `FolderExtractor`.
    Folder,
    /// `FunctionNameExtractor` with optional filters.
    FunctionName {
        /// Filters applied in order; the first rejection wins.
        #[serde(default)]
        filters: Vec<FunctionFilter>,
    },
}

impl LabelExtractorConfig {
    /// Build the extractor, resolving splitters for function-level strategies.
    pub fn build(
        &self,
        registry: &SplitterRegistry,
        backend: ParserBackend,
        languages: &[Language],
    ) -> Result<Arc<dyn LabelExtractor>, MinerError> {
        Ok(match self {
            Self::FilePath => Arc::new(FilePathExtractor),
            Self::FileName => Arc::new(FileNameExtractor),
            Self::Folder => Arc::new(FolderExtractor),
            Self::FunctionName { filters } => Arc::new(FunctionNameExtractor::new(
                registry,
                backend,
                languages,
                filters.clone(),
            )?),
        })
    }
}
