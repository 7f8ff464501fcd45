use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::MinerError;
use crate::functions::SplitterRegistry;
use crate::label::LabelExtractorConfig;
use crate::parse::{Language, ParserBackend};
use crate::paths::{ExtractorConfig, PairSelection};
use crate::storage::PathBasedStorageConfig;

/// Parser backend and the languages mined in one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Backend producing syntax trees.
    pub backend: ParserBackend,
    /// Languages to mine; files of other languages are ignored.
    pub languages: Vec<Language>,
    /// Treat trees containing syntax errors as parse failures.
    pub reject_syntax_errors: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            backend: ParserBackend::TreeSitter,
            languages: Language::ALL.to_vec(),
            reject_syntax_errors: false,
        }
    }
}

/// Path shape bounds and pair selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathRetrievalConfig {
    /// Max edges per path; `None` is unbounded.
    pub max_path_length: Option<usize>,
    /// Max sibling distance below the apex; `None` is unbounded.
    pub max_path_width: Option<usize>,
    /// How pairs are chosen when the per-example cap applies.
    pub selection: PairSelection,
}

/// Top-level run configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory scanned for source files.
    pub input_dir: PathBuf,
    /// Root directory receiving corpus and dictionary files.
    pub output_dir: PathBuf,
    /// Parser and language selection.
    pub parser: ParserConfig,
    /// Label strategy.
    pub label_extractor: LabelExtractorConfig,
    /// Path bounds.
    pub path_retrieval: PathRetrievalConfig,
    /// Per-example and vocabulary caps.
    pub storage: PathBasedStorageConfig,
    /// Worker threads for parsing, labeling and extraction.
    pub num_threads: usize,
    /// Follow symlinks while scanning `input_dir`.
    pub follow_links: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("out"),
            parser: ParserConfig::default(),
            label_extractor: LabelExtractorConfig::default(),
            path_retrieval: PathRetrievalConfig::default(),
            storage: PathBasedStorageConfig::default(),
            num_threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            follow_links: false,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, MinerError> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|err| {
            MinerError::Configuration(format!("invalid config '{}': {err}", path.display()))
        })
    }

    /// Extractor bounds derived from the storage cap and path settings.
    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            max_path_contexts: self.storage.max_path_contexts,
            max_path_length: self.path_retrieval.max_path_length,
            max_path_width: self.path_retrieval.max_path_width,
            selection: self.path_retrieval.selection,
        }
    }

    /// Check numeric settings and that every language/label pairing resolves.
    pub fn validate(&self, registry: &SplitterRegistry) -> Result<(), MinerError> {
        if self.num_threads == 0 {
            return Err(MinerError::Configuration(
                "num_threads must be at least 1".into(),
            ));
        }
        if self.parser.languages.is_empty() {
            return Err(MinerError::UnsupportedConfiguration(
                "no languages selected".into(),
            ));
        }
        self.storage.validate()?;
        self.extractor_config().validate()?;
        self.label_extractor
            .build(registry, self.parser.backend, &self.parser.languages)
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::VocabularyFilter;
    use tempfile::tempdir;

    #[test]
    fn json_overrides_layer_over_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("miner.json");
        fs::write(
            &path,
            r#"{
                "input_dir": "src",
                "parser": {"languages": ["java", "py"]},
                "label_extractor": {"kind": "function_name"},
                "path_retrieval": {"max_path_length": 8, "selection": {"kind": "sampled", "seed": 7}},
                "storage": {"max_tokens": 1000, "vocabulary_filter": "exact"},
                "num_threads": 2
            }"#,
        )
        .unwrap();
        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("src"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(
            config.parser.languages,
            vec![Language::Java, Language::Python]
        );
        assert_eq!(config.storage.max_tokens, Some(1000));
        assert_eq!(config.storage.vocabulary_filter, VocabularyFilter::Exact);
        let extractor = config.extractor_config();
        assert_eq!(extractor.max_path_length, Some(8));
        assert_eq!(extractor.selection, PairSelection::Sampled { seed: 7 });
        assert_eq!(extractor.max_path_contexts, config.storage.max_path_contexts);
        config.validate(&SplitterRegistry::with_defaults()).unwrap();
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(MinerError::Configuration(_))
        ));
    }

    #[test]
    fn validation_rejects_zero_threads_and_caps() {
        let registry = SplitterRegistry::with_defaults();
        let zero_threads = PipelineConfig {
            num_threads: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            zero_threads.validate(&registry),
            Err(MinerError::Configuration(_))
        ));
        let mut zero_cap = PipelineConfig::default();
        zero_cap.storage.max_paths = Some(0);
        assert!(matches!(
            zero_cap.validate(&registry),
            Err(MinerError::Configuration(_))
        ));
    }

    #[test]
    fn unregistered_function_splitters_fail_fast() {
        let config = PipelineConfig {
            label_extractor: LabelExtractorConfig::FunctionName {
                filters: Vec::new(),
            },
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(&SplitterRegistry::new()),
            Err(MinerError::UnsupportedConfiguration(_))
        ));
        config.validate(&SplitterRegistry::with_defaults()).unwrap();
    }
}
