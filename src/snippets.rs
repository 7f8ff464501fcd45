//! Mine in-memory code snippets through a throwaway pipeline run.

use std::fs;
use std::io::ErrorKind;

use tempfile::tempdir;
use tracing::debug;

use crate::config::{ParserConfig, PipelineConfig};
use crate::constants::snippets::{
    LABEL_FILE_NAME, LABEL_FUNCTION_NAME, SNIPPET_FILE_STEM, SNIPPET_MAX_PATH_CONTEXTS,
    SNIPPET_MAX_TOKENS,
};
use crate::errors::MinerError;
use crate::label::LabelExtractorConfig;
use crate::parse::Language;
use crate::pipeline::{Pipeline, corpus_file};
use crate::storage::PathBasedStorageConfig;

/// Resolve a label strategy name (`file name` or `function name`).
pub fn label_strategy(name: &str) -> Result<LabelExtractorConfig, MinerError> {
    match name {
        LABEL_FILE_NAME => Ok(LabelExtractorConfig::FileName),
        LABEL_FUNCTION_NAME => Ok(LabelExtractorConfig::FunctionName {
            filters: Vec::new(),
        }),
        other => Err(MinerError::UnsupportedConfiguration(format!(
            "unknown label strategy '{other}'"
        ))),
    }
}

/// Mine `contents` as files of `language` and return the produced corpus text.
///
/// Each snippet becomes `input<idx>.<ext>` in a temporary directory. The run
/// uses one worker, at most 8 contexts per example and a 2-token vocabulary
/// cap. An empty string means every example was filtered out.
pub fn mine_snippets<S: AsRef<str>>(
    contents: &[S],
    language: &str,
    label_strategy_name: &str,
) -> Result<String, MinerError> {
    let language: Language = language.parse()?;
    let label_extractor = label_strategy(label_strategy_name)?;
    let workspace = tempdir()?;
    let input_dir = workspace.path().join("input");
    let output_dir = workspace.path().join("output");
    fs::create_dir_all(&input_dir)?;
    for (idx, content) in contents.iter().enumerate() {
        let file = input_dir.join(format!(
            "{SNIPPET_FILE_STEM}{idx}.{}",
            language.extension()
        ));
        fs::write(&file, content.as_ref())?;
    }
    let config = PipelineConfig {
        input_dir,
        output_dir: output_dir.clone(),
        parser: ParserConfig {
            languages: vec![language],
            ..ParserConfig::default()
        },
        label_extractor,
        storage: PathBasedStorageConfig::new(
            SNIPPET_MAX_PATH_CONTEXTS,
            Some(SNIPPET_MAX_TOKENS),
            None,
        ),
        num_threads: 1,
        ..PipelineConfig::default()
    };
    let summary = Pipeline::new(config)?.run()?;
    debug!(
        snippets = contents.len(),
        lines = summary.lines_written,
        "snippets mined"
    );
    match fs::read_to_string(corpus_file(&output_dir, language)) {
        Ok(corpus) => Ok(corpus),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(MinerError::storage(corpus_file(&output_dir, language), err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::parse_corpus_line;

    #[test]
    fn function_name_strategy_labels_each_function() {
        let corpus = mine_snippets(
            &["def alpha(x):\n    return x\n", "def beta(x):\n    return x\n"],
            "py",
            LABEL_FUNCTION_NAME,
        )
        .unwrap();
        let labels: Vec<String> = corpus
            .lines()
            .map(|line| parse_corpus_line(line).unwrap().label)
            .collect();
        assert_eq!(labels, vec!["alpha", "beta"]);
        for line in corpus.lines() {
            let parsed = parse_corpus_line(line).unwrap();
            assert!(parsed.path_contexts.len() <= SNIPPET_MAX_PATH_CONTEXTS);
        }
    }

    #[test]
    fn file_name_strategy_labels_are_stable_across_calls() {
        let first = mine_snippets(&["x = 1\ny = x\n"], "python", LABEL_FILE_NAME).unwrap();
        let second = mine_snippets(&["x = 1\ny = x\n"], "python", LABEL_FILE_NAME).unwrap();
        let line = first.lines().next().expect("one line");
        assert_eq!(parse_corpus_line(line).unwrap().label, "input0.py");
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_strategies_and_languages_fail_fast() {
        assert!(matches!(
            mine_snippets(&["x"], "py", "method name"),
            Err(MinerError::UnsupportedConfiguration(_))
        ));
        assert!(matches!(
            mine_snippets(&["x"], "rust", LABEL_FILE_NAME),
            Err(MinerError::UnsupportedConfiguration(_))
        ));
    }
}
