use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum, error::ErrorKind};

use crate::config::PipelineConfig;
use crate::errors::MinerError;
use crate::label::LabelExtractorConfig;
use crate::parse::Language;
use crate::pipeline::Pipeline;
use crate::storage::VocabularyFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LanguageArg {
    Java,
    Js,
    Py,
    Php,
}

impl From<LanguageArg> for Language {
    fn from(value: LanguageArg) -> Self {
        match value {
            LanguageArg::Java => Language::Java,
            LanguageArg::Js => Language::JavaScript,
            LanguageArg::Py => Language::Python,
            LanguageArg::Php => Language::Php,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LabelArg {
    FilePath,
    FileName,
    Folder,
    FunctionName,
}

impl From<LabelArg> for LabelExtractorConfig {
    fn from(value: LabelArg) -> Self {
        match value {
            LabelArg::FilePath => LabelExtractorConfig::FilePath,
            LabelArg::FileName => LabelExtractorConfig::FileName,
            LabelArg::Folder => LabelExtractorConfig::Folder,
            LabelArg::FunctionName => LabelExtractorConfig::FunctionName {
                filters: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "pathminer",
    disable_help_subcommand = true,
    about = "Mine labeled path contexts from source trees",
    long_about = "Parse every supported source file under an input directory, extract bounded AST path contexts per labeled example, and write an integer-encoded corpus plus token and path dictionaries.",
    after_help = "Flags override values loaded with --config; unset flags keep the file's values or the defaults."
)]
struct MinerCli {
    #[arg(long, value_name = "DIR", help = "Directory scanned for source files")]
    input: Option<PathBuf>,
    #[arg(long, value_name = "DIR", help = "Directory receiving corpus and dictionaries")]
    output: Option<PathBuf>,
    #[arg(
        long = "language",
        value_enum,
        help = "Language to mine; repeat for several (default: all)"
    )]
    languages: Vec<LanguageArg>,
    #[arg(long, value_enum, help = "Label strategy")]
    labels: Option<LabelArg>,
    #[arg(long, help = "Max path contexts per example")]
    max_path_contexts: Option<usize>,
    #[arg(long, help = "Keep only contexts whose tokens rank within N")]
    max_tokens: Option<usize>,
    #[arg(long, help = "Keep only contexts whose path shape ranks within N")]
    max_paths: Option<usize>,
    #[arg(long, help = "Max edges per path")]
    max_path_length: Option<usize>,
    #[arg(long, help = "Max sibling distance below the path apex")]
    max_path_width: Option<usize>,
    #[arg(long, help = "Worker threads")]
    threads: Option<usize>,
    #[arg(
        long,
        help = "Filter with final vocabulary ranks (two passes) instead of running ranks"
    )]
    exact_vocabulary: bool,
    #[arg(long, value_name = "FILE", help = "JSON configuration file")]
    config: Option<PathBuf>,
}

impl MinerCli {
    fn into_config(self) -> Result<PipelineConfig, MinerError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(input) = self.input {
            config.input_dir = input;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if !self.languages.is_empty() {
            config.parser.languages = self.languages.into_iter().map(Language::from).collect();
        }
        if let Some(labels) = self.labels {
            config.label_extractor = labels.into();
        }
        if let Some(max) = self.max_path_contexts {
            config.storage.max_path_contexts = max;
        }
        if self.max_tokens.is_some() {
            config.storage.max_tokens = self.max_tokens;
        }
        if self.max_paths.is_some() {
            config.storage.max_paths = self.max_paths;
        }
        if self.max_path_length.is_some() {
            config.path_retrieval.max_path_length = self.max_path_length;
        }
        if self.max_path_width.is_some() {
            config.path_retrieval.max_path_width = self.max_path_width;
        }
        if let Some(threads) = self.threads {
            config.num_threads = threads;
        }
        if self.exact_vocabulary {
            config.storage.vocabulary_filter = VocabularyFilter::Exact;
        }
        Ok(config)
    }
}

/// Parse `args_iter` (without the program name), run one pipeline and print
/// its summary.
pub fn run_cli<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) =
        parse_cli::<MinerCli, _>(std::iter::once("pathminer".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };
    let config = cli.into_config()?;
    let mut pipeline = Pipeline::new(config)?;
    let summary = pipeline.run()?;
    println!("=== pathminer run ===");
    println!("{summary}");
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> MinerCli {
        parse_cli::<MinerCli, _>(std::iter::once("pathminer").chain(args.iter().copied()))
            .unwrap()
            .expect("parsed")
    }

    #[test]
    fn flags_map_onto_config() {
        let config = parse(&[
            "--input",
            "src",
            "--output",
            "corpus",
            "--language",
            "java",
            "--language",
            "py",
            "--labels",
            "function-name",
            "--max-tokens",
            "1000",
            "--max-path-length",
            "9",
            "--threads",
            "3",
            "--exact-vocabulary",
        ])
        .into_config()
        .unwrap();
        assert_eq!(config.input_dir, PathBuf::from("src"));
        assert_eq!(config.output_dir, PathBuf::from("corpus"));
        assert_eq!(
            config.parser.languages,
            vec![Language::Java, Language::Python]
        );
        assert!(matches!(
            config.label_extractor,
            LabelExtractorConfig::FunctionName { .. }
        ));
        assert_eq!(config.storage.max_tokens, Some(1000));
        assert_eq!(config.storage.max_paths, None);
        assert_eq!(config.path_retrieval.max_path_length, Some(9));
        assert_eq!(config.num_threads, 3);
        assert_eq!(config.storage.vocabulary_filter, VocabularyFilter::Exact);
    }

    #[test]
    fn flags_override_config_file_values() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("miner.json");
        fs::write(&path, r#"{"num_threads": 7, "storage": {"max_paths": 40}}"#).unwrap();
        let config = parse(&["--config", path.to_str().unwrap(), "--threads", "2"])
            .into_config()
            .unwrap();
        assert_eq!(config.num_threads, 2);
        assert_eq!(config.storage.max_paths, Some(40));
    }

    #[test]
    fn help_is_not_an_error() {
        let parsed = parse_cli::<MinerCli, _>(["pathminer", "--help"]).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn unknown_language_is_rejected_by_the_parser() {
        assert!(parse_cli::<MinerCli, _>(["pathminer", "--language", "cobol"]).is_err());
    }
}
