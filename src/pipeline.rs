//! Run orchestration: scan inputs, mine files on a worker pool, encode and
//! write on a single owning thread.
//!
//! Workers parse, label and extract. They never touch the vocabularies or the
//! output streams; those live on the orchestrator thread, which receives one
//! report per file over a bounded channel and encodes reports strictly in
//! file-index order through a reorder buffer. Ids and line order therefore do
//! not depend on the thread count.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::constants::pipeline::{
    FILE_FAILED_MSG, OUTCOME_CHANNEL_CAPACITY, SKIP_UNPARSEABLE_MSG,
};
use crate::constants::storage::{PATHS_DICT_FILE, TOKENS_DICT_FILE};
use crate::errors::MinerError;
use crate::functions::SplitterRegistry;
use crate::label::LabelExtractor;
use crate::metrics::RunSummary;
use crate::parse::{Language, SourceParser, parser_for};
use crate::paths::PathExtractor;
use crate::storage::{
    CorpusWriter, EncodedExample, LabeledPathContextIds, LabeledPathContexts, PathEncoder,
};
use crate::transport::{InputFile, InputFiles};

/// Lifecycle of a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Configured, not started.
    Idle,
    /// Processing files.
    Running,
    /// Every file was attempted and all output was closed.
    Completed,
    /// Stopped by an output or vocabulary failure.
    Aborted,
}

/// What happened to one file on a worker.
enum FileOutcome {
    Mined(Vec<LabeledPathContexts>),
    Skipped(MinerError),
    Failed(MinerError),
}

struct FileReport {
    index: usize,
    outcome: FileOutcome,
    elapsed: Duration,
}

/// Read-only per-file work shared by all workers.
struct FileMiner {
    parsers: FxHashMap<Language, Box<dyn SourceParser>>,
    labeler: Arc<dyn LabelExtractor>,
    extractor: PathExtractor,
}

impl FileMiner {
    fn report(&self, index: usize, file: &InputFile) -> FileReport {
        let start = Instant::now();
        let outcome = match self.mine(file) {
            Ok(examples) => FileOutcome::Mined(examples),
            Err(err @ MinerError::ParseFailure { .. }) => FileOutcome::Skipped(err),
            Err(err) => FileOutcome::Failed(err),
        };
        FileReport {
            index,
            outcome,
            elapsed: start.elapsed(),
        }
    }

    fn mine(&self, file: &InputFile) -> Result<Vec<LabeledPathContexts>, MinerError> {
        let parser = self.parsers.get(&file.language).ok_or_else(|| {
            MinerError::UnsupportedConfiguration(format!("no parser for {}", file.language))
        })?;
        let parsed = parser.parse_file(&file.path)?;
        let labeled = self.labeler.extract(parsed)?;
        Ok(labeled
            .into_iter()
            .enumerate()
            .map(|(ordinal, result)| LabeledPathContexts {
                path_contexts: self.extractor.extract_for_example(
                    result.root.root(),
                    &result.file_path,
                    &result.label,
                    ordinal,
                ),
                label: result.label,
            })
            .collect())
    }
}

/// Encoder-side state owned by the orchestrator thread for one run.
struct RunSink<'f> {
    files: &'f [InputFile],
    encoder: PathEncoder,
    writer: CorpusWriter,
    deferred: Vec<(Language, LabeledPathContextIds)>,
    summary: RunSummary,
}

impl RunSink<'_> {
    fn absorb(&mut self, report: FileReport) -> Result<(), MinerError> {
        let files = self.files;
        let file = &files[report.index];
        match report.outcome {
            FileOutcome::Mined(examples) => {
                debug!(
                    path = %file.path.display(),
                    examples = examples.len(),
                    elapsed_ms = report.elapsed.as_millis(),
                    "file mined"
                );
                self.summary.files_processed += 1;
                self.summary.language_mut(file.language).files_processed += 1;
                for example in &examples {
                    self.encode(file.language, example)?;
                }
            }
            FileOutcome::Skipped(err) => {
                warn!(path = %file.path.display(), error = %err, "{SKIP_UNPARSEABLE_MSG}");
                self.summary.files_skipped += 1;
            }
            FileOutcome::Failed(err) if err.is_file_local() => {
                warn!(path = %file.path.display(), error = %err, "{FILE_FAILED_MSG}");
                self.summary.files_failed += 1;
            }
            FileOutcome::Failed(err) => return Err(err),
        }
        Ok(())
    }

    fn encode(
        &mut self,
        language: Language,
        example: &LabeledPathContexts,
    ) -> Result<(), MinerError> {
        self.summary.examples += 1;
        self.summary.language_mut(language).examples += 1;
        match self.encoder.encode(example)? {
            EncodedExample::Emit(line) => self.emit(language, &line)?,
            EncodedExample::Filtered => self.summary.examples_filtered += 1,
            EncodedExample::Deferred(ids) => self.deferred.push((language, ids)),
        }
        Ok(())
    }

    fn emit(&mut self, language: Language, line: &str) -> Result<(), MinerError> {
        self.writer.write_line(language.name(), line)?;
        self.summary.lines_written += 1;
        self.summary.language_mut(language).lines_written += 1;
        Ok(())
    }

    /// Filter deferred examples with final ranks, dump dictionaries, close streams.
    ///
    /// Streams are closed exactly once even when the final writes fail.
    fn finish(mut self) -> Result<RunSummary, MinerError> {
        let written = self
            .flush_deferred()
            .and_then(|()| self.dump_dictionaries());
        let closed = self.writer.close();
        written?;
        closed?;
        self.summary.token_vocabulary = self.encoder.tokens().len();
        self.summary.path_vocabulary = self.encoder.paths().len();
        self.summary.finished_at = Some(Utc::now());
        Ok(self.summary)
    }

    fn flush_deferred(&mut self) -> Result<(), MinerError> {
        for (language, ids) in std::mem::take(&mut self.deferred) {
            match self.encoder.finish_deferred(&ids)? {
                EncodedExample::Emit(line) => self.emit(language, &line)?,
                EncodedExample::Filtered | EncodedExample::Deferred(_) => {
                    self.summary.examples_filtered += 1;
                }
            }
        }
        Ok(())
    }

    fn dump_dictionaries(&self) -> Result<(), MinerError> {
        self.writer
            .write_dictionary(TOKENS_DICT_FILE, &self.encoder.token_dictionary())?;
        self.writer
            .write_dictionary(PATHS_DICT_FILE, &self.encoder.path_dictionary())?;
        Ok(())
    }

    /// Close streams after an abort so only whole lines remain on disk.
    fn abandon(self) {
        if let Err(err) = self.writer.close() {
            warn!(error = %err, "closing corpus streams after abort failed");
        }
    }
}

/// One configured mining run.
pub struct Pipeline {
    config: PipelineConfig,
    miner: FileMiner,
    state: RunState,
}

impl Pipeline {
    /// Validate `config` with the built-in splitters and prepare parsers.
    pub fn new(config: PipelineConfig) -> Result<Self, MinerError> {
        Self::with_registry(config, &SplitterRegistry::with_defaults())
    }

    /// Like `new`, resolving function splitters from `registry`.
    ///
    /// Unsupported language/parser/label combinations fail here, before any
    /// file is read.
    pub fn with_registry(
        config: PipelineConfig,
        registry: &SplitterRegistry,
    ) -> Result<Self, MinerError> {
        config.validate(registry)?;
        let parser = &config.parser;
        let parsers = parser
            .languages
            .iter()
            .map(|language| {
                (
                    *language,
                    parser_for(*language, parser.backend, parser.reject_syntax_errors),
                )
            })
            .collect();
        let labeler = config
            .label_extractor
            .build(registry, parser.backend, &parser.languages)?;
        let miner = FileMiner {
            parsers,
            labeler,
            extractor: PathExtractor::new(config.extractor_config()),
        };
        Ok(Self {
            config,
            miner,
            state: RunState::Idle,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Mine every input file and write the corpus.
    ///
    /// A missing input directory is reported before the run starts and leaves
    /// the pipeline `Idle`. File-local failures are counted in the summary; output and vocabulary
    /// failures abort the run and are returned.
    pub fn run(&mut self) -> Result<RunSummary, MinerError> {
        if self.state != RunState::Idle {
            return Err(MinerError::Configuration(format!(
                "pipeline cannot start from state {:?}",
                self.state
            )));
        }
        let started_at = Utc::now();
        let files = InputFiles::new(&self.config.input_dir, &self.config.parser.languages)
            .with_follow_symlinks(self.config.follow_links)
            .collect()?;
        self.state = RunState::Running;
        let result = self.execute(files, started_at);
        self.state = match &result {
            Ok(_) => RunState::Completed,
            Err(_) => RunState::Aborted,
        };
        match &result {
            Ok(summary) => info!(
                files = summary.files_total,
                processed = summary.files_processed,
                skipped = summary.files_skipped,
                failed = summary.files_failed,
                lines = summary.lines_written,
                "mining run completed"
            ),
            Err(err) => warn!(error = %err, "mining run aborted"),
        }
        result
    }

    fn execute(
        &self,
        files: Vec<InputFile>,
        started_at: DateTime<Utc>,
    ) -> Result<RunSummary, MinerError> {
        info!(
            input = %self.config.input_dir.display(),
            files = files.len(),
            threads = self.config.num_threads,
            "mining run started"
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|err| MinerError::Configuration(format!("worker pool: {err}")))?;
        let mut sink = RunSink {
            files: &files,
            encoder: PathEncoder::new(self.config.storage.clone()),
            writer: CorpusWriter::create(&self.config.output_dir)?,
            deferred: Vec::new(),
            summary: RunSummary::new(files.len(), started_at),
        };
        let abort = AtomicBool::new(false);
        let (sender, receiver) = mpsc::sync_channel(OUTCOME_CHANNEL_CAPACITY);
        let consumed = thread::scope(|scope| {
            let files = &files;
            let abort = &abort;
            let miner = &self.miner;
            let pool = &pool;
            scope.spawn(move || {
                pool.install(|| {
                    files
                        .par_iter()
                        .enumerate()
                        .for_each_with(sender, |sender, (index, file)| {
                            if abort.load(Ordering::Relaxed) {
                                return;
                            }
                            // A closed channel means the orchestrator already aborted.
                            let _ = sender.send(miner.report(index, file));
                        });
                });
            });
            let consumed = consume_in_order(receiver, &mut sink);
            if consumed.is_err() {
                abort.store(true, Ordering::Relaxed);
            }
            consumed
        });
        match consumed {
            Ok(()) => sink.finish(),
            Err(err) => {
                sink.abandon();
                Err(err)
            }
        }
    }
}

/// Feed reports to `sink` in file-index order, buffering early arrivals.
///
/// Returning drops `receiver`, which unblocks any worker waiting to send.
fn consume_in_order(
    receiver: Receiver<FileReport>,
    sink: &mut RunSink<'_>,
) -> Result<(), MinerError> {
    let mut pending: BTreeMap<usize, FileReport> = BTreeMap::new();
    let mut next = 0;
    for report in receiver {
        pending.insert(report.index, report);
        while let Some(report) = pending.remove(&next) {
            sink.absorb(report)?;
            next += 1;
        }
    }
    Ok(())
}

/// Convenience: run one pipeline over `config` and return its summary.
pub fn mine(config: PipelineConfig) -> Result<RunSummary, MinerError> {
    Pipeline::new(config)?.run()
}

/// Corpus file written for `language` under `output_dir`.
pub fn corpus_file(output_dir: &Path, language: Language) -> PathBuf {
    CorpusWriter::corpus_path(output_dir, language.name())
}
