use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::parse::Language;

/// Per-language counters of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LanguageCounts {
    /// Files parsed and labeled without error.
    pub files_processed: usize,
    /// Labeled examples extracted.
    pub examples: usize,
    /// Corpus lines written.
    pub lines_written: usize,
}

/// End-of-run report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Files discovered under the input root.
    pub files_total: usize,
    /// Files parsed and labeled without error.
    pub files_processed: usize,
    /// Files skipped because they failed to parse.
    pub files_skipped: usize,
    /// Files that parsed but failed during labeling.
    pub files_failed: usize,
    /// Labeled examples extracted.
    pub examples: usize,
    /// Examples whose contexts were all filtered out.
    pub examples_filtered: usize,
    /// Corpus lines written across languages.
    pub lines_written: usize,
    /// Distinct tokens recorded.
    pub token_vocabulary: usize,
    /// Distinct path shapes recorded.
    pub path_vocabulary: usize,
    /// Breakdown by language.
    pub per_language: BTreeMap<Language, LanguageCounts>,
    /// Run start.
    pub started_at: DateTime<Utc>,
    /// Run end; `None` while the run is still going.
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    /// Empty summary for a run over `files_total` files.
    pub fn new(files_total: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            files_total,
            files_processed: 0,
            files_skipped: 0,
            files_failed: 0,
            examples: 0,
            examples_filtered: 0,
            lines_written: 0,
            token_vocabulary: 0,
            path_vocabulary: 0,
            per_language: BTreeMap::new(),
            started_at,
            finished_at: None,
        }
    }

    /// Counters for `language`, created on first use.
    pub fn language_mut(&mut self, language: Language) -> &mut LanguageCounts {
        self.per_language.entry(language).or_default()
    }

    /// Elapsed time once finished.
    pub fn duration(&self) -> Option<Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// True when every discovered file was processed.
    pub fn is_clean(&self) -> bool {
        self.files_skipped == 0 && self.files_failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "files: {} total, {} processed, {} skipped, {} failed",
            self.files_total, self.files_processed, self.files_skipped, self.files_failed
        )?;
        writeln!(
            f,
            "examples: {} extracted, {} filtered, {} lines written",
            self.examples, self.examples_filtered, self.lines_written
        )?;
        write!(
            f,
            "vocabulary: {} tokens, {} paths",
            self.token_vocabulary, self.path_vocabulary
        )?;
        for (language, counts) in &self.per_language {
            write!(
                f,
                "\n  {language}: {} files, {} examples, {} lines",
                counts.files_processed, counts.examples, counts.lines_written
            )?;
        }
        if let Some(duration) = self.duration() {
            write!(f, "\nelapsed: {} ms", duration.num_milliseconds())?;
        }
        Ok(())
    }
}
