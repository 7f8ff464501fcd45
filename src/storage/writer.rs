use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::constants::storage::{DATA_DIR, PATH_CONTEXTS_FILE, STREAM_BUFFER_BYTES};
use crate::errors::MinerError;

/// Destination of one corpus stream.
pub(crate) trait StreamTarget: Write + Send {
    /// Cut the destination back to `len` bytes and continue writing from there.
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl StreamTarget for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

type TargetOpener = fn(&Path) -> io::Result<Box<dyn StreamTarget>>;

fn open_file(path: &Path) -> io::Result<Box<dyn StreamTarget>> {
    Ok(Box::new(File::create(path)?))
}

/// One open per-language corpus stream.
///
/// Lines are buffered whole in `pending`; `committed` is the length of the
/// destination made only of whole lines.
struct CorpusStream {
    path: PathBuf,
    target: Box<dyn StreamTarget>,
    pending: Vec<u8>,
    committed: u64,
    lines: usize,
}

impl CorpusStream {
    fn flush_pending(&mut self) -> Result<(), MinerError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let written = self
            .target
            .write_all(&self.pending)
            .and_then(|()| self.target.flush());
        match written {
            Ok(()) => {
                self.committed += self.pending.len() as u64;
                self.pending.clear();
                Ok(())
            }
            Err(err) => {
                self.pending.clear();
                if let Err(rewind) = self.target.truncate_to(self.committed) {
                    warn!(
                        path = %self.path.display(),
                        error = %rewind,
                        "could not cut corpus stream back to its last whole line"
                    );
                }
                Err(MinerError::storage(&self.path, err))
            }
        }
    }
}

/// Owns every corpus stream of a run and writes whole lines only.
///
/// Streams are opened lazily, one per language directory. `close` consumes
/// the writer, so each stream and dictionary is flushed exactly once. A
/// failed flush cuts the stream back to its last whole line.
pub struct CorpusWriter {
    output_dir: PathBuf,
    streams: FxHashMap<String, CorpusStream>,
    buffer_bytes: usize,
    open: TargetOpener,
}

impl CorpusWriter {
    /// Prepare a writer rooted at `output_dir`, creating the directory.
    pub fn create(output_dir: impl Into<PathBuf>) -> Result<Self, MinerError> {
        Self::with_targets(output_dir, STREAM_BUFFER_BYTES, open_file)
    }

    pub(crate) fn with_targets(
        output_dir: impl Into<PathBuf>,
        buffer_bytes: usize,
        open: TargetOpener,
    ) -> Result<Self, MinerError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|err| MinerError::storage(&output_dir, err))?;
        Ok(Self {
            output_dir,
            streams: FxHashMap::default(),
            buffer_bytes,
            open,
        })
    }

    /// Output root.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Corpus file path for a language directory name.
    pub fn corpus_path(output_dir: &Path, language: &str) -> PathBuf {
        output_dir
            .join(language)
            .join(DATA_DIR)
            .join(PATH_CONTEXTS_FILE)
    }

    /// Append one complete line (a newline is added) to the language's stream.
    pub fn write_line(&mut self, language: &str, line: &str) -> Result<(), MinerError> {
        let buffer_bytes = self.buffer_bytes;
        let stream = self.stream(language)?;
        stream.pending.extend_from_slice(line.as_bytes());
        stream.pending.push(b'\n');
        stream.lines += 1;
        if stream.pending.len() >= buffer_bytes {
            stream.flush_pending()?;
        }
        Ok(())
    }

    /// Lines written so far for `language`.
    pub fn lines_written(&self, language: &str) -> usize {
        self.streams.get(language).map_or(0, |stream| stream.lines)
    }

    /// Write a dictionary file under the output root.
    pub fn write_dictionary(&self, file_name: &str, lines: &[String]) -> Result<PathBuf, MinerError> {
        let path = self.output_dir.join(file_name);
        let file = File::create(&path).map_err(|err| MinerError::storage(&path, err))?;
        let mut writer = BufWriter::new(file);
        for line in lines {
            writeln!(writer, "{line}").map_err(|err| MinerError::storage(&path, err))?;
        }
        writer
            .flush()
            .map_err(|err| MinerError::storage(&path, err))?;
        debug!(path = %path.display(), entries = lines.len(), "dictionary written");
        Ok(path)
    }

    /// Flush and close every corpus stream.
    ///
    /// Every stream is attempted even after a failure; the first error is returned.
    pub fn close(self) -> Result<(), MinerError> {
        let mut first_error = None;
        for (language, mut stream) in self.streams {
            match stream.flush_pending() {
                Ok(()) => info!(
                    language = %language,
                    lines = stream.lines,
                    path = %stream.path.display(),
                    "corpus stream closed"
                ),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn stream(&mut self, language: &str) -> Result<&mut CorpusStream, MinerError> {
        if !self.streams.contains_key(language) {
            let path = Self::corpus_path(&self.output_dir, language);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|err| MinerError::storage(parent, err))?;
            }
            let target = (self.open)(&path).map_err(|err| MinerError::storage(&path, err))?;
            self.streams.insert(
                language.to_string(),
                CorpusStream {
                    path,
                    target,
                    pending: Vec::with_capacity(self.buffer_bytes),
                    committed: 0,
                    lines: 0,
                },
            );
        }
        self.streams
            .get_mut(language)
            .ok_or_else(|| MinerError::Configuration(format!("no stream for '{language}'")))
    }
}
