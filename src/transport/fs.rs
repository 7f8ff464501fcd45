use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::MinerError;
use crate::parse::Language;

/// One input file with its detected language.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputFile {
    /// Path as discovered under the input root.
    pub path: PathBuf,
    /// Language detected from the extension.
    pub language: Language,
}

/// Filesystem scan producing the ordered list of files to mine.
pub struct InputFiles {
    root: PathBuf,
    languages: Vec<Language>,
    follow_links: bool,
}

impl InputFiles {
    /// Scan `root` for files of any of `languages`.
    pub fn new(root: impl Into<PathBuf>, languages: &[Language]) -> Self {
        Self {
            root: root.into(),
            languages: languages.to_vec(),
            follow_links: false,
        }
    }

    /// Configure symlink traversal.
    pub fn with_follow_symlinks(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Scan root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every matching file, sorted by path so file indices are stable.
    ///
    /// Unreadable directory entries are logged and skipped; a missing root is
    /// an error.
    pub fn collect(&self) -> Result<Vec<InputFile>, MinerError> {
        if !self.root.exists() {
            return Err(MinerError::Configuration(format!(
                "input directory '{}' does not exist",
                self.root.display()
            )));
        }
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root).follow_links(self.follow_links);
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(root = %self.root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(language) = Language::from_path(entry.path()) else {
                continue;
            };
            if self.languages.contains(&language) {
                files.push(InputFile {
                    path: entry.into_path(),
                    language,
                });
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(root = %self.root.display(), files = files.len(), "input files collected");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn keeps_configured_languages_in_path_order() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("b/nested")).unwrap();
        for name in ["z.py", "a.java", "b/nested/m.py", "notes.txt", "b/c.js"] {
            fs::write(root.join(name), "x").unwrap();
        }

        let files = InputFiles::new(root, &[Language::Python, Language::JavaScript])
            .collect()
            .unwrap();
        let relative: Vec<String> = files
            .iter()
            .map(|file| {
                file.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(relative, vec!["b/c.js", "b/nested/m.py", "z.py"]);
        assert_eq!(files[0].language, Language::JavaScript);
    }

    #[test]
    fn missing_root_is_rejected() {
        let temp = tempdir().unwrap();
        let err = InputFiles::new(temp.path().join("absent"), &Language::ALL)
            .collect()
            .unwrap_err();
        assert!(matches!(err, MinerError::Configuration(_)));
    }
}
