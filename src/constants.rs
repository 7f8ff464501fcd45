/// Constants used by token normalization and technical token replacement.
pub mod tokens {
    /// Token used when normalization strips a leaf token down to nothing.
    pub const EMPTY_TOKEN: &str = "EMPTY";
    /// Technical token written over the name node of a labeled function.
    pub const METHOD_NAME_TOKEN: &str = "METHOD_NAME";
    /// Technical token written over other occurrences of the function name.
    pub const SELF_TOKEN: &str = "SELF";
}

/// Constants used by the path context extractor.
pub mod paths {
    /// Marker appended after each ascending label in a rendered path shape.
    pub const UP_ARROW: char = '↑';
    /// Marker placed before each descending label in a rendered path shape.
    pub const DOWN_ARROW: char = '↓';
    /// Default per-example cap on emitted path contexts.
    pub const DEFAULT_MAX_PATH_CONTEXTS: usize = 200;
    /// Offset mixed into sampled pair-selection seeds.
    pub const SAMPLING_SEED_OFFSET: u64 = 0xC0DE_2FEC;
}

/// Constants used by corpus and dictionary storage.
pub mod storage {
    /// Per-language subdirectory holding corpus data files.
    pub const DATA_DIR: &str = "data";
    /// Corpus file name inside each `<language>/data` directory.
    pub const PATH_CONTEXTS_FILE: &str = "path_contexts.c2s";
    /// Token dictionary file name at the output root.
    pub const TOKENS_DICT_FILE: &str = "tokens.dict";
    /// Path-shape dictionary file name at the output root.
    pub const PATHS_DICT_FILE: &str = "paths.dict";
    /// Bytes of whole corpus lines buffered per stream before they are written out.
    pub const STREAM_BUFFER_BYTES: usize = 64 * 1024;
    /// Separator between the fields of one path context id triple.
    pub const TRIPLE_SEPARATOR: char = ',';
}

/// Constants used by the pipeline orchestrator.
pub mod pipeline {
    /// Number of per-file outcomes buffered between workers and the encoder.
    pub const OUTCOME_CHANNEL_CAPACITY: usize = 64;
    /// Log message used when a file is skipped because it failed to parse.
    pub const SKIP_UNPARSEABLE_MSG: &str = "skipping unparseable file";
    /// Log message used when a file fails after parsing.
    pub const FILE_FAILED_MSG: &str = "file failed during labeling or extraction";
}

/// Constants used by snippet mining.
pub mod snippets {
    /// Per-example path context cap used for snippet runs.
    pub const SNIPPET_MAX_PATH_CONTEXTS: usize = 8;
    /// Token vocabulary cap used for snippet runs.
    pub const SNIPPET_MAX_TOKENS: usize = 2;
    /// Strategy name selecting file-path labels.
    pub const LABEL_FILE_NAME: &str = "file name";
    /// Strategy name selecting function-name labels.
    pub const LABEL_FUNCTION_NAME: &str = "function name";
    /// Base name of materialized snippet input files.
    pub const SNIPPET_FILE_STEM: &str = "input";
}
