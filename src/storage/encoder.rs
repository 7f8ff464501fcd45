use tracing::debug;

use crate::errors::MinerError;
use crate::types::{PathShape, Token};

use super::{
    LabeledPathContextIds, LabeledPathContexts, PathBasedStorageConfig, PathContextId,
    RankedIncrementalIdStorage, VocabularyFilter,
};

/// Outcome of encoding one labeled example.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodedExample {
    /// Corpus line (without newline) ready to be written.
    Emit(String),
    /// Every context was filtered out; nothing is written for this example.
    Filtered,
    /// Exact mode: ids are recorded, filtering waits for final ranks.
    Deferred(LabeledPathContextIds),
}

/// Assigns vocabulary ids to path contexts and applies vocabulary caps.
///
/// The encoder is the single owner of the token and path-shape tables. Every
/// `record` and the `rank` queries that decide one context's fate happen under
/// one `&mut self` borrow, so no other recording can interleave.
#[derive(Debug, Default)]
pub struct PathEncoder {
    config: PathBasedStorageConfig,
    tokens: RankedIncrementalIdStorage<Token>,
    paths: RankedIncrementalIdStorage<PathShape>,
}

impl PathEncoder {
    /// Create an encoder with empty vocabularies.
    pub fn new(config: PathBasedStorageConfig) -> Self {
        Self {
            config,
            tokens: RankedIncrementalIdStorage::new(),
            paths: RankedIncrementalIdStorage::new(),
        }
    }

    /// Active caps.
    pub fn config(&self) -> &PathBasedStorageConfig {
        &self.config
    }

    /// Token vocabulary.
    pub fn tokens(&self) -> &RankedIncrementalIdStorage<Token> {
        &self.tokens
    }

    /// Path-shape vocabulary.
    pub fn paths(&self) -> &RankedIncrementalIdStorage<PathShape> {
        &self.paths
    }

    /// Record one example and, in streaming mode, filter and render it.
    pub fn encode(&mut self, labeled: &LabeledPathContexts) -> Result<EncodedExample, MinerError> {
        let ids = self.store(labeled);
        match self.config.vocabulary_filter {
            VocabularyFilter::Streaming => self.render(&ids),
            VocabularyFilter::Exact => Ok(EncodedExample::Deferred(ids)),
        }
    }

    /// Filter a previously deferred example against the ranks as they stand now.
    pub fn finish_deferred(
        &self,
        ids: &LabeledPathContextIds,
    ) -> Result<EncodedExample, MinerError> {
        self.render(ids)
    }

    /// Record every context (up to the per-example cap) into the vocabularies.
    pub fn store(&mut self, labeled: &LabeledPathContexts) -> LabeledPathContextIds {
        let path_contexts = labeled
            .path_contexts
            .iter()
            .take(self.config.max_path_contexts)
            .map(|context| PathContextId {
                start_token_id: self.tokens.record(context.start_token.clone()),
                path_id: self.paths.record(context.path.shape()),
                end_token_id: self.tokens.record(context.end_token.clone()),
            })
            .collect();
        LabeledPathContextIds {
            label: labeled.label.clone(),
            path_contexts,
        }
    }

    /// Contexts of `ids` that pass the vocabulary caps at current ranks.
    pub fn retained(&self, ids: &LabeledPathContextIds) -> Result<Vec<PathContextId>, MinerError> {
        let mut kept = Vec::with_capacity(ids.path_contexts.len());
        for context in &ids.path_contexts {
            if self.passes_caps(context)? {
                kept.push(*context);
            }
        }
        Ok(kept)
    }

    fn passes_caps(&self, context: &PathContextId) -> Result<bool, MinerError> {
        if let Some(max_tokens) = self.config.max_tokens {
            if self.tokens.rank(context.start_token_id)? > max_tokens
                || self.tokens.rank(context.end_token_id)? > max_tokens
            {
                return Ok(false);
            }
        }
        if let Some(max_paths) = self.config.max_paths {
            if self.paths.rank(context.path_id)? > max_paths {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn render(&self, ids: &LabeledPathContextIds) -> Result<EncodedExample, MinerError> {
        let kept = self.retained(ids)?;
        if kept.is_empty() {
            debug!(
                label = %ids.label,
                candidates = ids.path_contexts.len(),
                "every path context filtered out"
            );
            return Ok(EncodedExample::Filtered);
        }
        let line = LabeledPathContextIds {
            label: ids.label.clone(),
            path_contexts: kept,
        }
        .to_corpus_line();
        Ok(EncodedExample::Emit(line))
    }

    /// Token dictionary lines (`<id> <token> <count>`) in rank order.
    pub fn token_dictionary(&self) -> Vec<String> {
        dictionary_lines(&self.tokens)
    }

    /// Path-shape dictionary lines (`<id> <shape> <count>`) in rank order.
    pub fn path_dictionary(&self) -> Vec<String> {
        dictionary_lines(&self.paths)
    }
}

fn dictionary_lines(table: &RankedIncrementalIdStorage<String>) -> Vec<String> {
    table
        .ranked_entries()
        .into_iter()
        .map(|entry| format!("{} {} {}", entry.id, entry.key, entry.count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::{OrientedPath, PathContext};
    use crate::types::VocabId;

    fn lookup(table: &RankedIncrementalIdStorage<String>, key: &str) -> Option<VocabId> {
        table.id(&key.to_string())
    }

    fn context(start: &str, end: &str, apex: &str) -> PathContext {
        PathContext {
            start_token: start.into(),
            end_token: end.into(),
            path: OrientedPath::new(vec!["name".into()], apex, vec!["name".into()]),
        }
    }

    fn labeled(label: &str, contexts: Vec<PathContext>) -> LabeledPathContexts {
        LabeledPathContexts {
            label: label.into(),
            path_contexts: contexts,
        }
    }

    #[test]
    fn unfiltered_encoding_emits_every_context() {
        let mut encoder = PathEncoder::new(PathBasedStorageConfig::new(10, None, None));
        let result = encoder
            .encode(&labeled(
                "f",
                vec![context("a", "b", "call"), context("b", "c", "args")],
            ))
            .expect("encode");
        assert_eq!(result, EncodedExample::Emit("f 1,1,2 2,2,3".into()));
        assert_eq!(encoder.tokens().count(&"b".to_string()), Some(2));
        assert_eq!(lookup(encoder.paths(), "name↑args↓name"), Some(2));
    }

    #[test]
    fn token_cap_drops_contexts_with_low_ranked_tokens() {
        let mut encoder = PathEncoder::new(PathBasedStorageConfig::new(10, Some(2), None));
        // Ranks after recording: x (3 uses) = 1, y (2) = 2, z (1) = 3.
        let result = encoder
            .encode(&labeled(
                "m",
                vec![
                    context("x", "y", "call"),
                    context("x", "y", "call"),
                    context("x", "z", "call"),
                ],
            ))
            .expect("encode");
        let x = lookup(encoder.tokens(), "x").expect("x");
        let y = lookup(encoder.tokens(), "y").expect("y");
        let z = lookup(encoder.tokens(), "z").expect("z");
        assert_eq!(encoder.tokens().rank(z).expect("rank"), 3);
        assert_eq!(
            result,
            EncodedExample::Emit(format!("m {x},1,{y} {x},1,{y}"))
        );
    }

    #[test]
    fn path_cap_applies_independently_of_tokens() {
        let mut encoder = PathEncoder::new(PathBasedStorageConfig::new(10, None, Some(1)));
        let result = encoder
            .encode(&labeled(
                "g",
                vec![
                    context("a", "b", "call"),
                    context("a", "b", "args"),
                    context("a", "b", "call"),
                ],
            ))
            .expect("encode");
        assert_eq!(result, EncodedExample::Emit("g 1,1,2 1,1,2".into()));
    }

    #[test]
    fn fully_filtered_examples_emit_nothing() {
        let mut encoder = PathEncoder::new(PathBasedStorageConfig::new(10, Some(1), None));
        encoder
            .encode(&labeled("warm", vec![context("a", "a", "call")]))
            .expect("encode");
        let result = encoder
            .encode(&labeled("cold", vec![context("q", "r", "call")]))
            .expect("encode");
        assert_eq!(result, EncodedExample::Filtered);
    }

    #[test]
    fn per_example_cap_limits_recorded_contexts() {
        let mut encoder = PathEncoder::new(PathBasedStorageConfig::new(1, None, None));
        let result = encoder
            .encode(&labeled(
                "h",
                vec![context("a", "b", "call"), context("c", "d", "call")],
            ))
            .expect("encode");
        assert_eq!(result, EncodedExample::Emit("h 1,1,2".into()));
        assert_eq!(encoder.tokens().len(), 2);
    }

    #[test]
    fn exact_mode_defers_filtering_to_final_ranks() {
        let config = PathBasedStorageConfig {
            vocabulary_filter: VocabularyFilter::Exact,
            ..PathBasedStorageConfig::new(10, Some(2), None)
        };
        let mut encoder = PathEncoder::new(config);
        // "early" is frequent in the first example and never again.
        let first = encoder
            .encode(&labeled("first", vec![context("early", "early", "call")]))
            .expect("encode");
        let EncodedExample::Deferred(first_ids) = first else {
            panic!("exact mode must defer");
        };
        for _ in 0..3 {
            encoder
                .encode(&labeled("later", vec![context("late", "other", "call")]))
                .expect("encode");
        }
        assert_eq!(
            encoder.finish_deferred(&first_ids).expect("finish"),
            EncodedExample::Filtered
        );
    }

    #[test]
    fn dictionaries_list_entries_by_rank() {
        let mut encoder = PathEncoder::new(PathBasedStorageConfig::default());
        encoder
            .encode(&labeled(
                "f",
                vec![context("a", "b", "call"), context("b", "b", "args")],
            ))
            .expect("encode");
        assert_eq!(encoder.token_dictionary(), vec!["2 b 3", "1 a 1"]);
        assert_eq!(
            encoder.path_dictionary(),
            vec!["1 name↑call↓name 1", "2 name↑args↓name 1"]
        );
    }
}
