use std::path::Path;

use pathminer::{
    EncodedExample, ExtractorConfig, LabeledPathContexts, Language, MinerError, Node,
    PathBasedStorageConfig, PathEncoder, PathExtractor, RankedIncrementalIdStorage,
    SourceParser, TreeSitterParser, parse_corpus_line,
};

const JAVA: &str = "\
class Matrix {
    double trace(double[][] m) {
        double sum = 0;
        for (int i = 0; i < m.length; i++) {
            sum += m[i][i];
        }
        return sum;
    }
}
";

fn java_tree() -> pathminer::SyntaxTree {
    TreeSitterParser::new(Language::Java)
        .parse_source(JAVA, Path::new("Matrix.java"))
        .unwrap()
        .tree
        .unwrap()
}

#[test]
fn emitted_contexts_never_exceed_the_cap() {
    let tree = java_tree();
    let leaves = tree
        .root()
        .pre_order()
        .into_iter()
        .filter(|node| node.is_leaf())
        .count();
    assert!(leaves > 10);
    for cap in [1, 7, 50, 10_000] {
        let extractor = PathExtractor::new(ExtractorConfig {
            max_path_contexts: cap,
            ..ExtractorConfig::default()
        });
        let contexts = extractor.extract(tree.root());
        assert!(contexts.len() <= cap);
        if cap == 10_000 {
            assert_eq!(contexts.len(), leaves * (leaves - 1) / 2);
        }
    }
}

#[test]
fn extraction_is_repeatable() {
    let tree = java_tree();
    let extractor = PathExtractor::new(ExtractorConfig {
        max_path_contexts: 25,
        max_path_length: Some(6),
        ..ExtractorConfig::default()
    });
    let first = extractor.extract(tree.root());
    let second = extractor.extract(tree.root());
    assert_eq!(first, second);
    assert!(first.iter().all(|context| context.path.length() <= 6));
}

#[test]
fn record_is_idempotent_on_id_and_counts_every_call() {
    let mut table = RankedIncrementalIdStorage::new();
    let first = table.record("alpha".to_string());
    for _ in 0..4 {
        assert_eq!(table.record("alpha".to_string()), first);
    }
    assert_eq!(table.count(&"alpha".to_string()), Some(5));
    assert_eq!(table.len(), 1);
}

#[test]
fn ties_rank_by_first_seen_order() {
    let mut table = RankedIncrementalIdStorage::new();
    let schedule = ["a", "b", "c", "c", "a", "b", "c", "a", "b", "a", "b", "a", "b"];
    for key in schedule {
        table.record(key.to_string());
    }
    let id = |key: &str| table.id(&key.to_string()).unwrap();
    assert_eq!(table.count(&"a".to_string()), Some(5));
    assert_eq!(table.count(&"b".to_string()), Some(5));
    assert_eq!(table.count(&"c".to_string()), Some(3));
    assert_eq!(table.rank(id("a")).unwrap(), 1);
    assert_eq!(table.rank(id("b")).unwrap(), 2);
    assert_eq!(table.rank(id("c")).unwrap(), 3);
    assert!(matches!(
        table.rank(99),
        Err(MinerError::InvalidKey { id: 99 })
    ));
}

#[test]
fn token_cap_excludes_contexts_touching_low_ranked_tokens() {
    let tree = java_tree();
    let contexts = PathExtractor::new(ExtractorConfig {
        max_path_contexts: 10_000,
        ..ExtractorConfig::default()
    })
    .extract(tree.root());
    let mut encoder = PathEncoder::new(PathBasedStorageConfig::new(10_000, Some(2), None));
    let encoded = encoder
        .encode(&LabeledPathContexts {
            label: "trace".into(),
            path_contexts: contexts,
        })
        .unwrap();
    let EncodedExample::Emit(line) = encoded else {
        panic!("the two most frequent tokens co-occur in some context");
    };
    let parsed = parse_corpus_line(&line).unwrap();
    for context in &parsed.path_contexts {
        assert!(encoder.tokens().rank(context.start_token_id).unwrap() <= 2);
        assert!(encoder.tokens().rank(context.end_token_id).unwrap() <= 2);
    }
    assert!(encoder.tokens().len() > 2);
}

#[test]
fn corpus_lines_round_trip() {
    let mut encoder = PathEncoder::new(PathBasedStorageConfig::default());
    let tree = java_tree();
    let contexts = PathExtractor::default().extract(tree.root());
    let ids = encoder.store(&LabeledPathContexts {
        label: "trace".into(),
        path_contexts: contexts,
    });
    let line = ids.to_corpus_line();
    assert_eq!(parse_corpus_line(&line).unwrap(), ids);
    assert!(matches!(
        parse_corpus_line("label 1,2"),
        Err(MinerError::CorpusFormat(_))
    ));
}
