//! Path context extraction.
//!
//! A path context joins two leaves of a subtree: the ascent from the start leaf
//! to their lowest common ancestor, the ancestor itself (the apex), and the
//! descent to the end leaf. Pair enumeration is deterministic so identical
//! input always yields identical output.

use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::constants::paths::{
    DEFAULT_MAX_PATH_CONTEXTS, DOWN_ARROW, SAMPLING_SEED_OFFSET, UP_ARROW,
};
use crate::errors::MinerError;
use crate::hash::example_seed;
use crate::tree::Node;
use crate::types::{PathShape, Token, TypeLabel};

/// Direction of one step of an oriented path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Step from a node to its parent.
    Up,
    /// Step from a node to one of its children.
    Down,
}

/// Type labels along a leaf-to-leaf walk.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrientedPath {
    up: Vec<TypeLabel>,
    apex: TypeLabel,
    down: Vec<TypeLabel>,
}

impl OrientedPath {
    /// Build a path from its ascent, apex and descent; either segment may be empty.
    pub fn new(up: Vec<TypeLabel>, apex: impl Into<TypeLabel>, down: Vec<TypeLabel>) -> Self {
        Self {
            up,
            apex: apex.into(),
            down,
        }
    }

    /// Labels walked upward, starting at the start leaf.
    pub fn up(&self) -> &[TypeLabel] {
        &self.up
    }

    /// Lowest common ancestor label.
    pub fn apex(&self) -> &str {
        &self.apex
    }

    /// Labels walked downward, ending at the end leaf.
    pub fn down(&self) -> &[TypeLabel] {
        &self.down
    }

    /// Every node in walk order; the apex carries no direction.
    pub fn oriented_nodes(&self) -> Vec<(&str, Option<Direction>)> {
        self.up
            .iter()
            .map(|label| (label.as_str(), Some(Direction::Up)))
            .chain(std::iter::once((self.apex.as_str(), None)))
            .chain(
                self.down
                    .iter()
                    .map(|label| (label.as_str(), Some(Direction::Down))),
            )
            .collect()
    }

    /// Number of edges walked.
    pub fn length(&self) -> usize {
        self.up.len() + self.down.len()
    }

    /// Vocabulary key for the path shape; independent of token text.
    pub fn shape(&self) -> PathShape {
        let mut shape = String::new();
        for label in &self.up {
            shape.push_str(label);
            shape.push(UP_ARROW);
        }
        shape.push_str(&self.apex);
        for label in &self.down {
            shape.push(DOWN_ARROW);
            shape.push_str(label);
        }
        shape
    }
}

/// Start token, structural path, end token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathContext {
    /// Token of the earlier leaf.
    pub start_token: Token,
    /// Token of the later leaf.
    pub end_token: Token,
    /// Walk between the two leaves.
    pub path: OrientedPath,
}

/// How candidate leaf pairs are chosen once the cap applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PairSelection {
    /// Enumerate pairs left to right and truncate at the cap.
    #[default]
    LeftToRight,
    /// Shuffle all eligible pairs with a per-example seed, then truncate.
    Sampled {
        /// Run-level seed mixed into each example's seed.
        seed: u64,
    },
}

/// Bounds applied while extracting path contexts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Max path contexts emitted per example.
    pub max_path_contexts: usize,
    /// Max edges in one path; `None` is unbounded.
    pub max_path_length: Option<usize>,
    /// Max sibling distance between the two branches below the apex.
    pub max_path_width: Option<usize>,
    /// Pair selection policy.
    pub selection: PairSelection,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_path_contexts: DEFAULT_MAX_PATH_CONTEXTS,
            max_path_length: None,
            max_path_width: None,
            selection: PairSelection::LeftToRight,
        }
    }
}

impl ExtractorConfig {
    /// Reject bounds that would make every example empty.
    pub fn validate(&self) -> Result<(), MinerError> {
        if self.max_path_contexts == 0 {
            return Err(MinerError::Configuration(
                "max_path_contexts must be at least 1".into(),
            ));
        }
        if self.max_path_length == Some(0) || self.max_path_width == Some(0) {
            return Err(MinerError::Configuration(
                "max_path_length and max_path_width must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

/// Subtree flattened into pre-order arrays for index-based ancestor walks.
struct FlatTree {
    labels: Vec<TypeLabel>,
    tokens: Vec<Token>,
    parents: Vec<Option<usize>>,
    depths: Vec<usize>,
    sibling_positions: Vec<usize>,
    leaves: Vec<usize>,
}

impl FlatTree {
    fn build<N: Node>(root: N) -> Self {
        let mut flat = FlatTree {
            labels: Vec::new(),
            tokens: Vec::new(),
            parents: Vec::new(),
            depths: Vec::new(),
            sibling_positions: Vec::new(),
            leaves: Vec::new(),
        };
        let mut stack: Vec<(N, Option<usize>, usize)> = vec![(root, None, 0)];
        while let Some((node, parent, position)) = stack.pop() {
            let idx = flat.labels.len();
            let children = node.children();
            flat.labels.push(node.type_label().to_string());
            flat.tokens.push(node.token().to_string());
            flat.parents.push(parent);
            let depth = parent.map_or(0, |p| flat.depths[p] + 1);
            flat.depths.push(depth);
            flat.sibling_positions.push(position);
            if children.is_empty() {
                flat.leaves.push(idx);
            }
            for (pos, child) in children.into_iter().enumerate().rev() {
                stack.push((child, Some(idx), pos));
            }
        }
        flat
    }

    /// Ascent (start leaf upward), apex, and the apex children on both sides.
    fn lca_walk(&self, start: usize, end: usize) -> LcaWalk {
        let mut up = Vec::new();
        let mut down = Vec::new();
        let (mut a, mut b) = (start, end);
        while self.depths[a] > self.depths[b] {
            up.push(a);
            a = self.parent_of(a);
        }
        while self.depths[b] > self.depths[a] {
            down.push(b);
            b = self.parent_of(b);
        }
        while a != b {
            up.push(a);
            down.push(b);
            a = self.parent_of(a);
            b = self.parent_of(b);
        }
        down.reverse();
        LcaWalk { up, apex: a, down }
    }

    fn parent_of(&self, idx: usize) -> usize {
        self.parents[idx].unwrap_or(idx)
    }
}

struct LcaWalk {
    up: Vec<usize>,
    apex: usize,
    down: Vec<usize>,
}

impl LcaWalk {
    fn width(&self, flat: &FlatTree) -> usize {
        match (self.up.last(), self.down.first()) {
            (Some(left), Some(right)) => flat.sibling_positions[*right]
                .abs_diff(flat.sibling_positions[*left]),
            _ => 0,
        }
    }
}

/// Enumerates bounded path contexts for labeled subtrees.
#[derive(Clone, Debug, Default)]
pub struct PathExtractor {
    config: ExtractorConfig,
}

impl PathExtractor {
    /// Create an extractor with the given bounds.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Active bounds.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract path contexts from `root` using the run-level seed only.
    pub fn extract<N: Node>(&self, root: N) -> Vec<PathContext> {
        self.extract_with_seed(root, self.base_seed())
    }

    /// Extract path contexts for one identified example.
    ///
    /// `file_path`, `label` and `ordinal` only matter for `PairSelection::Sampled`,
    /// where they derive the example's shuffle seed.
    pub fn extract_for_example<N: Node>(
        &self,
        root: N,
        file_path: &str,
        label: &str,
        ordinal: usize,
    ) -> Vec<PathContext> {
        let seed = example_seed(self.base_seed(), file_path, label, ordinal);
        self.extract_with_seed(root, seed)
    }

    fn base_seed(&self) -> u64 {
        match self.config.selection {
            PairSelection::LeftToRight => 0,
            PairSelection::Sampled { seed } => seed ^ SAMPLING_SEED_OFFSET,
        }
    }

    fn extract_with_seed<N: Node>(&self, root: N, seed: u64) -> Vec<PathContext> {
        let flat = FlatTree::build(root);
        if flat.leaves.len() < 2 {
            return Vec::new();
        }
        let walks = match self.config.selection {
            PairSelection::LeftToRight => self.left_to_right_walks(&flat),
            PairSelection::Sampled { .. } => self.sampled_walks(&flat, seed),
        };
        walks
            .into_iter()
            .map(|(start, end, walk)| PathContext {
                start_token: flat.tokens[start].clone(),
                end_token: flat.tokens[end].clone(),
                path: OrientedPath::new(
                    walk.up.iter().map(|idx| flat.labels[*idx].clone()).collect(),
                    flat.labels[walk.apex].clone(),
                    walk.down
                        .iter()
                        .map(|idx| flat.labels[*idx].clone())
                        .collect(),
                ),
            })
            .collect()
    }

    fn eligible(&self, flat: &FlatTree, start: usize, end: usize) -> Option<LcaWalk> {
        let walk = flat.lca_walk(start, end);
        let too_long = self
            .config
            .max_path_length
            .is_some_and(|max| walk.up.len() + walk.down.len() > max);
        let too_wide = self
            .config
            .max_path_width
            .is_some_and(|max| walk.width(flat) > max);
        (!too_long && !too_wide).then_some(walk)
    }

    fn left_to_right_walks(&self, flat: &FlatTree) -> Vec<(usize, usize, LcaWalk)> {
        let cap = self.config.max_path_contexts;
        let mut walks = Vec::new();
        for (pos, start) in flat.leaves.iter().enumerate() {
            for end in &flat.leaves[pos + 1..] {
                if walks.len() >= cap {
                    return walks;
                }
                if let Some(walk) = self.eligible(flat, *start, *end) {
                    walks.push((*start, *end, walk));
                }
            }
        }
        walks
    }

    /// Partial Fisher-Yates over pair indices: only drawn positions are
    /// materialized, so the cost tracks the number of draws, not `L²`.
    fn sampled_walks(&self, flat: &FlatTree, seed: u64) -> Vec<(usize, usize, LcaWalk)> {
        let leaves = flat.leaves.len();
        let total = leaves * (leaves - 1) / 2;
        let cap = self.config.max_path_contexts;
        let mut rng = DeterministicRng::new(seed);
        let mut swapped: FxHashMap<usize, usize> = FxHashMap::default();
        let mut chosen = Vec::new();
        for drawn in 0..total {
            if chosen.len() >= cap {
                break;
            }
            let pick = rng.random_range(drawn..total);
            let picked = swapped.get(&pick).copied().unwrap_or(pick);
            let displaced = swapped.get(&drawn).copied().unwrap_or(drawn);
            swapped.insert(pick, displaced);
            let (left, right) = pair_at(leaves, picked);
            let (start, end) = (flat.leaves[left], flat.leaves[right]);
            if let Some(walk) = self.eligible(flat, start, end) {
                chosen.push((start, end, walk));
            }
        }
        chosen.sort_by_key(|(start, end, _)| (*start, *end));
        chosen
    }
}

/// Leaf positions `(i, j)`, `i < j`, of the `index`-th pair in left-to-right order.
fn pair_at(leaves: usize, index: usize) -> (usize, usize) {
    let row_start = |row: usize| row * (2 * leaves - row - 1) / 2;
    let (mut low, mut high) = (0, leaves - 1);
    while low + 1 < high {
        let mid = (low + high) / 2;
        if row_start(mid) <= index {
            low = mid;
        } else {
            high = mid;
        }
    }
    (low, low + 1 + index - row_start(low))
}

#[derive(Debug, Clone)]
/// Small deterministic RNG used for reproducible pair sampling.
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E3779B97F4A7C15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl rand::RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let bytes = self.next_u64_internal().to_le_bytes();
            let copy_len = (dest.len() - offset).min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::sample_tree;
    use crate::tree::{SyntaxTree, SyntaxTreeBuilder};

    fn wide_tree(leaves: usize) -> SyntaxTree {
        let mut builder = SyntaxTreeBuilder::new("");
        builder.open("block", "", None, 0..0);
        for idx in 0..leaves {
            builder.open("stmt", "", None, 0..0);
            builder.leaf("name", format!("t{idx}"), None, 0..0);
            builder.close();
        }
        builder.close();
        builder.finish().expect("tree")
    }

    fn extractor(max_path_contexts: usize) -> PathExtractor {
        PathExtractor::new(ExtractorConfig {
            max_path_contexts,
            ..ExtractorConfig::default()
        })
    }

    #[test]
    fn enumerates_pairs_left_to_right_through_the_lca() {
        let tree = sample_tree();
        let contexts = extractor(10).extract(tree.root());
        assert_eq!(contexts.len(), 3);

        assert_eq!(contexts[0].start_token, "a");
        assert_eq!(contexts[0].end_token, "b");
        assert_eq!(contexts[0].path.shape(), "ident↑plus↓times↓ident");

        assert_eq!(contexts[1].end_token, "c");
        assert_eq!(contexts[2].start_token, "b");
        assert_eq!(contexts[2].end_token, "c");
        assert_eq!(contexts[2].path.shape(), "ident↑times↓ident");
        assert_eq!(
            contexts[2].path.oriented_nodes(),
            vec![
                ("ident", Some(Direction::Up)),
                ("times", None),
                ("ident", Some(Direction::Down)),
            ]
        );
    }

    #[test]
    fn single_leaf_subtree_yields_nothing() {
        let mut builder = SyntaxTreeBuilder::new("x");
        builder.open("module", "", None, 0..1);
        builder.leaf("name", "x", None, 0..1);
        builder.close();
        let tree = builder.finish().expect("tree");
        assert!(extractor(10).extract(tree.root()).is_empty());
        assert!(extractor(10).extract(tree.node(1)).is_empty());
    }

    #[test]
    fn never_exceeds_the_context_cap() {
        let tree = wide_tree(12);
        for cap in [1, 5, 17, 66, 500] {
            let contexts = extractor(cap).extract(tree.root());
            assert!(contexts.len() <= cap);
            assert_eq!(contexts.len(), cap.min(66));
        }
    }

    #[test]
    fn truncation_keeps_enumeration_prefix() {
        let tree = wide_tree(5);
        let all = extractor(100).extract(tree.root());
        let capped = extractor(4).extract(tree.root());
        assert_eq!(capped.as_slice(), &all[..4]);
        assert!(capped.iter().all(|ctx| ctx.start_token == "t0"));
    }

    #[test]
    fn length_and_width_limits_filter_pairs() {
        let tree = wide_tree(4);
        let narrow = PathExtractor::new(ExtractorConfig {
            max_path_width: Some(1),
            ..ExtractorConfig::default()
        });
        let contexts = narrow.extract(tree.root());
        let pairs: Vec<(String, String)> = contexts
            .iter()
            .map(|ctx| (ctx.start_token.clone(), ctx.end_token.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("t0".to_string(), "t1".to_string()),
                ("t1".to_string(), "t2".to_string()),
                ("t2".to_string(), "t3".to_string()),
            ]
        );

        let short = PathExtractor::new(ExtractorConfig {
            max_path_length: Some(3),
            ..ExtractorConfig::default()
        });
        assert!(short.extract(tree.root()).is_empty());
        assert!(all_lengths(&extractor(100).extract(tree.root()), 4));
    }

    fn all_lengths(contexts: &[PathContext], expected: usize) -> bool {
        contexts.iter().all(|ctx| ctx.path.length() == expected)
    }

    #[test]
    fn sampled_selection_is_deterministic_per_example() {
        let tree = wide_tree(8);
        let sampled = PathExtractor::new(ExtractorConfig {
            max_path_contexts: 6,
            selection: PairSelection::Sampled { seed: 7 },
            ..ExtractorConfig::default()
        });
        let first = sampled.extract_for_example(tree.root(), "a.py", "f", 0);
        let second = sampled.extract_for_example(tree.root(), "a.py", "f", 0);
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);

        let all = extractor(100).extract(tree.root());
        assert!(first.iter().all(|ctx| all.contains(ctx)));
    }

    #[test]
    fn pair_indices_follow_left_to_right_order() {
        for leaves in [2, 3, 7] {
            let mut expected = Vec::new();
            for i in 0..leaves {
                for j in i + 1..leaves {
                    expected.push((i, j));
                }
            }
            let mapped: Vec<(usize, usize)> = (0..expected.len())
                .map(|index| pair_at(leaves, index))
                .collect();
            assert_eq!(mapped, expected);
        }
    }

    #[test]
    fn sampling_from_large_subtrees_draws_only_what_it_needs() {
        let tree = wide_tree(4000);
        let sampled = PathExtractor::new(ExtractorConfig {
            max_path_contexts: 5,
            selection: PairSelection::Sampled { seed: 3 },
            ..ExtractorConfig::default()
        });
        let first = sampled.extract_for_example(tree.root(), "big.py", "big", 0);
        let second = sampled.extract_for_example(tree.root(), "big.py", "big", 0);
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
        let mut distinct: Vec<(&str, &str)> = first
            .iter()
            .map(|ctx| (ctx.start_token.as_str(), ctx.end_token.as_str()))
            .collect();
        distinct.dedup();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn empty_segments_render_around_the_apex() {
        let ascent_only = OrientedPath::new(vec!["name".into()], "call", Vec::new());
        assert_eq!(ascent_only.shape(), "name↑call");
        let descent_only = OrientedPath::new(Vec::new(), "call", vec!["name".into()]);
        assert_eq!(descent_only.shape(), "call↓name");
        assert_eq!(descent_only.length(), 1);
        assert_eq!(
            descent_only.oriented_nodes(),
            vec![("call", None), ("name", Some(Direction::Down))]
        );
    }

    #[test]
    fn zero_caps_are_rejected() {
        assert!(ExtractorConfig::default().validate().is_ok());
        let zero = ExtractorConfig {
            max_path_contexts: 0,
            ..ExtractorConfig::default()
        };
        assert!(matches!(zero.validate(), Err(MinerError::Configuration(_))));
    }
}
