/// Normalized token text carried by a leaf node.
/// Examples: `foo`, `self`, `METHOD_NAME`, `EMPTY`
pub type Token = String;
/// Syntax node type label reported by the parser backend.
/// Examples: `identifier`, `function_definition`, `formal_parameters`
pub type TypeLabel = String;
/// Training label attached to one example; must not contain whitespace.
/// Examples: `getName`, `src/util/io.py`, `handlers`
pub type Label = String;
/// Rendered oriented-path shape used as the path vocabulary key.
/// Example: `identifier↑function_definition↓block↓return_statement`
pub type PathShape = String;
/// File path strings stored alongside labeled results.
/// Example: `repo/src/main/java/App.java`
pub type PathString = String;
/// Integer id assigned by a ranked vocabulary table (first id is 1).
pub type VocabId = u64;
/// Index of a node inside a `SyntaxTree` arena.
pub type NodeIndex = usize;
