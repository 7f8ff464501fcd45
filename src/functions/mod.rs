//! Function-level splitting of parsed files.
//!
//! Each property of a `FunctionInfo` is a `Capability`: `Unsupported` means the
//! language/parser pairing cannot answer, which is different from a property
//! that is simply absent in the source (`Supported(None)` or an empty list).

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::MinerError;
use crate::parse::{Language, ParserBackend};
use crate::tree::{Node, SyntaxTree, TreeNode};
use crate::types::{NodeIndex, PathString};

mod java;
mod javascript;
mod php;
mod python;

pub use java::JavaFunctionSplitter;
pub use javascript::JavaScriptFunctionSplitter;
pub use php::PhpFunctionSplitter;
pub use python::PythonFunctionSplitter;

/// Result of a property accessor that a splitter may not implement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Capability<T> {
    /// The splitter computed this value.
    Supported(T),
    /// The splitter cannot compute this property.
    Unsupported,
}

impl<T> Capability<T> {
    /// True when the value is available.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }

    /// The value, discarding the unsupported case.
    pub fn supported(self) -> Option<T> {
        match self {
            Self::Supported(value) => Some(value),
            Self::Unsupported => None,
        }
    }

    /// Borrow the inner value.
    pub fn as_ref(&self) -> Capability<&T> {
        match self {
            Self::Supported(value) => Capability::Supported(value),
            Self::Unsupported => Capability::Unsupported,
        }
    }

    /// Transform a supported value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Capability<U> {
        match self {
            Self::Supported(value) => Capability::Supported(f(value)),
            Self::Unsupported => Capability::Unsupported,
        }
    }

    /// The value, or `UnsupportedCapability` naming `property`.
    pub fn ok_or_unsupported(
        self,
        property: &'static str,
        language: Language,
    ) -> Result<T, MinerError> {
        self.supported()
            .ok_or_else(|| MinerError::UnsupportedCapability {
                property,
                language: language.to_string(),
            })
    }
}

/// One declared parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionParameter {
    /// Parameter name as written.
    pub name: String,
    /// Declared type, when the source declares one.
    pub type_name: Option<String>,
}

/// Kind of syntax element enclosing a function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnclosingElementKind {
    /// Class-like declaration (class, interface, enum, trait, record).
    Class,
    /// Free function.
    Function,
    /// Method of a class.
    Method,
    /// Variable the function is assigned to.
    VariableDeclaration,
}

/// Nearest named element around a function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnclosingElement {
    /// Element kind.
    pub kind: EnclosingElementKind,
    /// Element name, when it has one.
    pub name: Option<String>,
    /// Element node in the file tree.
    pub root: NodeIndex,
}

/// Function found in a file tree. Node indices refer to that tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionInfo {
    language: Language,
    file_path: PathString,
    root: NodeIndex,
    name_node: Capability<Option<NodeIndex>>,
    name: Capability<Option<String>>,
    body: Capability<Option<NodeIndex>>,
    parameters: Capability<Vec<FunctionParameter>>,
    return_type: Capability<Option<String>>,
    modifiers: Capability<Vec<String>>,
    annotations: Capability<Vec<String>>,
    enclosing_element: Capability<Option<EnclosingElement>>,
    is_constructor: Capability<bool>,
}

impl FunctionInfo {
    /// Start a function record with every optional property unsupported.
    pub fn new(language: Language, file_path: impl Into<PathString>, root: NodeIndex) -> Self {
        Self {
            language,
            file_path: file_path.into(),
            root,
            name_node: Capability::Unsupported,
            name: Capability::Unsupported,
            body: Capability::Unsupported,
            parameters: Capability::Unsupported,
            return_type: Capability::Unsupported,
            modifiers: Capability::Unsupported,
            annotations: Capability::Unsupported,
            enclosing_element: Capability::Unsupported,
            is_constructor: Capability::Unsupported,
        }
    }

    /// Set the name node; the name itself is read from its source text.
    pub fn with_name_node(mut self, tree: &SyntaxTree, node: Option<NodeIndex>) -> Self {
        self.name = Capability::Supported(node.map(|idx| tree.text_of(idx).to_string()));
        self.name_node = Capability::Supported(node);
        self
    }

    /// Set the body node.
    pub fn with_body(mut self, body: Option<NodeIndex>) -> Self {
        self.body = Capability::Supported(body);
        self
    }

    /// Set the parameter list.
    pub fn with_parameters(mut self, parameters: Vec<FunctionParameter>) -> Self {
        self.parameters = Capability::Supported(parameters);
        self
    }

    /// Set the declared return type.
    pub fn with_return_type(mut self, return_type: Option<String>) -> Self {
        self.return_type = Capability::Supported(return_type);
        self
    }

    /// Set modifier keywords.
    pub fn with_modifiers(mut self, modifiers: Vec<String>) -> Self {
        self.modifiers = Capability::Supported(modifiers);
        self
    }

    /// Set annotation/decorator names.
    pub fn with_annotations(mut self, annotations: Vec<String>) -> Self {
        self.annotations = Capability::Supported(annotations);
        self
    }

    /// Set the enclosing element.
    pub fn with_enclosing_element(mut self, element: Option<EnclosingElement>) -> Self {
        self.enclosing_element = Capability::Supported(element);
        self
    }

    /// Set the constructor flag.
    pub fn with_is_constructor(mut self, is_constructor: bool) -> Self {
        self.is_constructor = Capability::Supported(is_constructor);
        self
    }

    /// Language of the source file.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Source file path.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Function node in the file tree.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Name node, `Supported(None)` for anonymous functions.
    pub fn name_node(&self) -> Capability<Option<NodeIndex>> {
        self.name_node.clone()
    }

    /// Function name as written.
    pub fn name(&self) -> Capability<Option<&str>> {
        self.name.as_ref().map(|name| name.as_deref())
    }

    /// Body node; `Supported(None)` for declarations without a body.
    pub fn body(&self) -> Capability<Option<NodeIndex>> {
        self.body.clone()
    }

    /// Declared parameters.
    pub fn parameters(&self) -> Capability<&[FunctionParameter]> {
        self.parameters.as_ref().map(Vec::as_slice)
    }

    /// Declared return type.
    pub fn return_type(&self) -> Capability<Option<&str>> {
        self.return_type.as_ref().map(|ty| ty.as_deref())
    }

    /// Modifier keywords such as `public` or `static`.
    pub fn modifiers(&self) -> Capability<&[String]> {
        self.modifiers.as_ref().map(Vec::as_slice)
    }

    /// Annotation or decorator names.
    pub fn annotations(&self) -> Capability<&[String]> {
        self.annotations.as_ref().map(Vec::as_slice)
    }

    /// Nearest enclosing class, function or variable.
    pub fn enclosing_element(&self) -> Capability<Option<&EnclosingElement>> {
        self.enclosing_element.as_ref().map(Option::as_ref)
    }

    /// True for constructors.
    pub fn is_constructor(&self) -> Capability<bool> {
        self.is_constructor.clone()
    }

    /// True when there is no body or the body has no children.
    pub fn is_blank(&self, tree: &SyntaxTree) -> Capability<bool> {
        self.body()
            .map(|body| body.is_none_or(|idx| tree.node(idx).is_leaf()))
    }

    /// Dotted file path (without extension) joined with the enclosing element name.
    pub fn qualified_path(&self) -> Capability<String> {
        let stem = self
            .file_path
            .rsplit_once('.')
            .map_or(self.file_path.as_str(), |(stem, _)| stem);
        let dotted = stem.replace(['/', '\\'], ".");
        self.enclosing_element().map(|element| {
            let enclosing = element.and_then(|e| e.name.as_deref()).unwrap_or("");
            format!("{dotted}.{enclosing}")
        })
    }
}

/// Splits a parsed file into functions.
pub trait FunctionSplitter: Send + Sync {
    /// Language this splitter understands.
    fn language(&self) -> Language;
    /// All functions of `tree`, in document order.
    fn split_into_functions(&self, tree: &SyntaxTree, file_path: &str) -> Vec<FunctionInfo>;
}

/// Configuration-time mapping from `(language, parser)` to a splitter.
#[derive(Clone, Default)]
pub struct SplitterRegistry {
    splitters: FxHashMap<(Language, ParserBackend), Arc<dyn FunctionSplitter>>,
}

impl SplitterRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tree-sitter splitters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ParserBackend::TreeSitter, Arc::new(JavaFunctionSplitter));
        registry.register(ParserBackend::TreeSitter, Arc::new(JavaScriptFunctionSplitter));
        registry.register(ParserBackend::TreeSitter, Arc::new(PythonFunctionSplitter));
        registry.register(ParserBackend::TreeSitter, Arc::new(PhpFunctionSplitter));
        registry
    }

    /// Register `splitter` for its language under `backend`, replacing any previous one.
    pub fn register(&mut self, backend: ParserBackend, splitter: Arc<dyn FunctionSplitter>) {
        self.splitters.insert((splitter.language(), backend), splitter);
    }

    /// Splitter for `(language, backend)` or `UnsupportedConfiguration`.
    pub fn resolve(
        &self,
        language: Language,
        backend: ParserBackend,
    ) -> Result<Arc<dyn FunctionSplitter>, MinerError> {
        self.splitters
            .get(&(language, backend))
            .cloned()
            .ok_or_else(|| {
                MinerError::UnsupportedConfiguration(format!(
                    "no function splitter registered for {language} with {backend}"
                ))
            })
    }
}

/// Nodes of `tree` whose type label is in `kinds`, in document order.
pub(crate) fn nodes_of_kinds<'a>(tree: &'a SyntaxTree, kinds: &[&str]) -> Vec<TreeNode<'a>> {
    tree.root()
        .pre_order()
        .into_iter()
        .filter(|node| kinds.contains(&node.type_label()))
        .collect()
}

/// Source text of the `field` child, if present.
pub(crate) fn field_text(node: &TreeNode<'_>, field: &str) -> Option<String> {
    node.child_by_field(field)
        .map(|child| child.text().to_string())
}

/// Nearest ancestor whose type label is in one of the kind groups.
pub(crate) fn nearest_enclosing(
    node: &TreeNode<'_>,
    groups: &[(&[&str], EnclosingElementKind)],
) -> Option<EnclosingElement> {
    node.ancestors().find_map(|ancestor| {
        groups
            .iter()
            .find(|(kinds, _)| kinds.contains(&ancestor.type_label()))
            .map(|(_, kind)| EnclosingElement {
                kind: *kind,
                name: field_text(&ancestor, "name"),
                root: ancestor.index(),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SyntaxTreeBuilder;

    fn tiny_tree() -> SyntaxTree {
        let mut builder = SyntaxTreeBuilder::new("def f(): pass");
        builder.open("function_definition", "", None, 0..13);
        builder.leaf("identifier", "f", Some("name"), 4..5);
        builder.open("block", "", Some("body"), 9..13);
        builder.leaf("pass_statement", "pass", None, 9..13);
        builder.close();
        builder.close();
        builder.finish().expect("tree")
    }

    #[test]
    fn unsupported_is_distinct_from_absent() {
        let tree = tiny_tree();
        let info = FunctionInfo::new(Language::Python, "pkg/mod.py", 0)
            .with_name_node(&tree, Some(1))
            .with_return_type(None);
        assert_eq!(info.name(), Capability::Supported(Some("f")));
        assert_eq!(info.return_type(), Capability::Supported(None));
        assert_eq!(info.modifiers(), Capability::Unsupported);
        let err = info
            .modifiers()
            .ok_or_unsupported("modifiers", Language::Python)
            .unwrap_err();
        assert!(matches!(
            err,
            MinerError::UnsupportedCapability {
                property: "modifiers",
                ..
            }
        ));
    }

    #[test]
    fn blankness_depends_on_body_children() {
        let tree = tiny_tree();
        let with_body = FunctionInfo::new(Language::Python, "a.py", 0).with_body(Some(2));
        assert_eq!(with_body.is_blank(&tree), Capability::Supported(false));
        let abstract_decl = FunctionInfo::new(Language::Java, "A.java", 0).with_body(None);
        assert_eq!(abstract_decl.is_blank(&tree), Capability::Supported(true));
        let unknown = FunctionInfo::new(Language::Java, "A.java", 0);
        assert_eq!(unknown.is_blank(&tree), Capability::Unsupported);
    }

    #[test]
    fn qualified_path_joins_dotted_path_and_enclosing_name() {
        let info = FunctionInfo::new(Language::Java, "src/pkg/Shape.java", 0)
            .with_enclosing_element(Some(EnclosingElement {
                kind: EnclosingElementKind::Class,
                name: Some("Shape".into()),
                root: 0,
            }));
        assert_eq!(
            info.qualified_path(),
            Capability::Supported("src.pkg.Shape.Shape".to_string())
        );
        let free = FunctionInfo::new(Language::Python, "util.py", 0).with_enclosing_element(None);
        assert_eq!(free.qualified_path(), Capability::Supported("util.".to_string()));
    }

    #[test]
    fn registry_fails_fast_for_unregistered_pairs() {
        let empty = SplitterRegistry::new();
        assert!(matches!(
            empty.resolve(Language::Java, ParserBackend::TreeSitter),
            Err(MinerError::UnsupportedConfiguration(_))
        ));
        let defaults = SplitterRegistry::with_defaults();
        for language in Language::ALL {
            let splitter = defaults
                .resolve(language, ParserBackend::TreeSitter)
                .expect("registered");
            assert_eq!(splitter.language(), language);
        }
    }
}
