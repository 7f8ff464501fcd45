use std::path::Path;

use tracing::debug;

use crate::constants::tokens::EMPTY_TOKEN;
use crate::errors::MinerError;
use crate::label::ParseResult;
use crate::tree::{SyntaxTree, SyntaxTreeBuilder};
use crate::utils::normalize_token;

use super::{Language, SourceParser};

/// Tree-sitter backed parser for one language.
///
/// Only named nodes are kept; punctuation and keywords fold into their named
/// parent's span. Comments are dropped. Leaves carry normalized tokens.
#[derive(Clone, Debug)]
pub struct TreeSitterParser {
    language: Language,
    reject_syntax_errors: bool,
}

enum Visit<'t> {
    Enter(tree_sitter::Node<'t>, Option<&'static str>),
    Exit,
}

impl TreeSitterParser {
    /// Parser for `language` that tolerates recoverable syntax errors.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            reject_syntax_errors: false,
        }
    }

    /// Treat trees containing `ERROR`/missing nodes as parse failures.
    pub fn with_reject_syntax_errors(mut self, reject: bool) -> Self {
        self.reject_syntax_errors = reject;
        self
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self.language {
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Php => tree_sitter_php::LANGUAGE_PHP.into(),
        }
    }

    fn failure(path: &Path, reason: impl Into<String>) -> MinerError {
        MinerError::ParseFailure {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn convert(root: tree_sitter::Node<'_>, source: &str) -> Option<SyntaxTree> {
        let mut builder = SyntaxTreeBuilder::new(source);
        let mut stack = vec![Visit::Enter(root, None)];
        while let Some(visit) = stack.pop() {
            let (node, field) = match visit {
                Visit::Exit => {
                    builder.close();
                    continue;
                }
                Visit::Enter(node, field) => (node, field),
            };
            let children = kept_children(node);
            let range = node.byte_range();
            let token = if children.is_empty() {
                let text = source.get(range.clone()).unwrap_or_default();
                normalize_token(text, EMPTY_TOKEN)
            } else {
                String::new()
            };
            builder.open(node.kind(), token, field, range);
            stack.push(Visit::Exit);
            for (child, child_field) in children.into_iter().rev() {
                stack.push(Visit::Enter(child, child_field));
            }
        }
        builder.finish()
    }
}

fn kept_children(node: tree_sitter::Node<'_>) -> Vec<(tree_sitter::Node<'_>, Option<&'static str>)> {
    (0..node.child_count())
        .filter_map(|idx| {
            let child = node.child(idx)?;
            let keep = child.is_named() && !child.kind().contains("comment");
            keep.then(|| (child, node.field_name_for_child(idx as u32)))
        })
        .collect()
}

impl SourceParser for TreeSitterParser {
    fn language(&self) -> Language {
        self.language
    }

    fn parse_source(&self, source: &str, path: &Path) -> Result<ParseResult, MinerError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.grammar())
            .map_err(|err| Self::failure(path, format!("grammar rejected: {err}")))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| Self::failure(path, "parser produced no tree"))?;
        let root = tree.root_node();
        if self.reject_syntax_errors && root.has_error() {
            return Err(Self::failure(path, "source contains syntax errors"));
        }
        let converted = Self::convert(root, source);
        debug!(
            path = %path.display(),
            language = %self.language,
            nodes = converted.as_ref().map_or(0, SyntaxTree::len),
            "parsed source"
        );
        Ok(ParseResult {
            tree: converted,
            file_path: path.to_string_lossy().into_owned(),
            language: self.language,
        })
    }
}
