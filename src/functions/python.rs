use crate::parse::Language;
use crate::tree::{Node, SyntaxTree, TreeNode};

use super::{
    EnclosingElementKind, FunctionInfo, FunctionParameter, FunctionSplitter, field_text,
    nearest_enclosing, nodes_of_kinds,
};

const FUNCTION_KINDS: &[&str] = &["function_definition"];
const CLASS_KINDS: &[&str] = &["class_definition"];
const CONSTRUCTOR_NAME: &str = "__init__";

/// Python splitter over tree-sitter trees.
///
/// Python has no modifier keywords, so `modifiers` stays unsupported.
/// Decorators are reported as annotations.
#[derive(Clone, Copy, Debug, Default)]
pub struct PythonFunctionSplitter;

impl FunctionSplitter for PythonFunctionSplitter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn split_into_functions(&self, tree: &SyntaxTree, file_path: &str) -> Vec<FunctionInfo> {
        nodes_of_kinds(tree, FUNCTION_KINDS)
            .into_iter()
            .map(|node| describe(tree, node, file_path))
            .collect()
    }
}

fn describe(tree: &SyntaxTree, node: TreeNode<'_>, file_path: &str) -> FunctionInfo {
    let name = node.child_by_field("name");
    let enclosing = nearest_enclosing(
        &node,
        &[
            (CLASS_KINDS, EnclosingElementKind::Class),
            (FUNCTION_KINDS, EnclosingElementKind::Function),
        ],
    );
    let is_constructor = name.is_some_and(|n| n.text() == CONSTRUCTOR_NAME)
        && enclosing
            .as_ref()
            .is_some_and(|e| e.kind == EnclosingElementKind::Class);
    FunctionInfo::new(Language::Python, file_path, node.index())
        .with_name_node(tree, name.map(|n| n.index()))
        .with_body(node.child_by_field("body").map(|n| n.index()))
        .with_parameters(parameters(&node))
        .with_return_type(field_text(&node, "return_type"))
        .with_annotations(decorators(&node))
        .with_enclosing_element(enclosing)
        .with_is_constructor(is_constructor)
}

fn parameters(function: &TreeNode<'_>) -> Vec<FunctionParameter> {
    let Some(list) = function.child_by_field("parameters") else {
        return Vec::new();
    };
    list.children()
        .into_iter()
        .filter_map(|param| match param.type_label() {
            "identifier" => Some(FunctionParameter {
                name: param.text().to_string(),
                type_name: None,
            }),
            "default_parameter" | "typed_default_parameter" => Some(FunctionParameter {
                name: field_text(&param, "name")?,
                type_name: field_text(&param, "type"),
            }),
            "typed_parameter" => Some(FunctionParameter {
                name: param
                    .children()
                    .into_iter()
                    .find(|child| child.field_name().is_none())
                    .map(|child| child.text().to_string())?,
                type_name: field_text(&param, "type"),
            }),
            "list_splat_pattern" | "dictionary_splat_pattern" => Some(FunctionParameter {
                name: param.text().to_string(),
                type_name: None,
            }),
            _ => None,
        })
        .collect()
}

/// Decorator names of a `decorated_definition` wrapping the function.
fn decorators(function: &TreeNode<'_>) -> Vec<String> {
    function
        .parent()
        .filter(|parent| parent.type_label() == "decorated_definition")
        .map(|parent| {
            parent
                .children_of_kind("decorator")
                .into_iter()
                .map(|decorator| {
                    decorator
                        .text()
                        .trim_start_matches('@')
                        .split('(')
                        .next()
                        .unwrap_or_default()
                        .trim()
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default()
}
