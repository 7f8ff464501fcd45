use crate::parse::Language;
use crate::tree::{Node, SyntaxTree, TreeNode};

use super::{
    EnclosingElementKind, FunctionInfo, FunctionParameter, FunctionSplitter, field_text,
    nearest_enclosing, nodes_of_kinds,
};

const FUNCTION_KINDS: &[&str] = &["function_definition", "method_declaration"];
const CLASS_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "trait_declaration",
    "enum_declaration",
];
const METHOD_KINDS: &[&str] = &["method_declaration"];
const FREE_FUNCTION_KINDS: &[&str] = &["function_definition"];
const PARAMETER_KINDS: &[&str] = &[
    "simple_parameter",
    "variadic_parameter",
    "property_promotion_parameter",
];
const CONSTRUCTOR_NAME: &str = "__construct";

/// PHP splitter over tree-sitter trees.
///
/// Attributes are not tracked, so `annotations` is unsupported.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhpFunctionSplitter;

impl FunctionSplitter for PhpFunctionSplitter {
    fn language(&self) -> Language {
        Language::Php
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
    let is_constructor = node.type_label() == "method_declaration"
        && name.is_some_and(|n| n.text().eq_ignore_ascii_case(CONSTRUCTOR_NAME));
    let modifiers = node
        .children()
        .into_iter()
        .filter(|child| child.type_label().ends_with("_modifier"))
        .map(|child| child.text().to_string())
        .collect();
    FunctionInfo::new(Language::Php, file_path, node.index())
        .with_name_node(tree, name.map(|n| n.index()))
        .with_body(node.child_by_field("body").map(|n| n.index()))
        .with_parameters(parameters(&node))
        .with_return_type(field_text(&node, "return_type"))
        .with_modifiers(modifiers)
        .with_enclosing_element(nearest_enclosing(
            &node,
            &[
                (CLASS_KINDS, EnclosingElementKind::Class),
                (METHOD_KINDS, EnclosingElementKind::Method),
                (FREE_FUNCTION_KINDS, EnclosingElementKind::Function),
            ],
        ))
        .with_is_constructor(is_constructor)
}

fn parameters(function: &TreeNode<'_>) -> Vec<FunctionParameter> {
    let Some(list) = function.child_by_field("parameters") else {
        return Vec::new();
    };
    list.children()
        .into_iter()
        .filter(|param| PARAMETER_KINDS.contains(&param.type_label()))
        .filter_map(|param| {
            Some(FunctionParameter {
                name: field_text(&param, "name")?,
                type_name: field_text(&param, "type"),
            })
        })
        .collect()
}
