use crate::parse::Language;
use crate::tree::{Node, SyntaxTree, TreeNode};

use super::{
    EnclosingElementKind, FunctionInfo, FunctionParameter, FunctionSplitter, field_text,
    nearest_enclosing, nodes_of_kinds,
};

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "arrow_function",
    "method_definition",
];
const FREE_FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "arrow_function",
];
const CLASS_KINDS: &[&str] = &["class_declaration", "class"];
const METHOD_KINDS: &[&str] = &["method_definition"];
const VARIABLE_KINDS: &[&str] = &["variable_declarator"];
const CONSTRUCTOR_NAME: &str = "constructor";

/// JavaScript splitter over tree-sitter trees.
///
/// JavaScript declares no return types or modifier keywords, and decorators
/// are not tracked, so those properties are unsupported. Anonymous functions
/// bound to a variable or object key take that binding's name.
#[derive(Clone, Copy, Debug, Default)]
pub struct JavaScriptFunctionSplitter;

impl FunctionSplitter for JavaScriptFunctionSplitter {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn split_into_functions(&self, tree: &SyntaxTree, file_path: &str) -> Vec<FunctionInfo> {
        nodes_of_kinds(tree, FUNCTION_KINDS)
            .into_iter()
            .map(|node| describe(tree, node, file_path))
            .collect()
    }
}

fn describe(tree: &SyntaxTree, node: TreeNode<'_>, file_path: &str) -> FunctionInfo {
    let name = name_node(&node);
    let is_constructor = node.type_label() == "method_definition"
        && name.is_some_and(|n| n.text() == CONSTRUCTOR_NAME);
    FunctionInfo::new(Language::JavaScript, file_path, node.index())
        .with_name_node(tree, name.map(|n| n.index()))
        .with_body(node.child_by_field("body").map(|n| n.index()))
        .with_parameters(parameters(&node))
        .with_enclosing_element(nearest_enclosing(
            &node,
            &[
                (CLASS_KINDS, EnclosingElementKind::Class),
                (METHOD_KINDS, EnclosingElementKind::Method),
                (FREE_FUNCTION_KINDS, EnclosingElementKind::Function),
                (VARIABLE_KINDS, EnclosingElementKind::VariableDeclaration),
            ],
        ))
        .with_is_constructor(is_constructor)
}

/// Own `name` field, else the variable or object key the function is bound to.
fn name_node<'a>(function: &TreeNode<'a>) -> Option<TreeNode<'a>> {
    if let Some(name) = function.child_by_field("name") {
        return Some(name);
    }
    let parent = function.parent()?;
    match parent.type_label() {
        "variable_declarator" | "assignment_expression" => parent
            .child_by_field("name")
            .or_else(|| parent.child_by_field("left")),
        "pair" => parent.child_by_field("key"),
        _ => None,
    }
}

fn parameters(function: &TreeNode<'_>) -> Vec<FunctionParameter> {
    if let Some(single) = function.child_by_field("parameter") {
        return vec![FunctionParameter {
            name: single.text().to_string(),
            type_name: None,
        }];
    }
    let Some(list) = function.child_by_field("parameters") else {
        return Vec::new();
    };
    list.children()
        .into_iter()
        .map(|param| {
            let name = match param.type_label() {
                "assignment_pattern" => field_text(&param, "left"),
                _ => None,
            };
            FunctionParameter {
                name: name.unwrap_or_else(|| param.text().to_string()),
                type_name: None,
            }
        })
        .collect()
}
