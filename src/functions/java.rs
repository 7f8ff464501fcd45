use crate::parse::Language;
use crate::tree::{Node, SyntaxTree, TreeNode};

use super::{
    EnclosingElementKind, FunctionInfo, FunctionParameter, FunctionSplitter, field_text,
    nearest_enclosing, nodes_of_kinds,
};

const FUNCTION_KINDS: &[&str] = &["method_declaration", "constructor_declaration"];
const CLASS_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];
const ANNOTATION_KINDS: &[&str] = &["marker_annotation", "annotation"];

/// Java splitter over tree-sitter trees. Every property is supported.
#[derive(Clone, Copy, Debug, Default)]
pub struct JavaFunctionSplitter;

impl FunctionSplitter for JavaFunctionSplitter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn split_into_functions(&self, tree: &SyntaxTree, file_path: &str) -> Vec<FunctionInfo> {
        nodes_of_kinds(tree, FUNCTION_KINDS)
            .into_iter()
            .map(|node| describe(tree, node, file_path))
            .collect()
    }
}

fn describe(tree: &SyntaxTree, node: TreeNode<'_>, file_path: &str) -> FunctionInfo {
    let is_constructor = node.type_label() == "constructor_declaration";
    let modifiers = node.children_of_kind("modifiers").into_iter().next();
    let return_type = if is_constructor {
        None
    } else {
        field_text(&node, "type")
    };
    FunctionInfo::new(Language::Java, file_path, node.index())
        .with_name_node(tree, node.child_by_field("name").map(|n| n.index()))
        .with_body(node.child_by_field("body").map(|n| n.index()))
        .with_parameters(parameters(&node))
        .with_return_type(return_type)
        .with_modifiers(modifiers.map(|m| modifier_keywords(&m)).unwrap_or_default())
        .with_annotations(modifiers.map(|m| annotation_names(&m)).unwrap_or_default())
        .with_enclosing_element(nearest_enclosing(
            &node,
            &[
                (CLASS_KINDS, EnclosingElementKind::Class),
                (FUNCTION_KINDS, EnclosingElementKind::Method),
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
        .filter_map(|param| match param.type_label() {
            "formal_parameter" => Some(FunctionParameter {
                name: field_text(&param, "name")?,
                type_name: field_text(&param, "type"),
            }),
            "spread_parameter" => {
                let declarator = param.children_of_kind("variable_declarator").into_iter().next()?;
                let type_name = param
                    .children()
                    .into_iter()
                    .find(|child| {
                        child.type_label() != "variable_declarator"
                            && child.type_label() != "modifiers"
                    })
                    .map(|child| format!("{}...", child.text()));
                Some(FunctionParameter {
                    name: field_text(&declarator, "name")?,
                    type_name,
                })
            }
            _ => None,
        })
        .collect()
}

/// Keyword modifiers, i.e. the `modifiers` text with annotations cut out.
fn modifier_keywords(modifiers: &TreeNode<'_>) -> Vec<String> {
    let mut text = modifiers.text().to_string();
    for annotation in annotations_of(modifiers) {
        text = text.replacen(annotation.text(), " ", 1);
    }
    text.split_whitespace().map(str::to_string).collect()
}

fn annotation_names(modifiers: &TreeNode<'_>) -> Vec<String> {
    annotations_of(modifiers)
        .into_iter()
        .filter_map(|annotation| field_text(&annotation, "name"))
        .collect()
}

fn annotations_of<'a>(modifiers: &TreeNode<'a>) -> Vec<TreeNode<'a>> {
    modifiers
        .children()
        .into_iter()
        .filter(|child| ANNOTATION_KINDS.contains(&child.type_label()))
        .collect()
}
