use std::path::Path;

use serde::Serialize;
use tree_sitter::Parser;

use crate::error::{MakeError, MakeResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceDeclarations {
    pub package: String,
    pub types: Vec<String>,
}

impl SourceDeclarations {
    pub fn class_names(&self) -> Vec<String> {
        self.types
            .iter()
            .map(|t| {
                if self.package.is_empty() {
                    t.clone()
                } else {
                    format!("{}/{t}", self.package)
                }
            })
            .collect()
    }
}

pub fn parse_declarations(source: &str) -> Option<SourceDeclarations> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .ok()?;
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();
    let bytes = source.as_bytes();

    let mut out = SourceDeclarations::default();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "package_declaration" => {
                out.package = extract_package(&child, bytes).replace('.', "/");
            }
            "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration" => {
                if let Some(name) = child.child_by_field_name("name") {
                    out.types.push(node_text(&name, bytes).to_string());
                }
            }
            _ => {}
        }
    }
    Some(out)
}

/// Top-level classes `path` is expected to produce. `package-info.java` and
/// `module-info.java` produce none the project tracks.
pub fn expected_classes(path: &Path) -> MakeResult<Vec<String>> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if file_name == "package-info.java" || file_name == "module-info.java" {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path).map_err(|e| MakeError::io(path, e))?;
    Ok(parse_declarations(&text)
        .map(|d| d.class_names())
        .unwrap_or_default())
}

fn extract_package(node: &tree_sitter::Node, source: &[u8]) -> String {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "scoped_identifier" || child.kind() == "identifier" {
            return node_text(&child, source).to_string();
        }
    }
    String::new()
}

fn node_text<'a>(node: &tree_sitter::Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}
