// Structural analyzer - 基于 tree-sitter 语法树的结构化分析
// 每种语言由一张 LanguageSpec 表描述：哪些节点算函数 / 类 / 导入 / 分支，
// 文档如何识别。树的遍历对所有语言共用一个递归访问器。

use tree_sitter::{Language, Node, Parser};

use crate::analyzer::{
    AnalysisResult, ClassFacts, FunctionFacts, ImportFacts, LanguageAnalyzer, RULE_PARSE_ERROR,
};
use crate::model::{Category, Finding, Severity};

pub const SUPPORTED_LANGUAGES: [&str; 6] =
    ["python", "javascript", "typescript", "rust", "go", "java"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocStyle {
    /// 函数/类体的第一条语句是字符串（Python 风格 docstring）
    LeadingString,
    /// 声明前紧邻注释（C 系语言）
    PrecedingComment,
}

pub(crate) struct LanguageSpec {
    pub name: &'static str,
    pub grammar: fn() -> Language,
    pub function_kinds: &'static [&'static str],
    pub class_kinds: &'static [&'static str],
    pub import_kinds: &'static [&'static str],
    pub branch_kinds: &'static [&'static str],
    /// `&&` / `||` 二元运算符是否计入复杂度
    pub logical_operators: bool,
    pub doc_style: DocStyle,
    pub line_comment: &'static str,
    pub block_comment: Option<(&'static str, &'static str)>,
}

static SPECS: [LanguageSpec; 6] = [
    LanguageSpec {
        name: "python",
        grammar: || tree_sitter_python::LANGUAGE.into(),
        function_kinds: &["function_definition"],
        class_kinds: &["class_definition"],
        import_kinds: &["import_statement", "import_from_statement"],
        branch_kinds: &[
            "if_statement",
            "elif_clause",
            "for_statement",
            "while_statement",
            "except_clause",
            "conditional_expression",
            "boolean_operator",
            "list_comprehension",
            "set_comprehension",
            "dictionary_comprehension",
            "generator_expression",
        ],
        logical_operators: false,
        doc_style: DocStyle::LeadingString,
        line_comment: "#",
        block_comment: None,
    },
    LanguageSpec {
        name: "javascript",
        grammar: || tree_sitter_javascript::LANGUAGE.into(),
        function_kinds: &["function_declaration", "method_definition"],
        class_kinds: &["class_declaration"],
        import_kinds: &["import_statement"],
        branch_kinds: &[
            "if_statement",
            "for_statement",
            "for_in_statement",
            "while_statement",
            "do_statement",
            "switch_case",
            "catch_clause",
            "ternary_expression",
        ],
        logical_operators: true,
        doc_style: DocStyle::PrecedingComment,
        line_comment: "//",
        block_comment: Some(("/*", "*/")),
    },
    LanguageSpec {
        name: "typescript",
        grammar: || tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        function_kinds: &["function_declaration", "method_definition"],
        class_kinds: &["class_declaration"],
        import_kinds: &["import_statement"],
        branch_kinds: &[
            "if_statement",
            "for_statement",
            "for_in_statement",
            "while_statement",
            "do_statement",
            "switch_case",
            "catch_clause",
            "ternary_expression",
        ],
        logical_operators: true,
        doc_style: DocStyle::PrecedingComment,
        line_comment: "//",
        block_comment: Some(("/*", "*/")),
    },
    LanguageSpec {
        name: "rust",
        grammar: || tree_sitter_rust::LANGUAGE.into(),
        function_kinds: &["function_item"],
        class_kinds: &["struct_item", "enum_item", "trait_item"],
        import_kinds: &["use_declaration"],
        branch_kinds: &[
            "if_expression",
            "while_expression",
            "for_expression",
            "match_arm",
        ],
        logical_operators: true,
        doc_style: DocStyle::PrecedingComment,
        line_comment: "//",
        block_comment: Some(("/*", "*/")),
    },
    LanguageSpec {
        name: "go",
        grammar: || tree_sitter_go::LANGUAGE.into(),
        function_kinds: &["function_declaration", "method_declaration"],
        class_kinds: &["type_spec"],
        import_kinds: &["import_spec"],
        branch_kinds: &[
            "if_statement",
            "for_statement",
            "expression_case",
            "type_case",
            "communication_case",
        ],
        logical_operators: true,
        doc_style: DocStyle::PrecedingComment,
        line_comment: "//",
        block_comment: Some(("/*", "*/")),
    },
    LanguageSpec {
        name: "java",
        grammar: || tree_sitter_java::LANGUAGE.into(),
        function_kinds: &["method_declaration", "constructor_declaration"],
        class_kinds: &[
            "class_declaration",
            "interface_declaration",
            "enum_declaration",
        ],
        import_kinds: &["import_declaration"],
        branch_kinds: &[
            "if_statement",
            "for_statement",
            "enhanced_for_statement",
            "while_statement",
            "do_statement",
            "catch_clause",
            "ternary_expression",
        ],
        logical_operators: true,
        doc_style: DocStyle::PrecedingComment,
        line_comment: "//",
        block_comment: Some(("/*", "*/")),
    },
];

pub struct StructuralAnalyzer {
    spec: &'static LanguageSpec,
}

impl StructuralAnalyzer {
    /// 按语言标签创建；未收录的语言返回 None
    pub fn new(language: &str) -> Option<Self> {
        SPECS
            .iter()
            .find(|spec| spec.name == language)
            .map(|spec| Self { spec })
    }
}

/// One analyzer per grammar-backed language.
pub(crate) fn default_analyzers() -> Vec<Box<dyn LanguageAnalyzer>> {
    SPECS
        .iter()
        .map(|spec| Box::new(StructuralAnalyzer { spec }) as Box<dyn LanguageAnalyzer>)
        .collect()
}

impl LanguageAnalyzer for StructuralAnalyzer {
    fn language(&self) -> &str {
        self.spec.name
    }

    fn analyze(&self, content: &str, filename: &str) -> AnalysisResult {
        let mut result = AnalysisResult::default();
        result.metrics.total_lines = content.lines().count();
        result.metrics.logical_lines = logical_line_count(content.lines(), self.spec);

        let mut parser = Parser::new();
        let language = (self.spec.grammar)();
        if parser.set_language(&language).is_err() {
            log::warn!("failed to load grammar for language: {}", self.spec.name);
            result
                .findings
                .push(parse_error_finding(filename, 1, "grammar unavailable"));
            result.finalize_metrics();
            return result;
        }

        let tree = match parser.parse(content, None) {
            Some(tree) => tree,
            None => {
                result
                    .findings
                    .push(parse_error_finding(filename, 1, "parser produced no tree"));
                result.finalize_metrics();
                return result;
            }
        };

        let root = tree.root_node();
        if root.has_error() {
            // 语法错误降级为单个 correctness 发现，度量只保留行数
            let line = first_error_line(root);
            let mut degraded = AnalysisResult::default();
            degraded.metrics.total_lines = result.metrics.total_lines;
            degraded.finalize_metrics();
            degraded.findings.push(parse_error_finding(
                filename,
                line,
                &format!("syntax error near line {}", line),
            ));
            return degraded;
        }

        let mut fn_stack: Vec<usize> = Vec::new();
        visit_node(root, content, self.spec, &mut result, &mut fn_stack);

        let lines: Vec<&str> = content.lines().collect();
        for function in &mut result.functions {
            let start = function.start_line.saturating_sub(1).min(lines.len());
            let end = function.end_line.min(lines.len());
            function.logical_lines =
                logical_line_count(lines[start..end].iter().copied(), self.spec);
        }

        result.finalize_metrics();
        result
    }
}

fn visit_node(
    node: Node,
    content: &str,
    spec: &LanguageSpec,
    out: &mut AnalysisResult,
    fn_stack: &mut Vec<usize>,
) {
    let kind = node.kind();
    let mut entered_function = false;

    if spec.function_kinds.contains(&kind) {
        let name = node_name(&node, content).unwrap_or_else(|| "<anonymous>".to_string());
        out.functions.push(FunctionFacts {
            name,
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            logical_lines: 0, // filled in after the walk
            complexity: 1,
            has_doc: has_doc(&node, spec, content),
        });
        fn_stack.push(out.functions.len() - 1);
        entered_function = true;
    } else if spec.class_kinds.contains(&kind) {
        let name = node_name(&node, content).unwrap_or_else(|| "<anonymous>".to_string());
        out.classes.push(ClassFacts {
            name,
            start_line: node.start_position().row + 1,
            has_doc: has_doc(&node, spec, content),
        });
    } else if spec.import_kinds.contains(&kind) {
        out.imports.push(ImportFacts {
            module: import_text(&node, content),
            line: node.start_position().row + 1,
        });
    } else if spec.branch_kinds.contains(&kind) {
        // 分支只计入最内层函数
        if let Some(&idx) = fn_stack.last() {
            out.functions[idx].complexity += 1;
        }
    } else if spec.logical_operators && kind == "binary_expression" {
        if let Some(op) = node.child_by_field_name("operator") {
            let text = &content[op.byte_range()];
            if text == "&&" || text == "||" {
                if let Some(&idx) = fn_stack.last() {
                    out.functions[idx].complexity += 1;
                }
            }
        }
    }

    for child in node.children(&mut node.walk()) {
        visit_node(child, content, spec, out, fn_stack);
    }

    if entered_function {
        fn_stack.pop();
    }
}

fn node_name(node: &Node, content: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(content[name.byte_range()].to_string());
    }
    // e.g. go's type_spec nests the name one level down
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if let Some(name) = child.child_by_field_name("name") {
            return Some(content[name.byte_range()].to_string());
        }
    }
    None
}

fn import_text(node: &Node, content: &str) -> String {
    let text = content[node.byte_range()]
        .lines()
        .next()
        .unwrap_or("")
        .trim();
    if text.len() > 120 {
        format!("{}...", &text[..120])
    } else {
        text.to_string()
    }
}

fn has_doc(node: &Node, spec: &LanguageSpec, content: &str) -> bool {
    match spec.doc_style {
        DocStyle::LeadingString => {
            let body = match node.child_by_field_name("body") {
                Some(body) => body,
                None => return false,
            };
            let mut cursor = body.walk();
            let result = match body.named_children(&mut cursor).next() {
                Some(stmt) => {
                    stmt.kind() == "expression_statement"
                        && stmt.named_child(0).is_some_and(|c| c.kind() == "string")
                }
                None => false,
            };
            result
        }
        DocStyle::PrecedingComment => preceded_by_comment(node),
    }
}

// Walks up through wrappers (export statements, declaration lists) when the
// node is the first named child, so a comment above the wrapper still counts.
fn preceded_by_comment(node: &Node) -> bool {
    match node.prev_named_sibling() {
        Some(prev) => prev.kind().contains("comment"),
        None => match node.parent() {
            Some(parent) => preceded_by_comment(&parent),
            None => false,
        },
    }
}

fn first_error_line(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return node.start_position().row + 1;
    }
    for child in node.children(&mut node.walk()) {
        if child.has_error() {
            return first_error_line(child);
        }
    }
    node.start_position().row + 1
}

fn parse_error_finding(filename: &str, line: usize, message: &str) -> Finding {
    Finding::new(
        RULE_PARSE_ERROR,
        "Syntax error",
        Severity::Error,
        Category::Correctness,
        filename,
        message,
    )
    .with_line(line)
}

fn logical_line_count<'a>(
    lines: impl Iterator<Item = &'a str>,
    spec: &LanguageSpec,
) -> usize {
    let mut count = 0;
    let mut in_block = false;
    for line in lines {
        let trimmed = line.trim();
        if in_block {
            if let Some((_, close)) = spec.block_comment {
                if trimmed.contains(close) {
                    in_block = false;
                }
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with(spec.line_comment) {
            continue;
        }
        if let Some((open, close)) = spec.block_comment {
            if trimmed.starts_with(open) {
                if !trimmed[open.len()..].contains(close) {
                    in_block = true;
                }
                continue;
            }
        }
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(language: &str, content: &str) -> AnalysisResult {
        StructuralAnalyzer::new(language)
            .unwrap()
            .analyze(content, "test-input")
    }

    #[test]
    fn empty_file_has_zero_lines_and_full_coverage() {
        let result = analyze("python", "");
        assert_eq!(result.metrics.total_lines, 0);
        assert_eq!(result.metrics.function_count, 0);
        assert_eq!(result.metrics.doc_coverage, 1.0);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn plain_function_has_complexity_one() {
        let result = analyze("python", "def plain():\n    return 1\n");
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].complexity, 1);
        assert_eq!(result.functions[0].name, "plain");
    }

    #[test]
    fn sequential_ifs_add_one_each() {
        let source = r#"def branchy(x):
    if x > 1:
        pass
    if x > 2:
        pass
    if x > 3:
        pass
"#;
        let result = analyze("python", source);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].complexity, 4);
        assert_eq!(result.metrics.max_complexity, 4);
    }

    #[test]
    fn nested_function_branches_stay_with_inner() {
        let source = r#"def outer():
    def inner(x):
        if x:
            pass
    return inner
"#;
        let result = analyze("python", source);
        let outer = result.functions.iter().find(|f| f.name == "outer").unwrap();
        let inner = result.functions.iter().find(|f| f.name == "inner").unwrap();
        assert_eq!(outer.complexity, 1);
        assert_eq!(inner.complexity, 2);
    }

    #[test]
    fn python_docstrings_count_toward_coverage() {
        let source = r#"def documented():
    """Does a thing."""
    return 1

def bare():
    return 2
"#;
        let result = analyze("python", source);
        assert_eq!(result.metrics.function_count, 2);
        assert!((result.metrics.doc_coverage - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn python_imports_and_classes_are_counted() {
        let source = r#"import os
from sys import path

class Thing:
    """A thing."""
    def method(self):
        return os.sep
"#;
        let result = analyze("python", source);
        assert_eq!(result.metrics.import_count, 2);
        assert_eq!(result.metrics.class_count, 1);
        assert_eq!(result.metrics.function_count, 1);
        assert!(result.classes[0].has_doc);
    }

    #[test]
    fn broken_source_degrades_to_single_error_finding() {
        let result = analyze("python", "def broken(:\n    pass\n");
        assert_eq!(result.findings.len(), 1);
        let finding = &result.findings[0];
        assert_eq!(finding.rule_id, RULE_PARSE_ERROR);
        assert_eq!(finding.severity, Severity::Error);
        assert_eq!(finding.category, Category::Correctness);
        assert_eq!(result.metrics.function_count, 0);
        assert_eq!(result.metrics.total_lines, 2);
    }

    #[test]
    fn rust_items_are_extracted() {
        let source = r#"use std::fmt;

/// Pair of values.
pub struct Pair {
    a: u32,
}

fn pick(a: u32, b: u32) -> u32 {
    if a > b && b > 0 {
        return a;
    }
    b
}
"#;
        let result = analyze("rust", source);
        assert_eq!(result.metrics.import_count, 1);
        assert_eq!(result.metrics.class_count, 1);
        assert_eq!(result.metrics.function_count, 1);
        assert!(result.classes[0].has_doc);
        // if + && => 1 + 2
        assert_eq!(result.functions[0].complexity, 3);
    }

    #[test]
    fn javascript_functions_and_classes() {
        let source = r#"// helper
function greet(name) {
  return name ? 'hi ' + name : 'hi';
}

class Greeter {}
"#;
        let result = analyze("javascript", source);
        assert_eq!(result.metrics.function_count, 1);
        assert_eq!(result.metrics.class_count, 1);
        assert!(result.functions[0].has_doc);
        // ternary adds one branch
        assert_eq!(result.functions[0].complexity, 2);
    }

    #[test]
    fn go_functions_and_imports() {
        let source = "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tif true {\n\t\tfmt.Println(\"hi\")\n\t}\n}\n";
        let result = analyze("go", source);
        assert_eq!(result.metrics.function_count, 1);
        assert_eq!(result.metrics.import_count, 1);
        assert_eq!(result.functions[0].complexity, 2);
    }

    #[test]
    fn logical_lines_skip_blanks_and_comments() {
        let source = "# comment\n\nx = 1\ny = 2\n";
        let result = analyze("python", source);
        assert_eq!(result.metrics.total_lines, 4);
        assert_eq!(result.metrics.logical_lines, 2);
    }
}
