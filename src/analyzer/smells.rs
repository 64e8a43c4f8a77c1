// Code smell detection - 代码异味检测
// 对任一分析器产出的事实统一套用阈值，与具体语言无关。

use serde_json::json;

use crate::analyzer::{AnalysisResult, AnalyzerConfig};
use crate::model::{Category, Finding, Severity};

pub const RULE_LONG_FUNCTION: &str = "smell/long-function";
pub const RULE_COMPLEX_FUNCTION: &str = "smell/complex-function";
pub const RULE_LOW_DOC_COVERAGE: &str = "smell/low-doc-coverage";

pub fn detect_smells(
    result: &AnalysisResult,
    config: &AnalyzerConfig,
    filename: &str,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for function in &result.functions {
        if function.logical_lines > config.max_function_lines {
            findings.push(
                Finding::new(
                    RULE_LONG_FUNCTION,
                    "Long function",
                    Severity::Warning,
                    Category::Maintainability,
                    filename,
                    format!(
                        "function '{}' spans {} logical lines (limit {})",
                        function.name, function.logical_lines, config.max_function_lines
                    ),
                )
                .with_line(function.start_line)
                .with_remediation("split the function into smaller units")
                .with_metadata("function", json!(function.name))
                .with_metadata("logical_lines", json!(function.logical_lines)),
            );
        }

        if function.complexity > config.max_complexity {
            findings.push(
                Finding::new(
                    RULE_COMPLEX_FUNCTION,
                    "Complex function",
                    Severity::Warning,
                    Category::Maintainability,
                    filename,
                    format!(
                        "function '{}' has cyclomatic complexity {} (limit {})",
                        function.name, function.complexity, config.max_complexity
                    ),
                )
                .with_line(function.start_line)
                .with_remediation("reduce branching or extract helper functions")
                .with_metadata("function", json!(function.name))
                .with_metadata("complexity", json!(function.complexity)),
            );
        }
    }

    // 文件级：文档覆盖率。没有函数与类时不触发。
    let documented_units = result.functions.len() + result.classes.len();
    if documented_units > 0 && result.metrics.doc_coverage < config.min_doc_coverage {
        findings.push(
            Finding::new(
                RULE_LOW_DOC_COVERAGE,
                "Low documentation coverage",
                Severity::Warning,
                Category::Maintainability,
                filename,
                format!(
                    "documentation coverage {:.2} is below {:.2}",
                    result.metrics.doc_coverage, config.min_doc_coverage
                ),
            )
            .with_remediation("document public functions and classes")
            .with_metadata("doc_coverage", json!(result.metrics.doc_coverage)),
        );
    }

    findings
}
