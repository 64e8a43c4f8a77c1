// Checkers - 检查器策略
// 每种 checker kind 一个实现；自定义检查器在启动时按新 kind 字符串注册。

use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::analyzer::AnalysisResult;
use crate::model::{FileDescriptor, Finding};
use crate::rules::model::{LengthScope, MatchScope, Rule};

/// 检查器契约：`(文件, 分析事实, 规则) -> 发现列表`
pub trait Checker: Send + Sync {
    fn kind(&self) -> &str;
    fn check(&self, file: &FileDescriptor, analysis: &AnalysisResult, rule: &Rule)
        -> Vec<Finding>;
}

fn rule_finding(rule: &Rule, file: &FileDescriptor, message: String) -> Finding {
    let mut finding = Finding::new(
        &rule.id,
        &rule.name,
        rule.severity,
        rule.category,
        &file.name,
        message,
    );
    if let Some(remediation) = &rule.remediation {
        finding = finding.with_remediation(remediation.clone());
    }
    finding
}

/// 正则匹配检查器。编译结果按 pattern 缓存，无效的 pattern 只告警一次。
pub struct PatternChecker {
    cache: Mutex<HashMap<String, Option<Regex>>>,
}

impl PatternChecker {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn compiled(&self, rule: &Rule, pattern: &str) -> Option<Regex> {
        let mut cache = self.cache.lock().unwrap();
        cache
            .entry(pattern.to_string())
            .or_insert_with(|| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    tracing::warn!(rule = %rule.id, "invalid pattern, rule skipped: {}", err);
                    None
                }
            })
            .clone()
    }
}

impl Default for PatternChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for PatternChecker {
    fn kind(&self) -> &str {
        "pattern"
    }

    fn check(
        &self,
        file: &FileDescriptor,
        _analysis: &AnalysisResult,
        rule: &Rule,
    ) -> Vec<Finding> {
        let Some(pattern) = &rule.pattern else {
            return Vec::new();
        };
        let Some(regex) = self.compiled(rule, pattern) else {
            return Vec::new();
        };

        let message = if rule.description.is_empty() {
            format!("pattern '{}' matched", pattern)
        } else {
            rule.description.clone()
        };

        let mut findings = Vec::new();
        match rule.match_scope {
            MatchScope::Line => {
                for (i, line) in file.content.lines().enumerate() {
                    if let Some(m) = regex.find(line) {
                        findings.push(
                            rule_finding(rule, file, message.clone())
                                .with_line(i + 1)
                                .with_column(m.start() + 1),
                        );
                    }
                }
            }
            MatchScope::File => {
                for m in regex.find_iter(&file.content) {
                    // Convert byte offset to line/column
                    let prefix = &file.content[..m.start()];
                    let line = prefix.matches('\n').count() + 1;
                    let line_start = prefix.rfind('\n').map(|p| p + 1).unwrap_or(0);
                    findings.push(
                        rule_finding(rule, file, message.clone())
                            .with_line(line)
                            .with_column(m.start() - line_start + 1),
                    );
                }
            }
        }
        findings
    }
}

/// 长度检查器：文件总行数或函数逻辑行数超过阈值
pub struct LengthChecker;

impl Checker for LengthChecker {
    fn kind(&self) -> &str {
        "length"
    }

    fn check(
        &self,
        file: &FileDescriptor,
        analysis: &AnalysisResult,
        rule: &Rule,
    ) -> Vec<Finding> {
        let Some(max_lines) = rule.max_lines else {
            return Vec::new();
        };

        let mut findings = Vec::new();
        match rule.scope {
            LengthScope::File => {
                if analysis.metrics.total_lines > max_lines {
                    findings.push(rule_finding(
                        rule,
                        file,
                        format!(
                            "file spans {} lines (limit {})",
                            analysis.metrics.total_lines, max_lines
                        ),
                    ));
                }
            }
            LengthScope::Function => {
                for function in &analysis.functions {
                    if function.logical_lines > max_lines {
                        findings.push(
                            rule_finding(
                                rule,
                                file,
                                format!(
                                    "function '{}' spans {} logical lines (limit {})",
                                    function.name, function.logical_lines, max_lines
                                ),
                            )
                            .with_line(function.start_line)
                            .with_metadata("function", json!(function.name)),
                        );
                    }
                }
            }
        }
        findings
    }
}

/// 复杂度检查器：按函数比较圈复杂度阈值
pub struct ComplexityChecker;

impl Checker for ComplexityChecker {
    fn kind(&self) -> &str {
        "complexity"
    }

    fn check(
        &self,
        file: &FileDescriptor,
        analysis: &AnalysisResult,
        rule: &Rule,
    ) -> Vec<Finding> {
        let Some(max_complexity) = rule.max_complexity else {
            return Vec::new();
        };

        analysis
            .functions
            .iter()
            .filter(|f| f.complexity > max_complexity)
            .map(|function| {
                rule_finding(
                    rule,
                    file,
                    format!(
                        "function '{}' has cyclomatic complexity {} (limit {})",
                        function.name, function.complexity, max_complexity
                    ),
                )
                .with_line(function.start_line)
                .with_metadata("complexity", json!(function.complexity))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::FunctionFacts;
    use crate::model::{Category, Severity};

    fn rule(checker: &str) -> Rule {
        Rule {
            id: "r1".to_string(),
            name: "Test rule".to_string(),
            description: "test description".to_string(),
            severity: Severity::Warning,
            category: Category::Style,
            checker: checker.to_string(),
            pattern: None,
            match_scope: MatchScope::Line,
            max_lines: None,
            scope: LengthScope::File,
            max_complexity: None,
            languages: None,
            remediation: None,
            params: HashMap::new(),
        }
    }

    fn file(content: &str) -> FileDescriptor {
        FileDescriptor::new("test.py", content, None)
    }

    fn analysis_with_function(logical_lines: usize, complexity: u32) -> AnalysisResult {
        let mut analysis = AnalysisResult::default();
        analysis.functions.push(FunctionFacts {
            name: "f".to_string(),
            start_line: 10,
            end_line: 10 + logical_lines,
            logical_lines,
            complexity,
            has_doc: true,
        });
        analysis.finalize_metrics();
        analysis
    }

    #[test]
    fn pattern_line_scope_reports_each_matching_line() {
        let mut r = rule("pattern");
        r.pattern = Some("TODO:".to_string());
        let f = file("x = 1\n# TODO: fix\ny = 2\n# TODO: later\n");

        let findings = PatternChecker::new().check(&f, &AnalysisResult::default(), &r);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].line, Some(2));
        assert_eq!(findings[0].column, Some(3));
        assert_eq!(findings[1].line, Some(4));
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn pattern_file_scope_reports_each_match() {
        let mut r = rule("pattern");
        r.pattern = Some("eval".to_string());
        r.match_scope = MatchScope::File;
        let f = file("eval(x); eval(y)\n");

        let findings = PatternChecker::new().check(&f, &AnalysisResult::default(), &r);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].column, Some(1));
        assert_eq!(findings[1].column, Some(10));
    }

    #[test]
    fn invalid_pattern_yields_no_findings() {
        let mut r = rule("pattern");
        r.pattern = Some("(unclosed".to_string());
        let f = file("(unclosed\n");
        let checker = PatternChecker::new();
        assert!(checker.check(&f, &AnalysisResult::default(), &r).is_empty());
        // second run hits the cached failure
        assert!(checker.check(&f, &AnalysisResult::default(), &r).is_empty());
    }

    #[test]
    fn length_checker_file_scope() {
        let mut r = rule("length");
        r.max_lines = Some(2);
        let f = file("a\nb\nc\n");
        let mut analysis = AnalysisResult::default();
        analysis.metrics.total_lines = 3;

        let findings = LengthChecker.check(&f, &analysis, &r);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, None);
    }

    #[test]
    fn length_checker_function_scope_reports_offender() {
        let mut r = rule("length");
        r.max_lines = Some(50);
        r.scope = LengthScope::Function;
        let analysis = analysis_with_function(120, 1);

        let findings = LengthChecker.check(&file(""), &analysis, &r);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, Some(10));
    }

    #[test]
    fn complexity_checker_references_function_line() {
        let mut r = rule("complexity");
        r.max_complexity = Some(10);
        let analysis = analysis_with_function(5, 14);

        let findings = ComplexityChecker.check(&file(""), &analysis, &r);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, Some(10));

        let calm = analysis_with_function(5, 3);
        assert!(ComplexityChecker.check(&file(""), &calm, &r).is_empty());
    }

    #[test]
    fn missing_threshold_produces_nothing() {
        let r = rule("length");
        let analysis = analysis_with_function(500, 50);
        assert!(LengthChecker.check(&file(""), &analysis, &r).is_empty());
        assert!(ComplexityChecker.check(&file(""), &analysis, &r).is_empty());
    }
}
