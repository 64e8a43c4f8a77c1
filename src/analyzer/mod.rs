// Analyzer module - 语言分析器
// 按语言分发的分析策略：结构化（tree-sitter）与模式（正则）两条路径

pub mod pattern;
pub mod smells;
pub mod structural;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{Category, CodeMetrics, FileDescriptor, Finding, Severity};

pub const RULE_PARSE_ERROR: &str = "parse/syntax-error";
pub const RULE_UNSUPPORTED_LANGUAGE: &str = "analyze/unsupported-language";

/// 结构化事实：函数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionFacts {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub logical_lines: usize,
    pub complexity: u32,
    pub has_doc: bool,
}

/// 结构化事实：类 / 类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassFacts {
    pub name: String,
    pub start_line: usize,
    pub has_doc: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFacts {
    pub module: String,
    pub line: usize,
}

/// 单文件分析输出：度量、结构化事实与分析阶段产生的发现
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub metrics: CodeMetrics,
    pub functions: Vec<FunctionFacts>,
    pub classes: Vec<ClassFacts>,
    pub imports: Vec<ImportFacts>,
    pub findings: Vec<Finding>,
}

impl AnalysisResult {
    pub(crate) fn finalize_metrics(&mut self) {
        self.metrics.function_count = self.functions.len();
        self.metrics.class_count = self.classes.len();
        self.metrics.import_count = self.imports.len();
        self.metrics.max_complexity = self
            .functions
            .iter()
            .map(|f| f.complexity)
            .max()
            .unwrap_or(0);
        self.metrics.avg_function_length = if self.functions.is_empty() {
            0.0
        } else {
            self.functions
                .iter()
                .map(|f| f.logical_lines as f64)
                .sum::<f64>()
                / self.functions.len() as f64
        };
        let documented = self.functions.iter().filter(|f| f.has_doc).count()
            + self.classes.iter().filter(|c| c.has_doc).count();
        let total = self.functions.len() + self.classes.len();
        // 没有函数与类时覆盖率定义为 1.0
        self.metrics.doc_coverage = if total == 0 {
            1.0
        } else {
            documented as f64 / total as f64
        };
    }
}

/// All analyzers are infallible: malformed input becomes findings, never errors.
pub trait LanguageAnalyzer: Send + Sync {
    fn language(&self) -> &str;
    fn analyze(&self, content: &str, filename: &str) -> AnalysisResult;
}

/// Map a file name's extension to a language tag.
pub fn detect_language(name: &str) -> Option<&'static str> {
    let ext = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();
    let tag = match ext.as_str() {
        "py" => "python",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "rb" => "ruby",
        "php" => "php",
        "sh" | "bash" => "shell",
        _ => return None,
    };
    Some(tag)
}

/// 代码异味阈值配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub max_function_lines: usize,
    pub max_complexity: u32,
    pub min_doc_coverage: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_function_lines: 50,
            max_complexity: 10,
            min_doc_coverage: 0.5,
        }
    }
}

/// 语言标签到分析器实现的注册表
pub struct AnalyzerRegistry {
    analyzers: HashMap<String, Box<dyn LanguageAnalyzer>>,
    config: AnalyzerConfig,
}

impl AnalyzerRegistry {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            analyzers: HashMap::new(),
            config,
        }
    }

    /// Registry with the baseline strategies: structural analyzers for the
    /// grammar-backed languages, pattern analyzers for the rest.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new(AnalyzerConfig::default());
        for analyzer in structural::default_analyzers() {
            registry.register(analyzer);
        }
        for analyzer in pattern::default_analyzers() {
            registry.register(analyzer);
        }
        registry
    }

    pub fn register(&mut self, analyzer: Box<dyn LanguageAnalyzer>) {
        self.analyzers
            .insert(analyzer.language().to_string(), analyzer);
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AnalyzerConfig) {
        self.config = config;
    }

    pub fn supports(&self, language: &str) -> bool {
        self.analyzers.contains_key(language)
    }

    /// Analyze one file: dispatch by language tag, then apply smell detection
    /// uniformly over whatever facts the strategy produced.
    pub fn analyze_file(&self, file: &FileDescriptor) -> AnalysisResult {
        match self.analyzers.get(&file.language) {
            Some(analyzer) => {
                let mut result = analyzer.analyze(&file.content, &file.name);
                let parse_failed = result
                    .findings
                    .iter()
                    .any(|f| f.rule_id == RULE_PARSE_ERROR);
                if !parse_failed {
                    let smell_findings =
                        smells::detect_smells(&result, &self.config, &file.name);
                    result.findings.extend(smell_findings);
                }
                result
            }
            None => unsupported_result(file),
        }
    }
}

fn unsupported_result(file: &FileDescriptor) -> AnalysisResult {
    let mut result = AnalysisResult::default();
    result.metrics.total_lines = file.line_count;
    result.metrics.doc_coverage = 1.0;
    result.findings.push(
        Finding::new(
            RULE_UNSUPPORTED_LANGUAGE,
            "Unsupported language",
            Severity::Info,
            Category::Correctness,
            &file.name,
            format!("no analyzer registered for language '{}'", file.language),
        )
        .with_metadata(
            "language",
            serde_json::Value::String(file.language.clone()),
        ),
    );
    result
}
