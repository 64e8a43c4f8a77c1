// Model module - 数据模型
// 审计共享的值对象：文件描述、发现、代码度量

pub mod context;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 被分析的单个文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub content: String,
    pub language: String,
    pub line_count: usize,
    pub byte_size: usize,
}

impl FileDescriptor {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        language: Option<String>,
    ) -> Self {
        let name = name.into();
        let content = content.into();
        let language = language
            .or_else(|| crate::analyzer::detect_language(&name).map(str::to_string))
            .unwrap_or_else(|| fallback_language(&name));
        let line_count = content.lines().count();
        let byte_size = content.len();
        Self {
            name,
            content,
            language,
            line_count,
            byte_size,
        }
    }
}

// No mapping for the extension: keep the raw extension as the tag so the
// unsupported-language path can still name it.
fn fallback_language(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "plain".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Style,
    Security,
    Performance,
    Maintainability,
    Correctness,
    Documentation,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Style,
        Category::Security,
        Category::Performance,
        Category::Maintainability,
        Category::Correctness,
        Category::Documentation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Style => "style",
            Category::Security => "security",
            Category::Performance => "performance",
            Category::Maintainability => "maintainability",
            Category::Correctness => "correctness",
            Category::Documentation => "documentation",
        }
    }
}

/// 审计发现结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub rule_id: String,
    pub title: String,
    pub severity: Severity,
    pub category: Category,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        title: impl Into<String>,
        severity: Severity,
        category: Category,
        file: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            rule_id: rule_id.into(),
            title: title.into(),
            severity,
            category,
            file: file.into(),
            line: None,
            column: None,
            message: message.into(),
            remediation: None,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// 每文件派生度量，缺失的度量以 0 表示
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeMetrics {
    pub total_lines: usize,
    pub logical_lines: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub avg_function_length: f64,
    pub max_complexity: u32,
    pub doc_coverage: f64,
    pub import_count: usize,
}
