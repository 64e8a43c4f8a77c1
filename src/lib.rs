// CodeAudit Core Library
// 核心功能库，包含语言分析器、规则引擎、审计编排与报告生成

mod analyzer;
mod engine;
mod loader;
mod manager;
mod model;
mod rules;

// 重新导出常用类型
pub use analyzer::pattern::PatternAnalyzer;
pub use analyzer::smells::{RULE_COMPLEX_FUNCTION, RULE_LONG_FUNCTION, RULE_LOW_DOC_COVERAGE};
pub use analyzer::structural::StructuralAnalyzer;
pub use analyzer::{
    detect_language, AnalysisResult, AnalyzerConfig, AnalyzerRegistry, ClassFacts, FunctionFacts,
    ImportFacts, LanguageAnalyzer, RULE_PARSE_ERROR, RULE_UNSUPPORTED_LANGUAGE,
};
pub use engine::report::ReportFormat;
pub use engine::{AuditEngine, CancelToken, RunOptions, SourceFile};
pub use loader::{DirectoryLoader, FileLoader};
pub use manager::{ContextManager, ContextSummary, SharedContext};
pub use model::context::{AuditContext, AuditStatus};
pub use model::{Category, CodeMetrics, FileDescriptor, Finding, Severity};

// 规则系统
pub use rules::checkers::Checker;
pub use rules::engine::{RuleEngine, RunDiagnostics};
pub use rules::loader::{load_rule_set, load_rules_from_dir};
pub use rules::model::{LengthScope, MatchScope, MergePolicy, Rule, RuleSet};

pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum AuditError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Report error: {0}")]
        Report(#[from] serde_json::Error),

        #[error("Standards error: {0}")]
        Standards(String),

        #[error("Audit error: {0}")]
        Audit(String),
    }

    pub type Result<T> = std::result::Result<T, AuditError>;
}
