// Audit engine - 审计编排
// 单次运行内串行处理文件；并发通过相互独立的上下文表达。

pub mod report;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::analyzer::AnalyzerRegistry;
use crate::error::Result;
use crate::loader::FileLoader;
use crate::manager::ContextManager;
use crate::model::context::AuditContext;
use crate::model::{FileDescriptor, Finding};
use crate::rules::engine::{RuleEngine, RunDiagnostics};
use crate::rules::model::{MergePolicy, RuleSet};

/// 输入元组：(逻辑名, 文本, 可选语言标签)
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
    pub language: Option<String>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// 协作式取消信号，在文件边界检查
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

pub type ProgressCallback = Box<dyn FnMut(usize, usize) + Send>;

#[derive(Default)]
pub struct RunOptions {
    /// 每处理完一个文件同步回调 (completed, total)
    pub progress: Option<ProgressCallback>,
    pub cancel: Option<CancelToken>,
}

pub struct AuditEngine {
    analyzers: Arc<AnalyzerRegistry>,
    rules: RuleEngine,
    manager: Option<Arc<ContextManager>>,
}

impl AuditEngine {
    pub fn new() -> Self {
        Self {
            analyzers: Arc::new(AnalyzerRegistry::with_defaults()),
            rules: RuleEngine::new(),
            manager: None,
        }
    }

    pub fn with_analyzers(mut self, analyzers: AnalyzerRegistry) -> Self {
        self.analyzers = Arc::new(analyzers);
        self
    }

    /// 挂接上下文注册表；运行中的上下文对外可见
    pub fn with_manager(mut self, manager: Arc<ContextManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Engine-level rule engine: custom checkers and standing rules live
    /// here; per-run standards are merged on top of it.
    pub fn rules_mut(&mut self) -> &mut RuleEngine {
        &mut self.rules
    }

    pub fn analyzers(&self) -> &AnalyzerRegistry {
        &self.analyzers
    }

    pub fn run(&self, files: Vec<SourceFile>, standards: &RuleSet) -> AuditContext {
        self.run_with(files, standards, RunOptions::default())
    }

    pub fn run_with(
        &self,
        files: Vec<SourceFile>,
        standards: &RuleSet,
        mut options: RunOptions,
    ) -> AuditContext {
        let rules = self.resolve_rules(standards);
        let shared = self.new_context(&rules);
        let total = files.len();
        let mut diag = RunDiagnostics::new();
        tracing::info!(files = total, standards = %standards.name, "audit run started");

        for (index, source) in files.into_iter().enumerate() {
            if let Some(token) = &options.cancel {
                if token.is_cancelled() {
                    tracing::warn!("audit cancelled after {} of {} files", index, total);
                    let mut ctx = shared.lock().unwrap();
                    ctx.fail("audit cancelled");
                    return ctx.clone();
                }
            }

            let file = FileDescriptor::new(source.name, source.content, source.language);
            let analysis = self.analyzers.analyze_file(&file);
            let rule_findings = rules.evaluate(&file, &analysis, &mut diag);

            {
                let mut ctx = shared.lock().unwrap();
                ctx.add_file(file);
                ctx.add_findings(analysis.findings);
                ctx.add_findings(rule_findings);
            }

            if let Some(progress) = options.progress.as_mut() {
                progress(index + 1, total);
            }
        }

        let mut ctx = shared.lock().unwrap();
        ctx.complete();
        tracing::info!(
            context = %ctx.id,
            findings = ctx.findings.len(),
            "audit run completed"
        );
        ctx.clone()
    }

    /// 通过装载器取文件。装载整体失败是唯一的致命输入错误。
    pub fn run_with_loader(
        &self,
        loader: &dyn FileLoader,
        standards: &RuleSet,
        options: RunOptions,
    ) -> AuditContext {
        match loader.load() {
            Ok(files) => self.run_with(files, standards, options),
            Err(err) => {
                tracing::error!("audit failed, no input resolvable: {}", err);
                let rules = self.resolve_rules(standards);
                let shared = self.new_context(&rules);
                let mut ctx = shared.lock().unwrap();
                ctx.fail(format!("no input resolvable: {err}"));
                ctx.clone()
            }
        }
    }

    /// 单片段低延迟检查，不做上下文登记
    pub fn quick_audit(
        &self,
        snippet: &str,
        language: &str,
        standards: &RuleSet,
    ) -> Vec<Finding> {
        let rules = self.resolve_rules(standards);
        let file = FileDescriptor::new("snippet", snippet, Some(language.to_string()));
        let mut analysis = self.analyzers.analyze_file(&file);
        let mut findings = std::mem::take(&mut analysis.findings);
        findings.extend(rules.evaluate(&file, &analysis, &mut RunDiagnostics::new()));
        findings
    }

    /// 并行运行多个相互独立的审计，每个任务一个上下文
    pub fn run_batch(
        &self,
        jobs: Vec<Vec<SourceFile>>,
        standards: &RuleSet,
    ) -> Vec<AuditContext> {
        jobs.into_par_iter()
            .map(|files| self.run(files, standards))
            .collect()
    }

    pub fn generate_report(
        &self,
        context: &AuditContext,
        format: report::ReportFormat,
    ) -> Result<String> {
        report::render(context, format)
    }

    fn resolve_rules(&self, standards: &RuleSet) -> RuleEngine {
        let mut rules = self.rules.clone();
        rules.load_from_standards(standards, MergePolicy::Merge);
        rules
    }

    fn new_context(&self, rules: &RuleEngine) -> Arc<Mutex<AuditContext>> {
        let shared = Arc::new(Mutex::new(AuditContext::new(rules.rules().to_vec())));
        if let Some(manager) = &self.manager {
            manager.register(shared.clone());
        }
        shared
    }
}

impl Default for AuditEngine {
    fn default() -> Self {
        Self::new()
    }
}
