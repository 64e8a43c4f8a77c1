// 审计上下文：单次审计运行的聚合状态

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Category, FileDescriptor, Finding, Severity};
use crate::rules::model::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Running,
    Completed,
    Failed,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Running => "running",
            AuditStatus::Completed => "completed",
            AuditStatus::Failed => "failed",
        }
    }
}

/// One audit run. Appended to while `running`, read-only once finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditContext {
    pub id: String,
    pub files: Vec<FileDescriptor>,
    pub findings: Vec<Finding>,
    pub rules: Vec<Rule>,
    pub status: AuditStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditContext {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            files: Vec::new(),
            findings: Vec::new(),
            rules,
            status: AuditStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status != AuditStatus::Running
    }

    pub fn add_file(&mut self, file: FileDescriptor) {
        if self.is_finished() {
            tracing::warn!(context = %self.id, "ignoring file append on finished context");
            return;
        }
        self.files.push(file);
    }

    /// 追加一个发现。发现引用的文件必须已登记在本上下文中。
    pub fn add_finding(&mut self, finding: Finding) {
        if self.is_finished() {
            tracing::warn!(context = %self.id, "ignoring finding append on finished context");
            return;
        }
        debug_assert!(
            self.files.iter().any(|f| f.name == finding.file),
            "finding references unknown file {}",
            finding.file
        );
        self.findings.push(finding);
    }

    pub fn add_findings(&mut self, findings: Vec<Finding>) {
        for finding in findings {
            self.add_finding(finding);
        }
    }

    /// 状态只允许 running → completed 迁移一次
    pub fn complete(&mut self) {
        if self.is_finished() {
            tracing::warn!(context = %self.id, status = self.status.as_str(), "ignoring duplicate completion");
            return;
        }
        self.status = AuditStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// 状态只允许 running → failed 迁移一次
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.is_finished() {
            tracing::warn!(context = %self.id, status = self.status.as_str(), "ignoring duplicate failure");
            return;
        }
        self.status = AuditStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }

    // Read-side filters. Insertion order is preserved within the result.
    pub fn findings_with_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .collect()
    }

    pub fn findings_in_category(&self, category: Category) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.category == category)
            .collect()
    }

    pub fn severity_count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn category_count(&self, category: Category) -> usize {
        self.findings.iter().filter(|f| f.category == category).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_file() -> AuditContext {
        let mut ctx = AuditContext::new(Vec::new());
        ctx.add_file(FileDescriptor::new("a.py", "pass\n", None));
        ctx
    }

    fn finding(severity: Severity) -> Finding {
        Finding::new("r1", "t", severity, Category::Style, "a.py", "m")
    }

    #[test]
    fn new_context_is_running() {
        let ctx = AuditContext::new(Vec::new());
        assert_eq!(ctx.status, AuditStatus::Running);
        assert!(ctx.finished_at.is_none());
        assert!(ctx.error.is_none());
    }

    #[test]
    fn complete_transitions_exactly_once() {
        let mut ctx = context_with_file();
        ctx.complete();
        assert_eq!(ctx.status, AuditStatus::Completed);
        let finished = ctx.finished_at;

        // A later fail() must not move the status backward or forward.
        ctx.fail("too late");
        assert_eq!(ctx.status, AuditStatus::Completed);
        assert_eq!(ctx.finished_at, finished);
        assert!(ctx.error.is_none());
    }

    #[test]
    fn fail_records_terminal_error() {
        let mut ctx = context_with_file();
        ctx.fail("audit cancelled");
        assert_eq!(ctx.status, AuditStatus::Failed);
        assert_eq!(ctx.error.as_deref(), Some("audit cancelled"));
    }

    #[test]
    fn appends_after_finish_are_ignored() {
        let mut ctx = context_with_file();
        ctx.add_finding(finding(Severity::Info));
        ctx.complete();
        ctx.add_finding(finding(Severity::Critical));
        ctx.add_file(FileDescriptor::new("b.py", "", None));
        assert_eq!(ctx.findings.len(), 1);
        assert_eq!(ctx.files.len(), 1);
    }

    #[test]
    fn filters_preserve_insertion_order() {
        let mut ctx = context_with_file();
        let mut first = finding(Severity::Warning);
        first.message = "first".into();
        let mut second = finding(Severity::Warning);
        second.message = "second".into();
        ctx.add_finding(first);
        ctx.add_finding(finding(Severity::Info));
        ctx.add_finding(second);

        let warnings = ctx.findings_with_severity(Severity::Warning);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].message, "first");
        assert_eq!(warnings[1].message, "second");
        assert_eq!(ctx.severity_count(Severity::Info), 1);
    }
}
