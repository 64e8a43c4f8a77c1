// Report generation - 报告生成
// JSON：稳定键名的机器可读形态；Markdown：按文件分节的人类可读摘要。

use std::fmt::Write as _;

use serde_json::json;

use crate::error::Result;
use crate::model::context::AuditContext;
use crate::model::{Category, Finding, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
}

pub fn render(context: &AuditContext, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => render_json(context),
        ReportFormat::Markdown => Ok(render_markdown(context)),
    }
}

fn render_json(context: &AuditContext) -> Result<String> {
    // 计数表总是包含全部枚举值，键集跨版本稳定
    let mut severity_counts = serde_json::Map::new();
    for severity in Severity::ALL {
        severity_counts.insert(
            severity.as_str().to_string(),
            json!(context.severity_count(severity)),
        );
    }
    let mut category_counts = serde_json::Map::new();
    for category in Category::ALL {
        category_counts.insert(
            category.as_str().to_string(),
            json!(context.category_count(category)),
        );
    }

    let report = json!({
        "run_id": context.id,
        "status": context.status.as_str(),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "error": context.error,
        "severity_counts": severity_counts,
        "category_counts": category_counts,
        "findings": context.findings,
    });

    Ok(serde_json::to_string_pretty(&report)?)
}

fn render_markdown(context: &AuditContext) -> String {
    let mut out = String::new();
    writeln!(out, "# Audit Report").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "- Run: `{}`", context.id).unwrap();
    writeln!(out, "- Status: {}", context.status.as_str()).unwrap();
    if let Some(error) = &context.error {
        writeln!(out, "- Error: {}", error).unwrap();
    }
    writeln!(out).unwrap();

    writeln!(out, "## Summary").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "| Severity | Count |").unwrap();
    writeln!(out, "|----------|-------|").unwrap();
    for severity in Severity::ALL.iter().rev() {
        writeln!(
            out,
            "| {} | {} |",
            severity.as_str(),
            context.severity_count(*severity)
        )
        .unwrap();
    }
    writeln!(out).unwrap();
    writeln!(out, "| Category | Count |").unwrap();
    writeln!(out, "|----------|-------|").unwrap();
    for category in Category::ALL {
        writeln!(
            out,
            "| {} | {} |",
            category.as_str(),
            context.category_count(category)
        )
        .unwrap();
    }
    writeln!(out).unwrap();

    writeln!(out, "## Files").unwrap();
    for file in &context.files {
        writeln!(out).unwrap();
        writeln!(out, "### {}", file.name).unwrap();
        writeln!(out).unwrap();

        let mut findings: Vec<&Finding> = context
            .findings
            .iter()
            .filter(|f| f.file == file.name)
            .collect();
        if findings.is_empty() {
            writeln!(out, "_No findings._").unwrap();
            continue;
        }
        // 严重度降序，再按行号
        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.line.unwrap_or(0).cmp(&b.line.unwrap_or(0)))
        });
        for finding in findings {
            let location = match finding.line {
                Some(line) => format!(" line {}", line),
                None => String::new(),
            };
            writeln!(
                out,
                "- **{}** [{}]{}: {}",
                finding.severity.as_str(),
                finding.rule_id,
                location,
                finding.message
            )
            .unwrap();
        }
    }
    out
}
