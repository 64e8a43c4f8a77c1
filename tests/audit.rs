// End-to-end pipeline tests: files + standards in, findings + report out.

use std::collections::HashMap;

use codeaudit_core::{
    AnalyzerConfig, AnalyzerRegistry, AuditEngine, AuditStatus, Category, LengthScope, MatchScope,
    ReportFormat, Rule, RuleSet, Severity, SourceFile,
};

fn rule(id: &str, checker: &str) -> Rule {
    Rule {
        id: id.to_string(),
        name: format!("rule {id}"),
        description: format!("description of {id}"),
        severity: Severity::Warning,
        category: Category::Maintainability,
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

fn pattern_rule(id: &str, pattern: &str, severity: Severity, category: Category) -> Rule {
    let mut r = rule(id, "pattern");
    r.pattern = Some(pattern.to_string());
    r.severity = severity;
    r.category = category;
    r
}

// Analyzer with thresholds high enough that no smell findings interfere.
fn quiet_analyzers() -> AnalyzerRegistry {
    let mut analyzers = AnalyzerRegistry::with_defaults();
    analyzers.set_config(AnalyzerConfig {
        max_function_lines: 100_000,
        max_complexity: 100_000,
        min_doc_coverage: 0.0,
    });
    analyzers
}

#[test]
fn empty_file_with_no_rules_completes_clean() {
    let engine = AuditEngine::new();
    let ctx = engine.run(
        vec![SourceFile::new("empty.py", "")],
        &RuleSet::empty("none"),
    );

    assert_eq!(ctx.status, AuditStatus::Completed);
    assert!(ctx.findings.is_empty());
    assert_eq!(ctx.files.len(), 1);
    assert_eq!(ctx.files[0].line_count, 0);
}

#[test]
fn malformed_file_never_fails_the_run() {
    let engine = AuditEngine::new();
    let files = vec![
        SourceFile::new("broken.py", "def broken(:\n    pass\n"),
        SourceFile::new("fine.py", "x = 1\n"),
    ];
    let ctx = engine.run(files, &RuleSet::empty("none"));

    assert_eq!(ctx.status, AuditStatus::Completed);
    let parse_errors: Vec<_> = ctx
        .findings
        .iter()
        .filter(|f| f.rule_id == "parse/syntax-error")
        .collect();
    assert_eq!(parse_errors.len(), 1);
    assert_eq!(parse_errors[0].file, "broken.py");
    assert_eq!(parse_errors[0].severity, Severity::Error);
    assert_eq!(parse_errors[0].category, Category::Correctness);
}

#[test]
fn long_function_trips_the_length_rule_once() {
    let mut source = String::from("def megafunction():\n    \"\"\"Big.\"\"\"\n");
    for i in 0..120 {
        source.push_str(&format!("    x{i} = {i}\n"));
    }

    let mut length_rule = rule("max-func-length", "length");
    length_rule.max_lines = Some(50);
    length_rule.scope = LengthScope::Function;
    let standards = RuleSet::new("limits", vec![length_rule]);

    let engine = AuditEngine::new().with_analyzers(quiet_analyzers());
    let ctx = engine.run(vec![SourceFile::new("mega.py", source)], &standards);

    assert_eq!(ctx.status, AuditStatus::Completed);
    assert_eq!(ctx.findings.len(), 1);
    let finding = &ctx.findings[0];
    assert_eq!(finding.rule_id, "max-func-length");
    assert_eq!(finding.category, Category::Maintainability);
    assert_eq!(finding.line, Some(1));
}

#[test]
fn pattern_rule_attributes_finding_to_second_file() {
    let standards = RuleSet::new(
        "patterns",
        vec![pattern_rule(
            "no-eval",
            r"\beval\(",
            Severity::Critical,
            Category::Security,
        )],
    );
    let engine = AuditEngine::new().with_analyzers(quiet_analyzers());
    let files = vec![
        SourceFile::new("first.py", "x = 1\n"),
        SourceFile::new("second.py", "y = eval(raw)\n"),
    ];
    let ctx = engine.run(files, &standards);

    assert_eq!(ctx.findings.len(), 1);
    assert_eq!(ctx.findings[0].file, "second.py");
    assert_eq!(ctx.findings[0].line, Some(1));
}

#[test]
fn repeated_runs_are_deterministic() {
    let standards = RuleSet::new(
        "mixed",
        vec![
            pattern_rule("no-todo", "TODO:", Severity::Info, Category::Style),
            pattern_rule("no-eval", r"\beval\(", Severity::Critical, Category::Security),
        ],
    );
    let files = vec![
        SourceFile::new("a.py", "# TODO: a\nx = eval(s)\n"),
        SourceFile::new("b.py", "# TODO: b1\n# TODO: b2\n"),
        SourceFile::new("broken.py", "def broken(:\n"),
    ];

    let engine = AuditEngine::new();
    let snapshot = |files: Vec<SourceFile>| {
        let ctx = engine.run(files, &standards);
        let mut keys: Vec<(String, String, Option<usize>, Severity)> = ctx
            .findings
            .iter()
            .map(|f| (f.rule_id.clone(), f.file.clone(), f.line, f.severity))
            .collect();
        keys.sort_by(|a, b| {
            b.3.cmp(&a.3)
                .then_with(|| a.0.cmp(&b.0))
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });
        keys
    };

    let first = snapshot(files.clone());
    let second = snapshot(files);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn json_report_counts_round_trip() {
    let standards = RuleSet::new(
        "mixed",
        vec![
            pattern_rule("no-todo", "TODO:", Severity::Info, Category::Style),
            pattern_rule("no-eval", r"\beval\(", Severity::Critical, Category::Security),
        ],
    );
    let files = vec![
        SourceFile::new("a.py", "# TODO: a\nx = eval(s)\n"),
        SourceFile::new("broken.py", "def broken(:\n"),
    ];
    let engine = AuditEngine::new();
    let ctx = engine.run(files, &standards);
    let report = engine.generate_report(&ctx, ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();

    let findings = value["findings"].as_array().unwrap();
    assert_eq!(findings.len(), ctx.findings.len());

    let mut severity_counts: HashMap<String, u64> = HashMap::new();
    let mut category_counts: HashMap<String, u64> = HashMap::new();
    for finding in findings {
        *severity_counts
            .entry(finding["severity"].as_str().unwrap().to_string())
            .or_default() += 1;
        *category_counts
            .entry(finding["category"].as_str().unwrap().to_string())
            .or_default() += 1;
    }

    for (severity, count) in value["severity_counts"].as_object().unwrap() {
        assert_eq!(
            severity_counts.get(severity).copied().unwrap_or(0),
            count.as_u64().unwrap(),
            "severity {severity}"
        );
    }
    for (category, count) in value["category_counts"].as_object().unwrap() {
        assert_eq!(
            category_counts.get(category).copied().unwrap_or(0),
            count.as_u64().unwrap(),
            "category {category}"
        );
    }
}

#[test]
fn unsupported_language_is_informational_only() {
    let engine = AuditEngine::new();
    let files = vec![SourceFile::new("query.sql", "SELECT 1;\n")];
    let ctx = engine.run(files, &RuleSet::empty("none"));

    assert_eq!(ctx.status, AuditStatus::Completed);
    assert_eq!(ctx.findings.len(), 1);
    assert_eq!(ctx.findings[0].rule_id, "analyze/unsupported-language");
    assert_eq!(ctx.findings[0].severity, Severity::Info);
}

#[test]
fn smells_and_rules_compose_in_one_run() {
    // 12 sequential ifs push complexity past the default threshold of 10.
    let mut source = String::from("def twisty(x):\n");
    for i in 0..12 {
        source.push_str(&format!("    if x > {i}:\n        x -= 1\n"));
    }

    let standards = RuleSet::new(
        "mixed",
        vec![pattern_rule("no-todo", "TODO:", Severity::Info, Category::Style)],
    );
    let engine = AuditEngine::new();
    let ctx = engine.run(
        vec![SourceFile::new("twisty.py", source + "# TODO: untangle\n")],
        &standards,
    );

    assert_eq!(ctx.status, AuditStatus::Completed);
    let rule_ids: Vec<&str> = ctx.findings.iter().map(|f| f.rule_id.as_str()).collect();
    assert!(rule_ids.contains(&"smell/complex-function"));
    assert!(rule_ids.contains(&"smell/low-doc-coverage"));
    assert!(rule_ids.contains(&"no-todo"));
}
