use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::rules::model::{Rule, RuleSet};

/// 从目录递归加载 YAML 规则文件。
/// 每个文件优先按 RuleSet 解析，失败后再按单条 Rule 解析。
pub fn load_rules_from_dir<P: AsRef<Path>>(path: P) -> Result<Vec<Rule>> {
    let mut rules = Vec::new();

    for entry in WalkDir::new(path) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(extension) = path.extension() else {
            continue;
        };
        if extension != "yaml" && extension != "yml" {
            continue;
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file: {:?}", path))?;

        if let Ok(rule_set) = serde_yaml::from_str::<RuleSet>(&content) {
            rules.extend(rule_set.rules);
        } else if let Ok(rule) = serde_yaml::from_str::<Rule>(&content) {
            rules.push(rule);
        } else {
            tracing::warn!("skipping unparsable rule file: {:?}", path);
        }
    }

    Ok(rules)
}

/// 加载单个标准集文件
pub fn load_rule_set<P: AsRef<Path>>(path: P) -> Result<RuleSet> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read standards file: {:?}", path))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse standards file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RULE_SET: &str = r#"
name: base
version: "1.0"
rules:
  - id: no-todo
    name: No TODO comments
    severity: info
    category: style
    checker: pattern
    pattern: "TODO:"
  - id: file-length
    name: File too long
    severity: warning
    category: maintainability
    checker: length
    max_lines: 400
"#;

    const SINGLE_RULE: &str = r#"
id: max-complexity
name: Function too complex
severity: warning
category: maintainability
checker: complexity
max_complexity: 10
"#;

    #[test]
    fn loads_rule_sets_and_single_rules_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut set_file = fs::File::create(dir.path().join("base.yaml")).unwrap();
        set_file.write_all(RULE_SET.as_bytes()).unwrap();
        let mut rule_file = fs::File::create(dir.path().join("one.yml")).unwrap();
        rule_file.write_all(SINGLE_RULE.as_bytes()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut rules = load_rules_from_dir(dir.path()).unwrap();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        let ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["file-length", "max-complexity", "no-todo"]);
    }

    #[test]
    fn unparsable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.yaml"), ":( not rules").unwrap();
        let rules = load_rules_from_dir(dir.path()).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn load_rule_set_reads_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standards.yaml");
        fs::write(&path, RULE_SET).unwrap();
        let set = load_rule_set(&path).unwrap();
        assert_eq!(set.name, "base");
        assert_eq!(set.rules.len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_rule_set("/nonexistent/standards.yaml").is_err());
    }
}
