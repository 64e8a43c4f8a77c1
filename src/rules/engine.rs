// Rule engine - 规则引擎
// 持有规则与检查器注册表，对单个文件求值。规则在一次运行内只读。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::analyzer::AnalysisResult;
use crate::model::{FileDescriptor, Finding};
use crate::rules::checkers::{Checker, ComplexityChecker, LengthChecker, PatternChecker};
use crate::rules::model::{MergePolicy, Rule, RuleSet};

/// Per-run bookkeeping: configuration errors are reported once per run,
/// not once per file.
#[derive(Debug, Default)]
pub struct RunDiagnostics {
    reported_rules: HashSet<String>,
}

impl RunDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// true when this rule has not been reported yet
    fn first_report(&mut self, rule_id: &str) -> bool {
        self.reported_rules.insert(rule_id.to_string())
    }

    pub fn skipped_rule_count(&self) -> usize {
        self.reported_rules.len()
    }
}

#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    disabled: HashSet<String>,
    checkers: HashMap<String, Arc<dyn Checker>>,
}

impl RuleEngine {
    /// 内建 pattern / length / complexity 三种检查器
    pub fn new() -> Self {
        let mut engine = Self {
            rules: Vec::new(),
            disabled: HashSet::new(),
            checkers: HashMap::new(),
        };
        engine.register_checker(Arc::new(PatternChecker::new()));
        engine.register_checker(Arc::new(LengthChecker));
        engine.register_checker(Arc::new(ComplexityChecker));
        engine
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        let mut engine = Self::new();
        for rule in rules {
            engine.register(rule);
        }
        engine
    }

    /// 按 kind 字符串注册检查器；新增自定义 kind 无需改动引擎
    pub fn register_checker(&mut self, checker: Arc<dyn Checker>) {
        self.checkers.insert(checker.kind().to_string(), checker);
    }

    /// Register one rule. A rule with the same id replaces the old one in
    /// place so evaluation order stays stable.
    pub fn register(&mut self, rule: Rule) {
        validate_rule(&rule);
        if let Some(existing) = self.rules.iter_mut().find(|r| r.id == rule.id) {
            tracing::debug!(rule = %rule.id, "replacing registered rule");
            *existing = rule;
        } else {
            self.rules.push(rule);
        }
    }

    pub fn unregister(&mut self, rule_id: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != rule_id);
        self.disabled.remove(rule_id);
        before != self.rules.len()
    }

    /// 幂等：重复禁用与禁用不存在的规则都是 no-op
    pub fn disable(&mut self, rule_id: &str) {
        self.disabled.insert(rule_id.to_string());
    }

    pub fn enable(&mut self, rule_id: &str) {
        self.disabled.remove(rule_id);
    }

    pub fn is_enabled(&self, rule_id: &str) -> bool {
        !self.disabled.contains(rule_id) && self.rules.iter().any(|r| r.id == rule_id)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// 批量导入标准集
    pub fn load_from_standards(&mut self, standards: &RuleSet, policy: MergePolicy) {
        if policy == MergePolicy::Replace {
            self.rules.clear();
        }
        for rule in &standards.rules {
            self.register(rule.clone());
        }
        // Disable flags only make sense for rules that still exist.
        let known: HashSet<&str> = self.rules.iter().map(|r| r.id.as_str()).collect();
        self.disabled.retain(|id| known.contains(id.as_str()));
        tracing::info!(
            standards = %standards.name,
            rules = self.rules.len(),
            "standards loaded"
        );
    }

    /// 对一个文件求值全部启用规则
    pub fn evaluate(
        &self,
        file: &FileDescriptor,
        analysis: &AnalysisResult,
        diag: &mut RunDiagnostics,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in &self.rules {
            if self.disabled.contains(&rule.id) {
                continue;
            }
            if !rule.applies_to(&file.language) {
                continue;
            }
            match self.checkers.get(&rule.checker) {
                Some(checker) => findings.extend(checker.check(file, analysis, rule)),
                None => {
                    if diag.first_report(&rule.id) {
                        tracing::warn!(
                            rule = %rule.id,
                            kind = %rule.checker,
                            "unknown checker kind, rule skipped"
                        );
                    }
                }
            }
        }
        findings
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_rule(rule: &Rule) {
    let missing = match rule.checker.as_str() {
        "pattern" if rule.pattern.is_none() => Some("pattern"),
        "length" if rule.max_lines.is_none() => Some("max_lines"),
        "complexity" if rule.max_complexity.is_none() => Some("max_complexity"),
        _ => None,
    };
    if let Some(field) = missing {
        tracing::warn!(rule = %rule.id, "rule is missing '{}', it will never fire", field);
    }
}
