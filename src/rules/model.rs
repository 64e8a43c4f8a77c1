use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{Category, Severity};

/// 一条可执行的编码规范规则。
/// checker 字段选择执行它的检查器策略；其余可选字段是检查器参数。
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    pub category: Category,
    pub checker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub match_scope: MatchScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<usize>,
    #[serde(default)]
    pub scope: LengthScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_complexity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// 自定义检查器的附加参数
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, serde_json::Value>,
}

impl Rule {
    pub fn applies_to(&self, language: &str) -> bool {
        match &self.languages {
            Some(languages) => languages.iter().any(|l| l == language),
            None => true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchScope {
    /// 每个匹配行一条发现
    #[default]
    Line,
    /// 全文每个匹配一条发现
    File,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LengthScope {
    #[default]
    File,
    Function,
}

/// 外部标准集表示：规则引擎对其来源（文件 / 图数据库）保持无感
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleSet {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub rules: Vec<Rule>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            rules,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }
}

/// 批量导入时与既有规则的合并策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// 丢弃既有规则，仅保留导入集
    Replace,
    /// 同 id 覆盖，其余保留
    Merge,
}
