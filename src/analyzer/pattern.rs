// Pattern analyzer - 无语法树语言的行级正则回退分析
// 精度低于结构化分析器，仅近似函数 / 类 / 导入与分支密度。

use regex::Regex;

use crate::analyzer::{AnalysisResult, ClassFacts, FunctionFacts, ImportFacts, LanguageAnalyzer};

pub const SUPPORTED_LANGUAGES: [&str; 5] = ["c", "cpp", "ruby", "php", "shell"];

// Control keywords that look like call signatures in brace languages.
const SIGNATURE_KEYWORDS: [&str; 15] = [
    "if", "else", "elseif", "elsif", "for", "foreach", "while", "until", "switch", "catch",
    "return", "case", "when", "do", "sizeof",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockStyle {
    /// 以花括号深度界定函数体
    Braces,
    /// `def` .. `end`，按缩进匹配（Ruby）
    DefEnd,
}

pub struct PatternAnalyzer {
    language: String,
    function_re: Regex,
    class_re: Option<Regex>,
    import_re: Option<Regex>,
    branch_re: Regex,
    line_comment: &'static str,
    block_style: BlockStyle,
}

impl PatternAnalyzer {
    /// Preset analyzer for one of the bundled fallback languages; any other
    /// tag gets the generic brace-language preset under that name.
    pub fn for_language(language: &str) -> Self {
        match language {
            "c" => Self::brace_language(
                "c",
                None,
                Some(r#"^\s*#\s*include\s*[<"]([^>"]+)[>"]"#),
            ),
            "cpp" => Self::brace_language(
                "cpp",
                Some(r"^\s*(?:template\s*<[^>]*>\s*)?(?:class|struct)\s+([A-Za-z_]\w*)"),
                Some(r#"^\s*#\s*include\s*[<"]([^>"]+)[>"]"#),
            ),
            "php" => Self {
                language: "php".to_string(),
                function_re: Regex::new(r"function\s+&?([A-Za-z_]\w*)\s*\(").unwrap(),
                class_re: Some(
                    Regex::new(r"^\s*(?:abstract\s+|final\s+)?(?:class|interface|trait)\s+([A-Za-z_]\w*)")
                        .unwrap(),
                ),
                import_re: Some(
                    Regex::new(r"^\s*(?:use\s+([\w\\]+)|require(?:_once)?\b|include(?:_once)?\b)")
                        .unwrap(),
                ),
                branch_re: default_branch_re(),
                line_comment: "//",
                block_style: BlockStyle::Braces,
            },
            "shell" => Self {
                language: "shell".to_string(),
                function_re: Regex::new(r"^\s*(?:function\s+)?([A-Za-z_]\w*)\s*\(\)\s*\{?\s*$")
                    .unwrap(),
                class_re: None,
                import_re: Some(Regex::new(r"^\s*(?:source|\.)\s+(\S+)").unwrap()),
                branch_re: default_branch_re(),
                line_comment: "#",
                block_style: BlockStyle::Braces,
            },
            "ruby" => Self {
                language: "ruby".to_string(),
                function_re: Regex::new(r"^\s*def\s+(?:self\.)?([A-Za-z_]\w*[!?=]?)").unwrap(),
                class_re: Some(Regex::new(r"^\s*(?:class|module)\s+([A-Z]\w*)").unwrap()),
                import_re: Some(
                    Regex::new(r#"^\s*require(?:_relative)?\s+['"]([^'"]+)['"]"#).unwrap(),
                ),
                branch_re: default_branch_re(),
                line_comment: "#",
                block_style: BlockStyle::DefEnd,
            },
            other => Self::brace_language(other, None, None),
        }
    }

    fn brace_language(
        language: &str,
        class_re: Option<&str>,
        import_re: Option<&str>,
    ) -> Self {
        Self {
            language: language.to_string(),
            function_re: Regex::new(r"([A-Za-z_]\w*)\s*\(([^;{}]*)\)\s*\{?\s*$").unwrap(),
            class_re: class_re.map(|re| Regex::new(re).unwrap()),
            import_re: import_re.map(|re| Regex::new(re).unwrap()),
            branch_re: default_branch_re(),
            line_comment: "//",
            block_style: BlockStyle::Braces,
        }
    }

    fn is_comment_line(&self, trimmed: &str) -> bool {
        trimmed.starts_with(self.line_comment)
            || trimmed.starts_with("/*")
            || trimmed.starts_with('*')
    }

    // Function extent: brace depth for brace languages, matching `end` at the
    // definition's indent for def/end languages. Falls back to EOF.
    fn function_end(&self, lines: &[&str], start: usize) -> usize {
        match self.block_style {
            BlockStyle::Braces => {
                let mut depth: i32 = 0;
                let mut opened = false;
                for (offset, line) in lines[start..].iter().enumerate() {
                    for ch in line.chars() {
                        match ch {
                            '{' => {
                                depth += 1;
                                opened = true;
                            }
                            '}' => depth -= 1,
                            _ => {}
                        }
                    }
                    if opened && depth <= 0 {
                        return start + offset;
                    }
                }
                lines.len().saturating_sub(1)
            }
            BlockStyle::DefEnd => {
                let indent = indent_width(lines[start]);
                for (offset, line) in lines[start + 1..].iter().enumerate() {
                    let trimmed = line.trim_start();
                    if trimmed.starts_with("end") && indent_width(line) <= indent {
                        return start + 1 + offset;
                    }
                }
                lines.len().saturating_sub(1)
            }
        }
    }
}

fn default_branch_re() -> Regex {
    Regex::new(r"\b(?:if|elsif|elif|for|foreach|while|until|case|when|catch|except|rescue)\b|&&|\|\|")
        .unwrap()
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

impl LanguageAnalyzer for PatternAnalyzer {
    fn language(&self) -> &str {
        &self.language
    }

    fn analyze(&self, content: &str, _filename: &str) -> AnalysisResult {
        let mut result = AnalysisResult::default();
        let lines: Vec<&str> = content.lines().collect();
        result.metrics.total_lines = lines.len();
        result.metrics.logical_lines = lines
            .iter()
            .filter(|line| {
                let trimmed = line.trim();
                !trimmed.is_empty() && !self.is_comment_line(trimmed)
            })
            .count();

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || self.is_comment_line(trimmed) {
                continue;
            }

            if let Some(re) = &self.import_re {
                if let Some(cap) = re.captures(line) {
                    let module = cap
                        .get(1)
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_else(|| trimmed.to_string());
                    result.imports.push(ImportFacts { module, line: i + 1 });
                    continue;
                }
            }

            if let Some(re) = &self.class_re {
                if let Some(cap) = re.captures(line) {
                    result.classes.push(ClassFacts {
                        name: cap[1].to_string(),
                        start_line: i + 1,
                        has_doc: preceded_by_comment(self, &lines, i),
                    });
                    continue;
                }
            }

            let Some(cap) = self.function_re.captures(line) else {
                continue;
            };
            let name = cap[1].to_string();
            if SIGNATURE_KEYWORDS.contains(&name.as_str()) {
                continue;
            }

            let end = self.function_end(&lines, i);
            let body = &lines[i..=end.min(lines.len() - 1)];
            let logical_lines = body
                .iter()
                .filter(|l| {
                    let t = l.trim();
                    !t.is_empty() && !self.is_comment_line(t)
                })
                .count();
            let branches: usize = body
                .iter()
                .filter(|l| !self.is_comment_line(l.trim()))
                .map(|l| self.branch_re.find_iter(l).count())
                .sum();

            result.functions.push(FunctionFacts {
                name,
                start_line: i + 1,
                end_line: end + 1,
                logical_lines,
                complexity: 1 + branches as u32,
                has_doc: preceded_by_comment(self, &lines, i),
            });
        }

        result.finalize_metrics();
        result
    }
}

fn preceded_by_comment(analyzer: &PatternAnalyzer, lines: &[&str], index: usize) -> bool {
    lines[..index]
        .iter()
        .rev()
        .map(|line| line.trim())
        .find(|trimmed| !trimmed.is_empty())
        .is_some_and(|trimmed| {
            analyzer.is_comment_line(trimmed) || trimmed.ends_with("*/")
        })
}

/// One analyzer per bundled fallback language.
pub(crate) fn default_analyzers() -> Vec<Box<dyn LanguageAnalyzer>> {
    SUPPORTED_LANGUAGES
        .iter()
        .map(|language| Box::new(PatternAnalyzer::for_language(language)) as Box<dyn LanguageAnalyzer>)
        .collect()
}
