// File loader - 文件装载协作者
// 引擎本身不做 I/O；装载器把目录变成内存中的 SourceFile 列表。

use anyhow::{bail, Result};
use ignore::Walk;
use std::path::{Path, PathBuf};

use crate::engine::SourceFile;

pub trait FileLoader {
    fn load(&self) -> Result<Vec<SourceFile>>;
}

/// 遍历目录并读取受支持的源码文件，结果按逻辑名排序
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileLoader for DirectoryLoader {
    fn load(&self) -> Result<Vec<SourceFile>> {
        if !self.root.exists() {
            bail!("path '{}' does not exist", self.root.display());
        }

        let mut files = Vec::new();
        for entry in Walk::new(&self.root).flatten() {
            let path = entry.path();
            if !path.is_file() || !is_supported_file(path) {
                continue;
            }
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    let name = path
                        .strip_prefix(&self.root)
                        .unwrap_or(path)
                        .to_string_lossy()
                        .to_string();
                    files.push(SourceFile::new(name, content));
                }
                Err(err) => {
                    tracing::warn!("skipping unreadable file {}: {}", path.display(), err);
                }
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

fn is_supported_file(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        let ext = ext.to_str().unwrap_or("");
        matches!(
            ext,
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "py" | "java" | "rs" | "go"
                | "c" | "h" | "cpp" | "hpp" | "cc" | "rb" | "php" | "sh"
        )
    } else {
        false
    }
}
