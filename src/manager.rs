// Context manager - 上下文注册表
// 进程级的审计上下文登记与清理。注册表并发安全；单个上下文仍只被
// 其运行线程修改。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::context::{AuditContext, AuditStatus};
use crate::rules::model::Rule;

pub type SharedContext = Arc<Mutex<AuditContext>>;

/// 列表视图，供编排层展示
#[derive(Debug, Clone, Serialize)]
pub struct ContextSummary {
    pub id: String,
    pub status: AuditStatus,
    pub file_count: usize,
    pub finding_count: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

pub struct ContextManager {
    contexts: Mutex<HashMap<String, SharedContext>>,
}

impl ContextManager {
    pub fn new() -> Self {
        Self {
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// 新建并登记一个上下文
    pub fn create(&self, rules: Vec<Rule>) -> SharedContext {
        let context = Arc::new(Mutex::new(AuditContext::new(rules)));
        self.register(context.clone());
        context
    }

    pub fn register(&self, context: SharedContext) -> String {
        let id = context.lock().unwrap().id.clone();
        self.contexts.lock().unwrap().insert(id.clone(), context);
        tracing::debug!(context = %id, "context registered");
        id
    }

    pub fn get(&self, id: &str) -> Option<SharedContext> {
        self.contexts.lock().unwrap().get(id).cloned()
    }

    /// 按启动时间倒序的摘要列表
    pub fn list(&self) -> Vec<ContextSummary> {
        let contexts = self.contexts.lock().unwrap();
        let mut summaries: Vec<ContextSummary> = contexts
            .values()
            .map(|shared| {
                let ctx = shared.lock().unwrap();
                ContextSummary {
                    id: ctx.id.clone(),
                    status: ctx.status,
                    file_count: ctx.files.len(),
                    finding_count: ctx.findings.len(),
                    started_at: ctx.started_at,
                    finished_at: ctx.finished_at,
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        summaries
    }

    /// 移除一个已结束的上下文；运行中的上下文拒绝移除
    pub fn remove(&self, id: &str) -> Option<SharedContext> {
        let mut contexts = self.contexts.lock().unwrap();
        let still_running = contexts
            .get(id)
            .is_some_and(|shared| shared.lock().unwrap().status == AuditStatus::Running);
        if still_running {
            tracing::warn!(context = %id, "refusing to remove a running context");
            return None;
        }
        contexts.remove(id)
    }

    /// 清理已结束的上下文，保留最近启动的 keep_recent 个。
    /// 运行中的上下文永远不会被清理。
    pub fn clear_completed(&self, keep_recent: usize) -> usize {
        let mut contexts = self.contexts.lock().unwrap();
        let mut finished: Vec<(String, DateTime<Utc>)> = contexts
            .iter()
            .filter(|(_, shared)| shared.lock().unwrap().status != AuditStatus::Running)
            .map(|(id, shared)| (id.clone(), shared.lock().unwrap().started_at))
            .collect();

        finished.sort_by(|a, b| b.1.cmp(&a.1));
        let removable = finished.split_off(keep_recent.min(finished.len()));
        for (id, _) in &removable {
            contexts.remove(id);
        }
        if !removable.is_empty() {
            tracing::info!(removed = removable.len(), "completed contexts cleared");
        }
        removable.len()
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.lock().unwrap().is_empty()
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}
