//! 运行期去重集合
//!
//! 两个集合都只在单次运行内有效，只增不减，也不落盘。

use std::collections::HashSet;

/// 已交给导出流程的文档标识
#[derive(Debug, Default)]
pub struct IdentifierTracker {
    seen: HashSet<String>,
}

impl IdentifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    /// 返回该标识是否为首次加入
    pub fn add(&mut self, identifier: impl Into<String>) -> bool {
        self.seen.insert(identifier.into())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// 已上传文件的账本
///
/// `uploaded` 只记录入库服务确认成功的文件名；`failed` 记录本次运行中
/// 已经失败过的文件，它们不会在本次运行内重试，也不算已上传，
/// 下一次运行扫描目录时仍会被捡起。
#[derive(Debug, Default)]
pub struct UploadedSet {
    uploaded: HashSet<String>,
    failed: HashSet<String>,
}

impl UploadedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.uploaded.contains(file_name)
    }

    /// 本次运行是否已经尝试过（成功或失败）
    pub fn is_settled(&self, file_name: &str) -> bool {
        self.uploaded.contains(file_name) || self.failed.contains(file_name)
    }

    pub fn mark_uploaded(&mut self, file_name: impl Into<String>) {
        let name = file_name.into();
        self.failed.remove(&name);
        self.uploaded.insert(name);
    }

    pub fn mark_failed(&mut self, file_name: impl Into<String>) {
        let name = file_name.into();
        if !self.uploaded.contains(&name) {
            self.failed.insert(name);
        }
    }

    pub fn len(&self) -> usize {
        self.uploaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty()
    }
}
