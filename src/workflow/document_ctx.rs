//! 文档处理上下文
//!
//! 封装"我正在处理第几个文档、是哪个文档"这一信息

use std::fmt::Display;

use crate::models::DocumentReference;

/// 文档处理上下文
#[derive(Debug, Clone)]
pub struct DocumentCtx {
    /// 本次运行中的序号（从1开始，仅用于日志显示）
    pub ordinal: usize,

    /// 目标数量（未配置时为 None）
    pub target: Option<usize>,

    /// 文档引用
    pub reference: DocumentReference,
}

impl DocumentCtx {
    pub fn new(ordinal: usize, target: Option<usize>, reference: DocumentReference) -> Self {
        Self {
            ordinal,
            target,
            reference,
        }
    }

    /// 日志前缀，如 `[文档 3/100]` 或 `[文档 3]`
    pub fn tag(&self) -> String {
        match self.target {
            Some(target) => format!("[文档 {}/{}]", self.ordinal, target),
            None => format!("[文档 {}]", self.ordinal),
        }
    }
}

impl Display for DocumentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} #{}", self.tag(), self.reference.identifier)
    }
}
