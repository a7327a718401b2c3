//! 浏览器自动化边界
//!
//! 流水线只通过 [`HarvestDriver`] 与浏览器打交道：
//! 枚举当前视图、在独立上下文中渲染并导出单个文档、执行一次翻页动作。
//! 真实实现是 [`ChromiumDriver`]，测试中换成内存里的假实现。

use std::fmt::Display;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{AppResult, ExportError};
use crate::models::{DocumentReference, RawLink};

pub mod chromium;
#[cfg(test)]
pub(crate) mod fake;

pub use chromium::ChromiumDriver;

/// 需要浏览器执行动作的翻页策略
///
/// "索引"策略不需要任何动作，因此不在这里。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaginationStrategy {
    /// 滚动到底部，触发懒加载
    Scroll,
    /// 点击"下一页"控件
    ControlElement,
}

impl Display for PaginationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaginationStrategy::Scroll => f.write_str("滚动"),
            PaginationStrategy::ControlElement => f.write_str("下一页按钮"),
        }
    }
}

#[async_trait]
pub trait HarvestDriver: Send + Sync {
    /// 抓取集合视图当前可见的全部候选链接（未过滤）
    async fn enumerate(&self) -> AppResult<Vec<RawLink>>;

    /// 在独立上下文中打开文档、等待稳定并触发导出
    ///
    /// 成功只代表导出命令已下发，不保证文件内容正确。
    async fn render_and_export(&self, reference: &DocumentReference) -> Result<(), ExportError>;

    /// 执行一次翻页动作，返回动作是否真正发生
    /// （滚动位置有变化 / 找到并点击了下一页控件）
    async fn advance_page(&self, strategy: PaginationStrategy) -> AppResult<bool>;

    /// 保存集合视图截图，用于排查"一个文档都找不到"的情况
    async fn capture_diagnostics(&self, _path: &Path) -> AppResult<()> {
        Ok(())
    }
}
