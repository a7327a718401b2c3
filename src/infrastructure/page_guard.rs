//! 独立标签页守卫
//!
//! 每个文档在自己的标签页里渲染和导出，集合页面不受影响。
//! chromiumoxide 的 Page 没有 Drop 实现，必须显式 close；
//! 守卫在 Drop 时兜底关闭，保证任何退出路径都不会遗留标签页。

use std::ops::Deref;

use chromiumoxide::Page;
use tracing::{debug, warn};

pub struct PageGuard {
    page: Option<Page>,
    label: String,
    runtime_handle: tokio::runtime::Handle,
}

impl PageGuard {
    /// 包装一个新建的标签页，必须在 tokio 运行时内调用
    pub fn new(page: Page, label: impl Into<String>) -> Self {
        Self {
            page: Some(page),
            label: label.into(),
            runtime_handle: tokio::runtime::Handle::current(),
        }
    }

    /// 显式关闭标签页（首选路径）
    pub async fn close(mut self) -> Result<(), chromiumoxide::error::CdpError> {
        if let Some(page) = self.page.take() {
            page.close().await?;
            debug!("标签页已关闭: {}", self.label);
        }
        Ok(())
    }
}

impl Deref for PageGuard {
    type Target = Page;

    fn deref(&self) -> &Self::Target {
        // page 只在 close()/drop 中被取走，两者都消耗守卫
        match self.page.as_ref() {
            Some(page) => page,
            None => unreachable!("PageGuard 已关闭"),
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            let label = std::mem::take(&mut self.label);
            self.runtime_handle.spawn(async move {
                if let Err(e) = page.close().await {
                    warn!("后台关闭标签页失败 ({}): {}", label, e);
                }
            });
        }
    }
}
