//! 文档导出流程 - 流程层
//!
//! 核心职责：定义"一个文档"的处理流程
//!
//! 流程顺序：
//! 1. 驱动在独立上下文中渲染并导出
//! 2. 失败 → 记录失败文件，继续下一个文档（不中断运行）

use tracing::{error, info, warn};

use crate::driver::HarvestDriver;
use crate::error::ExportError;
use crate::services::FailureWriter;
use crate::utils::logging::truncate_text;
use crate::workflow::document_ctx::DocumentCtx;

/// 单个文档的导出结果
#[derive(Debug)]
pub enum ExportOutcome {
    /// 导出命令已下发
    Exported,
    /// 导出失败（已记录）
    Failed(ExportError),
}

/// 文档导出流程
///
/// - 不持有任何浏览器资源
/// - 不关心翻页和上传
pub struct ExportFlow<'a> {
    failure_writer: &'a FailureWriter,
    verbose_logging: bool,
}

impl<'a> ExportFlow<'a> {
    pub fn new(failure_writer: &'a FailureWriter, verbose_logging: bool) -> Self {
        Self {
            failure_writer,
            verbose_logging,
        }
    }

    pub async fn run<D: HarvestDriver + ?Sized>(
        &self,
        driver: &D,
        ctx: &DocumentCtx,
    ) -> ExportOutcome {
        info!("{} {}", ctx.tag(), truncate_text(&ctx.reference.label, 60));
        if self.verbose_logging {
            info!("{} 地址: {}", ctx.tag(), ctx.reference.locator);
        }

        match driver.render_and_export(&ctx.reference).await {
            Ok(()) => {
                info!("{} ✓ 导出已触发", ctx.tag());
                ExportOutcome::Exported
            }
            Err(e) => {
                error!("{} ❌ 导出失败: {}", ctx.tag(), e);
                if let Err(write_err) =
                    self.failure_writer.record_export(&ctx.reference, &e).await
                {
                    warn!("{} ⚠️ 写入失败记录失败: {}", ctx.tag(), write_err);
                }
                ExportOutcome::Failed(e)
            }
        }
    }
}
