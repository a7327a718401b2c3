//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：准备导出目录、获取浏览器和集合页面、设置下载目录
//! 2. **资源管理**：唯一持有 Browser 的模块（交给 [`ChromiumDriver`]）
//! 3. **中断处理**：Ctrl-C 只置位标志，由 [`HarvestRun`] 在安全点收尾
//! 4. **全局统计**：运行结束后输出汇总

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::driver::ChromiumDriver;
use crate::models::RunSummary;
use crate::orchestrator::harvest_run::HarvestRun;
use crate::services::OutputDirectory;
use crate::utils::logging::{log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
    run: HarvestRun<ChromiumDriver>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        OutputDirectory::new(&config.output_dir, &config.output_suffix)
            .ensure_exists()
            .await
            .context("准备导出目录失败")?;

        let (browser, page) = browser::open(&config)
            .await
            .context("获取浏览器失败")?;

        if let Err(e) = browser::route_downloads(&browser, &config.output_dir).await {
            warn!(
                "⚠️ 设置下载目录失败，下载控件导出的文件可能不会出现在导出目录: {}",
                e
            );
        }

        let driver = ChromiumDriver::new(browser, page, &config);
        let run = HarvestRun::new(driver, &config)?;

        Ok(Self { config, run })
    }

    /// 运行应用主逻辑
    pub async fn run(self) -> Result<RunSummary> {
        let Self { config, run } = self;

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("🛑 收到 Ctrl-C，当前文档完成后停止");
                flag.store(true, Ordering::SeqCst);
            }
        });

        let mut run = run.with_cancel_flag(cancel);
        let summary = run.run().await?;

        print_final_stats(&summary, &config);
        Ok(summary)
    }
}
