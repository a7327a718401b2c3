//! 浏览器资源获取
//!
//! 连接已登录的浏览器（默认）或自行启动无头浏览器，
//! 并把下载统一落到导出目录。

pub mod connection;
pub mod headless;

use std::path::Path;

use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::{Browser, Page};
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult, BrowserError};

pub use connection::connect_to_browser_and_page;
pub use headless::launch_headless_browser;

/// 按配置获取浏览器和集合页面
pub async fn open(config: &Config) -> AppResult<(Browser, Page)> {
    if config.headless {
        launch_headless_browser(&config.collection_url, config.chrome_executable.as_deref())
            .await
    } else {
        connect_to_browser_and_page(config.browser_debug_port, Some(&config.collection_url))
            .await
    }
}

/// 让浏览器把所有下载直接保存到 `dir`（不弹出保存对话框）
///
/// `dir` 必须已存在。
pub async fn route_downloads(browser: &Browser, dir: &Path) -> AppResult<()> {
    let absolute = tokio::fs::canonicalize(dir)
        .await
        .map_err(|e| AppError::directory_unavailable(dir.display().to_string(), e))?;

    let params = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(absolute.to_string_lossy().to_string())
        .build()
        .map_err(|reason| AppError::Browser(BrowserError::ConfigurationFailed { reason }))?;

    browser.execute(params).await?;
    info!("📥 下载目录: {}", absolute.display());
    Ok(())
}
