/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs::{self, OpenOptions};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{BatchResult, RunSummary};

/// 初始化日志
///
/// - 先写入日志文件头（覆盖上次运行的内容）
/// - 日志同时输出到终端和 `output_log_file`
/// - `RUST_LOG` 优先；否则按 `verbose_logging` 取 debug / info
pub fn init(config: &Config) -> Result<()> {
    init_log_file(&config.output_log_file)?;

    let file = OpenOptions::new()
        .append(true)
        .open(&config.output_log_file)?;

    let default_level = if config.verbose_logging { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stdout.and(Arc::new(file)))
        .try_init()
        .map_err(|e| anyhow!("初始化日志失败: {}", e))?;

    Ok(())
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n文档采集日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 文档采集与入库");
    info!("🌐 集合页面: {}", config.collection_url);
    info!("📁 导出目录: {}", config.output_dir.display());
    info!("📤 入库接口: {}", config.upload_endpoint());
    info!("📦 每 {} 个文档上传一次", config.batch_size);
    if let Some(target) = config.target_count {
        info!("🎯 目标数量: {}", target);
    }
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号（本次运行内递增）
/// - `files`: 本批文件数
/// - `endpoint`: 入库接口
pub fn log_batch_start(batch_num: usize, files: usize, endpoint: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始上传第 {} 批: {} 个文件", batch_num, files);
    info!("📤 目标: {}", endpoint);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, result: &BatchResult) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 成功 {}/{}，提取 {} 页",
        batch_num,
        result.uploaded_file_names.len(),
        result.attempted(),
        result.pages_extracted
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 扫描页数: {}", summary.pages_scanned);
    info!("📋 处理文档: {}", summary.processed);
    info!("✅ 导出成功: {}", summary.export_attempted);
    info!("❌ 导出失败: {}", summary.failed);
    info!(
        "📤 上传成功: {} (共 {} 批，提取 {} 页)",
        summary.uploaded, summary.upload_batches, summary.pages_extracted
    );
    info!("⚠️ 上传失败: {}", summary.upload_failed);
    if summary.interrupted {
        warn!("🛑 本次运行被中断");
    }
    info!("{}", "=".repeat(60));

    if !summary.upload_errors.is_empty() {
        warn!("上传失败的文件:");
        for failure in &summary.upload_errors {
            warn!("  - {}", failure);
        }
    }
    if summary.failed > 0 || summary.upload_failed > 0 {
        info!("失败记录已保存至: {}", config.failure_log_file);
    }
    info!("\n日志已保存至: {}", config.output_log_file);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_text("爱泼斯坦文件", 4), "爱泼斯坦...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn log_file_header_overwrites_previous_run() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("output.txt");
        std::fs::write(&path, "old content").unwrap();

        init_log_file(path.to_str().unwrap()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("文档采集日志"));
        assert!(!content.contains("old content"));
    }
}
