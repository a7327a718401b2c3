//! 失败记录服务 - 业务能力层
//!
//! 只负责"追加写失败记录"能力，便于之后人工补处理

use std::fs::OpenOptions;
use std::io::Write;

use tracing::debug;

use crate::error::{AppError, AppResult, ExportError};
use crate::models::{DocumentReference, UploadFailure};

/// 失败记录服务
///
/// 每行格式：`时间 | 类别 | 对象 | 原因`
pub struct FailureWriter {
    path: String,
}

impl FailureWriter {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// 记录一个导出失败的文档
    pub async fn record_export(
        &self,
        reference: &DocumentReference,
        error: &ExportError,
    ) -> AppResult<()> {
        let subject = format!("{} ({})", reference.identifier, reference.locator);
        self.append(error.kind(), &subject, &error.to_string())
            .await
    }

    /// 记录一个上传失败的文件
    pub async fn record_upload(&self, failure: &UploadFailure) -> AppResult<()> {
        self.append(
            failure.error.kind(),
            &failure.file,
            &failure.error.to_string(),
        )
        .await
    }

    async fn append(&self, kind: &str, subject: &str, reason: &str) -> AppResult<()> {
        debug!("写入失败记录: {} | {}", kind, subject);

        let line = format!(
            "{} | {} | {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            kind,
            subject,
            reason.replace('\n', " ")
        );

        // 一行一次同步追加，返回时内容已交给操作系统
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::file_write_failed(self.path.clone(), e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| AppError::file_write_failed(self.path.clone(), e))?;

        Ok(())
    }
}
