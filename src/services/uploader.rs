//! 批量上传服务 - 业务能力层
//!
//! 逐个文件上传到入库接口，每个文件的失败互不影响。
//! 文件之间固定间隔，限制对入库服务的请求速率。

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppResult, UploadError};
use crate::models::{BatchResult, IngestResponse, UploadFailure};
use crate::services::output_dir::file_name_of;
use crate::utils::logging::truncate_text;

/// 单个文件成功入库后的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// 入库服务记录的文件名
    pub stored_as: String,
    pub pages: u32,
}

/// 入库接口客户端
pub struct BatchUploader {
    client: Client,
    endpoint: String,
    item_delay: Duration,
}

impl BatchUploader {
    pub fn new(
        endpoint: impl Into<String>,
        item_delay: Duration,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            item_delay,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.upload_endpoint(),
            config.upload_item_delay(),
            config.upload_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 上传一个批次
    ///
    /// 不会返回错误：每个文件的结果都记录在 [`BatchResult`] 中。
    pub async fn upload(&self, files: &[PathBuf]) -> BatchResult {
        let mut result = BatchResult::default();
        let total = files.len();

        for (index, path) in files.iter().enumerate() {
            let file_name =
                file_name_of(path).unwrap_or_else(|| path.display().to_string());
            info!("  [{}/{}] 正在上传: {}", index + 1, total, file_name);

            match self.upload_one(path, &file_name).await {
                Ok(receipt) => {
                    info!(
                        "    ✓ 上传成功: {}（提取 {} 页）",
                        receipt.stored_as, receipt.pages
                    );
                    result.pages_extracted += u64::from(receipt.pages);
                    result.uploaded_file_names.push(file_name);
                }
                Err(error) => {
                    warn!("    ❌ 上传失败: {}", error);
                    result.errors.push(UploadFailure {
                        file: file_name,
                        error,
                    });
                }
            }

            if index + 1 < total {
                sleep(self.item_delay).await;
            }
        }

        result
    }

    /// 上传单个文件并判定结果
    pub async fn upload_one(
        &self,
        path: &Path,
        file_name: &str,
    ) -> Result<UploadReceipt, UploadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::FileUnreadable {
                reason: format!("{}: {}", path.display(), e),
            })?;
        debug!("{} 大小: {} 字节", file_name, bytes.len());

        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("files", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Transport {
                reason: format!("HTTP {}: {}", status.as_u16(), truncate_text(&body, 200)),
            });
        }

        let body: IngestResponse = response.json().await.map_err(|e| UploadError::Transport {
            reason: format!("响应无法解析: {}", e),
        })?;

        classify(body, file_name)
    }
}

/// 200 响应的判定：成功计数为正即成功，否则取第一条错误作为拒绝原因
fn classify(body: IngestResponse, file_name: &str) -> Result<UploadReceipt, UploadError> {
    if body.success_count > 0 {
        let receipt = match body.uploaded.into_iter().next() {
            Some(doc) if !doc.name.is_empty() => UploadReceipt {
                stored_as: doc.name,
                pages: doc.pages,
            },
            Some(doc) => UploadReceipt {
                stored_as: file_name.to_string(),
                pages: doc.pages,
            },
            None => UploadReceipt {
                stored_as: file_name.to_string(),
                pages: 0,
            },
        };
        return Ok(receipt);
    }
    let reason = body
        .errors
        .into_iter()
        .next()
        .unwrap_or_else(|| "入库服务未报告成功".to_string());
    Err(UploadError::Rejected { reason })
}
