//! 文档枚举服务 - 业务能力层
//!
//! 把驱动返回的原始链接过滤成文档引用，过滤掉导航栏等非文档条目。

use std::collections::HashSet;
use std::time::Duration;

use regex::Regex;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::Config;
use crate::driver::HarvestDriver;
use crate::error::{AppError, AppResult, ConfigError};
use crate::models::{DocumentReference, RawLink};

/// 文档链接过滤规则
///
/// - 路径中包含标记段（如 `/document/<id>`）时，标识取标记后的那一段
/// - 否则若链接或标题以指定后缀结尾（如 `.pdf`），标识取链接的最后一段
/// - 配置了后缀时，两种情况都必须满足后缀匹配
#[derive(Debug, Clone)]
pub struct DocumentFilter {
    marker: Regex,
    suffix: Option<String>,
}

impl DocumentFilter {
    pub fn new(path_marker: &str, suffix: Option<&str>) -> AppResult<Self> {
        let pattern = format!("{}([^/?#]+)", regex::escape(path_marker));
        let marker = Regex::new(&pattern).map_err(|_| {
            AppError::Config(ConfigError::InvalidValue {
                field: "document_path_marker".to_string(),
                value: path_marker.to_string(),
                expected: "可用于匹配的路径片段".to_string(),
            })
        })?;
        let suffix = suffix
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty());
        Ok(Self { marker, suffix })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            &config.document_path_marker,
            config.document_suffix.as_deref(),
        )
    }

    /// 判断一个原始链接是否为文档，是则生成文档引用
    pub fn identify(&self, link: &RawLink) -> Option<DocumentReference> {
        let path = strip_query(&link.href);
        let suffix_ok = match &self.suffix {
            Some(suffix) => {
                path.to_ascii_lowercase().ends_with(suffix.as_str())
                    || link.text.to_ascii_lowercase().ends_with(suffix.as_str())
            }
            None => true,
        };
        if !suffix_ok {
            return None;
        }

        let identifier = match self.marker.captures(path) {
            Some(caps) => caps.get(1)?.as_str().to_string(),
            None if self.suffix.is_some() => last_segment(path)?.to_string(),
            None => return None,
        };

        let label = if link.text.is_empty() {
            identifier.clone()
        } else {
            link.text.clone()
        };
        Some(DocumentReference::new(identifier, link.href.clone(), label))
    }
}

fn strip_query(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

fn last_segment(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
}

/// 文档枚举服务
pub struct DocumentEnumerator {
    filter: DocumentFilter,
    retry_delay: Duration,
}

impl DocumentEnumerator {
    pub fn new(filter: DocumentFilter, retry_delay: Duration) -> Self {
        Self {
            filter,
            retry_delay,
        }
    }

    /// 扫描当前视图；同一次扫描内按标识去重，保持页面顺序
    pub async fn scan<D: HarvestDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> AppResult<Vec<DocumentReference>> {
        let raw = driver.enumerate().await?;
        let total = raw.len();
        let mut seen = HashSet::new();
        let references: Vec<DocumentReference> = raw
            .iter()
            .filter_map(|link| self.filter.identify(link))
            .filter(|r| seen.insert(r.identifier.clone()))
            .collect();
        debug!("扫描到 {} 个链接，其中 {} 个文档", total, references.len());
        Ok(references)
    }

    /// 扫描为空时等待更久再试一次，仍为空才交给调用方判断是否到底
    pub async fn scan_with_retry<D: HarvestDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> AppResult<Vec<DocumentReference>> {
        let references = self.scan(driver).await?;
        if !references.is_empty() {
            return Ok(references);
        }
        info!(
            "⏳ 当前视图没有文档，{} 毫秒后重试一次...",
            self.retry_delay.as_millis()
        );
        sleep(self.retry_delay).await;
        self.scan(driver).await
    }
}
