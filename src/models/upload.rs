use std::fmt::Display;

use serde::Deserialize;

use crate::error::UploadError;

/// 入库接口的响应体
///
/// `{ success_count, uploaded: [{name, pages}], errors: [string] }`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestResponse {
    pub success_count: usize,
    pub uploaded: Vec<IngestedDocument>,
    pub errors: Vec<String>,
}

/// 入库成功的单个文档
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestedDocument {
    #[serde(alias = "filename")]
    pub name: String,
    pub pages: u32,
}

/// 单个文件的上传失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub file: String,
    pub error: UploadError,
}

impl Display for UploadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.file, self.error)
    }
}

/// 一个批次的上传结果
///
/// 每批产生一次，只累加进运行统计，不回写到文件。
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub uploaded_file_names: Vec<String>,
    pub errors: Vec<UploadFailure>,
    /// 入库服务报告的提取页数之和
    pub pages_extracted: u64,
}

impl BatchResult {
    pub fn attempted(&self) -> usize {
        self.uploaded_file_names.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
    }
}
