use std::fmt::Display;

use crate::models::upload::{BatchResult, UploadFailure};

/// 编排器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Scanning,
    Dispatching,
    Uploading,
    Draining,
    Done,
}

impl Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Scanning => "Scanning",
            RunState::Dispatching => "Dispatching",
            RunState::Uploading => "Uploading",
            RunState::Draining => "Draining",
            RunState::Done => "Done",
        };
        f.write_str(name)
    }
}

/// 运行汇总
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// 交给导出流程的文档数（每个标识一次）
    pub processed: usize,
    /// 导出命令成功下发的文档数
    pub export_attempted: usize,
    /// 导出失败的文档数
    pub failed: usize,
    /// 上传成功的文件数
    pub uploaded: usize,
    /// 上传失败的文件数
    pub upload_failed: usize,
    /// 上传批次数（不含空批次）
    pub upload_batches: usize,
    /// 入库服务提取的页数
    pub pages_extracted: u64,
    /// 扫描过的页数（含首屏）
    pub pages_scanned: usize,
    /// 是否因中断信号提前结束
    pub interrupted: bool,
    pub upload_errors: Vec<UploadFailure>,
}

impl RunSummary {
    /// 把一个批次的结果累加进汇总
    pub fn absorb_batch(&mut self, batch: &BatchResult) {
        if batch.is_empty() {
            return;
        }
        self.upload_batches += 1;
        self.uploaded += batch.uploaded_file_names.len();
        self.upload_failed += batch.errors.len();
        self.pages_extracted += batch.pages_extracted;
        self.upload_errors.extend(batch.errors.iter().cloned());
    }
}
