//! 导出目录服务
//!
//! 按后缀扫描导出目录，找出本次运行还没有尝试上传过的文件。

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::services::tracker::UploadedSet;

pub struct OutputDirectory {
    dir: PathBuf,
    suffix: String,
}

impl OutputDirectory {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into().to_ascii_lowercase(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// 目录不存在时创建
    pub async fn ensure_exists(&self) -> AppResult<()> {
        if fs::metadata(&self.dir).await.is_err() {
            fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| AppError::directory_unavailable(self.dir.display().to_string(), e))?;
            info!("✓ 已创建导出目录: {}", self.dir.display());
        }
        Ok(())
    }

    /// 列出所有匹配后缀的文件，按修改时间、再按文件名排序
    pub async fn list_outputs(&self) -> AppResult<Vec<PathBuf>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| AppError::directory_unavailable(self.dir.display().to_string(), e))?;

        let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !self.matches(&path) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((modified, path));
        }

        files.sort();
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    /// 本次运行中尚未尝试上传的文件
    pub async fn pending(&self, ledger: &UploadedSet) -> AppResult<Vec<PathBuf>> {
        let pending: Vec<PathBuf> = self
            .list_outputs()
            .await?
            .into_iter()
            .filter(|path| match file_name_of(path) {
                Some(name) => !ledger.is_settled(&name),
                None => false,
            })
            .collect();
        debug!("导出目录中待上传文件: {}", pending.len());
        Ok(pending)
    }

    fn matches(&self, path: &Path) -> bool {
        file_name_of(path)
            .map(|name| name.to_ascii_lowercase().ends_with(&self.suffix))
            .unwrap_or(false)
    }
}

/// 文件名（上传账本的键）
pub fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_exists_creates_nested_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = OutputDirectory::new(tmp.path().join("a/b"), ".pdf");
        dir.ensure_exists().await.unwrap();
        assert!(tmp.path().join("a/b").is_dir());
    }

    #[tokio::test]
    async fn only_matching_suffix_is_listed() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("B.PDF"), b"x").unwrap();
        std::fs::write(tmp.path().join("c.pdf.crdownload"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(tmp.path().join("dir.pdf")).unwrap();

        let dir = OutputDirectory::new(tmp.path(), ".pdf");
        let mut names: Vec<String> = dir
            .list_outputs()
            .await
            .unwrap()
            .iter()
            .filter_map(|p| file_name_of(p))
            .collect();
        names.sort();
        assert_eq!(names, vec!["B.PDF", "a.pdf"]);
    }

    #[tokio::test]
    async fn settled_files_are_not_pending() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }
        let mut ledger = UploadedSet::new();
        ledger.mark_uploaded("a.pdf");
        ledger.mark_failed("b.pdf");

        let dir = OutputDirectory::new(tmp.path(), ".pdf");
        let pending = dir.pending(&ledger).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(file_name_of(&pending[0]).unwrap(), "c.pdf");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = OutputDirectory::new(tmp.path().join("missing"), ".pdf");
        tokio_test::assert_err!(tokio_test::block_on(dir.list_outputs()));
    }
}
