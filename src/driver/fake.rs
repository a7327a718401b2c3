//! 测试用的内存驱动

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::driver::chromium::export_file_name;
use crate::driver::{HarvestDriver, PaginationStrategy};
use crate::error::{AppResult, ExportError};
use crate::models::{DocumentReference, RawLink};

pub(crate) const BASE: &str = "https://pinpoint.test";

pub(crate) fn link(id: &str) -> RawLink {
    RawLink::new(format!("{}/document/{}", BASE, id), format!("Doc {}", id))
}

#[derive(Default)]
struct FakeState {
    current_page: usize,
    empty_scans_left: usize,
    enumerate_calls: usize,
    exports: Vec<String>,
    advances: Vec<(PaginationStrategy, bool)>,
    diagnostics: usize,
}

/// 按页组织的假集合
///
/// - `advance_via` 指定哪种翻页动作能前进到下一页，另一种总是"没有效果"
/// - 滚动模式下视图累积（懒加载），按钮模式下视图只显示当前页
/// - 导出时在 `output_dir` 中写入 `<id>.pdf`
pub(crate) struct FakeDriver {
    pages: Vec<Vec<RawLink>>,
    advance_via: Option<PaginationStrategy>,
    failing: HashSet<String>,
    silent: HashSet<String>,
    output_dir: Option<PathBuf>,
    title: Option<String>,
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub(crate) fn new(pages: Vec<Vec<&str>>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|ids| ids.into_iter().map(link).collect())
                .collect(),
            advance_via: None,
            failing: HashSet::new(),
            silent: HashSet::new(),
            output_dir: None,
            title: None,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub(crate) fn advancing_via(mut self, strategy: PaginationStrategy) -> Self {
        self.advance_via = Some(strategy);
        self
    }

    /// 这些文档导出时报渲染超时
    pub(crate) fn failing(mut self, ids: &[&str]) -> Self {
        self.failing = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// 这些文档导出"成功"但不产生文件
    pub(crate) fn silent(mut self, ids: &[&str]) -> Self {
        self.silent = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub(crate) fn writing_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// 所有文档共用同一个标题，文件名按真实驱动的规则生成
    pub(crate) fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// 前 n 次枚举返回空（模拟渲染延迟）
    pub(crate) fn empty_first_scans(self, n: usize) -> Self {
        self.state.lock().unwrap().empty_scans_left = n;
        self
    }

    pub(crate) fn exports(&self) -> Vec<String> {
        self.state.lock().unwrap().exports.clone()
    }

    pub(crate) fn enumerate_calls(&self) -> usize {
        self.state.lock().unwrap().enumerate_calls
    }

    pub(crate) fn advances(&self) -> Vec<(PaginationStrategy, bool)> {
        self.state.lock().unwrap().advances.clone()
    }

    pub(crate) fn diagnostics(&self) -> usize {
        self.state.lock().unwrap().diagnostics
    }
}

#[async_trait]
impl HarvestDriver for FakeDriver {
    async fn enumerate(&self) -> AppResult<Vec<RawLink>> {
        let mut state = self.state.lock().unwrap();
        state.enumerate_calls += 1;
        if state.empty_scans_left > 0 {
            state.empty_scans_left -= 1;
            return Ok(Vec::new());
        }
        let current = state.current_page.min(self.pages.len().saturating_sub(1));
        let view = match self.advance_via {
            Some(PaginationStrategy::Scroll) => self.pages[..=current].concat(),
            _ => self.pages.get(current).cloned().unwrap_or_default(),
        };
        Ok(view)
    }

    async fn render_and_export(&self, reference: &DocumentReference) -> Result<(), ExportError> {
        self.state
            .lock()
            .unwrap()
            .exports
            .push(reference.identifier.clone());

        if self.failing.contains(&reference.identifier) {
            return Err(ExportError::RenderTimeout {
                locator: reference.locator.clone(),
                timeout_ms: 30_000,
            });
        }
        if self.silent.contains(&reference.identifier) {
            return Ok(());
        }
        if let Some(dir) = &self.output_dir {
            let file_name = match &self.title {
                Some(title) => export_file_name(title, &reference.identifier, ".pdf"),
                None => format!("{}.pdf", reference.identifier),
            };
            let path = dir.join(file_name);
            std::fs::write(&path, b"%PDF-1.4 fake").map_err(|e| ExportError::InvocationFailed {
                locator: reference.locator.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    async fn advance_page(&self, strategy: PaginationStrategy) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        let can_move =
            self.advance_via == Some(strategy) && state.current_page + 1 < self.pages.len();
        if can_move {
            state.current_page += 1;
        }
        state.advances.push((strategy, can_move));
        Ok(can_move)
    }

    async fn capture_diagnostics(&self, _path: &std::path::Path) -> AppResult<()> {
        self.state.lock().unwrap().diagnostics += 1;
        Ok(())
    }
}
