//! 基于 chromiumoxide 的自动化实现
//!
//! - 集合页面由 [`JsExecutor`] 持有，枚举和翻页都在它上面执行
//! - 每个文档在新标签页中渲染（[`PageGuard`] 保证关闭），不扰动集合页面
//! - 导出优先点击文档页上的下载控件，找不到则走打印为 PDF

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::driver::{HarvestDriver, PaginationStrategy};
use crate::error::{AppError, AppResult, ExportError};
use crate::infrastructure::{JsExecutor, PageGuard};
use crate::models::{DocumentReference, RawLink};

const READY_STATE_POLL: Duration = Duration::from_millis(250);

const ENUMERATE_SCRIPT: &str = r#"
(() => {
    const marker = __MARKER__;
    const selectors = [
        `a[href*="${marker}"]`,
        '.document-item a',
        '[data-document-id] a',
        '[role="listitem"] a',
        '.search-result-item a'
    ];
    const seen = new Set();
    const links = [];
    for (const selector of selectors) {
        let nodes;
        try {
            nodes = document.querySelectorAll(selector);
        } catch (e) {
            continue;
        }
        for (const a of nodes) {
            const href = a.href;
            if (!href || seen.has(href)) continue;
            seen.add(href);
            links.push({ href, text: (a.textContent || '').trim() });
        }
    }
    return links;
})()
"#;

const SCROLL_SCRIPT: &str = r#"
(() => {
    const targets = [document.scrollingElement || document.documentElement];
    for (const el of document.querySelectorAll('*')) {
        if (el.scrollHeight <= el.clientHeight + 10) continue;
        const overflow = getComputedStyle(el).overflowY;
        if (overflow === 'auto' || overflow === 'scroll') targets.push(el);
    }
    let moved = false;
    for (const el of targets) {
        const before = el.scrollTop;
        el.scrollTop = el.scrollHeight;
        if (el.scrollTop !== before) moved = true;
    }
    return moved;
})()
"#;

const NEXT_CONTROL_SCRIPT: &str = r#"
(() => {
    const exact = /^(next|next page|下一页|›|»|>|→)$/i;
    const candidates = document.querySelectorAll('button, a, [role="button"]');
    for (const el of candidates) {
        if (el.disabled || el.getAttribute('aria-disabled') === 'true') continue;
        const label = (el.getAttribute('aria-label') || el.getAttribute('title') || '').trim();
        const text = (el.textContent || '').trim();
        const icon = (el.querySelector('[class*="icon"], mat-icon, i') || {}).textContent || '';
        if (/next/i.test(label) || exact.test(text) || /chevron_right|navigate_next/.test(icon)) {
            el.scrollIntoView({ block: 'center' });
            el.click();
            return true;
        }
    }
    return false;
})()
"#;

const DOWNLOAD_CONTROL_SCRIPT: &str = r#"
(() => {
    const selectors = [
        'button[aria-label*="Download" i]',
        '[data-action="download"]',
        'a[download]'
    ];
    for (const selector of selectors) {
        let el;
        try {
            el = document.querySelector(selector);
        } catch (e) {
            continue;
        }
        if (el) {
            el.click();
            return true;
        }
    }
    return false;
})()
"#;

/// chromiumoxide 驱动
pub struct ChromiumDriver {
    browser: Browser,
    collection: JsExecutor,
    path_marker: String,
    output_dir: PathBuf,
    output_suffix: String,
    navigation_timeout: Duration,
    render_settle: Duration,
    export_settle: Duration,
}

impl ChromiumDriver {
    /// `collection_page` 必须已经打开集合页面且处于登录状态
    pub fn new(browser: Browser, collection_page: Page, config: &Config) -> Self {
        Self {
            browser,
            collection: JsExecutor::new(collection_page),
            path_marker: config.document_path_marker.clone(),
            output_dir: config.output_dir.clone(),
            output_suffix: config.output_suffix.clone(),
            navigation_timeout: config.navigation_timeout(),
            render_settle: config.render_settle(),
            export_settle: config.export_settle_delay(),
        }
    }

    /// 在已打开的标签页中完成：导航 → 等待稳定 → 导出
    ///
    /// 导航和就绪等待共用 `navigation_timeout`；导出命令另有同样长度的上限。
    async fn export_in(
        &self,
        page: &PageGuard,
        reference: &DocumentReference,
    ) -> Result<(), ExportError> {
        let started = Instant::now();
        let timeout_ms = self.navigation_timeout.as_millis() as u64;

        let navigation = timeout(
            self.navigation_timeout,
            page.goto(reference.locator.as_str()),
        );
        match navigation.await {
            Err(_) => {
                return Err(ExportError::RenderTimeout {
                    locator: reference.locator.clone(),
                    timeout_ms,
                })
            }
            Ok(Err(e)) => {
                return Err(ExportError::NavigationFailed {
                    locator: reference.locator.clone(),
                    reason: e.to_string(),
                })
            }
            Ok(Ok(_)) => {}
        }

        let remaining = self.navigation_timeout.saturating_sub(started.elapsed());
        let executor = JsExecutor::new((**page).clone());
        let ready = executor.wait_until(
            "document.readyState === 'complete'",
            remaining,
            READY_STATE_POLL,
        );
        await_ready(ready, remaining, reference, timeout_ms).await?;
        debug!(
            "文档已渲染 ({:?}): {}",
            started.elapsed(),
            reference.locator
        );

        sleep(self.render_settle).await;

        bounded_invocation(
            self.invoke_export(page, &executor, reference),
            self.navigation_timeout,
            reference,
        )
        .await?;

        sleep(self.export_settle).await;
        Ok(())
    }

    /// 点击下载控件，找不到则打印为 PDF
    async fn invoke_export(
        &self,
        page: &PageGuard,
        executor: &JsExecutor,
        reference: &DocumentReference,
    ) -> Result<(), ExportError> {
        let clicked: bool = executor
            .eval_as(DOWNLOAD_CONTROL_SCRIPT)
            .await
            .map_err(|e| invocation_failed(reference, e))?;

        if clicked {
            debug!("已点击下载控件: {}", reference.identifier);
            Ok(())
        } else {
            self.print_to_pdf(page, reference).await
        }
    }

    /// 打印为 PDF，文件名取自文档标题并附上文档标识
    async fn print_to_pdf(
        &self,
        page: &PageGuard,
        reference: &DocumentReference,
    ) -> Result<(), ExportError> {
        let bytes = page
            .pdf(PrintToPdfParams::default())
            .await
            .map_err(|e| invocation_failed(reference, e))?;

        let title = page
            .get_title()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| reference.label.clone());
        let file_name = export_file_name(&title, &reference.identifier, &self.output_suffix);
        let target = self.output_dir.join(&file_name);

        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| invocation_failed(reference, e))?;
        debug!("已打印为 PDF: {}", target.display());
        Ok(())
    }
}

/// 就绪等待整体不超过 `limit`；超时或未就绪都算渲染超时
async fn await_ready<F>(
    ready: F,
    limit: Duration,
    reference: &DocumentReference,
    timeout_ms: u64,
) -> Result<(), ExportError>
where
    F: Future<Output = bool>,
{
    match timeout(limit, ready).await {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(ExportError::RenderTimeout {
            locator: reference.locator.clone(),
            timeout_ms,
        }),
    }
}

/// 导出命令整体不超过 `limit`
async fn bounded_invocation<F>(
    invoke: F,
    limit: Duration,
    reference: &DocumentReference,
) -> Result<(), ExportError>
where
    F: Future<Output = Result<(), ExportError>>,
{
    match timeout(limit, invoke).await {
        Ok(result) => result,
        Err(_) => Err(invocation_failed(
            reference,
            format!("导出命令超过 {}ms 未完成", limit.as_millis()),
        )),
    }
}

#[async_trait]
impl HarvestDriver for ChromiumDriver {
    async fn enumerate(&self) -> AppResult<Vec<RawLink>> {
        let marker = serde_json::to_string(&self.path_marker)?;
        let script = ENUMERATE_SCRIPT.replace("__MARKER__", &marker);
        self.collection.eval_as(script).await
    }

    async fn render_and_export(&self, reference: &DocumentReference) -> Result<(), ExportError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ExportError::ContextUnavailable {
                reason: e.to_string(),
            })?;
        let guard = PageGuard::new(page, reference.identifier.clone());

        let result = self.export_in(&guard, reference).await;

        if let Err(e) = guard.close().await {
            warn!("关闭文档标签页失败 ({}): {}", reference.identifier, e);
        }
        result
    }

    async fn advance_page(&self, strategy: PaginationStrategy) -> AppResult<bool> {
        let script = match strategy {
            PaginationStrategy::Scroll => SCROLL_SCRIPT,
            PaginationStrategy::ControlElement => NEXT_CONTROL_SCRIPT,
        };
        let performed: bool = self.collection.eval_as(script).await?;
        debug!("翻页动作 [{}]: {}", strategy, performed);
        Ok(performed)
    }

    async fn capture_diagnostics(&self, path: &Path) -> AppResult<()> {
        self.collection
            .page()
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        info!("📷 集合页面截图已保存: {}", path.display());
        Ok(())
    }
}

fn invocation_failed(reference: &DocumentReference, err: impl std::fmt::Display) -> ExportError {
    ExportError::InvocationFailed {
        locator: reference.locator.clone(),
        reason: err.to_string(),
    }
}

/// 由文档标题生成导出文件名：`<标题> [<标识>]<后缀>`，标题为空时只用标识
///
/// 标识保证不同文档不会写到同一个文件上（标题经常重复，如查看器的默认标题）。
pub fn export_file_name(title: &str, identifier: &str, suffix: &str) -> String {
    let title = sanitize_file_component(title, 120);
    let identifier = sanitize_file_component(identifier, 80);

    let lower_suffix = suffix.to_ascii_lowercase();
    let stem = if title.to_ascii_lowercase().ends_with(&lower_suffix) {
        title[..title.len() - suffix.len()].trim_end()
    } else {
        title.as_str()
    };

    if stem.is_empty() {
        format!("{}{}", identifier, suffix)
    } else {
        format!("{} [{}]{}", stem, identifier, suffix)
    }
}

fn sanitize_file_component(raw: &str, max_chars: usize) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(max_chars)
        .collect();
    cleaned.trim().trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{OutputDirectory, UploadedSet};

    fn reference(id: &str) -> DocumentReference {
        DocumentReference::new(id, format!("https://x/document/{}", id), "Doc")
    }

    #[test]
    fn export_name_replaces_path_separators() {
        assert_eq!(
            export_file_name("Flight Logs 1997/1998: Vol. 2", "abc", ".pdf"),
            "Flight Logs 1997_1998_ Vol. 2 [abc].pdf"
        );
    }

    #[test]
    fn export_name_falls_back_to_identifier() {
        assert_eq!(export_file_name("   ", "0f3a9c", ".pdf"), "0f3a9c.pdf");
    }

    #[test]
    fn export_name_does_not_repeat_suffix() {
        assert_eq!(
            export_file_name("deposition.PDF", "x", ".pdf"),
            "deposition [x].pdf"
        );
    }

    #[test]
    fn documents_sharing_a_title_get_distinct_names() {
        let left = export_file_name("Pinpoint", "doc-a", ".pdf");
        let right = export_file_name("Pinpoint", "doc-b", ".pdf");
        assert_ne!(left, right);
    }

    #[tokio::test]
    async fn second_document_with_same_title_is_still_pending() {
        let tmp = tempfile::tempdir().unwrap();
        let first = export_file_name("Flight Log", "doc-a", ".pdf");
        std::fs::write(tmp.path().join(&first), b"%PDF a").unwrap();

        let mut ledger = UploadedSet::new();
        ledger.mark_uploaded(first);

        let second = export_file_name("Flight Log", "doc-b", ".pdf");
        std::fs::write(tmp.path().join(&second), b"%PDF b").unwrap();

        let dir = OutputDirectory::new(tmp.path(), ".pdf");
        let pending = dir.pending(&ledger).await.unwrap();
        assert_eq!(pending, vec![tmp.path().join(second)]);
    }

    #[test]
    fn identifier_is_sanitized_too() {
        assert_eq!(export_file_name("", "a/b:c", ".pdf"), "a_b_c.pdf");
    }

    #[tokio::test]
    async fn stalled_readiness_is_a_render_timeout() {
        let err = await_ready(
            std::future::pending::<bool>(),
            Duration::from_millis(20),
            &reference("slow"),
            20,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "RenderTimeout");
    }

    #[tokio::test]
    async fn ready_page_passes() {
        let result = await_ready(
            std::future::ready(true),
            Duration::from_millis(20),
            &reference("ok"),
            20,
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn stalled_export_command_is_bounded() {
        let err = bounded_invocation(
            std::future::pending::<Result<(), ExportError>>(),
            Duration::from_millis(20),
            &reference("stuck"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "ExportInvocationFailure");
        assert!(err.to_string().contains("20ms"));
    }

    #[test]
    fn enumerate_script_embeds_marker_as_js_string() {
        let marker = serde_json::to_string("/document/").unwrap();
        let script = ENUMERATE_SCRIPT.replace("__MARKER__", &marker);
        assert!(script.contains(r#"const marker = "/document/";"#));
    }
}
