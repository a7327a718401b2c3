//! 单次采集运行 - 编排层
//!
//! ## 状态机
//!
//! ```text
//! Scanning → Dispatching → (每 N 个文档) Uploading → Dispatching ...
//!          → Scanning（翻页） → ... → Draining（最后一次上传） → Done
//! ```
//!
//! - 单个文档或单次扫描的失败只记录日志，不会让状态机进入错误终态
//! - 上传节奏在控制循环内同步判断（每个文档分发之后），没有额外的定时任务
//! - 中断信号在每个文档分发前、每次翻页前检查；进行中的导出/上传自然结束

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::driver::HarvestDriver;
use crate::error::AppResult;
use crate::models::{DocumentReference, RunState, RunSummary};
use crate::services::{
    Advance, BatchUploader, DocumentEnumerator, DocumentFilter, FailureWriter, IdentifierTracker,
    OutputDirectory, Paginator, UploadedSet,
};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{DocumentCtx, ExportFlow, ExportOutcome};

const EMPTY_COLLECTION_SCREENSHOT: &str = "collection-empty.png";

/// 单次运行的编排器
///
/// 唯一持有 ProcessedSet / UploadedSet 的地方，只在这一条控制流上读写。
pub struct HarvestRun<D: HarvestDriver> {
    driver: D,
    config: Config,
    tracker: IdentifierTracker,
    ledger: UploadedSet,
    enumerator: DocumentEnumerator,
    paginator: Paginator,
    output: OutputDirectory,
    uploader: BatchUploader,
    failure_writer: FailureWriter,
    cancel: Arc<AtomicBool>,
    state: RunState,
    summary: RunSummary,
    dispatched_since_upload: usize,
    batch_counter: usize,
}

impl<D: HarvestDriver> HarvestRun<D> {
    pub fn new(driver: D, config: &Config) -> AppResult<Self> {
        let filter = DocumentFilter::from_config(config)?;
        Ok(Self {
            driver,
            config: config.clone(),
            tracker: IdentifierTracker::new(),
            ledger: UploadedSet::new(),
            enumerator: DocumentEnumerator::new(filter, config.empty_scan_retry_delay()),
            paginator: Paginator::from_config(config),
            output: OutputDirectory::new(&config.output_dir, &config.output_suffix),
            uploader: BatchUploader::from_config(config)?,
            failure_writer: FailureWriter::new(&config.failure_log_file),
            cancel: Arc::new(AtomicBool::new(false)),
            state: RunState::Scanning,
            summary: RunSummary::default(),
            dispatched_since_upload: 0,
            batch_counter: 0,
        })
    }

    /// 使用外部的中断标志（Ctrl-C 处理器置位）
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn tracker(&self) -> &IdentifierTracker {
        &self.tracker
    }

    pub fn uploaded(&self) -> &UploadedSet {
        &self.ledger
    }

    /// 运行到结束，返回汇总
    ///
    /// 只有导出目录无法创建时返回错误；其余失败都在条目边界内消化。
    pub async fn run(&mut self) -> AppResult<RunSummary> {
        self.output.ensure_exists().await?;

        self.transition(RunState::Scanning);
        let mut view = self.initial_scan().await;

        while self.state != RunState::Draining {
            self.summary.pages_scanned += 1;
            self.dispatch_view(view).await;
            if self.state == RunState::Draining {
                break;
            }
            if self.check_cancelled() {
                break;
            }

            self.transition(RunState::Scanning);
            view = match self
                .paginator
                .advance(&self.driver, &self.enumerator, &self.tracker)
                .await
            {
                Advance::More { references, .. } => references,
                Advance::Exhausted => {
                    self.transition(RunState::Draining);
                    break;
                }
            };
        }

        self.upload_cycle("收尾").await;
        self.transition(RunState::Done);
        Ok(self.summary.clone())
    }

    /// 首屏扫描；仍为空时保存截图并直接进入收尾
    async fn initial_scan(&mut self) -> Vec<DocumentReference> {
        let view = match self.enumerator.scan_with_retry(&self.driver).await {
            Ok(view) => view,
            Err(e) => {
                warn!("⚠️ 扫描集合页面失败: {}", e);
                Vec::new()
            }
        };

        if view.is_empty() {
            warn!("⚠️ 集合页面上没有找到任何文档");
            let screenshot: PathBuf = self.output.path().join(EMPTY_COLLECTION_SCREENSHOT);
            if let Err(e) = self.driver.capture_diagnostics(&screenshot).await {
                debug!("保存截图失败: {}", e);
            }
            self.transition(RunState::Draining);
        } else {
            info!("🔍 首屏发现 {} 个文档", view.len());
        }
        view
    }

    /// 分发一个视图中的新文档
    async fn dispatch_view(&mut self, view: Vec<DocumentReference>) {
        self.transition(RunState::Dispatching);

        for reference in view {
            if self.check_cancelled() || self.check_target_reached() {
                return;
            }
            // 先标记再导出：无论结果如何，同一标识本次运行只尝试一次
            if !self.tracker.add(reference.identifier.clone()) {
                continue;
            }

            self.summary.processed += 1;
            let ctx = DocumentCtx::new(self.summary.processed, self.config.target_count, reference);
            let outcome = ExportFlow::new(&self.failure_writer, self.config.verbose_logging)
                .run(&self.driver, &ctx)
                .await;
            match outcome {
                ExportOutcome::Exported => self.summary.export_attempted += 1,
                ExportOutcome::Failed(_) => self.summary.failed += 1,
            }

            self.dispatched_since_upload += 1;
            if self.dispatched_since_upload >= self.config.batch_size {
                info!("📊 进度: 已处理 {} 个文档", self.summary.processed);
                self.upload_cycle("定期").await;
                self.transition(RunState::Dispatching);
            }
        }

        self.check_target_reached();
    }

    /// 把导出目录中尚未尝试过的文件按批上传
    async fn upload_cycle(&mut self, reason: &str) {
        self.dispatched_since_upload = 0;
        if self.state != RunState::Draining {
            self.transition(RunState::Uploading);
        }

        let pending = match self.output.pending(&self.ledger).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("⚠️ 扫描导出目录失败，本轮跳过上传: {}", e);
                return;
            }
        };
        if pending.is_empty() {
            info!("📭 [{}] 没有新的导出文件需要上传", reason);
            return;
        }
        info!("📤 [{}] 发现 {} 个新文件，开始上传", reason, pending.len());

        for chunk in pending.chunks(self.config.batch_size) {
            self.batch_counter += 1;
            log_batch_start(self.batch_counter, chunk.len(), self.uploader.endpoint());

            let result = self.uploader.upload(chunk).await;

            for name in &result.uploaded_file_names {
                self.ledger.mark_uploaded(name.clone());
            }
            for failure in &result.errors {
                self.ledger.mark_failed(failure.file.clone());
                if let Err(e) = self.failure_writer.record_upload(failure).await {
                    warn!("⚠️ 写入失败记录失败: {}", e);
                }
            }

            log_batch_complete(self.batch_counter, &result);
            self.summary.absorb_batch(&result);
        }
        info!("✅ 累计上传 {} 个文件", self.summary.uploaded);
    }

    fn check_cancelled(&mut self) -> bool {
        if self.cancel.load(Ordering::SeqCst) {
            if !self.summary.interrupted {
                warn!("🛑 收到中断信号，停止分发，上传已导出的文件后结束");
            }
            self.summary.interrupted = true;
            self.transition(RunState::Draining);
            return true;
        }
        false
    }

    fn check_target_reached(&mut self) -> bool {
        match self.config.target_count {
            Some(target) if self.summary.processed >= target => {
                if self.state != RunState::Draining {
                    info!("🎯 已达到目标数量 {}", target);
                }
                self.transition(RunState::Draining);
                true
            }
            _ => false,
        }
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            debug!("状态: {} → {}", self.state, next);
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginationMode;
    use crate::driver::fake::FakeDriver;
    use crate::driver::PaginationStrategy;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(tmp: &TempDir, server: &MockServer, batch_size: usize) -> Config {
        Config {
            ingest_base_url: server.uri(),
            output_dir: tmp.path().join("downloads"),
            failure_log_file: tmp
                .path()
                .join("failures.txt")
                .to_string_lossy()
                .to_string(),
            batch_size,
            navigation_timeout_ms: 1_000,
            render_settle_ms: 0,
            export_settle_delay_ms: 0,
            page_advance_delay_ms: 0,
            empty_scan_retry_delay_ms: 0,
            upload_item_delay_ms: 0,
            upload_timeout_ms: 5_000,
            ..Config::default()
        }
    }

    fn ok_response() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "uploaded": [{ "filename": "x.pdf", "pages": 2 }],
            "errors": [],
            "success_count": 1
        }))
    }

    async fn accepting_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ok_response())
            .mount(&server)
            .await;
        server
    }

    fn downloads(tmp: &TempDir) -> std::path::PathBuf {
        let dir = tmp.path().join("downloads");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    async fn received_uploads(server: &MockServer) -> usize {
        server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn three_documents_with_batch_size_two_upload_in_two_batches() {
        let tmp = tempfile::tempdir().unwrap();
        let server = accepting_server().await;
        let config = test_config(&tmp, &server, 2);
        let driver = FakeDriver::new(vec![vec!["d1", "d2", "d3"]])
            .writing_to(downloads(&tmp));

        let mut run = HarvestRun::new(driver, &config).unwrap();
        let summary = run.run().await.unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.export_attempted, 3);
        assert_eq!(summary.uploaded, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.upload_batches, 2);
        assert_eq!(summary.pages_extracted, 6);
        assert_eq!(received_uploads(&server).await, 3);
        assert_eq!(run.state(), RunState::Done);
    }

    #[tokio::test]
    async fn documents_with_identical_titles_are_all_uploaded() {
        let tmp = tempfile::tempdir().unwrap();
        let server = accepting_server().await;
        let config = test_config(&tmp, &server, 1);
        let driver = FakeDriver::new(vec![vec!["d1", "d2"]])
            .titled("Pinpoint")
            .writing_to(downloads(&tmp));

        let mut run = HarvestRun::new(driver, &config).unwrap();
        let summary = run.run().await.unwrap();

        assert_eq!(summary.uploaded, 2);
        assert!(run.uploaded().contains("Pinpoint [d1].pdf"));
        assert!(run.uploaded().contains("Pinpoint [d2].pdf"));
    }

    #[tokio::test]
    async fn render_timeout_is_counted_and_never_retried() {
        let tmp = tempfile::tempdir().unwrap();
        let server = accepting_server().await;
        let config = test_config(&tmp, &server, 10);
        // 滚动后视图累积，d2 会在第二次扫描中再次出现
        let driver = FakeDriver::new(vec![vec!["d1", "d2", "d3"], vec!["d4"]])
            .advancing_via(PaginationStrategy::Scroll)
            .failing(&["d2"])
            .writing_to(downloads(&tmp));

        let mut run = HarvestRun::new(driver, &config).unwrap();
        let summary = run.run().await.unwrap();

        assert_eq!(summary.processed, 4);
        assert_eq!(summary.export_attempted, 3);
        assert_eq!(summary.failed, 1);
        let exports = run.driver().exports();
        assert_eq!(exports.iter().filter(|id| id.as_str() == "d2").count(), 1);

        let failures =
            std::fs::read_to_string(tmp.path().join("failures.txt")).unwrap();
        assert!(failures.contains("RenderTimeout | d2"));
    }

    #[tokio::test]
    async fn one_server_error_does_not_abort_the_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("filename=\"d2.pdf\""))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ok_response())
            .mount(&server)
            .await;
        let config = test_config(&tmp, &server, 3);
        let driver = FakeDriver::new(vec![vec!["d1", "d2", "d3"]])
            .writing_to(downloads(&tmp));

        let mut run = HarvestRun::new(driver, &config).unwrap();
        let summary = run.run().await.unwrap();

        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.upload_failed, 1);
        assert!(run.uploaded().contains("d1.pdf"));
        assert!(run.uploaded().contains("d3.pdf"));
        assert!(!run.uploaded().contains("d2.pdf"));
        assert_eq!(summary.upload_errors[0].file, "d2.pdf");
        assert_eq!(run.state(), RunState::Done);
        // 失败的文件留在磁盘上，供下次运行重新扫描
        assert!(tmp.path().join("downloads/d2.pdf").exists());
    }

    #[tokio::test]
    async fn unchanged_view_drains_instead_of_looping() {
        let tmp = tempfile::tempdir().unwrap();
        let server = accepting_server().await;
        let config = test_config(&tmp, &server, 10);
        let driver = FakeDriver::new(vec![vec!["d1", "d2"]])
            .writing_to(downloads(&tmp));

        let mut run = HarvestRun::new(driver, &config).unwrap();
        let summary = run.run().await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.pages_scanned, 1);
        assert_eq!(
            run.driver().advances(),
            vec![
                (PaginationStrategy::Scroll, false),
                (PaginationStrategy::ControlElement, false)
            ]
        );
    }

    #[tokio::test]
    async fn identifiers_reported_on_several_pages_are_exported_once() {
        let tmp = tempfile::tempdir().unwrap();
        let server = accepting_server().await;
        let config = test_config(&tmp, &server, 10);
        let driver = FakeDriver::new(vec![vec!["a", "b"], vec!["b", "c"], vec!["c", "a", "d"]])
            .advancing_via(PaginationStrategy::ControlElement)
            .writing_to(downloads(&tmp));

        let mut run = HarvestRun::new(driver, &config).unwrap();
        let summary = run.run().await.unwrap();

        let mut exports = run.driver().exports();
        exports.sort();
        assert_eq!(exports, vec!["a", "b", "c", "d"]);
        assert_eq!(summary.processed, 4);
        assert_eq!(run.tracker().len(), 4);
        assert_eq!(summary.pages_scanned, 3);
    }

    #[tokio::test]
    async fn target_count_stops_dispatch_and_flushes() {
        let tmp = tempfile::tempdir().unwrap();
        let server = accepting_server().await;
        let config = Config {
            target_count: Some(2),
            ..test_config(&tmp, &server, 10)
        };
        let driver = FakeDriver::new(vec![vec!["d1", "d2", "d3", "d4"]])
            .writing_to(downloads(&tmp));

        let mut run = HarvestRun::new(driver, &config).unwrap();
        let summary = run.run().await.unwrap();

        assert_eq!(run.driver().exports(), vec!["d1", "d2"]);
        assert_eq!(summary.uploaded, 2);
        assert!(run.driver().advances().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_is_not_retried_within_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("filename=\"d1.pdf\""))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ok_response())
            .mount(&server)
            .await;
        let config = test_config(&tmp, &server, 1);
        let driver = FakeDriver::new(vec![vec!["d1", "d2"]])
            .writing_to(downloads(&tmp));

        let mut run = HarvestRun::new(driver, &config).unwrap();
        let summary = run.run().await.unwrap();

        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.upload_failed, 1);
        assert_eq!(received_uploads(&server).await, 2);
    }

    #[tokio::test]
    async fn empty_collection_saves_diagnostics_and_finishes() {
        let tmp = tempfile::tempdir().unwrap();
        let server = accepting_server().await;
        let config = test_config(&tmp, &server, 10);
        let driver = FakeDriver::new(vec![vec![]]);

        let mut run = HarvestRun::new(driver, &config).unwrap();
        let summary = run.run().await.unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(run.driver().diagnostics(), 1);
        assert_eq!(run.driver().enumerate_calls(), 2);
        assert_eq!(run.state(), RunState::Done);
    }

    #[tokio::test]
    async fn interrupt_stops_dispatch_but_still_uploads_existing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let server = accepting_server().await;
        let config = test_config(&tmp, &server, 10);
        let dir = downloads(&tmp);
        std::fs::write(dir.join("left-over.pdf"), b"%PDF").unwrap();
        let driver = FakeDriver::new(vec![vec!["d1", "d2"]]).writing_to(&dir);

        let cancel = Arc::new(AtomicBool::new(true));
        let mut run = HarvestRun::new(driver, &config)
            .unwrap()
            .with_cancel_flag(cancel);
        let summary = run.run().await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.processed, 0);
        assert!(run.driver().exports().is_empty());
        assert_eq!(summary.uploaded, 1);
        assert!(run.uploaded().contains("left-over.pdf"));
    }

    #[tokio::test]
    async fn export_without_file_is_still_an_attempt() {
        let tmp = tempfile::tempdir().unwrap();
        let server = accepting_server().await;
        let config = Config {
            pagination: PaginationMode::Index,
            ..test_config(&tmp, &server, 10)
        };
        let driver = FakeDriver::new(vec![vec!["d1", "d2"]])
            .silent(&["d2"])
            .writing_to(downloads(&tmp));

        let mut run = HarvestRun::new(driver, &config).unwrap();
        let summary = run.run().await.unwrap();

        assert_eq!(summary.export_attempted, 2);
        assert_eq!(summary.uploaded, 1);
        assert!(!Path::new(&tmp.path().join("downloads/d2.pdf")).exists());
    }
}
