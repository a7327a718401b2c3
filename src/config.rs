use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 翻页策略选择
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// 依次尝试滚动、下一页按钮
    Auto,
    /// 列表页一次性给出全部文档，不翻页
    Index,
    /// 只使用滚动到底部
    Scroll,
    /// 只使用"下一页"按钮
    Control,
}

impl FromStr for PaginationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "index" => Ok(Self::Index),
            "scroll" => Ok(Self::Scroll),
            "control" => Ok(Self::Control),
            other => Err(ConfigError::InvalidValue {
                field: "pagination".to_string(),
                value: other.to_string(),
                expected: "auto | index | scroll | control".to_string(),
            }),
        }
    }
}

/// 程序配置
///
/// 启动时构建一次，之后只读地传给各个组件。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口（连接已登录的 Chrome）
    pub browser_debug_port: u16,
    /// 是否自行启动无头浏览器（否则连接调试端口）
    pub headless: bool,
    /// 自行启动时使用的浏览器可执行文件
    pub chrome_executable: Option<PathBuf>,
    /// 文档集合页面
    pub collection_url: String,
    /// 入库服务地址（不含 /admin/upload-documents）
    pub ingest_base_url: String,
    /// 导出文件所在目录
    pub output_dir: PathBuf,
    /// 导出文件后缀
    pub output_suffix: String,
    /// 文档链接路径中的标记段
    pub document_path_marker: String,
    /// 可选的文档后缀过滤（如 `.pdf`）
    pub document_suffix: Option<String>,
    /// 每处理多少个文档触发一次上传
    pub batch_size: usize,
    /// 文档渲染最长等待（毫秒）
    pub navigation_timeout_ms: u64,
    /// 页面加载完成后的额外稳定时间（毫秒）
    pub render_settle_ms: u64,
    /// 触发导出后的等待时间（毫秒）
    pub export_settle_delay_ms: u64,
    /// 翻页动作后的等待时间（毫秒）
    pub page_advance_delay_ms: u64,
    /// 扫描为空时的重试等待（毫秒）
    pub empty_scan_retry_delay_ms: u64,
    /// 上传单个文件之间的间隔（毫秒）
    pub upload_item_delay_ms: u64,
    /// 单个上传请求超时（毫秒）
    pub upload_timeout_ms: u64,
    /// 目标文档数量，达到后停止
    pub target_count: Option<usize>,
    /// 翻页策略
    pub pagination: PaginationMode,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 失败记录文件
    pub failure_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            headless: false,
            chrome_executable: None,
            collection_url:
                "https://journaliststudio.google.com/pinpoint/search?collection=061ce61c9e70bdfd"
                    .to_string(),
            ingest_base_url: "http://localhost:8000".to_string(),
            output_dir: PathBuf::from("downloads"),
            output_suffix: ".pdf".to_string(),
            document_path_marker: "/document/".to_string(),
            document_suffix: None,
            batch_size: 10,
            navigation_timeout_ms: 30_000,
            render_settle_ms: 3_000,
            export_settle_delay_ms: 2_000,
            page_advance_delay_ms: 2_000,
            empty_scan_retry_delay_ms: 5_000,
            upload_item_delay_ms: 300,
            upload_timeout_ms: 120_000,
            target_count: None,
            pagination: PaginationMode::Auto,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            failure_log_file: "failures.txt".to_string(),
        }
    }
}

impl Config {
    /// 默认值 → `HARVEST_CONFIG` 指向的 TOML 文件 → 环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("HARVEST_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取，缺失字段使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            AppError::Config(ConfigError::FileParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;
        Ok(config)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT")
                .unwrap_or(self.browser_debug_port),
            headless: env_parse("HEADLESS").unwrap_or(self.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE")
                .ok()
                .map(PathBuf::from)
                .or(self.chrome_executable),
            collection_url: std::env::var("COLLECTION_URL")
                .unwrap_or(self.collection_url),
            ingest_base_url: std::env::var("INGEST_BASE_URL")
                .unwrap_or(self.ingest_base_url),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(self.output_dir),
            output_suffix: std::env::var("OUTPUT_SUFFIX").unwrap_or(self.output_suffix),
            document_path_marker: std::env::var("DOCUMENT_PATH_MARKER")
                .unwrap_or(self.document_path_marker),
            document_suffix: std::env::var("DOCUMENT_SUFFIX")
                .ok()
                .or(self.document_suffix),
            batch_size: env_parse("BATCH_SIZE").unwrap_or(self.batch_size),
            navigation_timeout_ms: env_parse("NAVIGATION_TIMEOUT_MS")
                .unwrap_or(self.navigation_timeout_ms),
            render_settle_ms: env_parse("RENDER_SETTLE_MS")
                .unwrap_or(self.render_settle_ms),
            export_settle_delay_ms: env_parse("EXPORT_SETTLE_DELAY_MS")
                .unwrap_or(self.export_settle_delay_ms),
            page_advance_delay_ms: env_parse("PAGE_ADVANCE_DELAY_MS")
                .unwrap_or(self.page_advance_delay_ms),
            empty_scan_retry_delay_ms: env_parse("EMPTY_SCAN_RETRY_DELAY_MS")
                .unwrap_or(self.empty_scan_retry_delay_ms),
            upload_item_delay_ms: env_parse("UPLOAD_ITEM_DELAY_MS")
                .unwrap_or(self.upload_item_delay_ms),
            upload_timeout_ms: env_parse("UPLOAD_TIMEOUT_MS")
                .unwrap_or(self.upload_timeout_ms),
            target_count: env_parse("TARGET_COUNT").or(self.target_count),
            pagination: env_parse("PAGINATION").unwrap_or(self.pagination),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE")
                .unwrap_or(self.output_log_file),
            failure_log_file: std::env::var("FAILURE_LOG_FILE")
                .unwrap_or(self.failure_log_file),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> AppResult<()> {
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "0", "正整数"));
        }
        if self.ingest_base_url.trim().is_empty() {
            return Err(invalid("ingest_base_url", "", "非空 URL"));
        }
        if self.output_suffix.trim().is_empty() {
            return Err(invalid("output_suffix", "", "非空后缀，如 .pdf"));
        }
        if self.document_path_marker.is_empty() {
            return Err(invalid("document_path_marker", "", "非空路径标记"));
        }
        Ok(())
    }

    /// 入库接口完整地址
    pub fn upload_endpoint(&self) -> String {
        format!(
            "{}/admin/upload-documents",
            self.ingest_base_url.trim_end_matches('/')
        )
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }

    pub fn export_settle_delay(&self) -> Duration {
        Duration::from_millis(self.export_settle_delay_ms)
    }

    pub fn page_advance_delay(&self) -> Duration {
        Duration::from_millis(self.page_advance_delay_ms)
    }

    pub fn empty_scan_retry_delay(&self) -> Duration {
        Duration::from_millis(self.empty_scan_retry_delay_ms)
    }

    pub fn upload_item_delay(&self) -> Duration {
        Duration::from_millis(self.upload_item_delay_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn invalid(field: &str, value: &str, expected: &str) -> AppError {
    AppError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    })
}
