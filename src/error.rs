use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 单个文档导出错误
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
    /// 单个文件上传错误
    #[error("上传错误: {0}")]
    Upload(#[from] UploadError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: BoxError,
    },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        #[source]
        source: BoxError,
    },
    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed {
        #[source]
        source: BoxError,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: BoxError,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[source]
        source: BoxError,
    },
    /// 浏览器配置失败
    #[error("浏览器配置失败: {reason}")]
    ConfigurationFailed { reason: String },
}

/// 单个文档的渲染/导出错误
///
/// 只在条目边界内处理，不会中断整个运行。
#[derive(Debug, Error)]
pub enum ExportError {
    /// 文档在限定时间内没有渲染稳定
    #[error("渲染超时 ({timeout_ms}ms): {locator}")]
    RenderTimeout { locator: String, timeout_ms: u64 },
    /// 无法打开独立标签页
    #[error("无法创建独立渲染上下文: {reason}")]
    ContextUnavailable { reason: String },
    /// 导航本身报错（非超时）
    #[error("打开文档失败 ({locator}): {reason}")]
    NavigationFailed { locator: String, reason: String },
    /// 导出命令无法下发
    #[error("导出命令失败 ({locator}): {reason}")]
    InvocationFailed { locator: String, reason: String },
}

impl ExportError {
    /// 用于失败记录的简短类别名
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::RenderTimeout { .. } => "RenderTimeout",
            ExportError::ContextUnavailable { .. } => "ContextUnavailable",
            ExportError::NavigationFailed { .. } => "NavigationFailed",
            ExportError::InvocationFailed { .. } => "ExportInvocationFailure",
        }
    }
}

/// 单个文件的上传错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// 本地文件无法读取
    #[error("读取文件失败: {reason}")]
    FileUnreadable { reason: String },
    /// 网络失败、非 200 响应或响应无法解析
    #[error("传输失败: {reason}")]
    Transport { reason: String },
    /// 入库服务返回 200 但拒绝了该文件
    #[error("服务端拒绝: {reason}")]
    Rejected { reason: String },
}

impl UploadError {
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::FileUnreadable { .. } => "UploadFileUnreadable",
            UploadError::Transport { .. } => "UploadTransportError",
            UploadError::Rejected { .. } => "UploadRejected",
        }
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: BoxError,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: BoxError,
    },
    /// 目录无法创建或读取
    #[error("目录不可用 ({path}): {source}")]
    DirectoryUnavailable {
        path: String,
        #[source]
        source: BoxError,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置值不合法
    #[error("配置项 {field} 的值 '{value}' 不合法，应为 {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    FileParseFailed {
        path: String,
        #[source]
        source: BoxError,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON解析失败: {}", err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::FileParseFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Other(format!("HTTP客户端错误: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建导航错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建目录错误
    pub fn directory_unavailable(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::DirectoryUnavailable {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
