//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行、统计）
//! - 管理浏览器资源（Browser、集合页面）
//! - 安装中断处理
//!
//! ### `harvest_run` - 单次采集运行
//! - 扫描 → 分发 → 定期上传 → 翻页 → 收尾 的状态机
//! - 持有 ProcessedSet / UploadedSet
//!
//! ## 层次关系
//!
//! ```text
//! app (资源 + 生命周期)
//!     ↓
//! harvest_run (状态机)
//!     ↓
//! workflow::ExportFlow (处理单个文档)
//!     ↓
//! services (能力层：enumerate / paginate / upload / failures)
//!     ↓
//! driver + infrastructure (浏览器：HarvestDriver / JsExecutor / PageGuard)
//! ```

pub mod app;
pub mod harvest_run;

pub use app::App;
pub use harvest_run::HarvestRun;
