//! # Pinpoint Harvester
//!
//! 从网页文档集合中逐个导出文档，并分批上传到入库服务
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure / Driver）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 集合页面的 owner，提供 eval() 能力
//! - `PageGuard` - 文档标签页的 owner，保证用完关闭
//! - `driver/` - `HarvestDriver` 接口：枚举 / 渲染导出 / 翻页
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `DocumentEnumerator` - 过滤并识别文档链接
//! - `Paginator` - 多种翻页方式统一接口
//! - `BatchUploader` - 逐个文件上传入库
//! - `IdentifierTracker` / `UploadedSet` - 去重记录
//! - `FailureWriter` - 写 failures.txt 能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文档"的处理流程
//! - `DocumentCtx` - 上下文封装（序号 + 文档引用）
//! - `ExportFlow` - 流程编排（渲染导出 → 失败记录）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，管理浏览器资源和中断
//! - `orchestrator/harvest_run` - 扫描 / 分发 / 上传 / 翻页 状态机
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod driver;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::{Config, PaginationMode};
pub use driver::{ChromiumDriver, HarvestDriver, PaginationStrategy};
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{DocumentReference, RunState, RunSummary};
pub use orchestrator::{App, HarvestRun};
pub use workflow::{DocumentCtx, ExportFlow, ExportOutcome};
