pub mod js_executor;
pub mod page_guard;

pub use js_executor::JsExecutor;
pub use page_guard::PageGuard;
