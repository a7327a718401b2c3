pub mod document_ctx;
pub mod export_flow;

pub use document_ctx::DocumentCtx;
pub use export_flow::{ExportFlow, ExportOutcome};
