pub mod document;
pub mod summary;
pub mod upload;

pub use document::{DocumentReference, RawLink};
pub use summary::{RunState, RunSummary};
pub use upload::{BatchResult, IngestResponse, IngestedDocument, UploadFailure};
