pub mod enumerator;
pub mod failure_writer;
pub mod output_dir;
pub mod paginator;
pub mod tracker;
pub mod uploader;

pub use enumerator::{DocumentEnumerator, DocumentFilter};
pub use failure_writer::FailureWriter;
pub use output_dir::OutputDirectory;
pub use paginator::{Advance, Paginator};
pub use tracker::{IdentifierTracker, UploadedSet};
pub use uploader::{BatchUploader, UploadReceipt};
