//! Resume intake: the submission pipeline, its errors and progress reporting,
//! record persistence, and the HTTP handlers that front it.

pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod progress;
pub mod records;

pub use error::{ErrorKind, IngestError};
pub use pipeline::{Collaborators, IngestionPipeline, PipelineOptions, SubmitRequest};
pub use progress::{IngestStage, LogObserver, ProgressEvent, ProgressObserver};
pub use records::{load_record, save_record};
