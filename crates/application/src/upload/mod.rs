//! Direct-to-storage uploads with preview URL rewriting.

mod pipeline;
mod sink;

pub use pipeline::{UploadPipeline, IMAGE_UPLOAD_ENDPOINT, PRESIGNED_URL_ENDPOINT};
pub use sink::UrlSink;
