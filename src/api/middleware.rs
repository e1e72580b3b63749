// Request logging, compression and upload limits

use actix_multipart::{
    form::{tempfile::TempFileConfig, MultipartFormConfig},
    MultipartError,
};
use actix_web::{
    error::InternalError,
    middleware::{Compress, Logger},
    HttpRequest, HttpResponse, ResponseError,
};
use std::path::Path;

pub fn setup_middleware() -> (Logger, Compress) {
    let logger = Logger::default();
    let compress = Compress::default();
    (logger, compress)
}

/// Caps the whole multipart body at `max_bytes` and keeps at most the same
/// amount in memory before spilling to disk.
pub fn multipart_config(max_bytes: usize) -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(max_bytes)
        .memory_limit(max_bytes)
        .error_handler(multipart_error)
}

/// Temp files for uploaded workbooks land in `dir`.
pub fn temp_file_config(dir: &Path) -> TempFileConfig {
    TempFileConfig::default().directory(dir)
}

fn multipart_error(err: MultipartError, req: &HttpRequest) -> actix_web::Error {
    let code = err.status_code();
    tracing::warn!(path = %req.path(), status = code.as_u16(), error = %err, "multipart body rejected");
    let body = serde_json::json!({
        "message": format!("An error occurred: {err}"),
        "status": "error",
        "data": [],
    });
    InternalError::from_response(err, HttpResponse::build(code).json(body)).into()
}
