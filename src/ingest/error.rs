use actix_web::http::StatusCode;
use thiserror::Error;

/// Failures that abort an upload as a whole.
///
/// Per-row insert failures are not represented here; the loader counts them
/// in `LoadStats::errors` and keeps going.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File must be an Excel spreadsheet (.xls or .xlsx), got {0}")]
    UnsupportedFileType(String),

    #[error("File is too large ({size} bytes, limit {limit} bytes)")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Excel file has no sheets.")]
    EmptyWorkbook,

    #[error("Excel file has no data. Make sure there are data rows after the header.")]
    EmptySheet,

    #[error("All data rows are empty. Make sure the Excel file contains valid data.")]
    AllRowsBlank,

    #[error("Unable to read spreadsheet: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Unable to read uploaded file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to prepare table {table}: {source}")]
    Schema {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl UploadError {
    /// Parse-time validation failures (nothing was written).
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            UploadError::EmptyWorkbook
                | UploadError::EmptySheet
                | UploadError::AllRowsBlank
                | UploadError::Workbook(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            e if e.is_parse_error() => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_kinds_to_http_status() {
        assert_eq!(
            UploadError::UnsupportedFileType("text/csv".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            UploadError::FileTooLarge { size: 11, limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(UploadError::AllRowsBlank.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            UploadError::Schema {
                table: "in_stok",
                source: sqlx::Error::RowNotFound
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
