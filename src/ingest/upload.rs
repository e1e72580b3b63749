//! Upload orchestration: validate → parse → ensure table → load → re-read.

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::category::Category;
use crate::util::db::{Db, DisplayRow};

use super::error::UploadError;
use super::loader::{load_rows, LoadStats};
use super::schema::ensure_table;
use super::workbook::read_first_sheet;

pub const XLS_CONTENT_TYPE: &str = "application/vnd.ms-excel";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const ALLOWED_CONTENT_TYPES: [&str; 2] = [XLS_CONTENT_TYPE, XLSX_CONTENT_TYPE];

/// 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A spooled upload. The temp file is deleted when this value is dropped.
#[derive(Debug)]
pub struct UploadedFile {
    pub file: NamedTempFile,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Success,
    Error,
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub message: String,
    pub status: UploadStatus,
    /// Current table contents after the attempt (empty in preview mode).
    pub data: Vec<DisplayRow>,
    pub stats: Option<LoadStats>,
    pub error: Option<UploadError>,
}

/// Whether `content_type` is one of the accepted spreadsheet MIME types.
/// Parameters such as `; charset=...` are ignored.
pub fn is_spreadsheet_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}

pub fn success_message(stats: &LoadStats) -> String {
    let mut msg = format!(
        "Success! {} new rows saved. {} duplicate rows ignored.",
        stats.inserted, stats.skipped
    );
    if stats.errors > 0 {
        msg.push_str(&format!(" {} rows failed.", stats.errors));
    }
    msg
}

/// Process one uploaded workbook for `category` (or preview it when `None`).
///
/// Never fails: every error is folded into an outcome with
/// [`UploadStatus::Error`], and the table's current rows are returned either way.
pub async fn handle_upload(
    db: &Db,
    upload: UploadedFile,
    category: Option<Category>,
    max_bytes: usize,
) -> UploadOutcome {
    let span = info_span!(
        "upload",
        upload_id = %uuid::Uuid::new_v4(),
        table = category.map(Category::table_name).unwrap_or("<preview>"),
        file = upload.file_name.as_deref().unwrap_or("<unnamed>"),
    );

    async move {
        let result = ingest(db, upload, category, max_bytes).await;
        let data = match category {
            Some(c) => table_snapshot(db, c).await,
            None => Vec::new(),
        };

        match result {
            Ok((message, stats)) => {
                info!(?stats, "upload finished");
                UploadOutcome {
                    message,
                    status: UploadStatus::Success,
                    data,
                    stats,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "upload failed");
                UploadOutcome {
                    message: format!("An error occurred: {e}"),
                    status: UploadStatus::Error,
                    data,
                    stats: None,
                    error: Some(e),
                }
            }
        }
    }
    .instrument(span)
    .await
}

async fn ingest(
    db: &Db,
    upload: UploadedFile,
    category: Option<Category>,
    max_bytes: usize,
) -> Result<(String, Option<LoadStats>), UploadError> {
    // any early return drops `upload`, which removes the temp file
    check_file(&upload, max_bytes)?;
    let sheet = read_first_sheet(upload.file.path())?;
    remove_temp_file(upload.file);

    let Some(category) = category else {
        return Ok((
            format!("Uploaded {} rows (preview only)!", sheet.rows.len()),
            None,
        ));
    };

    ensure_table(db, category, sheet.rows.first())
        .await
        .map_err(|source| UploadError::Schema {
            table: category.table_name(),
            source,
        })?;
    let stats = load_rows(db, category, &sheet.rows).await;
    Ok((success_message(&stats), Some(stats)))
}

fn check_file(upload: &UploadedFile, max_bytes: usize) -> Result<(), UploadError> {
    let content_type = upload.content_type.as_deref().unwrap_or_default();
    if !is_spreadsheet_content_type(content_type) {
        let shown = if content_type.is_empty() {
            "unknown type".to_string()
        } else {
            content_type.to_string()
        };
        return Err(UploadError::UnsupportedFileType(shown));
    }
    if upload.size > max_bytes {
        return Err(UploadError::FileTooLarge {
            size: upload.size,
            limit: max_bytes,
        });
    }
    Ok(())
}

fn remove_temp_file(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        warn!(path = %path.display(), error = %e, "failed to remove uploaded file");
    }
}

/// Full current contents of the category's table. A table that does not exist
/// yet (or cannot be read) shows as empty.
pub async fn table_snapshot(db: &Db, category: Category) -> Vec<DisplayRow> {
    match db.fetch_table(category.table_name()).await {
        Ok(rows) => rows,
        Err(e) => {
            debug!(table = category.table_name(), error = %e, "table not readable; showing no rows");
            Vec::new()
        }
    }
}
