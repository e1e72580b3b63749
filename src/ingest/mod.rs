//! Spreadsheet ingestion into per-category tables.
//!
//! `workbook` turns an upload into [`SheetRow`]s, `schema` creates the
//! destination table from the first row, `loader` inserts rows while skipping
//! duplicates, and `upload` ties them together for a single request.

pub mod columns;
pub mod error;
pub mod loader;
pub mod row;
pub mod schema;
pub mod upload;
pub mod workbook;

pub use columns::{sanitize, unique_column_names, ColumnNamer};
pub use error::UploadError;
pub use loader::{load_rows, LoadStats, KEY_PREFIX_LEN};
pub use row::{CellValue, SheetRow};
pub use schema::ensure_table;
pub use upload::{handle_upload, table_snapshot, UploadOutcome, UploadStatus, UploadedFile};
