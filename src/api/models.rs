// Page payloads and form bodies

use actix_multipart::form::{tempfile::TempFile, MultipartForm};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::ingest::{LoadStats, UploadStatus, UploadedFile};
use crate::util::db::DisplayRow;

/// Payload for a category page, before and after an upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePayload {
    pub page_title: String,
    pub data: Vec<DisplayRow>,
    pub message: Option<String>,
    pub status: Option<UploadStatus>,
    pub table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<LoadStats>,
}

impl PagePayload {
    pub fn view(category: Category, data: Vec<DisplayRow>) -> Self {
        Self {
            page_title: category.title().to_string(),
            data,
            message: None,
            status: None,
            table_name: Some(category.table_name().to_string()),
            stats: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPage {
    pub page_title: &'static str,
    pub error: Option<String>,
}

impl LoginPage {
    pub fn new(error: Option<String>) -> Self {
        Self {
            page_title: "Login",
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub slug: &'static str,
    pub title: &'static str,
    pub table_name: &'static str,
}

impl From<Category> for MenuEntry {
    fn from(c: Category) -> Self {
        Self {
            slug: c.slug(),
            title: c.title(),
            table_name: c.table_name(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub page_title: &'static str,
    pub user: String,
    pub menus: Vec<MenuEntry>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

/// multipart/form-data body of an upload; the file field is `excelFile`.
#[derive(Debug, MultipartForm)]
pub struct UploadForm {
    #[multipart(rename = "excelFile")]
    pub excel_file: Option<TempFile>,
}

impl From<TempFile> for UploadedFile {
    fn from(f: TempFile) -> Self {
        UploadedFile {
            content_type: f.content_type.as_ref().map(|m| m.essence_str().to_string()),
            file_name: f.file_name,
            size: f.size,
            file: f.file,
        }
    }
}
