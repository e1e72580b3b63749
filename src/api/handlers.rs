// HTTP request handlers

use actix_multipart::form::MultipartForm;
use actix_web::{
    cookie::{Cookie, SameSite},
    http::{header, StatusCode},
    web, FromRequest, HttpMessage, HttpRequest, HttpResponse, Result,
};

use crate::api::models::*;
use crate::api::server::UploadSettings;
use crate::api::session::{verify_password, AuthError, SessionClaims, SessionKeys, SESSION_COOKIE};
use crate::category::Category;
use crate::ingest::{handle_upload, table_snapshot, UploadStatus};
use crate::util::db::Db;

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn category_from_path(slug: &str) -> Option<Category> {
    Category::from_slug(slug)
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": "Page not found" }))
}

/// Health check endpoint
pub async fn health_check(db: web::Data<Db>) -> Result<HttpResponse> {
    let database = if db.ping().await {
        "connected"
    } else {
        "disconnected"
    };
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        database,
    }))
}

pub async fn login_page(req: HttpRequest, keys: web::Data<SessionKeys>) -> Result<HttpResponse> {
    let logged_in = req
        .cookie(SESSION_COOKIE)
        .is_some_and(|c| keys.verify(c.value()).is_ok());
    if logged_in {
        return Ok(redirect("/"));
    }
    Ok(HttpResponse::Ok().json(LoginPage::new(None)))
}

pub async fn login(
    form: web::Form<LoginForm>,
    db: web::Data<Db>,
    keys: web::Data<SessionKeys>,
) -> Result<HttpResponse> {
    match authenticate(&db, &keys, &form.username, &form.password).await {
        Ok(token) => {
            tracing::info!(user = %form.username, "login succeeded");
            let cookie = Cookie::build(SESSION_COOKIE, token)
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .finish();
            Ok(HttpResponse::Found()
                .insert_header((header::LOCATION, "/"))
                .cookie(cookie)
                .finish())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!(user = %form.username, "login rejected");
            Ok(HttpResponse::Unauthorized()
                .json(LoginPage::new(Some(AuthError::InvalidCredentials.to_string()))))
        }
        Err(e) => {
            tracing::error!(error = %e, "login failed");
            Ok(HttpResponse::InternalServerError().json(LoginPage::new(Some("Server error".into()))))
        }
    }
}

async fn authenticate(
    db: &Db,
    keys: &SessionKeys,
    username: &str,
    password: &str,
) -> std::result::Result<String, AuthError> {
    let user = db
        .find_user(username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(password, &user.password) {
        return Err(AuthError::InvalidCredentials);
    }
    keys.issue(&user.username, user.id)
}

pub async fn logout() -> Result<HttpResponse> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, "/login"))
        .cookie(cookie)
        .finish())
}

pub async fn dashboard(req: HttpRequest) -> Result<HttpResponse> {
    let user = req
        .extensions()
        .get::<SessionClaims>()
        .map(|c| c.sub.clone())
        .unwrap_or_default();
    Ok(HttpResponse::Ok().json(DashboardPayload {
        page_title: "Dashboard",
        user,
        menus: Category::ALL.into_iter().map(MenuEntry::from).collect(),
    }))
}

/// Current contents of a category table.
pub async fn view_category(path: web::Path<String>, db: web::Data<Db>) -> Result<HttpResponse> {
    let Some(category) = category_from_path(&path) else {
        return Ok(not_found());
    };
    let data = table_snapshot(&db, category).await;
    Ok(HttpResponse::Ok().json(PagePayload::view(category, data)))
}

/// Multipart body of an upload request. Requests that are not
/// multipart/form-data carry no file and yield `None`.
async fn upload_form(req: &HttpRequest, payload: web::Payload) -> Result<Option<UploadForm>> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"));
    if !is_multipart {
        return Ok(None);
    }
    let MultipartForm(form) =
        MultipartForm::<UploadForm>::from_request(req, &mut payload.into_inner()).await?;
    Ok(Some(form))
}

/// Upload a workbook into a category table. Without a file this is the
/// plain category page.
pub async fn upload_category(
    path: web::Path<String>,
    req: HttpRequest,
    payload: web::Payload,
    db: web::Data<Db>,
    settings: web::Data<UploadSettings>,
) -> Result<HttpResponse> {
    let Some(category) = category_from_path(&path) else {
        return Ok(not_found());
    };
    let file = upload_form(&req, payload).await?.and_then(|f| f.excel_file);
    let Some(file) = file else {
        let data = table_snapshot(&db, category).await;
        return Ok(HttpResponse::Ok().json(PagePayload::view(category, data)));
    };
    let outcome = handle_upload(&db, file.into(), Some(category), settings.max_bytes).await;
    Ok(upload_response(category.title(), Some(category), outcome))
}

/// Parse a workbook without persisting it.
pub async fn upload_preview(
    req: HttpRequest,
    payload: web::Payload,
    db: web::Data<Db>,
    settings: web::Data<UploadSettings>,
) -> Result<HttpResponse> {
    let file = upload_form(&req, payload).await?.and_then(|f| f.excel_file);
    let Some(file) = file else {
        return Ok(HttpResponse::BadRequest().json(PagePayload {
            page_title: "Preview".into(),
            data: Vec::new(),
            message: Some("No file uploaded".into()),
            status: Some(UploadStatus::Error),
            table_name: None,
            stats: None,
        }));
    };
    let outcome = handle_upload(&db, file.into(), None, settings.max_bytes).await;
    Ok(upload_response("Preview", None, outcome))
}

fn upload_response(
    title: &str,
    category: Option<Category>,
    outcome: crate::ingest::UploadOutcome,
) -> HttpResponse {
    let code = outcome
        .error
        .as_ref()
        .map(|e| e.status_code())
        .unwrap_or(StatusCode::OK);
    HttpResponse::build(code).json(PagePayload {
        page_title: title.to_string(),
        data: outcome.data,
        message: Some(outcome.message),
        status: Some(outcome.status),
        table_name: category.map(|c| c.table_name().to_string()),
        stats: outcome.stats,
    })
}

/// Truncate an allow-listed table, then go back to its page.
pub async fn clear_table(path: web::Path<String>, db: web::Data<Db>) -> Result<HttpResponse> {
    let table = path.into_inner();
    let Some(category) = Category::from_table_name(&table) else {
        tracing::warn!(table = %table, "clear requested for table outside allow-list; ignoring");
        return Ok(redirect("/"));
    };
    if let Err(e) = db.truncate_table(category.table_name()).await {
        tracing::warn!(table = category.table_name(), error = %e, "truncate failed");
    }
    Ok(redirect(&category.path()))
}
