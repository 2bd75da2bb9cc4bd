use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Value};

use icon_core::IconFile;
use icon_types::{AllowListSummary, Caller, IconDescriptor};

use crate::auth::Credentials;
use crate::context::ServiceContext;
use crate::error::{ServerError, ServerResult};

/// Reply to a successful upload.
#[derive(Debug, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub format: String,
    pub size: String,
    pub path: String,
    pub commit: String,
}

impl From<IconFile> for StoredFile {
    fn from(file: IconFile) -> Self {
        Self {
            path: file.path(),
            commit: file.commit.to_string(),
            name: file.name.into_inner(),
            format: file.key.format,
            size: file.key.size,
        }
    }
}

/// Fields of an upload form. Unknown fields are ignored.
#[derive(Debug, Default)]
struct UploadForm {
    name: Option<String>,
    format: Option<String>,
    size: Option<String>,
    icon: Option<Bytes>,
}

async fn read_form(mut multipart: Multipart) -> ServerResult<UploadForm> {
    let bad = |e: axum::extract::multipart::MultipartError| ServerError::BadRequest(e.to_string());
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => form.name = Some(field.text().await.map_err(bad)?),
            "format" => form.format = Some(field.text().await.map_err(bad)?),
            "size" => form.size = Some(field.text().await.map_err(bad)?),
            "icon" => form.icon = Some(field.bytes().await.map_err(bad)?),
            _ => {}
        }
    }
    Ok(form)
}

fn required<T>(value: Option<T>, field: &str) -> ServerResult<T> {
    value.ok_or_else(|| ServerError::BadRequest(format!("missing form field {field:?}")))
}

async fn caller(ctx: &ServiceContext, headers: &HeaderMap) -> ServerResult<Caller> {
    let credentials = Credentials::from_headers(headers)?;
    ctx.auth.authenticate(&credentials).await
}

fn content_type(format: &str) -> &'static str {
    match format {
        "svg" => "image/svg+xml",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Allowed formats and sizes.
pub async fn icons_config(State(ctx): State<ServiceContext>) -> Json<AllowListSummary> {
    Json(ctx.coordinator.allow_list_summary())
}

pub async fn list_icons(
    State(ctx): State<ServiceContext>,
) -> ServerResult<Json<Vec<IconDescriptor>>> {
    Ok(Json(ctx.coordinator.list_icons().await?))
}

pub async fn describe_icon(
    State(ctx): State<ServiceContext>,
    Path(name): Path<String>,
) -> ServerResult<Json<IconDescriptor>> {
    Ok(Json(ctx.coordinator.describe_icon(&name).await?))
}

/// `POST /icons` with form fields `name`, `format`, `size` and `icon`.
pub async fn create_icon(
    State(ctx): State<ServiceContext>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ServerResult<(StatusCode, Json<StoredFile>)> {
    let caller = caller(&ctx, &headers).await?;
    let form = read_form(multipart).await?;
    let name = required(form.name, "name")?;
    let format = required(form.format, "format")?;
    let size = required(form.size, "size")?;
    let icon = required(form.icon, "icon")?;

    let file = ctx
        .coordinator
        .create_icon(&name, &format, &size, icon, &caller)
        .await?;
    Ok((StatusCode::CREATED, Json(file.into())))
}

pub async fn remove_icon(
    State(ctx): State<ServiceContext>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> ServerResult<StatusCode> {
    let caller = caller(&ctx, &headers).await?;
    ctx.coordinator.remove_icon(&name, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_icon_file(
    State(ctx): State<ServiceContext>,
    Path((name, format, size)): Path<(String, String, String)>,
) -> ServerResult<Response> {
    let bytes = ctx
        .coordinator
        .get_icon_file_content(&name, &format, &size)
        .await?;
    Ok(([(header::CONTENT_TYPE, content_type(&format))], bytes).into_response())
}

/// `POST /icons/:name/formats/:format/sizes/:size` with form field `icon`.
pub async fn add_icon_file(
    State(ctx): State<ServiceContext>,
    Path((name, format, size)): Path<(String, String, String)>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ServerResult<(StatusCode, Json<StoredFile>)> {
    let caller = caller(&ctx, &headers).await?;
    let form = read_form(multipart).await?;
    let icon = required(form.icon, "icon")?;

    let file = ctx
        .coordinator
        .add_icon_file(&name, &format, &size, icon, &caller)
        .await?;
    Ok((StatusCode::CREATED, Json(file.into())))
}

pub async fn remove_icon_file(
    State(ctx): State<ServiceContext>,
    Path((name, format, size)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> ServerResult<StatusCode> {
    let caller = caller(&ctx, &headers).await?;
    ctx.coordinator
        .remove_icon_file(&name, &format, &size, &caller)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
