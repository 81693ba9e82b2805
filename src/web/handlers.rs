use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, Json};
use axum::Form;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::client::{ApiClient, Params};
use crate::collection::Collection;
use crate::errors::ClientError;
use crate::models::{UploadFile, UploadUrl, UploadUrlRequest};
use crate::web::views;
use crate::web::AppState;

const LIST_PER_PAGE: u64 = 10;

type HandlerError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Form body of `POST /api/upload/create_url`. Empty fields count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUrlForm {
    #[serde(default)]
    pub category_key: Option<String>,
    #[serde(default)]
    pub use_encryption: Option<String>,
    #[serde(default)]
    pub is_audio_upload: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl CreateUrlForm {
    fn into_request(self) -> UploadUrlRequest {
        UploadUrlRequest {
            category_key: non_empty(self.category_key),
            use_encryption: is_truthy(self.use_encryption.as_deref()),
            is_audio_upload: is_truthy(self.is_audio_upload.as_deref()),
            title: non_empty(self.title),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUrlResponse {
    pub result: UploadUrl,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadFileItem {
    pub upload_file_key: Option<String>,
    pub media_content_id: Option<u64>,
    pub title: Option<String>,
    pub transcoding_stage: Option<i64>,
    pub transcoding_stage_name: String,
    pub transcoding_progress: Option<u32>,
    pub created_at: Option<i64>,
    pub transcoded_at: Option<i64>,
}

impl From<&UploadFile> for UploadFileItem {
    fn from(file: &UploadFile) -> Self {
        Self {
            upload_file_key: file.upload_file_key.clone(),
            media_content_id: file.media_content_id,
            title: file.title.clone(),
            transcoding_stage: file.transcoding_stage,
            transcoding_stage_name: file.stage_label().to_string(),
            transcoding_progress: file.transcoding_progress,
            created_at: file.created_at,
            transcoded_at: file.transcoded_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadFileList {
    pub per_page: u64,
    pub count: u64,
    pub items: Vec<UploadFileItem>,
    /// `true` while any listed file is still waiting, uploading or
    /// transcoding.
    pub auto_reload: bool,
}

/// Render the index page
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let categories = match &state.client {
        Some(client) => match client.get_categories(&Params::new(), false).await {
            Ok(categories) => categories,
            Err(e) => {
                error!(error = %e, "[GET /] failed to load categories");
                Collection::new()
            }
        },
        None => Collection::new(),
    };

    info!(
        exists_config = state.exists_config,
        categories = categories.len(),
        "[GET /] rendered"
    );
    Html(views::index_page(
        state.exists_config,
        state.client.is_some(),
        &categories,
    ))
}

/// Create an upload URL
pub async fn create_upload_url(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CreateUrlForm>,
) -> Result<Json<CreateUrlResponse>, HandlerError> {
    let client = configured_client(&state)?;
    let request = form.into_request();

    let result = client
        .get_upload_url_response(&request)
        .await
        .map_err(|e| {
            error!(error = %e, status = ?e.status(), "[POST /api/upload/create_url] failed");
            client_failure(e)
        })?;

    info!(
        upload_file_key = result.upload_file_key.as_deref().unwrap_or(""),
        "[POST /api/upload/create_url] created"
    );
    Ok(Json(CreateUrlResponse { result }))
}

/// First page of upload files, with a polling hint
pub async fn list_upload_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UploadFileList>, HandlerError> {
    let client = configured_client(&state)?;

    let mut params = Params::new();
    params.insert("per_page".into(), LIST_PER_PAGE.to_string());

    let page = client
        .find_upload_files_by_page(1, &params, false)
        .await
        .map_err(|e| {
            error!(error = %e, status = ?e.status(), "[GET /api/upload_file] failed");
            client_failure(e)
        })?;

    let auto_reload = page.items.iter().any(UploadFile::is_pending);
    let items = page.items.iter().map(UploadFileItem::from).collect();

    Ok(Json(UploadFileList {
        per_page: page.per_page,
        count: page.count,
        items,
        auto_reload,
    }))
}

fn configured_client(state: &AppState) -> Result<&ApiClient, HandlerError> {
    state.client.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Kollus API is not configured".to_string(),
            }),
        )
    })
}

fn client_failure(e: ClientError) -> HandlerError {
    let status = match e {
        ClientError::NotConnected
        | ClientError::MissingServiceAccount
        | ClientError::EmptyServiceAccountKey
        | ClientError::EmptyAccessToken => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn is_truthy(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(v) => !matches!(v.trim(), "" | "0" | "false" | "off"),
    }
}
