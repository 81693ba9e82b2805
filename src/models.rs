use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::collection::Collection;
use crate::errors::{ClientError, Result};

/// Platform-level credential identifying the integrating application.
///
/// Both fields must be non-empty before [`ApiClient::connect`](crate::ApiClient::connect)
/// succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceAccount {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub api_access_token: String,
}

impl ServiceAccount {
    pub fn new(key: impl Into<String>, api_access_token: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            api_access_token: api_access_token.into(),
        }
    }
}

/// Console login credential. Held by the client, not sent by any request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoginAccount {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// A media category. Unknown JSON members are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Category {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    /// `None` for root categories. The API sends `false` there.
    #[serde(default, deserialize_with = "parent_id")]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub count_of_media_contents: Option<u64>,
    #[serde(default)]
    pub level: Option<u32>,
}

fn parent_id<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Id(u64),
        Flag(bool),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Id(id)) => Some(id),
        Some(Raw::Flag(_)) | None => None,
    })
}

/// Processing phase of an uploaded media file, as reported in
/// `transcoding_stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodingStage {
    Waiting,
    Transcoding,
    Completed,
    TranscodingFailed,
    InvalidMedia,
    UnsupportedCodec,
    SourceNotFound,
    DownloadFailed,
    StorageFailed,
    TimedOut,
    Canceled,
    Deleted,
    Uploading,
}

impl TranscodingStage {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Waiting,
            1 => Self::Transcoding,
            2 => Self::Completed,
            3 => Self::TranscodingFailed,
            4 => Self::InvalidMedia,
            5 => Self::UnsupportedCodec,
            6 => Self::SourceNotFound,
            7 => Self::DownloadFailed,
            8 => Self::StorageFailed,
            9 => Self::TimedOut,
            10 => Self::Canceled,
            11 => Self::Deleted,
            12 => Self::Uploading,
            _ => return None,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Waiting => "Waiting",
            Self::Transcoding => "Transcoding",
            Self::Completed => "Completed",
            Self::TranscodingFailed => "Transcoding failed",
            Self::InvalidMedia => "Invalid media",
            Self::UnsupportedCodec => "Unsupported codec",
            Self::SourceNotFound => "Source not found",
            Self::DownloadFailed => "Download failed",
            Self::StorageFailed => "Storage failed",
            Self::TimedOut => "Timed out",
            Self::Canceled => "Canceled",
            Self::Deleted => "Deleted",
            Self::Uploading => "Uploading",
        }
    }

    /// Stages that will still change on their own. Listing pages poll while
    /// any file is in one of these.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Waiting | Self::Transcoding | Self::Uploading)
    }
}

/// An uploaded file and its transcoding state. Unknown JSON members are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UploadFile {
    #[serde(default)]
    pub upload_file_key: Option<String>,
    #[serde(default)]
    pub media_content_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub transcoding_stage: Option<i64>,
    #[serde(default)]
    pub transcoding_stage_name: Option<String>,
    #[serde(default)]
    pub transcoding_progress: Option<u32>,
    /// Unix seconds.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub transcoded_at: Option<i64>,
}

impl UploadFile {
    pub fn stage(&self) -> Option<TranscodingStage> {
        self.transcoding_stage.and_then(TranscodingStage::from_code)
    }

    /// Human label for `transcoding_stage`. Falls back to the label the API
    /// sent, then to `"Unknown"`.
    pub fn stage_label(&self) -> &str {
        match self.stage() {
            Some(stage) => stage.label(),
            None => self.transcoding_stage_name.as_deref().unwrap_or("Unknown"),
        }
    }

    /// `true` while the stage is waiting, uploading or transcoding.
    pub fn is_pending(&self) -> bool {
        self.stage().is_some_and(TranscodingStage::is_pending)
    }
}

/// One page of `media/upload_file`.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFilePage {
    pub per_page: u64,
    /// Total number of upload files across all pages.
    pub count: u64,
    pub items: Collection<UploadFile>,
}

impl UploadFilePage {
    /// `ceil(count / per_page)`.
    pub fn pages(&self) -> u64 {
        page_count(self.count, self.per_page)
    }
}

pub(crate) fn page_count(count: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 0;
    }
    count.div_ceil(per_page)
}

/// Parameters for [`ApiClient::get_upload_url_response`](crate::ApiClient::get_upload_url_response).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadUrlRequest {
    /// Category the uploaded media is filed under. Omitted when `None`.
    pub category_key: Option<String>,
    pub use_encryption: bool,
    pub is_audio_upload: bool,
    /// Omitted when `None` or empty.
    pub title: Option<String>,
    /// Seconds until the URL expires. Default: 600.
    pub expire_time: u64,
}

impl Default for UploadUrlRequest {
    fn default() -> Self {
        Self {
            category_key: None,
            use_encryption: false,
            is_audio_upload: false,
            title: None,
            expire_time: 600,
        }
    }
}

/// `result` of `create_url`: where to send the media bytes.
///
/// Members not modelled here are kept in `extra` so the object serializes
/// back exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UploadUrl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_file_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub will_be_expired_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Envelope decoding
// ---------------------------------------------------------------------------

/// `result` of a listing endpoint, with `items` already normalized.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub(crate) struct ListResult<T> {
    pub count: u64,
    #[serde(default)]
    pub per_page: Option<u64>,
    #[serde(deserialize_with = "one_or_wrapped")]
    pub items: Vec<T>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ListEnvelope<T> {
    result: ListResult<T>,
}

/// `items` is either a plain array or `{"item": [...]}`.
fn one_or_wrapped<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    #[derive(Deserialize)]
    #[serde(untagged, bound(deserialize = "T: DeserializeOwned"))]
    enum Items<T> {
        List(Vec<T>),
        Wrapped { item: Vec<T> },
    }

    Ok(match Items::<T>::deserialize(deserializer)? {
        Items::List(items) => items,
        Items::Wrapped { item } => item,
    })
}

/// Decode a listing envelope `{result: {count, items}}`.
pub(crate) fn decode_list<T: DeserializeOwned>(body: Value, status: u16) -> Result<ListResult<T>> {
    serde_json::from_value::<ListEnvelope<T>>(body)
        .map(|envelope| envelope.result)
        .map_err(|_| ClientError::invalid_response(Some(status)))
}

/// Decode the `result` object of `create_url`.
pub(crate) fn decode_upload_url(body: Value, status: u16) -> Result<UploadUrl> {
    match body {
        Value::Object(mut map) => match map.remove("result") {
            Some(result @ Value::Object(_)) => serde_json::from_value(result)
                .map_err(|_| ClientError::invalid_response(Some(status))),
            _ => Err(ClientError::invalid_response(Some(status))),
        },
        _ => Err(ClientError::invalid_response(Some(status))),
    }
}

/// `true` when the envelope's `error` member is `1`, `true` or `"1"`.
pub(crate) fn error_flag(body: &Value) -> bool {
    match body.get("error") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => s.trim() == "1",
        _ => false,
    }
}
