//! # Kollus client for Rust
//!
//! Async client for the [Kollus](https://kollus.com) video platform API,
//! plus the small upload front-end served by the `kollus-upload-web`
//! binary. List categories, create upload URLs, and page through upload
//! files and their transcoding state.
//!
//! ## Quick start
//!
//! ```no_run
//! use kollus::{ApiClient, Params, ServiceAccount, UploadUrlRequest};
//!
//! #[tokio::main]
//! async fn main() -> kollus::Result<()> {
//!     let mut client = ApiClient::new("kr.kollus.com", 0);
//!     client.set_service_account(ServiceAccount::new("my-key", "my-token"));
//!     client.connect()?;
//!
//!     let upload = client
//!         .get_upload_url_response(&UploadUrlRequest {
//!             title: Some("demo".into()),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("upload to {:?}", upload.upload_url);
//!
//!     for file in &client.get_upload_files(&Params::new(), false).await? {
//!         println!("{:?}: {}", file.title, file.stage_label());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Front-end
//!
//! [`web::router`] serves `GET /`, `POST /api/upload/create_url` and
//! `GET /api/upload_file`. [`config::Settings`] loads `config.yml`.

mod client;
mod collection;
mod errors;
mod models;

pub mod config;
pub mod web;

pub use client::{ApiClient, ApiClientBuilder, ApiResponse, Params};
pub use collection::Collection;
pub use errors::{ClientError, Result};
pub use models::{
    Category, LoginAccount, ServiceAccount, TranscodingStage, UploadFile, UploadFilePage,
    UploadUrl, UploadUrlRequest,
};
