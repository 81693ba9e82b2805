use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Method, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::collection::Collection;
use crate::errors::{ClientError, Result};
use crate::models::{
    decode_list, decode_upload_url, error_flag, Category, LoginAccount, ServiceAccount,
    UploadFile, UploadFilePage, UploadUrl, UploadUrlRequest,
};

const DEFAULT_SCHEME: &str = "http";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_PER_PAGE: u64 = 100;

const CATEGORY_PATH: &str = "media/category";
const UPLOAD_FILE_PATH: &str = "media/upload_file";
const CREATE_URL_PATH: &str = "media_auth/upload/create_url.json";

/// Query or form parameters, sent in key order.
pub type Params = BTreeMap<String, String>;

/// Builder for constructing an [`ApiClient`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use kollus::{ApiClientBuilder, ServiceAccount};
/// use std::time::Duration;
///
/// # async fn example() -> kollus::Result<()> {
/// let mut client = ApiClientBuilder::new("kr.kollus.com", 0)
///     .scheme("https")
///     .timeout(Duration::from_secs(10))
///     .service_account(ServiceAccount::new("my-key", "my-token"))
///     .build();
/// client.connect()?;
///
/// for category in &client.get_categories(&Default::default(), false).await? {
///     println!("{:?}", category.name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClientBuilder {
    domain: String,
    version: u32,
    scheme: String,
    timeout: Duration,
    api_domain: Option<String>,
    upload_api_domain: Option<String>,
    max_attempts: u32,
    service_account: Option<ServiceAccount>,
    login_account: Option<LoginAccount>,
}

impl ApiClientBuilder {
    /// Create a builder for the platform at `domain`, API `version`.
    pub fn new(domain: impl Into<String>, version: u32) -> Self {
        Self {
            domain: domain.into(),
            version,
            scheme: DEFAULT_SCHEME.to_string(),
            timeout: DEFAULT_TIMEOUT,
            api_domain: None,
            upload_api_domain: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            service_account: None,
            login_account: None,
        }
    }

    /// URL scheme for every request (defaults to `http`).
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Default per-request timeout (defaults to 5 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Explicit API host, replacing the derived `api.<domain>`.
    pub fn api_domain(mut self, api_domain: impl Into<String>) -> Self {
        self.api_domain = Some(api_domain.into());
        self
    }

    /// Dedicated upload host. When set, upload URLs are created through
    /// `<scheme>://<upload_api_domain>/api/v1/create_url`.
    pub fn upload_api_domain(mut self, upload_api_domain: impl Into<String>) -> Self {
        self.upload_api_domain = Some(upload_api_domain.into());
        self
    }

    /// Total HTTP attempts per logical request, first one included
    /// (defaults to 3).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the service account used to authenticate every request.
    pub fn service_account(mut self, account: ServiceAccount) -> Self {
        self.service_account = Some(account);
        self
    }

    /// Attach a console login account.
    pub fn login_account(mut self, account: LoginAccount) -> Self {
        self.login_account = Some(account);
        self
    }

    /// Build an unconnected [`ApiClient`].
    pub fn build(self) -> ApiClient {
        ApiClient {
            domain: self.domain,
            version: self.version,
            scheme: self.scheme,
            timeout: self.timeout,
            api_domain: self.api_domain,
            upload_api_domain: self.upload_api_domain,
            max_attempts: self.max_attempts.max(1),
            service_account: self.service_account,
            login_account: self.login_account,
            transport: None,
        }
    }
}

/// A decoded response body together with the status it arrived with.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug)]
struct Transport {
    http: reqwest::Client,
    base_url: Url,
}

/// The Kollus API client.
///
/// A client starts unconnected. [`connect`](Self::connect) validates the
/// service account and opens the transport; every request made before that
/// fails with [`ClientError::NotConnected`].
///
/// Calls on one client are sequential. Share it behind an `Arc` for reads,
/// but serialize `connect`, `disconnect` and the setters.
#[derive(Debug)]
pub struct ApiClient {
    domain: String,
    version: u32,
    scheme: String,
    timeout: Duration,
    api_domain: Option<String>,
    upload_api_domain: Option<String>,
    max_attempts: u32,
    service_account: Option<ServiceAccount>,
    login_account: Option<LoginAccount>,
    transport: Option<Transport>,
}

impl ApiClient {
    /// Create an unconnected client with default settings.
    ///
    /// For customization, use [`ApiClientBuilder`] instead.
    pub fn new(domain: impl Into<String>, version: u32) -> Self {
        ApiClientBuilder::new(domain, version).build()
    }

    /// The platform domain, e.g. `kr.kollus.com`.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The API version segment of the base URL.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The URL scheme, `http` unless configured otherwise.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The default per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The API host: the explicit one if set, otherwise `api.<domain>`.
    pub fn api_domain(&self) -> String {
        match &self.api_domain {
            Some(d) if !d.is_empty() => d.clone(),
            _ => format!("api.{}", self.domain),
        }
    }

    /// Takes effect on the next [`connect`](Self::connect).
    pub fn set_api_domain(&mut self, api_domain: Option<String>) {
        self.api_domain = api_domain;
    }

    /// The dedicated upload host, if one is set.
    pub fn upload_api_domain(&self) -> Option<&str> {
        self.upload_api_domain.as_deref().filter(|d| !d.is_empty())
    }

    /// Set or clear the dedicated upload host.
    pub fn set_upload_api_domain(&mut self, upload_api_domain: Option<String>) {
        self.upload_api_domain = upload_api_domain;
    }

    /// The attached service account.
    pub fn service_account(&self) -> Option<&ServiceAccount> {
        self.service_account.as_ref()
    }

    /// Attach a service account. Call [`connect`](Self::connect) again to validate it.
    pub fn set_service_account(&mut self, account: ServiceAccount) {
        self.service_account = Some(account);
    }

    /// The attached console login account.
    pub fn login_account(&self) -> Option<&LoginAccount> {
        self.login_account.as_ref()
    }

    /// Attach a console login account.
    pub fn set_login_account(&mut self, account: LoginAccount) {
        self.login_account = Some(account);
    }

    /// `true` between [`connect`](Self::connect) and [`disconnect`](Self::disconnect).
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// `<scheme>://<api_domain>/<version>/` once connected.
    pub fn base_url(&self) -> Option<&Url> {
        self.transport.as_ref().map(|t| &t.base_url)
    }

    /// Validate the service account and open the HTTP transport.
    ///
    /// The transport never follows redirects.
    ///
    /// # Errors
    ///
    /// - [`ClientError::MissingServiceAccount`] if no account is attached.
    /// - [`ClientError::EmptyServiceAccountKey`] / [`ClientError::EmptyAccessToken`]
    ///   if either credential is empty.
    ///
    /// No transport is created when validation fails.
    pub fn connect(&mut self) -> Result<&mut Self> {
        self.validate_credentials()?;

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        self.connect_with(http)
    }

    /// Like [`connect`](Self::connect), but uses a caller-supplied
    /// `reqwest::Client` as the transport.
    pub fn connect_with(&mut self, http: reqwest::Client) -> Result<&mut Self> {
        self.validate_credentials()?;

        let base_url = Url::parse(&format!(
            "{}://{}/{}/",
            self.scheme,
            self.api_domain(),
            self.version
        ))?;

        debug!(%base_url, "connected");
        self.transport = Some(Transport { http, base_url });
        Ok(self)
    }

    /// Drop the transport. Calling it on a disconnected client is a no-op.
    pub fn disconnect(&mut self) -> &mut Self {
        self.transport = None;
        self
    }

    fn validate_credentials(&self) -> Result<()> {
        let account = self
            .service_account
            .as_ref()
            .ok_or(ClientError::MissingServiceAccount)?;

        if account.key.is_empty() {
            return Err(ClientError::EmptyServiceAccountKey);
        }
        if account.api_access_token.is_empty() {
            return Err(ClientError::EmptyAccessToken);
        }
        Ok(())
    }

    fn access_token(&self) -> Result<&str> {
        self.service_account
            .as_ref()
            .map(|a| a.api_access_token.as_str())
            .ok_or(ClientError::MissingServiceAccount)
    }

    /// Issue one logical request and decode its JSON body.
    ///
    /// `path` is resolved against [`base_url`](Self::base_url); an absolute
    /// URL replaces it. Query and form parameters are attached only when
    /// non-empty. `timeout` overrides the client default for this call.
    ///
    /// A response whose status is not 200 is discarded and the request sent
    /// again, immediately, up to the configured number of attempts. The body
    /// of the last response is then decoded whatever its status.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConnected`] before [`connect`](Self::connect).
    /// - [`ClientError::Http`] on a transport failure (not retried).
    /// - [`ClientError::InvalidResponse`] if the body is not JSON.
    /// - [`ClientError::Remote`] if the body sets its `error` flag.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &Params,
        form: &Params,
        timeout: Option<Duration>,
    ) -> Result<ApiResponse> {
        let transport = self.transport.as_ref().ok_or(ClientError::NotConnected)?;
        let url = transport.base_url.join(path)?;
        let timeout = timeout.unwrap_or(self.timeout);

        let mut attempt = 0;
        let (status, text) = loop {
            attempt += 1;

            let mut req = transport
                .http
                .request(method.clone(), url.clone())
                .timeout(timeout);
            if !query.is_empty() {
                req = req.query(query);
            }
            if !form.is_empty() {
                req = req.form(form);
            }

            debug!(%method, path = url.path(), attempt, "sending request");
            let response = req.send().await?;
            let status = response.status().as_u16();

            if status == 200 || attempt >= self.max_attempts {
                break (status, response.text().await?);
            }
            warn!(%method, path = url.path(), attempt, status, "unexpected status, retrying");
        };

        let body: Value = serde_json::from_str(&text)
            .map_err(|_| ClientError::invalid_response(Some(status)))?;

        if error_flag(&body) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(text);
            return Err(ClientError::Remote { message, status });
        }

        Ok(ApiResponse { status, body })
    }

    /// List media categories.
    ///
    /// `params` are passed through as query parameters; `force` asks the
    /// API to bypass its cache.
    pub async fn get_categories(&self, params: &Params, force: bool) -> Result<Collection<Category>> {
        let mut query = params.clone();
        query.insert("access_token".into(), self.access_token()?.to_string());
        query.insert("force".into(), flag(force));

        let response = self
            .request(Method::GET, CATEGORY_PATH, &query, &Params::new(), None)
            .await?;
        let result = decode_list::<Category>(response.body, response.status)?;

        Ok(result.items.into())
    }

    /// Create a short-lived URL to upload media bytes to.
    ///
    /// Returns the `result` object of the response as sent.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidResponse`] if the response has no `result`.
    pub async fn get_upload_url_response(&self, request: &UploadUrlRequest) -> Result<UploadUrl> {
        let mut form = Params::new();
        form.insert("access_token".into(), self.access_token()?.to_string());
        if let Some(key) = request.category_key.as_deref().filter(|k| !k.is_empty()) {
            form.insert("category_key".into(), key.to_string());
        }
        form.insert("expire_time".into(), request.expire_time.to_string());
        form.insert("is_encryption_upload".into(), flag(request.use_encryption));
        form.insert("is_audio_upload".into(), flag(request.is_audio_upload));
        if let Some(title) = request.title.as_deref().filter(|t| !t.is_empty()) {
            form.insert("title".into(), title.to_string());
        }

        let path = match self.upload_api_domain() {
            Some(domain) => format!("{}://{}/api/v1/create_url", self.scheme, domain),
            None => CREATE_URL_PATH.to_string(),
        };

        let response = self
            .request(Method::POST, &path, &Params::new(), &form, None)
            .await?;
        decode_upload_url(response.body, response.status)
    }

    /// Fetch one page of upload files.
    pub async fn find_upload_files_by_page(
        &self,
        page: u64,
        params: &Params,
        force: bool,
    ) -> Result<UploadFilePage> {
        let mut query = params.clone();
        query.insert("access_token".into(), self.access_token()?.to_string());
        query.insert("page".into(), page.to_string());
        query.insert("force".into(), flag(force));

        let response = self
            .request(Method::GET, UPLOAD_FILE_PATH, &query, &Params::new(), None)
            .await?;
        let status = response.status;
        let result = decode_list::<UploadFile>(response.body, status)?;

        let per_page = result
            .per_page
            .filter(|&p| p > 0)
            .ok_or_else(|| ClientError::invalid_response(Some(status)))?;

        Ok(UploadFilePage {
            per_page,
            count: result.count,
            items: result.items.into(),
        })
    }

    /// Fetch every upload file, walking pages `1..=ceil(count / per_page)`.
    ///
    /// `per_page` defaults to 100 when `params` does not set it. Items keep
    /// page order, then in-page order. A failure on any page discards the
    /// pages fetched so far and returns that error.
    pub async fn get_upload_files(&self, params: &Params, force: bool) -> Result<Collection<UploadFile>> {
        let mut params = params.clone();
        params
            .entry("per_page".into())
            .or_insert_with(|| DEFAULT_PER_PAGE.to_string());

        let first = self.find_upload_files_by_page(1, &params, force).await?;
        let pages = first.pages();
        let mut files = first.items;

        for page in 2..=pages {
            debug!(page, pages, "fetching upload file page");
            let next = self.find_upload_files_by_page(page, &params, force).await?;
            files.extend(next.items);
        }

        debug!(pages, count = files.len(), "fetched upload files");
        Ok(files)
    }
}

fn flag(value: bool) -> String {
    let flag = if value { "1" } else { "0" };
    flag.to_string()
}
