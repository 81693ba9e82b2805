use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::{ApiClient, ApiClientBuilder};
use crate::errors::Result;
use crate::models::ServiceAccount;

const DEFAULT_CONFIG_FILE: &str = "config.yml";

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// The `kollus` section. Every member is optional; an incomplete section
/// means the front-end runs unconfigured.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct KollusConfig {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub scheme: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub api_domain: Option<String>,
    #[serde(default)]
    pub upload_api_domain: Option<String>,
    #[serde(default)]
    pub service_account: Option<ServiceAccountConfig>,
}

/// `kollus.service_account`. A missing member leaves the front-end
/// unconfigured; a present but empty one is rejected by
/// [`ApiClient::connect`].
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ServiceAccountConfig {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub api_access_token: Option<String>,
}

impl ServiceAccountConfig {
    /// The account when both credentials are present.
    pub fn account(&self) -> Option<ServiceAccount> {
        Some(ServiceAccount::new(
            self.key.clone()?,
            self.api_access_token.clone()?,
        ))
    }
}

impl KollusConfig {
    /// `true` when the section is missing or has no members at all.
    pub fn is_empty(&self) -> bool {
        self.domain.is_none()
            && self.version.is_none()
            && self.scheme.is_none()
            && self.timeout.is_none()
            && self.api_domain.is_none()
            && self.upload_api_domain.is_none()
            && self.service_account.is_none()
    }

    /// A builder when domain, version, key and access token are all
    /// present; `None` otherwise.
    pub fn client_builder(&self) -> Option<ApiClientBuilder> {
        let domain = self.domain.as_ref()?;
        let version = self.version?;
        let account = self.service_account.as_ref()?.account()?;

        let mut builder = ApiClientBuilder::new(domain.clone(), version).service_account(account);
        if let Some(scheme) = &self.scheme {
            builder = builder.scheme(scheme.clone());
        }
        if let Some(secs) = self.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(api_domain) = &self.api_domain {
            builder = builder.api_domain(api_domain.clone());
        }
        if let Some(upload_api_domain) = &self.upload_api_domain {
            builder = builder.upload_api_domain(upload_api_domain.clone());
        }
        Some(builder)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    server: Option<ServerConfig>,
    #[serde(default)]
    kollus: Option<KollusConfig>,
}

#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub kollus: KollusConfig,
}

impl Settings {
    /// Load `config.yml` (or the file named by `KOLLUS_CONFIG`), then apply
    /// `HOST` / `PORT` from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("KOLLUS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut settings = Self::from_file(&path)?;
        settings.apply_env();
        Ok(settings)
    }

    /// Parse the file at `path`. A missing file yields default settings;
    /// an unreadable or malformed one is an error.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let file: Option<ConfigFile> = serde_yaml::from_str(content)?;
        let file = file.unwrap_or_default();

        Ok(Self {
            server: file.server.unwrap_or_default(),
            kollus: file.kollus.unwrap_or_default(),
        })
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// A connected client, or `None` when the `kollus` section is
    /// incomplete.
    ///
    /// # Errors
    ///
    /// Fails when the section is complete but [`ApiClient::connect`] rejects
    /// the credentials (e.g. an empty access token).
    pub fn api_client(&self) -> Result<Option<ApiClient>> {
        let Some(builder) = self.kollus.client_builder() else {
            return Ok(None);
        };

        let mut client = builder.build();
        client.connect()?;
        Ok(Some(client))
    }
}
