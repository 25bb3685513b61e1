//! GitHub Packages version index client
//!
//! Fetches the tagged versions of a container package from the GitHub
//! Packages API, following `Link` header pagination, and keeps only the
//! tags carrying a recognized release-channel prefix.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::reference::prefix::TagPrefixes;
use crate::version::encoding::EncodedVersion;
use crate::version::types::RemoteVersionEntry;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Trait for fetching the available versions of a package.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VersionIndex: Send + Sync {
    /// Fetches all recognized versions for a package.
    ///
    /// Returns an empty list when the package exists but carries no
    /// version with a recognized tag prefix.
    async fn fetch_versions(
        &self,
        package_name: &str,
    ) -> Result<Vec<RemoteVersionEntry>, RegistryError>;
}

/// Response item from the package versions API.
///
/// Items are deserialized tolerantly: anything missing container metadata,
/// tags or a creation timestamp is skipped, not an error.
#[derive(Debug, Deserialize)]
struct PackageVersionItem {
    #[serde(default)]
    name: String,
    created_at: Option<DateTime<Utc>>,
    metadata: Option<VersionMetadata>,
}

#[derive(Debug, Deserialize)]
struct VersionMetadata {
    container: Option<ContainerMetadata>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetadata {
    tags: Option<Vec<String>>,
}

/// Client for the GitHub Packages versions API.
pub struct GitHubPackagesClient {
    client: reqwest::Client,
    base_url: String,
    org: String,
    per_page: u32,
    prefixes: TagPrefixes,
}

impl GitHubPackagesClient {
    pub fn new(
        base_url: &str,
        token: &str,
        org: &str,
        per_page: u32,
        prefixes: TagPrefixes,
    ) -> Self {
        Self {
            client: build_client(token),
            base_url: base_url.to_string(),
            org: org.to_string(),
            per_page,
            prefixes,
        }
    }

    /// Follow `Link: <...>; rel="next"` headers until the last page.
    async fn paginate(
        &self,
        package_name: &str,
        first_url: String,
    ) -> Result<Vec<serde_json::Value>, RegistryError> {
        let mut items = Vec::new();
        let mut url = first_url;
        let mut first_page = true;

        loop {
            debug!("fetching (GET) {url}");
            // next-page URLs already carry their query params
            let request = if first_page {
                self.client
                    .get(&url)
                    .query(&[("per_page", self.per_page)])
            } else {
                self.client.get(&url)
            };
            let response = request.send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(RegistryError::NotFound(package_name.to_string()));
            }
            if !status.is_success() {
                warn!("package index returned status {status}: {url}");
                return Err(RegistryError::InvalidResponse(format!(
                    "Unexpected status: {status}"
                )));
            }

            let next = next_page_url(response.headers());
            let page: Vec<serde_json::Value> = response.json().await.map_err(|e| {
                warn!("failed to parse package versions response: {e}");
                RegistryError::InvalidResponse(e.to_string())
            })?;
            items.extend(page);

            match next {
                Some(next_url) => {
                    url = next_url;
                    first_page = false;
                }
                None => break,
            }
        }

        Ok(items)
    }

    /// Keep only items carrying a recognized container tag.
    fn convert_items(
        &self,
        package_name: &str,
        raw: Vec<serde_json::Value>,
    ) -> Vec<RemoteVersionEntry> {
        let mut entries = Vec::new();
        for value in raw {
            let Ok(item) = serde_json::from_value::<PackageVersionItem>(value) else {
                continue;
            };
            let Some(created_at) = item.created_at else {
                continue;
            };
            let Some(tags) = item.metadata.and_then(|m| m.container).and_then(|c| c.tags)
            else {
                continue;
            };
            let Some(tag) = tags.first() else {
                continue;
            };
            let Some(prefix) = self.prefixes.match_prefix(tag) else {
                continue;
            };
            let version = match EncodedVersion::decode(&tag[prefix.len()..]) {
                Ok(version) => version,
                Err(e) => {
                    warn!("skipping tag {tag} for package {package_name}: {e}");
                    continue;
                }
            };

            debug!("found version {tag} for package {package_name}");
            entries.push(RemoteVersionEntry {
                name: item.name,
                version,
                created_at,
                matched_prefix: prefix.to_string(),
            });
        }
        entries
    }
}

#[async_trait]
impl VersionIndex for GitHubPackagesClient {
    async fn fetch_versions(
        &self,
        package_name: &str,
    ) -> Result<Vec<RemoteVersionEntry>, RegistryError> {
        debug!("fetching package {package_name}");
        // URL-encode the package name to handle slashes
        let encoded = urlencoding::encode(package_name);
        let url = format!(
            "{}/orgs/{}/packages/container/{}/versions",
            self.base_url, self.org, encoded
        );

        let raw = self.paginate(package_name, url).await?;
        if raw.is_empty() {
            warn!("no versions found for package {package_name}");
            return Ok(Vec::new());
        }

        Ok(self.convert_items(package_name, raw))
    }
}

/// Build an authenticated API client shared by the GitHub clients.
pub(crate) fn build_client(token: &str) -> reqwest::Client {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert(
        "X-GitHub-Api-Version",
        HeaderValue::from_static("2022-11-28"),
    );
    if !token.is_empty()
        && let Ok(mut value) = HeaderValue::from_str(&format!("token {token}"))
    {
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    reqwest::Client::builder()
        .user_agent("plugin-gitops-updater")
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// Extract the rel="next" target from a Link header, if any.
fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params.split(';').any(|p| p.trim() == "rel=\"next\"");
        if is_next {
            Some(
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string(),
            )
        } else {
            None
        }
    })
}
