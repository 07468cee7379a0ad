// src/repository/mod.rs

//! Remote package sources
//!
//! Packages live in GitHub repositories. This module provides:
//! - The `GitSource` trait consumed by package handlers
//! - A blocking GitHub client with retry on transport failures
//! - `file://` endpoints, read straight from disk, for offline fixtures

use crate::error::{Error, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests (60 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum attempts for requests that fail before a response arrives
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

const TAGS_PER_PAGE: u32 = 100;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const BINARY_MEDIA_TYPE: &str = "application/octet-stream";

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_WEB_BASE_URL: &str = "https://github.com";

/// Environment variable holding the GitHub personal access token
pub const TOKEN_VAR: &str = "GITHUB_PAT";
pub const API_BASE_VAR: &str = "HAPM_GITHUB_API_BASE_URL";
pub const WEB_BASE_VAR: &str = "HAPM_GITHUB_WEB_BASE_URL";

/// Read access to versioned repositories
pub trait GitSource: Send + Sync {
    /// All tag names of a repository
    fn tags(&self, full_name: &str) -> Result<Vec<String>>;

    /// Raw content of a file at a given ref
    fn tree_file(&self, full_name: &str, git_ref: &str, path: &str) -> Result<Vec<u8>>;

    /// Content of a release asset attached to a tag
    fn release_file(&self, full_name: &str, tag: &str, filename: &str) -> Result<Vec<u8>>;

    /// Gzipped tarball of the repository at a given ref
    fn tarball(&self, full_name: &str, git_ref: &str) -> Result<Vec<u8>>;
}

/// Settings for the GitHub client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API base, e.g. `https://api.github.com`
    pub api_base_url: String,
    /// Web base used for tarball downloads
    pub web_base_url: String,
    /// Optional token for API authentication
    pub token: Option<String>,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let from_env = |name: &str, fallback: &str| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        Self {
            api_base_url: from_env(API_BASE_VAR, DEFAULT_API_BASE_URL),
            web_base_url: from_env(WEB_BASE_VAR, DEFAULT_WEB_BASE_URL),
            token: std::env::var(TOKEN_VAR).ok().filter(|token| !token.is_empty()),
            user_agent: format!("hapm/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TagItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    name: String,
    browser_download_url: String,
}

/// GitHub-backed `GitSource`
pub struct GitHubClient {
    client: Client,
    config: ClientConfig,
    max_retries: u32,
}

impl GitHubClient {
    /// Create a client configured from the environment
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: ClientConfig {
                api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
                web_base_url: config.web_base_url.trim_end_matches('/').to_string(),
                ..config
            },
            max_retries: MAX_RETRIES,
        })
    }

    /// Whether requests are authenticated
    pub fn has_token(&self) -> bool {
        self.config.token.is_some()
    }

    /// `base` with each segment appended and percent-escaped
    fn endpoint<'a>(base: &str, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = Url::parse(base)
            .map_err(|e| Error::DownloadError(format!("Invalid URL {}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::DownloadError(format!("URL {} cannot have a path", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `repos/<owner>/<repo>/<rest...>` below the API base
    fn api_endpoint<'a>(
        &self,
        full_name: &'a str,
        rest: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url> {
        let segments = std::iter::once("repos")
            .chain(full_name.split('/'))
            .chain(rest);
        Self::endpoint(&self.config.api_base_url, segments)
    }

    fn get(&self, url: &Url, accept: &str) -> Result<Vec<u8>> {
        if url.scheme() == "file" {
            return Self::read_local(url);
        }

        debug!("GET {}", url);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self.client.get(url.clone()).header(ACCEPT, accept);
            if let Some(token) = &self.config.token {
                request = request.bearer_auth(token);
            }

            match request.send() {
                Ok(response) => return Self::read_body(url, response),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to fetch {} after {} attempts: {}",
                            url, attempt, e
                        )));
                    }
                    warn!("Request attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }

    fn read_local(url: &Url) -> Result<Vec<u8>> {
        let path = url
            .to_file_path()
            .map_err(|_| Error::DownloadError(format!("Invalid file URL: {}", url)))?;
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFoundError(path.display().to_string())
            } else {
                Error::IoError(format!("Failed to read {}: {}", path.display(), e))
            }
        })
    }

    fn read_body(url: &Url, response: Response) -> Result<Vec<u8>> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFoundError(url.to_string()));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let body = body.trim();
            return Err(Error::DownloadError(if body.is_empty() {
                format!("HTTP {} from {}", status, url)
            } else {
                format!("HTTP {} from {}: {}", status, url, body)
            }));
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| Error::DownloadError(format!("Failed to read response from {}: {}", url, e)))
    }
}

impl GitSource for GitHubClient {
    fn tags(&self, full_name: &str) -> Result<Vec<String>> {
        let mut url = self.api_endpoint(full_name, ["tags"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &TAGS_PER_PAGE.to_string());

        let body = self.get(&url, JSON_MEDIA_TYPE)?;
        let tags: Vec<TagItem> = serde_json::from_slice(&body)?;
        info!("Found {} tag(s) for {}", tags.len(), full_name);
        Ok(tags.into_iter().map(|tag| tag.name).collect())
    }

    fn tree_file(&self, full_name: &str, git_ref: &str, path: &str) -> Result<Vec<u8>> {
        let rest = std::iter::once("contents").chain(path.split('/'));
        let mut url = self.api_endpoint(full_name, rest)?;
        url.query_pairs_mut().append_pair("ref", git_ref);
        self.get(&url, RAW_MEDIA_TYPE)
    }

    fn release_file(&self, full_name: &str, tag: &str, filename: &str) -> Result<Vec<u8>> {
        let url = self.api_endpoint(full_name, ["releases", "tags", tag])?;
        let body = self.get(&url, JSON_MEDIA_TYPE)?;
        let release: Release = serde_json::from_slice(&body)?;

        let asset = release
            .assets
            .into_iter()
            .find(|asset| asset.name == filename)
            .ok_or_else(|| {
                Error::NotFoundError(format!("asset {} in release {} of {}", filename, tag, full_name))
            })?;
        let download = Url::parse(&asset.browser_download_url).map_err(|e| {
            Error::DownloadError(format!("Invalid asset URL {}: {}", asset.browser_download_url, e))
        })?;
        self.get(&download, BINARY_MEDIA_TYPE)
    }

    fn tarball(&self, full_name: &str, git_ref: &str) -> Result<Vec<u8>> {
        let segments = full_name.split('/').chain(["tarball", git_ref]);
        let url = Self::endpoint(&self.config.web_base_url, segments)?;
        info!("Downloading {}@{}", full_name, git_ref);
        self.get(&url, BINARY_MEDIA_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn file_client(root: &Path) -> GitHubClient {
        let base = Url::from_directory_path(root).unwrap();
        let base = base.as_str().trim_end_matches('/');
        GitHubClient::with_config(ClientConfig {
            api_base_url: format!("{}/api", base),
            web_base_url: format!("{}/web/", base),
            token: None,
            user_agent: "hapm-test".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let dir = tempfile::tempdir().unwrap();
        let client = file_client(dir.path());
        assert!(!client.config.web_base_url.ends_with('/'));
        assert!(!client.has_token());
    }

    #[test]
    fn test_endpoint_escapes_refs() {
        let url = GitHubClient::endpoint(
            "https://api.github.com/",
            ["repos", "foo", "bar", "releases", "tags", "release/1.0#beta"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/foo/bar/releases/tags/release%2F1.0%23beta"
        );

        let tarball = GitHubClient::endpoint("https://github.com", ["foo", "bar", "tarball", "v1 rc"])
            .unwrap();
        assert_eq!(tarball.as_str(), "https://github.com/foo/bar/tarball/v1%20rc");
    }

    #[test]
    fn test_tags_from_file_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("api/repos/foo/bar");
        fs::create_dir_all(&repo).unwrap();
        fs::write(repo.join("tags"), r#"[{"name":"v1.0.0"},{"name":"v1.1.0"}]"#).unwrap();

        let client = file_client(dir.path());
        let tags = client.tags("foo/bar").unwrap();
        assert_eq!(tags, vec!["v1.0.0".to_string(), "v1.1.0".to_string()]);
    }

    #[test]
    fn test_missing_fixture_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let client = file_client(dir.path());
        let err = client.tags("foo/missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_tree_file_and_tarball_from_file_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let contents = dir.path().join("api/repos/foo/card/contents/dist");
        fs::create_dir_all(&contents).unwrap();
        fs::write(contents.join("card.js"), "console.log('card')").unwrap();

        let tarballs = dir.path().join("web/foo/card/tarball");
        fs::create_dir_all(&tarballs).unwrap();
        fs::write(tarballs.join("v2.0.0"), b"tarball").unwrap();

        let client = file_client(dir.path());
        let script = client.tree_file("foo/card", "v2.0.0", "dist/card.js").unwrap();
        assert_eq!(script, b"console.log('card')");
        assert_eq!(client.tarball("foo/card", "v2.0.0").unwrap(), b"tarball");
    }

    #[test]
    fn test_release_file_follows_asset_url() {
        let dir = tempfile::tempdir().unwrap();
        let asset_path = dir.path().join("downloads/card.js");
        fs::create_dir_all(asset_path.parent().unwrap()).unwrap();
        fs::write(&asset_path, "asset").unwrap();

        let releases = dir.path().join("api/repos/foo/card/releases/tags");
        fs::create_dir_all(&releases).unwrap();
        let asset_url = Url::from_file_path(&asset_path).unwrap().to_string();
        let release = serde_json::json!({
            "assets": [
                {"name": "other.js", "browser_download_url": "file:///nonexistent"},
                {"name": "card.js", "browser_download_url": asset_url}
            ]
        });
        fs::write(releases.join("v1.0.0"), release.to_string()).unwrap();

        let client = file_client(dir.path());
        assert_eq!(client.release_file("foo/card", "v1.0.0", "card.js").unwrap(), b"asset");

        let missing = client.release_file("foo/card", "v1.0.0", "none.js").unwrap_err();
        assert!(missing.is_not_found());
    }
}
