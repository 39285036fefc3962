//! Uploading artifacts to a Maven-layout repository.

use std::fs;
use std::path::Path;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};

use crate::{MavenError, user_agent};

/// Basic-auth credentials for a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Client for one Maven-style repository (snapshots or staging-deploy).
#[derive(Debug, Clone)]
pub struct RepositoryClient {
    base_url: String,
    credentials: Option<Credentials>,
    http: Client,
}

impl RepositoryClient {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self, MavenError> {
        let http = Client::builder().user_agent(user_agent()).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// PUT a blob at `relative_path` under the repository root.
    pub fn put_bytes(&self, relative_path: &str, bytes: &[u8]) -> Result<(), MavenError> {
        let url = format!("{}/{}", self.base_url, relative_path.trim_start_matches('/'));

        let mut req = self.http.put(&url).body(bytes.to_vec());
        if let Some(creds) = &self.credentials {
            req = req.basic_auth(&creds.username, Some(&creds.password));
        }

        let resp = req.send()?;
        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(MavenError::Auth {
                status: resp.status().as_u16(),
                url,
            }),
            s => {
                let body = resp.text().unwrap_or_default();
                Err(MavenError::Unexpected {
                    status: s.as_u16(),
                    url,
                    body: truncate(&body, 512),
                })
            }
        }
    }

    /// PUT a blob and its `.sha256` checksum companion.
    ///
    /// The checksum file holds the lowercase hex digest, which is what
    /// repository managers validate on deploy.
    pub fn put_with_checksum(&self, relative_path: &str, bytes: &[u8]) -> Result<(), MavenError> {
        self.put_bytes(relative_path, bytes)?;
        let checksum = sha256_hex(bytes);
        self.put_bytes(&format!("{relative_path}.sha256"), checksum.as_bytes())
    }

    /// PUT a local file (and its checksum) at `relative_path`.
    pub fn put_file(&self, relative_path: &str, file: &Path) -> Result<(), MavenError> {
        let bytes = fs::read(file).map_err(|source| MavenError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        self.put_with_checksum(relative_path, &bytes)
    }
}

/// Standard Maven repository layout path for an artifact file.
///
/// `com.example` / `widget` / `1.2.3` / classifier `sources` / `jar` becomes
/// `com/example/widget/1.2.3/widget-1.2.3-sources.jar`.
pub fn layout_path(
    group: &str,
    artifact: &str,
    version: &str,
    classifier: Option<&str>,
    extension: &str,
) -> String {
    let group_path = group.replace('.', "/");
    let file_name = match classifier {
        Some(c) if !c.is_empty() => format!("{artifact}-{version}-{c}.{extension}"),
        _ => format!("{artifact}-{version}.{extension}"),
    };
    format!("{group_path}/{artifact}/{version}/{file_name}")
}

/// Lowercase hex SHA-256 of a blob.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
