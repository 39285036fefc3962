//! Staging-management API client.
//!
//! Staging repositories hold release artifacts until an explicit
//! close-and-release step makes them public. The API surface here is the
//! Nexus-style one the upstream publishers expose under `service/local/`:
//!
//! - `GET  staging/profile_repositories` — repositories per profile
//! - `POST staging/bulk/close`           — close open repositories
//! - `GET  staging/repository/{id}`      — single repository state
//! - `POST staging/bulk/promote`         — release closed repositories
//!
//! Closing is asynchronous server-side, so [`StagingClient::close_and_release`]
//! polls each repository until it reports `closed` before promoting.

use std::thread;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use crate::repository::Credentials;
use crate::{MavenError, user_agent};

/// State of one staging repository as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct StagingRepository {
    #[serde(rename = "repositoryId")]
    pub repository_id: String,
    /// `open`, `closed`, or `released`.
    #[serde(rename = "type")]
    pub state: String,
    #[serde(rename = "profileName", default)]
    pub profile_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepositoryList {
    data: Vec<StagingRepository>,
}

/// Client for the staging-management API.
#[derive(Debug, Clone)]
pub struct StagingClient {
    api_base: String,
    credentials: Credentials,
    http: Client,
}

impl StagingClient {
    pub fn new(api_base: &str, credentials: Credentials) -> Result<Self, MavenError> {
        let http = Client::builder().user_agent(user_agent()).build()?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
            http,
        })
    }

    /// List the open staging repositories belonging to `profile_group`.
    pub fn open_repositories(
        &self,
        profile_group: &str,
    ) -> Result<Vec<StagingRepository>, MavenError> {
        let url = format!("{}/staging/profile_repositories", self.api_base);
        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header("Accept", "application/json")
            .send()?;

        let list: RepositoryList = match resp.status() {
            s if s.is_success() => resp.json()?,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(MavenError::Auth {
                    status: resp.status().as_u16(),
                    url,
                });
            }
            s => {
                let body = resp.text().unwrap_or_default();
                return Err(MavenError::Unexpected {
                    status: s.as_u16(),
                    url,
                    body,
                });
            }
        };

        Ok(list
            .data
            .into_iter()
            .filter(|r| r.state == "open" && r.profile_name.as_deref() == Some(profile_group))
            .collect())
    }

    /// Fetch the current state of one staging repository.
    pub fn repository(&self, repository_id: &str) -> Result<StagingRepository, MavenError> {
        let url = format!("{}/staging/repository/{repository_id}", self.api_base);
        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header("Accept", "application/json")
            .send()?;

        match resp.status() {
            s if s.is_success() => Ok(resp.json()?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(MavenError::Auth {
                status: resp.status().as_u16(),
                url,
            }),
            s => {
                let body = resp.text().unwrap_or_default();
                Err(MavenError::Unexpected {
                    status: s.as_u16(),
                    url,
                    body,
                })
            }
        }
    }

    /// Ask the server to close the given open repositories.
    pub fn close(&self, repository_ids: &[String]) -> Result<(), MavenError> {
        self.bulk("close", repository_ids)
    }

    /// Release (promote) the given closed repositories.
    pub fn promote(&self, repository_ids: &[String]) -> Result<(), MavenError> {
        self.bulk("promote", repository_ids)
    }

    fn bulk(&self, action: &str, repository_ids: &[String]) -> Result<(), MavenError> {
        let url = format!("{}/staging/bulk/{action}", self.api_base);
        let payload = json!({
            "data": {
                "stagedRepositoryIds": repository_ids,
                "description": format!("castoff {action}"),
            }
        });

        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&payload)
            .send()?;

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
                    body,
                })
            }
        }
    }

    /// Poll until `repository_id` reports `expected`, or give up at `timeout`.
    pub fn wait_for_state(
        &self,
        repository_id: &str,
        expected: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<(), MavenError> {
        let deadline = Instant::now() + timeout;
        loop {
            let repo = self.repository(repository_id)?;
            if repo.state == expected {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(MavenError::StagingTimeout {
                    repository_id: repository_id.to_string(),
                    expected: expected.to_string(),
                    waited: timeout,
                });
            }
            thread::sleep(poll);
        }
    }

    /// Close and release every open staging repository for `profile_group`.
    ///
    /// Returns the ids that were released.
    pub fn close_and_release(
        &self,
        profile_group: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<Vec<String>, MavenError> {
        let open = self.open_repositories(profile_group)?;
        if open.is_empty() {
            return Err(MavenError::NoOpenRepositories {
                group: profile_group.to_string(),
            });
        }

        let ids: Vec<String> = open.into_iter().map(|r| r.repository_id).collect();
        self.close(&ids)?;
        for id in &ids {
            self.wait_for_state(id, "closed", timeout, poll)?;
        }
        self.promote(&ids)?;

        Ok(ids)
    }
}
