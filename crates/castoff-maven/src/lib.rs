//! HTTP clients for the Maven side of a castoff publish.
//!
//! Two clients live here:
//!
//! - [`repository::RepositoryClient`] uploads artifacts (plus `.sha256`
//!   checksum companions) to a Maven-layout repository over HTTPS with
//!   optional basic auth. Snapshot and staging repositories share this
//!   client; only the base URL differs.
//! - [`staging::StagingClient`] drives the staging-management API: list the
//!   open staging repositories for a profile group, close them, poll until
//!   the close completes, then promote (release) them.
//!
//! Neither client decides *whether* to publish — that is the job of the
//! `castoff` core. Errors carry a retryability classification so the caller
//! can back off on transient failures and give up on permanent ones.

use std::path::PathBuf;
use std::time::Duration;

pub mod repository;
pub mod staging;

/// Error type shared by both clients.
#[derive(Debug, thiserror::Error)]
pub enum MavenError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server rejected our credentials.
    #[error("authentication rejected (HTTP {status}) for {url}")]
    Auth { status: u16, url: String },

    /// Any other unexpected HTTP status.
    #[error("unexpected HTTP {status} for {url}: {body}")]
    Unexpected {
        status: u16,
        url: String,
        body: String,
    },

    /// Local file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No open staging repository matched the profile group.
    #[error("no open staging repositories for profile group '{group}'")]
    NoOpenRepositories { group: String },

    /// A staging repository did not reach the expected state in time.
    #[error("staging repository '{repository_id}' did not become '{expected}' within {waited:?}")]
    StagingTimeout {
        repository_id: String,
        expected: String,
        waited: Duration,
    },
}

impl MavenError {
    /// Whether retrying the same request can plausibly succeed.
    ///
    /// Server-side errors and rate limiting are retryable; auth failures,
    /// local I/O problems, and staging-state errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            MavenError::Network(_) => true,
            MavenError::Unexpected { status, .. } => *status >= 500 || *status == 429,
            MavenError::Auth { .. }
            | MavenError::Io { .. }
            | MavenError::NoOpenRepositories { .. }
            | MavenError::StagingTimeout { .. } => false,
        }
    }
}

fn user_agent() -> String {
    format!("castoff/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable() {
        let err = MavenError::Unexpected {
            status: 503,
            url: "https://repo.example/x".to_string(),
            body: "unavailable".to_string(),
        };
        assert!(err.is_retryable());

        let err = MavenError::Unexpected {
            status: 429,
            url: "https://repo.example/x".to_string(),
            body: "slow down".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_and_client_errors_are_permanent() {
        let auth = MavenError::Auth {
            status: 401,
            url: "https://repo.example/x".to_string(),
        };
        assert!(!auth.is_retryable());

        let bad_request = MavenError::Unexpected {
            status: 400,
            url: "https://repo.example/x".to_string(),
            body: "bad".to_string(),
        };
        assert!(!bad_request.is_retryable());
    }

    #[test]
    fn staging_timeout_formats_expected_state() {
        let err = MavenError::StagingTimeout {
            repository_id: "comexample-1001".to_string(),
            expected: "closed".to_string(),
            waited: Duration::from_secs(600),
        };
        let msg = err.to_string();
        assert!(msg.contains("comexample-1001"));
        assert!(msg.contains("closed"));
        assert!(msg.contains("600s"));
    }
}
