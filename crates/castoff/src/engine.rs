//! Executing a publish decision.
//!
//! The decision itself is computed by [`crate::channel`] with no I/O; this
//! module is where the I/O lives. Targets run in decision order, each one
//! producing evidence (events plus a receipt entry). The first failed
//! target aborts the remainder — later targets are recorded as skipped so
//! the receipt always accounts for the whole decision.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;

use castoff_maven::repository::{Credentials, RepositoryClient, layout_path};
use castoff_maven::staging::StagingClient;

use crate::channel;
use crate::config::{ArtifactConfig, CastoffConfig, PortalConfig};
use crate::environment::{EnvironmentSnapshot, RepositoryCredentials, SigningKey};
use crate::events::{EventLog, events_path};
use crate::process::run_command;
use crate::publication::Publication;
use crate::retry::{RetryConfig, calculate_delay};
use crate::signing::Signer;
use crate::state;
use crate::types::{
    ErrorClass, EventKind, PublishDecision, PublishTarget, RECEIPT_VERSION, Receipt,
    TargetReceipt, TargetState,
};

pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Everything read from the process environment, captured once at entry.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub snapshot: EnvironmentSnapshot,
    pub credentials: Option<RepositoryCredentials>,
    pub signing_key: Option<SigningKey>,
}

impl RunInputs {
    pub fn capture() -> Self {
        Self {
            snapshot: EnvironmentSnapshot::capture(),
            credentials: RepositoryCredentials::from_env(),
            signing_key: SigningKey::from_env(),
        }
    }

    /// Inputs with no credentials or key material, for tests and dry runs.
    pub fn from_snapshot(snapshot: EnvironmentSnapshot) -> Self {
        Self {
            snapshot,
            credentials: None,
            signing_key: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dry_run: bool,
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct PreflightIssue {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct PreflightReport {
    pub issues: Vec<PreflightIssue>,
}

impl PreflightReport {
    fn warning(&mut self, message: impl Into<String>) {
        self.issues.push(PreflightIssue {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    fn error(&mut self, message: impl Into<String>) {
        self.issues.push(PreflightIssue {
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == Severity::Error)
    }
}

/// Check that the selected targets can actually be published.
///
/// Non-mutating; reports problems instead of failing on the first one.
pub fn run_preflight(
    decision: &PublishDecision,
    inputs: &RunInputs,
    config: &CastoffConfig,
    reporter: &mut dyn Reporter,
) -> Result<PreflightReport> {
    let mut report = PreflightReport::default();

    if decision.is_empty() {
        reporter.info("no release channels selected for this environment");
        return Ok(report);
    }

    let publication = match config.publication() {
        Ok(p) => Some(p),
        Err(err) => {
            report.error(format!("{err:#}"));
            None
        }
    };

    let wants_repository = decision.contains(PublishTarget::SnapshotRepository)
        || decision.contains(PublishTarget::StagingRepository);

    if wants_repository {
        if config.artifacts.is_empty() {
            report.error("no [[artifacts]] configured but a repository target is selected");
        }
        for artifact in &config.artifacts {
            if !artifact.path.exists() {
                report.error(format!("artifact file not found: {}", artifact.path.display()));
            }
        }
        if inputs.credentials.is_none() {
            report.error(
                "no repository credentials detected \
                 (set SONATYPE_NEXUS_USERNAME and SONATYPE_NEXUS_PASSWORD)",
            );
        }
    }

    if decision.contains(PublishTarget::SnapshotRepository) {
        if config.repositories.snapshots.is_none() {
            report.error("snapshot repository selected but [repositories.snapshots] is missing");
        }
        if let Some(p) = &publication
            && !p.is_snapshot_version()
        {
            report.warning(format!(
                "snapshot repository selected but version '{}' is not a -SNAPSHOT version",
                p.version
            ));
        }
    }

    if decision.contains(PublishTarget::StagingRepository) {
        if config.repositories.staging.is_none() {
            report.error("staging repository selected but [repositories.staging] is missing");
        }
        if let Some(p) = &publication
            && p.is_snapshot_version()
        {
            report.error(format!(
                "staging repository selected but version '{}' is a -SNAPSHOT version",
                p.version
            ));
        }
    }

    if decision.contains(PublishTarget::PluginPortal) {
        match &config.portal {
            None => report.error("plugin portal selected but [portal] is missing"),
            Some(portal) if portal.command.is_empty() => {
                report.error("portal command is empty");
            }
            Some(_) => {}
        }
        if let Some(p) = &publication
            && p.is_snapshot_version()
        {
            report.error(format!(
                "plugin portal selected but version '{}' is a -SNAPSHOT version",
                p.version
            ));
        }
    }

    if !channel::should_sign(&inputs.snapshot) {
        report.warning("no signing key detected; artifacts would be published unsigned");
    }

    Ok(report)
}

/// Execute `decision`, producing a receipt and an event log.
///
/// Target failures are recorded in the receipt rather than returned as
/// errors; check [`Receipt::succeeded`]. `Err` is reserved for problems
/// outside the targets themselves (bad publication properties, unwritable
/// state directory).
pub fn run_publish(
    decision: &PublishDecision,
    inputs: &RunInputs,
    config: &CastoffConfig,
    opts: &RunOptions,
    reporter: &mut dyn Reporter,
) -> Result<Receipt> {
    let started_at = Utc::now();
    let mut log = EventLog::new();
    log.record(EventKind::RunStarted {
        decision: decision.clone(),
    });

    let mut targets = Vec::new();
    let mut signed = false;

    if decision.is_empty() {
        reporter.info("no release channels selected for this environment; nothing to publish");
    } else {
        let publication = config.publication()?;

        let signer = if !channel::should_sign(&inputs.snapshot) {
            reporter.warn("no signing key detected; publishing unsigned");
            None
        } else if opts.dry_run {
            None
        } else {
            match &inputs.signing_key {
                Some(key) => {
                    reporter.info("importing signing key into a scratch keyring...");
                    Some(Signer::import(key)?)
                }
                None => {
                    reporter.warn("signing requested but key material is unavailable; publishing unsigned");
                    None
                }
            }
        };
        signed = signer.is_some();

        let scratch = tempfile::tempdir().context("failed to create scratch dir")?;
        let mut aborted = false;

        for target in decision.targets() {
            let target_started = Utc::now();
            let timer = Instant::now();

            if aborted {
                let reason = "earlier target failed".to_string();
                reporter.warn(&format!("{target}: skipped ({reason})"));
                log.record(EventKind::TargetSkipped {
                    target,
                    reason: reason.clone(),
                });
                targets.push(TargetReceipt {
                    target,
                    state: TargetState::Skipped { reason },
                    attempts: 0,
                    started_at: target_started,
                    finished_at: Utc::now(),
                    duration_ms: timer.elapsed().as_millis(),
                });
                continue;
            }

            log.record(EventKind::TargetStarted { target });
            let outcome = execute_target(
                target,
                inputs,
                config,
                &publication,
                signer.as_ref(),
                scratch.path(),
                opts.dry_run,
                &mut log,
                reporter,
            );

            let (state, attempts) = match outcome {
                Ok(TargetOutcome::Published { attempts }) => {
                    reporter.info(&format!("{target}: done"));
                    log.record(EventKind::TargetCompleted { target });
                    (TargetState::Published, attempts)
                }
                Ok(TargetOutcome::Skipped { reason }) => {
                    log.record(EventKind::TargetSkipped {
                        target,
                        reason: reason.clone(),
                    });
                    (TargetState::Skipped { reason }, 0)
                }
                Err(failure) => {
                    reporter.error(&format!("{target}: {}", failure.message));
                    log.record(EventKind::TargetFailed {
                        target,
                        message: failure.message.clone(),
                    });
                    aborted = true;
                    (
                        TargetState::Failed {
                            class: failure.class,
                            message: failure.message,
                        },
                        failure.attempts,
                    )
                }
            };

            targets.push(TargetReceipt {
                target,
                state,
                attempts,
                started_at: target_started,
                finished_at: Utc::now(),
                duration_ms: timer.elapsed().as_millis(),
            });
        }
    }

    let receipt = Receipt {
        receipt_version: RECEIPT_VERSION.to_string(),
        decision: decision.clone(),
        git_ref: inputs.snapshot.git_ref().map(str::to_string),
        event_name: inputs.snapshot.event_name().map(str::to_string),
        signed,
        started_at,
        finished_at: Utc::now(),
        targets,
    };

    log.record(EventKind::RunCompleted {
        succeeded: receipt.succeeded(),
    });
    log.write_to_file(&events_path(&opts.state_dir))?;
    let receipt_path = state::write_receipt(&opts.state_dir, &receipt)?;
    reporter.info(&format!("receipt written to {}", receipt_path.display()));

    Ok(receipt)
}

/// Close and release the open staging repositories for the configured group.
///
/// This is deliberately a separate step from publishing: staged artifacts
/// can be inspected before they become public.
pub fn run_staging_release(
    inputs: &RunInputs,
    config: &CastoffConfig,
    state_dir: &Path,
    reporter: &mut dyn Reporter,
) -> Result<Vec<String>> {
    let staging = config
        .repositories
        .staging
        .as_ref()
        .context("[repositories.staging] is not configured")?;
    let credentials = inputs
        .credentials
        .as_ref()
        .context("no repository credentials detected (set SONATYPE_NEXUS_USERNAME and SONATYPE_NEXUS_PASSWORD)")?;
    let group = config
        .profile_group()
        .context("no staging profile group (set the GROUP property or profile_group)")?;

    let client = StagingClient::new(&staging.api_base, to_maven_credentials(credentials))?;

    reporter.info(&format!(
        "closing and releasing staging repositories for '{group}'..."
    ));
    let ids = client.close_and_release(group, config.staging.timeout, config.staging.poll)?;
    reporter.info(&format!("released: {}", ids.join(", ")));

    let mut log = EventLog::new();
    log.record(EventKind::StagingClosed {
        repository_ids: ids.clone(),
    });
    log.record(EventKind::StagingReleased {
        repository_ids: ids.clone(),
    });
    log.write_to_file(&events_path(state_dir))?;

    Ok(ids)
}

enum TargetOutcome {
    Published { attempts: u32 },
    Skipped { reason: String },
}

struct TargetFailure {
    class: ErrorClass,
    message: String,
    attempts: u32,
}

#[allow(clippy::too_many_arguments)]
fn execute_target(
    target: PublishTarget,
    inputs: &RunInputs,
    config: &CastoffConfig,
    publication: &Publication,
    signer: Option<&Signer>,
    scratch: &Path,
    dry_run: bool,
    log: &mut EventLog,
    reporter: &mut dyn Reporter,
) -> Result<TargetOutcome, TargetFailure> {
    match target {
        PublishTarget::SnapshotRepository => {
            let url = match &config.repositories.snapshots {
                Some(repo) => repo.url.clone(),
                None => return Err(permanent("[repositories.snapshots] is not configured")),
            };
            reporter.info(&format!("deploying snapshot to {url}..."));
            publish_repository(
                target, &url, inputs, config, publication, signer, scratch, dry_run, log, reporter,
            )
        }
        PublishTarget::StagingRepository => {
            let url = match &config.repositories.staging {
                Some(repo) => repo.url.clone(),
                None => return Err(permanent("[repositories.staging] is not configured")),
            };
            reporter.info(&format!("deploying release to staging at {url}..."));
            publish_repository(
                target, &url, inputs, config, publication, signer, scratch, dry_run, log, reporter,
            )
        }
        PublishTarget::PluginPortal => {
            let portal = match &config.portal {
                Some(portal) => portal,
                None => return Err(permanent("[portal] is not configured")),
            };
            reporter.info("deploying release to the plugin portal...");
            run_portal(portal, dry_run, reporter)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn publish_repository(
    target: PublishTarget,
    url: &str,
    inputs: &RunInputs,
    config: &CastoffConfig,
    publication: &Publication,
    signer: Option<&Signer>,
    scratch: &Path,
    dry_run: bool,
    log: &mut EventLog,
    reporter: &mut dyn Reporter,
) -> Result<TargetOutcome, TargetFailure> {
    let uploads = build_uploads(publication, &config.artifacts, signer, scratch)
        .map_err(|err| permanent(format!("{err:#}")))?;

    if dry_run {
        for upload in &uploads {
            reporter.info(&format!("would upload {}/{}", url.trim_end_matches('/'), upload.relative_path));
        }
        return Ok(TargetOutcome::Skipped {
            reason: "dry-run".to_string(),
        });
    }

    let credentials = inputs.credentials.as_ref().map(to_maven_credentials);
    let client = RepositoryClient::new(url, credentials)
        .map_err(|err| permanent(format!("failed to build repository client: {err}")))?;

    let mut max_attempts_used = 0;
    for upload in &uploads {
        let attempts = upload_with_retry(&client, upload, &config.retry, reporter)?;
        max_attempts_used = max_attempts_used.max(attempts);
        log.record(EventKind::ArtifactUploaded {
            target,
            path: upload.relative_path.clone(),
        });
    }

    Ok(TargetOutcome::Published {
        attempts: max_attempts_used,
    })
}

fn run_portal(
    portal: &PortalConfig,
    dry_run: bool,
    reporter: &mut dyn Reporter,
) -> Result<TargetOutcome, TargetFailure> {
    let Some((program, args)) = portal.command.split_first() else {
        return Err(permanent("portal command is empty"));
    };

    if dry_run {
        reporter.info(&format!("would run: {}", portal.command.join(" ")));
        return Ok(TargetOutcome::Skipped {
            reason: "dry-run".to_string(),
        });
    }

    let out = run_command(program, args, Path::new("."), &[], Some(portal.timeout))
        .map_err(|err| permanent(format!("{err:#}")))?;
    if !out.success() {
        return Err(permanent(format!(
            "portal command failed (exit {}): {}",
            out.exit_code,
            out.stderr.trim()
        )));
    }

    Ok(TargetOutcome::Published { attempts: 1 })
}

struct Upload {
    relative_path: String,
    source: UploadSource,
}

enum UploadSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Plan the full upload set for one repository target.
///
/// Artifacts come straight from the config; the POM is rendered in memory.
/// When a signer is present each file also gets a detached `.asc` upload.
fn build_uploads(
    publication: &Publication,
    artifacts: &[ArtifactConfig],
    signer: Option<&Signer>,
    scratch: &Path,
) -> Result<Vec<Upload>> {
    let mut uploads = Vec::new();

    for artifact in artifacts {
        let relative_path = layout_path(
            &publication.group,
            &publication.artifact_id,
            &publication.version,
            artifact.classifier.as_deref(),
            &artifact.extension,
        );
        uploads.push(Upload {
            relative_path: relative_path.clone(),
            source: UploadSource::File(artifact.path.clone()),
        });

        if let Some(signer) = signer {
            let signature = signer.sign_detached(&artifact.path)?;
            uploads.push(Upload {
                relative_path: format!("{relative_path}.asc"),
                source: UploadSource::File(signature),
            });
        }
    }

    let pom = publication.render_pom();
    let pom_relative = layout_path(
        &publication.group,
        &publication.artifact_id,
        &publication.version,
        None,
        "pom",
    );
    uploads.push(Upload {
        relative_path: pom_relative.clone(),
        source: UploadSource::Bytes(pom.clone().into_bytes()),
    });

    if let Some(signer) = signer {
        let pom_file = scratch.join(publication.file_name(None, "pom"));
        std::fs::write(&pom_file, &pom)
            .with_context(|| format!("failed to write {}", pom_file.display()))?;
        let signature = signer.sign_detached(&pom_file)?;
        uploads.push(Upload {
            relative_path: format!("{pom_relative}.asc"),
            source: UploadSource::File(signature),
        });
    }

    Ok(uploads)
}

fn upload_with_retry(
    client: &RepositoryClient,
    upload: &Upload,
    retry: &RetryConfig,
    reporter: &mut dyn Reporter,
) -> Result<u32, TargetFailure> {
    let mut attempt = 1;
    loop {
        let result = match &upload.source {
            UploadSource::File(path) => client.put_file(&upload.relative_path, path),
            UploadSource::Bytes(bytes) => client.put_with_checksum(&upload.relative_path, bytes),
        };

        match result {
            Ok(()) => return Ok(attempt),
            Err(err) if err.is_retryable() && attempt < retry.max_attempts => {
                let delay = calculate_delay(retry, attempt + 1);
                reporter.warn(&format!(
                    "upload of {} failed (attempt {attempt}/{}): {err}; retrying in {}",
                    upload.relative_path,
                    retry.max_attempts,
                    humantime::format_duration(delay)
                ));
                thread::sleep(delay);
                attempt += 1;
            }
            Err(err) => {
                let class = if err.is_retryable() {
                    ErrorClass::Retryable
                } else {
                    ErrorClass::Permanent
                };
                return Err(TargetFailure {
                    class,
                    message: format!("upload of {} failed: {err}", upload.relative_path),
                    attempts: attempt,
                });
            }
        }
    }
}

fn to_maven_credentials(credentials: &RepositoryCredentials) -> Credentials {
    Credentials {
        username: credentials.username.clone(),
        password: credentials.password.clone(),
    }
}

fn permanent(message: impl Into<String>) -> TargetFailure {
    TargetFailure {
        class: ErrorClass::Permanent,
        message: message.into(),
        attempts: 0,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::tempdir;

    use crate::publication::{PROP_GROUP, PROP_POM_ARTIFACT_ID, PROP_VERSION_NAME};

    use super::*;

    #[derive(Default)]
    struct TestReporter {
        infos: Vec<String>,
        warns: Vec<String>,
        errors: Vec<String>,
    }

    impl Reporter for TestReporter {
        fn info(&mut self, msg: &str) {
            self.infos.push(msg.to_string());
        }
        fn warn(&mut self, msg: &str) {
            self.warns.push(msg.to_string());
        }
        fn error(&mut self, msg: &str) {
            self.errors.push(msg.to_string());
        }
    }

    fn properties(version: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (PROP_GROUP.to_string(), "com.example".to_string()),
            (PROP_POM_ARTIFACT_ID.to_string(), "widget".to_string()),
            (PROP_VERSION_NAME.to_string(), version.to_string()),
        ])
    }

    fn config_with(version: &str, toml_tail: &str) -> CastoffConfig {
        let base = format!(
            "[properties]\nGROUP = \"com.example\"\nPOM_ARTIFACT_ID = \"widget\"\nVERSION_NAME = \"{version}\"\n{toml_tail}"
        );
        toml::from_str(&base).expect("test config")
    }

    fn push_main_inputs() -> RunInputs {
        RunInputs::from_snapshot(EnvironmentSnapshot::from_parts(
            Some("push".to_string()),
            Some("refs/heads/main".to_string()),
            false,
        ))
    }

    fn tag_inputs() -> RunInputs {
        RunInputs::from_snapshot(EnvironmentSnapshot::from_parts(
            Some("push".to_string()),
            Some("refs/tags/v1.0.0".to_string()),
            false,
        ))
    }

    #[test]
    fn empty_decision_produces_an_empty_successful_receipt() {
        let dir = tempdir().expect("tempdir");
        let config = config_with("1.0.0", "");
        let opts = RunOptions {
            dry_run: false,
            state_dir: dir.path().to_path_buf(),
        };
        let mut reporter = TestReporter::default();

        let receipt = run_publish(
            &PublishDecision::empty(),
            &push_main_inputs(),
            &config,
            &opts,
            &mut reporter,
        )
        .expect("run");

        assert!(receipt.succeeded());
        assert!(receipt.targets.is_empty());
        assert!(state::receipt_path(dir.path()).exists());
        assert!(events_path(dir.path()).exists());
    }

    #[test]
    fn dry_run_skips_targets_but_records_the_plan() {
        let dir = tempdir().expect("tempdir");
        let config = config_with(
            "3.0.0-SNAPSHOT",
            "[[artifacts]]\npath = \"dist/widget.jar\"\n\n\
             [repositories.snapshots]\nurl = \"https://repo.example/snapshots/\"\n",
        );
        let opts = RunOptions {
            dry_run: true,
            state_dir: dir.path().to_path_buf(),
        };
        let mut reporter = TestReporter::default();

        let decision = PublishDecision::from_targets([PublishTarget::SnapshotRepository]);
        let receipt = run_publish(&decision, &push_main_inputs(), &config, &opts, &mut reporter)
            .expect("run");

        assert!(receipt.succeeded());
        assert_eq!(receipt.targets.len(), 1);
        assert_eq!(
            receipt.targets[0].state,
            TargetState::Skipped {
                reason: "dry-run".to_string()
            }
        );
        assert!(!receipt.signed);

        // The plan names both the artifact and the pom.
        let plan: Vec<&String> = reporter
            .infos
            .iter()
            .filter(|m| m.starts_with("would upload"))
            .collect();
        assert_eq!(plan.len(), 2);
        assert!(plan[0].contains("widget-3.0.0-SNAPSHOT.jar"));
        assert!(plan[1].contains("widget-3.0.0-SNAPSHOT.pom"));
    }

    #[test]
    fn missing_repository_config_fails_the_target_and_skips_the_rest() {
        let dir = tempdir().expect("tempdir");
        let config = config_with("1.0.0", "");
        let opts = RunOptions {
            dry_run: false,
            state_dir: dir.path().to_path_buf(),
        };
        let mut reporter = TestReporter::default();

        let decision = PublishDecision::from_targets([
            PublishTarget::StagingRepository,
            PublishTarget::PluginPortal,
        ]);
        let receipt =
            run_publish(&decision, &tag_inputs(), &config, &opts, &mut reporter).expect("run");

        assert!(!receipt.succeeded());
        assert_eq!(receipt.targets.len(), 2);
        assert!(matches!(
            receipt.targets[0].state,
            TargetState::Failed {
                class: ErrorClass::Permanent,
                ..
            }
        ));
        assert_eq!(
            receipt.targets[1].state,
            TargetState::Skipped {
                reason: "earlier target failed".to_string()
            }
        );
    }

    #[test]
    fn portal_target_runs_the_configured_command() {
        let dir = tempdir().expect("tempdir");
        let config = config_with(
            "1.0.0",
            "[portal]\ncommand = [\"sh\", \"-c\", \"exit 0\"]\n",
        );
        let opts = RunOptions {
            dry_run: false,
            state_dir: dir.path().to_path_buf(),
        };
        let mut reporter = TestReporter::default();

        let decision = PublishDecision::from_targets([PublishTarget::PluginPortal]);
        let receipt =
            run_publish(&decision, &tag_inputs(), &config, &opts, &mut reporter).expect("run");

        assert!(receipt.succeeded());
        assert_eq!(receipt.targets[0].state, TargetState::Published);
    }

    #[test]
    fn failing_portal_command_is_a_permanent_failure() {
        let dir = tempdir().expect("tempdir");
        let config = config_with(
            "1.0.0",
            "[portal]\ncommand = [\"sh\", \"-c\", \"echo boom >&2; exit 7\"]\n",
        );
        let opts = RunOptions {
            dry_run: false,
            state_dir: dir.path().to_path_buf(),
        };
        let mut reporter = TestReporter::default();

        let decision = PublishDecision::from_targets([PublishTarget::PluginPortal]);
        let receipt =
            run_publish(&decision, &tag_inputs(), &config, &opts, &mut reporter).expect("run");

        assert!(!receipt.succeeded());
        match &receipt.targets[0].state {
            TargetState::Failed { class, message } => {
                assert_eq!(*class, ErrorClass::Permanent);
                assert!(message.contains("exit 7"));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn unsigned_runs_warn_about_the_missing_key() {
        let dir = tempdir().expect("tempdir");
        let config = config_with(
            "1.0.0",
            "[portal]\ncommand = [\"sh\", \"-c\", \"exit 0\"]\n",
        );
        let opts = RunOptions {
            dry_run: false,
            state_dir: dir.path().to_path_buf(),
        };
        let mut reporter = TestReporter::default();

        let decision = PublishDecision::from_targets([PublishTarget::PluginPortal]);
        run_publish(&decision, &tag_inputs(), &config, &opts, &mut reporter).expect("run");

        assert!(
            reporter
                .warns
                .iter()
                .any(|w| w.contains("publishing unsigned"))
        );
    }

    #[test]
    fn preflight_flags_version_channel_mismatches() {
        let mut reporter = TestReporter::default();

        // Snapshot channel with a release version: warning only.
        let config = config_with(
            "1.0.0",
            "[[artifacts]]\npath = \"dist/widget.jar\"\n\n\
             [repositories.snapshots]\nurl = \"https://repo.example/snapshots/\"\n",
        );
        let decision = PublishDecision::from_targets([PublishTarget::SnapshotRepository]);
        let report =
            run_preflight(&decision, &push_main_inputs(), &config, &mut reporter).expect("preflight");
        assert!(
            report
                .issues
                .iter()
                .any(|i| i.severity == Severity::Warning && i.message.contains("not a -SNAPSHOT"))
        );

        // Staging channel with a snapshot version: hard error.
        let config = config_with(
            "3.0.0-SNAPSHOT",
            "[[artifacts]]\npath = \"dist/widget.jar\"\n\n\
             [repositories.staging]\nurl = \"https://repo.example/staging/\"\napi_base = \"https://repo.example/api/\"\n",
        );
        let decision = PublishDecision::from_targets([PublishTarget::StagingRepository]);
        let report =
            run_preflight(&decision, &tag_inputs(), &config, &mut reporter).expect("preflight");
        assert!(report.has_errors());
        assert!(
            report
                .issues
                .iter()
                .any(|i| i.severity == Severity::Error && i.message.contains("-SNAPSHOT"))
        );
    }

    #[test]
    fn preflight_requires_config_and_credentials_for_repositories() {
        let mut reporter = TestReporter::default();
        let config = config_with("3.0.0-SNAPSHOT", "");

        let decision = PublishDecision::from_targets([PublishTarget::SnapshotRepository]);
        let report =
            run_preflight(&decision, &push_main_inputs(), &config, &mut reporter).expect("preflight");

        assert!(report.has_errors());
        let messages: Vec<&str> = report.issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("[repositories.snapshots]")));
        assert!(messages.iter().any(|m| m.contains("no [[artifacts]]")));
        assert!(messages.iter().any(|m| m.contains("credentials")));
    }

    #[test]
    fn preflight_accepts_a_complete_setup() {
        let dir = tempdir().expect("tempdir");
        let artifact = dir.path().join("widget.jar");
        std::fs::write(&artifact, b"jar bytes").expect("write artifact");

        let config = config_with(
            "3.0.0-SNAPSHOT",
            &format!(
                "[[artifacts]]\npath = \"{}\"\n\n\
                 [repositories.snapshots]\nurl = \"https://repo.example/snapshots/\"\n",
                artifact.display()
            ),
        );

        let mut inputs = push_main_inputs();
        inputs.credentials = Some(RepositoryCredentials {
            username: "deploy".to_string(),
            password: "secret".to_string(),
        });
        inputs.snapshot = EnvironmentSnapshot::from_parts(
            Some("push".to_string()),
            Some("refs/heads/main".to_string()),
            true,
        );

        let mut reporter = TestReporter::default();
        let decision = PublishDecision::from_targets([PublishTarget::SnapshotRepository]);
        let report = run_preflight(&decision, &inputs, &config, &mut reporter).expect("preflight");

        assert!(!report.has_errors());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn build_uploads_plans_artifacts_then_pom() {
        let publication = Publication::from_properties(&properties("1.2.3")).expect("publication");
        let artifacts = vec![
            ArtifactConfig {
                path: PathBuf::from("dist/widget.jar"),
                classifier: None,
                extension: "jar".to_string(),
            },
            ArtifactConfig {
                path: PathBuf::from("dist/widget-sources.jar"),
                classifier: Some("sources".to_string()),
                extension: "jar".to_string(),
            },
        ];

        let scratch = tempdir().expect("tempdir");
        let uploads =
            build_uploads(&publication, &artifacts, None, scratch.path()).expect("uploads");

        let paths: Vec<&str> = uploads.iter().map(|u| u.relative_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "com/example/widget/1.2.3/widget-1.2.3.jar",
                "com/example/widget/1.2.3/widget-1.2.3-sources.jar",
                "com/example/widget/1.2.3/widget-1.2.3.pom",
            ]
        );
    }
}
