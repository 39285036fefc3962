use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A publication target a release run can deliver to.
///
/// The variant order is the execution order: snapshots first, then the
/// staging repository, then the plugin portal (the portal upload assumes the
/// staged release artifacts exist).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum PublishTarget {
    SnapshotRepository,
    StagingRepository,
    PluginPortal,
}

impl PublishTarget {
    /// Stable identifier used in receipts, events, and CLI output.
    pub fn id(&self) -> &'static str {
        match self {
            PublishTarget::SnapshotRepository => "snapshot-repository",
            PublishTarget::StagingRepository => "staging-repository",
            PublishTarget::PluginPortal => "plugin-portal",
        }
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The set of targets selected for one invocation.
///
/// Derived from an environment snapshot, never persisted as program state.
/// Targets are kept in a `BTreeSet` so iteration order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublishDecision {
    targets: BTreeSet<PublishTarget>,
}

impl PublishDecision {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_targets(targets: impl IntoIterator<Item = PublishTarget>) -> Self {
        Self {
            targets: targets.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, target: PublishTarget) {
        self.targets.insert(target);
    }

    pub fn contains(&self, target: PublishTarget) -> bool {
        self.targets.contains(&target)
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Targets in execution order.
    pub fn targets(&self) -> impl Iterator<Item = PublishTarget> + '_ {
        self.targets.iter().copied()
    }
}

/// Whether retrying a failed operation can plausibly succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Retryable,
    Permanent,
}

/// Outcome of one target within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TargetState {
    Published,
    Skipped { reason: String },
    Failed { class: ErrorClass, message: String },
}

/// Per-target evidence in a run receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetReceipt {
    pub target: PublishTarget,
    pub state: TargetState,
    /// Highest attempt number any upload for this target reached.
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u128,
}

/// Audit receipt for one publish run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_version: String,
    pub decision: PublishDecision,
    pub git_ref: Option<String>,
    pub event_name: Option<String>,
    pub signed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub targets: Vec<TargetReceipt>,
}

pub const RECEIPT_VERSION: &str = "1";

impl Receipt {
    /// True when no target failed.
    pub fn succeeded(&self) -> bool {
        !self
            .targets
            .iter()
            .any(|t| matches!(t.state, TargetState::Failed { .. }))
    }
}

/// One entry in the JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl ChannelEvent {
    pub fn now(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    RunStarted { decision: PublishDecision },
    TargetStarted { target: PublishTarget },
    ArtifactUploaded { target: PublishTarget, path: String },
    TargetCompleted { target: PublishTarget },
    TargetSkipped { target: PublishTarget, reason: String },
    TargetFailed { target: PublishTarget, message: String },
    StagingClosed { repository_ids: Vec<String> },
    StagingReleased { repository_ids: Vec<String> },
    RunCompleted { succeeded: bool },
}

/// Serialize a `Duration` as a humantime string (`2s`, `5m`).
pub fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

/// Deserialize a humantime string into a `Duration`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}
