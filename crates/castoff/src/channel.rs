//! Release-channel selection.
//!
//! Pure predicates over an [`EnvironmentSnapshot`] decide which publication
//! targets the current CI invocation should deliver to:
//!
//! - a tag ref releases to the staging repository and the plugin portal;
//! - a push to a long-lived branch publishes a snapshot;
//! - artifact signing is enabled whenever a signing key is present.
//!
//! The predicates are independent and non-exclusive. No I/O happens here;
//! executing the resulting [`PublishDecision`] is the engine's job.

use crate::environment::EnvironmentSnapshot;
use crate::types::{PublishDecision, PublishTarget};

/// Prefix every tag ref carries. Nothing else counts as a release tag.
pub const TAG_REF_PREFIX: &str = "refs/tags/";

/// Branches whose pushes publish snapshots. Matched by exact equality.
pub const SNAPSHOT_BRANCH_REFS: &[&str] = &["refs/heads/main", "refs/heads/dev-3.x"];

/// Event name that makes a branch push snapshot-eligible.
pub const PUSH_EVENT: &str = "push";

/// True iff the run was triggered for a tag ref.
pub fn is_release_tag(snapshot: &EnvironmentSnapshot) -> bool {
    snapshot
        .git_ref()
        .is_some_and(|r| r.starts_with(TAG_REF_PREFIX))
}

/// True iff this is a push to one of the snapshot branches.
pub fn is_snapshot_eligible(snapshot: &EnvironmentSnapshot) -> bool {
    snapshot.event_name() == Some(PUSH_EVENT)
        && snapshot
            .git_ref()
            .is_some_and(|r| SNAPSHOT_BRANCH_REFS.contains(&r))
}

/// True iff artifacts should be signed before upload.
pub fn should_sign(snapshot: &EnvironmentSnapshot) -> bool {
    snapshot.has_signing_key()
}

/// Map the snapshot to the set of targets to publish to.
///
/// A release tag selects the staging repository and the plugin portal; a
/// snapshot-eligible push selects the snapshot repository. The selections
/// are unioned, never mutually exclusive.
pub fn compute_decision(snapshot: &EnvironmentSnapshot) -> PublishDecision {
    let mut decision = PublishDecision::empty();

    if is_release_tag(snapshot) {
        decision.insert(PublishTarget::StagingRepository);
        decision.insert(PublishTarget::PluginPortal);
    }
    if is_snapshot_eligible(snapshot) {
        decision.insert(PublishTarget::SnapshotRepository);
    }

    decision
}
