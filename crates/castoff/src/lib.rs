//! # castoff
//!
//! Channel-aware release publishing driven by CI environment signals.
//!
//! CI pipelines for library projects usually publish to more than one place:
//! a mutable snapshot repository for branch builds, a staging repository
//! (with a separate close/release step) for tagged releases, and a plugin
//! portal for build-tool plugins. Which of those a given CI run should feed
//! is a pure function of the environment the run was triggered in — the
//! ref, the event, and whether a signing key is available.
//!
//! castoff makes that function explicit and executes its result:
//!
//! 1. [`environment::EnvironmentSnapshot::capture`] reads the environment
//!    once, at process entry. Blank variables count as absent.
//! 2. [`channel::compute_decision`] maps the snapshot to a
//!    [`types::PublishDecision`] — a tag ref selects the staging repository
//!    and the plugin portal, a push to a long-lived branch selects the
//!    snapshot repository. No I/O happens here.
//! 3. [`engine::run_publish`] executes the decision: artifacts are signed
//!    when a key is present, uploaded with retry/backoff, and every step is
//!    recorded in a JSONL event log and a JSON receipt.
//! 4. [`engine::run_staging_release`] performs the explicit close-and-release
//!    step that makes staged artifacts public.
//!
//! ## Modules
//!
//! - [`channel`] — the release-channel selector (pure predicates)
//! - [`environment`] — one-shot environment capture
//! - [`engine`] — preflight, publish execution, staging release
//! - [`publication`] — property map to POM metadata
//! - [`config`] — `.castoff.toml` loading
//! - [`signing`] — detached signatures via the external `gpg` tool
//! - [`events`] / [`state`] — run evidence (JSONL events, JSON receipts)
//! - [`retry`] — backoff for transient upload failures
//! - [`process`] — external commands with captured output
//! - [`types`] — domain types: targets, decisions, receipts, events

pub mod channel;
pub mod config;
pub mod engine;
pub mod environment;
pub mod events;
pub mod process;
pub mod publication;
pub mod retry;
pub mod signing;
pub mod state;
pub mod types;
