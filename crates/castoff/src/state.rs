//! Receipt persistence.
//!
//! A receipt is the durable evidence of one publish run: what was decided,
//! what happened to each target, and when. It lives in the state directory
//! next to the event log.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::types::Receipt;

pub const RECEIPT_FILE: &str = "receipt.json";

pub fn receipt_path(state_dir: &Path) -> PathBuf {
    state_dir.join(RECEIPT_FILE)
}

/// Write `receipt` as pretty JSON, replacing any previous run's receipt.
pub fn write_receipt(state_dir: &Path, receipt: &Receipt) -> Result<PathBuf> {
    fs::create_dir_all(state_dir)
        .with_context(|| format!("failed to create state dir {}", state_dir.display()))?;

    let path = receipt_path(state_dir);
    let json = serde_json::to_string_pretty(receipt).context("failed to serialize receipt")?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write receipt {}", path.display()))?;

    Ok(path)
}

pub fn read_receipt(path: &Path) -> Result<Receipt> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read receipt {}", path.display()))?;
    serde_json::from_str(&json).context("failed to parse receipt")
}
