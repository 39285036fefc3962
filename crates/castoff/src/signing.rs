//! Artifact signing via the external `gpg` tool.
//!
//! The armoured private key from the environment is imported into a scratch
//! keyring (a temporary GNUPGHOME) that disappears with the signer, so the
//! operator keyring is never touched. Signatures are armoured detached
//! `.asc` files next to each artifact, which is what Maven repositories
//! expect alongside uploads.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use crate::environment::SigningKey;
use crate::process::run_command;

const GPG_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Signer {
    homedir: TempDir,
    passphrase: Option<String>,
}

impl Signer {
    /// Import `key` into a fresh scratch keyring.
    pub fn import(key: &SigningKey) -> Result<Self> {
        let homedir = tempfile::tempdir().context("failed to create scratch GNUPGHOME")?;

        let key_file = homedir.path().join("import.asc");
        fs::write(&key_file, &key.key).context("failed to write key material")?;

        let args = vec![
            "--batch".to_string(),
            "--yes".to_string(),
            "--homedir".to_string(),
            homedir.path().display().to_string(),
            "--import".to_string(),
            key_file.display().to_string(),
        ];
        let out = run_command("gpg", &args, homedir.path(), &[], Some(GPG_TIMEOUT))?;
        // The key file is only needed during import.
        let _ = fs::remove_file(&key_file);

        if !out.success() {
            bail!("gpg --import failed: {}", out.stderr.trim());
        }

        Ok(Self {
            homedir,
            passphrase: key.passphrase.clone(),
        })
    }

    /// Produce a detached armoured signature for `artifact`.
    ///
    /// Returns the path of the `.asc` file written next to the artifact.
    pub fn sign_detached(&self, artifact: &Path) -> Result<PathBuf> {
        let signature = signature_path(artifact);

        let mut args = vec![
            "--batch".to_string(),
            "--yes".to_string(),
            "--homedir".to_string(),
            self.homedir.path().display().to_string(),
        ];
        if let Some(passphrase) = &self.passphrase {
            args.push("--pinentry-mode".to_string());
            args.push("loopback".to_string());
            args.push("--passphrase".to_string());
            args.push(passphrase.clone());
        }
        args.extend([
            "--armor".to_string(),
            "--detach-sign".to_string(),
            "--output".to_string(),
            signature.display().to_string(),
            artifact.display().to_string(),
        ]);

        let out = run_command("gpg", &args, self.homedir.path(), &[], Some(GPG_TIMEOUT))?;
        if !out.success() {
            bail!(
                "gpg --detach-sign failed for {}: {}",
                artifact.display(),
                out.stderr.trim()
            );
        }

        Ok(signature)
    }
}

/// `widget-1.0.0.jar` signs to `widget-1.0.0.jar.asc`.
pub fn signature_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".asc");
    PathBuf::from(name)
}
