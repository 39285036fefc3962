//! Running external tools with captured output and an optional timeout.
//!
//! The portal publisher and the signing tool are both external commands.
//! They run synchronously; when a timeout is set the child is polled and
//! killed once the deadline passes.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

pub fn run_command(
    program: &str,
    args: &[String],
    working_dir: &Path,
    envs: &[(String, String)],
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    let start = Instant::now();
    let mut command = Command::new(program);
    command.args(args).current_dir(working_dir);
    for (key, value) in envs {
        command.env(key, value);
    }

    let (exit_code, stdout, stderr, timed_out) = if let Some(timeout_dur) = timeout {
        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let deadline = Instant::now() + timeout_dur;
        loop {
            match child.try_wait().context("failed to poll command")? {
                Some(status) => {
                    let (out, err) = drain(&mut child);
                    break (status.code().unwrap_or(-1), out, err, false);
                }
                None => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();

                        let (out, mut err) = drain(&mut child);
                        err.push_str(&format!(
                            "\ncommand timed out after {}",
                            humantime::format_duration(timeout_dur)
                        ));
                        break (-1, out, err, true);
                    }

                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        }
    } else {
        let output = command
            .output()
            .with_context(|| format!("failed to execute {program}"))?;

        (
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            false,
        )
    };

    Ok(CommandOutput {
        exit_code,
        stdout,
        stderr,
        timed_out,
        duration: start.elapsed(),
    })
}

fn drain(child: &mut std::process::Child) -> (String, String) {
    let mut stdout_bytes = Vec::new();
    let mut stderr_bytes = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_end(&mut stdout_bytes);
    }
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_end(&mut stderr_bytes);
    }
    (
        String::from_utf8_lossy(&stdout_bytes).to_string(),
        String::from_utf8_lossy(&stderr_bytes).to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_exit_code_and_output() {
        let out = run_command(
            "sh",
            &["-c".to_string(), "echo hello; exit 3".to_string()],
            Path::new("."),
            &[],
            None,
        )
        .expect("run");

        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout.trim(), "hello");
        assert!(!out.success());
    }

    #[test]
    fn passes_extra_environment() {
        let out = run_command(
            "sh",
            &["-c".to_string(), "printf '%s' \"$CASTOFF_TEST_VAR\"".to_string()],
            Path::new("."),
            &[("CASTOFF_TEST_VAR".to_string(), "marker".to_string())],
            None,
        )
        .expect("run");

        assert!(out.success());
        assert_eq!(out.stdout, "marker");
    }

    #[test]
    fn kills_commands_that_exceed_the_timeout() {
        let out = run_command(
            "sh",
            &["-c".to_string(), "sleep 5".to_string()],
            Path::new("."),
            &[],
            Some(Duration::from_millis(100)),
        )
        .expect("run");

        assert!(out.timed_out);
        assert!(!out.success());
        assert!(out.stderr.contains("timed out"));
    }
}
