use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use castoff::channel;
use castoff::config::CastoffConfig;
use castoff::engine::{self, Reporter, RunInputs, RunOptions, Severity};
use castoff::types::{PublishDecision, Receipt, TargetState};

#[derive(Parser, Debug)]
#[command(name = "castoff", version)]
#[command(about = "Channel-aware release publishing driven by CI environment signals")]
struct Cli {
    /// Path to the castoff config file.
    #[arg(long, default_value = castoff::config::CONFIG_FILE)]
    config: PathBuf,

    /// Directory for run evidence (events and receipts).
    #[arg(long, default_value = ".castoff")]
    state_dir: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print which release channels this environment selects.
    Decide {
        /// Emit the decision as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check that the selected channels can be published, without publishing.
    Preflight,
    /// Publish to the selected channels.
    Publish {
        /// Report the plan without uploading or running commands.
        #[arg(long)]
        dry_run: bool,
    },
    /// Close and release the open staging repositories.
    StagingRelease,
    /// Print environment and configuration diagnostics.
    Doctor,
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<()> {
    let Cli {
        config: config_path,
        state_dir,
        cmd,
    } = Cli::parse();

    // The environment is read exactly once, before anything else runs.
    let inputs = RunInputs::capture();
    let decision = channel::compute_decision(&inputs.snapshot);
    let mut reporter = CliReporter;

    match cmd {
        Commands::Decide { json } => run_decide(&inputs, &decision, json),
        Commands::Preflight => {
            let config = CastoffConfig::load(&config_path)?;
            let report = engine::run_preflight(&decision, &inputs, &config, &mut reporter)?;

            for issue in &report.issues {
                match issue.severity {
                    Severity::Warning => println!("warning: {}", issue.message),
                    Severity::Error => println!("error: {}", issue.message),
                }
            }

            if report.has_errors() {
                eprintln!("preflight found blocking problems");
                std::process::exit(2);
            }
            println!("preflight ok ({} channel(s) selected)", decision.len());
            Ok(())
        }
        Commands::Publish { dry_run } => {
            let config = CastoffConfig::load(&config_path)?;
            let opts = RunOptions {
                dry_run,
                state_dir: state_dir.clone(),
            };

            let receipt = engine::run_publish(&decision, &inputs, &config, &opts, &mut reporter)?;
            print_receipt(&receipt);

            if !receipt.succeeded() {
                bail!("one or more publish targets failed");
            }
            Ok(())
        }
        Commands::StagingRelease => {
            let config = CastoffConfig::load(&config_path)?;
            let ids = engine::run_staging_release(&inputs, &config, &state_dir, &mut reporter)?;
            println!("released {} staging repository(ies)", ids.len());
            Ok(())
        }
        Commands::Doctor => run_doctor(&config_path, &state_dir, &inputs, &mut reporter),
    }
}

fn run_decide(inputs: &RunInputs, decision: &PublishDecision, json: bool) -> Result<()> {
    let sign = channel::should_sign(&inputs.snapshot);

    if json {
        let targets: Vec<String> = decision.targets().map(|t| t.to_string()).collect();
        let doc = serde_json::json!({
            "event_name": inputs.snapshot.event_name(),
            "git_ref": inputs.snapshot.git_ref(),
            "sign": sign,
            "targets": targets,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("event: {}", inputs.snapshot.event_name().unwrap_or("(unset)"));
    println!("ref: {}", inputs.snapshot.git_ref().unwrap_or("(unset)"));
    println!("sign: {sign}");
    println!("targets:");
    if decision.is_empty() {
        println!("  (none)");
    } else {
        for target in decision.targets() {
            println!("  {target}");
        }
    }

    Ok(())
}

fn print_receipt(receipt: &Receipt) {
    for target in &receipt.targets {
        let summary = match &target.state {
            TargetState::Published => "published".to_string(),
            TargetState::Skipped { reason } => format!("skipped ({reason})"),
            TargetState::Failed { message, .. } => format!("failed: {message}"),
        };
        println!("{}: {summary}", target.target);
    }
}

fn run_doctor(
    config_path: &Path,
    state_dir: &Path,
    inputs: &RunInputs,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let config_state = if config_path.exists() { "found" } else { "missing" };
    println!("config: {} ({config_state})", config_path.display());
    println!("state_dir: {}", state_dir.display());
    println!();

    println!("event: {}", inputs.snapshot.event_name().unwrap_or("(unset)"));
    println!("ref: {}", inputs.snapshot.git_ref().unwrap_or("(unset)"));
    println!("credentials_detected: {}", inputs.credentials.is_some());
    println!("signing_key_detected: {}", inputs.snapshot.has_signing_key());
    println!();

    print_cmd_version("gpg", reporter);

    Ok(())
}

fn print_cmd_version(cmd: &str, reporter: &mut dyn Reporter) {
    let out = Command::new(cmd).arg("--version").output();
    match out {
        Ok(o) if o.status.success() => {
            let first_line = String::from_utf8_lossy(&o.stdout)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string();
            println!("{cmd}: {first_line}");
        }
        Ok(o) => {
            reporter.warn(&format!(
                "{cmd} --version failed: {}",
                String::from_utf8_lossy(&o.stderr).trim()
            ));
        }
        Err(e) => {
            reporter.warn(&format!("unable to run {cmd} --version: {e}"));
        }
    }
}
