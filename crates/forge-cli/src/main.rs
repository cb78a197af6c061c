//! Forge CLI
//!
//! Replays recorded model transcripts through a build session without a live
//! provider:
//! - `forge replay <transcript>` applies the transcript and prints log and tree
//! - `forge verify <transcript>` checks that fragment boundaries do not matter
//! - `forge prompt` prints the builder system prompt

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use forge_core::{BuildConfig, BuildOutcome, Outcome, SessionState, StreamSession, SYSTEM_PROMPT};
use forge_protocol::{split_fragments, CommandKind};
use forge_vfs::Snapshot;
use std::fmt::Write as _;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CHUNK_SIZE: usize = 16;

fn cli() -> Command {
    let transcript = Arg::new("transcript")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Recorded model output to replay");
    let config = Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("TOML build configuration");
    let chunk_size = Arg::new("chunk-size")
        .long("chunk-size")
        .default_value("16")
        .value_parser(value_parser!(u64).range(1..))
        .help("Fragment size in bytes");

    Command::new("forge")
        .version(forge_core::VERSION)
        .about("Streaming workspace builder: offline transcript tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("replay")
                .about("Apply a transcript and print the execution log and final tree")
                .arg(transcript.clone())
                .arg(chunk_size.clone())
                .arg(config.clone())
                .arg(
                    Arg::new("allow-overwrite")
                        .long("allow-overwrite")
                        .action(ArgAction::SetTrue)
                        .help("Let CREATE replace an existing file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the build report as JSON"),
                ),
        )
        .subcommand(
            Command::new("verify")
                .about("Check that whole, chunked and one-byte replays agree")
                .arg(transcript)
                .arg(chunk_size)
                .arg(config),
        )
        .subcommand(Command::new("prompt").about("Print the builder system prompt"))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("replay", args)) => {
            let mut config = load_config(args)?;
            if args.get_flag("allow-overwrite") {
                config = config.with_allow_overwrite(true);
            }
            let text = read_transcript(args)?;
            let chunk_size = chunk_size(args);

            let cancel = async {
                // Without a signal handler the replay simply runs to the end
                if tokio::signal::ctrl_c().await.is_err() {
                    futures::future::pending::<()>().await;
                }
            };
            let outcome = replay(&text, chunk_size, &config, cancel).await;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&outcome.report())?);
            } else {
                print!("{}", render(&outcome)?);
            }
            Ok(exit_code(outcome.is_success()))
        }
        Some(("verify", args)) => {
            let config = load_config(args)?;
            let text = read_transcript(args)?;
            match verify(&text, chunk_size(args), &config) {
                Ok(summary) => {
                    println!("ok: {summary}");
                    Ok(ExitCode::SUCCESS)
                }
                Err(mismatch) => {
                    println!("mismatch: {mismatch}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Some(("prompt", _)) => {
            println!("{SYSTEM_PROMPT}");
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load_config(args: &ArgMatches) -> anyhow::Result<BuildConfig> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => BuildConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BuildConfig::new().with_env_overrides(|var| std::env::var(var).ok())?,
    };
    Ok(config)
}

fn read_transcript(args: &ArgMatches) -> anyhow::Result<String> {
    let path = args
        .get_one::<PathBuf>("transcript")
        .context("transcript path is required")?;
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn chunk_size(args: &ArgMatches) -> usize {
    args.get_one::<u64>("chunk-size")
        .and_then(|size| usize::try_from(*size).ok())
        .unwrap_or(DEFAULT_CHUNK_SIZE)
}

async fn replay<C>(text: &str, chunk_size: usize, config: &BuildConfig, cancel: C) -> BuildOutcome
where
    C: Future<Output = ()>,
{
    let fragments = split_fragments(text, chunk_size);
    tracing::info!(bytes = text.len(), fragments = fragments.len(), "replaying transcript");
    let fragments = fragments.into_iter().map(|piece| Ok(piece.to_string()));
    StreamSession::new(config)
        .drive(futures::stream::iter(fragments), cancel)
        .await
}

fn state_label(state: &SessionState) -> String {
    match state {
        SessionState::Streaming => "streaming".to_string(),
        SessionState::Completed => "completed".to_string(),
        SessionState::EndOfStream => "end of stream (no [COMPLETE])".to_string(),
        SessionState::Failed(err) => format!("failed: {err}"),
    }
}

fn render(outcome: &BuildOutcome) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "Execution log")?;
    writeln!(out, "=============")?;
    for entry in &outcome.log {
        let marker = match entry.outcome {
            Outcome::Applied => "✓",
            Outcome::Skipped(_) => "-",
            Outcome::Rejected(_) => "✗",
        };
        writeln!(out, "{marker} {entry}")?;
    }

    let snapshot = outcome.snapshot();
    writeln!(out)?;
    writeln!(out, "Workspace ({} files, root {})", snapshot.len(), snapshot.root().short())?;
    for file in snapshot.files() {
        writeln!(
            out,
            "  {:<40} {:>6} B  {:>4} lines  #{}",
            file.path().to_string(),
            file.len(),
            file.line_count(),
            file.sequence()
        )?;
    }

    let packages = outcome.log.packages();
    if !packages.is_empty() {
        writeln!(out)?;
        writeln!(out, "Packages: {}", packages.join(", "))?;
    }

    let summary = outcome.log.summary();
    writeln!(out)?;
    writeln!(
        out,
        "Session {}: {} ({} applied, {} rejected, {} skipped, {} bytes discarded)",
        outcome.session,
        state_label(&outcome.state),
        summary.applied,
        summary.rejected,
        summary.skipped,
        outcome.discarded_bytes
    )?;
    Ok(out)
}

type Fingerprint = Vec<(CommandKind, Option<forge_protocol::Command>, Outcome)>;

fn fingerprint(outcome: &BuildOutcome) -> Fingerprint {
    outcome
        .log
        .iter()
        .map(|e| (e.kind, e.command.clone(), e.outcome.clone()))
        .collect()
}

/// Replay whole, in `chunk_size` pieces and byte by byte, and compare
///
/// Returns a one-line summary on agreement, otherwise what differed.
fn verify(text: &str, chunk_size: usize, config: &BuildConfig) -> Result<String, String> {
    let reference = StreamSession::replay(config, [text]);
    let reference_tree: Snapshot = reference.snapshot();
    let reference_log = fingerprint(&reference);

    for size in [chunk_size, 1] {
        let candidate = StreamSession::replay(config, split_fragments(text, size));
        if candidate.state != reference.state {
            return Err(format!(
                "{size}-byte fragments end {}, whole transcript ends {}",
                state_label(&candidate.state),
                state_label(&reference.state)
            ));
        }
        let log = fingerprint(&candidate);
        if log != reference_log {
            let at = log
                .iter()
                .zip(&reference_log)
                .position(|(a, b)| a != b)
                .unwrap_or(log.len().min(reference_log.len()));
            return Err(format!("{size}-byte fragments diverge at log entry #{at}"));
        }
        if !candidate.snapshot().same_tree(&reference_tree) {
            return Err(format!("{size}-byte fragments produce a different tree"));
        }
    }

    Ok(format!(
        "{} log entries, {} files, root {}",
        reference_log.len(),
        reference_tree.len(),
        reference_tree.root().short()
    ))
}
