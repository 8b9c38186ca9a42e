//! Codex Bridge - run the Codex CLI and stream what it does.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use codex_bridge::binary::{BinaryResolver, BinaryStatus, VersionProbe};
use codex_bridge::cli::{ChannelObserver, ExecOptions, Observer, SandboxMode};
use codex_bridge::client::CodexClient;
use codex_bridge::config::{BridgeConfig, ConfigLoader, DEFAULT_EXECUTABLE};
use codex_bridge::{display, mcp};
use codex_bridge::session::Session;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SandboxArg {
    ReadOnly,
    WorkspaceWrite,
    DangerFullAccess,
}

impl From<SandboxArg> for SandboxMode {
    fn from(arg: SandboxArg) -> Self {
        match arg {
            SandboxArg::ReadOnly => SandboxMode::ReadOnly,
            SandboxArg::WorkspaceWrite => SandboxMode::WorkspaceWrite,
            SandboxArg::DangerFullAccess => SandboxMode::DangerFullAccess,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "codex-bridge",
    about = "Run the Codex CLI and stream its output",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not truncate long values in output.
    #[arg(long, global = true)]
    raw: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a prompt through `codex exec`.
    Run {
        /// The prompt. With --session, the first turn.
        prompt: Option<String>,
        /// Request JSON events.
        #[arg(long)]
        json: bool,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(short, long, value_enum)]
        sandbox: Option<SandboxArg>,
        /// Kill the run after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Resume the most recent session.
        #[arg(long)]
        resume_last: bool,
        /// Resume a specific session.
        #[arg(long, conflicts_with = "resume_last")]
        resume: Option<String>,
        /// Deliver the prompt on stdin.
        #[arg(long)]
        stdin: bool,
        /// Working directory for the agent.
        #[arg(long)]
        cd: Option<PathBuf>,
        #[arg(long)]
        skip_git_repo_check: bool,
        /// MCP servers config file passed to codex.
        #[arg(long)]
        mcp_config: Option<PathBuf>,
        /// Inline MCP servers JSON, written to a temporary config file.
        #[arg(long, conflicts_with = "mcp_config")]
        mcp_json: Option<String>,
        /// Keep reading prompts from stdin, resuming after the first turn.
        #[arg(long)]
        session: bool,
    },
    /// Show which codex binary would be used.
    Probe,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Option<BridgeConfig> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    match loader.load() {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("{e}");
            None
        }
    }
}

/// Observer that hands observations to a printing task.
fn printing_observer(raw_mode: bool) -> (Arc<dyn Observer>, JoinHandle<()>) {
    let (observer, mut rx) = ChannelObserver::channel();
    let printer = tokio::spawn(async move {
        while let Some(observation) = rx.recv().await {
            display::print_observation(&observation, raw_mode);
        }
    });
    (Arc::new(observer), printer)
}

async fn run_once(
    client: &CodexClient,
    prompt: &str,
    options: &ExecOptions,
    raw: bool,
) -> ExitCode {
    let (observer, printer) = printing_observer(raw);
    let outcome = client.execute_with_fallback(prompt, options, observer).await;
    // All senders are gone once the call returns.
    let _ = printer.await;
    match outcome {
        Ok(result) => {
            display::print_final(&result);
            ExitCode::SUCCESS
        }
        Err(e) => {
            display::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run_session(
    client: CodexClient,
    first: Option<String>,
    options: ExecOptions,
    raw: bool,
) -> ExitCode {
    let mut session = Session::with_defaults(client, options);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = first;

    loop {
        let prompt = match pending.take() {
            Some(prompt) => prompt,
            None => match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read prompt");
                    return ExitCode::FAILURE;
                }
            },
        };
        let prompt = prompt.trim();
        if prompt.is_empty() {
            continue;
        }

        let (observer, printer) = printing_observer(raw);
        let outcome = session.send(prompt, observer).await;
        let _ = printer.await;
        match outcome {
            Ok(result) => display::print_final(&result),
            Err(e) => display::print_error(&e),
        }
    }

    tracing::info!(turns = session.turns(), "Session ended");
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(config) = load_config(cli.config) else {
        return ExitCode::FAILURE;
    };

    match cli.command {
        Commands::Probe => {
            let status = BinaryStatus::from_resolution(
                VersionProbe::default_candidates().resolve().await,
            );
            display::print_probe(&status.executable(), status.version());
            ExitCode::SUCCESS
        }
        Commands::Run {
            prompt,
            json,
            model,
            sandbox,
            timeout_secs,
            resume_last,
            resume,
            stdin,
            cd,
            skip_git_repo_check,
            mcp_config,
            mcp_json,
            session,
        } => {
            let mut options = config.defaults.to_options();
            options.json |= json;
            options.skip_git_repo_check |= skip_git_repo_check;
            options.prompt_via_stdin |= stdin && !session;
            if let Some(model) = model {
                options = options.model(model);
            }
            if let Some(sandbox) = sandbox {
                options = options.sandbox(sandbox.into());
            }
            if let Some(secs) = timeout_secs {
                options = options.timeout(Duration::from_secs(secs));
            }
            if let Some(dir) = cd {
                options = options.cd(dir);
            }
            if let Some(path) = mcp_config {
                options = options.mcp_config_path(path);
            }
            // Held until the run ends so codex can still read the file.
            let mcp_file = match mcp_json.as_deref().map(mcp::write_raw_json).transpose() {
                Ok(file) => file,
                Err(e) => {
                    display::print_error(&e);
                    return ExitCode::FAILURE;
                }
            };
            if let Some(file) = &mcp_file {
                options = options.mcp_config_path(file.to_path_buf());
            }
            if let Some(id) = resume {
                options = options.resume_session(id);
            } else if resume_last {
                options = options.resume_last();
            }

            let mut process = config.process;
            if process.executable == DEFAULT_EXECUTABLE {
                let status = BinaryStatus::from_resolution(
                    VersionProbe::default_candidates().resolve().await,
                );
                process = process.with_binary(&status);
            }
            tracing::info!(
                executable = %process.executable,
                json = options.json,
                session,
                "Starting codex bridge"
            );
            let client = CodexClient::new(process);

            if session {
                return run_session(client, prompt, options, cli.raw).await;
            }
            let prompt = match (prompt, options.prompt_via_stdin) {
                (Some(prompt), _) => prompt,
                (None, true) => match read_stdin().await {
                    Ok(prompt) => prompt,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read prompt from stdin");
                        return ExitCode::FAILURE;
                    }
                },
                (None, false) => String::new(),
            };
            run_once(&client, &prompt, &options, cli.raw).await
        }
    }
}

async fn read_stdin() -> std::io::Result<String> {
    use tokio::io::AsyncReadExt;

    let mut prompt = String::new();
    tokio::io::stdin().read_to_string(&mut prompt).await?;
    Ok(prompt)
}
