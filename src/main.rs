//! scrivener - CLI entry point.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use git2::Repository;
use tracing::debug;

use scrivener::config::{self, ProjectPaths};
use scrivener::context::{
    ChangeContext, ModuleMap, assemble_context, collect_staged, read_diff, read_report,
    staged_diff_text,
};
use scrivener::error::{ClaudeError, ContextError, GenerationError, PipelineError};
use scrivener::generation::{AgentDefinition, ClaudeGenerator, check_claude_installed};
use scrivener::logging::{init_tracing, level_for};
use scrivener::pipeline::{Pipeline, check_message, read_message};

/// Generate a contract-validated commit message for the staged changes.
#[derive(Parser, Debug)]
#[command(name = "scrivener")]
#[command(about = "Generate a contract-validated commit message for the staged changes using Claude")]
#[command(version)]
struct Cli {
    /// Repository root
    #[arg(short = 'C', long = "repo", default_value = ".")]
    repo: PathBuf,

    /// Staged-files report (JSON array of {path, modules}); `-` reads stdin
    #[arg(long)]
    report: Option<String>,

    /// Unified diff to pair with --report (defaults to the staged diff)
    #[arg(long, requires = "report")]
    diff: Option<String>,

    /// Agent definition (default: .claude/agents/commit-message.md)
    #[arg(long)]
    agent: Option<PathBuf>,

    /// Commit-message contract (default: .scrivener/contract.json, else built-in)
    #[arg(long)]
    contract: Option<PathBuf>,

    /// Module ownership map (default: .scrivener/modules.toml)
    #[arg(long)]
    modules: Option<PathBuf>,

    /// Primary model (overrides the agent definition)
    #[arg(long)]
    model: Option<String>,

    /// Fallback model (overrides the agent definition)
    #[arg(long)]
    fallback_model: Option<String>,

    /// Print the assembled context block and exit without generating
    #[arg(long, conflicts_with = "check")]
    print_context: bool,

    /// Validate an existing message file instead of generating one; `-` reads stdin
    #[arg(long, value_name = "PATH")]
    check: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json, level_for(cli.verbose));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            eprintln!("Error: {:#}", err);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = ProjectPaths::resolve(&cli.repo, cli.agent, cli.contract, cli.modules);
    let stdout = io::stdout();

    // Check mode needs neither the repository nor the CLI.
    if let Some(source) = cli.check.as_deref() {
        let text = read_message(source).map_err(PipelineError::from)?;
        check_message(&text, &paths.contract, &mut stdout.lock())?;
        return Ok(());
    }

    let ctx = load_context(&cli.repo, cli.report.as_deref(), cli.diff.as_deref(), &paths.modules)?;
    let block = assemble_context(&ctx).map_err(PipelineError::from)?;

    if cli.print_context {
        let mut out = stdout.lock();
        writeln!(out, "{}", block).map_err(PipelineError::Output)?;
        return Ok(());
    }

    let agent = AgentDefinition::load(&paths.agent)
        .and_then(|a| a.with_overrides(cli.model, cli.fallback_model))
        .context("Failed to load agent definition")?;

    let generator = ClaudeGenerator::new();
    check_claude_installed(generator.program())
        .await
        .map_err(|e| not_installed(&agent, e))?;

    let auth_mode = config::get_auth_mode();
    debug!("Auth mode: {}", auth_mode);

    let pipeline = Pipeline::new(generator, agent, auth_mode, paths.contract);
    let outcome = pipeline.run(&ctx, &mut stdout.lock()).await?;
    debug!(
        "Emitted message from {} ({} errors, {} warnings)",
        outcome.model,
        outcome.report.error_count(),
        outcome.report.warning_count()
    );

    Ok(())
}

/// Build the change context from an external report or the repository index.
fn load_context(
    repo_root: &Path,
    report: Option<&str>,
    diff: Option<&str>,
    modules_path: &Path,
) -> Result<ChangeContext> {
    if let Some(report) = report {
        let staged_files = read_report(report).map_err(PipelineError::from)?;
        if staged_files.is_empty() {
            return Err(PipelineError::from(ContextError::NoStagedFiles).into());
        }
        let diff_text = match diff {
            Some(source) => read_diff(source).map_err(PipelineError::from)?,
            None => {
                let repo = open_repo(repo_root)?;
                staged_diff_text(&repo).map_err(PipelineError::from)?
            }
        };
        return Ok(ChangeContext::new(staged_files, diff_text));
    }

    let repo = open_repo(repo_root)?;
    let modules = ModuleMap::load(modules_path).context("Failed to load module map")?;
    let ctx = collect_staged(&repo, &modules).map_err(PipelineError::from)?;
    Ok(ctx)
}

fn open_repo(root: &Path) -> Result<Repository> {
    Repository::discover(root).with_context(|| {
        format!(
            "Not a git repository: {}. Run scrivener from within a git repository.",
            root.display()
        )
    })
}

fn not_installed(agent: &AgentDefinition, err: ClaudeError) -> PipelineError {
    PipelineError::GenerationFailed(GenerationError::ModelFailed {
        model: agent.primary_model.clone(),
        source: err,
    })
}
