// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command-line interface for the envbadge binary.
//!
//! The CLI renders badges locally, reports whether the published badge is
//! current, and runs the full publication pipeline.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process,
};

use clap::{ArgAction, Args, Parser, Subcommand};
use envbadge::{
    Error, GitCli, GitHubClient, PublishInputs, PublishOutcome, PublishRequest, Settings,
    VersionCheck, check_remote, publish, render_badge, write_badge,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Command line interface for rendering and publishing environment badges.
#[derive(Debug, Parser,)]
#[command(name = "envbadge", version, about = "Render and publish environment version badges")]
struct Cli
{
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Publish the badge through a merged pull request on the target repository.
    Publish(PublishArgs,),
    /// Render the badge locally without network access.
    Render(RenderArgs,),
    /// Report the published version and whether publishing would change it.
    Check(CheckArgs,),
}

/// Inputs shared by the commands that talk to the target repository.
///
/// Inputs that are neither passed as flags nor set through their `BADGE_*`
/// variable fall back to the action input variables `environment`,
/// `version`, `token`, `branch` and `repo`.
#[derive(Debug, Args,)]
struct TargetArgs
{
    /// Environment name shown in the left segment.
    #[arg(long = "environment", env = "BADGE_ENVIRONMENT", value_name = "NAME")]
    environment: Option<String,>,

    /// Version shown in the right segment.
    #[arg(long = "badge-version", env = "BADGE_VERSION", value_name = "VERSION")]
    version: Option<String,>,

    /// Token used for the GitHub API and for pushing.
    #[arg(long = "token", env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    token: Option<String,>,

    /// Base branch of the target repository.
    #[arg(long = "branch", env = "BADGE_BRANCH", value_name = "BRANCH")]
    branch: Option<String,>,

    /// Repository receiving the badge, as owner/name or a bare name owned by
    /// the source repository's owner.
    #[arg(long = "repository", env = "BADGE_REPOSITORY", value_name = "REPOSITORY")]
    repository: Option<String,>,

    /// Repository the badge describes, as owner/name.
    #[arg(long = "source", env = "GITHUB_REPOSITORY", value_name = "OWNER/NAME")]
    source: String,

    /// Optional YAML settings file.
    #[arg(long = "settings", env = "BADGE_SETTINGS", value_name = "PATH")]
    settings: Option<PathBuf,>,

    /// Base URL of the GitHub REST API.
    #[arg(long = "api-url", env = "GITHUB_API_URL", value_name = "URL")]
    api_url: Option<String,>,

    /// Output a JSON report instead of a summary line.
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args,)]
struct PublishArgs
{
    #[command(flatten)]
    target: TargetArgs,

    /// Parent of the temporary clone directory; defaults to the system
    /// temporary directory. Only the clone inside it is removed.
    #[arg(long = "workdir", env = "BADGE_WORKDIR", value_name = "DIR")]
    workdir: Option<PathBuf,>,
}

#[derive(Debug, Args,)]
struct CheckArgs
{
    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Debug, Args,)]
struct RenderArgs
{
    /// Environment name shown in the left segment.
    #[arg(long = "environment", value_name = "NAME")]
    environment: String,

    /// Version shown in the right segment.
    #[arg(long = "badge-version", value_name = "VERSION")]
    version: String,

    /// File receiving the SVG; standard output when omitted.
    #[arg(long = "output", value_name = "PATH")]
    output: Option<PathBuf,>,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    init_tracing();

    if let Err(error,) = run(Cli::parse(),).await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing()
{
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),),)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr,),)
        .init();
}

/// Executes the parsed command.
///
/// # Errors
///
/// Propagates configuration, rendering and pipeline errors. A publication
/// whose pull request could not be merged is reported as an error after the
/// outcome has been written.
async fn run(cli: Cli,) -> Result<(), Error,>
{
    match cli.command {
        Command::Publish(args,) => run_publish(args,).await,
        Command::Render(args,) => run_render(&args,),
        Command::Check(args,) => run_check(args,).await,
    }
}

fn build_request(args: &TargetArgs,) -> Result<PublishRequest, Error,>
{
    build_request_with(args, |name| std::env::var(name,).ok(),)
}

fn build_request_with<L,>(args: &TargetArgs, lookup: L,) -> Result<PublishRequest, Error,>
where
    L: Fn(&str,) -> Option<String,>,
{
    let input = |value: &Option<String,>, legacy: &str| {
        value.clone().or_else(|| lookup(legacy,),).unwrap_or_default()
    };

    let settings = load_settings(args.settings.as_deref(),)?;
    let inputs = PublishInputs {
        environment: input(&args.environment, "environment",),
        version:     input(&args.version, "version",),
        token:       input(&args.token, "token",),
        branch:      input(&args.branch, "branch",),
        target:      qualify_repository(&input(&args.repository, "repo",), &args.source,),
        source:      args.source.clone(),
    };
    PublishRequest::new(inputs, settings,)
}

fn qualify_repository(repository: &str, source: &str,) -> String
{
    let repository = repository.trim();
    match source.trim().split_once('/',) {
        Some((owner, _,),) if !repository.is_empty() && !repository.contains('/',) => {
            format!("{owner}/{repository}")
        }
        _ => repository.to_owned(),
    }
}

fn load_settings(path: Option<&Path,>,) -> Result<Settings, Error,>
{
    match path {
        Some(path,) => Settings::load(path,),
        None => Ok(Settings::default(),),
    }
}

fn build_client(args: &TargetArgs, request: &PublishRequest,) -> Result<GitHubClient, Error,>
{
    match args.api_url.as_deref().map(str::trim,).filter(|url| !url.is_empty(),) {
        Some(url,) => GitHubClient::with_base_uri(request.token(), request.target().clone(), url,),
        None => GitHubClient::new(request.token(), request.target().clone(),),
    }
}

fn clone_dir(workdir: Option<&Path,>, request: &PublishRequest,) -> PathBuf
{
    let parent = workdir.map_or_else(std::env::temp_dir, Path::to_path_buf,);
    parent.join(format!("envbadge-{}", request.pr_branch()),)
}

async fn run_publish(args: PublishArgs,) -> Result<(), Error,>
{
    let request = build_request(&args.target,)?;
    let client = build_client(&args.target, &request,)?;
    let workspace =
        GitCli::new(clone_dir(args.workdir.as_deref(), &request,),).redacting(request.token(),);

    info!(
        repository = %request.target(),
        environment = request.environment(),
        version = request.version(),
        "publishing badge"
    );
    let outcome = publish(&client, &workspace, &request,).await?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_outcome(&mut handle, &outcome, args.target.json,)?;

    match outcome {
        PublishOutcome::MergeFailed {
            pull_request,
            attempts,
        } => Err(Error::Unmerged {
            number: pull_request.number,
            attempts,
        },),
        _ => Ok((),),
    }
}

fn write_outcome<W: Write,>(writer: &mut W, outcome: &PublishOutcome, json: bool,)
-> Result<(), Error,>
{
    if json {
        serde_json::to_writer(&mut *writer, outcome,)?;
        return writeln!(writer).map_err(stdout_error,);
    }

    let summary = match outcome {
        PublishOutcome::Unchanged {
            version,
        } => format!("badge already at {version}, nothing to publish"),
        PublishOutcome::Merged {
            pull_request,
            attempts,
        } => format!("merged pull request #{} on attempt {attempts}", pull_request.number),
        PublishOutcome::MergeFailed {
            pull_request,
            attempts,
        } => format!(
            "pull request #{} left open after {attempts} merge attempts",
            pull_request.number
        ),
    };
    writeln!(writer, "{summary}").map_err(stdout_error,)
}

async fn run_check(args: CheckArgs,) -> Result<(), Error,>
{
    let request = build_request(&args.target,)?;
    let client = build_client(&args.target, &request,)?;
    let check = check_remote(&client, &request,).await?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_check(&mut handle, &check, request.version(), args.target.json,)
}

fn write_check<W: Write,>(
    writer: &mut W,
    check: &VersionCheck,
    version: &str,
    json: bool,
) -> Result<(), Error,>
{
    if json {
        serde_json::to_writer(&mut *writer, check,)?;
        return writeln!(writer).map_err(stdout_error,);
    }

    let published = check.previous().unwrap_or("none",);
    let verdict = if check.is_unchanged() { "up to date" } else { "update required" };
    writeln!(writer, "published: {published}, requested: {version}, {verdict}")
        .map_err(stdout_error,)
}

fn run_render(args: &RenderArgs,) -> Result<(), Error,>
{
    let badge = render_badge(&args.environment, &args.version,);

    match &args.output {
        Some(path,) => write_badge(path, &badge.svg,),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", badge.svg).map_err(stdout_error,)
        }
    }
}

fn stdout_error(source: io::Error,) -> Error
{
    Error::Output {
        source,
    }
}
