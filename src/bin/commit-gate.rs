// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use commit_gate::{
    install::{install, InstallOptions},
    path::locate_config,
    Gate, GateConfig, RepoHandle, Toolbox,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{env, fs, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  commit-gate [options] [<command>]",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file instead of the discovered one.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command.unwrap_or(Command::Run) {
            Command::Run => run_gate(self.config),
            Command::Install(opts) => run_install(opts),
            Command::Config => run_config(self.config),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Check staged files, the default when invoked as a hook.
    #[command(override_usage = "commit-gate run [options]")]
    Run,

    /// Install pre-commit hook into current repository.
    #[command(override_usage = "commit-gate install [options]")]
    Install(InstallArgs),

    /// Print effective configuration.
    #[command(override_usage = "commit-gate config [options]")]
    Config,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InstallArgs {
    /// Install into directory inside work tree, and point core.hooksPath at it.
    #[arg(long, value_name = "dir")]
    pub hooks_path: Option<PathBuf>,

    /// Replace existing pre-commit hook.
    #[arg(short, long)]
    pub force: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:#}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_config(repo: &RepoHandle, flag: Option<PathBuf>) -> Result<GateConfig> {
    let Some(path) = flag.or_else(|| locate_config(repo.workdir())) else {
        return Ok(GateConfig::default());
    };

    info!("load configuration from {:?}", path.display());
    let data = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {:?}", path.display()))?;
    let config = data
        .parse()
        .with_context(|| format!("invalid configuration in {:?}", path.display()))?;

    Ok(config)
}

fn run_gate(config: Option<PathBuf>) -> Result<()> {
    let repo = RepoHandle::from_env()?;
    let config = load_config(&repo, config)?;
    let tools = Toolbox::detect(&config.tools);
    let gate = Gate::new(&repo, &config, &tools)?;

    let report = gate.run()?;
    for path in &report.restaged {
        info!("re-staged {:?}", path.display());
    }

    Ok(())
}

fn run_install(opts: InstallArgs) -> Result<()> {
    let repo = RepoHandle::discover(env::current_dir()?)?;
    let options = InstallOptions {
        hooks_path: opts.hooks_path,
        force: opts.force,
    };

    let program = env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "commit-gate".into());
    install(&repo, &program, &options)?;

    Ok(())
}

fn run_config(config: Option<PathBuf>) -> Result<()> {
    let repo = RepoHandle::discover(env::current_dir()?)?;
    print!("{}", load_config(&repo, config)?);

    Ok(())
}
