// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rpmclosure::repository::{DirRepoCache, RepositoryConfig};
use rpmclosure::{Loader, LockFile, Repository, ResolveOptions, Resolver};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rpmclosure")]
#[command(author, version, about = "Resolve RPM dependency closures into lock files", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve packages and write a lock file
    Resolve {
        /// Repository descriptor file
        #[arg(long, default_value = "repo.yaml")]
        repofile: PathBuf,

        /// Directory holding cached primary metadata per repository
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Explicit primary file for a repository, as NAME=PATH
        #[arg(long = "repo-file", value_name = "NAME=PATH")]
        repo_files: Vec<String>,

        /// Target architecture
        #[arg(long, default_value = "x86_64")]
        arch: String,

        /// Consider every version instead of only the newest
        #[arg(long)]
        nobest: bool,

        /// Skip requested packages that do not exist
        #[arg(long)]
        ignore_missing: bool,

        /// Only packages matching one of these pull in their requirements
        #[arg(long = "allow-regex", value_name = "RE")]
        allow_regex: Vec<String>,

        /// Packages matching any of these never pull in their requirements
        #[arg(long = "ignore-regex", value_name = "RE")]
        ignore_regex: Vec<String>,

        /// Implicit roots resolved alongside the request
        #[arg(long = "basesystem", value_name = "NAME")]
        basesystem: Vec<String>,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Packages to resolve
        #[arg(required = true)]
        packages: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Resolve {
            repofile,
            cache_dir,
            repo_files,
            arch,
            nobest,
            ignore_missing,
            allow_regex,
            ignore_regex,
            basesystem,
            output,
            packages,
        } => {
            let config = if repofile.exists() {
                RepositoryConfig::from_file(&repofile)
                    .with_context(|| format!("Failed to load {}", repofile.display()))?
            } else if repo_files.is_empty() {
                anyhow::bail!("Repository file {} does not exist", repofile.display());
            } else {
                RepositoryConfig::default()
            };
            let repositories = config.enabled();

            let mut sources = Vec::new();
            for spec in &repo_files {
                let (name, path) = spec
                    .split_once('=')
                    .with_context(|| format!("Expected NAME=PATH, got '{}'", spec))?;
                let repo = repositories
                    .iter()
                    .find(|r| r.name == name)
                    .cloned()
                    .unwrap_or_else(|| Arc::new(Repository::new(name)));
                sources.push((repo, PathBuf::from(path)));
            }

            let loader = Loader::new(arch.clone());
            let universe = match cache_dir {
                Some(dir) => {
                    let cache = DirRepoCache::new(dir);
                    loader.load_with_cache(&sources, &cache, &repositories)?
                }
                None => loader.load(&sources)?,
            };

            let options = ResolveOptions {
                arch,
                nobest,
                ignore_missing,
                allow_regex,
                ignore_regex,
                implicit_roots: basesystem,
            };
            let outcome = Resolver::new(options)?
                .resolve(&universe, &packages)
                .context("Resolution failed")?;

            let lock = LockFile::project(
                &outcome.resolution.install,
                &outcome.resolution.force_ignored,
                &outcome.targets,
                std::env::args().skip(1).collect(),
            )?;

            match output {
                Some(path) => {
                    lock.write_to_file(&path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote lock file to {}", path.display());
                }
                None => print!("{}", lock.to_json()?),
            }
            Ok(())
        }
    }
}
