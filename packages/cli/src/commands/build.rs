use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use merge_common::Reporter;
use merge_compiler::{BuildSummary, CompileOptions, Compiler};
use merge_server::FileWatcher;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Directory containing the site
    pub directory: PathBuf,

    /// Output directory (defaults to <directory>/build)
    pub destination: Option<PathBuf>,

    /// JSON file providing the merge context
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Write compact HTML instead of pretty printing
    #[arg(long)]
    pub compact: bool,

    /// Rebuild whenever a file changes
    #[arg(short, long)]
    pub watch: bool,
}

pub async fn build(args: BuildArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let directory = cwd.join(&args.directory);
    let options = compile_options(&args, &config, cwd);
    let reporter = Reporter::terminal();
    let compiler = Compiler::new();

    let summary = build_once(&compiler, &directory, &options, &reporter).await?;
    if !args.watch {
        return match summary.failed.len() {
            0 => Ok(()),
            n => Err(anyhow!("{} files failed to compile", n)),
        };
    }

    // Notify reports canonical paths; the destination must exist to compare
    let root = directory
        .canonicalize()
        .with_context(|| format!("Cannot watch {}", directory.display()))?;
    std::fs::create_dir_all(&summary.destination)?;
    let destination = summary.destination.canonicalize()?;
    let mut watcher = FileWatcher::new(&root)?.ignore(destination);

    reporter.info("");
    reporter.heading("Watching for changes...");
    while let Some(changed) = watcher.next_change().await {
        for path in &changed {
            reporter.info(&format!("Changed {}", path.strip_prefix(&root).unwrap_or(path).display()));
        }
        if let Err(e) = build_once(&compiler, &directory, &options, &reporter).await {
            reporter.error(&e.to_string());
        }
    }
    Ok(())
}

/// Command-line flags over config file values over defaults
fn compile_options(args: &BuildArgs, config: &Config, cwd: &Path) -> CompileOptions {
    CompileOptions {
        destination: args
            .destination
            .as_ref()
            .map(|dir| cwd.join(dir))
            .or_else(|| config.out_dir(cwd)),
        state: args
            .state
            .as_ref()
            .map(|file| cwd.join(file))
            .or_else(|| config.state(cwd)),
        pretty: config.pretty && !args.compact,
        indent: config.indent.clone(),
    }
}

async fn build_once(
    compiler: &Compiler,
    directory: &Path,
    options: &CompileOptions,
    reporter: &Reporter,
) -> Result<BuildSummary> {
    let summary = compiler
        .compile_directory(directory, options, reporter)
        .await?;

    reporter.info("");
    if summary.is_success() {
        reporter.success(&format!(
            "Compiled {} files into {}",
            summary.written.len(),
            summary.destination.display()
        ));
    } else {
        reporter.warn(&format!(
            "Compiled {} files, {} errors",
            summary.written.len(),
            summary.failed.len()
        ));
    }
    Ok(summary)
}
