mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{build, watch, BuildArgs, WatchArgs};
use tracing_subscriber::EnvFilter;

/// Merge - declarative HTML includes, conditionals and repeats
#[derive(Parser, Debug)]
#[command(name = "merge")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the HTML files of a directory into a destination directory
    Build(BuildArgs),

    /// Serve a directory, merging pages on request and reloading on change
    Watch(WatchArgs),
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Cannot get current directory")?;

    match cli.command {
        Command::Build(args) => build(args, &cwd).await,
        Command::Watch(args) => watch(args, &cwd).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from(["merge", "build", "site", "out", "--compact"]).unwrap();
        match cli.command {
            Command::Build(args) => {
                assert_eq!(args.directory.to_str(), Some("site"));
                assert_eq!(args.destination.as_deref().and_then(|p| p.to_str()), Some("out"));
                assert!(args.compact);
                assert!(!args.watch);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from(["merge", "watch", "site", "--port", "4000", "--no-open"])
            .unwrap();
        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.port, Some(4000));
                assert!(args.no_open);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_no_arguments_shows_help() {
        let err = Cli::try_parse_from(["merge"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }
}
