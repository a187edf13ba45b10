use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use merge_common::Reporter;
use merge_server::{DevServer, ServerConfig};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Directory containing the site
    pub directory: PathBuf,

    /// Port to listen on (defaults to any free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// JSON file providing the merge context
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Do not open the browser
    #[arg(long)]
    pub no_open: bool,
}

pub async fn watch(args: WatchArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let directory = cwd.join(&args.directory);
    let root_dir = directory
        .canonicalize()
        .with_context(|| format!("Cannot serve {}", directory.display()))?;

    let server = DevServer::new(ServerConfig {
        root_dir,
        port: args.port.or(config.port),
        state: args
            .state
            .as_ref()
            .map(|file| cwd.join(file))
            .or_else(|| config.state(cwd)),
        live_reload: true,
    });

    let listener = server.bind().await?;
    let url = format!("http://localhost:{}", listener.local_addr()?.port());

    let reporter = Reporter::terminal();
    reporter.heading(&format!(
        "Serving {} at {}",
        server.config().root_dir.display(),
        url
    ));
    reporter.info("Pages reload when files change. Press Ctrl+C to stop.");

    if !args.no_open {
        if let Err(e) = open::that(&url) {
            reporter.warn(&format!("Could not open a browser: {}", e));
        }
    }

    server.serve(listener).await?;
    Ok(())
}
