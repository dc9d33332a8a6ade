use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use isofetch::config::{ArtifactConfig, Catalogue, FETCH_TIMEOUT_MS, catalogue_path, log_path};
use isofetch::fetch::{FetchSession, HttpTransport, Transport};
use isofetch::installer::{FileTemplate, install};
use isofetch::manager::MirrorManager;

#[derive(Parser)]
#[command(name = "isofetch")]
#[command(version, about = "Keep disk images up to date from verified mirrors")]
struct Cli {
    /// Catalogue file (defaults to $XDG_CONFIG_HOME/isofetch/catalogue.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report which artifacts have a newer version
    Check {
        /// Artifact names; all artifacts when omitted
        artifacts: Vec<String>,
    },
    /// Download and verify newer versions
    Update {
        /// Artifact names; all artifacts when omitted
        artifacts: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = isofetch::logging::init(&log_path(), cli.verbose).context("Failed to set up logging")?;

    let failed = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))?;

    if failed > 0 {
        anyhow::bail!("{} artifact(s) failed", failed);
    }
    Ok(())
}

/// Process every selected artifact and return how many failed
async fn run(cli: Cli) -> anyhow::Result<usize> {
    let path = cli.config.unwrap_or_else(catalogue_path);
    let catalogue =
        Catalogue::load(&path).with_context(|| format!("Failed to load catalogue {}", path.display()))?;
    let (names, update) = match cli.command {
        Command::Check { artifacts } => (artifacts, false),
        Command::Update { artifacts } => (artifacts, true),
    };

    let mut failed = 0;
    for name in &names {
        if !catalogue.artifacts.iter().any(|artifact| &artifact.name == name) {
            eprintln!("{}: not in catalogue", name);
            failed += 1;
        }
    }

    let cancellation = CancellationToken::new();
    tokio::spawn({
        let cancellation = cancellation.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                cancellation.cancel();
            }
        }
    });

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(Duration::from_millis(FETCH_TIMEOUT_MS))?);
    for artifact in catalogue.select(&names) {
        if cancellation.is_cancelled() {
            failed += 1;
            continue;
        }
        let session = FetchSession::with_cancellation(transport.clone(), cancellation.clone());
        match process(artifact, session, update).await {
            Ok(outcome) => {
                info!("{}: {}", artifact.name, outcome);
                println!("{}: {}", artifact.name, outcome);
            }
            Err(e) => {
                error!("{}: {:#}", artifact.name, e);
                eprintln!("{}: {:#}", artifact.name, e);
                failed += 1;
            }
        }
    }

    Ok(failed)
}

async fn process(artifact: &ArtifactConfig, session: FetchSession, update: bool) -> anyhow::Result<String> {
    let template = FileTemplate::new(&artifact.path)?;
    let mirrors = artifact.build_mirrors()?;
    let mut manager = MirrorManager::new(mirrors, session).await?;
    let latest = manager
        .version()
        .cloned()
        .context("No mirror reported a version")?;

    if !template.update_available(&latest)? {
        return Ok(format!("up to date ({})", latest));
    }
    if !update {
        return Ok(format!("update available ({})", latest));
    }

    let path = install(&template, &mut manager).await?;
    Ok(format!("installed {} at {}", latest, path.display()))
}
