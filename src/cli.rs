use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use crate::core::archive::{Compression, FetchFailurePolicy};
use crate::core::auth::Credentials;
use crate::core::catalog::TitleId;
use crate::core::downloader::GogClient;
use crate::core::error::VaultResult;
use crate::core::state::SyncSettings;
use crate::core::sync::SyncPipeline;

/// Archive the installers of every title owned on a GOG account.
///
/// Session cookies are read from AUTH_GOG_AL, AUTH_GOG_LC and AUTH_GOG_US.
#[derive(Clone, Debug, Parser)]
#[command(name = "gamevault-importer", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Directory the archives are written to.
    pub dest: PathBuf,

    /// Only process this title id.
    pub title: Option<String>,

    /// Settings file (JSON). Defaults to the per-user settings file when present.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Language label to download, e.g. "English".
    #[arg(long)]
    pub language: Option<String>,

    /// Platform key to download, e.g. "windows", "mac", "linux".
    #[arg(long)]
    pub platform: Option<String>,

    /// Keep going when a file fails and archive what could be downloaded.
    #[arg(long)]
    pub best_effort: bool,

    /// Store entries without compression.
    #[arg(long)]
    pub stored: bool,

    /// Do not save raw metadata snapshots.
    #[arg(long)]
    pub no_snapshots: bool,
}

impl Cli {
    /// Resolve settings: defaults < settings file < command line flags.
    pub fn settings(&self) -> VaultResult<SyncSettings> {
        let mut settings = match &self.config {
            Some(path) => SyncSettings::load(path)?,
            None => SyncSettings::load_default(),
        };

        if let Some(language) = &self.language {
            settings.language = language.clone();
        }
        if let Some(platform) = &self.platform {
            settings.platform = platform.clone();
        }
        if self.best_effort {
            settings.on_fetch_failure = FetchFailurePolicy::BestEffort;
        }
        if self.stored {
            settings.compression = Compression::Stored;
        }
        if self.no_snapshots {
            settings.write_snapshots = false;
        }
        Ok(settings)
    }
}

/// Run a full sync and map the result to the process exit code.
pub async fn run(cli: Cli) -> ExitCode {
    match sync(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("[{}] {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

async fn sync(cli: &Cli) -> VaultResult<bool> {
    let settings = cli.settings()?;
    let credentials = Credentials::from_env()?;
    let client = GogClient::new(&credentials, settings.timeouts())?;

    info!(
        "Syncing {}/{} installers into {:?}",
        settings.language, settings.platform, cli.dest
    );

    let filter = cli.title.as_deref().map(TitleId::new);
    let report = SyncPipeline::new(&client, &settings, &cli.dest)
        .run(filter.as_ref())
        .await?;

    Ok(report.is_success())
}
