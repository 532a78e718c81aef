use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;
use cli_style::get_styles;

use crate_sync::config::{CliConfig, ModuleKind, Settings, START_ACTION};
use crate_sync::library_db::{queries, ConnectionError, ConnectionManager};
use crate_sync::preflight::Validator;
use crate_sync::reconcile::{
    process_folder_metadata, LoftyTagReader, ReconcileObserver, ReconcileOutcome, ReconcileRequest,
};
use crate_sync::report::{build_tracks_report, write_report, ReportRequest};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));

/// Exit status of a run stopped with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path = PathBuf::from(s);
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles(), version = VERSION, about)]
struct CliArgs {
    /// Path to the JSON settings file.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the library database, overrides the settings file.
    #[clap(long, global = true, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Writes a settings file with default values to the --config path.
    InitConfig {
        /// Overwrite an existing file.
        #[clap(long)]
        force: bool,
    },

    /// Runs the preflight checks of a module without starting it.
    Validate {
        /// Module name, e.g. metadata-sync or tracks-report.
        module: String,

        #[clap(long, default_value = START_ACTION)]
        action: String,
    },

    /// Copies album artist, original artist, release date and subtitle tags
    /// from audio files onto their library tracks.
    Sync {
        /// Music folder, overrides the settings file.
        #[clap(long, value_parser = parse_path)]
        folder: Option<PathBuf>,

        /// Only look at files directly inside the folder.
        #[clap(long)]
        no_recursive: bool,
    },

    /// Writes a JSON report of tracks selected by folder or playlist.
    #[command(group(ArgGroup::new("source").args(["folder", "playlist"])))]
    Report {
        #[clap(long, value_parser = parse_path)]
        folder: Option<PathBuf>,

        #[clap(long)]
        playlist: Option<String>,

        /// First stock date to include (YYYY-MM-DD).
        #[clap(long)]
        from: Option<String>,

        /// Last stock date to include (YYYY-MM-DD).
        #[clap(long)]
        to: Option<String>,

        #[clap(long, value_parser = parse_path)]
        output: Option<PathBuf>,
    },

    /// Takes a timestamped copy of the library database.
    Backup,

    /// Lists playlists in tree order.
    Playlists,

    /// Prints the tracks of a folder or playlist as JSON.
    #[command(group(ArgGroup::new("source").required(true).args(["folder", "playlist"])))]
    Tracks {
        #[clap(long, value_parser = parse_path)]
        folder: Option<PathBuf>,

        #[clap(long)]
        playlist: Option<String>,
    },

    /// Prints the cue points of a track as JSON.
    Cues { track_id: String },
}

/// Logs batch progress once per tenth of the files.
#[derive(Default)]
struct LoggingObserver {
    last_decile: AtomicUsize,
}

impl ReconcileObserver for LoggingObserver {
    fn on_files_found(&self, total: usize) {
        info!("Processing {} audio files", total);
    }

    fn on_progress(&self, fraction: f64, updated: usize, total: usize) {
        let decile = (fraction * 10.0).floor() as usize;
        if self.last_decile.fetch_max(decile, Ordering::Relaxed) < decile {
            info!("{:>3}% done, {} of {} files updated", decile * 10, updated, total);
        }
    }
}

fn database_path(settings: &Settings) -> Result<&Path> {
    settings
        .database_path
        .as_deref()
        .context("No library database configured, pass --db or set global.databasePath")
}

fn open_library(settings: &Settings) -> Result<ConnectionManager> {
    let db = ConnectionManager::new(database_path(settings)?);
    db.connect()
        .with_context(|| format!("Failed to open library database {:?}", db.path()))?;
    Ok(db)
}

fn init_config(settings: &Settings, config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = config_path.context("--config is required for init-config")?;
    if path.exists() && !force {
        bail!("{:?} already exists, pass --force to overwrite it", path);
    }
    settings.save(path)?;
    println!("Wrote settings to {:?}", path);
    Ok(())
}

fn validate(settings: &Settings, module: &str, action: &str) -> Result<()> {
    let kind = ModuleKind::from_name(module).with_context(|| {
        let names: Vec<&str> = ModuleKind::ALL.iter().map(|k| k.name()).collect();
        format!("Unknown module {:?}, expected one of {}", module, names.join(", "))
    })?;
    let report = Validator::new(settings.module(kind), settings.database_path.as_deref())
        .validate(action)?;
    match report.backup {
        Some(backup) => println!("{} is ready, backup written to {:?}", kind, backup),
        None => println!("{} is ready", kind),
    }
    Ok(())
}

async fn sync(mut settings: Settings, folder: Option<PathBuf>, no_recursive: bool) -> Result<ExitCode> {
    let module = settings.module_mut(ModuleKind::MetadataSync);
    if let Some(folder) = folder {
        module.set_value("folder", &folder.to_string_lossy());
    }
    if no_recursive {
        module.set_value("recursive", "false");
    }

    let module = settings.module(ModuleKind::MetadataSync);
    Validator::new(module, settings.database_path.as_deref()).validate(START_ACTION)?;

    let recursive = module.field("recursive").map_or(true, |f| f.is_checked());
    let request = ReconcileRequest::new(module.value("folder")).recursive(recursive);
    let db_path = database_path(&settings)?.to_path_buf();

    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();
    let mut worker = tokio::task::spawn_blocking(move || {
        let db = ConnectionManager::new(db_path);
        let outcome = process_folder_metadata(
            &db,
            &LoftyTagReader,
            &request,
            &LoggingObserver::default(),
            &worker_cancel,
        );
        db.finalize();
        outcome
    });

    let outcome = tokio::select! {
        joined = &mut worker => joined?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Stopping after the current file...");
            cancel.cancel();
            worker.await?
        }
    }?;

    match outcome {
        ReconcileOutcome::Completed(summary) => {
            println!("Done. {}", summary);
            Ok(ExitCode::SUCCESS)
        }
        ReconcileOutcome::Cancelled(summary) => {
            println!("Stopped. {}", summary);
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
    }
}

fn report(
    mut settings: Settings,
    folder: Option<PathBuf>,
    playlist: Option<String>,
    from: Option<String>,
    to: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let module = settings.module_mut(ModuleKind::TracksReport);
    if let Some(folder) = folder {
        module.set_value("source", "folder");
        module.set_value("folder", &folder.to_string_lossy());
    }
    if let Some(playlist) = playlist {
        module.set_value("source", "playlist");
        module.set_value("playlist", &playlist);
    }
    if let Some(from) = from {
        module.set_value("date_from", &from);
    }
    if let Some(to) = to {
        module.set_value("date_to", &to);
    }
    if let Some(output) = output {
        module.set_value("output_folder", &output.to_string_lossy());
    }

    let module = settings.module(ModuleKind::TracksReport);
    Validator::new(module, settings.database_path.as_deref()).validate(START_ACTION)?;
    let request = ReportRequest::from_module(module)?;

    let db = open_library(&settings)?;
    let report = build_tracks_report(&db, &request)?;
    db.finalize();

    let path = write_report(&report, &request.output_folder)?;
    println!("Wrote {} tracks to {:?}", report.track_count, path);
    Ok(())
}

fn backup(settings: &Settings) -> Result<()> {
    let destination = ConnectionManager::new(database_path(settings)?).backup_database()?;
    println!("{}", destination.display());
    Ok(())
}

fn list_playlists(settings: &Settings) -> Result<()> {
    let db = open_library(settings)?;
    let playlists =
        db.with_connection(|conn| queries::playlists(conn).map_err(ConnectionError::from))?;
    for playlist in playlists {
        let marker = if playlist.is_folder { "/" } else { "" };
        println!("{}\t{}{}", playlist.id, playlist.display_path, marker);
    }
    Ok(())
}

fn list_tracks(settings: &Settings, folder: Option<PathBuf>, playlist: Option<String>) -> Result<()> {
    let db = open_library(settings)?;
    let tracks = db.with_connection(|conn| {
        let tracks = match (&folder, &playlist) {
            (Some(folder), _) => queries::tracks_in_folder(conn, &folder.to_string_lossy()),
            (None, Some(playlist)) => queries::tracks_in_playlist(conn, playlist),
            (None, None) => Ok(Vec::new()),
        };
        tracks.map_err(ConnectionError::from)
    })?;
    println!("{}", serde_json::to_string_pretty(&tracks)?);
    Ok(())
}

fn list_cues(settings: &Settings, track_id: &str) -> Result<()> {
    let db = open_library(settings)?;
    let track = db.with_connection(|conn| {
        queries::track_by_id(conn, track_id).map_err(ConnectionError::from)
    })?;
    if track.is_none() {
        bail!("No track with id {}", track_id);
    }
    let cues = db.with_connection(|conn| {
        queries::cues_for_track(conn, track_id).map_err(ConnectionError::from)
    })?;
    println!("{}", serde_json::to_string_pretty(&cues)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!("crate-sync {}", VERSION);

    let cli_config = CliConfig {
        config_path: cli_args.config.clone(),
        database_path: cli_args.db.clone(),
    };
    let settings = Settings::load_or_default(&cli_config);

    match cli_args.command {
        Command::InitConfig { force } => init_config(&settings, cli_args.config.as_deref(), force)?,
        Command::Validate { module, action } => validate(&settings, &module, &action)?,
        Command::Sync {
            folder,
            no_recursive,
        } => return sync(settings, folder, no_recursive).await,
        Command::Report {
            folder,
            playlist,
            from,
            to,
            output,
        } => report(settings, folder, playlist, from, to, output)?,
        Command::Backup => backup(&settings)?,
        Command::Playlists => list_playlists(&settings)?,
        Command::Tracks { folder, playlist } => list_tracks(&settings, folder, playlist)?,
        Command::Cues { track_id } => list_cues(&settings, &track_id)?,
    }

    Ok(ExitCode::SUCCESS)
}
