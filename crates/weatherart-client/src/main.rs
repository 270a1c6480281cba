//! `weatherart` command-line entry point.
//!
//! Loads the configuration, applies command-line and environment overrides,
//! installs logging, and runs one subcommand against the display.
//!
//! # Usage
//!
//! ```text
//! weatherart [OPTIONS] <COMMAND>
//!
//! Commands:
//!   publish       Embed today's temperatures into an image, upload and show it
//!   push          Upload an existing PNG/JPEG as-is and show it
//!   remove-today  Delete every picture stored today
//!   list          List stored pictures
//!   embed         Embed temperatures into an image file (offline)
//!   decode        Read temperatures back from an image file (offline)
//!   init-config   Write the effective configuration to the config file
//! ```
//!
//! # Configuration precedence
//!
//! command-line flag  >  `WEATHERART_*` environment variable  >  config file
//! >  built-in default.
//!
//! | Variable                      | Config key           |
//! |-------------------------------|----------------------|
//! | `WEATHERART_CONFIG`           | (path of the file)   |
//! | `WEATHERART_TV_IP`            | `device.address`     |
//! | `WEATHERART_TV_MAC`           | `device.mac`         |
//! | `WEATHERART_CATEGORY`         | `device.category`    |
//! | `WEATHERART_WAKE`             | `wake.enabled`       |
//! | `WEATHERART_WOL_BROADCAST`    | `wake.broadcast`     |
//! | `WEATHERART_WOL_PORT`         | `wake.port`          |
//! | `WEATHERART_WOL_WAIT_S`       | `wake.wait_secs`     |
//! | `WEATHERART_TIMEOUT_S`        | `timeouts.connect` and `timeouts.request` |
//! | `WEATHERART_UPLOAD_TIMEOUT_S` | `timeouts.upload`    |
//! | `WEATHERART_LOG_LEVEL`        | `logging.level`      |
//! | `WEATHERART_LOG_FILE`         | `logging.file`       |
//!
//! `RUST_LOG`, when set, replaces the configured log level entirely.

use std::fs::OpenOptions;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use weatherart_client::application::device_session::DeviceSession;
use weatherart_client::application::publish_artwork::PublishArtworkUseCase;
use weatherart_client::application::push_image::PushImageUseCase;
use weatherart_client::application::remove_today::RemoveTodayUseCase;
use weatherart_client::infrastructure::collaborators::{FileImageSource, StaticForecast};
use weatherart_client::infrastructure::locator::NetworkLocator;
use weatherart_client::infrastructure::network::ArtChannelConnector;
use weatherart_client::infrastructure::storage::config::{
    config_file_path, load_config, load_config_from, save_config, AppConfig, LoggingConfig,
};
use weatherart_client::infrastructure::storage::state_files::{
    load_token, save_token, FileLastUploadStore,
};
use weatherart_core::codec::{embed_in_image_bytes, extract_from_image_bytes};
use weatherart_core::{DayPolicy, Forecast, MacAddress, TemperatureRange};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Weather-driven artwork for a Frame-style TV.
#[derive(Debug, Parser)]
#[command(
    name = "weatherart",
    about = "Uploads weather-tagged artwork to a Frame-style TV",
    version
)]
struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true, env = "WEATHERART_CONFIG")]
    config: Option<PathBuf>,

    /// IP address of the TV.  Skips the MAC lookup.
    #[arg(long, global = true, env = "WEATHERART_TV_IP")]
    ip: Option<IpAddr>,

    /// MAC address of the TV, used for address lookup and wake.
    #[arg(long, global = true, env = "WEATHERART_TV_MAC")]
    mac: Option<MacAddress>,

    /// Art category to upload to and clean up.  Empty means all categories
    /// for `list` and `remove-today`.
    #[arg(long, global = true, env = "WEATHERART_CATEGORY")]
    category: Option<String>,

    /// Send a Wake-on-LAN packet before connecting.
    #[arg(
        long,
        global = true,
        env = "WEATHERART_WAKE",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    wake: Option<bool>,

    /// Broadcast address for the wake packet.
    #[arg(long, global = true, env = "WEATHERART_WOL_BROADCAST")]
    wake_broadcast: Option<IpAddr>,

    /// UDP port for the wake packet.
    #[arg(long, global = true, env = "WEATHERART_WOL_PORT")]
    wake_port: Option<u16>,

    /// Seconds to wait after waking the TV.
    #[arg(long, global = true, env = "WEATHERART_WOL_WAIT_S")]
    wake_wait: Option<u64>,

    /// Connect and request timeout in seconds.
    #[arg(long, global = true, env = "WEATHERART_TIMEOUT_S")]
    timeout: Option<u64>,

    /// Upload timeout in seconds.
    #[arg(long, global = true, env = "WEATHERART_UPLOAD_TIMEOUT_S")]
    upload_timeout: Option<u64>,

    /// Log level (`error`, `warn`, `info`, `debug`, `trace`).
    #[arg(long, global = true, env = "WEATHERART_LOG_LEVEL")]
    log_level: Option<String>,

    /// Also append logs to this file.
    #[arg(long, global = true, env = "WEATHERART_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Embed a forecast's temperatures into an image, upload and show it.
    Publish {
        /// Source image (PNG or JPEG).
        #[arg(long)]
        image: PathBuf,
        /// Forecast minimum in °C.
        #[arg(long, allow_negative_numbers = true)]
        min: f64,
        /// Forecast maximum in °C.
        #[arg(long, allow_negative_numbers = true)]
        max: f64,
        /// Forecast summary, used in logs and the image prompt.
        #[arg(long, default_value = "")]
        description: String,
        /// Forecast date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Delete the picture uploaded by the previous run.
        #[arg(long)]
        replace_last: bool,
    },
    /// Upload an existing PNG or JPEG as-is and show it.
    Push {
        file: PathBuf,
        /// Delete the picture uploaded by the previous run.
        #[arg(long)]
        replace_last: bool,
    },
    /// Delete every picture whose date is today.
    RemoveToday {
        /// Where the day starts: `local`, `utc` or `fixed:<+/-minutes>`.
        #[arg(long)]
        day_policy: Option<DayPolicy>,
    },
    /// List stored pictures.
    List,
    /// Embed temperatures into an image file without contacting the TV.
    Embed {
        input: PathBuf,
        /// Output path; always written as PNG.
        output: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        min: f64,
        #[arg(long, allow_negative_numbers = true)]
        max: f64,
    },
    /// Read embedded temperatures from an image file.
    Decode { file: PathBuf },
    /// Write the effective configuration (file plus overrides) to the
    /// config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Loads the config file and applies flag and environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("cannot load config from {}", path.display()))?,
            None => load_config().context("cannot load config")?,
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(ip) = self.ip {
            config.device.address = Some(ip);
        }
        if let Some(mac) = self.mac {
            config.device.mac = Some(mac);
        }
        if let Some(category) = &self.category {
            config.device.category = category.clone();
        }
        if let Some(wake) = self.wake {
            config.wake.enabled = wake;
        }
        if let Some(broadcast) = self.wake_broadcast {
            config.wake.broadcast = broadcast;
        }
        if let Some(port) = self.wake_port {
            config.wake.port = port;
        }
        if let Some(wait) = self.wake_wait {
            config.wake.wait_secs = wait;
        }
        if let Some(timeout) = self.timeout {
            config.timeouts.connect = timeout;
            config.timeouts.request = timeout;
        }
        if let Some(timeout) = self.upload_timeout {
            config.timeouts.upload = timeout;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
    }
}

// ── Logging ───────────────────────────────────────────────────────────────────

/// Installs a stderr logger and, when configured, a plain-text file logger.
fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_tracing(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "weatherart starting");
    run(cli.command, &config, cli.config.as_deref()).await
}

async fn run(
    command: Command,
    config: &AppConfig,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Command::Publish {
            image,
            min,
            max,
            description,
            date,
            replace_last,
        } => {
            let forecast = Forecast {
                date: date.unwrap_or_else(|| Local::now().date_naive()),
                temperatures: TemperatureRange::new(min, max),
                description,
            };
            publish(config, forecast, image, replace_last).await
        }
        Command::Push { file, replace_last } => push(config, &file, replace_last).await,
        Command::RemoveToday { day_policy } => {
            remove_today(config, day_policy.unwrap_or(config.cleanup.day_policy)).await
        }
        Command::List => list(config).await,
        Command::Embed {
            input,
            output,
            min,
            max,
        } => embed(&input, &output, TemperatureRange::new(min, max)).await,
        Command::Decode { file } => decode(&file).await,
        Command::InitConfig { force } => {
            let path = match config_path {
                Some(path) => path.to_path_buf(),
                None => config_file_path().context("cannot place the config file")?,
            };
            init_config(config, &path, force)
        }
    }
}

// ── Device commands ───────────────────────────────────────────────────────────

/// Opens a session using the stored pairing token, if any.
fn open_session(config: &AppConfig) -> anyhow::Result<(DeviceSession, Option<String>)> {
    let token = config.token_path().ok().and_then(|path| load_token(&path));
    let connector = ArtChannelConnector::new(config.to_channel_config(token.clone()));
    let session = DeviceSession::open(
        config.to_endpoint(),
        Arc::new(NetworkLocator::system()),
        Arc::new(connector),
        config.to_session_config(),
    )
    .context("cannot locate the display")?;
    info!(addr = %session.addr(), "display located");
    Ok((session, token))
}

/// Stores a token issued during `session` if it differs from `previous`.
fn remember_token(config: &AppConfig, session: &DeviceSession, previous: Option<&str>) {
    let Some(token) = session.token() else {
        return;
    };
    if previous == Some(token) {
        return;
    }
    match config.token_path() {
        Ok(path) => save_token(&path, token),
        Err(e) => warn!("pairing token not saved: {e}"),
    }
}

fn last_upload_store(config: &AppConfig) -> anyhow::Result<FileLastUploadStore> {
    let path = config
        .last_id_path()
        .context("cannot place the last uploaded id file")?;
    Ok(FileLastUploadStore::new(path))
}

async fn publish(
    config: &AppConfig,
    forecast: Forecast,
    image: PathBuf,
    replace_last: bool,
) -> anyhow::Result<()> {
    let forecast = StaticForecast::new(forecast);
    let generator = FileImageSource::new(image);
    let store = last_upload_store(config)?;
    let (mut session, token) = open_session(config)?;

    let use_case = PublishArtworkUseCase::new(
        &forecast,
        &generator,
        &store,
        config.to_upload_settings(replace_last),
    );
    let result = use_case.run(&mut session).await;
    remember_token(config, &session, token.as_deref());

    let outcome = result.context("publishing failed")?;
    println!("{}", outcome.content_id);
    Ok(())
}

async fn push(config: &AppConfig, file: &Path, replace_last: bool) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("cannot read {}", file.display()))?;
    let store = last_upload_store(config)?;
    let (mut session, token) = open_session(config)?;

    let use_case = PushImageUseCase::new(&store, config.to_upload_settings(replace_last));
    let result = use_case.run(&mut session, &bytes).await;
    remember_token(config, &session, token.as_deref());

    let outcome = result.context("push failed")?;
    println!("{}", outcome.content_id);
    Ok(())
}

async fn remove_today(config: &AppConfig, policy: DayPolicy) -> anyhow::Result<()> {
    let (mut session, token) = open_session(config)?;
    let category = Some(config.device.category.clone());

    let result = RemoveTodayUseCase::new(category, policy)
        .run(&mut session, Utc::now())
        .await;
    remember_token(config, &session, token.as_deref());

    let report = result.context("cleanup failed")?;
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => println!("deleted {}", outcome.id),
            Err(e) => println!("failed  {}: {e}", outcome.id),
        }
    }
    if report.failed() > 0 {
        bail!("{} of {} deletions failed", report.failed(), report.outcomes.len());
    }
    Ok(())
}

async fn list(config: &AppConfig) -> anyhow::Result<()> {
    let (mut session, token) = open_session(config)?;
    let category = Some(config.device.category.as_str()).filter(|c| !c.is_empty());

    let result = session.list(category).await;
    session.close().await;
    remember_token(config, &session, token.as_deref());

    for item in result.context("listing failed")? {
        let created = item
            .created
            .map(|at| at.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{}\t{}\t{}", item.id, item.category, created);
    }
    Ok(())
}

// ── Offline commands ──────────────────────────────────────────────────────────

async fn embed(input: &Path, output: &Path, range: TemperatureRange) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("cannot read {}", input.display()))?;
    let encoded = embed_in_image_bytes(&bytes, range).context("cannot embed temperatures")?;
    if encoded.clamped.any() {
        warn!(
            requested_min = range.min,
            requested_max = range.max,
            stored_min = encoded.stored.min,
            stored_max = encoded.stored.max,
            "temperatures clamped to the supported range"
        );
    }
    tokio::fs::write(output, &encoded.png)
        .await
        .with_context(|| format!("cannot write {}", output.display()))?;
    println!(
        "embedded min={:.1} max={:.1} into {}",
        encoded.stored.min,
        encoded.stored.max,
        output.display()
    );
    Ok(())
}

async fn decode(file: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("cannot read {}", file.display()))?;
    match extract_from_image_bytes(&bytes).context("cannot decode image")? {
        Some(range) => println!("min={:.1} max={:.1}", range.min, range.max),
        None => println!("no embedded temperatures"),
    }
    Ok(())
}

/// Writes `config` to `path`, refusing to replace an existing file unless
/// `force` is set.
fn init_config(config: &AppConfig, path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    save_config(config, path)
        .with_context(|| format!("cannot write config to {}", path.display()))?;
    info!(path = %path.display(), "configuration written");
    println!("{}", path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
