//! Motion Logger - Main Entry Point
//!
//! Runs one collection session against the simulated motion device and
//! writes the collected records to disk.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use motionlog::{
    backend::{GeneratorConfig, MockTransport, MAX_RATE_HZ},
    config::{self, AppConfig, PersistenceFormat, SessionSettings},
    session::{CancellationToken, RecordWriter, SessionController},
};
#[cfg(unix)]
use motionlog::session::signals::{SignalCancel, SIGINT, SIGTERM};
use std::io::BufRead;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    JsonLines,
}

impl From<FormatArg> for PersistenceFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => PersistenceFormat::Csv,
            FormatArg::JsonLines => PersistenceFormat::JsonLines,
        }
    }
}

/// Collect accelerometer samples from a motion device
#[derive(Debug, Parser)]
#[command(name = "motionlog", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Advertised device name to connect to
    #[arg(long)]
    device: Option<String>,

    /// Collection duration in seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Output file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Discard partial samples older than this many milliseconds
    #[arg(long)]
    strict_latch_ms: Option<u64>,

    /// Sample rate of the simulated device (1 to 1000 Hz)
    #[arg(
        long,
        default_value_t = 50,
        value_parser = clap::value_parser!(u32).range(1..=MAX_RATE_HZ as i64)
    )]
    sim_rate_hz: u32,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Save the effective config and exit
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    /// Apply command line overrides on top of the loaded config
    fn apply(&self, config: &mut AppConfig) {
        if let Some(device) = &self.device {
            config.device.name = device.clone();
        }
        if let Some(duration) = self.duration {
            config.collection.duration_secs = duration;
        }
        if let Some(output) = &self.output {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                config.output.directory = parent.to_path_buf();
            }
            config.output.file_name = output
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
        }
        if let Some(format) = self.format {
            config.output.format = format.into();
        }
        if let Some(ms) = self.strict_latch_ms {
            config.collection.completeness_deadline_ms = Some(ms);
        }
    }
}

fn init_logging(
    log_file: Option<&PathBuf>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            std::fs::create_dir_all(&directory)
                .with_context(|| format!("Failed to create {}", directory.display()))?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,motionlog=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Cancel the session when a line arrives on stdin
fn spawn_stdin_cancel(token: CancellationToken) {
    let spawned = std::thread::Builder::new()
        .name("stdin-cancel".to_string())
        .spawn(move || {
            let mut line = String::new();
            if let Ok(n) = std::io::stdin().lock().read_line(&mut line) {
                if n > 0 {
                    tracing::info!("Stop requested");
                    token.cancel();
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("Early stop from stdin unavailable: {}", e);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_file.as_ref())?;

    tracing::info!("Starting motion logger");

    let config_path = cli
        .config
        .clone()
        .or_else(config::default_config_path)
        .context("No config path given and no platform config directory found")?;

    let mut app_config = AppConfig::load_or_default(&config_path);
    cli.apply(&mut app_config);

    if cli.write_config {
        app_config
            .save(&config_path)
            .with_context(|| format!("Failed to save config to {}", config_path.display()))?;
        tracing::info!("Config written to {}", config_path.display());
        return Ok(());
    }

    let settings = SessionSettings::from_config(&app_config).context("Invalid configuration")?;
    let generator = GeneratorConfig {
        rate_hz: cli.sim_rate_hz,
        ..GeneratorConfig::default()
    };
    let transport = MockTransport::generated(settings.device_name.clone(), generator)
        .with_channel_map(settings.channels);

    let cancel = CancellationToken::new();
    #[cfg(unix)]
    let _signal_guard = match SignalCancel::install(&[SIGINT, SIGTERM], cancel.clone()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            tracing::warn!("Ctrl-C will not stop the session cleanly: {}", e);
            None
        }
    };
    spawn_stdin_cancel(cancel.clone());
    tracing::info!("Press Enter or Ctrl-C to stop early");

    let started_at = chrono::Local::now();
    let mut controller = SessionController::new(transport, settings);
    let outcome = controller.run(&cancel).context("Session failed")?;

    let output_path = app_config.output.resolve_path(started_at);
    let writer = RecordWriter::new(app_config.output.format);
    match writer.write(&outcome.series, &output_path) {
        Ok(rows) => {
            println!("Data saved to {} ({} records)", output_path.display(), rows);
        }
        Err(e) if e.is_empty_session() => {
            tracing::warn!("No data was collected!");
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to write {}", output_path.display()));
        }
    }

    if app_config.output.write_metadata {
        let path = writer
            .write_metadata(&outcome.metadata, &output_path)
            .context("Failed to write session metadata")?;
        tracing::info!("Session metadata saved to {}", path.display());
    }

    Ok(())
}
