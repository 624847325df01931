use std::{fs, io, path::Path};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan, time::ChronoUtc},
    layer::SubscriberExt,
};

// Config logger
#[derive(Debug, Deserialize, Clone)]
struct LoggerConfig {
    logger: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
struct LogConfig {
    level: String,
    output: String,
    is_show_line: bool,
    is_show_module_path: bool,
    is_show_target: bool,
    file: Option<LogFileConfig>,
}

#[derive(Debug, Deserialize, Clone)]
struct LogFileConfig {
    path: String,
    rotation_frequency: Option<String>,
}

/// Initialize the parent-side subscriber from a YAML config file.
///
/// Events are emitted as JSON lines through a non-blocking writer; keep the
/// returned guard alive for as long as logging should flush.
pub fn init_logger(config_path: &str) -> Result<WorkerGuard> {
    let config_content = fs::read_to_string(config_path)
        .context(format!("Failed to read config file: {config_path}"))?;
    let config: LoggerConfig = serde_yaml::from_str(&config_content)
        .context(format!("Failed to parse config file: {config_path}"))?;
    let cfg = config.logger;

    let (writer, guard) = match cfg.output.as_str() {
        "stdout" => tracing_appender::non_blocking(io::stdout()),
        "stderr" => tracing_appender::non_blocking(io::stderr()),
        "file" => {
            let file_cfg = cfg.file.clone().context("Failed to find log file config")?;

            let path = Path::new(&file_cfg.path);
            let directory = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let rotation = match file_cfg.rotation_frequency.as_deref() {
                Some("minutely") => Rotation::MINUTELY,
                Some("hourly") => Rotation::HOURLY,
                Some("daily") => Rotation::DAILY,
                _ => Rotation::NEVER,
            };
            tracing_appender::non_blocking(RollingFileAppender::new(
                rotation, directory, file_name,
            ))
        },
        other => bail!("Invalid log output specified: {other:?}"),
    };

    let subscriber_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_timer(ChronoUtc::rfc_3339())
        .with_target(cfg.is_show_target)
        .with_file(cfg.is_show_module_path)
        .with_line_number(cfg.is_show_line)
        .json();

    let env_filter = EnvFilter::try_new(&cfg.level)
        .context("Failed to parse log level from config")?;

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(subscriber_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    Ok(guard)
}

/// Where a worker's diagnostics go.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagSink {
    /// Suppress worker output entirely (the parent already logs the
    /// dispatch and the outcome).
    #[default]
    Discard,
    Stderr,
}

/// Diagnostic configuration handed to every worker.
///
/// A worker never reuses the parent's subscriber: the non-blocking writer
/// thread behind it does not survive `fork(2)`. Instead the worker installs
/// a subscriber built from this value, scoped to its own body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDiagnostics {
    #[serde(rename = "Level", default = "default_worker_level")]
    /// Env-filter directive, e.g. `warn` or `scsi_exec_rs=debug`.
    pub level: String,
    #[serde(rename = "Sink", default)]
    pub sink: DiagSink,
}

impl Default for WorkerDiagnostics {
    fn default() -> Self {
        Self { level: default_worker_level(), sink: DiagSink::default() }
    }
}

fn default_worker_level() -> String {
    "warn".to_string()
}

fn stderr_writer() -> Box<dyn io::Write> {
    Box::new(io::stderr())
}

fn discard_writer() -> Box<dyn io::Write> {
    Box::new(io::sink())
}

impl WorkerDiagnostics {
    /// Build a self-contained subscriber for one worker. Writes go straight
    /// to the sink with no background thread, which keeps the value safe to
    /// use on either side of `fork`.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let filter =
            EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("warn"));
        let make_writer: fn() -> Box<dyn io::Write> = match self.sink {
            DiagSink::Stderr => stderr_writer,
            DiagSink::Discard => discard_writer,
        };
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(make_writer)
            .with_ansi(false)
            .finish()
    }
}
