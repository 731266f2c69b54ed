//! Process logging.
//!
//! A [`Logger`] is built once at startup and installs the global `tracing`
//! subscriber: stdout, plus `app.log` and an ERROR-only `error.log` when a log
//! directory is configured. Call [`Logger::shutdown`] before exit so the file
//! sinks are flushed.

use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::Path,
    sync::Arc,
};

use anyhow::Context;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry,
};

use crate::config::{LogConfig, LogFormat};

pub struct Logger {
    app_name: String,
    sinks: Vec<Arc<File>>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn open_log(dir: &Path, name: &str) -> anyhow::Result<Arc<File>> {
    let path = dir.join(name);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;
    Ok(Arc::new(file))
}

impl Logger {
    /// Builds the layers without installing them.
    fn layers(cfg: &LogConfig) -> anyhow::Result<(Vec<BoxedLayer>, Vec<Arc<File>>)> {
        let filter = || EnvFilter::try_new(&cfg.filter);
        filter().with_context(|| format!("invalid log filter {:?}", cfg.filter))?;

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut sinks = Vec::new();

        let stdout: BoxedLayer = match cfg.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_filter(filter()?)
                .boxed(),
            LogFormat::Pretty => fmt::layer().with_filter(filter()?).boxed(),
        };
        layers.push(stdout);

        if let Some(dir) = &cfg.dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("create log directory {}", dir.display()))?;

            let app_log = open_log(dir, "app.log")?;
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(app_log.clone())
                    .with_filter(filter()?)
                    .boxed(),
            );

            let error_log = open_log(dir, "error.log")?;
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(error_log.clone())
                    .with_filter(LevelFilter::ERROR)
                    .boxed(),
            );

            sinks.push(app_log);
            sinks.push(error_log);
        }

        Ok((layers, sinks))
    }

    /// Installs the global subscriber. Fails if one is already installed.
    pub fn init(cfg: &LogConfig) -> anyhow::Result<Self> {
        let (layers, sinks) = Self::layers(cfg)?;
        let subscriber = Registry::default().with(layers);
        tracing::subscriber::set_global_default(subscriber)
            .context("logger already initialized")?;

        tracing::info!(app = %cfg.app_name, format = ?cfg.format, "logger initialized");
        Ok(Self {
            app_name: cfg.app_name.clone(),
            sinks,
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Flushes the file sinks. Consumes the logger; nothing is written to files afterwards.
    pub fn shutdown(self) {
        tracing::info!(app = %self.app_name, "logger shutting down");
        for sink in &self.sinks {
            let mut file: &File = sink;
            if let Err(e) = file.flush().and_then(|_| file.sync_all()) {
                eprintln!("failed to flush log file: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(dir: Option<PathBuf>) -> LogConfig {
        LogConfig {
            filter: "info".into(),
            format: LogFormat::Json,
            dir,
            app_name: "test-app".into(),
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("app-server-{name}-{}", std::process::id()))
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let mut cfg = config(None);
        cfg.filter = "app_server=notalevel".into();
        assert!(Logger::layers(&cfg).is_err());
    }

    #[test]
    fn file_sinks_are_created_in_the_log_dir() {
        let dir = temp_dir("sinks");
        let (layers, sinks) = Logger::layers(&config(Some(dir.clone()))).expect("layers");
        assert_eq!(layers.len(), 3);
        assert_eq!(sinks.len(), 2);
        assert!(dir.join("app.log").exists());
        assert!(dir.join("error.log").exists());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn stdout_only_without_dir() {
        let (layers, sinks) = Logger::layers(&config(None)).expect("layers");
        assert_eq!(layers.len(), 1);
        assert!(sinks.is_empty());
    }

    #[test]
    fn error_records_reach_error_log_only_at_error_level() {
        let dir = temp_dir("levels");
        let (layers, sinks) = Logger::layers(&config(Some(dir.clone()))).expect("layers");
        let subscriber = Registry::default().with(layers);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("plain info");
            tracing::error!("something broke");
        });
        for sink in &sinks {
            let mut f: &File = sink;
            f.flush().expect("flush");
        }

        let app = fs::read_to_string(dir.join("app.log")).expect("app.log");
        let errors = fs::read_to_string(dir.join("error.log")).expect("error.log");
        assert!(app.contains("plain info"));
        assert!(app.contains("something broke"));
        assert!(errors.contains("something broke"));
        assert!(!errors.contains("plain info"));
        let _ = fs::remove_dir_all(dir);
    }
}
