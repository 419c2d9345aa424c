use std::{io::IsTerminal as _, path::Path};

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing::{
        self,
        metadata::LevelFilter,
        subscriber::{
            EnvFilter, fmt, fmt::writer::BoxMakeWriter, layer::SubscriberExt as _,
            util::SubscriberInitExt as _,
        },
    },
};

/// Options for [`init_tracing`].
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig<'a> {
    pub verbose: bool,
    pub pretty: bool,
    pub output: Option<&'a Path>,
}

/// Configures structured logging with runtime control via `RUST_LOG` environment variable.
///
/// Without a config (or without `verbose`) the default level is INFO.
/// Logs go to stderr, so they never mix with reports written to stdout,
/// unless an output file is given, in which case they are appended to it.
pub fn init_tracing(cfg: Option<TelemetryConfig<'_>>) -> Result<(), BoxError> {
    let cfg = cfg.unwrap_or_default();

    let (make_writer, ansi) = log_writer(cfg.output)?;
    let fmt_layer = fmt::layer().with_ansi(ansi).with_writer(make_writer);

    let registry = tracing::subscriber::registry().with(
        EnvFilter::builder()
            .with_default_directive(default_level(cfg.verbose).into())
            .from_env_lossy(),
    );

    if cfg.pretty {
        registry.with(fmt_layer.pretty()).try_init()?;
    } else {
        registry.with(fmt_layer).try_init()?;
    }

    tracing::info!("Tracing is set up");
    Ok(())
}

fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

/// Writer for log lines and whether it supports ansi colors.
fn log_writer(output: Option<&Path>) -> Result<(BoxMakeWriter, bool), BoxError> {
    match output {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .with_context(|| format!("open log file at path '{}'", path.display()))?;
            Ok((BoxMakeWriter::new(file), false))
        }
        None => Ok((
            BoxMakeWriter::new(std::io::stderr),
            std::io::stderr().is_terminal(),
        )),
    }
}
