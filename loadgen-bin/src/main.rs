use std::{io::Write, path::PathBuf, time::Duration};

use rama::{error::BoxError, graceful, telemetry::tracing};

use clap::Parser;
use loadgen_lib::{config::LoadConfig, utils};

pub mod run;

#[cfg(test)]
pub mod test;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// CLI arguments for configuring a load run.
#[derive(Debug, Clone, Parser)]
#[command(name = "loadgen")]
#[command(bin_name = "loadgen")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(flatten)]
    pub load: LoadConfig,

    /// report json lines instead of a human-friendly format
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 0.)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(Some(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    }))?;

    let base_shutdown_signal = graceful::default_signal();
    if let Err(err) = run_with_args(base_shutdown_signal, args, std::io::stdout()).await {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

/// run a load generator with the given args, writing reports to `out`
async fn run_with_args<F, W>(
    base_shutdown_signal: F,
    args: Args,
    out: W,
) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
    W: Write + Send + 'static,
{
    let graceful_timeout = (args.graceful > 0.).then(|| Duration::from_secs_f64(args.graceful));

    let (error_tx, error_rx) = tokio::sync::oneshot::channel::<BoxError>();
    let (fatal_tx, mut fatal_rx) = tokio::sync::oneshot::channel::<BoxError>();
    let graceful = graceful::Shutdown::new(new_shutdown_signal(
        error_rx,
        fatal_tx,
        base_shutdown_signal,
    ));

    graceful.spawn_task_fn(async move |guard| {
        if let Err(err) = self::run::exec(guard, args.load, args.json, out).await {
            let _ = error_tx.send(err);
        }
    });

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };
    tracing::debug!("gracefully shutdown with a delay of: {delay:?}");

    match fatal_rx.try_recv() {
        Ok(err) => Err(err),
        Err(_) => Ok(()),
    }
}

fn new_shutdown_signal(
    error_rx: tokio::sync::oneshot::Receiver<BoxError>,
    fatal_tx: tokio::sync::oneshot::Sender<BoxError>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        tokio::select! {
            _ = base_shutdown_signal => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            result = error_rx => {
                match result {
                    Ok(err) => {
                        tracing::error!("fatal err received: {err}; abort");
                        let _ = fatal_tx.send(err);
                    },
                    Err(_) => {
                        tracing::debug!("load run is finished without error, return control");
                    },
                }
            }
        }
    }
}
