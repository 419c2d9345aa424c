use std::{io::Write, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    telemetry::tracing,
};

use loadgen_lib::{
    client,
    config::LoadConfig,
    iteration::IterationResult,
    report::{HumanReporter, JsonlReporter, Reporter},
    runner::Runner,
};
use tokio::{
    sync::mpsc::{self, Receiver},
    time::{Instant, MissedTickBehavior},
};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Run a load test, writing reports to `out`.
pub async fn exec<W>(
    guard: ShutdownGuard,
    cfg: LoadConfig,
    json: bool,
    out: W,
) -> Result<(), BoxError>
where
    W: Write + Send + 'static,
{
    let spec = cfg.request_spec()?;
    let client = client::new_web_client().context("create HTTP(S) client")?;
    let runner = Runner::new(client, spec, cfg.run_config());

    let reporter: Box<dyn Reporter> = if json {
        const EMIT_EVENTS: bool = true;
        Box::new(JsonlReporter::new(out, REPORT_INTERVAL, EMIT_EVENTS))
    } else {
        Box::new(HumanReporter::new(out, REPORT_INTERVAL))
    };

    let (result_tx, result_rx) = mpsc::channel(64);
    guard.spawn_task_fn(|guard| report_worker(guard, reporter, result_rx));

    let mut run = runner.run(guard);
    while let Some(result) = run.next_result().await {
        if let Err(err) = result_tx.send(result).await {
            tracing::debug!("failed to send iteration result msg: {err}");
            break;
        }
    }

    tracing::debug!(
        state = ?run.state(),
        completed = run.completed(),
        "load runner done: exit"
    );
    Ok(())
}

/// Feeds results into the reporter until all senders are gone.
///
/// The guard is held (not watched) so that shutdown waits for the final summary.
async fn report_worker(
    _guard: ShutdownGuard,
    mut reporter: Box<dyn Reporter>,
    mut result_rx: Receiver<IterationResult>,
) {
    let start = Instant::now();
    let mut ticker = tokio::time::interval(REPORT_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_result = result_rx.recv() => {
                let Some(result) = maybe_result else {
                    tracing::debug!("exit report worker: result senders closed");
                    break;
                };
                reporter.on_result(&result);
            }
            _ = ticker.tick() => (),
        }

        reporter.on_tick(start.elapsed());
    }

    reporter.finish();
}
