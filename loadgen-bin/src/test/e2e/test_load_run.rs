use std::time::Duration;

use clap::Parser as _;
use rama::{error::BoxError, telemetry::tracing};

use crate::{
    Args, run_with_args,
    test::e2e::{SharedOutput, target::TargetServer},
};

/// Run until the load run shuts itself down; no external signal ever fires.
async fn run_to_completion(args: &[&str], out: SharedOutput) -> Result<(), BoxError> {
    let args =
        Args::try_parse_from(std::iter::once("loadgen").chain(args.iter().copied())).unwrap();
    tokio::time::timeout(
        Duration::from_secs(30),
        run_with_args(std::future::pending::<()>(), args, out),
    )
    .await
    .expect("load run to shut down on its own")
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_finite_run_hits_target_and_writes_summary() {
    let target = TargetServer::spawn().await;
    let out = SharedOutput::default();

    run_to_completion(
        &[target.base_url(), "--iterations", "3", "--delay", "10ms"],
        out.clone(),
    )
    .await
    .unwrap();

    let requests = target.requests();
    assert_eq!(requests.len(), 3, "requests: {requests:?}");
    for req in requests {
        assert_eq!(req.path, "/work");
        assert_eq!(req.query.as_deref(), Some("latencyMs=200&failRatePct=5"));
        assert!(
            req.user_agent
                .as_deref()
                .is_some_and(|ua| ua.starts_with("loadgen/")),
            "user agent: {:?}",
            req.user_agent
        );
    }

    let report = out.contents();
    tracing::debug!("report: {report}");
    assert!(
        report
            .lines()
            .any(|line| line.starts_with("done total=3 ok=3 http_fail=0")),
        "report: {report}"
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_json_report_lines() {
    let target = TargetServer::spawn().await;
    let out = SharedOutput::default();

    run_to_completion(
        &[
            target.base_url(),
            "--json",
            "--iterations",
            "2",
            "--delay",
            "10ms",
            "--param",
            "latencyMs=5",
        ],
        out.clone(),
    )
    .await
    .unwrap();

    let requests = target.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].query.as_deref(), Some("latencyMs=5"));

    let report = out.contents();
    let events = report
        .lines()
        .filter(|line| line.contains(r#""type":"event""#))
        .count();
    assert_eq!(events, 2, "report: {report}");
    assert!(
        report
            .lines()
            .last()
            .is_some_and(|line| line.contains(r#""type":"final""#)),
        "report: {report}"
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_unreachable_target_is_reported_not_fatal() {
    // reserve a free port, then release it so nothing listens there
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let base_url = format!("http://{addr}");
    let out = SharedOutput::default();

    run_to_completion(
        &[base_url.as_str(), "--iterations", "2", "--delay", "10ms", "--timeout", "5s"],
        out.clone(),
    )
    .await
    .unwrap();

    let report = out.contents();
    assert!(
        report
            .lines()
            .any(|line| line.starts_with("done total=2 ok=0 http_fail=0")),
        "report: {report}"
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_invalid_base_url_is_fatal() {
    let out = SharedOutput::default();

    let result = run_to_completion(&["ftp://example.com", "--iterations", "1"], out.clone()).await;

    assert!(result.is_err());
    assert!(out.contents().is_empty(), "report: {}", out.contents());
}
