//! Drives the full runner against a local mock HTTP endpoint and inspects the resulting
//! report: iteration counts for the configured rate, the request on the wire, check
//! aggregation, threshold outcomes and dropped-iteration accounting.

use gust_runner::prelude::{
    run, HookResult, OperationRecord, ReporterOpt, RunReport, ScenarioCli,
    ScenarioDefinitionBuilder, Threshold, UserValuesConstraint, VuContext,
};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const HTTP_REQ: &str = "http_req";
const STATUS_CHECK: &str = "is status 200";
const DURATION_CHECK: &str = "is response less than 18000ms";
const DURATION_CHECK_LIMIT_MS: u128 = 180_000;

#[derive(Default, Debug)]
struct RunnerValues {}

impl UserValuesConstraint for RunnerValues {}

#[derive(Default, Debug)]
struct VuValues {
    client: Option<reqwest::Client>,
}

impl UserValuesConstraint for VuValues {}

/// The first request the mock server saw, as it arrived on the wire.
#[derive(Default, Clone)]
struct CapturedRequest {
    request_line: String,
    content_type: String,
    body: String,
}

type Captured = Arc<Mutex<Option<CapturedRequest>>>;

/// Minimal HTTP/1.1 server answering every request on the listener with a fixed status and
/// body, after an optional artificial delay. Counts the requests it serves and keeps the
/// first one for inspection.
fn start_mock_server(
    status: u16,
    body: &'static str,
    delay: Duration,
) -> (SocketAddr, Arc<AtomicUsize>, Captured) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("Mock server has no local addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let captured: Captured = Arc::new(Mutex::new(None));

    let accept_hits = hits.clone();
    let accept_captured = captured.clone();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let hits = accept_hits.clone();
            let captured = accept_captured.clone();
            std::thread::spawn(move || serve_connection(stream, status, body, delay, hits, captured));
        }
    });

    (addr, hits, captured)
}

fn serve_connection(
    stream: TcpStream,
    status: u16,
    body: &'static str,
    delay: Duration,
    hits: Arc<AtomicUsize>,
    captured: Captured,
) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(clone) => clone,
        Err(_) => return,
    });
    let mut stream = stream;

    // The client keeps connections alive, so serve requests until it hangs up.
    loop {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
            return;
        }

        let mut content_length = 0usize;
        let mut content_type = String::new();
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).unwrap_or(0) == 0 {
                return;
            }
            if header == "\r\n" {
                break;
            }
            let lowered = header.to_ascii_lowercase();
            if let Some(value) = lowered.strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap_or(0);
            }
            if let Some(value) = lowered.strip_prefix("content-type:") {
                content_type = value.trim().to_string();
            }
        }

        let mut request_body = vec![0u8; content_length];
        if reader.read_exact(&mut request_body).is_err() {
            return;
        }

        hits.fetch_add(1, Ordering::SeqCst);

        {
            let mut captured = captured.lock().expect("Capture lock poisoned");
            if captured.is_none() {
                *captured = Some(CapturedRequest {
                    request_line: request_line.trim_end().to_string(),
                    content_type,
                    body: String::from_utf8_lossy(&request_body).into_owned(),
                });
            }
        }

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let reason = match status {
            200 => "OK",
            500 => "Internal Server Error",
            504 => "Gateway Timeout",
            _ => "Unknown",
        };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n{body}",
            body.len(),
        );
        if stream.write_all(response.as_bytes()).is_err() {
            return;
        }
    }
}

fn vu_setup(ctx: &mut VuContext<RunnerValues, VuValues>) -> HookResult {
    ctx.get_mut().client = Some(reqwest::Client::new());
    Ok(())
}

fn post_behaviour(ctx: &mut VuContext<RunnerValues, VuValues>) -> HookResult {
    let client = ctx.get().client.clone().expect("Client is set up");
    let url = ctx.runner_context().get_connection_string().to_string();
    let reporter = ctx.runner_context().reporter();

    ctx.runner_context().executor().execute_in_place(async move {
        let payload = serde_json::json!({ "prompt": "Tell me a joke in German" });

        let record = OperationRecord::new(HTTP_REQ);
        let response = client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(payload.to_string())
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                let _body = response.text().await.unwrap_or_default();
                let record = record.finish(status != 200);
                let duration = record.duration().expect("Record was finished");

                reporter.add_check(STATUS_CHECK, status == 200);
                reporter.add_check(
                    DURATION_CHECK,
                    duration.as_millis() <= DURATION_CHECK_LIMIT_MS,
                );
                reporter.add_operation(record);
            }
            Err(_) => {
                let record = record.finish(true);
                reporter.add_check(STATUS_CHECK, false);
                reporter.add_operation(record);
            }
        }

        Ok(())
    })?;

    Ok(())
}

fn scenario_cli(addr: SocketAddr, duration: u64) -> ScenarioCli {
    ScenarioCli {
        connection_string: Some(format!("http://{addr}/chat_completions")),
        duration: Some(duration),
        soak: false,
        no_progress: true,
        reporter: ReporterOpt::Noop,
        run_id: None,
    }
}

fn run_against(
    name: &str,
    addr: SocketAddr,
    duration: u64,
    rate: f64,
    min_vus: usize,
    max_vus: usize,
    thresholds: Vec<Threshold>,
) -> RunReport {
    let mut scenario = ScenarioDefinitionBuilder::<RunnerValues, VuValues>::new(
        name,
        scenario_cli(addr, duration),
    )
    .with_rate_per_second(rate)
    .with_min_vus(min_vus)
    .with_max_vus(max_vus)
    .use_vu_setup(vu_setup)
    .use_vu_behaviour(post_behaviour);

    for threshold in thresholds {
        scenario = scenario.with_threshold(threshold);
    }

    run(scenario).expect("Run failed")
}

#[test]
fn healthy_endpoint_completes_iterations_at_the_configured_rate() {
    let (addr, hits, _captured) = start_mock_server(200, "ok", Duration::from_millis(10));

    let report = run_against(
        "healthy_endpoint",
        addr,
        2,
        2.0,
        2,
        60,
        vec![Threshold::p_below(HTTP_REQ, 90.0, 1500.0)],
    );

    // 2 seconds at 2/s: roughly four iterations, with slack for scheduling jitter.
    let op = report.operation(HTTP_REQ).expect("No http_req stats");
    assert!(
        (3..=6).contains(&op.stats.count),
        "Unexpected iteration count: {}",
        op.stats.count
    );
    assert_eq!(op.error_count, 0);
    assert_eq!(hits.load(Ordering::SeqCst), op.stats.count);

    let status_check = report.check(STATUS_CHECK).expect("No status check");
    assert_eq!(status_check.passes, op.stats.count);
    assert_eq!(status_check.fails, 0);

    let duration_check = report.check(DURATION_CHECK).expect("No duration check");
    assert_eq!(duration_check.passes, op.stats.count);
    assert_eq!(duration_check.fails, 0);

    assert!(report.thresholds_passed());
    assert!(op.stats.p90_ms < 1500.0);
}

#[test]
fn each_iteration_posts_the_fixed_json_payload() {
    let (addr, _hits, captured) = start_mock_server(200, "ok", Duration::ZERO);

    run_against("posts_fixed_payload", addr, 1, 2.0, 1, 1, vec![]);

    let request = captured
        .lock()
        .expect("Capture lock poisoned")
        .clone()
        .expect("No request captured");
    assert_eq!(request.request_line, "POST /chat_completions HTTP/1.1");
    assert_eq!(request.content_type, "application/json");
    assert_eq!(
        request.body,
        serde_json::json!({ "prompt": "Tell me a joke in German" }).to_string()
    );
}

#[test]
fn failing_endpoint_reports_every_check_failed() {
    let (addr, _hits, _captured) = start_mock_server(500, "boom", Duration::ZERO);

    let report = run_against("failing_endpoint", addr, 2, 2.0, 2, 60, vec![]);

    let op = report.operation(HTTP_REQ).expect("No http_req stats");
    assert!(op.stats.count >= 1);
    assert_eq!(op.error_count, op.stats.count);

    let status_check = report.check(STATUS_CHECK).expect("No status check");
    assert_eq!(status_check.passes, 0);
    assert_eq!(status_check.fails, op.stats.count);
    assert_eq!(status_check.pass_rate(), 0.0);
}

#[test]
fn gateway_timeout_reports_failed_status_check() {
    let (addr, _hits, _captured) = start_mock_server(504, "upstream timed out", Duration::ZERO);

    let report = run_against("gateway_timeout", addr, 2, 2.0, 2, 60, vec![]);

    let op = report.operation(HTTP_REQ).expect("No http_req stats");
    assert!(op.stats.count >= 1);
    assert_eq!(op.error_count, op.stats.count);

    let status_check = report.check(STATUS_CHECK).expect("No status check");
    assert_eq!(status_check.passes, 0);
    assert_eq!(status_check.fails, op.stats.count);

    // A 504 is still a completed response, so the duration check is observed every iteration.
    let duration_check = report.check(DURATION_CHECK).expect("No duration check");
    assert_eq!(duration_check.total(), op.stats.count);
}

#[test]
fn slow_endpoint_breaches_the_latency_threshold() {
    let (addr, _hits, _captured) = start_mock_server(200, "ok", Duration::from_millis(50));

    let report = run_against(
        "slow_endpoint",
        addr,
        2,
        2.0,
        2,
        60,
        vec![Threshold::p_below(HTTP_REQ, 90.0, 1.0)],
    );

    assert!(!report.thresholds_passed());
    let outcome = &report.thresholds[0];
    assert!(outcome.observed_ms >= 1.0);
}

#[test]
fn saturated_pool_drops_iterations_instead_of_queueing() {
    // One VU serving 400ms responses cannot keep up with 20 iterations per second, and the
    // pool is capped at that single VU.
    let (addr, _hits, _captured) = start_mock_server(200, "ok", Duration::from_millis(400));

    let report = run_against("saturated_pool", addr, 2, 20.0, 1, 1, vec![]);

    let op = report.operation(HTTP_REQ).expect("No http_req stats");
    assert!(op.stats.count >= 1);
    assert!(
        report.dropped_iterations > 0,
        "Expected dropped iterations, got {}",
        report.dropped_iterations
    );
}
