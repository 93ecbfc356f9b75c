use std::time::Duration;

use hunter_client::{
    BatchOptions, BatchOutcome, ClientSettings, CsvUpload, ExportFormat, JobId, JobStatus,
    MonitorEvent, MonitorHandle, MonitorSettings, PollSettings, Resolved, RetrySchedule,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn handle_for(server: &MockServer) -> MonitorHandle {
    MonitorHandle::new(MonitorSettings {
        client: ClientSettings {
            base_url: server.uri(),
            ..ClientSettings::default()
        },
        poll: PollSettings {
            interval: Duration::from_millis(50),
            ..PollSettings::default()
        },
        retry: RetrySchedule {
            max_attempts: 3,
            base_delay: Duration::from_millis(20),
            step: Duration::from_millis(10),
        },
    })
    .unwrap()
}

/// Drains events until `done` matches one, without blocking the test runtime.
async fn collect_until(
    handle: &MonitorHandle,
    done: impl Fn(&MonitorEvent) -> bool,
) -> Vec<MonitorEvent> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let mut events = Vec::new();
    while tokio::time::Instant::now() < deadline {
        while let Some(event) = handle.try_recv() {
            let finished = done(&event);
            events.push(event);
            if finished {
                return events;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out; events so far: {events:?}");
}

fn job_body(status: &str, processed: u64) -> serde_json::Value {
    json!({
        "job_id": "job-42",
        "status": status,
        "total": 3,
        "processed": processed,
        "successful": processed,
        "failed": 0,
        "remaining": 3 - processed,
        "progress_percent": processed as f64 * 100.0 / 3.0
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_then_poll_until_completed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest/csv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-42",
            "status": "pending",
            "total": 3
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/job-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("processing", 1)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/job-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("processing", 2)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/job-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("completed", 3)))
        .mount(&server)
        .await;

    let handle = handle_for(&server);
    handle.submit_batch(
        CsvUpload::new("domains.csv", "domain\na.com\nb.com\nc.com\n"),
        BatchOptions::default(),
    );
    let submitted = collect_until(&handle, |event| {
        matches!(event, MonitorEvent::BatchSubmitted(_))
    })
    .await;
    let Some(MonitorEvent::BatchSubmitted(Ok(BatchOutcome::Async { job_id }))) = submitted.last()
    else {
        panic!("unexpected submission result: {submitted:?}");
    };
    assert_eq!(job_id, &JobId::new("job-42"));

    handle.start_polling(job_id.clone());
    let events = collect_until(&handle, |event| {
        matches!(event, MonitorEvent::JobFinished(_))
    })
    .await;

    let processed: Vec<(u64, u64)> = events
        .iter()
        .filter_map(|event| match event {
            MonitorEvent::JobUpdated(s) => Some((s.seq, s.progress.processed)),
            _ => None,
        })
        .collect();
    assert_eq!(processed, vec![(1, 1), (2, 2), (3, 3)]);
    let Some(MonitorEvent::JobFinished(last)) = events.last() else {
        unreachable!()
    };
    assert_eq!(last.progress.status, JobStatus::Completed);

    // Polling stops after the terminal state.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(handle.try_recv().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_polling_goes_quiet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/job-7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "job_id": "job-7",
                "status": "processing",
                "total": 3,
                "processed": 1,
                "successful": 1,
                "failed": 0,
                "remaining": 2,
                "progress_percent": 33.3
            })),
        )
        .mount(&server)
        .await;

    let handle = handle_for(&server);
    handle.start_polling(JobId::new("job-7"));
    collect_until(&handle, |event| matches!(event, MonitorEvent::JobUpdated(_))).await;

    handle.cancel_polling(JobId::new("job-7"));
    tokio::time::sleep(Duration::from_millis(150)).await;
    while handle.try_recv().is_some() {}
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(handle.try_recv().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn second_poll_request_for_a_job_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/job-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("processing", 1)))
        .mount(&server)
        .await;

    let handle = handle_for(&server);
    handle.start_polling(JobId::new("job-9"));
    handle.start_polling(JobId::new("job-9"));
    let events = collect_until(&handle, |event| {
        matches!(event, MonitorEvent::PollRejected { .. })
    })
    .await;
    assert_eq!(
        events.last(),
        Some(&MonitorEvent::PollRejected {
            job_id: JobId::new("job-9")
        })
    );
    handle.cancel_polling(JobId::new("job-9"));
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_tolerates_existing_domain_and_breakdown_appears_late() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest/domain"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "detail": "Domain acme.com already exists" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/scan/domain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "domain": "acme.com",
            "score": 64,
            "segment": "existing"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/leads/acme.com/score-breakdown"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Lead not found" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/leads/acme.com/score-breakdown"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "base_score": 10,
            "total_score": 64
        })))
        .mount(&server)
        .await;

    let handle = handle_for(&server);
    handle.scan_domain("acme.com", None);
    let events = collect_until(&handle, |event| {
        matches!(event, MonitorEvent::ScanFinished { .. })
    })
    .await;
    let Some(MonitorEvent::ScanFinished { result, .. }) = events.last() else {
        unreachable!()
    };
    assert_eq!(result.as_ref().map(|scan| scan.score), Ok(Some(64)));

    handle.await_breakdown("acme.com");
    let events = collect_until(&handle, |event| {
        matches!(event, MonitorEvent::BreakdownResolved { .. })
    })
    .await;
    let Some(MonitorEvent::BreakdownResolved { domain, outcome }) = events.last() else {
        unreachable!()
    };
    assert_eq!(domain, "acme.com");
    assert!(matches!(outcome, Resolved::Ready(b) if b.total_score == 64));
}

#[tokio::test(flavor = "multi_thread")]
async fn breakdown_that_never_appears_is_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads/ghost.io/score-breakdown"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let handle = handle_for(&server);
    handle.await_breakdown("ghost.io");
    let events = collect_until(&handle, |event| {
        matches!(event, MonitorEvent::BreakdownResolved { .. })
    })
    .await;
    assert!(matches!(
        events.last(),
        Some(MonitorEvent::BreakdownResolved {
            outcome: Resolved::Exhausted { attempts: 3, .. },
            ..
        })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn export_is_written_to_the_target_directory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads/export"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-disposition", "attachment; filename=leads_cold.csv")
                .set_body_raw("domain\ncold.example\n", "text/csv"),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let handle = handle_for(&server);
    handle.export(Vec::new(), ExportFormat::Csv, temp.path().join("exports"));
    let events = collect_until(&handle, |event| {
        matches!(event, MonitorEvent::ExportFinished(_))
    })
    .await;
    let Some(MonitorEvent::ExportFinished(Ok(written))) = events.last() else {
        panic!("export failed: {events:?}");
    };
    assert_eq!(written, &temp.path().join("exports").join("leads_cold.csv"));
    assert_eq!(
        std::fs::read_to_string(written).unwrap(),
        "domain\ncold.example\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_fires_after_the_delay() {
    let server = MockServer::start().await;
    let handle = handle_for(&server);
    handle.refresh_after(Duration::from_millis(50));
    assert!(handle.try_recv().is_none());
    let events = collect_until(&handle, |event| matches!(event, MonitorEvent::RefreshDue)).await;
    assert_eq!(events, vec![MonitorEvent::RefreshDue]);
}
