// Scan-level properties: report assembly, ordering, failure isolation,
// cancellation and the JSON contract consumed by report renderers.

use std::collections::HashMap;
use std::time::Duration;
use url::Url;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use apisentry::core::error::ConfigError;
use apisentry::core::models::{ScanConfig, Severity};
use apisentry::core::orchestrator::{CancelFlag, run_scan};

fn config(target: &str, ids: &[&str]) -> ScanConfig {
    let mut config = ScanConfig::new(
        Url::parse(target).unwrap(),
        HashMap::new(),
        ids.iter().map(|s| s.to_string()).collect(),
    );
    config.tuning.request_timeout = Duration::from_secs(5);
    config.tuning.retries = 0;
    config
}

#[tokio::test]
async fn tests_run_follows_catalog_order_regardless_of_selection_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    // Selection deliberately reversed relative to the catalog.
    let config = config(&server.uri(), &["inventory", "misconfiguration"]);
    let report = run_scan(&config, &CancelFlag::new()).await.unwrap();

    let ids: Vec<&str> = report.tests_run.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["misconfiguration", "inventory"]);
    assert!(!report.partial);
}

#[tokio::test]
async fn summary_counts_sum_to_findings() {
    let server = MockServer::start().await;
    // A bare response trips several misconfiguration checks.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let config = config(&server.uri(), &["misconfiguration"]);
    let report = run_scan(&config, &CancelFlag::new()).await.unwrap();

    assert!(!report.findings.is_empty());
    let total: usize = report.summary.by_severity.values().sum();
    assert_eq!(total, report.findings.len());
    assert_eq!(report.summary.by_severity.len(), 5);
    assert_eq!(report.summary.vulnerabilities_found, report.findings.len());

    // Every finding references a definition that actually ran.
    for finding in &report.findings {
        assert!(report.tests_run.iter().any(|d| d.id == finding.test_id));
    }
}

#[tokio::test]
async fn transport_failure_lands_in_failures_not_findings() {
    // Nothing listens on the discard port; connections are refused.
    let config = config("http://127.0.0.1:9/", &["misconfiguration"]);
    let report = run_scan(&config, &CancelFlag::new()).await.unwrap();

    assert!(report.findings.is_empty());
    let entries: Vec<_> = report
        .failures
        .iter()
        .filter(|f| f.test_id == "misconfiguration")
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.vulnerabilities_found, 0);
}

#[tokio::test]
async fn unknown_test_id_fails_fast_without_a_report() {
    let config = config("http://127.0.0.1:9/", &["bola", "made-up"]);
    let err = run_scan(&config, &CancelFlag::new()).await.unwrap_err();
    assert!(matches!(err, ConfigError::UnknownTestId(id) if id == "made-up"));
}

#[tokio::test]
async fn empty_selection_fails_fast() {
    let config = config("http://127.0.0.1:9/", &[]);
    let err = run_scan(&config, &CancelFlag::new()).await.unwrap_err();
    assert!(matches!(err, ConfigError::NoTestsSelected));
}

#[tokio::test]
async fn cancellation_keeps_completed_probes_and_marks_partial() {
    let server = MockServer::start().await;
    // Every request takes long enough that cancellation arrives while
    // the first probe is still in flight.
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("ok")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let mut config = config(&server.uri(), &["misconfiguration", "inventory"]);
    config.concurrency = 1;

    let cancel = CancelFlag::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = run_scan(&config, &cancel).await.unwrap();

    assert!(report.partial);
    // Only the first probe was dispatched before cancellation took hold.
    let ids: Vec<&str> = report.tests_run.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["misconfiguration"]);
    // No probe is represented twice anywhere in the report.
    let mut seen = std::collections::HashSet::new();
    for def in &report.tests_run {
        assert!(seen.insert(def.id));
    }
    for finding in &report.findings {
        assert_eq!(finding.test_id, "misconfiguration");
    }
}

#[tokio::test]
async fn report_json_shape_matches_renderer_contract() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let config = config(&server.uri(), &["misconfiguration"]);
    let report = run_scan(&config, &CancelFlag::new()).await.unwrap();

    let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&report).unwrap())
        .unwrap();

    for key in ["target", "startedAt", "finishedAt", "findings", "summary"] {
        assert!(json.get(key).is_some(), "missing top-level key `{}`", key);
    }
    let summary = json["summary"].as_object().unwrap();
    for severity in ["info", "low", "medium", "high", "critical"] {
        assert!(
            summary[severity].is_u64(),
            "summary.{} must be an integer count",
            severity
        );
    }
    let finding = &json["findings"][0];
    for key in ["testId", "category", "severity", "evidence", "endpoint", "recommendation"] {
        assert!(finding.get(key).is_some(), "missing finding key `{}`", key);
    }
    assert!(finding["endpoint"].get("url").is_some());
    assert!(finding["endpoint"].get("method").is_some());
}

#[tokio::test]
async fn failed_probe_and_successful_probe_coexist() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    // `injection` has no parameters to attack and reports inconclusive;
    // `misconfiguration` completes with findings.
    let config = config(&server.uri(), &["misconfiguration", "injection"]);
    let report = run_scan(&config, &CancelFlag::new()).await.unwrap();

    assert_eq!(report.tests_run.len(), 2);
    assert!(!report.findings.is_empty());
    assert!(report.findings.iter().all(|f| f.test_id == "misconfiguration"));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].test_id, "injection");
    assert!(report.failures[0].reason.starts_with("inconclusive"));
}

#[tokio::test]
async fn clean_target_produces_empty_findings_not_failures() {
    let server = MockServer::start().await;
    // Hardened response: every checklist item passes.
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-security-policy", "default-src 'self'")
                .insert_header("x-content-type-options", "nosniff")
                .insert_header("x-frame-options", "DENY")
                .set_body_string("ok"),
        )
        .mount(&server)
        .await;

    let config = config(&server.uri(), &["misconfiguration"]);
    let report = run_scan(&config, &CancelFlag::new()).await.unwrap();

    assert!(report.findings.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(report.summary.risk_score, 0);
    assert_eq!(report.summary.risk_level, Severity::Low);
}
