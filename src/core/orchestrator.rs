// src/core/orchestrator.rs

//! Scan orchestration: validates the configuration, resolves the
//! selected probes from the catalog and executes them on a bounded
//! worker pool. Probes run in parallel with each other but internally
//! sequential; results are assembled in catalog order regardless of
//! completion order, so reports are reproducible.

use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::core::aggregator;
use crate::core::catalog;
use crate::core::error::ConfigError;
use crate::core::http::HttpProbe;
use crate::core::models::{
    Finding, ProbeFailure, ProbeOutcome, ScanConfig, ScanReport, TestDefinition,
};
use crate::core::probes::{Probe, ProbeCtx};

/// Cooperative cancellation handle. Cancelling stops the orchestrator
/// from dispatching further probes; in-flight probes run to completion or
/// hit their own request timeouts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs a full scan. Fails fast with `ConfigError` before any network
/// call when the target or test selection is invalid; otherwise always
/// produces a report, even a degraded one.
pub async fn run_scan(config: &ScanConfig, cancel: &CancelFlag) -> Result<ScanReport, ConfigError> {
    let selected = validate(config)?;

    let http = Arc::new(HttpProbe::new(
        config.tuning.request_timeout,
        config.tuning.retries,
        config.insecure_tls,
    )?);

    let started_at = Utc::now();
    let scan_id = started_at.format("%Y%m%d_%H%M%S").to_string();
    let deadline = config.scan_timeout.map(|t| Instant::now() + t);
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));

    info!(
        target = %config.target,
        scan_id,
        tests = selected.len(),
        concurrency = config.concurrency,
        "starting scan"
    );

    let mut handles = Vec::with_capacity(selected.len());
    let mut partial = false;

    for (def, probe) in selected {
        // Permits gate dispatch, so with the pool saturated this await is
        // also where cancellation takes effect between probes.
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        if cancel.is_cancelled() {
            warn!(test = def.id, "cancellation requested; not dispatching further probes");
            partial = true;
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(test = def.id, "scan deadline reached; not dispatching further probes");
            partial = true;
            break;
        }

        let ctx = ProbeCtx {
            http: Arc::clone(&http),
            target: config.target.clone(),
            headers: config.headers.clone(),
            tuning: config.tuning.clone(),
            definition: def,
        };
        handles.push((
            def,
            tokio::spawn(async move {
                let _permit = permit;
                info!(test = ctx.definition.id, "probe started");
                let outcome = probe.run(&ctx).await;
                info!(test = ctx.definition.id, "probe finished");
                outcome
            }),
        ));
    }

    let mut tests_run: Vec<TestDefinition> = Vec::new();
    let mut findings: Vec<Finding> = Vec::new();
    let mut failures: Vec<ProbeFailure> = Vec::new();

    // Joining in dispatch order keeps report order aligned with the
    // catalog no matter which probe finished first.
    for (def, handle) in handles {
        match handle.await {
            Ok(ProbeOutcome::Findings(probe_findings)) => {
                tests_run.push(*def);
                info!(test = def.id, count = probe_findings.len(), "probe completed");
                findings.extend(probe_findings);
            }
            Ok(ProbeOutcome::Inconclusive(reason)) => {
                tests_run.push(*def);
                warn!(test = def.id, reason, "probe inconclusive");
                failures.push(ProbeFailure {
                    test_id: def.id.to_string(),
                    reason: format!("inconclusive: {}", reason),
                });
            }
            Ok(ProbeOutcome::TransportFailure(err)) => {
                tests_run.push(*def);
                warn!(test = def.id, error = %err, "probe failed at transport level");
                failures.push(ProbeFailure {
                    test_id: def.id.to_string(),
                    reason: err.to_string(),
                });
            }
            Err(join_err) => {
                // A panicking probe is a defect; record it and keep the
                // rest of the scan alive.
                tests_run.push(*def);
                error!(test = def.id, error = %join_err, "probe task aborted");
                failures.push(ProbeFailure {
                    test_id: def.id.to_string(),
                    reason: format!("probe aborted: {}", join_err),
                });
            }
        }
    }

    let finished_at = Utc::now();
    let summary = aggregator::aggregate(&tests_run, &findings, &failures);

    info!(
        scan_id,
        findings = findings.len(),
        failures = failures.len(),
        partial,
        "scan finished"
    );

    Ok(ScanReport {
        scan_id,
        target: config.target.to_string(),
        started_at,
        finished_at,
        partial,
        tests_run,
        findings,
        failures,
        summary,
    })
}

/// Validates target and selection, resolving every id against the
/// catalog. Resolution order is catalog order, independent of the order
/// ids were supplied in; duplicates collapse.
fn validate(config: &ScanConfig) -> Result<Vec<(&'static TestDefinition, Probe)>, ConfigError> {
    match config.target.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::InvalidTarget {
                url: config.target.to_string(),
                reason: format!("unsupported scheme `{}`", other),
            });
        }
    }
    if config.target.host_str().is_none() {
        return Err(ConfigError::InvalidTarget {
            url: config.target.to_string(),
            reason: "missing host".to_string(),
        });
    }

    if config.selected_test_ids.is_empty() {
        return Err(ConfigError::NoTestsSelected);
    }
    for id in &config.selected_test_ids {
        // Surface unknown ids before any probe resolution.
        catalog::resolve(id)?;
    }

    let mut resolved = Vec::new();
    for def in catalog::definitions().iter().filter(|def| def.enabled) {
        if config.selected_test_ids.iter().any(|id| id == def.id) {
            resolved.push(catalog::resolve(def.id)?);
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use url::Url;

    fn config_with(ids: &[&str]) -> ScanConfig {
        ScanConfig::new(
            Url::parse("http://target.test/api").unwrap(),
            HashMap::new(),
            ids.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn validate_rejects_unknown_ids() {
        let config = config_with(&["bola", "made-up"]);
        assert!(matches!(
            validate(&config),
            Err(ConfigError::UnknownTestId(id)) if id == "made-up"
        ));
    }

    #[test]
    fn validate_rejects_empty_selection() {
        let config = config_with(&[]);
        assert!(matches!(validate(&config), Err(ConfigError::NoTestsSelected)));
    }

    #[test]
    fn validate_rejects_non_http_scheme() {
        let mut config = config_with(&["bola"]);
        config.target = Url::parse("ftp://target.test/").unwrap();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn selection_follows_catalog_order_and_dedupes() {
        let config = config_with(&["injection", "bola", "injection"]);
        let resolved = validate(&config).unwrap();
        let ids: Vec<_> = resolved.iter().map(|(def, _)| def.id).collect();
        assert_eq!(ids, vec!["bola", "injection"]);
    }
}
