// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use url::Url;

use crate::core::error::TransportError;

// --- Severity & Category ---

/// Risk ranking assigned per finding and aggregated per scan.
/// The variant order gives `Info < Low < Medium < High < Critical`,
/// which drives sorting and summary bucketing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// OWASP API Security Top 10 (2023) categories covered by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OwaspCategory {
    Bola,
    BrokenAuthentication,
    BrokenObjectPropertyAuthorization,
    UnrestrictedResourceConsumption,
    BrokenFunctionAuthorization,
    Ssrf,
    SecurityMisconfiguration,
    ImproperInventoryManagement,
    Injection,
}

impl OwaspCategory {
    /// The official OWASP API Top 10 (2023) code for this category.
    pub fn code(&self) -> &'static str {
        match self {
            OwaspCategory::Bola => "API1:2023",
            OwaspCategory::BrokenAuthentication => "API2:2023",
            OwaspCategory::BrokenObjectPropertyAuthorization => "API3:2023",
            OwaspCategory::UnrestrictedResourceConsumption => "API4:2023",
            OwaspCategory::BrokenFunctionAuthorization => "API5:2023",
            OwaspCategory::Ssrf => "API7:2023",
            OwaspCategory::SecurityMisconfiguration => "API8:2023",
            OwaspCategory::ImproperInventoryManagement => "API9:2023",
            OwaspCategory::Injection => "API10:2023",
        }
    }

    /// Human-readable category name for report rendering.
    pub fn title(&self) -> &'static str {
        match self {
            OwaspCategory::Bola => "Broken Object Level Authorization",
            OwaspCategory::BrokenAuthentication => "Broken Authentication",
            OwaspCategory::BrokenObjectPropertyAuthorization => {
                "Broken Object Property Level Authorization"
            }
            OwaspCategory::UnrestrictedResourceConsumption => "Unrestricted Resource Consumption",
            OwaspCategory::BrokenFunctionAuthorization => "Broken Function Level Authorization",
            OwaspCategory::Ssrf => "Server Side Request Forgery",
            OwaspCategory::SecurityMisconfiguration => "Security Misconfiguration",
            OwaspCategory::ImproperInventoryManagement => "Improper Inventory Management",
            OwaspCategory::Injection => "Injection",
        }
    }
}

// --- Test Catalog Entries ---

/// One entry of the static test catalog. All fields are `'static` because
/// definitions are created once at process start and never mutated.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TestDefinition {
    pub id: &'static str,
    pub category: OwaspCategory,
    pub title: &'static str,
    pub severity: Severity,
    pub enabled: bool,
}

// --- Scan Configuration ---

/// Tunable probe thresholds. These are calibration choices, not invariants,
/// so every one of them is a named option with a documented default.
#[derive(Debug, Clone)]
pub struct ProbeTuning {
    /// Per-request timeout applied inside the HTTP layer. Default 10s.
    pub request_timeout: Duration,
    /// Retries on connect-level failures. Default 1.
    pub retries: u32,
    /// Number of requests in the resource-consumption burst. Default 15.
    pub burst_size: usize,
    /// Canary destinations substituted into URL-accepting parameters.
    pub canary_urls: Vec<String>,
    /// Maximum length of an evidence fragment captured from a response.
    pub max_evidence_len: usize,
}

impl Default for ProbeTuning {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            retries: 1,
            burst_size: 15,
            canary_urls: vec![
                "http://127.0.0.1/".to_string(),
                "http://169.254.169.254/latest/meta-data/".to_string(),
            ],
            max_evidence_len: 300,
        }
    }
}

/// Operator-supplied scan configuration. Built once by the CLI,
/// immutable for the duration of a scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub target: Url,
    pub headers: HashMap<String, String>,
    /// Catalog ids to execute. Execution order always follows catalog
    /// order, not the order given here.
    pub selected_test_ids: Vec<String>,
    pub tuning: ProbeTuning,
    /// Maximum number of probes running at once.
    pub concurrency: usize,
    /// Overall scan deadline. `None` means no scan-level deadline.
    pub scan_timeout: Option<Duration>,
    /// Accept invalid TLS certificates (lab targets only).
    pub insecure_tls: bool,
}

impl ScanConfig {
    pub fn new(target: Url, headers: HashMap<String, String>, selected: Vec<String>) -> Self {
        Self {
            target,
            headers,
            selected_test_ids: selected,
            tuning: ProbeTuning::default(),
            concurrency: 4,
            scan_timeout: None,
            insecure_tls: false,
        }
    }
}

// --- Findings ---

/// The request target a finding was observed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub method: String,
}

/// One reported instance of a potential vulnerability. Created exclusively
/// by probes and never mutated once appended to a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub test_id: String,
    pub category: OwaspCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub evidence: String,
    pub endpoint: Endpoint,
    pub recommendation: String,
    pub discovered_at: DateTime<Utc>,
}

impl Finding {
    /// Builds a finding carrying the definition's id, category, severity
    /// and title. Probes that grade per-check (the misconfiguration
    /// checklist) override severity and title afterwards.
    pub fn new(
        def: &TestDefinition,
        endpoint: Endpoint,
        description: impl Into<String>,
        evidence: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            test_id: def.id.to_string(),
            category: def.category,
            severity: def.severity,
            title: def.title.to_string(),
            description: description.into(),
            evidence: evidence.into(),
            endpoint,
            recommendation: recommendation.into(),
            discovered_at: Utc::now(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

// --- Probe Outcome ---

/// Result contract every probe returns for a single execution.
/// "Ran cleanly, nothing found" is `Findings(vec![])`, which must never be
/// conflated with "could not run" (`Inconclusive`/`TransportFailure`).
#[derive(Debug)]
pub enum ProbeOutcome {
    Findings(Vec<Finding>),
    Inconclusive(String),
    TransportFailure(TransportError),
}

// --- Scan Report ---

/// A probe that could not complete its run, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeFailure {
    pub test_id: String,
    pub reason: String,
}

/// Severity bucket counts plus scan-level totals. Every severity is always
/// present in `by_severity`, zero when absent from the findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(flatten)]
    pub by_severity: BTreeMap<Severity, usize>,
    pub total_tests: usize,
    pub vulnerabilities_found: usize,
    pub failed: usize,
    /// Weighted 0-100 risk score over the findings.
    pub risk_score: u8,
    pub risk_level: Severity,
}

/// The sole artifact crossing into the reporting collaborators.
/// Read-only once the scan finishes; serializes to the JSON shape that
/// downstream automation (CI gating on `summary.critical`) depends on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub scan_id: String,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when the scan was cancelled or hit its deadline before every
    /// selected probe could be dispatched.
    pub partial: bool,
    pub tests_run: Vec<TestDefinition>,
    pub findings: Vec<Finding>,
    pub failures: Vec<ProbeFailure>,
    pub summary: Summary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn severity_total_order() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_serializes_lowercase() {
        for sev in Severity::iter() {
            let json = serde_json::to_string(&sev).unwrap();
            assert_eq!(json, format!("\"{}\"", sev.to_string().to_lowercase()));
        }
    }

    #[test]
    fn category_codes_are_owasp_2023() {
        assert_eq!(OwaspCategory::Bola.code(), "API1:2023");
        assert_eq!(OwaspCategory::Injection.code(), "API10:2023");
    }
}
