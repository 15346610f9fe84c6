// src/core/aggregator.rs

//! Report aggregation: a pure fold from findings and failures into the
//! summary block. Aggregating the same inputs twice yields the same
//! summary, and the severity buckets always sum to the number of
//! findings.

use std::collections::BTreeMap;
use strum::IntoEnumIterator;

use crate::core::models::{Finding, ProbeFailure, Severity, Summary, TestDefinition};

/// Risk score weights per severity, capped at 100 overall.
const WEIGHT_CRITICAL: usize = 25;
const WEIGHT_HIGH: usize = 15;
const WEIGHT_MEDIUM: usize = 8;
const WEIGHT_LOW: usize = 3;

pub fn aggregate(
    tests_run: &[TestDefinition],
    findings: &[Finding],
    failures: &[ProbeFailure],
) -> Summary {
    // Seed every severity with zero so absent buckets serialize as 0,
    // not as missing keys.
    let mut by_severity: BTreeMap<Severity, usize> =
        Severity::iter().map(|sev| (sev, 0)).collect();
    for finding in findings {
        *by_severity.entry(finding.severity).or_insert(0) += 1;
    }

    debug_assert_eq!(
        by_severity.values().sum::<usize>(),
        findings.len(),
        "severity buckets must sum to the findings count"
    );

    let risk_score = risk_score(&by_severity);

    Summary {
        by_severity,
        total_tests: tests_run.len(),
        vulnerabilities_found: findings.len(),
        failed: failures.len(),
        risk_score,
        risk_level: risk_level(risk_score),
    }
}

fn risk_score(by_severity: &BTreeMap<Severity, usize>) -> u8 {
    let count = |sev: Severity| by_severity.get(&sev).copied().unwrap_or(0);
    let score = count(Severity::Critical) * WEIGHT_CRITICAL
        + count(Severity::High) * WEIGHT_HIGH
        + count(Severity::Medium) * WEIGHT_MEDIUM
        + count(Severity::Low) * WEIGHT_LOW;
    score.min(100) as u8
}

fn risk_level(score: u8) -> Severity {
    match score {
        75..=100 => Severity::Critical,
        50..=74 => Severity::High,
        25..=49 => Severity::Medium,
        _ => Severity::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog;
    use crate::core::models::{Endpoint, OwaspCategory};
    use chrono::Utc;

    fn finding(severity: Severity) -> Finding {
        Finding {
            test_id: "bola".to_string(),
            category: OwaspCategory::Bola,
            severity,
            title: "t".to_string(),
            description: "d".to_string(),
            evidence: "e".to_string(),
            endpoint: Endpoint {
                url: "http://target.test/".to_string(),
                method: "GET".to_string(),
            },
            recommendation: "r".to_string(),
            discovered_at: Utc::now(),
        }
    }

    #[test]
    fn buckets_sum_to_findings_and_absent_severities_are_zero() {
        let findings = vec![
            finding(Severity::Critical),
            finding(Severity::Critical),
            finding(Severity::Low),
        ];
        let summary = aggregate(catalog::definitions(), &findings, &[]);

        assert_eq!(summary.by_severity.values().sum::<usize>(), findings.len());
        assert_eq!(summary.by_severity[&Severity::Critical], 2);
        assert_eq!(summary.by_severity[&Severity::Low], 1);
        assert_eq!(summary.by_severity[&Severity::Medium], 0);
        assert_eq!(summary.by_severity[&Severity::High], 0);
        assert_eq!(summary.by_severity[&Severity::Info], 0);
        assert_eq!(summary.vulnerabilities_found, 3);
        assert_eq!(summary.total_tests, 9);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let findings = vec![finding(Severity::High), finding(Severity::Info)];
        let failures = vec![ProbeFailure {
            test_id: "ssrf".to_string(),
            reason: "timeout".to_string(),
        }];
        let first = aggregate(catalog::definitions(), &findings, &failures);
        let second = aggregate(catalog::definitions(), &findings, &failures);
        assert_eq!(first, second);
    }

    #[test]
    fn risk_score_is_weighted_and_capped() {
        let findings: Vec<Finding> =
            (0..5).map(|_| finding(Severity::Critical)).collect();
        let summary = aggregate(&[], &findings, &[]);
        assert_eq!(summary.risk_score, 100);
        assert_eq!(summary.risk_level, Severity::Critical);

        let summary = aggregate(&[], &[finding(Severity::Medium)], &[]);
        assert_eq!(summary.risk_score, 8);
        assert_eq!(summary.risk_level, Severity::Low);
    }

    #[test]
    fn empty_scan_scores_zero() {
        let summary = aggregate(&[], &[], &[]);
        assert_eq!(summary.risk_score, 0);
        assert_eq!(summary.vulnerabilities_found, 0);
        assert_eq!(summary.by_severity.len(), 5);
    }
}
