// src/core/probes/resource_consumption.rs

//! Unrestricted Resource Consumption (API4:2023).
//!
//! The one probe that intentionally parallelizes its internal requests:
//! a burst of `burst_size` concurrent GETs inside a short window has to
//! produce genuine load, otherwise a request-per-second limiter would
//! never trip. The burst size is a named tuning option (default 15).

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::core::models::{Finding, ProbeOutcome};
use crate::core::probes::{ProbeCtx, endpoint};

pub async fn run(ctx: &ProbeCtx) -> ProbeOutcome {
    let url = ctx.target.to_string();
    let burst = ctx.tuning.burst_size;
    let headers = Arc::new(ctx.headers.clone());

    info!(burst, "firing rate-limit burst");

    let mut join_set = JoinSet::new();
    for _ in 0..burst {
        let http = Arc::clone(&ctx.http);
        let url = url.clone();
        let headers = Arc::clone(&headers);
        join_set.spawn(async move { http.get(&url, &headers).await });
    }

    let mut statuses = Vec::new();
    let mut throttled_at = None;
    let mut first_error = None;

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(Ok(resp)) => {
                let throttle = resp.status == 429 || resp.header("retry-after").is_some();
                if throttle && throttled_at.is_none() {
                    throttled_at = Some(statuses.len() + 1);
                }
                statuses.push(resp.status);
            }
            Ok(Err(e)) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            // A panicked burst task is a defect in the probe itself, not
            // evidence about the target.
            Err(join_err) => {
                debug!(error = %join_err, "burst task failed to join");
            }
        }
    }

    if statuses.is_empty() {
        return match first_error {
            Some(e) => ProbeOutcome::TransportFailure(e),
            None => ProbeOutcome::Inconclusive("burst produced no responses".to_string()),
        };
    }

    if let Some(position) = throttled_at {
        debug!(position, "throttling response observed; target rate-limits");
        return ProbeOutcome::Findings(Vec::new());
    }

    let success_count = statuses.iter().filter(|s| (200..300).contains(*s)).count();
    let finding = Finding::new(
        ctx.definition,
        endpoint(&url, "GET"),
        format!(
            "The endpoint answered a burst of {} requests without ever \
             responding 429 or signalling backoff, so a client can consume \
             resources without restriction.",
            statuses.len()
        ),
        format!(
            "no throttling response observed across {} requests ({} succeeded); \
             statuses seen: {:?}",
            statuses.len(),
            success_count,
            summarize_statuses(&statuses),
        ),
        "Apply rate limiting per client (token bucket or similar) and return \
         429 with a Retry-After header once the budget is exhausted.",
    );

    ProbeOutcome::Findings(vec![finding])
}

/// Distinct statuses with counts, small enough to embed in evidence.
fn summarize_statuses(statuses: &[u16]) -> Vec<(u16, usize)> {
    let mut summary: Vec<(u16, usize)> = Vec::new();
    for &status in statuses {
        match summary.iter_mut().find(|(s, _)| *s == status) {
            Some((_, count)) => *count += 1,
            None => summary.push((status, 1)),
        }
    }
    summary.sort_by_key(|(s, _)| *s);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_summary_counts_distinct_codes() {
        let summary = summarize_statuses(&[200, 200, 429, 200]);
        assert_eq!(summary, vec![(200, 3), (429, 1)]);
    }
}
