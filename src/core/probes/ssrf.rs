// src/core/probes/ssrf.rs

//! Server-Side Request Forgery (API7:2023).
//!
//! For every target query parameter that semantically accepts a URL, the
//! probe first records a baseline with a guaranteed-invalid destination,
//! then substitutes canary destinations (loopback, the link-local cloud
//! metadata address). A canary that changes the status outcome or whose
//! content is reflected back indicates the server fetched it. Timing
//! divergence is noted as corroborating evidence only; it is too noisy
//! to stand alone.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::core::models::{Finding, ProbeOutcome};
use crate::core::probes::{ProbeCtx, endpoint, with_param_value};

/// Destination that can never resolve, used to establish the failure
/// baseline a canary response is compared against.
const INVALID_BASELINE_URL: &str = "http://invalid-host.apisentry.invalid/";

/// Parameter names that conventionally carry a URL.
const URL_PARAM_NAMES: &[&str] = &[
    "url", "uri", "link", "redirect", "redirect_uri", "callback", "webhook", "target", "dest",
    "destination", "feed", "fetch", "image", "src", "proxy", "domain",
];

/// Content only an internally fetched canary would contain.
static CANARY_CONTENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(meta-data|ami-id|instance-id|iam/security-credentials|root:.*:0:0)")
        .expect("canary content regex")
});

pub async fn run(ctx: &ProbeCtx) -> ProbeOutcome {
    let url_params: Vec<String> = ctx
        .target
        .query_pairs()
        .filter(|(name, _)| {
            URL_PARAM_NAMES.contains(&name.to_ascii_lowercase().as_str())
        })
        .map(|(name, _)| name.into_owned())
        .collect();

    if url_params.is_empty() {
        return ProbeOutcome::Inconclusive(
            "no URL-accepting query parameter identified on the target".to_string(),
        );
    }

    for param in &url_params {
        let baseline_url = with_param_value(&ctx.target, param, INVALID_BASELINE_URL);
        let baseline = match ctx.http.get(baseline_url.as_str(), &ctx.headers).await {
            Ok(resp) => resp,
            Err(e) => return ProbeOutcome::TransportFailure(e),
        };
        debug!(param, status = baseline.status, "invalid-URL baseline recorded");

        for canary in &ctx.tuning.canary_urls {
            let probe_url = with_param_value(&ctx.target, param, canary);
            let resp = match ctx.http.get(probe_url.as_str(), &ctx.headers).await {
                Ok(resp) => resp,
                Err(_) => continue,
            };

            let status_signal = resp.is_success() && resp.status != baseline.status;
            let content_signal = CANARY_CONTENT_RE.is_match(&resp.body);
            if !status_signal && !content_signal {
                continue;
            }

            info!(param, canary = %canary, "canary destination appears to have been fetched");

            let mut evidence = format!(
                "parameter `{}` with canary `{}` returned {} (invalid-URL baseline \
                 returned {}); fragment: {}",
                param,
                canary,
                resp.status,
                baseline.status,
                ctx.evidence(&resp.body),
            );
            // Corroborating signal only, never sufficient on its own.
            if resp.elapsed > baseline.elapsed * 3 {
                evidence.push_str(&format!(
                    "; timing divergence corroborates ({}ms vs baseline {}ms)",
                    resp.elapsed.as_millis(),
                    baseline.elapsed.as_millis()
                ));
            }

            let finding = Finding::new(
                ctx.definition,
                endpoint(probe_url.as_str(), "GET"),
                format!(
                    "The server appears to fetch the URL supplied in parameter \
                     `{}`, allowing requests to internal destinations such as {}.",
                    param, canary
                ),
                evidence,
                "Resolve and validate user-supplied URLs against an allow-list \
                 before fetching; block loopback, link-local and RFC1918 \
                 destinations outright.",
            );
            return ProbeOutcome::Findings(vec![finding]);
        }
    }

    ProbeOutcome::Findings(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canary_content_regex_matches_metadata() {
        assert!(CANARY_CONTENT_RE.is_match("ami-id\ninstance-id\n"));
        assert!(!CANARY_CONTENT_RE.is_match("plain response"));
    }
}
