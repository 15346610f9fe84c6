// src/core/probes/broken_auth.rs

//! Broken Authentication (API2:2023).
//!
//! Three-step protocol against the target endpoint: (c) request with the
//! supplied credentials, (a) request with no credentials, (b) request
//! with a malformed bearer token. A finding is raised when (a) or (b)
//! yields the same success outcome as (c).

use tracing::debug;

use crate::core::models::{Finding, ProbeOutcome};
use crate::core::probes::{ProbeCtx, endpoint};

const MALFORMED_TOKEN: &str = "Bearer invalid.invalid.invalid";

pub async fn run(ctx: &ProbeCtx) -> ProbeOutcome {
    if !ctx.has_auth_headers() {
        return ProbeOutcome::Inconclusive(
            "no authentication headers supplied; nothing to compare a credentialed \
             request against"
                .to_string(),
        );
    }

    let url = ctx.target.as_str();

    // (c) the authenticated baseline.
    let with_creds = match ctx.http.get(url, &ctx.headers).await {
        Ok(resp) => resp,
        Err(e) => return ProbeOutcome::TransportFailure(e),
    };
    if !with_creds.is_success() {
        return ProbeOutcome::Inconclusive(format!(
            "authenticated baseline request returned status {}; cannot establish a \
             success outcome to compare against",
            with_creds.status
        ));
    }

    let mut findings = Vec::new();
    let mut variant_responses = 0usize;

    // (a) no credentials at all.
    let bare_headers = ctx.headers_without_auth();
    if let Ok(no_creds) = ctx.http.get(url, &bare_headers).await {
        variant_responses += 1;
        debug!(status = no_creds.status, "request without credentials");
        if no_creds.is_success() && no_creds.status == with_creds.status {
            findings.push(Finding::new(
                ctx.definition,
                endpoint(url, "GET"),
                "The endpoint returns the same success outcome with no \
                 authentication header as with the supplied credentials.",
                format!(
                    "GET {} without credentials returned {} (authenticated request \
                     also returned {}); fragment: {}",
                    url,
                    no_creds.status,
                    with_creds.status,
                    ctx.evidence(&no_creds.body),
                ),
                "Require authentication on every API endpoint and reject requests \
                 lacking credentials with 401.",
            ));
        }
    }

    // (b) structurally broken token.
    let mut malformed_headers = ctx.headers_without_auth();
    malformed_headers.insert("Authorization".to_string(), MALFORMED_TOKEN.to_string());
    if let Ok(bad_token) = ctx.http.get(url, &malformed_headers).await {
        variant_responses += 1;
        debug!(status = bad_token.status, "request with malformed token");
        if bad_token.is_success() && bad_token.status == with_creds.status {
            findings.push(Finding::new(
                ctx.definition,
                endpoint(url, "GET"),
                "A malformed bearer token is accepted with the same success \
                 outcome as valid credentials, indicating token validation is \
                 missing or broken.",
                format!(
                    "GET {} with `Authorization: {}` returned {}; fragment: {}",
                    url,
                    MALFORMED_TOKEN,
                    bad_token.status,
                    ctx.evidence(&bad_token.body),
                ),
                "Validate token signature, expiry and issuer on every request; \
                 reject malformed tokens with 401.",
            ));
        }
    }

    // A verdict needs at least one variant comparison against the
    // baseline; "clean" must mean compared-and-rejected, not unreachable.
    if variant_responses == 0 {
        return ProbeOutcome::Inconclusive(
            "neither the credential-free nor the malformed-token request completed"
                .to_string(),
        );
    }

    ProbeOutcome::Findings(findings)
}
