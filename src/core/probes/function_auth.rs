// src/core/probes/function_auth.rs

//! Broken Function Level Authorization (API5:2023).
//!
//! Probes a fixed list of commonly privileged paths and verbs with the
//! operator's (non-elevated) credentials. Any unexpected success means a
//! privileged function is reachable without the matching role.

use reqwest::Method;
use tracing::debug;

use crate::core::models::{Finding, ProbeOutcome};
use crate::core::probes::{ProbeCtx, endpoint};

/// Privileged surface guesses. DELETE on a resource id is included
/// because destructive verbs are the classic function-level gap.
const PRIVILEGED_REQUESTS: &[(&str, &str)] = &[
    ("GET", "/admin"),
    ("GET", "/api/admin"),
    ("GET", "/admin/users"),
    ("GET", "/api/admin/users"),
    ("DELETE", "/api/users/1"),
    ("PUT", "/api/admin/settings"),
];

pub async fn run(ctx: &ProbeCtx) -> ProbeOutcome {
    let mut findings = Vec::new();
    let mut first_error = None;
    let mut responses = 0usize;

    for (verb, path) in PRIVILEGED_REQUESTS {
        let url = ctx.origin_url(path);
        let method: Method = verb.parse().unwrap_or(Method::GET);
        let body = (method == Method::PUT || method == Method::POST).then(|| "{}".to_string());

        let resp = match ctx.http.send(method, &url, &ctx.headers, body).await {
            Ok(resp) => resp,
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
                continue;
            }
        };
        responses += 1;
        debug!(url = %url, verb, status = resp.status, "privileged path probed");

        if resp.is_success() {
            findings.push(Finding::new(
                ctx.definition,
                endpoint(&url, verb),
                format!(
                    "The privileged operation `{} {}` succeeded without elevated \
                     credentials.",
                    verb, path
                ),
                format!(
                    "{} {} returned {}; fragment: {}",
                    verb,
                    url,
                    resp.status,
                    ctx.evidence(&resp.body),
                ),
                "Enforce role checks per function, not per endpoint group; deny \
                 administrative verbs and paths unless the caller's role \
                 explicitly allows them.",
            ));
        }
    }

    if responses == 0 {
        if let Some(e) = first_error {
            return ProbeOutcome::TransportFailure(e);
        }
    }

    ProbeOutcome::Findings(findings)
}
