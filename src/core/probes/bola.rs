// src/core/probes/bola.rs

//! Broken Object Level Authorization (API1:2023).
//!
//! Strategy: find a resource-by-id endpoint that answers a baseline
//! authorized read, then enumerate sibling ids and replay each read with
//! and without the supplied authorization headers. An unauthorized read
//! that succeeds with the same status *and* body length as the authorized
//! one is treated as evidence; identical status alone is not, to avoid
//! flagging intentionally public endpoints.

use tracing::{debug, info};

use crate::core::models::{Finding, ProbeOutcome};
use crate::core::probes::{ProbeCtx, endpoint};

/// Common resource-by-id path shapes probed when the target URL itself
/// does not end in an object id.
const OBJECT_PATH_TEMPLATES: &[&str] = &[
    "/api/users/{id}",
    "/api/user/{id}",
    "/users/{id}",
    "/api/accounts/{id}",
    "/api/orders/{id}",
    "/api/documents/{id}",
];

pub async fn run(ctx: &ProbeCtx) -> ProbeOutcome {
    if !ctx.has_auth_headers() {
        return ProbeOutcome::Inconclusive(
            "no authorization headers supplied; cannot compare authorized and \
             unauthorized access"
                .to_string(),
        );
    }

    let mut last_transport_error = None;
    let mut any_response = false;

    for (template, baseline_id) in candidate_templates(ctx) {
        let baseline_url = template.replace("{id}", &baseline_id.to_string());

        let baseline = match ctx.http.get(&baseline_url, &ctx.headers).await {
            Ok(resp) => resp,
            Err(e) => {
                last_transport_error = Some(e);
                continue;
            }
        };
        any_response = true;
        if !baseline.is_success() {
            debug!(url = %baseline_url, status = baseline.status, "no baseline here");
            continue;
        }

        info!(url = %baseline_url, "object-by-id baseline established");
        return enumerate_siblings(ctx, &template, baseline_id).await;
    }

    match last_transport_error {
        // Every candidate failed at the transport level: the probe could
        // not run at all.
        Some(err) if !any_response => ProbeOutcome::TransportFailure(err),
        _ => ProbeOutcome::Inconclusive(
            "no resource-by-id endpoint returned a successful baseline".to_string(),
        ),
    }
}

/// Reads sibling object ids with and without authorization and compares
/// the responses. Stops at the first confirmed bypass: one finding per
/// vulnerable endpoint is enough.
async fn enumerate_siblings(ctx: &ProbeCtx, template: &str, baseline_id: u64) -> ProbeOutcome {
    let unauth_headers = ctx.headers_without_auth();
    let mut findings = Vec::new();

    for id in sibling_ids(baseline_id) {
        let url = template.replace("{id}", &id.to_string());

        let authorized = match ctx.http.get(&url, &ctx.headers).await {
            Ok(resp) => resp,
            Err(_) => continue,
        };
        if !authorized.is_success() {
            continue;
        }

        let unauthorized = match ctx.http.get(&url, &unauth_headers).await {
            Ok(resp) => resp,
            Err(_) => continue,
        };

        // Tie-break rule: success without credentials counts only when the
        // response is indistinguishable from the authorized one.
        if unauthorized.is_success()
            && unauthorized.status == authorized.status
            && unauthorized.body.len() == authorized.body.len()
        {
            let evidence = format!(
                "GET {} without authorization headers returned {} with a body \
                 identical in length ({} bytes) to the authorized response; \
                 fragment: {}",
                url,
                unauthorized.status,
                unauthorized.body.len(),
                ctx.evidence(&unauthorized.body),
            );
            findings.push(Finding::new(
                ctx.definition,
                endpoint(&url, "GET"),
                format!(
                    "Object {} is readable without the supplied authorization \
                     context, indicating missing object-level access control.",
                    id
                ),
                evidence,
                "Enforce object-level authorization on every request: verify the \
                 authenticated principal is permitted to access the specific \
                 object id, not just the endpoint.",
            ));
            break;
        }
    }

    ProbeOutcome::Findings(findings)
}

/// Candidate `{id}` templates, most specific first: a template derived
/// from the target URL when it ends in a numeric segment, then the common
/// path shapes rooted at the target origin.
fn candidate_templates(ctx: &ProbeCtx) -> Vec<(String, u64)> {
    let mut templates = Vec::new();

    if let Some((template, id)) = template_from_target(ctx) {
        templates.push((template, id));
    }
    for shape in OBJECT_PATH_TEMPLATES {
        templates.push((ctx.origin_url(shape), 1));
    }
    templates
}

/// If the target path ends in a numeric segment (`/objects/42`), treat it
/// as a detected resource-by-id endpoint with that id as the baseline.
fn template_from_target(ctx: &ProbeCtx) -> Option<(String, u64)> {
    let path = ctx.target.path();
    let (prefix, last) = path.rsplit_once('/')?;
    let id: u64 = last.parse().ok()?;
    let template = format!(
        "{}{}/{{id}}",
        ctx.target.origin().ascii_serialization(),
        prefix
    );
    Some((template, id))
}

fn sibling_ids(baseline: u64) -> Vec<u64> {
    let mut ids = vec![baseline + 1];
    if baseline > 1 {
        ids.push(baseline - 1);
    }
    ids.push(baseline + 2);
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_ids_skip_zero() {
        assert_eq!(sibling_ids(1), vec![2, 3]);
        assert_eq!(sibling_ids(5), vec![6, 4, 7]);
    }
}
