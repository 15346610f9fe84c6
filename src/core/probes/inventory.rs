// src/core/probes/inventory.rs

//! Improper Inventory Management (API9:2023).
//!
//! Probes common version prefixes and schema/documentation paths rooted
//! at the target origin. A live version path the operator is not
//! targeting suggests a deprecated or forgotten deployment; exposed
//! schema endpoints hand an attacker the full API surface.

use tracing::debug;

use crate::core::models::{Finding, ProbeOutcome, Severity};
use crate::core::probes::{ProbeCtx, endpoint};

const VERSION_PATHS: &[&str] = &["/v1", "/v2", "/v3", "/api/v1", "/api/v2", "/api/v3"];

const DOCUMENTATION_PATHS: &[&str] = &[
    "/api-docs",
    "/swagger.json",
    "/openapi.json",
    "/swagger-ui.html",
    "/graphql",
];

pub async fn run(ctx: &ProbeCtx) -> ProbeOutcome {
    let mut findings = Vec::new();
    let mut first_error = None;
    let mut responses = 0usize;
    let target_path = ctx.target.path().to_string();

    for path in VERSION_PATHS {
        // The version the operator is deliberately scanning is not a
        // stray deployment.
        if target_path.starts_with(path) {
            continue;
        }
        match probe_path(ctx, path).await {
            Ok(Some(resp_status_body)) => {
                responses += 1;
                let (status, body) = resp_status_body;
                findings.push(
                    Finding::new(
                        ctx.definition,
                        endpoint(&ctx.origin_url(path), "GET"),
                        format!(
                            "Version path `{}` answers although it is not the \
                             version under test; it may be a deprecated or \
                             unmanaged deployment.",
                            path
                        ),
                        format!("GET {} returned {}; fragment: {}", path, status,
                            ctx.evidence(&body)),
                        "Maintain an inventory of deployed API versions and \
                         retire or gate versions that are no longer supported.",
                    )
                    .with_title("Additional API version exposed"),
                );
            }
            Ok(None) => responses += 1,
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    for path in DOCUMENTATION_PATHS {
        match probe_path(ctx, path).await {
            Ok(Some((status, body))) => {
                responses += 1;
                findings.push(
                    Finding::new(
                        ctx.definition,
                        endpoint(&ctx.origin_url(path), "GET"),
                        format!(
                            "The schema/documentation endpoint `{}` is publicly \
                             reachable, exposing the API surface to attackers.",
                            path
                        ),
                        format!("GET {} returned {}; fragment: {}", path, status,
                            ctx.evidence(&body)),
                        "Restrict schema and documentation endpoints to internal \
                         networks or authenticated consumers.",
                    )
                    .with_title("API documentation endpoint exposed")
                    .with_severity(Severity::Medium),
                );
            }
            Ok(None) => responses += 1,
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if responses == 0 {
        if let Some(e) = first_error {
            return ProbeOutcome::TransportFailure(e);
        }
    }

    debug!(count = findings.len(), "inventory sweep finished");
    ProbeOutcome::Findings(findings)
}

/// Ok(Some((status, body))) when the path answers 2xx, Ok(None) when it
/// answers anything else.
async fn probe_path(
    ctx: &ProbeCtx,
    path: &str,
) -> Result<Option<(u16, String)>, crate::core::error::TransportError> {
    let url = ctx.origin_url(path);
    let resp = ctx.http.get(&url, &ctx.headers).await?;
    debug!(url = %url, status = resp.status, "inventory path probed");
    if resp.is_success() {
        Ok(Some((resp.status, resp.body)))
    } else {
        Ok(None)
    }
}
