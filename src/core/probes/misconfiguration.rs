// src/core/probes/misconfiguration.rs

//! Security Misconfiguration (API8:2023).
//!
//! A single GET against the target, then a checklist over the response
//! headers: missing hardening headers, wildcard CORS, and version
//! banners. Each failed check yields its own finding at the severity the
//! checklist assigns, so one response can produce several findings.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::core::http::ProbeResponse;
use crate::core::models::{Finding, ProbeOutcome, Severity};
use crate::core::probes::{ProbeCtx, endpoint};

static VERSION_BANNER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\d]+\.[\d]+").expect("version banner regex"));

pub async fn run(ctx: &ProbeCtx) -> ProbeOutcome {
    let url = ctx.target.as_str();

    let resp = match ctx.http.get(url, &ctx.headers).await {
        Ok(resp) => resp,
        Err(e) => return ProbeOutcome::TransportFailure(e),
    };
    info!(status = resp.status, "response headers collected");

    let findings = analyze_headers(ctx, &resp);
    debug!(count = findings.len(), "misconfiguration checklist finished");
    ProbeOutcome::Findings(findings)
}

fn analyze_headers(ctx: &ProbeCtx, resp: &ProbeResponse) -> Vec<Finding> {
    let url = ctx.target.as_str();
    let mut findings = Vec::new();

    let mut add = |title: &str, severity: Severity, description: String, evidence: String,
                   recommendation: &str| {
        findings.push(
            Finding::new(ctx.definition, endpoint(url, "GET"), description, evidence,
                recommendation)
                .with_title(title)
                .with_severity(severity),
        );
    };

    if resp.header("content-security-policy").is_none() {
        add(
            "Content-Security-Policy header missing",
            Severity::Medium,
            "Without a CSP the browser has no restriction on script and resource \
             origins, easing XSS exploitation."
                .to_string(),
            "header `content-security-policy` absent from response".to_string(),
            "Define a restrictive Content-Security-Policy and tighten it \
             iteratively using report-only mode.",
        );
    }

    if ctx.target.scheme() == "https" && resp.header("strict-transport-security").is_none() {
        add(
            "Strict-Transport-Security header missing",
            Severity::Low,
            "Without HSTS, clients may be downgraded to plaintext HTTP by an \
             active network attacker."
                .to_string(),
            "header `strict-transport-security` absent from HTTPS response".to_string(),
            "Send `Strict-Transport-Security: max-age=31536000; includeSubDomains` \
             on every HTTPS response.",
        );
    }

    match resp.header("x-content-type-options") {
        None => add(
            "X-Content-Type-Options header missing",
            Severity::Low,
            "Browsers may MIME-sniff responses into executable types.".to_string(),
            "header `x-content-type-options` absent from response".to_string(),
            "Send `X-Content-Type-Options: nosniff` on every response.",
        ),
        Some(value) if !value.eq_ignore_ascii_case("nosniff") => add(
            "X-Content-Type-Options misconfigured",
            Severity::Low,
            "The header is present but does not disable MIME sniffing.".to_string(),
            format!("x-content-type-options: {}", value),
            "Set the header value to `nosniff`.",
        ),
        Some(_) => {}
    }

    if resp.header("x-frame-options").is_none() {
        add(
            "X-Frame-Options header missing",
            Severity::Low,
            "The response can be framed by arbitrary origins, enabling \
             clickjacking."
                .to_string(),
            "header `x-frame-options` absent from response".to_string(),
            "Send `X-Frame-Options: DENY` or a CSP `frame-ancestors` directive.",
        );
    }

    if let Some(acao) = resp.header("access-control-allow-origin") {
        if acao.trim() == "*" {
            add(
                "CORS allows any origin",
                Severity::Medium,
                "A wildcard Access-Control-Allow-Origin lets any website read \
                 API responses from a victim's browser."
                    .to_string(),
                format!("access-control-allow-origin: {}", acao),
                "Echo only an allow-list of trusted origins, never `*`, on \
                 credentialed endpoints.",
            );
        }
    }

    if let Some(server) = resp.header("server") {
        if VERSION_BANNER_RE.is_match(server) {
            add(
                "Server version banner exposed",
                Severity::Info,
                "The Server header discloses software and version, simplifying \
                 targeted exploitation."
                    .to_string(),
                format!("server: {}", server),
                "Strip or genericize the Server header at the edge.",
            );
        }
    }

    if let Some(powered) = resp.header("x-powered-by") {
        add(
            "X-Powered-By header exposed",
            Severity::Info,
            "The X-Powered-By header discloses the backend technology stack.".to_string(),
            format!("x-powered-by: {}", powered),
            "Remove the X-Powered-By header in the framework or proxy \
             configuration.",
        );
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_banner_requires_digits() {
        assert!(VERSION_BANNER_RE.is_match("nginx/1.25.3"));
        assert!(!VERSION_BANNER_RE.is_match("nginx"));
    }
}
