// src/core/probes/injection.rs

//! Injection (API10:2023).
//!
//! A fixed SQL/NoSQL payload battery against the target's query
//! parameters, with three detection channels:
//!   (a) database error signatures in the response body,
//!   (b) behavioral difference between a boolean true/false payload pair,
//!   (c) timing divergence for a time-based payload, used only to
//!       corroborate an existing signal because of its noise.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::core::models::{Finding, ProbeOutcome};
use crate::core::probes::{ProbeCtx, endpoint, with_param_value};

/// Payloads expected to break a naive string-interpolated query.
const ERROR_PAYLOADS: &[&str] = &["' OR '1'='1", "'", "\"", r#"{"$gt": ""}"#];

const BOOLEAN_TRUE_PAYLOAD: &str = "1' AND '1'='1";
const BOOLEAN_FALSE_PAYLOAD: &str = "1' AND '1'='2";
const TIMING_PAYLOAD: &str = "1' AND SLEEP(2)-- -";

/// How many parameters the battery covers before stopping.
const MAX_PARAMS: usize = 3;

static DB_ERROR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(sql syntax|syntax error at or near|unterminated quoted string",
        r"|unclosed quotation mark|mysql_fetch|mysqli?|sqlite3?[_:]|pg_query",
        r"|postgres(ql)?|ora-\d{5}|odbc driver|jdbc|mongodb?\b|bson)",
    ))
    .expect("database error regex")
});

pub async fn run(ctx: &ProbeCtx) -> ProbeOutcome {
    let params: Vec<String> = ctx
        .target
        .query_pairs()
        .map(|(name, _)| name.into_owned())
        .take(MAX_PARAMS)
        .collect();

    if params.is_empty() {
        return ProbeOutcome::Inconclusive(
            "no input parameters identified on the target URL".to_string(),
        );
    }

    // Baseline for behavioral and timing comparisons.
    let baseline = match ctx.http.get(ctx.target.as_str(), &ctx.headers).await {
        Ok(resp) => resp,
        Err(e) => return ProbeOutcome::TransportFailure(e),
    };

    for param in &params {
        // (a) error signatures.
        for payload in ERROR_PAYLOADS {
            let probe_url = with_param_value(&ctx.target, param, payload);
            let resp = match ctx.http.get(probe_url.as_str(), &ctx.headers).await {
                Ok(resp) => resp,
                Err(_) => continue,
            };
            if let Some(matched) = DB_ERROR_RE.find(&resp.body) {
                info!(param, payload, "database error signature in response");
                let finding = Finding::new(
                    ctx.definition,
                    endpoint(probe_url.as_str(), "GET"),
                    format!(
                        "Parameter `{}` reaches a database query without \
                         sanitization: an injected quote produced a database \
                         error.",
                        param
                    ),
                    format!(
                        "payload `{}` in parameter `{}` returned status {} with \
                         database error signature `{}`; fragment: {}",
                        payload,
                        param,
                        resp.status,
                        matched.as_str(),
                        ctx.evidence(&resp.body),
                    ),
                    "Use parameterized queries or an ORM binding layer; never \
                     interpolate request input into query strings.",
                );
                return ProbeOutcome::Findings(vec![finding]);
            }
        }

        // (b) boolean pair divergence.
        if let Some(finding) = boolean_probe(ctx, param, baseline.body.len()).await {
            return ProbeOutcome::Findings(vec![finding]);
        }
    }

    debug!("no injection signal on any parameter");
    ProbeOutcome::Findings(Vec::new())
}

/// Boolean-based check: the true-condition payload should behave like the
/// baseline while the false-condition payload diverges. Timing is checked
/// afterwards purely to strengthen the evidence string.
async fn boolean_probe(ctx: &ProbeCtx, param: &str, baseline_len: usize) -> Option<Finding> {
    let true_url = with_param_value(&ctx.target, param, BOOLEAN_TRUE_PAYLOAD);
    let false_url = with_param_value(&ctx.target, param, BOOLEAN_FALSE_PAYLOAD);

    let true_resp = ctx.http.get(true_url.as_str(), &ctx.headers).await.ok()?;
    let false_resp = ctx.http.get(false_url.as_str(), &ctx.headers).await.ok()?;

    let true_like_baseline =
        true_resp.is_success() && lengths_similar(true_resp.body.len(), baseline_len);
    let pair_diverges = true_resp.status != false_resp.status
        || !lengths_similar(true_resp.body.len(), false_resp.body.len());

    if !(true_like_baseline && pair_diverges) {
        return None;
    }

    info!(param, "boolean payload pair diverges");
    let mut evidence = format!(
        "parameter `{}`: true-condition payload `{}` returned {} ({} bytes, \
         baseline {} bytes) while false-condition payload `{}` returned {} \
         ({} bytes)",
        param,
        BOOLEAN_TRUE_PAYLOAD,
        true_resp.status,
        true_resp.body.len(),
        baseline_len,
        BOOLEAN_FALSE_PAYLOAD,
        false_resp.status,
        false_resp.body.len(),
    );

    // (c) corroborating timing check, never a signal on its own.
    let timing_url = with_param_value(&ctx.target, param, TIMING_PAYLOAD);
    if let Ok(timed) = ctx.http.get(timing_url.as_str(), &ctx.headers).await {
        if timed.elapsed >= true_resp.elapsed + std::time::Duration::from_millis(1500) {
            evidence.push_str(&format!(
                "; time-based payload took {}ms vs {}ms, corroborating",
                timed.elapsed.as_millis(),
                true_resp.elapsed.as_millis()
            ));
        }
    }

    Some(Finding::new(
        ctx.definition,
        endpoint(true_url.as_str(), "GET"),
        format!(
            "Parameter `{}` evaluates injected boolean conditions: responses \
             differ between a true and a false SQL condition.",
            param
        ),
        evidence,
        "Use parameterized queries or an ORM binding layer; never interpolate \
         request input into query strings.",
    ))
}

fn lengths_similar(a: usize, b: usize) -> bool {
    let (small, large) = if a < b { (a, b) } else { (b, a) };
    // Within 10% of each other counts as the same behavior.
    large - small <= large / 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_error_signatures_match_common_engines() {
        assert!(DB_ERROR_RE.is_match("You have an error in your SQL syntax"));
        assert!(DB_ERROR_RE.is_match("ERROR: syntax error at or near \"'\""));
        assert!(DB_ERROR_RE.is_match("ORA-01756: quoted string not properly terminated"));
        assert!(DB_ERROR_RE.is_match("SQLite3::SQLException"));
        assert!(!DB_ERROR_RE.is_match("{\"users\": []}"));
    }

    #[test]
    fn length_similarity_tolerates_ten_percent() {
        assert!(lengths_similar(100, 105));
        assert!(lengths_similar(0, 0));
        assert!(!lengths_similar(100, 50));
    }
}
