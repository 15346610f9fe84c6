// src/core/probes/object_property.rs

//! Broken Object Property Level Authorization / mass assignment
//! (API3:2023).
//!
//! Protocol: read the object, write it back with sensitive properties the
//! original did not contain, then read again. The finding requires both a
//! successful write and a follow-up read that reflects an injected
//! property, so endpoints that silently discard unknown fields stay
//! clean.

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::core::models::{Finding, ProbeOutcome};
use crate::core::probes::{ProbeCtx, endpoint};

/// Properties an API consumer should never be able to set directly.
fn injected_properties() -> Vec<(&'static str, Value)> {
    vec![
        ("role", json!("admin")),
        ("is_admin", json!(true)),
        ("balance", json!(999999)),
    ]
}

pub async fn run(ctx: &ProbeCtx) -> ProbeOutcome {
    let url = ctx.target.as_str();

    let baseline = match ctx.http.get(url, &ctx.headers).await {
        Ok(resp) => resp,
        Err(e) => return ProbeOutcome::TransportFailure(e),
    };
    if !baseline.is_success() {
        return ProbeOutcome::Inconclusive(format!(
            "baseline object read returned status {}",
            baseline.status
        ));
    }

    let original: Map<String, Value> = match serde_json::from_str::<Value>(&baseline.body) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            return ProbeOutcome::Inconclusive(
                "baseline response is not a JSON object; cannot attempt a \
                 property-injection write"
                    .to_string(),
            );
        }
    };

    let mut mutated = original.clone();
    let mut injected = Vec::new();
    for (key, value) in injected_properties() {
        if !original.contains_key(key) {
            mutated.insert(key.to_string(), value.clone());
            injected.push((key, value));
        }
    }
    if injected.is_empty() {
        return ProbeOutcome::Inconclusive(
            "object already carries every candidate property; injection test \
             would be ambiguous"
                .to_string(),
        );
    }

    let payload = Value::Object(mutated).to_string();

    // Try PUT first, fall back to POST for APIs that upsert that way.
    let (write_method, write_resp) = match ctx.http.put(url, &ctx.headers, payload.clone()).await {
        Ok(resp) if resp.is_success() => ("PUT", resp),
        _ => match ctx.http.post(url, &ctx.headers, payload).await {
            Ok(resp) => ("POST", resp),
            Err(e) => return ProbeOutcome::TransportFailure(e),
        },
    };
    if !write_resp.is_success() {
        debug!(status = write_resp.status, "property-injection write rejected");
        return ProbeOutcome::Findings(Vec::new());
    }

    let after = match ctx.http.get(url, &ctx.headers).await {
        Ok(resp) => resp,
        Err(e) => return ProbeOutcome::TransportFailure(e),
    };
    let after_object: Map<String, Value> = match serde_json::from_str::<Value>(&after.body) {
        Ok(Value::Object(map)) => map,
        _ => {
            return ProbeOutcome::Inconclusive(
                "follow-up read did not return a JSON object".to_string(),
            );
        }
    };

    let mut findings = Vec::new();
    for (key, value) in &injected {
        if after_object.get(*key) == Some(value) {
            findings.push(Finding::new(
                ctx.definition,
                endpoint(url, write_method),
                format!(
                    "The API accepted a write containing the protected property \
                     `{}` and the follow-up read reflects the injected value.",
                    key
                ),
                format!(
                    "{} {} with injected `\"{}\": {}` returned {}; follow-up GET \
                     reflects it: {}",
                    write_method,
                    url,
                    key,
                    value,
                    write_resp.status,
                    ctx.evidence(&after.body),
                ),
                "Use an explicit allow-list of writable properties per endpoint \
                 and ignore or reject any other field in the request body.",
            ));
            break;
        }
    }

    ProbeOutcome::Findings(findings)
}
