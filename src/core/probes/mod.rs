// src/core/probes/mod.rs

//! One probe per OWASP API Top 10 category. Each probe is stateless and
//! independent: it consumes the target, the operator-supplied headers and
//! its tuning, issues its own requests through the shared transport, and
//! returns a `ProbeOutcome`. Requests inside a probe run sequentially,
//! because later requests compare against earlier baselines; the
//! resource-consumption burst is the single deliberate exception.

pub mod bola;
pub mod broken_auth;
pub mod function_auth;
pub mod injection;
pub mod inventory;
pub mod misconfiguration;
pub mod object_property;
pub mod resource_consumption;
pub mod ssrf;

use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use crate::core::http::HttpProbe;
use crate::core::models::{Endpoint, ProbeOutcome, ProbeTuning, TestDefinition};

/// Everything a probe needs for one execution. Shared read-only across
/// worker tasks.
pub struct ProbeCtx {
    pub http: Arc<HttpProbe>,
    pub target: Url,
    pub headers: HashMap<String, String>,
    pub tuning: ProbeTuning,
    pub definition: &'static TestDefinition,
}

impl ProbeCtx {
    /// Joins a path onto the target's origin, ignoring the target's own
    /// path and query. Used for well-known path guesses.
    pub fn origin_url(&self, path: &str) -> String {
        let origin = self.target.origin().ascii_serialization();
        format!("{}{}", origin, path)
    }

    /// Headers with all authentication material removed, for
    /// "unauthenticated caller" comparisons.
    pub fn headers_without_auth(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .filter(|(name, _)| !is_auth_header(name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Whether the operator supplied any authentication material at all.
    pub fn has_auth_headers(&self) -> bool {
        self.headers.keys().any(|name| is_auth_header(name))
    }

    /// Truncates a response fragment to the configured evidence length.
    pub fn evidence(&self, text: &str) -> String {
        truncate(text, self.tuning.max_evidence_len)
    }
}

/// The closed set of detection heuristics. Dispatch is a match, not an
/// open class hierarchy: the catalog is fixed and every variant is
/// independently testable with a mocked transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Bola,
    BrokenAuthentication,
    ObjectProperty,
    ResourceConsumption,
    FunctionAuthorization,
    Ssrf,
    Misconfiguration,
    Inventory,
    Injection,
}

impl Probe {
    /// Runs the heuristic once against the configured target.
    pub async fn run(&self, ctx: &ProbeCtx) -> ProbeOutcome {
        match self {
            Probe::Bola => bola::run(ctx).await,
            Probe::BrokenAuthentication => broken_auth::run(ctx).await,
            Probe::ObjectProperty => object_property::run(ctx).await,
            Probe::ResourceConsumption => resource_consumption::run(ctx).await,
            Probe::FunctionAuthorization => function_auth::run(ctx).await,
            Probe::Ssrf => ssrf::run(ctx).await,
            Probe::Misconfiguration => misconfiguration::run(ctx).await,
            Probe::Inventory => inventory::run(ctx).await,
            Probe::Injection => injection::run(ctx).await,
        }
    }
}

pub(crate) fn endpoint(url: &str, method: &str) -> Endpoint {
    Endpoint {
        url: url.to_string(),
        method: method.to_string(),
    }
}

/// Target URL with one query parameter replaced, all others untouched.
pub(crate) fn with_param_value(target: &Url, param: &str, value: &str) -> Url {
    let mut updated = target.clone();
    let pairs: Vec<(String, String)> = target
        .query_pairs()
        .map(|(name, val)| {
            if name == param {
                (name.into_owned(), value.to_string())
            } else {
                (name.into_owned(), val.into_owned())
            }
        })
        .collect();
    updated
        .query_pairs_mut()
        .clear()
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    updated
}

pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

fn is_auth_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    matches!(
        lower.as_str(),
        "authorization" | "cookie" | "x-api-key" | "api-key" | "x-auth-token" | "x-access-token"
    )
}
