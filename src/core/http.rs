// src/core/http.rs

use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::core::error::{ConfigError, TransportError, TransportErrorKind};

/// Response body size cap. Bodies beyond this are truncated before they
/// reach probe logic, so a hostile target cannot exhaust memory.
const MAX_BODY_BYTES: usize = 1024 * 1024;

const USER_AGENT: &str = concat!("apisentry/", env!("CARGO_PKG_VERSION"));

/// A response normalized for probe consumption: status, lowercase-keyed
/// headers, body text and elapsed wall time.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub elapsed: Duration,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// The single transport used by every probe. Sends one HTTP request with
/// a bounded timeout and a small connect-retry budget, and returns either
/// a normalized response or a `TransportError` — never an uncontrolled
/// fault.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    retries: u32,
}

impl HttpProbe {
    /// Builds the shared client. `insecure_tls` disables certificate
    /// verification for lab targets; it is logged loudly and affects
    /// nothing beyond this client.
    pub fn new(timeout: Duration, retries: u32, insecure_tls: bool) -> Result<Self, ConfigError> {
        if insecure_tls {
            warn!("TLS certificate verification is DISABLED; lab targets only");
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure_tls)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ConfigError::ClientBuild(e.to_string()))?;
        Ok(Self { client, retries })
    }

    /// Sends a single request. Connect-level failures are retried up to
    /// the configured budget; timeouts and protocol errors are not, since
    /// a retried timeout would only stall the scan further.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<String>,
    ) -> Result<ProbeResponse, TransportError> {
        let mut last_err = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                debug!(url, attempt, "retrying after connect failure");
                tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
            }

            let mut request = self.client.request(method.clone(), url);
            for (name, value) in headers {
                request = request.header(name, value);
            }
            if let Some(ref payload) = body {
                request = request
                    .header("content-type", "application/json")
                    .body(payload.clone());
            }

            let started = Instant::now();
            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let response_headers = normalize_headers(response.headers());
                    let text = match response.text().await {
                        Ok(t) => t,
                        Err(e) => return Err(TransportError::from(e)),
                    };
                    let mut body_text = text;
                    if body_text.len() > MAX_BODY_BYTES {
                        let mut cut = MAX_BODY_BYTES;
                        while !body_text.is_char_boundary(cut) {
                            cut -= 1;
                        }
                        body_text.truncate(cut);
                    }
                    let elapsed = started.elapsed();
                    debug!(url, status, ms = elapsed.as_millis() as u64, "request completed");
                    return Ok(ProbeResponse {
                        status,
                        headers: response_headers,
                        body: body_text,
                        elapsed,
                    });
                }
                Err(e) => {
                    let err = TransportError::from(e);
                    let retryable = matches!(
                        err.kind,
                        TransportErrorKind::Connect | TransportErrorKind::Dns
                    );
                    if !retryable {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            TransportError::new(TransportErrorKind::Other, "request not attempted")
        }))
    }

    pub async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<ProbeResponse, TransportError> {
        self.send(Method::GET, url, headers, None).await
    }

    pub async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: String,
    ) -> Result<ProbeResponse, TransportError> {
        self.send(Method::POST, url, headers, Some(body)).await
    }

    pub async fn put(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: String,
    ) -> Result<ProbeResponse, TransportError> {
        self.send(Method::PUT, url, headers, Some(body)).await
    }

    pub async fn delete(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<ProbeResponse, TransportError> {
        self.send(Method::DELETE, url, headers, None).await
    }
}

fn normalize_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let text = value.to_str().unwrap_or("[invalid utf-8]").to_string();
            (name.as_str().to_ascii_lowercase(), text)
        })
        .collect()
}
